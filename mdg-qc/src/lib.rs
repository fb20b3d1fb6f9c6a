//! # MDG Fleet Quality Control
//!
//! Population-level scanner QC for the Mobile Diagnostics Gateway:
//! - **Feature extraction**: reduce each record's pixel grid to a fixed
//!   three-value summary ([`features`])
//! - **Outlier detection**: K-Means clustering over the fleet's feature
//!   set, flagging the minority cluster ([`cluster`])
//! - **Fleet analysis**: the two stages combined with per-record fault
//!   isolation ([`fleet`])
//!
//! Flagged records are a first-pass anomaly signal - scanner calibration
//! drift, wrong reconstruction parameters, or corruption in transfer -
//! not a diagnostic conclusion.

pub mod cluster;
pub mod features;
pub mod fleet;

pub use cluster::{detect, ClusterAssignment};
pub use features::{extract, FeatureVector};
pub use fleet::{analyze_fleet, FleetAnalysis, SkippedRecord};
