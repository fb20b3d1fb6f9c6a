//! Fleet analysis
//!
//! Combines feature extraction and outlier detection over a set of
//! delivered records. Extraction failures are isolated per record: the
//! record is skipped with a warning and listed in the result, and the
//! rest of the fleet is still analyzed.

use mdg_common::{Record, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cluster::{detect, ClusterAssignment};
use crate::features::{extract, FeatureVector};

/// A record left out of the analysis, and why
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub record_id: String,
    pub reason: String,
}

/// Outcome of one fleet QC pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetAnalysis {
    /// Feature vectors that entered clustering, in input order
    pub vectors: Vec<FeatureVector>,
    pub assignment: ClusterAssignment,
    /// Records dropped before clustering
    pub skipped: Vec<SkippedRecord>,
}

impl FleetAnalysis {
    /// Record ids flagged as anomalous
    pub fn flagged_records(&self) -> Vec<&str> {
        self.assignment.outlier_ids()
    }
}

/// Extract features for every record and cluster the fleet into `k`
/// groups.
///
/// # Errors
/// Propagates `Error::InsufficientData` when fewer than `k` records
/// survive extraction, and `Error::InvalidInput` for `k = 0`.
pub fn analyze_fleet<'a, I>(records: I, k: usize) -> Result<FleetAnalysis>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut vectors: Vec<FeatureVector> = Vec::new();
    let mut skipped: Vec<SkippedRecord> = Vec::new();

    for record in records {
        match extract(record) {
            Ok(vector) => vectors.push(vector),
            Err(error) => {
                warn!(
                    record_id = %record.id,
                    error = %error,
                    "Skipping record in fleet analysis"
                );
                skipped.push(SkippedRecord {
                    record_id: record.id.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    let assignment = detect(&vectors, k)?;
    info!(
        analyzed = vectors.len(),
        skipped = skipped.len(),
        flagged = assignment.outlier_ids().len(),
        "Fleet analysis complete"
    );

    Ok(FleetAnalysis {
        vectors,
        assignment,
        skipped,
    })
}
