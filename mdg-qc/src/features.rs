//! Per-record feature extraction
//!
//! Reduces a record's pixel grid to three scalar features:
//! - **mean** - overall brightness; a scanner whose tube is losing power
//!   produces systematically darker images
//! - **spread** - population standard deviation; a deteriorating detector
//!   produces flat, low-contrast images
//! - **peak** - maximum value, usually cortical bone; an abnormally low
//!   peak points at under-exposure or miscalibration
//!
//! Deterministic and side-effect free. An empty grid is an
//! `InsufficientData` error, not a zero vector.

use mdg_common::{Error, Record, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed-size numeric summary of one record's image data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Identifier of the source record
    pub record_id: String,
    /// Arithmetic mean intensity
    pub mean: f64,
    /// Population standard deviation of intensity
    pub spread: f64,
    /// Maximum intensity
    pub peak: f64,
}

impl FeatureVector {
    /// Position on the QC clustering plane. Peak intensity is
    /// informational only and deliberately not a clustering axis.
    pub fn clustering_point(&self) -> [f64; 2] {
        [self.mean, self.spread]
    }
}

/// Compute the feature vector for one record.
///
/// # Errors
/// Returns `Error::InsufficientData` if the pixel grid is empty.
pub fn extract(record: &Record) -> Result<FeatureVector> {
    let pixels = record.image.pixels();
    if pixels.is_empty() {
        return Err(Error::InsufficientData(format!(
            "record '{}' has an empty pixel grid",
            record.id
        )));
    }

    let n = pixels.len() as f64;
    let mean = pixels.iter().map(|&p| f64::from(p)).sum::<f64>() / n;
    let variance = pixels
        .iter()
        .map(|&p| {
            let d = f64::from(p) - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let peak = pixels.iter().fold(i32::MIN, |acc, &p| acc.max(p));

    let vector = FeatureVector {
        record_id: record.id.clone(),
        mean,
        spread: variance.sqrt(),
        peak: f64::from(peak),
    };
    debug!(
        record_id = %record.id,
        mean = vector.mean,
        spread = vector.spread,
        peak = vector.peak,
        "Extracted features"
    );
    Ok(vector)
}
