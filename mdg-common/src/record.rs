//! Imaging record model
//!
//! A [`Record`] is the unit of work for the whole gateway: an ordered tag
//! map (the metadata header), a 2-D pixel grid, and the identifier of the
//! station that produced it. Records are never mutated in place -
//! sanitization produces a new [`SanitizedRecord`] so the original and the
//! cleaned copy can never alias each other.
//!
//! Decoding records from an on-disk imaging format is the record source's
//! responsibility; the core only consumes already-decoded values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Error, Result};

/// A single metadata tag value.
///
/// Tag values are either human-readable text, a calendar date, or an
/// opaque binary blob (vendor-private payloads the gateway never inspects).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagValue {
    /// Free-text value (names, identifiers, descriptions)
    Text(String),
    /// Calendar date (study/acquisition dates)
    Date(NaiveDate),
    /// Opaque binary payload (vendor-private data)
    Binary(Vec<u8>),
}

impl TagValue {
    /// Convenience constructor for text values
    pub fn text(value: impl Into<String>) -> Self {
        TagValue::Text(value.into())
    }
}

/// Row-major 2-D pixel grid.
///
/// Pixel values are signed: CT data is expressed in Hounsfield-like units
/// where air sits near -1000 and dense bone above +1000.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGrid {
    width: usize,
    height: usize,
    pixels: Vec<i32>,
}

impl ImageGrid {
    /// Create a grid from row-major pixel data.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if `pixels.len() != width * height`.
    pub fn new(width: usize, height: usize, pixels: Vec<i32>) -> Result<Self> {
        if pixels.len() != width * height {
            return Err(Error::InvalidInput(format!(
                "pixel buffer length {} does not match {}x{} grid",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create a grid where every pixel holds `value`.
    pub fn uniform(width: usize, height: usize, value: i32) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width * height],
        }
    }

    /// Create a zero-sized grid (no pixel data).
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total pixel count
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Flattened row-major pixel data
    pub fn pixels(&self) -> &[i32] {
        &self.pixels
    }
}

/// One imaging record as handed over by the record source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier (instance UID or filename stem)
    pub id: String,
    /// Metadata header: tag name → value, ordered by tag name
    pub tags: BTreeMap<String, TagValue>,
    /// Pixel data
    pub image: ImageGrid,
    /// Identifier of the mobile unit that produced this record
    pub station_id: String,
}

impl Record {
    /// Create a record with an empty tag map.
    pub fn new(id: impl Into<String>, station_id: impl Into<String>, image: ImageGrid) -> Self {
        Self {
            id: id.into(),
            tags: BTreeMap::new(),
            image,
            station_id: station_id.into(),
        }
    }

    /// Builder-style tag insertion.
    pub fn with_tag(mut self, name: impl Into<String>, value: TagValue) -> Self {
        self.tags.insert(name.into(), value);
        self
    }

    /// Look up a tag by name.
    pub fn tag(&self, name: &str) -> Option<&TagValue> {
        self.tags.get(name)
    }
}

/// A record that has passed sanitization.
///
/// Produced only by the tag sanitizer; carries the cleaned record, the
/// `sanitized` marker, and the provenance value stamped during cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedRecord {
    record: Record,
    sanitized: bool,
    provenance: String,
}

impl SanitizedRecord {
    /// Wrap a cleaned record. Callers other than the sanitizer should not
    /// need this - receiving a `SanitizedRecord` is the signal that the
    /// policy verification pass succeeded.
    pub fn new(record: Record, provenance: impl Into<String>) -> Self {
        Self {
            record,
            sanitized: true,
            provenance: provenance.into(),
        }
    }

    /// Identifier of the underlying record
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// The cleaned record
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Consume the wrapper and return the cleaned record
    pub fn into_record(self) -> Record {
        self.record
    }

    /// Provenance value stamped during sanitization
    pub fn provenance(&self) -> &str {
        &self.provenance
    }

    pub fn is_sanitized(&self) -> bool {
        self.sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_rejects_mismatched_buffer() {
        let result = ImageGrid::new(2, 2, vec![1, 2, 3]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_uniform_grid() {
        let grid = ImageGrid::uniform(2, 2, 100);
        assert_eq!(grid.len(), 4);
        assert!(grid.pixels().iter().all(|&p| p == 100));
    }

    #[test]
    fn test_empty_grid() {
        let grid = ImageGrid::empty();
        assert!(grid.is_empty());
        assert_eq!(grid.width(), 0);
    }

    #[test]
    fn test_record_tag_lookup() {
        let record = Record::new("r1", "UNIT_01", ImageGrid::empty())
            .with_tag("PatientName", TagValue::text("Smith^John"));

        assert_eq!(
            record.tag("PatientName"),
            Some(&TagValue::text("Smith^John"))
        );
        assert_eq!(record.tag("PatientID"), None);
    }

    #[test]
    fn test_sanitized_record_marker() {
        let record = Record::new("r1", "UNIT_01", ImageGrid::empty());
        let sanitized = SanitizedRecord::new(record, "REMOTE_MOBILE_01");
        assert!(sanitized.is_sanitized());
        assert_eq!(sanitized.provenance(), "REMOTE_MOBILE_01");
        assert_eq!(sanitized.id(), "r1");
    }
}
