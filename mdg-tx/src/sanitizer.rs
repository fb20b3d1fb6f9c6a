//! Tag sanitizer
//!
//! Applies a [`SanitizationPolicy`] to one record. Pure and idempotent:
//! the input record is never touched, and re-sanitizing an already-clean
//! record yields the identical result (rules matching their placeholder
//! are no-ops).
//!
//! After the rules run, a verification pass walks the policy's sensitive
//! set. Any sensitive field still holding something other than its
//! placeholder fails the record with `Error::PolicyViolation` - a survivor
//! is never silently ignored.

use mdg_common::{Error, Record, Result, SanitizedRecord, TagValue};
use tracing::{debug, warn};

use crate::policy::{SanitizationPolicy, TagAction};

/// De-identify one record under `policy`.
///
/// # Errors
/// Returns `Error::PolicyViolation` naming the first sensitive field that
/// survived with an original value. The violation is fatal for this record
/// only; callers processing a batch record the outcome and continue.
pub fn sanitize(record: &Record, policy: &SanitizationPolicy) -> Result<SanitizedRecord> {
    let mut tags = record.tags.clone();

    for (field, action) in policy.rules() {
        match action {
            TagAction::Remove => {
                if tags.remove(field).is_some() {
                    debug!(record_id = %record.id, field = %field, "Removed tag");
                }
            }
            TagAction::ReplaceWithPlaceholder(placeholder) => {
                if tags.contains_key(field) {
                    tags.insert(field.clone(), TagValue::text(placeholder.clone()));
                    debug!(record_id = %record.id, field = %field, "Replaced tag with placeholder");
                }
            }
            TagAction::StampProvenance(value) => {
                tags.insert(field.clone(), TagValue::text(value.clone()));
            }
        }
    }

    // Verification pass: no sensitive field may survive with an original
    // value, regardless of which rule covered it.
    for field in policy.sensitive_fields() {
        if let Some(value) = tags.get(field) {
            let allowed = match (policy.placeholder_for(field), value) {
                (Some(placeholder), TagValue::Text(text)) => text == placeholder,
                _ => false,
            };
            if !allowed {
                warn!(
                    record_id = %record.id,
                    field = %field,
                    "Sensitive field survived sanitization"
                );
                return Err(Error::PolicyViolation {
                    field: field.clone(),
                });
            }
        }
    }

    let cleaned = Record {
        id: record.id.clone(),
        tags,
        image: record.image.clone(),
        station_id: record.station_id.clone(),
    };
    let provenance = policy.provenance_value().unwrap_or_default();
    Ok(SanitizedRecord::new(cleaned, provenance))
}
