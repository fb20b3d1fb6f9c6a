//! Sanitization policy
//!
//! Declarative set of per-field rules applied before a record may leave
//! the mobile unit. A rule is one of:
//! - **Remove** - delete the field entirely
//! - **ReplaceWithPlaceholder** - overwrite an existing value with a
//!   neutral marker (`"ANONYMOUS"`, `"19000101"`, ...)
//! - **StampProvenance** - set a field unconditionally, whether or not it
//!   existed (de-identification markers, origin tag)
//!
//! Each policy also carries a *sensitive set*: field names that must be
//! absent or equal to their placeholder after sanitization. The sanitizer
//! verifies this set on every run and fails the record on any survivor.
//!
//! The [`SanitizationPolicy::basic_confidentiality`] preset covers the
//! field subset of the DICOM basic application-level confidentiality
//! profile. It does not scrub burned-in annotations or remap instance
//! UIDs, and has not been audited for formal HIPAA/GDPR compliance.

use mdg_common::config::SanitizationConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Action applied to one metadata field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagAction {
    /// Delete the field entirely
    Remove,
    /// Overwrite an existing value with the given placeholder.
    /// An absent field stays absent.
    ReplaceWithPlaceholder(String),
    /// Set the field to the given value whether or not it existed
    StampProvenance(String),
}

/// Immutable rule set, loaded once per run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SanitizationPolicy {
    rules: BTreeMap<String, TagAction>,
    sensitive: BTreeSet<String>,
    provenance_field: Option<String>,
}

impl SanitizationPolicy {
    /// Empty policy: no rules, no sensitive fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove `field` and verify it is absent afterwards.
    pub fn remove(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.sensitive.insert(field.clone());
        self.rules.insert(field, TagAction::Remove);
        self
    }

    /// Replace `field` with `placeholder` and verify it holds nothing else
    /// afterwards.
    pub fn replace(mut self, field: impl Into<String>, placeholder: impl Into<String>) -> Self {
        let field = field.into();
        self.sensitive.insert(field.clone());
        self.rules
            .insert(field, TagAction::ReplaceWithPlaceholder(placeholder.into()));
        self
    }

    /// Unconditionally set `field` to `value` (de-identification markers).
    pub fn stamp(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.rules
            .insert(field.into(), TagAction::StampProvenance(value.into()));
        self
    }

    /// Designate `field` as the origin tag and stamp it with `value`.
    /// The stamped value becomes the provenance carried by every
    /// sanitized record.
    pub fn stamp_provenance(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        let field = field.into();
        self.provenance_field = Some(field.clone());
        self.rules
            .insert(field, TagAction::StampProvenance(value.into()));
        self
    }

    /// Add `field` to the verification set without attaching a rule.
    /// Useful to assert that a field the source should never emit is in
    /// fact absent.
    pub fn mark_sensitive(mut self, field: impl Into<String>) -> Self {
        self.sensitive.insert(field.into());
        self
    }

    /// Build a policy from the gateway configuration: sensitive fields
    /// with a configured placeholder are replaced, the rest removed, and
    /// the configured provenance tag is stamped with the station name.
    pub fn from_config(config: &SanitizationConfig) -> Self {
        let mut policy = Self::new();
        for field in &config.sensitive_fields {
            policy = match config.placeholder_values.get(field) {
                Some(placeholder) => policy.replace(field.clone(), placeholder.clone()),
                None => policy.remove(field.clone()),
            };
        }
        // Placeholders for fields not listed as sensitive still count
        for (field, placeholder) in &config.placeholder_values {
            if !policy.rules.contains_key(field) {
                policy = policy.replace(field.clone(), placeholder.clone());
            }
        }
        policy.stamp_provenance(config.provenance_field.clone(), config.station_name.clone())
    }

    /// Field subset of the DICOM basic application-level confidentiality
    /// profile: identity/physician/institution tags removed, date and time
    /// tags neutralized, de-identification markers and the origin tag
    /// stamped.
    pub fn basic_confidentiality(station_name: impl Into<String>) -> Self {
        const REMOVE: &[&str] = &[
            "PatientBirthDate",
            "PatientSex",
            "PatientAge",
            "PatientAddress",
            "PatientTelephoneNumbers",
            "OtherPatientIDs",
            "OtherPatientNames",
            "ReferringPhysicianName",
            "ReferringPhysicianAddress",
            "ReferringPhysicianTelephoneNumbers",
            "InstitutionName",
            "InstitutionAddress",
            "InstitutionalDepartmentName",
            "PerformingPhysicianName",
            "OperatorsName",
            "NameOfPhysiciansReadingStudy",
            "RequestingPhysician",
            "ScheduledPerformingPhysicianName",
            "AccessionNumber",
            "StudyID",
            "DeviceSerialNumber",
            "RequestedProcedureID",
        ];
        // Dates shift to 1900-01-01 and times to midnight so the header
        // stays syntactically valid for downstream consumers.
        const REPLACE: &[(&str, &str)] = &[
            ("PatientName", "ANONYMOUS"),
            ("PatientID", "00000"),
            ("StudyDate", "19000101"),
            ("SeriesDate", "19000101"),
            ("AcquisitionDate", "19000101"),
            ("ContentDate", "19000101"),
            ("StudyTime", "000000"),
            ("SeriesTime", "000000"),
            ("AcquisitionTime", "000000"),
            ("ContentTime", "000000"),
        ];

        let mut policy = Self::new();
        for &field in REMOVE {
            policy = policy.remove(field);
        }
        for &(field, placeholder) in REPLACE {
            policy = policy.replace(field, placeholder);
        }
        policy
            .stamp("PatientIdentityRemoved", "YES")
            .stamp(
                "DeidentificationMethod",
                "Basic confidentiality profile subset. No UID remap, no pixel scrub.",
            )
            .stamp_provenance("StationName", station_name)
    }

    /// Iterate over all rules in field order.
    pub fn rules(&self) -> impl Iterator<Item = (&String, &TagAction)> {
        self.rules.iter()
    }

    /// Fields that must be absent or hold their placeholder after
    /// sanitization.
    pub fn sensitive_fields(&self) -> impl Iterator<Item = &String> {
        self.sensitive.iter()
    }

    /// Placeholder a sensitive field is allowed to hold (None for fields
    /// that must be absent).
    pub fn placeholder_for(&self, field: &str) -> Option<&str> {
        match self.rules.get(field) {
            Some(TagAction::ReplaceWithPlaceholder(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Value stamped into the designated origin tag, if one is configured.
    pub fn provenance_value(&self) -> Option<&str> {
        let field = self.provenance_field.as_deref()?;
        match self.rules.get(field) {
            Some(TagAction::StampProvenance(value)) => Some(value.as_str()),
            _ => None,
        }
    }
}
