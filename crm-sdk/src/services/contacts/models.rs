//! Response models for the contact use cases

use serde::Serialize;
use serde_json::Value;

use crate::normalize::NormalizedContact;

/// Raw contact bundle: base record, field values and list memberships
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactBundleView {
    /// Base contact record body
    pub contact: Value,

    /// Field values body
    pub field_values: Value,

    /// List memberships body
    pub contact_lists: Value,

    /// Upstream status per call
    pub meta: ContactBundleMeta,
}

/// Status metadata of a contact bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactBundleMeta {
    pub contact_status: u16,
    pub field_values_status: u16,
    pub contact_lists_status: u16,
}

/// Full contact: required bodies plus a best-effort base record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullContactView {
    /// Field values body
    pub field_values: Value,

    /// List memberships body
    pub contact_lists: Value,

    /// Base contact record body, `null` when the call was skipped
    pub contact_base: Value,

    /// Upstream status per call and degradation details
    pub meta: FullContactMeta,
}

/// Status metadata of a full contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullContactMeta {
    pub field_values_status: u16,
    pub contact_lists_status: u16,

    /// 0 when the base record call was skipped
    pub contact_base_status: u16,

    pub contact_base_skipped: bool,

    /// Failure detail of a skipped base record call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_base_error: Option<String>,
}

/// Normalized contact plus input counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedContactView {
    /// The projection itself
    #[serde(flatten)]
    pub contact: NormalizedContact,

    /// Sizes of the raw inputs
    pub meta: NormalizedMeta,
}

/// Input counts of a normalized contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMeta {
    /// Number of raw field-value entries
    pub field_values_count: usize,

    /// Number of raw list-membership entries
    pub lists_count: usize,
}
