//! Contact normalization
//!
//! Merges raw custom-field values with the field catalog and flattens list
//! memberships into a stable contact projection.
//!
//! Every field value is written under its title (or its raw field id when the
//! catalog has no title for it). When the catalog also defines a perstag the
//! value is written a second time under that perstag. Perstags are the stable
//! machine keys, but not every field has one, so the title-keyed map is always
//! complete. Entries without a field id are dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::FieldCatalog;
use crate::util::{canonical_text, stringify_id};

/// List status meaning "subscribed"
pub const STATUS_SUBSCRIBED: &str = "1";

/// List status meaning "unsubscribed"
pub const STATUS_UNSUBSCRIBED: &str = "2";

/// One raw entry of the `fieldValues` array
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FieldValueEntry {
    /// Field id (string or number upstream)
    #[serde(default)]
    pub field: Value,

    /// Stored value, passed through untouched
    #[serde(default)]
    pub value: Value,
}

/// One raw entry of the `contactLists` array
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContactListEntry {
    /// List id
    #[serde(default)]
    pub list: Value,

    /// Membership status
    #[serde(default)]
    pub status: Value,

    /// Last update time
    #[serde(default)]
    pub updated_timestamp: Value,

    /// Legacy name of the last update time
    #[serde(default)]
    pub udate: Value,
}

impl FieldValueEntry {
    /// Parse entries leniently; entries that are not objects become empty
    pub fn parse_all(values: &[Value]) -> Vec<Self> {
        values
            .iter()
            .map(|v| serde_json::from_value(v.clone()).unwrap_or_default())
            .collect()
    }

    /// Stringified field id, `None` when absent or empty
    pub fn field_id(&self) -> Option<String> {
        stringify_id(&self.field)
    }
}

impl ContactListEntry {
    /// Parse entries leniently; entries that are not objects become empty
    pub fn parse_all(values: &[Value]) -> Vec<Self> {
        values
            .iter()
            .map(|v| serde_json::from_value(v.clone()).unwrap_or_default())
            .collect()
    }
}

/// Normalized list membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMembership {
    /// List id as text
    pub list_id: String,

    /// Status as text: "1" subscribed, "2" unsubscribed, anything else verbatim
    pub status: String,

    /// Last update time, if known
    pub updated: Option<String>,
}

impl ListMembership {
    /// True for the subscribed status
    pub fn is_subscribed(&self) -> bool {
        self.status == STATUS_SUBSCRIBED
    }

    /// True for the unsubscribed status
    pub fn is_unsubscribed(&self) -> bool {
        self.status == STATUS_UNSUBSCRIBED
    }
}

impl From<&ContactListEntry> for ListMembership {
    fn from(entry: &ContactListEntry) -> Self {
        Self {
            list_id: canonical_text(&entry.list),
            status: canonical_text(&entry.status),
            updated: stringify_id(&entry.updated_timestamp).or_else(|| stringify_id(&entry.udate)),
        }
    }
}

/// Normalized contact projection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedContact {
    /// Contact id as requested
    pub contact_id: String,

    /// Values keyed by perstag (only fields that have one)
    pub custom_fields: BTreeMap<String, Value>,

    /// Values keyed by title, falling back to the field id
    pub custom_fields_by_title: BTreeMap<String, Value>,

    /// Memberships in upstream order
    pub lists: Vec<ListMembership>,
}

/// Builds `NormalizedContact` projections
#[derive(Debug, Default, Clone, Copy)]
pub struct Normalizer;

impl Normalizer {
    /// Create a normalizer
    pub fn new() -> Self {
        Self
    }

    /// Project raw field values and memberships onto the catalog
    pub fn normalize(
        &self,
        contact_id: &str,
        field_values: &[FieldValueEntry],
        catalog: &FieldCatalog,
        memberships: &[ContactListEntry],
    ) -> NormalizedContact {
        let mut custom_fields = BTreeMap::new();
        let mut custom_fields_by_title = BTreeMap::new();

        for entry in field_values {
            // nothing to key an entry without a field id by
            let Some(field_id) = entry.field_id() else {
                continue;
            };
            let definition = catalog.get(&field_id);

            if let Some(perstag) = definition.and_then(|d| d.perstag.as_deref()) {
                custom_fields.insert(perstag.to_string(), entry.value.clone());
            }

            let key = definition
                .map(|d| d.title.as_str())
                .filter(|title| !title.is_empty())
                .map(str::to_string)
                .unwrap_or(field_id);

            custom_fields_by_title.insert(key, entry.value.clone());
        }

        NormalizedContact {
            contact_id: contact_id.to_string(),
            custom_fields,
            custom_fields_by_title,
            lists: memberships.iter().map(ListMembership::from).collect(),
        }
    }
}
