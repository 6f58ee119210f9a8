//! Field catalog resolution
//!
//! Fetches one page of the CRM field listing and shapes it into an id-keyed
//! map. Pagination is left to the caller: the page metadata (`count`,
//! `offset`, `limit`) is returned so another page can be requested.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::core::{Decoded, UpstreamFetch};
use crate::error::{Result, ServiceError};
use crate::services::common::{fields_path, MAX_FIELDS_PAGE};
use crate::util::{non_empty_text, stringify_id};

/// Definition of one custom field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    /// Field id, stringified
    #[serde(skip)]
    pub id: String,

    /// Display title, trimmed (may be empty)
    pub title: String,

    /// Machine alias, if the field has one
    pub perstag: Option<String>,

    /// Field type, if reported
    #[serde(rename = "type")]
    pub field_type: Option<String>,
}

/// Field id → definition
pub type FieldCatalog = BTreeMap<String, FieldDefinition>;

/// One resolved page of the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogPage {
    /// Number of fields on this page
    pub count: usize,

    /// Offset that was requested
    pub offset: u64,

    /// Page size that was requested (after capping)
    pub limit: u32,

    /// Definitions keyed by field id
    pub map: FieldCatalog,
}

/// Shape a field listing body into a catalog
///
/// A body without a `fields` array (or a raw, non-JSON body) yields an empty
/// catalog. Later duplicates of an id replace earlier ones.
pub fn build_catalog(body: &Decoded) -> FieldCatalog {
    let mut catalog = FieldCatalog::new();

    for field in body.array("fields") {
        let Some(id) = field.get("id").and_then(stringify_id) else {
            continue;
        };

        let title = field
            .get("title")
            .and_then(Value::as_str)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        let definition = FieldDefinition {
            id: id.clone(),
            title,
            perstag: field.get("perstag").and_then(non_empty_text),
            field_type: field.get("type").and_then(non_empty_text),
        };

        catalog.insert(id, definition);
    }

    catalog
}

/// Resolves catalog pages through an upstream fetcher
pub struct FieldCatalogResolver<F> {
    fetcher: F,
    timeout: Duration,
}

impl<F: UpstreamFetch> FieldCatalogResolver<F> {
    /// Create a resolver with a per-call deadline
    pub fn new(fetcher: F, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Fetch one page of at most 200 fields starting at `offset`
    ///
    /// Transport failures and non-2xx answers are errors: without a catalog
    /// there is nothing to resolve field ids against.
    pub async fn resolve(&self, limit: u32, offset: u64) -> Result<CatalogPage> {
        let limit = limit.min(MAX_FIELDS_PAGE);
        let result = self.fetcher.fetch(&fields_path(limit, offset), self.timeout).await?;

        if !result.ok {
            return Err(ServiceError::upstream_http(result.status, result.body.into_value()));
        }

        let map = build_catalog(&result.body);
        debug!(count = map.len(), offset, limit, "resolved field catalog page");

        Ok(CatalogPage {
            count: map.len(),
            offset,
            limit,
            map,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_catalog_shapes_definitions() {
        let body = Decoded::Json(json!({
            "fields": [
                { "id": "5", "title": "  Full Name ", "perstag": "FULLNAME", "type": "text" },
                { "id": 7, "title": "Notes", "perstag": "", "type": null }
            ]
        }));

        let catalog = build_catalog(&body);
        assert_eq!(catalog.len(), 2);

        let full_name = &catalog["5"];
        assert_eq!(full_name.title, "Full Name");
        assert_eq!(full_name.perstag.as_deref(), Some("FULLNAME"));
        assert_eq!(full_name.field_type.as_deref(), Some("text"));

        let notes = &catalog["7"];
        assert_eq!(notes.id, "7");
        assert!(notes.perstag.is_none());
        assert!(notes.field_type.is_none());
    }

    #[test]
    fn test_build_catalog_empty_fields() {
        assert!(build_catalog(&Decoded::Json(json!({ "fields": [] }))).is_empty());
        assert!(build_catalog(&Decoded::Json(json!({}))).is_empty());
        assert!(build_catalog(&Decoded::Raw("oops".into())).is_empty());
    }

    #[test]
    fn test_catalog_page_serializes_map_shape() {
        let body = Decoded::Json(json!({ "fields": [{ "id": "1", "title": "Phone" }] }));
        let page = CatalogPage {
            count: 1,
            offset: 0,
            limit: 200,
            map: build_catalog(&body),
        };

        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(
            value,
            json!({
                "count": 1,
                "offset": 0,
                "limit": 200,
                "map": { "1": { "title": "Phone", "perstag": null, "type": null } }
            })
        );
    }
}
