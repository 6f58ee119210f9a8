//! Contact use cases
//!
//! Each use case is a declarative aggregate plan plus the post-processing of
//! its named results:
//!
//! - contact bundle: base record, field values and list memberships, all
//!   required, concurrent
//! - full contact: field values and list memberships required, base record
//!   optional and heavy, so it runs last and degrades on failure
//! - normalized contact: field values, list memberships and one catalog page,
//!   all required and concurrent, merged by the `Normalizer`
//! - field catalog: one page through the `FieldCatalogResolver`

mod models;
pub use models::*;

use crate::aggregate::{AggregatePlan, Aggregation, Aggregator, UpstreamRequestSpec};
use crate::catalog::{build_catalog, CatalogPage, FieldCatalogResolver};
use crate::config::TimeoutConfig;
use crate::core::{UpstreamFetch, UpstreamResult};
use crate::error::{Result, ServiceError};
use crate::normalize::{ContactListEntry, FieldValueEntry, Normalizer};
use crate::services::common::{
    contact_lists_path, contact_path, field_values_path, fields_path, MAX_FIELDS_PAGE,
};

/// Base contact record call
pub const CALL_CONTACT: &str = "contact";

/// Field values call
pub const CALL_FIELD_VALUES: &str = "fieldValues";

/// List memberships call
pub const CALL_CONTACT_LISTS: &str = "contactLists";

/// Field catalog call
pub const CALL_FIELDS: &str = "fields";

/// Plan for the raw contact bundle
pub fn contact_bundle_plan(contact_id: &str, timeouts: &TimeoutConfig) -> AggregatePlan {
    let timeout = TimeoutConfig::duration(timeouts.contact_ms);

    AggregatePlan::concurrent(vec![
        UpstreamRequestSpec::required(CALL_CONTACT, contact_path(contact_id), timeout),
        UpstreamRequestSpec::required(CALL_FIELD_VALUES, field_values_path(contact_id), timeout),
        UpstreamRequestSpec::required(CALL_CONTACT_LISTS, contact_lists_path(contact_id), timeout),
    ])
}

/// Plan for the full contact view
pub fn full_contact_plan(contact_id: &str, timeouts: &TimeoutConfig) -> AggregatePlan {
    let required = TimeoutConfig::duration(timeouts.full_required_ms);
    let base = TimeoutConfig::duration(timeouts.full_base_ms);

    AggregatePlan::auto(vec![
        UpstreamRequestSpec::optional(CALL_CONTACT, contact_path(contact_id), base).heavy(),
        UpstreamRequestSpec::required(CALL_FIELD_VALUES, field_values_path(contact_id), required),
        UpstreamRequestSpec::required(CALL_CONTACT_LISTS, contact_lists_path(contact_id), required),
    ])
}

/// Plan for the normalized contact view
pub fn normalized_plan(contact_id: &str, timeouts: &TimeoutConfig) -> AggregatePlan {
    let timeout = TimeoutConfig::duration(timeouts.normalized_ms);

    AggregatePlan::auto(vec![
        UpstreamRequestSpec::required(CALL_FIELD_VALUES, field_values_path(contact_id), timeout),
        UpstreamRequestSpec::required(CALL_CONTACT_LISTS, contact_lists_path(contact_id), timeout),
        UpstreamRequestSpec::required(CALL_FIELDS, fields_path(MAX_FIELDS_PAGE, 0), timeout),
    ])
}

/// Reject a missing or empty contact id before any upstream call
pub fn require_contact_id(contact_id: Option<&str>) -> Result<&str> {
    contact_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServiceError::validation("Missing id"))
}

/// Contact use cases over one fetcher
pub struct ContactService<F> {
    aggregator: Aggregator<F>,
    timeouts: TimeoutConfig,
    normalizer: Normalizer,
}

impl<F: UpstreamFetch> ContactService<F> {
    /// Create a service
    pub fn new(fetcher: F, timeouts: TimeoutConfig) -> Self {
        Self {
            aggregator: Aggregator::new(fetcher),
            timeouts,
            normalizer: Normalizer::new(),
        }
    }

    /// Timeouts in use
    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    /// Base record, field values and list memberships as returned upstream
    pub async fn contact_bundle(&self, contact_id: &str) -> Result<ContactBundleView> {
        let contact_id = require_contact_id(Some(contact_id))?;
        let plan = contact_bundle_plan(contact_id, &self.timeouts);
        let mut results = self.aggregator.aggregate(&plan).await?;

        let contact = take(&mut results, CALL_CONTACT)?;
        let field_values = take(&mut results, CALL_FIELD_VALUES)?;
        let contact_lists = take(&mut results, CALL_CONTACT_LISTS)?;

        Ok(ContactBundleView {
            meta: ContactBundleMeta {
                contact_status: contact.status,
                field_values_status: field_values.status,
                contact_lists_status: contact_lists.status,
            },
            contact: contact.body.into_value(),
            field_values: field_values.body.into_value(),
            contact_lists: contact_lists.body.into_value(),
        })
    }

    /// Field values and memberships, plus the base record when it arrives in time
    pub async fn full_contact(&self, contact_id: &str) -> Result<FullContactView> {
        let contact_id = require_contact_id(Some(contact_id))?;
        let plan = full_contact_plan(contact_id, &self.timeouts);
        let mut results = self.aggregator.aggregate(&plan).await?;

        let field_values = take(&mut results, CALL_FIELD_VALUES)?;
        let contact_lists = take(&mut results, CALL_CONTACT_LISTS)?;
        let base = take(&mut results, CALL_CONTACT)?;

        Ok(FullContactView {
            meta: FullContactMeta {
                field_values_status: field_values.status,
                contact_lists_status: contact_lists.status,
                contact_base_status: base.status,
                contact_base_skipped: base.skipped,
                contact_base_error: base.error.clone(),
            },
            field_values: field_values.body.into_value(),
            contact_lists: contact_lists.body.into_value(),
            contact_base: base.body_value().unwrap_or_default(),
        })
    }

    /// Field values resolved against the catalog, plus list memberships
    ///
    /// A non-2xx answer from any of the three calls fails the operation with
    /// `RequiredCallFailed` wrapping `UpstreamHttp`, checked in the order
    /// field values, list memberships, catalog.
    pub async fn normalized_contact(&self, contact_id: &str) -> Result<NormalizedContactView> {
        let contact_id = require_contact_id(Some(contact_id))?;
        let plan = normalized_plan(contact_id, &self.timeouts);
        let mut results = self.aggregator.aggregate(&plan).await?;

        let field_values = take(&mut results, CALL_FIELD_VALUES)?;
        let contact_lists = take(&mut results, CALL_CONTACT_LISTS)?;
        let fields = take(&mut results, CALL_FIELDS)?;

        for (call, result) in [
            (CALL_FIELD_VALUES, &field_values),
            (CALL_CONTACT_LISTS, &contact_lists),
            (CALL_FIELDS, &fields),
        ] {
            if !result.ok {
                return Err(ServiceError::required_call_failed(
                    call,
                    ServiceError::upstream_http(result.status, result.body.to_value()),
                ));
            }
        }

        let values = FieldValueEntry::parse_all(field_values.body.array("fieldValues"));
        let memberships = ContactListEntry::parse_all(contact_lists.body.array("contactLists"));
        let catalog = build_catalog(&fields.body);

        let contact = self.normalizer.normalize(contact_id, &values, &catalog, &memberships);

        Ok(NormalizedContactView {
            meta: NormalizedMeta {
                field_values_count: values.len(),
                lists_count: memberships.len(),
            },
            contact,
        })
    }

    /// One page of the field catalog
    pub async fn field_catalog(&self, limit: u32, offset: u64) -> Result<CatalogPage> {
        let timeout = TimeoutConfig::duration(self.timeouts.catalog_ms);
        FieldCatalogResolver::new(self.aggregator.fetcher(), timeout)
            .resolve(limit, offset)
            .await
    }
}

fn take(results: &mut Aggregation, call: &str) -> Result<UpstreamResult> {
    results
        .take(call)
        .ok_or_else(|| ServiceError::internal(format!("No result recorded for call '{}'", call)))
}
