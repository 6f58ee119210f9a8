//! Common utilities for service clients
//!
//! This module provides shared functionality for the contact service: client
//! identification and upstream path construction.

use std::fmt;

/// Largest page the field listing endpoint accepts
pub const MAX_FIELDS_PAGE: u32 = 200;

/// UserAgent structure for identifying the client to the upstream CRM
#[derive(Debug, Clone)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "contact-gateway".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: Some("crm-sdk".to_string()),
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Percent-encode an identifier for use as one path segment
///
/// Spaces become `%20` rather than `+`, so the result is safe inside a path.
pub fn encode_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Base contact record
pub fn contact_path(contact_id: &str) -> String {
    format!("/api/3/contacts/{}", encode_segment(contact_id))
}

/// Custom-field values of a contact
pub fn field_values_path(contact_id: &str) -> String {
    format!("/api/3/contacts/{}/fieldValues", encode_segment(contact_id))
}

/// List memberships of a contact
pub fn contact_lists_path(contact_id: &str) -> String {
    format!("/api/3/contacts/{}/contactLists", encode_segment(contact_id))
}

/// One page of the field catalog
pub fn fields_path(limit: u32, offset: u64) -> String {
    format!("/api/3/fields?limit={}&offset={}", limit.min(MAX_FIELDS_PAGE), offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("521850"), "521850");
        assert_eq!(encode_segment("a b/c?d"), "a%20b%2Fc%3Fd");
    }

    #[test]
    fn test_contact_paths() {
        assert_eq!(contact_path("42"), "/api/3/contacts/42");
        assert_eq!(field_values_path("4 2"), "/api/3/contacts/4%202/fieldValues");
        assert_eq!(contact_lists_path("42"), "/api/3/contacts/42/contactLists");
    }

    #[test]
    fn test_fields_path_caps_limit() {
        assert_eq!(fields_path(500, 0), "/api/3/fields?limit=200&offset=0");
        assert_eq!(fields_path(50, 400), "/api/3/fields?limit=50&offset=400");
    }

    #[test]
    fn test_user_agent_display() {
        let ua = UserAgent {
            app_name: "gateway".to_string(),
            version: "1.0".to_string(),
            extra: None,
        };
        assert_eq!(ua.to_string(), "gateway/1.0");
    }

    #[test]
    fn test_default_user_agent_names_gateway() {
        let ua = UserAgent::default().to_string();
        assert!(ua.starts_with("contact-gateway/"));
        assert!(ua.ends_with("(crm-sdk)"));
    }
}
