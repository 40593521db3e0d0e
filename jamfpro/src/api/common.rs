//! Common types and utilities for the Jamf Pro and Classic APIs

use serde::{Deserialize, Serialize};

/// Error body of the Jamf Pro API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub http_status: Option<u16>,
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorItem {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("API error details: {errors:?}")]
pub struct ApiErrorDetails {
    pub errors: Vec<ApiErrorItem>,
}

impl ApiErrorResponse {
    /// Joins the error descriptions, falling back to their codes
    pub fn message(&self) -> Option<String> {
        let parts: Vec<String> = self
            .errors
            .iter()
            .filter_map(|e| {
                let text = e.description.as_deref().or(e.code.as_deref())?;
                Some(match &e.field {
                    Some(field) if !field.is_empty() => format!("{} ({})", text, field),
                    _ => text.to_string(),
                })
            })
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

/// `{ "id": ..., "name": ... }` reference used throughout the Classic API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

impl NamedRef {
    /// The Classic API sends `{"id": -1, "name": "None"}` or zero values
    /// when nothing is assigned
    pub fn is_set(&self) -> bool {
        self.id > 0 || (!self.name.is_empty() && self.name != "None")
    }
}

/// Response to a Classic API create or update: `{"<kind>": {"id": N}}`
#[derive(Debug, Deserialize)]
pub struct CreatedId {
    pub id: i64,
}

/// Response to a Jamf Pro API create
#[derive(Debug, Deserialize)]
pub struct HrefResponse {
    pub id: String,
    #[serde(default)]
    pub href: Option<String>,
}

/// Paged list response of the Jamf Pro API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsPage<T> {
    pub total_count: u64,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// First page of `page_size` results
    pub fn first_page(self, page_size: u32) -> Self {
        self.add("page", 0).add("page-size", page_size)
    }

    /// RSQL equality filter, e.g. `name=="Engineering"`
    pub fn filter_eq(self, field: &str, value: &str) -> Self {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        self.add("filter", format!("{}==\"{}\"", field, escaped))
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Encodes a name for use as a path segment
pub fn path_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_encodes_filters() {
        let query = ApiQueryParams::new()
            .first_page(100)
            .filter_eq("name", "R&D \"Lab\"")
            .to_query_string();

        assert!(query.starts_with("?page=0&page-size=100&filter="));
        assert!(query.contains("name%3D%3D%22R%26D%20%5C%22Lab%5C%22%22"));
        assert_eq!(ApiQueryParams::new().to_query_string(), "");
    }

    #[test]
    fn error_response_message() {
        let body = r#"{"httpStatus":409,"errors":[{"code":"DUPLICATE_FIELD","field":"name","description":"duplicate name"}]}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.http_status, Some(409));
        assert_eq!(parsed.message().unwrap(), "duplicate name (name)");

        let empty: ApiErrorResponse = serde_json::from_str(r#"{"errors":[]}"#).unwrap();
        assert!(empty.message().is_none());
    }

    #[test]
    fn named_ref_unset_markers() {
        assert!(!NamedRef::default().is_set());
        assert!(!NamedRef {
            id: -1,
            name: "None".to_string()
        }
        .is_set());
        assert!(NamedRef {
            id: 3,
            name: "Paris".to_string()
        }
        .is_set());
    }

    #[test]
    fn path_segment_escapes_spaces() {
        assert_eq!(path_segment("Site Admins"), "Site%20Admins");
    }
}
