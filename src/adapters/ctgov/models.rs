//! Wire types for the ClinicalTrials.gov V2 API

use serde::Deserialize;
use serde_json::Value;

/// One page of the `/studies` endpoint
///
/// Studies stay opaque JSON here; validation into typed records happens
/// per-record downstream so one malformed study cannot poison a page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudiesPage {
    #[serde(default)]
    pub studies: Vec<Value>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_with_token() {
        let page: StudiesPage = serde_json::from_value(json!({
            "studies": [{"protocolSection": {}}, {"protocolSection": {}}],
            "nextPageToken": "abc123"
        }))
        .unwrap();

        assert_eq!(page.studies.len(), 2);
        assert_eq!(page.next_page_token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_terminal_page_has_no_token() {
        let page: StudiesPage = serde_json::from_value(json!({ "studies": [] })).unwrap();
        assert!(page.studies.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_extra_fields_tolerated() {
        let page: StudiesPage = serde_json::from_value(json!({
            "studies": [],
            "totalCount": 12345
        }))
        .unwrap();
        assert!(page.studies.is_empty());
    }
}
