//! Font catalog types

use crate::{FontError, Result};
use serde::{Deserialize, Serialize};

/// One selectable typeface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontDescriptor {
    pub family: String,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
}

impl FontDescriptor {
    pub fn new(family: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            download_url: download_url.into(),
        }
    }
}

/// Where the font catalog is fetched from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FontSource {
    /// Catalog endpoint, e.g. `https://api.example.com/v2/font?activeOnly=true`
    pub endpoint: String,
    /// Sent as `x-api-key` when set
    pub api_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogBody {
    Bare(Vec<FontDescriptor>),
    Wrapped {
        #[serde(default)]
        data: Option<Vec<FontDescriptor>>,
    },
}

/// Parse a catalog body: `{"data": [...]}` or a bare array.
///
/// A wrapped body without `data` (or with `data: null`) is an empty catalog.
pub fn parse_catalog(body: &[u8]) -> Result<Vec<FontDescriptor>> {
    let parsed: CatalogBody =
        serde_json::from_slice(body).map_err(|e| FontError::Catalog(e.to_string()))?;

    let mut fonts = match parsed {
        CatalogBody::Wrapped { data } => data.unwrap_or_default(),
        CatalogBody::Bare(fonts) => fonts,
    };
    fonts.retain(|f| !f.family.trim().is_empty() && !f.download_url.trim().is_empty());
    Ok(fonts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrapped_catalog() {
        let body = br#"{"data":[{"family":"Anton","downloadUrl":"https://f.test/anton.ttf","_id":"1"}]}"#;
        assert_eq!(
            parse_catalog(body).unwrap(),
            vec![FontDescriptor::new("Anton", "https://f.test/anton.ttf")]
        );
    }

    #[test]
    fn test_parse_bare_catalog() {
        let body = br#"[{"family":"Roboto","downloadUrl":"https://f.test/roboto.ttf"}]"#;
        assert_eq!(parse_catalog(body).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_data_is_empty() {
        assert!(parse_catalog(br#"{"data":null}"#).unwrap().is_empty());
        assert!(parse_catalog(br#"{"message":"ok"}"#).unwrap().is_empty());
    }

    #[test]
    fn test_blank_entries_dropped() {
        let body = br#"[{"family":"","downloadUrl":"u"},{"family":"A","downloadUrl":" "}]"#;
        assert!(parse_catalog(body).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(parse_catalog(b"<html>").is_err());
    }
}
