//! Wire records returned by the CIS REST API.

use serde::Deserialize;

/// One page of `channel/?q=` search results.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelPage {
    /// Channel records on this page.
    #[serde(default)]
    pub results: Vec<ChannelRecord>,
    /// URL of the next page (`null` on the last page).
    #[serde(default)]
    pub next: Option<String>,
    /// Total number of matches, when the service reports it.
    #[serde(default)]
    pub count: Option<u64>,
}

/// A channel entry as served by the API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChannelRecord {
    /// Full channel name.
    pub name: String,
    /// Samples per second.
    #[serde(default)]
    pub datarate: Option<f64>,
    /// Physical unit.
    #[serde(default)]
    pub units: Option<String>,
    /// Integer data-type code.
    #[serde(default)]
    pub datatype: Option<i64>,
    /// Browser URL.
    #[serde(default)]
    pub displayurl: Option<String>,
    /// API URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Front-end model name.
    #[serde(default)]
    pub source: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub created: Option<String>,
    /// CIS id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Frame type.
    #[serde(default)]
    pub frametype: Option<String>,
}

/// A name-component description as served by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DescriptionRecord {
    /// Component name.
    pub name: String,
    /// Short text.
    #[serde(default)]
    pub desc: Option<String>,
    /// CIS id.
    #[serde(default)]
    pub id: Option<i64>,
    /// API URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Identity of the last editor.
    #[serde(default)]
    pub editor: Option<String>,
    /// Long text.
    #[serde(default)]
    pub text: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub created: Option<String>,
    /// Last modification timestamp.
    #[serde(default)]
    pub modified: Option<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn test_parse_channel_page_fixture() {
        // Arrange
        let json = include_str!("../../../fixtures/cis/channel_search_psl.json");

        // Act
        let page: ChannelPage = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(page.results.len(), 2);
        assert!(page.next.is_none());
        let first = &page.results[0];
        assert_eq!(first.name, "H1:PSL-ISS_PDA_OUT_DQ");
        assert_eq!(first.datatype, Some(4));
        assert_eq!(first.source.as_deref(), Some("H1PSLISS"));
    }

    #[test]
    fn test_parse_description_fixture() {
        // Arrange
        let json = include_str!("../../../fixtures/cis/descriptions_psl_iss_pda.json");

        // Act
        let records: Vec<DescriptionRecord> = serde_json::from_str(json).unwrap();

        // Assert
        assert!(records.iter().any(|r| r.name == "PSL"));
        let psl = records.iter().find(|r| r.name == "PSL").unwrap();
        assert_eq!(psl.desc.as_deref(), Some("Pre-Stabilized Laser"));
    }

    #[test]
    fn test_page_without_results_is_empty() {
        let page: ChannelPage = serde_json::from_str(r#"{"next": null}"#).unwrap();
        assert!(page.results.is_empty());
    }

    #[test]
    fn test_missing_name_is_named_in_error() {
        // Arrange & Act
        let err = serde_json::from_str::<ChannelRecord>(r#"{"datarate": 16384}"#).unwrap_err();

        // Assert
        assert!(err.to_string().contains("missing field `name`"));
    }

    #[test]
    fn test_mistyped_datarate_is_rejected() {
        let result = serde_json::from_str::<ChannelRecord>(r#"{"name": "H1:X", "datarate": "fast"}"#);
        assert!(result.is_err());
    }
}
