//! Extension manifest declaration and parsing.

use serde::{Deserialize, Serialize};

/// Declarative extension manifest as published in the catalog.
///
/// Unknown manifest fields are ignored; only the fields used by activation and
/// script resolution are modeled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Script entry point reference, resolved by the host before loading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Activation predicates (`*` or `onLanguage:<id>`), in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_events: Option<Vec<String>>,
}

impl ExtensionManifest {
    /// Parses raw manifest JSON text returned by the catalog.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Builds a manifest with a script url and activation events.
    pub fn new<I, S>(url: impl Into<String>, activation_events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            url: Some(url.into()),
            activation_events: Some(activation_events.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Declared activation events; absent and empty lists look the same.
    pub fn activation_events(&self) -> &[String] {
        self.activation_events.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::ExtensionManifest;

    #[test]
    fn parses_camel_case_manifest() {
        let manifest = ExtensionManifest::parse(
            r#"{"title":"Go","url":"https://ext/go.js","activationEvents":["onLanguage:go"],"contributes":{}}"#,
        )
        .expect("manifest should parse");
        assert_eq!(manifest.title.as_deref(), Some("Go"));
        assert_eq!(manifest.url.as_deref(), Some("https://ext/go.js"));
        assert_eq!(manifest.activation_events(), ["onLanguage:go".to_string()]);
    }

    #[test]
    fn missing_activation_events_reads_as_empty() {
        let manifest = ExtensionManifest::parse("{}").expect("empty manifest should parse");
        assert!(manifest.activation_events().is_empty());
        assert!(manifest.url.is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(ExtensionManifest::parse("{\"activationEvents\": 3}").is_err());
    }
}
