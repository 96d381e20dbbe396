//! Provider manifest format (`provider.toml`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderScope {
    Builtin,
    User,
    Project,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderManifest {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub url_patterns: Vec<String>,
    #[serde(default)]
    pub requires_env: Vec<String>,
    #[serde(default)]
    pub config_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub wasm_module: Option<String>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

impl ProviderManifest {
    /// Parse a `provider.toml` document.
    pub fn from_toml(src: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_manifest() {
        let toml = r#"
            name = "serpapi"
            url_patterns = ["*.google.com/search*"]
        "#;
        let manifest = ProviderManifest::from_toml(toml).unwrap();
        assert_eq!(manifest.name, "serpapi");
        assert_eq!(manifest.version, "0.0.0");
        assert_eq!(manifest.url_patterns, vec!["*.google.com/search*"]);
    }

    #[test]
    fn rejects_missing_name() {
        let toml = r#"url_patterns = ["*"]"#;
        assert!(ProviderManifest::from_toml(toml).is_err());
    }
}
