//! Document selector: the declarative filter a model's References resolve
//! against before a step runs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processed,
    Failed,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Html,
    Pdf,
    Markdown,
    PlainText,
    Json,
}

/// Filters applied, in order, after the initial SQL fetch:
/// glob/substring filters first, then `limit`/`offset`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSelector {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub url_contains: Option<String>,
    #[serde(default)]
    pub url_glob: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
    #[serde(default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl DocumentSelector {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether this selector declares any glob-like filter that must be
    /// applied in-process after the SQL fetch (see `kurt_pipeline::filter`).
    #[must_use]
    pub fn has_post_fetch_filters(&self) -> bool {
        !self.include_globs.is_empty()
            || !self.exclude_globs.is_empty()
            || self.url_contains.is_some()
            || self.url_glob.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selector_has_no_post_fetch_filters() {
        assert!(!DocumentSelector::all().has_post_fetch_filters());
    }

    #[test]
    fn glob_selector_has_post_fetch_filters() {
        let sel = DocumentSelector {
            include_globs: vec!["docs/*".into()],
            ..Default::default()
        };
        assert!(sel.has_post_fetch_filters());
    }
}
