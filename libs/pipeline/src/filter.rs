//! Applies a `DocumentSelector`'s post-fetch filters (globs, substring,
//! limit/offset) to rows already pulled from Postgres.
//!
//! Anything the selector can express as SQL (`ids`, `cluster`, `status`,
//! `content_type`) belongs in the fetch query itself; this module only
//! covers what SQL can't: glob matching and the final limit/offset window.

use kurt_domain::selector::DocumentSelector;
use kurt_providers::glob::glob_match;

/// Minimal view a filtered row must expose; `Reference<T>` rows implement
/// this to be run through `apply`.
pub trait Filterable {
    fn id(&self) -> &str;
    fn url(&self) -> &str;
}

/// Apply `selector`'s glob/substring filters, then `limit`/`offset`, to
/// `rows`. Order is preserved; `rows` is assumed already sorted by the
/// caller's fetch query.
pub fn apply<T: Filterable>(selector: &DocumentSelector, rows: Vec<T>) -> Vec<T> {
    let mut filtered: Vec<T> = rows
        .into_iter()
        .filter(|row| passes_globs(selector, row))
        .collect();

    if let Some(offset) = selector.offset {
        let offset = offset.max(0) as usize;
        filtered = filtered.into_iter().skip(offset).collect();
    }
    if let Some(limit) = selector.limit {
        let limit = limit.max(0) as usize;
        filtered.truncate(limit);
    }
    filtered
}

fn passes_globs<T: Filterable>(selector: &DocumentSelector, row: &T) -> bool {
    if !selector.ids.is_empty() && !selector.ids.iter().any(|id| id == row.id()) {
        return false;
    }
    if !selector.include_globs.is_empty()
        && !selector.include_globs.iter().any(|g| glob_match(g, row.url()))
    {
        return false;
    }
    if selector
        .exclude_globs
        .iter()
        .any(|g| glob_match(g, row.url()))
    {
        return false;
    }
    if let Some(needle) = &selector.url_contains {
        if !row.url().contains(needle.as_str()) {
            return false;
        }
    }
    if let Some(pattern) = &selector.url_glob {
        if !glob_match(pattern, row.url()) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        id: String,
        url: String,
    }

    impl Filterable for Row {
        fn id(&self) -> &str {
            &self.id
        }
        fn url(&self) -> &str {
            &self.url
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                id: "1".into(),
                url: "https://a.com/docs/x".into(),
            },
            Row {
                id: "2".into(),
                url: "https://a.com/blog/y".into(),
            },
            Row {
                id: "3".into(),
                url: "https://b.com/docs/z".into(),
            },
        ]
    }

    #[test]
    fn include_glob_keeps_only_matches() {
        let selector = DocumentSelector {
            include_globs: vec!["*/docs/*".into()],
            ..Default::default()
        };
        let out = apply(&selector, rows());
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.url.contains("/docs/")));
    }

    #[test]
    fn exclude_glob_drops_matches() {
        let selector = DocumentSelector {
            exclude_globs: vec!["*b.com*".into()],
            ..Default::default()
        };
        let out = apply(&selector, rows());
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| !r.url.contains("b.com")));
    }

    #[test]
    fn ids_filter_is_exact() {
        let selector = DocumentSelector {
            ids: vec!["2".into()],
            ..Default::default()
        };
        let out = apply(&selector, rows());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "2");
    }

    #[test]
    fn limit_and_offset_apply_after_globs() {
        let selector = DocumentSelector {
            offset: Some(1),
            limit: Some(1),
            ..Default::default()
        };
        let out = apply(&selector, rows());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "2");
    }

    #[test]
    fn url_contains_filters_substring() {
        let selector = DocumentSelector {
            url_contains: Some("blog".into()),
            ..Default::default()
        };
        let out = apply(&selector, rows());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "2");
    }
}
