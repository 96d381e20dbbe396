//! Minimal glob matching for provider URL patterns and document selectors.
//!
//! Supports `*` (any run of characters) and `?` (single character); no
//! character classes. Translated to an anchored regex-free scan so the
//! crate doesn't need a dependency the pack doesn't otherwise bring in for
//! this purpose.

/// Whether `pattern` matches the full `text` (anchored both ends).
#[must_use]
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    match_from(&p, 0, &t, 0)
}

fn match_from(p: &[char], pi: usize, t: &[char], ti: usize) -> bool {
    if pi == p.len() {
        return ti == t.len();
    }
    match p[pi] {
        '*' => {
            // Try consuming zero or more characters of t.
            for k in ti..=t.len() {
                if match_from(p, pi + 1, t, k) {
                    return true;
                }
            }
            false
        }
        '?' => ti < t.len() && match_from(p, pi + 1, t, ti + 1),
        c => ti < t.len() && t[ti] == c && match_from(p, pi + 1, t, ti + 1),
    }
}

/// Count of non-wildcard characters in a pattern, used to break ties
/// between multiple matching patterns (more literal characters wins).
#[must_use]
pub fn literal_weight(pattern: &str) -> usize {
    pattern.chars().filter(|c| *c != '*' && *c != '?').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_anything() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("*", ""));
    }

    #[test]
    fn prefix_suffix_wildcard() {
        assert!(glob_match("*.google.com/search*", "www.google.com/search?q=x"));
        assert!(!glob_match("*.google.com/search*", "www.bing.com/search?q=x"));
    }

    #[test]
    fn exact_match_no_wildcard() {
        assert!(glob_match("docs/readme.md", "docs/readme.md"));
        assert!(!glob_match("docs/readme.md", "docs/readme.mdx"));
    }

    #[test]
    fn question_mark_matches_single_char() {
        assert!(glob_match("doc?.md", "doc1.md"));
        assert!(!glob_match("doc?.md", "doc12.md"));
    }

    #[test]
    fn specific_pattern_outweighs_wildcard() {
        assert!(literal_weight("*.google.com/search*") > literal_weight("*"));
    }
}
