//! Search-box conventions used to find entities by name.

use crate::locators::keys;

/// Search key used when the caller does not name one
pub const DEFAULT_SEARCH_KEY: &str = "name";

/// Wrap a search term in double quotes, escaping `\` and `"`.
///
/// Surrounding whitespace is trimmed. Backslashes are escaped before quotes;
/// the other order would double-escape the backslash added for each quote.
///
/// ```
/// assert_eq!(atalaya::escape_search(r#"a"b\c"#), r#""a\"b\\c""#);
/// ```
#[must_use]
pub fn escape_search(term: &str) -> String {
    let escaped = term.trim().replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Which UI sub-system a page belongs to.
///
/// The two sub-systems use different search widgets and disagree on what a
/// missing search box means (see [`SearchVariant::search_box_required`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchVariant {
    /// Foreman pages
    #[default]
    Foreman,
    /// Katello (content) pages
    Katello,
}

impl SearchVariant {
    /// Locator key of the search box
    #[must_use]
    pub const fn search_box_key(&self) -> &'static str {
        match self {
            Self::Foreman => keys::SEARCH,
            Self::Katello => keys::KT_SEARCH,
        }
    }

    /// Locator key of the submit control
    #[must_use]
    pub const fn submit_key(&self) -> &'static str {
        match self {
            Self::Foreman => keys::SEARCH_BUTTON,
            Self::Katello => keys::KT_SEARCH_BUTTON,
        }
    }

    /// Whether a missing search box is an error.
    ///
    /// Katello pages always render the search box, so its absence is fatal.
    /// Foreman pages without entities may omit it; the search then finds
    /// nothing.
    #[must_use]
    pub const fn search_box_required(&self) -> bool {
        matches!(self, Self::Katello)
    }
}

/// Parameters of a [`PageBase::search_entity`](crate::PageBase::search_entity) call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Search widget variant
    pub variant: SearchVariant,
    /// Field searched on when a submit control is present
    pub search_key: String,
    /// Timeout for the result to show up (defaults to the page's wait timeout)
    pub timeout_ms: Option<u64>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            variant: SearchVariant::Foreman,
            search_key: DEFAULT_SEARCH_KEY.to_string(),
            timeout_ms: None,
        }
    }
}

impl SearchRequest {
    /// Foreman search on `name`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Katello search on `name`
    #[must_use]
    pub fn katello() -> Self {
        Self::default().with_variant(SearchVariant::Katello)
    }

    /// Set variant
    #[must_use]
    pub fn with_variant(mut self, variant: SearchVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Set search key
    #[must_use]
    pub fn with_search_key(mut self, key: impl Into<String>) -> Self {
        self.search_key = key.into();
        self
    }

    /// Set result timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Text typed into the box when a submit control is present
    #[must_use]
    pub fn query(&self, name: &str) -> String {
        format!("{} = {}", self.search_key, escape_search(name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod escape_tests {
        use super::*;

        #[test]
        fn test_plain_term_is_quoted() {
            assert_eq!(escape_search("rhel7"), "\"rhel7\"");
        }

        #[test]
        fn test_backslash_escaped_before_quote() {
            assert_eq!(escape_search("a\"b\\c"), "\"a\\\"b\\\\c\"");
        }

        #[test]
        fn test_trailing_backslash_before_quote() {
            // `\"` must become `\\\"`, not `\\\\"`
            assert_eq!(escape_search("x\\\""), "\"x\\\\\\\"\"");
        }

        #[test]
        fn test_surrounding_whitespace_trimmed() {
            assert_eq!(escape_search("  spaced name "), "\"spaced name\"");
        }

        #[test]
        fn test_empty_term() {
            assert_eq!(escape_search(""), "\"\"");
        }

        proptest! {
            #[test]
            fn prop_unescape_roundtrips(term in "[a-z\"\\\\ ]{0,16}") {
                let escaped = escape_search(&term);
                prop_assert!(escaped.starts_with('"') && escaped.ends_with('"'));
                let inner = &escaped[1..escaped.len() - 1];
                let mut out = String::new();
                let mut chars = inner.chars();
                while let Some(c) = chars.next() {
                    if c == '\\' {
                        let next = chars.next();
                        prop_assert!(matches!(next, Some('\\' | '"')));
                        out.extend(next);
                    } else {
                        prop_assert_ne!(c, '"');
                        out.push(c);
                    }
                }
                prop_assert_eq!(out, term.trim());
            }
        }
    }

    mod variant_tests {
        use super::*;

        #[test]
        fn test_variant_keys() {
            assert_eq!(SearchVariant::Foreman.search_box_key(), keys::SEARCH);
            assert_eq!(SearchVariant::Foreman.submit_key(), keys::SEARCH_BUTTON);
            assert_eq!(SearchVariant::Katello.search_box_key(), keys::KT_SEARCH);
            assert_eq!(SearchVariant::Katello.submit_key(), keys::KT_SEARCH_BUTTON);
        }

        #[test]
        fn test_only_katello_requires_search_box() {
            assert!(SearchVariant::Katello.search_box_required());
            assert!(!SearchVariant::Foreman.search_box_required());
        }
    }

    mod request_tests {
        use super::*;

        #[test]
        fn test_default_request() {
            let req = SearchRequest::new();
            assert_eq!(req.variant, SearchVariant::Foreman);
            assert_eq!(req.search_key, "name");
            assert!(req.timeout_ms.is_none());
        }

        #[test]
        fn test_query_uses_key_and_escaping() {
            let req = SearchRequest::katello().with_search_key("label");
            assert_eq!(req.query("my \"repo\""), "label = \"my \\\"repo\\\"\"");
        }
    }
}
