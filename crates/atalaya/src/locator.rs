//! Locators: how to find an element.
//!
//! A [`Locator`] is a `(strategy, selector-template)` pair. The template may
//! carry one `%s` placeholder that is filled with a runtime value, usually an
//! entity name, before the locator is resolved:
//!
//! ```
//! use atalaya::{Locator, Strategy};
//!
//! let entity = Locator::css("#entity-%s");
//! assert!(entity.is_template());
//!
//! let foo = entity.with_value("foo");
//! assert_eq!(foo.selector(), "#entity-foo");
//! assert_eq!(foo.strategy(), Strategy::Css);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Placeholder substituted by [`Locator::with_value`]
pub const PLACEHOLDER: &str = "%s";

/// How a selector is resolved against the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Element id attribute
    Id,
    /// Element name attribute
    Name,
    /// CSS selector
    Css,
    /// XPath expression
    #[serde(rename = "xpath")]
    XPath,
    /// Exact anchor text
    LinkText,
    /// Anchor text containing the value
    PartialLinkText,
    /// Single class name
    ClassName,
    /// Tag name
    TagName,
}

impl Strategy {
    /// Name used in diagnostics (matches the WebDriver "using" values)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Css => "css selector",
            Self::XPath => "xpath",
            Self::LinkText => "link text",
            Self::PartialLinkText => "partial link text",
            Self::ClassName => "class name",
            Self::TagName => "tag name",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(strategy, selector-template)` pair
///
/// Equality and hashing look at the strategy and selector only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locator {
    strategy: Strategy,
    #[serde(rename = "selector")]
    template: String,
    /// Set once [`Locator::with_value`] has filled the placeholder
    #[serde(skip)]
    resolved: bool,
}

impl PartialEq for Locator {
    fn eq(&self, other: &Self) -> bool {
        self.strategy == other.strategy && self.template == other.template
    }
}

impl Eq for Locator {}

impl Hash for Locator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.strategy.hash(state);
        self.template.hash(state);
    }
}

impl Locator {
    /// Create a locator
    #[must_use]
    pub fn new(strategy: Strategy, template: impl Into<String>) -> Self {
        Self {
            strategy,
            template: template.into(),
            resolved: false,
        }
    }

    /// Locate by id
    #[must_use]
    pub fn id(template: impl Into<String>) -> Self {
        Self::new(Strategy::Id, template)
    }

    /// Locate by name attribute
    #[must_use]
    pub fn name(template: impl Into<String>) -> Self {
        Self::new(Strategy::Name, template)
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(template: impl Into<String>) -> Self {
        Self::new(Strategy::Css, template)
    }

    /// Locate by XPath
    #[must_use]
    pub fn xpath(template: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, template)
    }

    /// Locate by exact link text
    #[must_use]
    pub fn link_text(template: impl Into<String>) -> Self {
        Self::new(Strategy::LinkText, template)
    }

    /// Resolution strategy
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Selector string (the template, possibly already substituted)
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.template
    }

    /// Number of `%s` placeholders in the template
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.template.matches(PLACEHOLDER).count()
    }

    /// Whether the selector contains a `%s` placeholder
    #[must_use]
    pub fn is_template(&self) -> bool {
        self.placeholder_count() > 0
    }

    /// Whether the locator still needs a runtime value.
    ///
    /// False after [`Locator::with_value`], even when the substituted value
    /// itself contains `%s`.
    #[must_use]
    pub fn needs_value(&self) -> bool {
        !self.resolved && self.is_template()
    }

    /// Fill the placeholder with `value`.
    ///
    /// A locator without a placeholder is returned unchanged.
    #[must_use]
    pub fn with_value(&self, value: &str) -> Self {
        Self {
            strategy: self.strategy,
            template: self.template.replacen(PLACEHOLDER, value, 1),
            resolved: true,
        }
    }

    /// JavaScript expression evaluating to the first matching node or `null`
    #[must_use]
    pub fn to_js_query(&self) -> String {
        let s = js_string(&self.template);
        match self.strategy {
            Strategy::Id => format!("document.getElementById({s})"),
            Strategy::Name => {
                format!("document.querySelector('[name=' + JSON.stringify({s}) + ']')")
            }
            Strategy::Css => format!("document.querySelector({s})"),
            Strategy::XPath => format!(
                "document.evaluate({s}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
            ),
            Strategy::LinkText => format!(
                "(Array.from(document.querySelectorAll('a')).find(a => a.textContent.trim() === {s}) || null)"
            ),
            Strategy::PartialLinkText => format!(
                "(Array.from(document.querySelectorAll('a')).find(a => a.textContent.includes({s})) || null)"
            ),
            Strategy::ClassName => format!("(document.getElementsByClassName({s})[0] || null)"),
            Strategy::TagName => format!("(document.getElementsByTagName({s})[0] || null)"),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {:?})", self.strategy, self.template)
    }
}

/// Quote `value` as a JavaScript string literal
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}
