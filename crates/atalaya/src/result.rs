//! Result and error types for Atalaya.
//!
//! Two layers:
//!
//! - [`DriverError`] is what a browser backend reports. Some of its variants
//!   (`NoSuchElement`, `Timeout`) are *expected* during polling and get turned
//!   into an absent result by the wait primitives.
//! - [`UiError`] is what callers of [`PageBase`](crate::PageBase) see. An
//!   element that merely did not show up is never a `UiError`; it is `Ok(None)`.

use thiserror::Error;

/// Result type for backend calls
pub type DriverResult<T> = Result<T, DriverError>;

/// Result type for Atalaya operations
pub type UiResult<T> = Result<T, UiError>;

/// Faults reported by a browser-automation backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The locator matched nothing
    #[error("no such element: {selector}")]
    NoSuchElement {
        /// Selector that was looked up
        selector: String,
    },

    /// The backend gave up establishing the lookup
    #[error("backend timed out: {message}")]
    Timeout {
        /// Error message
        message: String,
    },

    /// A script raised inside the page
    #[error("script error: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// The element handle no longer refers to a node in the document
    #[error("stale element reference: {handle}")]
    StaleElement {
        /// Handle id
        handle: String,
    },

    /// No alert is currently open
    #[error("no alert open")]
    NoAlert,

    /// The connection to the browser is gone
    #[error("browser connection failed: {message}")]
    Connection {
        /// Error message
        message: String,
    },

    /// Anything else
    #[error("browser backend error: {message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl DriverError {
    /// Create a no-such-element error
    #[must_use]
    pub fn no_such_element(selector: impl Into<String>) -> Self {
        Self::NoSuchElement {
            selector: selector.into(),
        }
    }

    /// Create a script error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Create a connection error
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Whether this fault means "the element is not there (yet)".
    ///
    /// Lookups failing this way become an absent result; every other fault
    /// propagates to the caller.
    #[must_use]
    pub const fn is_absence(&self) -> bool {
        matches!(self, Self::NoSuchElement { .. } | Self::Timeout { .. })
    }

    /// Whether a polling loop should treat this fault as "not ready yet".
    ///
    /// Absence plus stale handles: an element that was replaced between the
    /// lookup and the state query is retried on the next poll.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.is_absence() || matches!(self, Self::StaleElement { .. })
    }
}

/// Errors raised by UI operations
#[derive(Debug, Error)]
pub enum UiError {
    /// An element the caller relied on could not be resolved
    #[error("{component}: element with locator {selector} not found")]
    NoSuchElement {
        /// Page object or component that issued the call
        component: String,
        /// Selector of the missing element
        selector: String,
    },

    /// A submit control was still on screen after submission
    #[error("{component}: page submission failed, {selector} is still present")]
    PageSubmissionFailed {
        /// Page object or component that issued the call
        component: String,
        /// Selector of the submit control
        selector: String,
    },

    /// Background requests did not settle in time
    #[error("Timeout waiting for page to load: requests still pending after {ms}ms")]
    SettleTimeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// A search for a named entity found nothing
    #[error("Could not search the entity \"{name}\"")]
    EntityNotFound {
        /// Entity name
        name: String,
    },

    /// A symbolic locator key is not in the table
    #[error("unknown locator key: {key}")]
    UnknownLocator {
        /// Symbolic key
        key: String,
    },

    /// A locator definition is malformed
    #[error("invalid locator {key}: {message}")]
    InvalidLocator {
        /// Symbolic key
        key: String,
        /// Error message
        message: String,
    },

    /// Value kind other than input or dropdown
    #[error("invalid option: {message}")]
    InvalidOption {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Browser backend fault, passed through unchanged
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl UiError {
    /// Create a no-such-element error
    #[must_use]
    pub fn no_such_element(component: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::NoSuchElement {
            component: component.into(),
            selector: selector.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this is a no-such-element error
    #[must_use]
    pub const fn is_no_such_element(&self) -> bool {
        matches!(self, Self::NoSuchElement { .. })
    }
}
