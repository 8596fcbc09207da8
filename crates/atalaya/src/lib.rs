//! Atalaya: Element Waits and Settle Barrier for Browser-Driven UI Tests
//!
//! Atalaya (Spanish: "watchtower") sits between UI test code and a browser
//! backend. It turns "find this element" into a bounded poll that tolerates
//! slow rendering, and blocks after every interaction until the page has no
//! background requests in flight.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │ Page object  │    │     PageBase     │    │      Driver      │
//! │ (Settings)   │───►│ waits, click,    │───►│ ChromiumDriver   │
//! │              │    │ settle, search   │    │ or MockDriver    │
//! └──────────────┘    └────────┬─────────┘    └──────────────────┘
//!                              │
//!                     Clock (SystemClock or FakeClock)
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use atalaya::{FakeClock, Locator, LocatorTable, MockDriver, MockElement, PageBase};
//!
//! let clock = Arc::new(FakeClock::new());
//! let driver = MockDriver::new(clock.clone());
//! driver.add_element(MockElement::new("save", Locator::id("save")));
//!
//! let page = PageBase::new(&driver, Arc::new(LocatorTable::builtin())).with_clock(clock);
//! page.click(&Locator::id("save")).unwrap();
//! assert!(page.find(&Locator::id("missing")).unwrap().is_none());
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod base;
mod clock;
mod config;
mod driver;
mod locator;
mod locators;
mod page_object;
mod result;
mod search;

/// Tracing subscriber setup
pub mod logging;

/// Settle barrier over the jQuery and AngularJS request counters
pub mod settle;

/// Bounded polling loop and wait options
pub mod wait;

#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc)]
mod cdp;

pub use base::{PageBase, DEFAULT_COMPONENT};
#[cfg(feature = "browser")]
pub use cdp::{ChromiumConfig, ChromiumDriver, HANDLE_ATTRIBUTE};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{UiConfig, ENV_LOCATORS, ENV_POLL_INTERVAL_MS, ENV_SETTLE_TIMEOUT_MS, ENV_WAIT_TIMEOUT_MS};
pub use driver::{Driver, ElementHandle, MockDriver, MockElement, ScriptResponse};
pub use locator::{Locator, Strategy, PLACEHOLDER};
pub use locators::{keys, LocatorTable};
pub use page_object::{PageObject, SettingsPage, ValueKind};
pub use result::{DriverError, DriverResult, UiError, UiResult};
pub use search::{escape_search, SearchRequest, SearchVariant, DEFAULT_SEARCH_KEY};
pub use wait::{SettleOptions, WaitOptions};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        escape_search, keys, Clock, Driver, DriverError, ElementHandle, Locator, LocatorTable, PageBase,
        PageObject, SearchRequest, SearchVariant, SettingsPage, SettleOptions, Strategy, SystemClock, UiConfig,
        UiError, UiResult, ValueKind, WaitOptions,
    };
    #[cfg(feature = "browser")]
    pub use super::{ChromiumConfig, ChromiumDriver};
}
