//! Page objects built on [`PageBase`].
//!
//! A page object wraps a `PageBase` and exposes the operations one screen of
//! the product offers. [`SettingsPage`] is the reference implementation.

use std::str::FromStr;

use crate::base::PageBase;
use crate::driver::ElementHandle;
use crate::locator::Locator;
use crate::locators::keys;
use crate::result::{UiError, UiResult};
use crate::search::SearchRequest;

/// A page or component of the UI
pub trait PageObject {
    /// URL pattern that matches this page (e.g. "/settings")
    fn url_pattern(&self) -> &str;

    /// Page name for logging and error messages
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// How a setting's value is edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Free text input
    Input,
    /// `<select>` dropdown, chosen by option value
    Dropdown,
}

impl FromStr for ValueKind {
    type Err = UiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Self::Input),
            "dropdown" => Ok(Self::Dropdown),
            other => Err(UiError::InvalidOption {
                message: format!("value type must be 'input' or 'dropdown', got {other:?}"),
            }),
        }
    }
}

/// Administer > Settings
#[derive(Debug)]
pub struct SettingsPage<'d> {
    base: PageBase<'d>,
}

impl<'d> SettingsPage<'d> {
    /// Page name used in errors
    pub const NAME: &'static str = "Settings";

    /// Wrap a session
    #[must_use]
    pub fn new(base: &PageBase<'d>) -> Self {
        Self {
            base: base.scoped(Self::NAME),
        }
    }

    /// Underlying primitives
    #[must_use]
    pub const fn base(&self) -> &PageBase<'d> {
        &self.base
    }

    /// Search for a parameter row by name
    ///
    /// # Errors
    ///
    /// Returns error on backend faults
    pub fn search(&self, name: &str) -> UiResult<Option<ElementHandle>> {
        let row = self.base.locator(keys::SETTINGS_PARAM)?;
        self.base.search_entity(name, row, &SearchRequest::new())
    }

    /// Change the value of `param` on `tab`
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if the tab, the edit control or the
    /// value field cannot be found
    pub fn update(&self, tab: &Locator, param: &str, kind: ValueKind, value: &str) -> UiResult<()> {
        let edit = self.open_param(tab, param)?;
        self.base.driver().click(&edit)?;
        match kind {
            ValueKind::Dropdown => {
                self.base.click(self.base.locator(keys::SETTINGS_SELECT_VALUE)?)?;
                self.base
                    .click(&self.base.templated(keys::SETTINGS_SELECT_OPTION, value)?)?;
            }
            ValueKind::Input => self.base.field_update(keys::SETTINGS_INPUT_VALUE, value)?,
        }
        self.base.settle()?;
        self.base.click(self.base.locator(keys::SETTINGS_SAVE)?)
    }

    /// Value currently shown for `param` on `tab`
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if the tab or parameter cannot be
    /// found
    pub fn saved_value(&self, tab: &Locator, param: &str) -> UiResult<String> {
        let edit = self.open_param(tab, param)?;
        Ok(self.base.driver().text(&edit)?)
    }

    fn open_param(&self, tab: &Locator, param: &str) -> UiResult<ElementHandle> {
        self.base.click(tab)?;
        let edit = self.base.templated(keys::SETTINGS_EDIT_PARAM, param)?;
        self.base
            .visible(&edit)?
            .ok_or_else(|| UiError::no_such_element(Self::NAME, edit.selector()))
    }
}

impl PageObject for SettingsPage<'_> {
    fn url_pattern(&self) -> &str {
        "/settings"
    }

    fn page_name(&self) -> &str {
        Self::NAME
    }
}
