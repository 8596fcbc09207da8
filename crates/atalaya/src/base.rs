//! PageBase: element resolution, waits and the helpers page objects share.
//!
//! Failure semantics by primitive:
//!
//! | Primitive              | Not found            | Backend fault | Timeout                  |
//! |------------------------|----------------------|---------------|--------------------------|
//! | `find`                 | `Ok(None)`           | `Err`         | n/a                      |
//! | `wait_until_*`         | `Ok(None)`           | `Err`         | `Ok(None)`               |
//! | `click`                | `Err(NoSuchElement)` | `Err`         | `Err(NoSuchElement)`     |
//! | `settle_barrier`       | n/a                  | probe ignored | `Err(SettleTimeout)`     |
//! | `search_entity`        | `Ok(None)` / `Err`   | `Err`         | `Ok(None)`               |
//!
//! `Ok(None)` is an ordinary answer ("did not show up within budget") so tests
//! can assert both that something appears and that it does not.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::UiConfig;
use crate::driver::{Driver, ElementHandle};
use crate::locator::Locator;
use crate::locators::{keys, LocatorTable};
use crate::result::{DriverError, UiError, UiResult};
use crate::search::{escape_search, SearchRequest};
use crate::settle;
use crate::wait::{poll_until, SettleOptions, WaitOptions};

/// Component name used in diagnostics when none is given
pub const DEFAULT_COMPONENT: &str = "PageBase";

/// Readiness a wait requires of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Present,
    Visible,
    Clickable,
}

impl Readiness {
    const fn describe(self) -> &'static str {
        match self {
            Self::Present => "exist",
            Self::Visible => "display",
            Self::Clickable => "display or to be clickable",
        }
    }
}

/// Shared UI operations over one borrowed browser session
pub struct PageBase<'d> {
    driver: &'d dyn Driver,
    locators: Arc<LocatorTable>,
    clock: Arc<dyn Clock>,
    config: UiConfig,
    component: String,
}

impl fmt::Debug for PageBase<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageBase")
            .field("component", &self.component)
            .field("config", &self.config)
            .field("locators", &self.locators.len())
            .finish_non_exhaustive()
    }
}

impl<'d> PageBase<'d> {
    /// Wrap a session with the given locator table, real time and defaults
    #[must_use]
    pub fn new(driver: &'d dyn Driver, locators: Arc<LocatorTable>) -> Self {
        Self {
            driver,
            locators,
            clock: Arc::new(SystemClock::new()),
            config: UiConfig::default(),
            component: DEFAULT_COMPONENT.to_string(),
        }
    }

    /// Use a different time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use different timeouts
    #[must_use]
    pub fn with_config(mut self, config: UiConfig) -> Self {
        self.config = config;
        self
    }

    /// Name reported in errors raised by this instance
    #[must_use]
    pub fn named(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    /// Same session and settings under another component name
    #[must_use]
    pub fn scoped(&self, component: impl Into<String>) -> Self {
        Self {
            driver: self.driver,
            locators: Arc::clone(&self.locators),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
            component: component.into(),
        }
    }

    /// The borrowed backend
    #[must_use]
    pub fn driver(&self) -> &'d dyn Driver {
        self.driver
    }

    /// Component name
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Default element wait bounds
    #[must_use]
    pub const fn wait_options(&self) -> &WaitOptions {
        &self.config.wait
    }

    /// Default settle bounds
    #[must_use]
    pub const fn settle_options(&self) -> &SettleOptions {
        &self.config.settle
    }

    /// Look up a symbolic locator
    ///
    /// # Errors
    ///
    /// Returns [`UiError::UnknownLocator`] for an undefined key
    pub fn locator(&self, key: &str) -> UiResult<&Locator> {
        self.locators.get(key)
    }

    /// Look up a templated locator and fill in `value`
    ///
    /// # Errors
    ///
    /// Returns [`UiError::UnknownLocator`] for an undefined key
    pub fn templated(&self, key: &str, value: &str) -> UiResult<Locator> {
        self.locators.templated(key, value)
    }

    // =========================================================================
    // PRIMITIVES
    // =========================================================================

    /// Single immediate lookup; a present but hidden element counts as absent.
    ///
    /// # Errors
    ///
    /// Returns error on backend faults other than "not found", or if the page
    /// does not settle after the element is found
    pub fn find(&self, locator: &Locator) -> UiResult<Option<ElementHandle>> {
        debug_assert_resolved(locator);
        let element = match self.driver.find_element(locator) {
            Ok(element) => element,
            Err(err) if err.is_absence() => {
                debug!(
                    component = %self.component,
                    selector = locator.selector(),
                    error = %err,
                    "could not locate element"
                );
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        self.settle()?;
        if self.driver.is_displayed(&element)? {
            Ok(Some(element))
        } else {
            Ok(None)
        }
    }

    /// Wait until the element is attached to the document
    ///
    /// # Errors
    ///
    /// Returns error on fatal backend faults or if the page does not settle
    pub fn wait_until_present(
        &self,
        locator: &Locator,
        options: &WaitOptions,
    ) -> UiResult<Option<ElementHandle>> {
        self.wait_until(locator, options, Readiness::Present)
    }

    /// Wait until the element is attached and visible
    ///
    /// # Errors
    ///
    /// Returns error on fatal backend faults or if the page does not settle
    pub fn wait_until_visible(
        &self,
        locator: &Locator,
        options: &WaitOptions,
    ) -> UiResult<Option<ElementHandle>> {
        self.wait_until(locator, options, Readiness::Visible)
    }

    /// Wait until the element is visible, enabled and unobstructed.
    ///
    /// The `disabled` attribute is re-read after the backend's own check
    /// passes: pages toggle it asynchronously, and a set attribute makes the
    /// outcome absent.
    ///
    /// # Errors
    ///
    /// Returns error on fatal backend faults or if the page does not settle
    pub fn wait_until_clickable(
        &self,
        locator: &Locator,
        options: &WaitOptions,
    ) -> UiResult<Option<ElementHandle>> {
        let Some(element) = self.wait_until(locator, options, Readiness::Clickable)? else {
            return Ok(None);
        };
        match self.driver.attribute(&element, "disabled")? {
            Some(value) if value != "false" => {
                debug!(
                    component = %self.component,
                    selector = locator.selector(),
                    "element reported clickable but is disabled"
                );
                Ok(None)
            }
            _ => Ok(Some(element)),
        }
    }

    /// [`wait_until_present`](Self::wait_until_present) with default bounds
    ///
    /// # Errors
    ///
    /// See [`wait_until_present`](Self::wait_until_present)
    pub fn present(&self, locator: &Locator) -> UiResult<Option<ElementHandle>> {
        self.wait_until_present(locator, &self.config.wait)
    }

    /// [`wait_until_visible`](Self::wait_until_visible) with default bounds
    ///
    /// # Errors
    ///
    /// See [`wait_until_visible`](Self::wait_until_visible)
    pub fn visible(&self, locator: &Locator) -> UiResult<Option<ElementHandle>> {
        self.wait_until_visible(locator, &self.config.wait)
    }

    /// [`wait_until_clickable`](Self::wait_until_clickable) with default bounds
    ///
    /// # Errors
    ///
    /// See [`wait_until_clickable`](Self::wait_until_clickable)
    pub fn clickable(&self, locator: &Locator) -> UiResult<Option<ElementHandle>> {
        self.wait_until_clickable(locator, &self.config.wait)
    }

    /// Wait until visible, click, then wait for the page to settle
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if the element never becomes
    /// visible, [`UiError::SettleTimeout`] if the page does not settle
    pub fn click(&self, locator: &Locator) -> UiResult<()> {
        self.click_with(locator, true, self.config.settle.timeout_ms)
    }

    /// Click with explicit settle behaviour
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if the element never becomes
    /// visible, [`UiError::SettleTimeout`] if `settle` is set and the page
    /// does not settle within `settle_timeout_ms`
    pub fn click_with(&self, locator: &Locator, settle: bool, settle_timeout_ms: u64) -> UiResult<()> {
        let element = self.require(self.visible(locator)?, locator)?;
        self.driver.click(&element)?;
        if settle {
            self.settle_barrier(&self.config.settle.with_timeout(settle_timeout_ms))?;
        }
        Ok(())
    }

    /// Block until no requests are in flight
    ///
    /// # Errors
    ///
    /// Returns [`UiError::SettleTimeout`] if requests are still pending after
    /// `options.timeout_ms`
    pub fn settle_barrier(&self, options: &SettleOptions) -> UiResult<()> {
        settle::settle_barrier(self.driver, self.clock.as_ref(), options)
    }

    /// [`settle_barrier`](Self::settle_barrier) with default bounds
    ///
    /// # Errors
    ///
    /// See [`settle_barrier`](Self::settle_barrier)
    pub fn settle(&self) -> UiResult<()> {
        self.settle_barrier(&self.config.settle)
    }

    /// Find an entity through the page's search box.
    ///
    /// Clears the box and types the escaped name (prefixed with
    /// `"<search_key> = "` when a submit control exists, which is then
    /// clicked), then waits for `entity_locator` filled with `name` to show.
    ///
    /// A missing search box returns `Ok(None)` on Foreman pages and raises on
    /// Katello pages.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if a Katello search box is missing,
    /// or on backend faults
    pub fn search_entity(
        &self,
        name: &str,
        entity_locator: &Locator,
        request: &SearchRequest,
    ) -> UiResult<Option<ElementHandle>> {
        let variant = request.variant;
        let search_locator = self.locator(variant.search_box_key())?;
        let Some(search_box) = self.visible(search_locator)? else {
            if variant.search_box_required() {
                return Err(UiError::no_such_element(
                    &self.component,
                    search_locator.selector(),
                ));
            }
            debug!(component = %self.component, "page has no search box");
            return Ok(None);
        };
        let search_button = self.visible(self.locator(variant.submit_key())?)?;

        self.driver.clear(&search_box)?;
        match search_button {
            Some(button) => {
                self.driver.send_keys(&search_box, &request.query(name))?;
                self.driver.click(&button)?;
            }
            None => self.driver.send_keys(&search_box, &escape_search(name))?,
        }

        let options = request
            .timeout_ms
            .map_or(self.config.wait, |ms| self.config.wait.with_timeout(ms));
        self.wait_until_visible(&entity_locator.with_value(name), &options)
    }

    // =========================================================================
    // COMPOSED HELPERS
    // =========================================================================

    /// Accept (`true`) or dismiss (`false`) the open alert
    ///
    /// # Errors
    ///
    /// Returns error if no alert is open
    pub fn handle_alert(&self, accept: bool) -> UiResult<()> {
        if accept {
            self.driver.accept_alert()?;
        } else {
            self.driver.dismiss_alert()?;
        }
        Ok(())
    }

    /// Scroll the page 350px to the right
    ///
    /// # Errors
    ///
    /// Returns error if the script fails
    pub fn scroll_page(&self) -> UiResult<()> {
        let _ = self.driver.execute_script(SCROLL_PAGE_SCRIPT)?;
        Ok(())
    }

    /// Scroll the main panel down by 100px through its jScrollPane handle
    ///
    /// # Errors
    ///
    /// Returns error if the script fails (e.g. the panel has no scroll pane)
    pub fn scroll_right_pane(&self) -> UiResult<()> {
        let _ = self.driver.execute_script(SCROLL_RIGHT_PANE_SCRIPT)?;
        Ok(())
    }

    /// Replace the text of the field at `locator`
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if the field never becomes visible
    pub fn text_field_update(&self, locator: &Locator, text: &str) -> UiResult<()> {
        let field = self.require(self.visible(locator)?, locator)?;
        self.driver.clear(&field)?;
        self.driver.send_keys(&field, text)?;
        Ok(())
    }

    /// Replace the text of the field named by a symbolic key, without waiting
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if the field is not displayed now
    pub fn field_update(&self, key: &str, text: &str) -> UiResult<()> {
        let locator = self.locator(key)?;
        let field = self.require(self.find(locator)?, locator)?;
        self.driver.clear(&field)?;
        self.driver.send_keys(&field, text)?;
        Ok(())
    }

    /// Pick or drop each entity of a multiselect.
    ///
    /// Uses the filter box keyed by `filter_key` when the page has one, and
    /// falls back to the entity's checkbox otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if an entity cannot be clicked
    pub fn select_deselect_entity(
        &self,
        filter_key: &str,
        entity_locator: &Locator,
        entities: &[&str],
    ) -> UiResult<()> {
        for entity in entities {
            let _ = self.driver.execute_script(SCROLL_TOP_SCRIPT)?;
            let filter = self.templated(keys::FILTER, filter_key)?;
            if let Some(field) = self.visible(&filter)? {
                self.driver.clear(&field)?;
                self.driver.send_keys(&field, entity)?;
                self.click(&entity_locator.with_value(entity))?;
            } else {
                self.click(&self.templated(keys::ENTITY_CHECKBOX, entity)?)?;
            }
        }
        Ok(())
    }

    /// Associate (`select = true`) or dissociate `entities`, then associate
    /// `new_entities`, optionally switching to `tab` first.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if the tab or an entity is missing
    pub fn configure_entity(
        &self,
        entities: &[&str],
        filter_key: &str,
        tab: Option<&Locator>,
        new_entities: &[&str],
        select: bool,
    ) -> UiResult<()> {
        if !entities.is_empty() {
            if let Some(tab) = tab {
                self.click(tab)?;
            }
            let key = if select {
                keys::ENTITY_SELECT
            } else {
                keys::ENTITY_DESELECT
            };
            self.select_deselect_entity(filter_key, self.locator(key)?, entities)?;
        }
        if !new_entities.is_empty() {
            if let Some(tab) = tab {
                self.click(tab)?;
            }
            self.select_deselect_entity(filter_key, self.locator(keys::ENTITY_SELECT)?, new_entities)?;
        }
        Ok(())
    }

    /// Search for `name`, open its dropdown if any, click delete and answer
    /// the confirmation alert.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::EntityNotFound`] if the search finds nothing,
    /// [`UiError::NoSuchElement`] if a control is missing
    pub fn delete_entity(
        &self,
        name: &str,
        really: bool,
        name_locator: &Locator,
        delete_locator: &Locator,
        dropdown_locator: Option<&Locator>,
        search_key: Option<&str>,
    ) -> UiResult<()> {
        let mut request = SearchRequest::new();
        if let Some(key) = search_key {
            request = request.with_search_key(key);
        }
        if self.search_entity(name, name_locator, &request)?.is_none() {
            return Err(UiError::EntityNotFound {
                name: name.to_string(),
            });
        }
        if let Some(dropdown) = dropdown_locator {
            self.click(&dropdown.with_value(name))?;
        }
        self.click(&delete_locator.with_value(name))?;
        self.handle_alert(really)
    }

    /// Add a parameter on the parameters tab and submit
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if a control is missing
    pub fn set_parameter(&self, name: &str, value: &str) -> UiResult<()> {
        self.click(self.locator(keys::PARAMETER_TAB)?)?;
        self.click(self.locator(keys::ADD_PARAMETER)?)?;
        if let Some(field) = self.visible(self.locator(keys::PARAMETER_NAME)?)? {
            self.driver.send_keys(&field, name)?;
        }
        if let Some(field) = self.visible(self.locator(keys::PARAMETER_VALUE)?)? {
            self.driver.send_keys(&field, value)?;
        }
        self.click(self.locator(keys::SUBMIT)?)
    }

    /// Remove a parameter on the parameters tab and submit
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if a control is missing
    pub fn remove_parameter(&self, name: &str) -> UiResult<()> {
        self.click(self.locator(keys::PARAMETER_TAB)?)?;
        self.click(&self.templated(keys::PARAMETER_REMOVE, name)?)?;
        self.click(self.locator(keys::SUBMIT)?)
    }

    /// Click `edit`, replace the text of `text_field`, click `save`
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if a control is missing
    pub fn edit_entity(&self, edit: &Locator, text_field: &Locator, value: &str, save: &Locator) -> UiResult<()> {
        self.click(edit)?;
        self.text_field_update(text_field, value)?;
        self.click(save)
    }

    /// Type a partial query, pick the autocomplete suggestion for `name`,
    /// submit, and wait for the entity.
    ///
    /// The caller navigates to the entity page first.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if the search box, suggestion or
    /// submit control is missing
    pub fn auto_complete_search(
        &self,
        partial_name: &str,
        name: &str,
        search_key: &str,
        entity_locator: &Locator,
    ) -> UiResult<Option<ElementHandle>> {
        let search_locator = self.locator(keys::SEARCH)?;
        let search_box = self.require(self.visible(search_locator)?, search_locator)?;
        self.driver.clear(&search_box)?;
        self.driver
            .send_keys(&search_box, &format!("{search_key} = {partial_name}"))?;
        self.settle()?;
        self.click(&self.templated(keys::AUTO_SEARCH, name)?)?;
        self.click(self.locator(keys::SEARCH_BUTTON)?)?;
        self.visible(&entity_locator.with_value(name))
    }

    /// Whether the "all values" checkbox for `context` is selected on the
    /// entity's `tab`.
    ///
    /// The caller navigates to the entity page first.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if the entity, tab or checkbox is
    /// missing
    pub fn check_all_values(
        &self,
        entity_name: &str,
        entity_locator: &Locator,
        tab: &Locator,
        context: &str,
    ) -> UiResult<bool> {
        let entity = entity_locator.with_value(entity_name);
        let found = self.search_entity(entity_name, entity_locator, &SearchRequest::new())?;
        let element = self.require(found, &entity)?;
        self.driver.click(&element)?;
        self.click(tab)?;
        let checkbox_locator = self.templated(keys::ALL_VALUES, context)?;
        let checkbox = self.require(self.find(&checkbox_locator)?, &checkbox_locator)?;
        Ok(self.driver.is_selected(&checkbox)?)
    }

    /// Click a submit control and, unless `validation` is off, fail if the
    /// control is still visible afterwards (the page did not advance).
    ///
    /// # Errors
    ///
    /// Returns [`UiError::PageSubmissionFailed`] if the page did not advance,
    /// [`UiError::NoSuchElement`] if the control is missing
    pub fn submit_and_validate(&self, locator: &Locator, validation: bool) -> UiResult<()> {
        self.click(locator)?;
        if validation && self.visible(locator)?.is_some() {
            return Err(UiError::PageSubmissionFailed {
                component: self.component.clone(),
                selector: locator.selector().to_string(),
            });
        }
        Ok(())
    }

    /// Whether the element becomes visible and is enabled
    ///
    /// # Errors
    ///
    /// Returns error on fatal backend faults
    pub fn is_element_enabled(&self, locator: &Locator) -> UiResult<bool> {
        let Some(element) = self.visible(locator)? else {
            return Ok(false);
        };
        self.settle()?;
        Ok(self.driver.is_enabled(&element)?)
    }

    /// Whether the element becomes present and is displayed
    ///
    /// # Errors
    ///
    /// Returns error on fatal backend faults
    pub fn is_element_visible(&self, locator: &Locator) -> UiResult<bool> {
        let Some(element) = self.present(locator)? else {
            return Ok(false);
        };
        self.settle()?;
        Ok(self.driver.is_displayed(&element)?)
    }

    /// Whether the form shows a validation error on its name field.
    ///
    /// Waits up to the configured timeout for the error marker, so call it
    /// after a submission that is expected to fail.
    ///
    /// # Errors
    ///
    /// Returns error on fatal backend faults or a failed settle
    pub fn has_name_error(&self) -> UiResult<bool> {
        let marker = self.locator(keys::NAME_HAS_ERROR)?;
        Ok(self.visible(marker)?.is_some())
    }

    /// Visible text of a visible element
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoSuchElement`] if the element never becomes visible
    pub fn text_of(&self, locator: &Locator) -> UiResult<String> {
        let element = self.require(self.visible(locator)?, locator)?;
        Ok(self.driver.text(&element)?)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn wait_until(
        &self,
        locator: &Locator,
        options: &WaitOptions,
        readiness: Readiness,
    ) -> UiResult<Option<ElementHandle>> {
        debug_assert_resolved(locator);
        let found = poll_until(self.clock.as_ref(), options, || {
            transient_as_none(self.check(locator, readiness))
        })?;
        match found {
            Some(element) => {
                self.settle_barrier(&self.config.settle.with_poll_interval(options.poll_interval_ms))?;
                Ok(Some(element))
            }
            None => {
                debug!(
                    component = %self.component,
                    selector = locator.selector(),
                    timeout_ms = options.timeout_ms,
                    "timed out waiting for element to {}",
                    readiness.describe()
                );
                Ok(None)
            }
        }
    }

    fn check(&self, locator: &Locator, readiness: Readiness) -> Result<Option<ElementHandle>, DriverError> {
        let element = self.driver.find_element(locator)?;
        let ready = match readiness {
            Readiness::Present => true,
            Readiness::Visible => self.driver.is_displayed(&element)?,
            Readiness::Clickable => self.driver.is_clickable(&element)?,
        };
        Ok(ready.then_some(element))
    }

    fn require(&self, element: Option<ElementHandle>, locator: &Locator) -> UiResult<ElementHandle> {
        element.ok_or_else(|| UiError::no_such_element(&self.component, locator.selector()))
    }
}

fn transient_as_none<T>(result: Result<Option<T>, DriverError>) -> UiResult<Option<T>> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.is_transient() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

const SCROLL_TOP_SCRIPT: &str = "window.scroll(0, 0)";
const SCROLL_PAGE_SCRIPT: &str = "scroll(350, 0);";
const SCROLL_RIGHT_PANE_SCRIPT: &str = "$('#panel_main').data('jsp').scrollBy(0, 100);";

fn debug_assert_resolved(locator: &Locator) {
    debug_assert!(
        !locator.needs_value(),
        "locator {locator} used without filling its placeholder"
    );
}
