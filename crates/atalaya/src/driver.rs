//! Driver - Abstract Browser Automation Trait
//!
//! [`PageBase`](crate::PageBase) never talks to a browser directly. It issues
//! the handful of primitives below through a [`Driver`], so the same waits
//! run against a real CDP session ([`ChromiumDriver`](crate::ChromiumDriver),
//! feature `browser`) or against the scripted [`MockDriver`].
//!
//! Calls are synchronous: each one blocks until the backend answers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::clock::Clock;
use crate::locator::Locator;
use crate::result::{DriverError, DriverResult};

/// Element handle for DOM interactions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Backend identifier for the element
    pub id: String,
    /// Element tag name
    pub tag_name: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
        }
    }
}

/// Browser-automation capabilities consumed by Atalaya
///
/// # Implementations
///
/// - `ChromiumDriver` - CDP via chromiumoxide (feature `browser`)
/// - `MockDriver` - scripted in-memory page for unit testing
pub trait Driver: Send + Sync {
    /// Resolve a locator to the first matching element
    fn find_element(&self, locator: &Locator) -> DriverResult<ElementHandle>;

    /// Whether the element is rendered (non-zero size, not hidden by style)
    fn is_displayed(&self, element: &ElementHandle) -> DriverResult<bool>;

    /// Whether the element is enabled
    fn is_enabled(&self, element: &ElementHandle) -> DriverResult<bool>;

    /// Whether a checkbox/option is selected
    fn is_selected(&self, element: &ElementHandle) -> DriverResult<bool>;

    /// The backend's own clickability check
    fn is_clickable(&self, element: &ElementHandle) -> DriverResult<bool> {
        Ok(self.is_displayed(element)? && self.is_enabled(element)?)
    }

    /// Native click
    fn click(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Clear a text field
    fn clear(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Type text into the element
    fn send_keys(&self, element: &ElementHandle, text: &str) -> DriverResult<()>;

    /// Visible text of the element
    fn text(&self, element: &ElementHandle) -> DriverResult<String>;

    /// Attribute value, `None` if absent
    fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>>;

    /// Execute JavaScript in page context and return its JSON result
    fn execute_script(&self, script: &str) -> DriverResult<serde_json::Value>;

    /// Accept the open alert
    fn accept_alert(&self) -> DriverResult<()>;

    /// Dismiss the open alert
    fn dismiss_alert(&self) -> DriverResult<()>;
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// A scripted element living in a [`MockDriver`] page
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Handle id
    pub id: String,
    /// Locator the element answers to
    pub locator: Locator,
    /// Tag name
    pub tag_name: String,
    /// Virtual time at which the element is attached
    pub appear_at: Duration,
    /// Virtual time at which the element is detached
    pub detach_at: Option<Duration>,
    /// Rendered visibly
    pub displayed: bool,
    /// Enabled
    pub enabled: bool,
    /// Selected (checkboxes)
    pub selected: bool,
    /// Text content; also receives typed keys
    pub text: String,
    /// Explicit attributes
    pub attributes: HashMap<String, String>,
    /// Override for the backend clickability check
    pub clickable: Option<bool>,
    /// Detach the element when it is clicked
    pub removed_on_click: bool,
    /// Open an alert when the element is clicked
    pub opens_alert: bool,
}

impl MockElement {
    /// A visible, enabled element present from time zero
    #[must_use]
    pub fn new(id: impl Into<String>, locator: Locator) -> Self {
        Self {
            id: id.into(),
            locator,
            tag_name: "div".to_string(),
            appear_at: Duration::ZERO,
            detach_at: None,
            displayed: true,
            enabled: true,
            selected: false,
            text: String::new(),
            attributes: HashMap::new(),
            clickable: None,
            removed_on_click: false,
            opens_alert: false,
        }
    }

    /// Set tag name
    #[must_use]
    pub fn tag(mut self, tag_name: impl Into<String>) -> Self {
        self.tag_name = tag_name.into();
        self
    }

    /// Attach the element only after `delay` of virtual time
    #[must_use]
    pub const fn appear_after(mut self, delay: Duration) -> Self {
        self.appear_at = delay;
        self
    }

    /// Detach the element after `delay` of virtual time
    #[must_use]
    pub const fn detach_after(mut self, delay: Duration) -> Self {
        self.detach_at = Some(delay);
        self
    }

    /// Attached but not rendered
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Disabled (also reports `disabled="true"`)
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Checked/selected
    #[must_use]
    pub const fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Force the backend clickability check
    #[must_use]
    pub const fn clickable(mut self, clickable: bool) -> Self {
        self.clickable = Some(clickable);
        self
    }

    /// Detach on click (e.g. a submit button on a page that advances)
    #[must_use]
    pub const fn removed_on_click(mut self) -> Self {
        self.removed_on_click = true;
        self
    }

    /// Open an alert on click
    #[must_use]
    pub const fn opens_alert(mut self) -> Self {
        self.opens_alert = true;
        self
    }

    fn attached_at(&self, now: Duration) -> bool {
        now >= self.appear_at && self.detach_at.map_or(true, |at| now < at)
    }
}

/// Scripted answer to `execute_script`
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptResponse {
    /// Always return this value
    Value(serde_json::Value),
    /// Return `value` until virtual time `until`, then `then`
    ValueUntil {
        /// Value before the switch
        value: serde_json::Value,
        /// Virtual time of the switch
        until: Duration,
        /// Value afterwards
        then: serde_json::Value,
    },
    /// Raise a script error
    Error(String),
}

#[derive(Debug, Default)]
struct MockState {
    elements: Vec<MockElement>,
    scripts: Vec<(String, ScriptResponse)>,
    faults: HashMap<Locator, DriverError>,
    alert_open: bool,
    calls: Vec<String>,
}

/// Mock driver for unit testing
///
/// Elements appear, disappear and answer state queries according to a virtual
/// [`Clock`], normally the same [`FakeClock`](crate::FakeClock) handed to the
/// `PageBase` under test.
#[derive(Debug)]
pub struct MockDriver {
    clock: Arc<dyn Clock>,
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create an empty page driven by `clock`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Add an element
    pub fn add_element(&self, element: MockElement) {
        self.state().elements.push(element);
    }

    /// Answer scripts containing `pattern` with `response`
    pub fn on_script(&self, pattern: impl Into<String>, response: ScriptResponse) {
        self.state().scripts.push((pattern.into(), response));
    }

    /// Make every lookup of `locator` fail with `fault`
    pub fn inject_fault(&self, locator: Locator, fault: DriverError) {
        let _ = self.state().faults.insert(locator, fault);
    }

    /// Open an alert
    pub fn open_alert(&self) {
        self.state().alert_open = true;
    }

    /// Whether an alert is open
    #[must_use]
    pub fn alert_open(&self) -> bool {
        self.state().alert_open
    }

    /// Text currently held by an element
    #[must_use]
    pub fn element_text(&self, id: &str) -> Option<String> {
        self.state()
            .elements
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.text.clone())
    }

    /// Recorded calls, e.g. `"click:save"` or `"send_keys:search:foo"`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Check if a call starting with `prefix` was recorded
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state().calls.iter().any(|c| c.starts_with(prefix))
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_element<T>(
        &self,
        handle: &ElementHandle,
        op: impl FnOnce(&mut MockElement) -> T,
    ) -> DriverResult<T> {
        let now = self.clock.now();
        let mut state = self.state();
        state
            .elements
            .iter_mut()
            .find(|e| e.id == handle.id && e.attached_at(now))
            .map(op)
            .ok_or_else(|| DriverError::StaleElement {
                handle: handle.id.clone(),
            })
    }

    fn record(&self, call: String) {
        self.state().calls.push(call);
    }
}

impl Driver for MockDriver {
    fn find_element(&self, locator: &Locator) -> DriverResult<ElementHandle> {
        let now = self.clock.now();
        let state = self.state();
        if let Some(fault) = state.faults.get(locator) {
            return Err(fault.clone());
        }
        state
            .elements
            .iter()
            .find(|e| &e.locator == locator && e.attached_at(now))
            .map(|e| ElementHandle::new(e.id.clone(), e.tag_name.clone()))
            .ok_or_else(|| DriverError::no_such_element(locator.selector()))
    }

    fn is_displayed(&self, element: &ElementHandle) -> DriverResult<bool> {
        self.with_element(element, |e| e.displayed)
    }

    fn is_enabled(&self, element: &ElementHandle) -> DriverResult<bool> {
        self.with_element(element, |e| e.enabled)
    }

    fn is_selected(&self, element: &ElementHandle) -> DriverResult<bool> {
        self.with_element(element, |e| e.selected)
    }

    fn is_clickable(&self, element: &ElementHandle) -> DriverResult<bool> {
        self.with_element(element, |e| {
            e.clickable.unwrap_or(e.displayed && e.enabled)
        })
    }

    fn click(&self, element: &ElementHandle) -> DriverResult<()> {
        let now = self.clock.now();
        let opens_alert = self.with_element(element, |e| {
            if e.removed_on_click {
                e.detach_at = Some(now);
            }
            if e.tag_name == "input" && e.attributes.get("type").map(String::as_str) == Some("checkbox") {
                e.selected = !e.selected;
            }
            e.opens_alert
        })?;
        if opens_alert {
            self.open_alert();
        }
        self.record(format!("click:{}", element.id));
        Ok(())
    }

    fn clear(&self, element: &ElementHandle) -> DriverResult<()> {
        self.with_element(element, |e| e.text.clear())?;
        self.record(format!("clear:{}", element.id));
        Ok(())
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        self.with_element(element, |e| e.text.push_str(text))?;
        self.record(format!("send_keys:{}:{text}", element.id));
        Ok(())
    }

    fn text(&self, element: &ElementHandle) -> DriverResult<String> {
        self.with_element(element, |e| e.text.clone())
    }

    fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>> {
        self.with_element(element, |e| match e.attributes.get(name) {
            Some(value) => Some(value.clone()),
            None if name == "disabled" && !e.enabled => Some("true".to_string()),
            None => None,
        })
    }

    fn execute_script(&self, script: &str) -> DriverResult<serde_json::Value> {
        let now = self.clock.now();
        let response = {
            let mut state = self.state();
            state.calls.push(format!("execute_script:{script}"));
            state
                .scripts
                .iter()
                .find(|(pattern, _)| script.contains(pattern.as_str()))
                .map(|(_, response)| response.clone())
        };
        match response {
            Some(ScriptResponse::Value(value)) => Ok(value),
            Some(ScriptResponse::ValueUntil { value, until, then }) => {
                Ok(if now < until { value } else { then })
            }
            Some(ScriptResponse::Error(message)) => Err(DriverError::script(message)),
            None => Err(DriverError::script(format!(
                "ReferenceError: no scripted answer for {script:?}"
            ))),
        }
    }

    fn accept_alert(&self) -> DriverResult<()> {
        let mut state = self.state();
        if !state.alert_open {
            return Err(DriverError::NoAlert);
        }
        state.alert_open = false;
        state.calls.push("accept_alert".to_string());
        Ok(())
    }

    fn dismiss_alert(&self) -> DriverResult<()> {
        let mut state = self.state();
        if !state.alert_open {
            return Err(DriverError::NoAlert);
        }
        state.alert_open = false;
        state.calls.push("dismiss_alert".to_string());
        Ok(())
    }
}
