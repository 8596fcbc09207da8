//! Chromium backend over the Chrome `DevTools` Protocol.
//!
//! [`ChromiumDriver`] owns a private tokio runtime and blocks on it for every
//! [`Driver`] call, so the synchronous wait loops in [`PageBase`](crate::PageBase)
//! run unchanged against a real browser.
//!
//! Locators are resolved by JavaScript in the page. The first element matched
//! is tagged with a `data-atalaya-handle` attribute holding a fresh UUID; that
//! id is the [`ElementHandle`] and every later call looks the node up by it.
//! A node that has been removed (or re-rendered) no longer carries the
//! attribute and reports [`DriverError::StaleElement`].

use std::path::PathBuf;

use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::page::HandleJavaScriptDialogParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde_json::Value;
use tracing::debug;

use crate::driver::{Driver, ElementHandle};
use crate::locator::{js_string, Locator};
use crate::result::{DriverError, DriverResult};

/// Attribute carrying the element handle id
pub const HANDLE_ATTRIBUTE: &str = "data-atalaya-handle";

/// Chromium launch options
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    /// Run without a window
    pub headless: bool,
    /// Keep Chromium's sandbox (disable inside containers)
    pub sandbox: bool,
    /// Chromium binary (None = auto-detect)
    pub chromium_path: Option<PathBuf>,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
            chromium_path: None,
            window_width: 1280,
            window_height: 1024,
        }
    }
}

impl ChromiumConfig {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set window size
    #[must_use]
    pub const fn with_window(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }
}

/// [`Driver`] backed by a Chromium page
#[derive(Debug)]
pub struct ChromiumDriver {
    runtime: tokio::runtime::Runtime,
    browser: CdpBrowser,
    page: CdpPage,
    handler: tokio::task::JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Connection`] if the runtime cannot be built or
    /// Chromium cannot be launched
    pub fn launch(config: &ChromiumConfig) -> DriverResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| DriverError::connection(format!("tokio runtime: {e}")))?;

        let mut builder = CdpConfig::builder().window_size(config.window_width, config.window_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(DriverError::connection)?;

        let (browser, page, handler) = runtime.block_on(async {
            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(cdp_error)?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });
            let page = browser.new_page("about:blank").await.map_err(cdp_error)?;
            Ok::<_, DriverError>((browser, page, handler))
        })?;
        debug!(headless = config.headless, "chromium launched");

        Ok(Self {
            runtime,
            browser,
            page,
            handler,
        })
    }

    /// Navigate the page and wait for the load event
    ///
    /// # Errors
    ///
    /// Returns error if navigation fails
    pub fn goto(&self, url: &str) -> DriverResult<()> {
        self.runtime.block_on(async {
            let _ = self.page.goto(url).await.map_err(cdp_error)?;
            Ok::<(), DriverError>(())
        })
    }

    /// Close the browser
    ///
    /// # Errors
    ///
    /// Returns error if Chromium does not acknowledge the close
    pub fn close(mut self) -> DriverResult<()> {
        let browser = &mut self.browser;
        let result = self.runtime.block_on(async {
            let _ = browser.close().await.map_err(cdp_error)?;
            let _ = browser.wait().await;
            Ok::<(), DriverError>(())
        });
        self.handler.abort();
        result
    }

    fn evaluate(&self, expression: String) -> DriverResult<Value> {
        self.runtime.block_on(async {
            let result = self.page.evaluate(expression).await.map_err(cdp_error)?;
            Ok::<Value, DriverError>(result.value().cloned().unwrap_or(Value::Null))
        })
    }

    /// Run `body` with `el` bound to the tagged node
    fn on_element(&self, element: &ElementHandle, body: &str) -> DriverResult<Value> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({selector}); \
             if (!el || !el.isConnected) return {{ stale: true }}; \
             return {{ value: (() => {{ {body} }})() }}; }})()",
            selector = js_string(&handle_selector(&element.id)),
        );
        let mut reply = self.evaluate(expression)?;
        if reply.get("stale").and_then(Value::as_bool) == Some(true) {
            return Err(DriverError::StaleElement {
                handle: element.id.clone(),
            });
        }
        Ok(reply.get_mut("value").map(Value::take).unwrap_or(Value::Null))
    }

    fn on_element_bool(&self, element: &ElementHandle, body: &str) -> DriverResult<bool> {
        Ok(self.on_element(element, body)?.as_bool().unwrap_or(false))
    }

    fn handle_dialog(&self, accept: bool) -> DriverResult<()> {
        self.runtime.block_on(async {
            match self.page.execute(HandleJavaScriptDialogParams::new(accept)).await {
                Ok(_) => Ok(()),
                Err(err) if err.to_string().contains("No dialog") => Err(DriverError::NoAlert),
                Err(err) => Err(cdp_error(err)),
            }
        })
    }
}

impl Driver for ChromiumDriver {
    fn find_element(&self, locator: &Locator) -> DriverResult<ElementHandle> {
        let expression = format!(
            "(() => {{ const el = {query}; if (!el) return null; \
             let id = el.getAttribute({attr}); \
             if (!id) {{ id = {fresh}; el.setAttribute({attr}, id); }} \
             return {{ id: id, tag: el.tagName.toLowerCase() }}; }})()",
            query = locator.to_js_query(),
            attr = js_string(HANDLE_ATTRIBUTE),
            fresh = js_string(&uuid::Uuid::new_v4().to_string()),
        );
        let found = self.evaluate(expression)?;
        match (found.get("id").and_then(Value::as_str), found.get("tag").and_then(Value::as_str)) {
            (Some(id), Some(tag)) => Ok(ElementHandle::new(id, tag)),
            _ => Err(DriverError::no_such_element(locator.selector())),
        }
    }

    fn is_displayed(&self, element: &ElementHandle) -> DriverResult<bool> {
        self.on_element_bool(
            element,
            "const r = el.getBoundingClientRect(); const s = getComputedStyle(el); \
             return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';",
        )
    }

    fn is_enabled(&self, element: &ElementHandle) -> DriverResult<bool> {
        self.on_element_bool(element, "return !el.disabled;")
    }

    fn is_selected(&self, element: &ElementHandle) -> DriverResult<bool> {
        self.on_element_bool(element, "return !!(el.checked || el.selected);")
    }

    fn is_clickable(&self, element: &ElementHandle) -> DriverResult<bool> {
        self.on_element_bool(
            element,
            "if (el.disabled) return false; \
             const r = el.getBoundingClientRect(); \
             if (r.width === 0 || r.height === 0) return false; \
             const top = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2); \
             return top === null || top === el || el.contains(top);",
        )
    }

    fn click(&self, element: &ElementHandle) -> DriverResult<()> {
        let selector = handle_selector(&element.id);
        self.runtime.block_on(async {
            let node = self.page.find_element(selector).await.map_err(|_| DriverError::StaleElement {
                handle: element.id.clone(),
            })?;
            let _ = node.click().await.map_err(cdp_error)?;
            Ok::<(), DriverError>(())
        })
    }

    fn clear(&self, element: &ElementHandle) -> DriverResult<()> {
        let _ = self.on_element(
            element,
            "el.value = ''; el.dispatchEvent(new Event('input', { bubbles: true })); return true;",
        )?;
        Ok(())
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        let selector = handle_selector(&element.id);
        self.runtime.block_on(async {
            let node = self.page.find_element(selector).await.map_err(|_| DriverError::StaleElement {
                handle: element.id.clone(),
            })?;
            let _ = node.focus().await.map_err(cdp_error)?;
            let _ = node.type_str(text).await.map_err(cdp_error)?;
            Ok::<(), DriverError>(())
        })
    }

    fn text(&self, element: &ElementHandle) -> DriverResult<String> {
        let value = self.on_element(element, "return el.innerText;")?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>> {
        let value = self.on_element(element, &format!("return el.getAttribute({});", js_string(name)))?;
        Ok(value.as_str().map(str::to_string))
    }

    fn execute_script(&self, script: &str) -> DriverResult<Value> {
        self.evaluate(format!("(function() {{ {script} }})()"))
    }

    fn accept_alert(&self) -> DriverResult<()> {
        self.handle_dialog(true)
    }

    fn dismiss_alert(&self) -> DriverResult<()> {
        self.handle_dialog(false)
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn handle_selector(id: &str) -> String {
    format!("[{HANDLE_ATTRIBUTE}=\"{id}\"]")
}

fn cdp_error(err: CdpError) -> DriverError {
    match err {
        CdpError::JavascriptException(details) => DriverError::script(details.text.clone()),
        CdpError::Timeout => DriverError::Timeout {
            message: "CDP request timed out".to_string(),
        },
        CdpError::Ws(e) => DriverError::connection(e.to_string()),
        other => DriverError::Other {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_selector() {
        assert_eq!(handle_selector("abc"), "[data-atalaya-handle=\"abc\"]");
    }

    #[test]
    fn test_config_builders() {
        let config = ChromiumConfig::default()
            .with_headless(false)
            .with_no_sandbox()
            .with_window(800, 600)
            .with_chromium_path("/usr/bin/chromium");
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!((config.window_width, config.window_height), (800, 600));
        assert_eq!(config.chromium_path, Some(PathBuf::from("/usr/bin/chromium")));
    }
}
