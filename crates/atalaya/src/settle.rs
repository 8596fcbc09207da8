//! Settle barrier: wait until the page has no requests in flight.
//!
//! The product UI mixes two client frameworks, each with its own pending
//! request counter. The page is settled when both read zero. A probe that
//! fails (the framework is not loaded on this page) counts as zero.

use tracing::{debug, trace};

use crate::clock::Clock;
use crate::driver::Driver;
use crate::result::{UiError, UiResult};
use crate::wait::{poll_predicate, SettleOptions};

/// Pending-request probe for one client framework
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// jQuery's global `$.active` counter
    JQuery,
    /// AngularJS `$http.pendingRequests`
    Angular,
}

impl Probe {
    /// Both probes, in evaluation order
    pub const ALL: [Self; 2] = [Self::JQuery, Self::Angular];

    /// Script returning the probe's pending count
    #[must_use]
    pub const fn script(&self) -> &'static str {
        match self {
            Self::JQuery => "return jQuery.active",
            Self::Angular => {
                "return angular.element(document).injector().get(\"$http\").pendingRequests.length"
            }
        }
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::JQuery => "jquery",
            Self::Angular => "angular",
        }
    }
}

/// Whether `probe` currently reports requests in flight.
///
/// Any backend fault while probing is swallowed and read as "not active".
pub fn probe_active(driver: &dyn Driver, probe: Probe) -> bool {
    match driver.execute_script(probe.script()) {
        Ok(value) => {
            let pending = value.as_f64().unwrap_or(0.0);
            trace!(probe = probe.name(), pending, "pending requests");
            pending > 0.0
        }
        Err(err) => {
            trace!(probe = probe.name(), error = %err, "probe failed, treating as inactive");
            false
        }
    }
}

/// Whether both pending counters are zero
pub fn is_settled(driver: &dyn Driver) -> bool {
    Probe::ALL.iter().all(|probe| !probe_active(driver, *probe))
}

/// Block until the page is settled.
///
/// # Errors
///
/// Returns [`UiError::SettleTimeout`] if requests are still pending after
/// `options.timeout_ms`
pub fn settle_barrier(driver: &dyn Driver, clock: &dyn Clock, options: &SettleOptions) -> UiResult<()> {
    let settled = poll_predicate(clock, &options.as_wait(), || Ok(is_settled(driver)))?;
    if settled {
        Ok(())
    } else {
        debug!(timeout_ms = options.timeout_ms, "page did not settle");
        Err(UiError::SettleTimeout {
            ms: options.timeout_ms,
        })
    }
}
