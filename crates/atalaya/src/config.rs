//! Runtime configuration.
//!
//! Defaults match the product's UI timings. A YAML file can override them, and
//! environment variables override the file:
//!
//! | Variable                      | Field                     |
//! |-------------------------------|---------------------------|
//! | `ATALAYA_WAIT_TIMEOUT_MS`     | `wait.timeout_ms`         |
//! | `ATALAYA_POLL_INTERVAL_MS`    | `wait.poll_interval_ms`   |
//! | `ATALAYA_SETTLE_TIMEOUT_MS`   | `settle.timeout_ms`       |
//! | `ATALAYA_LOCATORS`            | `locator_file`            |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::locators::LocatorTable;
use crate::result::{UiError, UiResult};
use crate::wait::{SettleOptions, WaitOptions};

/// Environment variable overriding the element wait timeout
pub const ENV_WAIT_TIMEOUT_MS: &str = "ATALAYA_WAIT_TIMEOUT_MS";
/// Environment variable overriding the poll interval
pub const ENV_POLL_INTERVAL_MS: &str = "ATALAYA_POLL_INTERVAL_MS";
/// Environment variable overriding the settle timeout
pub const ENV_SETTLE_TIMEOUT_MS: &str = "ATALAYA_SETTLE_TIMEOUT_MS";
/// Environment variable pointing at a locator override file
pub const ENV_LOCATORS: &str = "ATALAYA_LOCATORS";

/// UI interaction configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Element wait bounds
    pub wait: WaitOptions,
    /// Settle barrier bounds
    pub settle: SettleOptions,
    /// YAML file whose entries override the builtin locator table
    pub locator_file: Option<PathBuf>,
}

impl UiConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set element wait bounds
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Set settle barrier bounds
    #[must_use]
    pub const fn with_settle(mut self, settle: SettleOptions) -> Self {
        self.settle = settle;
        self
    }

    /// Set locator override file
    #[must_use]
    pub fn with_locator_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.locator_file = Some(path.into());
        self
    }

    /// Parse configuration from YAML
    ///
    /// # Errors
    ///
    /// Returns error if the YAML is malformed
    pub fn from_yaml_str(yaml: &str) -> UiResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> UiResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply overrides from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but not a valid number
    pub fn with_env_overrides(self) -> UiResult<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but not a valid number
    pub fn with_overrides_from<F>(mut self, lookup: F) -> UiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = parse_ms(&lookup, ENV_WAIT_TIMEOUT_MS)? {
            self.wait.timeout_ms = ms;
        }
        if let Some(ms) = parse_ms(&lookup, ENV_POLL_INTERVAL_MS)? {
            self.wait.poll_interval_ms = ms;
            self.settle.poll_interval_ms = ms;
        }
        if let Some(ms) = parse_ms(&lookup, ENV_SETTLE_TIMEOUT_MS)? {
            self.settle.timeout_ms = ms;
        }
        if let Some(path) = lookup(ENV_LOCATORS).filter(|p| !p.is_empty()) {
            self.locator_file = Some(PathBuf::from(path));
        }
        Ok(self)
    }

    /// Builtin locator table merged with `locator_file`, if any
    ///
    /// # Errors
    ///
    /// Returns error if the override file cannot be loaded
    pub fn locator_table(&self) -> UiResult<LocatorTable> {
        let builtin = LocatorTable::builtin();
        match &self.locator_file {
            Some(path) => Ok(builtin.merged(LocatorTable::from_yaml_file(path)?)),
            None => Ok(builtin),
        }
    }
}

fn parse_ms<F>(lookup: &F, name: &str) -> UiResult<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|e| {
                UiError::config(format!("{name}={raw:?} is not a millisecond count: {e}"))
            })
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_default_config() {
            let config = UiConfig::default();
            assert_eq!(config.wait.timeout_ms, 12_000);
            assert_eq!(config.wait.poll_interval_ms, 500);
            assert_eq!(config.settle.timeout_ms, 30_000);
            assert!(config.locator_file.is_none());
        }

        #[test]
        fn test_builders() {
            let config = UiConfig::new()
                .with_wait(WaitOptions::new().with_timeout(1_000))
                .with_settle(SettleOptions::new().with_timeout(2_000))
                .with_locator_file("/tmp/l.yaml");
            assert_eq!(config.wait.timeout_ms, 1_000);
            assert_eq!(config.settle.timeout_ms, 2_000);
            assert_eq!(config.locator_file, Some(PathBuf::from("/tmp/l.yaml")));
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let config = UiConfig::from_yaml_str("wait:\n  timeout_ms: 3000\n  poll_interval_ms: 100\n").unwrap();
            assert_eq!(config.wait.timeout_ms, 3_000);
            assert_eq!(config.wait.poll_interval_ms, 100);
            assert_eq!(config.settle, SettleOptions::default());
        }

        #[test]
        fn test_malformed_yaml() {
            assert!(matches!(
                UiConfig::from_yaml_str("wait: [1, 2"),
                Err(UiError::Yaml(_))
            ));
        }

        #[test]
        fn test_from_file_and_locator_table() {
            let dir = tempfile::tempdir().unwrap();
            let locators = dir.path().join("locators.yaml");
            std::fs::write(&locators, "search:\n  strategy: css\n  selector: \"#q\"\n").unwrap();
            let config_path = dir.path().join("atalaya.yaml");
            std::fs::write(
                &config_path,
                format!("locator_file: {}\n", locators.display()),
            )
            .unwrap();

            let config = UiConfig::from_file(&config_path).unwrap();
            let table = config.locator_table().unwrap();
            assert_eq!(table.get("search").unwrap().selector(), "#q");
            assert!(table.contains("kt_search"));
        }

        #[test]
        fn test_missing_locator_file() {
            let config = UiConfig::new().with_locator_file("/nonexistent/atalaya/locators.yaml");
            assert!(matches!(config.locator_table(), Err(UiError::Io(_))));
        }
    }

    mod env_tests {
        use super::*;

        #[test]
        fn test_env_overrides() {
            let config = UiConfig::new()
                .with_overrides_from(env(&[
                    (ENV_WAIT_TIMEOUT_MS, "2000"),
                    (ENV_POLL_INTERVAL_MS, " 50 "),
                    (ENV_SETTLE_TIMEOUT_MS, "9000"),
                    (ENV_LOCATORS, "/etc/atalaya/locators.yaml"),
                ]))
                .unwrap();
            assert_eq!(config.wait.timeout_ms, 2_000);
            assert_eq!(config.wait.poll_interval_ms, 50);
            assert_eq!(config.settle.poll_interval_ms, 50);
            assert_eq!(config.settle.timeout_ms, 9_000);
            assert_eq!(
                config.locator_file,
                Some(PathBuf::from("/etc/atalaya/locators.yaml"))
            );
        }

        #[test]
        fn test_no_env_is_identity() {
            let config = UiConfig::new().with_overrides_from(env(&[])).unwrap();
            assert_eq!(config, UiConfig::default());
        }

        #[test]
        fn test_invalid_number() {
            let err = UiConfig::new()
                .with_overrides_from(env(&[(ENV_WAIT_TIMEOUT_MS, "soon")]))
                .unwrap_err();
            assert!(err.to_string().contains(ENV_WAIT_TIMEOUT_MS));
        }
    }
}
