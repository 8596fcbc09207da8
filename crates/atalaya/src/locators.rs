//! The symbolic locator table.
//!
//! Page objects refer to elements by key (`"search"`, `"entity_select"`, ...)
//! instead of embedding selectors. The table is built once, never mutated, and
//! handed to [`PageBase`](crate::PageBase) behind an `Arc`, so a test can swap
//! in a different set without touching global state.
//!
//! Overrides can be loaded from YAML:
//!
//! ```yaml
//! search:
//!   strategy: css
//!   selector: "input#search"
//! entity_select:
//!   strategy: xpath
//!   selector: "//li/span[contains(., '%s')]"
//! ```

use std::collections::HashMap;
use std::path::Path;

use crate::locator::{Locator, Strategy};
use crate::result::{UiError, UiResult};

/// Well-known keys used by [`PageBase`](crate::PageBase) helpers
pub mod keys {
    /// Foreman search box
    pub const SEARCH: &str = "search";
    /// Foreman search submit control
    pub const SEARCH_BUTTON: &str = "search_button";
    /// Katello search box
    pub const KT_SEARCH: &str = "kt_search";
    /// Katello search submit control
    pub const KT_SEARCH_BUTTON: &str = "kt_search_button";
    /// Autocomplete suggestion item (templated by entity name)
    pub const AUTO_SEARCH: &str = "auto_search";
    /// "All values" checkbox (templated by context)
    pub const ALL_VALUES: &str = "all_values";
    /// Selectable entity in a multiselect (templated by entity name)
    pub const ENTITY_SELECT: &str = "entity_select";
    /// Selected entity in a multiselect (templated by entity name)
    pub const ENTITY_DESELECT: &str = "entity_deselect";
    /// Entity checkbox (templated by entity name)
    pub const ENTITY_CHECKBOX: &str = "entity_checkbox";
    /// Multiselect filter input (templated by filter key)
    pub const FILTER: &str = "filter";
    /// Parameters tab
    pub const PARAMETER_TAB: &str = "parameter_tab";
    /// "Add parameter" link
    pub const ADD_PARAMETER: &str = "add_parameter";
    /// New parameter name input
    pub const PARAMETER_NAME: &str = "parameter_name";
    /// New parameter value input
    pub const PARAMETER_VALUE: &str = "parameter_value";
    /// Remove link for a parameter (templated by parameter name)
    pub const PARAMETER_REMOVE: &str = "parameter_remove";
    /// Form submit control
    pub const SUBMIT: &str = "submit";
    /// Validation error next to the name field
    pub const NAME_HAS_ERROR: &str = "name_haserror";
    /// Settings: parameter row (templated by parameter name)
    pub const SETTINGS_PARAM: &str = "settings.param";
    /// Settings: inline edit control (templated by parameter name)
    pub const SETTINGS_EDIT_PARAM: &str = "settings.edit_param";
    /// Settings: dropdown value
    pub const SETTINGS_SELECT_VALUE: &str = "settings.select_value";
    /// Settings: dropdown option (templated by option value)
    pub const SETTINGS_SELECT_OPTION: &str = "settings.select_option";
    /// Settings: free text value
    pub const SETTINGS_INPUT_VALUE: &str = "settings.input_value";
    /// Settings: save inline edit
    pub const SETTINGS_SAVE: &str = "settings.save";
}

const BUILTIN: &[(&str, Strategy, &str)] = &[
    (keys::SEARCH, Strategy::Id, "search"),
    (
        keys::SEARCH_BUTTON,
        Strategy::XPath,
        "//button[contains(@type,'submit') and contains(@class,'btn')]",
    ),
    (
        keys::KT_SEARCH,
        Strategy::Css,
        "input[ng-model='table.searchTerm']",
    ),
    (
        keys::KT_SEARCH_BUTTON,
        Strategy::Css,
        "button[ng-click='table.search(table.searchTerm)']",
    ),
    (
        keys::AUTO_SEARCH,
        Strategy::XPath,
        "//ul[contains(@class,'ui-autocomplete')]/li/a[contains(., '%s')]",
    ),
    (
        keys::ALL_VALUES,
        Strategy::XPath,
        "//input[contains(@id,'all_values') and contains(@id,'%s')]",
    ),
    (
        keys::ENTITY_SELECT,
        Strategy::XPath,
        "//div[@class='ms-selectable']//li[not(contains(@style,'display: none'))]/span[contains(.,'%s')]",
    ),
    (
        keys::ENTITY_DESELECT,
        Strategy::XPath,
        "//div[@class='ms-selection']//li[not(contains(@style,'display: none'))]/span[contains(.,'%s')]",
    ),
    (
        keys::ENTITY_CHECKBOX,
        Strategy::XPath,
        "//label[normalize-space(.)='%s']/input[@type='checkbox']",
    ),
    (
        keys::FILTER,
        Strategy::XPath,
        "//div[@id='ms-%s_ids']//input[@class='ms-filter']",
    ),
    (
        keys::PARAMETER_TAB,
        Strategy::XPath,
        "//a[contains(., 'Parameters')]",
    ),
    (
        keys::ADD_PARAMETER,
        Strategy::XPath,
        "//a[contains(text(),'+ Add Parameter')]",
    ),
    (
        keys::PARAMETER_NAME,
        Strategy::XPath,
        "//input[@placeholder='Name' and not(@value)]",
    ),
    (
        keys::PARAMETER_VALUE,
        Strategy::XPath,
        "//textarea[@placeholder='Value' and not(text())]",
    ),
    (
        keys::PARAMETER_REMOVE,
        Strategy::XPath,
        "//tr/td/input[@value='%s']/following::td/a",
    ),
    (keys::SUBMIT, Strategy::Name, "commit"),
    (
        keys::NAME_HAS_ERROR,
        Strategy::XPath,
        "//label[@for='name']/../../div[contains(@class,'has-error')]",
    ),
    (keys::SETTINGS_PARAM, Strategy::XPath, "//td[contains(., '%s')]"),
    (
        keys::SETTINGS_EDIT_PARAM,
        Strategy::XPath,
        "//tr[td[contains(., '%s')]]//span[contains(@class,'editable')]",
    ),
    (
        keys::SETTINGS_SELECT_VALUE,
        Strategy::Css,
        "select[name='setting[value]']",
    ),
    (
        keys::SETTINGS_SELECT_OPTION,
        Strategy::XPath,
        "//select[@name='setting[value]']/option[@value='%s']",
    ),
    (
        keys::SETTINGS_INPUT_VALUE,
        Strategy::Css,
        "input[name='setting[value]']",
    ),
    (
        keys::SETTINGS_SAVE,
        Strategy::XPath,
        "//button[@type='submit' and contains(@class,'editable-submit')]",
    ),
];

/// Immutable mapping from symbolic key to [`Locator`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorTable {
    entries: HashMap<String, Locator>,
}

impl LocatorTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The table shipped with Atalaya
    #[must_use]
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(key, strategy, selector)| ((*key).to_string(), Locator::new(*strategy, *selector)))
            .collect();
        Self { entries }
    }

    /// Parse a table from YAML
    ///
    /// # Errors
    ///
    /// Returns error if the YAML is malformed or a selector carries more than
    /// one placeholder
    pub fn from_yaml_str(yaml: &str) -> UiResult<Self> {
        let entries: HashMap<String, Locator> = serde_yaml_ng::from_str(yaml)?;
        let table = Self { entries };
        table.validate()?;
        Ok(table)
    }

    /// Read a table from a YAML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_yaml_file(path: impl AsRef<Path>) -> UiResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Add or replace a single entry
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, locator: Locator) -> Self {
        let _ = self.entries.insert(key.into(), locator);
        self
    }

    /// Entries of `overrides` replace entries with the same key
    #[must_use]
    pub fn merged(mut self, overrides: Self) -> Self {
        self.entries.extend(overrides.entries);
        self
    }

    /// Look up a key
    ///
    /// # Errors
    ///
    /// Returns [`UiError::UnknownLocator`] if the key is not defined
    pub fn get(&self, key: &str) -> UiResult<&Locator> {
        self.entries.get(key).ok_or_else(|| UiError::UnknownLocator {
            key: key.to_string(),
        })
    }

    /// Look up a templated key and substitute `value`
    ///
    /// # Errors
    ///
    /// Returns [`UiError::UnknownLocator`] if the key is not defined
    pub fn templated(&self, key: &str, value: &str) -> UiResult<Locator> {
        Ok(self.get(key)?.with_value(value))
    }

    /// Whether a key is defined
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn validate(&self) -> UiResult<()> {
        for (key, locator) in &self.entries {
            if locator.placeholder_count() > 1 {
                return Err(UiError::InvalidLocator {
                    key: key.clone(),
                    message: format!(
                        "selector {:?} has more than one placeholder",
                        locator.selector()
                    ),
                });
            }
            if locator.selector().trim().is_empty() {
                return Err(UiError::InvalidLocator {
                    key: key.clone(),
                    message: "selector is empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod builtin_tests {
        use super::*;

        #[test]
        fn test_builtin_has_required_keys() {
            let table = LocatorTable::builtin();
            for key in [
                keys::SEARCH,
                keys::SEARCH_BUTTON,
                keys::KT_SEARCH,
                keys::KT_SEARCH_BUTTON,
                keys::AUTO_SEARCH,
                keys::ALL_VALUES,
                keys::ENTITY_SELECT,
                keys::ENTITY_DESELECT,
                keys::FILTER,
            ] {
                assert!(table.contains(key), "missing {key}");
            }
        }

        #[test]
        fn test_builtin_is_valid() {
            assert!(LocatorTable::builtin().validate().is_ok());
        }

        #[test]
        fn test_builtin_keys_are_unique() {
            assert_eq!(LocatorTable::builtin().len(), BUILTIN.len());
        }

        #[test]
        fn test_templated_entries() {
            let table = LocatorTable::builtin();
            assert!(table.get(keys::ENTITY_SELECT).unwrap().is_template());
            assert!(!table.get(keys::SEARCH).unwrap().is_template());
            let filter = table.templated(keys::FILTER, "operatingsystem").unwrap();
            assert!(filter.selector().contains("ms-operatingsystem_ids"));
        }
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn test_unknown_key() {
            let err = LocatorTable::new().get("nope").unwrap_err();
            assert!(matches!(err, UiError::UnknownLocator { key } if key == "nope"));
        }

        #[test]
        fn test_with_replaces_entry() {
            let table = LocatorTable::builtin().with(keys::SEARCH, Locator::css("#q"));
            assert_eq!(table.get(keys::SEARCH).unwrap().selector(), "#q");
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_from_yaml() {
            let table = LocatorTable::from_yaml_str(
                "search:\n  strategy: css\n  selector: \"input#q\"\n\
                 entity:\n  strategy: xpath\n  selector: \"//a[.='%s']\"\n",
            )
            .unwrap();
            assert_eq!(table.len(), 2);
            assert_eq!(table.get("search").unwrap().strategy(), Strategy::Css);
            assert_eq!(
                table.templated("entity", "foo").unwrap().selector(),
                "//a[.='foo']"
            );
        }

        #[test]
        fn test_yaml_rejects_two_placeholders() {
            let err = LocatorTable::from_yaml_str(
                "bad:\n  strategy: css\n  selector: \"#%s-%s\"\n",
            )
            .unwrap_err();
            assert!(matches!(err, UiError::InvalidLocator { .. }));
        }

        #[test]
        fn test_yaml_rejects_unknown_strategy() {
            let err =
                LocatorTable::from_yaml_str("bad:\n  strategy: telepathy\n  selector: x\n")
                    .unwrap_err();
            assert!(matches!(err, UiError::Yaml(_)));
        }

        #[test]
        fn test_merged_overrides_builtin() {
            let overrides =
                LocatorTable::from_yaml_str("search:\n  strategy: name\n  selector: q\n").unwrap();
            let table = LocatorTable::builtin().merged(overrides);
            assert_eq!(table.get(keys::SEARCH).unwrap().strategy(), Strategy::Name);
            assert!(table.contains(keys::KT_SEARCH));
        }

        #[test]
        fn test_from_yaml_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("locators.yaml");
            std::fs::write(&path, "submit:\n  strategy: id\n  selector: save\n").unwrap();
            let table = LocatorTable::from_yaml_file(&path).unwrap();
            assert_eq!(table.get(keys::SUBMIT).unwrap().selector(), "save");
        }
    }
}
