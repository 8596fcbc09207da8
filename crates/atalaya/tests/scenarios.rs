//! End-to-end scenarios against the scripted driver and a virtual clock.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use atalaya::settle::settle_barrier;
use atalaya::{
    keys, Clock, FakeClock, Locator, LocatorTable, MockDriver, MockElement, PageBase, ScriptResponse,
    SearchRequest, SettleOptions, UiConfig, UiError, WaitOptions,
};
use proptest::prelude::*;
use serde_json::json;

const ENTITY_KEY: &str = "entity_link";

fn table() -> Arc<LocatorTable> {
    Arc::new(LocatorTable::builtin().with(ENTITY_KEY, Locator::css("#entity-%s")))
}

fn session() -> (Arc<FakeClock>, MockDriver) {
    atalaya::logging::init_test_tracing();
    let clock = Arc::new(FakeClock::new());
    let driver = MockDriver::new(clock.clone());
    (clock, driver)
}

fn page<'d>(clock: &Arc<FakeClock>, driver: &'d MockDriver) -> PageBase<'d> {
    PageBase::new(driver, table()).with_clock(clock.clone()).named("OperatingSys")
}

mod wait_scenarios {
    use super::*;

    proptest! {
        #[test]
        fn prop_absent_after_timeout_within_one_interval(
            timeout_ms in 1u64..60_000,
            poll_fraction in 0.001f64..0.999,
        ) {
            let poll_ms = ((timeout_ms as f64) * poll_fraction).max(1.0) as u64;
            prop_assume!(poll_ms < timeout_ms);
            let (clock, driver) = session();
            let opts = WaitOptions::new().with_timeout(timeout_ms).with_poll_interval(poll_ms);

            let found = page(&clock, &driver)
                .wait_until_present(&Locator::css("#never"), &opts)
                .unwrap();

            prop_assert!(found.is_none());
            let elapsed = clock.now();
            prop_assert!(elapsed >= Duration::from_millis(timeout_ms));
            prop_assert!(elapsed <= Duration::from_millis(timeout_ms + poll_ms));
        }
    }

    #[test]
    fn test_templated_entity_appears_late() {
        let (clock, driver) = session();
        let table = table();
        let locator = table.templated(ENTITY_KEY, "foo").unwrap();
        assert_eq!(locator.selector(), "#entity-foo");
        driver.add_element(MockElement::new("foo", locator.clone()).appear_after(Duration::from_secs(2)));

        let opts = WaitOptions::new().with_timeout(12_000).with_poll_interval(500);
        let found = page(&clock, &driver).wait_until_visible(&locator, &opts).unwrap();

        assert_eq!(found.unwrap().id, "foo");
        assert_eq!(clock.now(), Duration::from_secs(2));
    }

    #[test]
    fn test_hidden_element_is_absent() {
        let (clock, driver) = session();
        driver.add_element(MockElement::new("ghost", Locator::css("#ghost")).hidden());
        assert!(page(&clock, &driver).find(&Locator::css("#ghost")).unwrap().is_none());
    }

    #[test]
    fn test_clickable_race_guard() {
        let (clock, driver) = session();
        driver.add_element(
            MockElement::new("submit", Locator::name("commit"))
                .disabled()
                .clickable(true),
        );
        let found = page(&clock, &driver).clickable(&Locator::name("commit")).unwrap();
        assert!(found.is_none());
    }
}

mod click_scenarios {
    use super::*;

    #[test]
    fn test_click_unresolvable_raises_after_timeout() {
        let (clock, driver) = session();
        let err = page(&clock, &driver).click(&Locator::css("#entity-foo")).unwrap_err();

        assert!(err.is_no_such_element());
        let message = err.to_string();
        assert!(message.contains("#entity-foo"), "{message}");
        assert!(message.contains("OperatingSys"), "{message}");
        assert_eq!(clock.now(), Duration::from_secs(12));
    }

    #[test]
    fn test_click_waits_for_page_to_settle() {
        let (clock, driver) = session();
        driver.add_element(MockElement::new("save", Locator::id("save")));
        driver.on_script(
            "pendingRequests",
            ScriptResponse::ValueUntil {
                value: json!(2),
                until: Duration::from_secs(4),
                then: json!(0),
            },
        );
        page(&clock, &driver).click(&Locator::id("save")).unwrap();
        assert!(driver.was_called("click:save"));
        assert_eq!(clock.now(), Duration::from_secs(4));
    }
}

mod settle_scenarios {
    use super::*;

    #[test]
    fn test_static_page_settles_immediately() {
        let (clock, driver) = session();
        driver.on_script("jQuery", ScriptResponse::Error("jQuery is not defined".into()));
        driver.on_script("angular", ScriptResponse::Error("angular is not defined".into()));

        settle_barrier(&driver, clock.as_ref(), &SettleOptions::default()).unwrap();
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_persistent_activity_times_out() {
        let (clock, driver) = session();
        driver.on_script("jQuery", ScriptResponse::Value(json!(1)));
        let opts = SettleOptions::new().with_timeout(5_000);

        let err = page(&clock, &driver).settle_barrier(&opts).unwrap_err();
        assert!(matches!(err, UiError::SettleTimeout { ms: 5_000 }));
        assert!(clock.now() >= Duration::from_secs(5));
    }
}

mod search_scenarios {
    use super::*;

    pub(super) fn search_page(driver: &MockDriver, table: &LocatorTable) {
        driver.add_element(MockElement::new("search", table.get(keys::SEARCH).unwrap().clone()));
        driver.add_element(MockElement::new(
            "search-go",
            table.get(keys::SEARCH_BUTTON).unwrap().clone(),
        ));
    }

    #[test]
    fn test_query_escapes_backslash_before_quote() {
        let (clock, driver) = session();
        let table = table();
        search_page(&driver, &table);
        let name = "a\"b\\c";
        let entity = table.get(ENTITY_KEY).unwrap().clone();
        driver.add_element(MockElement::new("hit", entity.with_value(name)));

        let found = page(&clock, &driver)
            .search_entity(name, &entity, &SearchRequest::new())
            .unwrap();

        assert_eq!(found.unwrap().id, "hit");
        assert_eq!(
            driver.element_text("search").unwrap(),
            r#"name = "a\"b\\c""#
        );
    }

    #[test]
    fn test_name_with_percent_s_is_found() {
        let (clock, driver) = session();
        let table = table();
        search_page(&driver, &table);
        let name = "50%s off";
        let entity = Locator::xpath("//a[contains(., '%s')]");
        driver.add_element(MockElement::new("sale", entity.with_value(name)));

        let found = page(&clock, &driver)
            .search_entity(name, &entity, &SearchRequest::new())
            .unwrap();

        assert_eq!(found.unwrap().id, "sale");
    }

    #[test]
    fn test_missing_search_box_asymmetry() {
        let (clock, driver) = session();
        let config = UiConfig::new().with_wait(WaitOptions::new().with_timeout(1_000));
        let base = page(&clock, &driver).with_config(config);
        let entity = Locator::css("#entity-%s");

        assert!(base
            .search_entity("foo", &entity, &SearchRequest::new())
            .unwrap()
            .is_none());
        let err = base
            .search_entity("foo", &entity, &SearchRequest::katello())
            .unwrap_err();
        assert!(err.is_no_such_element());
    }

    #[test]
    fn test_delete_entity_not_found() {
        let (clock, driver) = session();
        let config = UiConfig::new().with_wait(WaitOptions::new().with_timeout(1_000));
        let base = page(&clock, &driver).with_config(config);
        let entity = Locator::css("#entity-%s");
        let delete = Locator::css("#delete-%s");

        let err = base
            .delete_entity("foo", true, &entity, &delete, None, None)
            .unwrap_err();
        assert!(matches!(err, UiError::EntityNotFound { name } if name == "foo"));
    }

    #[test]
    fn test_delete_entity_confirms_alert() {
        let (clock, driver) = session();
        let table = table();
        search_page(&driver, &table);
        let entity = Locator::css("#entity-%s");
        let delete = Locator::css("#delete-%s");
        driver.add_element(MockElement::new("row", entity.with_value("foo")));
        driver.add_element(MockElement::new("del", delete.with_value("foo")).opens_alert());

        page(&clock, &driver)
            .delete_entity("foo", true, &entity, &delete, None, Some("title"))
            .unwrap();

        assert!(driver.was_called("send_keys:search:title = \"foo\""));
        assert!(driver.was_called("accept_alert"));
        assert!(!driver.alert_open());
    }
}

mod helper_scenarios {
    use super::*;
    use super::search_scenarios::search_page;

    #[test]
    fn test_configure_entity_uses_filter_then_checkbox() {
        let (clock, driver) = session();
        let table = table();
        let select = table.get(keys::ENTITY_SELECT).unwrap();
        driver.add_element(MockElement::new(
            "filter",
            table.templated(keys::FILTER, "organization").unwrap(),
        ));
        driver.add_element(MockElement::new("org-a", select.with_value("OrgA")));
        driver.add_element(MockElement::new("org-b", select.with_value("OrgB")));
        driver.on_script("window.scroll", ScriptResponse::Value(json!(null)));

        page(&clock, &driver)
            .configure_entity(&["OrgA"], "organization", None, &["OrgB"], true)
            .unwrap();

        assert!(driver.was_called("click:org-a"));
        assert!(driver.was_called("click:org-b"));
        assert_eq!(driver.element_text("filter").unwrap(), "OrgB");
    }

    #[test]
    fn test_select_without_filter_clicks_checkbox() {
        let (clock, driver) = session();
        let table = table();
        let config = UiConfig::new().with_wait(WaitOptions::new().with_timeout(500));
        let checkbox = table.templated(keys::ENTITY_CHECKBOX, "Default Location").unwrap();
        driver.add_element(
            MockElement::new("loc", checkbox)
                .tag("input")
                .with_attribute("type", "checkbox"),
        );
        driver.on_script("window.scroll", ScriptResponse::Value(json!(null)));

        let select = table.get(keys::ENTITY_SELECT).unwrap();
        page(&clock, &driver)
            .with_config(config)
            .select_deselect_entity("location", select, &["Default Location"])
            .unwrap();

        assert!(driver.was_called("click:loc"));
    }

    #[test]
    fn test_set_and_remove_parameter() {
        let (clock, driver) = session();
        let table = table();
        for (id, key) in [
            ("tab", keys::PARAMETER_TAB),
            ("add", keys::ADD_PARAMETER),
            ("pname", keys::PARAMETER_NAME),
            ("pvalue", keys::PARAMETER_VALUE),
            ("commit", keys::SUBMIT),
        ] {
            driver.add_element(MockElement::new(id, table.get(key).unwrap().clone()));
        }
        driver.add_element(MockElement::new(
            "remove",
            table.templated(keys::PARAMETER_REMOVE, "color").unwrap(),
        ));

        let base = page(&clock, &driver);
        base.set_parameter("color", "blue").unwrap();
        assert_eq!(driver.element_text("pname").unwrap(), "color");
        assert_eq!(driver.element_text("pvalue").unwrap(), "blue");

        base.remove_parameter("color").unwrap();
        assert!(driver.was_called("click:remove"));
    }

    #[test]
    fn test_auto_complete_search() {
        let (clock, driver) = session();
        let table = table();
        search_page(&driver, &table);
        let entity = Locator::css("#entity-%s");
        driver.add_element(MockElement::new(
            "suggestion",
            table.templated(keys::AUTO_SEARCH, "rhel-7").unwrap(),
        ));
        driver.add_element(MockElement::new("row", entity.with_value("rhel-7")));

        let found = page(&clock, &driver)
            .auto_complete_search("rhel", "rhel-7", "name", &entity)
            .unwrap();

        assert_eq!(found.unwrap().id, "row");
        assert!(driver.was_called("send_keys:search:name = rhel"));
        assert!(driver.was_called("click:suggestion"));
    }

    #[test]
    fn test_check_all_values() {
        let (clock, driver) = session();
        let table = table();
        search_page(&driver, &table);
        let entity = Locator::css("#entity-%s");
        let tab = Locator::css("#tab-locations");
        driver.add_element(MockElement::new("row", entity.with_value("Dev")));
        driver.add_element(MockElement::new("tab", tab.clone()));
        driver.add_element(
            MockElement::new("all", table.templated(keys::ALL_VALUES, "location").unwrap()).selected(true),
        );

        let checked = page(&clock, &driver)
            .check_all_values("Dev", &entity, &tab, "location")
            .unwrap();
        assert!(checked);
    }

    #[test]
    fn test_scroll_helpers_run_their_scripts() {
        let (clock, driver) = session();
        driver.on_script("scroll(350", ScriptResponse::Value(json!(null)));
        driver.on_script("panel_main", ScriptResponse::Value(json!(null)));
        let base = page(&clock, &driver);
        base.scroll_page().unwrap();
        base.scroll_right_pane().unwrap();
        assert!(driver.was_called("execute_script:scroll(350, 0);"));
        assert!(driver.was_called("execute_script:$('#panel_main').data('jsp').scrollBy(0, 100);"));
        assert!(!driver.was_called("execute_script:window.scroll"));
    }
}
