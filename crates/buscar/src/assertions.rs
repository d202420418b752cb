//! Visibility, text, and URL assertions.
//!
//! Two layers live here. Probes (`visible`, `exists`, `match_count`) answer a
//! question about the current document and never capture diagnostics; their
//! failures are answers, not errors. Assertions (`is_visible`, `is_hidden`,
//! `text_contains`, ...) poll a probe with the configured retry budget and
//! fixed backoff, and an exhausted budget becomes an `AssertionFailed` with
//! one best-effort failure screenshot.
//!
//! Text assertions scan every current match, not just the selected one, by
//! stepping the node's selected-index across the match list with
//! single-attempt resolutions. The index is left where the scan stopped;
//! a successful scan leaves the node pointing at the matching element.

use crate::node::Node;
use crate::resolver::{self, ScreenshotPolicy};
use crate::result::{BuscarError, BuscarResult};
use regex::Regex;
use serde_json::Value;

impl Node {
    /// Whether the element is currently rendered.
    ///
    /// One resolution attempt followed by a live bounding-box probe of the
    /// selected element. Any failure along the way reads as "not visible";
    /// nothing is propagated and nothing is captured.
    pub async fn visible(&self) -> bool {
        match resolver::resolve_with(self, 1, ScreenshotPolicy::Never).await {
            Ok(resolution) => matches!(
                self.driver().bounding_box(resolution.selected()).await,
                Ok(Some(_))
            ),
            Err(_) => false,
        }
    }

    /// Assert the element becomes visible within the retry budget.
    pub async fn is_visible(&self) -> BuscarResult<()> {
        self.diagnostics()
            .operation("is_visible", &self.op_label(), None);
        self.wait_for_visibility(true).await
    }

    /// Assert the element becomes hidden (or gone) within the retry budget.
    pub async fn is_hidden(&self) -> BuscarResult<()> {
        self.diagnostics()
            .operation("is_hidden", &self.op_label(), None);
        self.wait_for_visibility(false).await
    }

    pub(crate) async fn wait_for_visibility(&self, desired: bool) -> BuscarResult<()> {
        let attempts = self.config().attempts().max(1);
        let backoff = self.config().backoff();
        for attempt in 1..=attempts {
            if self.visible().await == desired {
                return Ok(());
            }
            if attempt < attempts {
                tokio::time::sleep(backoff).await;
            }
        }
        resolver::capture_failure_state(self).await;
        let state = if desired { "visible" } else { "hidden" };
        Err(BuscarError::assertion(format!(
            "{} did not become {state} after {attempts} attempts",
            self.qualified_name()
        )))
    }

    /// Whether the element resolves right now, in a single attempt.
    pub async fn exists(&self) -> bool {
        self.exists_with(1).await
    }

    /// Whether the element resolves within an explicit attempt budget.
    pub async fn exists_with(&self, attempts: u32) -> bool {
        resolver::resolve_with(self, attempts, ScreenshotPolicy::Never)
            .await
            .is_ok()
    }

    /// Whether the element is absent right now, in a single attempt.
    pub async fn not_exists(&self) -> bool {
        !self.exists().await
    }

    /// Whether the element goes absent within an explicit attempt budget.
    pub async fn not_exists_with(&self, attempts: u32) -> bool {
        let attempts = attempts.max(1);
        let backoff = self.config().backoff();
        for attempt in 1..=attempts {
            if resolver::resolve_with(self, 1, ScreenshotPolicy::Never)
                .await
                .is_err()
            {
                return true;
            }
            if attempt < attempts {
                tokio::time::sleep(backoff).await;
            }
        }
        false
    }

    /// Whether the element accepts interaction, per its `disabled` property.
    pub async fn enabled(&self) -> BuscarResult<bool> {
        let resolution = resolver::resolve(self).await?;
        let disabled = self
            .driver()
            .evaluate_on(
                resolution.selected(),
                crate::actions::GET_PROPERTY_SCRIPT,
                vec![Value::String("disabled".to_string())],
            )
            .await?
            .as_bool()
            .unwrap_or(false);
        Ok(!disabled)
    }

    /// Number of rendered matches right now.
    pub async fn match_count(&self) -> BuscarResult<usize> {
        let resolution = resolver::resolve(self).await?;
        Ok(resolution.match_count())
    }

    /// Assert some match's text contains the substring, within the retry
    /// budget. Leaves the selected-index on the matching element.
    pub async fn text_contains(&self, expected: &str) -> BuscarResult<()> {
        self.diagnostics().operation(
            "text_contains",
            &self.op_label(),
            Some(expected.to_string()),
        );
        let description = format!("no match contains {expected:?}");
        self.wait_for_text(&description, &|text| text.contains(expected))
            .await
    }

    /// Assert no match's text contains the substring, within the retry
    /// budget.
    pub async fn text_not_contains(&self, rejected: &str) -> BuscarResult<()> {
        self.diagnostics().operation(
            "text_not_contains",
            &self.op_label(),
            Some(rejected.to_string()),
        );
        let description = format!("some match still contains {rejected:?}");
        self.wait_for_absent_text(&description, &|text| text.contains(rejected))
            .await
    }

    /// Assert some match's text matches the pattern, within the retry
    /// budget.
    pub async fn text_matches(&self, pattern: &Regex) -> BuscarResult<()> {
        self.diagnostics().operation(
            "text_matches",
            &self.op_label(),
            Some(pattern.as_str().to_string()),
        );
        let description = format!("no match matches /{}/", pattern.as_str());
        self.wait_for_text(&description, &|text| pattern.is_match(text))
            .await
    }

    /// Synchronous URL assertion; one read, no retry.
    pub async fn url_contains(&self, expected: &str) -> BuscarResult<()> {
        self.diagnostics().operation(
            "url_contains",
            &self.op_label(),
            Some(expected.to_string()),
        );
        let url = self.driver().current_url().await?;
        if url.contains(expected) {
            return Ok(());
        }
        resolver::capture_failure_state(self).await;
        Err(BuscarError::assertion(format!(
            "url {url:?} does not contain {expected:?}"
        )))
    }

    async fn wait_for_text(
        &self,
        description: &str,
        predicate: &(dyn Fn(&str) -> bool + Send + Sync),
    ) -> BuscarResult<()> {
        let attempts = self.config().attempts().max(1);
        let backoff = self.config().backoff();
        for attempt in 1..=attempts {
            if let Ok(true) = self.scan_for_text(predicate).await {
                return Ok(());
            }
            if attempt < attempts {
                tokio::time::sleep(backoff).await;
            }
        }
        self.fail_text_assertion(description, attempts).await
    }

    async fn wait_for_absent_text(
        &self,
        description: &str,
        predicate: &(dyn Fn(&str) -> bool + Send + Sync),
    ) -> BuscarResult<()> {
        let attempts = self.config().attempts().max(1);
        let backoff = self.config().backoff();
        for attempt in 1..=attempts {
            if let Ok(false) = self.scan_for_text(predicate).await {
                return Ok(());
            }
            if attempt < attempts {
                tokio::time::sleep(backoff).await;
            }
        }
        self.fail_text_assertion(description, attempts).await
    }

    async fn fail_text_assertion(&self, description: &str, attempts: u32) -> BuscarResult<()> {
        resolver::capture_failure_state(self).await;
        Err(BuscarError::assertion(format!(
            "{}: {description} after {attempts} attempts",
            self.qualified_name()
        )))
    }

    /// Scan every current match for a text predicate, stepping the
    /// selected-index as an intentional, observable side effect.
    async fn scan_for_text(
        &self,
        predicate: &(dyn Fn(&str) -> bool + Send + Sync),
    ) -> BuscarResult<bool> {
        let overview = resolver::resolve_with(self, 1, ScreenshotPolicy::Never).await?;
        for index in 0..overview.match_count() {
            self.select_match(index);
            let resolution = resolver::resolve_with(self, 1, ScreenshotPolicy::Never).await?;
            let text = self.read_text_of(resolution.selected()).await?;
            if predicate(&text) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::driver::{BuscarDriver, MockDriver, MockElement};
    use crate::page::PageConfig;
    use std::sync::Arc;

    fn fixture(attempts: u32) -> (Arc<MockDriver>, Node) {
        fixture_with(attempts, Diagnostics::disabled())
    }

    fn fixture_with(attempts: u32, diagnostics: Diagnostics) -> (Arc<MockDriver>, Node) {
        let driver = Arc::new(MockDriver::new());
        let config = PageConfig::default().with_attempts(attempts);
        let root = Node::root(
            Arc::clone(&driver) as Arc<dyn BuscarDriver>,
            config,
            diagnostics,
        );
        (driver, root)
    }

    mod visibility_tests {
        use super::*;

        #[tokio::test]
        async fn visible_true_for_rendered_element() {
            let (driver, root) = fixture(5);
            driver.add_element(MockElement::new("e", "div"));
            driver.bind("#e", &["e"]);

            let node = root.child("e").with_css("#e").build();
            assert!(node.visible().await);
            assert_eq!(driver.call_count("bounding_box e"), 1);
        }

        #[tokio::test]
        async fn visible_false_for_missing_element() {
            let (driver, root) = fixture(5);
            let node = root.child("ghost").with_css("#ghost").build();

            assert!(!node.visible().await);
            // Single probe attempt, no diagnostics.
            assert_eq!(driver.call_count("query_css"), 1);
            assert_eq!(driver.call_count("screenshot"), 0);
        }

        #[tokio::test]
        async fn visible_false_for_unrendered_element() {
            let (driver, root) = fixture(5);
            driver.add_element(MockElement::new("e", "div").without_box());
            driver.bind("#e", &["e"]);

            let node = root.child("e").with_css("#e").build();
            assert!(!node.visible().await);
        }

        #[tokio::test(start_paused = true)]
        async fn is_visible_waits_for_late_element() {
            let (driver, root) = fixture(10);
            driver.add_element(MockElement::new("late", "div"));
            driver.bind_delayed("#late", &["late"], 3);

            let node = root.child("late").with_css("#late").build();
            node.is_visible().await.unwrap();
            assert_eq!(driver.call_count("query_css"), 4);
        }

        #[tokio::test(start_paused = true)]
        async fn is_visible_exhaustion_fails_with_one_capture() {
            let dir = tempfile::tempdir().unwrap();
            let (driver, root) = fixture_with(3, Diagnostics::new(dir.path()));
            let node = root.child("ghost").with_css("#ghost").build();

            let err = node.is_visible().await.unwrap_err();
            assert!(matches!(err, BuscarError::AssertionFailed { .. }));
            assert_eq!(driver.call_count("screenshot"), 1);
        }

        #[tokio::test]
        async fn is_hidden_passes_for_absent_element() {
            let (_, root) = fixture(3);
            let node = root.child("gone").with_css("#gone").build();
            node.is_hidden().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn is_hidden_fails_for_persistent_element() {
            let (driver, root) = fixture(2);
            driver.add_element(MockElement::new("e", "div"));
            driver.bind("#e", &["e"]);

            let node = root.child("e").with_css("#e").build();
            let err = node.is_hidden().await.unwrap_err();
            assert!(matches!(err, BuscarError::AssertionFailed { .. }));
        }
    }

    mod existence_tests {
        use super::*;

        #[tokio::test]
        async fn exists_is_a_single_attempt_probe() {
            let (driver, root) = fixture(20);
            let node = root.child("ghost").with_css("#ghost").build();

            assert!(!node.exists().await);
            assert_eq!(driver.call_count("query_css"), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn exists_with_budget_waits_for_appearance() {
            let (driver, root) = fixture(20);
            driver.add_element(MockElement::new("late", "div"));
            driver.bind_delayed("#late", &["late"], 2);

            let node = root.child("late").with_css("#late").build();
            assert!(node.exists_with(5).await);
        }

        #[tokio::test]
        async fn not_exists_reflects_absence() {
            let (driver, root) = fixture(5);
            driver.add_element(MockElement::new("e", "div"));
            driver.bind("#e", &["e"]);

            let present = root.child("e").with_css("#e").build();
            let absent = root.child("ghost").with_css("#ghost").build();
            assert!(!present.not_exists().await);
            assert!(absent.not_exists().await);
        }

        #[tokio::test(start_paused = true)]
        async fn not_exists_with_budget_gives_up_on_persistent_element() {
            let (driver, root) = fixture(5);
            driver.add_element(MockElement::new("e", "div"));
            driver.bind("#e", &["e"]);

            let node = root.child("e").with_css("#e").build();
            assert!(!node.not_exists_with(3).await);
            assert_eq!(driver.call_count("query_css"), 3);
        }
    }

    mod state_tests {
        use super::*;
        use serde_json::json;

        #[tokio::test]
        async fn enabled_defaults_to_true() {
            let (driver, root) = fixture(5);
            driver.add_element(MockElement::new("b", "button"));
            driver.bind("#b", &["b"]);

            let node = root.child("b").with_css("#b").build();
            assert!(node.enabled().await.unwrap());
        }

        #[tokio::test]
        async fn disabled_property_reads_as_not_enabled() {
            let (driver, root) = fixture(5);
            driver.add_element(
                MockElement::new("b", "button").with_property("disabled", json!(true)),
            );
            driver.bind("#b", &["b"]);

            let node = root.child("b").with_css("#b").build();
            assert!(!node.enabled().await.unwrap());
        }

        #[tokio::test]
        async fn match_count_reports_rendered_matches() {
            let (driver, root) = fixture(5);
            driver.add_element(MockElement::new("r0", "li"));
            driver.add_element(MockElement::new("r1", "li"));
            driver.add_element(MockElement::new("r2", "li").without_box());
            driver.bind("li", &["r0", "r1", "r2"]);

            let node = root.child("rows").with_css("li").build();
            assert_eq!(node.match_count().await.unwrap(), 2);
        }
    }

    mod text_scan_tests {
        use super::*;

        fn rows(driver: &MockDriver, texts: &[&str]) {
            let ids: Vec<String> = (0..texts.len()).map(|i| format!("r{i}")).collect();
            for (id, text) in ids.iter().zip(texts) {
                driver.add_element(MockElement::new(id.clone(), "li").with_text(*text));
            }
            let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            driver.bind("li.row", &id_refs);
        }

        #[tokio::test]
        async fn scan_finds_substring_in_later_match() {
            let (driver, root) = fixture(5);
            rows(&driver, &["alpha", "beta", "welcome home"]);

            let node = root.child("rows").with_css("li.row").build();
            node.text_contains("welcome").await.unwrap();

            // Scan parks the selection on the matching element.
            assert_eq!(node.selected_index(), 2);
            assert_eq!(node.selected_match().unwrap().id, "r2");
        }

        #[tokio::test(start_paused = true)]
        async fn missing_substring_fails_after_budget() {
            let dir = tempfile::tempdir().unwrap();
            let (driver, root) = fixture_with(2, Diagnostics::new(dir.path()));
            rows(&driver, &["alpha", "beta"]);

            let node = root.child("rows").with_css("li.row").build();
            let err = node.text_contains("gamma").await.unwrap_err();

            assert!(matches!(err, BuscarError::AssertionFailed { .. }));
            assert_eq!(driver.call_count("screenshot"), 1);
        }

        #[tokio::test]
        async fn text_not_contains_passes_when_absent() {
            let (driver, root) = fixture(5);
            rows(&driver, &["alpha", "beta"]);

            let node = root.child("rows").with_css("li.row").build();
            node.text_not_contains("error").await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn text_not_contains_fails_while_present() {
            let (driver, root) = fixture(2);
            rows(&driver, &["ok", "error: boom"]);

            let node = root.child("rows").with_css("li.row").build();
            let err = node.text_not_contains("error").await.unwrap_err();
            assert!(matches!(err, BuscarError::AssertionFailed { .. }));
        }

        #[tokio::test]
        async fn regex_scan_matches_pattern() {
            let (driver, root) = fixture(5);
            rows(&driver, &["order #1293 shipped", "order pending"]);

            let node = root.child("rows").with_css("li.row").build();
            let pattern = Regex::new(r"#\d{4} shipped").unwrap();
            node.text_matches(&pattern).await.unwrap();
            assert_eq!(node.selected_index(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn unresolvable_node_fails_text_assertion_not_resolution() {
            let (_, root) = fixture(2);
            let node = root.child("ghost").with_css("#ghost").build();

            let err = node.text_contains("anything").await.unwrap_err();
            assert!(matches!(err, BuscarError::AssertionFailed { .. }));
        }
    }

    mod url_tests {
        use super::*;

        #[tokio::test]
        async fn url_contains_passes_on_match() {
            let (driver, root) = fixture(5);
            driver.set_url("https://app.example/dashboard?tab=1");
            root.url_contains("/dashboard").await.unwrap();
        }

        #[tokio::test]
        async fn url_contains_fails_without_retry() {
            let (driver, root) = fixture(20);
            driver.set_url("https://app.example/login");

            let err = root.url_contains("/dashboard").await.unwrap_err();
            assert!(matches!(err, BuscarError::AssertionFailed { .. }));
            assert_eq!(driver.call_count("current_url"), 1);
        }
    }
}
