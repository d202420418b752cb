//! Page session: configuration, navigation, dialogs, and the tree root.
//!
//! A [`Page`] owns the driving engine, the shared [`PageConfig`], and the
//! injected [`Diagnostics`] sink, and hands out the root [`Node`] the
//! element tree is declared under. Element trees can be declared before any
//! navigation happens; nothing binds to the live document until a node is
//! resolved.

use crate::diagnostics::Diagnostics;
use crate::dialog::{Dialog, DialogAction};
use crate::driver::{BuscarDriver, ReadyCondition};
use crate::node::Node;
use crate::result::BuscarResult;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default resolution attempt budget.
pub const DEFAULT_ATTEMPTS: u32 = 20;

/// Default fixed backoff between resolution attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Default post-action settle pause.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// Default per-character typing delay.
pub const DEFAULT_TYPE_DELAY: Duration = Duration::ZERO;

/// Default navigation timeout.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolution and interaction settings shared by a node tree.
#[derive(Debug, Clone)]
pub struct PageConfig {
    attempts: u32,
    backoff: Duration,
    settle: Duration,
    type_delay: Duration,
    navigation_timeout: Duration,
    ready: ReadyCondition,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            settle: DEFAULT_SETTLE,
            type_delay: DEFAULT_TYPE_DELAY,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            ready: ReadyCondition::Load,
        }
    }
}

impl PageConfig {
    /// Defaults: 20 attempts, 500ms backoff, 100ms settle, no typing delay,
    /// 30s navigation timeout, waits for `load`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resolution attempt budget.
    #[must_use]
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Set the fixed backoff between attempts.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the post-action settle pause.
    #[must_use]
    pub const fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Set the per-character typing delay.
    #[must_use]
    pub const fn with_type_delay(mut self, delay: Duration) -> Self {
        self.type_delay = delay;
        self
    }

    /// Set the navigation timeout.
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Set the readiness condition awaited after navigation.
    #[must_use]
    pub const fn with_ready(mut self, ready: ReadyCondition) -> Self {
        self.ready = ready;
        self
    }

    /// Resolution attempt budget.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Fixed backoff between attempts.
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Post-action settle pause.
    #[must_use]
    pub const fn settle(&self) -> Duration {
        self.settle
    }

    /// Per-character typing delay.
    #[must_use]
    pub const fn type_delay(&self) -> Duration {
        self.type_delay
    }

    /// Navigation timeout.
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        self.navigation_timeout
    }

    /// Readiness condition awaited after navigation.
    #[must_use]
    pub const fn ready(&self) -> ReadyCondition {
        self.ready
    }
}

/// A controlled page and the root of its element tree.
#[derive(Clone)]
pub struct Page {
    driver: Arc<dyn BuscarDriver>,
    config: PageConfig,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("config", &self.config)
            .field("session", &self.diagnostics.session_id())
            .finish()
    }
}

impl Page {
    /// Page with default configuration and no screenshot artifacts.
    #[must_use]
    pub fn new(driver: Arc<dyn BuscarDriver>) -> Self {
        Self {
            driver,
            config: PageConfig::default(),
            diagnostics: Diagnostics::disabled(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: PageConfig) -> Self {
        self.config = config;
        self
    }

    /// Write failure screenshots into this directory.
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics = Diagnostics::new(dir);
        self
    }

    /// Inject a diagnostic sink, for example one shared across pages.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Root of the element tree.
    #[must_use]
    pub fn root(&self) -> Node {
        Node::root(
            Arc::clone(&self.driver),
            self.config.clone(),
            self.diagnostics.clone(),
        )
    }

    /// Start declaring a top-level element.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> crate::node::NodeBuilder {
        self.root().child(name)
    }

    /// The driving engine.
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn BuscarDriver> {
        &self.driver
    }

    /// The shared configuration.
    #[must_use]
    pub const fn config(&self) -> &PageConfig {
        &self.config
    }

    /// The diagnostic sink.
    #[must_use]
    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Navigate and await the configured readiness condition.
    pub async fn navigate(&self, url: &str) -> BuscarResult<()> {
        self.diagnostics
            .operation("navigate", "page", Some(url.to_string()));
        self.driver
            .navigate(url, self.config.navigation_timeout(), self.config.ready())
            .await
    }

    /// Reload the current document.
    pub async fn reload(&self) -> BuscarResult<()> {
        self.diagnostics.operation("reload", "page", None);
        self.driver.reload(self.config.ready()).await
    }

    /// URL of the controlled document.
    pub async fn current_url(&self) -> BuscarResult<String> {
        self.driver.current_url().await
    }

    /// Synchronous URL assertion; one read, no retry.
    pub async fn url_contains(&self, expected: &str) -> BuscarResult<()> {
        self.root().url_contains(expected).await
    }

    /// Evaluate a script in the top-level document.
    pub async fn evaluate(&self, script: &str) -> BuscarResult<Value> {
        self.driver.evaluate(script).await
    }

    /// Answer dialogs with the given callback; replaces any previous one.
    pub fn on_dialog<F>(&self, callback: F)
    where
        F: Fn(&Dialog) -> DialogAction + Send + Sync + 'static,
    {
        self.driver.set_dialog_handler(Arc::new(callback));
    }

    /// Accept every dialog, answering prompts with their default text.
    pub fn accept_all_dialogs(&self) {
        self.on_dialog(|_| DialogAction::Accept);
    }

    /// Dismiss every dialog.
    pub fn dismiss_all_dialogs(&self) {
        self.on_dialog(|_| DialogAction::Dismiss);
    }

    /// Capture a labelled screenshot right now, best-effort.
    pub async fn capture_failure(&self, label: &str) -> Option<PathBuf> {
        self.diagnostics.capture(self.driver.as_ref(), label).await
    }

    /// Save the session's operation log as JSON.
    pub fn save_session_log(&self, path: &Path) -> BuscarResult<()> {
        self.diagnostics.save_session_log(path)
    }
}
