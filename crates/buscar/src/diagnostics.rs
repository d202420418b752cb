//! Session diagnostics: operation log and failure screenshots.
//!
//! A [`Diagnostics`] sink is built once per session and injected into the
//! node tree. It keeps the append-only operation log (one structured record
//! per interaction, also emitted as a trace line) and writes best-effort
//! failure screenshots into the artifact directory, named by qualified node
//! name and timestamp. A disabled sink still logs operations; it only skips
//! the screenshot artifacts.

use crate::driver::BuscarDriver;
use crate::result::BuscarResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

/// One logged operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    /// UTC timestamp
    pub at: DateTime<Utc>,
    /// Operation name, for example `click` or `type`
    pub op: String,
    /// Qualified node name the operation ran against
    pub node: String,
    /// Operation detail, for example typed text or an expected substring
    pub detail: Option<String>,
}

/// Serialized form of a finished session's operation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLog {
    /// Session identity
    pub session_id: Uuid,
    /// When the log was saved
    pub saved_at: DateTime<Utc>,
    /// Library version that produced the log
    pub version: String,
    /// All recorded operations, oldest first
    pub operations: Vec<OperationRecord>,
}

#[derive(Debug)]
struct DiagnosticsInner {
    session_id: Uuid,
    artifact_dir: Option<PathBuf>,
    operations: Mutex<Vec<OperationRecord>>,
    captures: Mutex<Vec<PathBuf>>,
}

/// Shared diagnostic sink for one session.
///
/// Cloning shares the sink; a tree and all its nodes write into the same log.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    inner: Arc<DiagnosticsInner>,
}

impl Diagnostics {
    /// Sink with an artifact directory for screenshot files.
    #[must_use]
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self::build(Some(artifact_dir.into()))
    }

    /// Sink without screenshot artifacts.
    #[must_use]
    pub fn disabled() -> Self {
        Self::build(None)
    }

    fn build(artifact_dir: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DiagnosticsInner {
                session_id: Uuid::new_v4(),
                artifact_dir,
                operations: Mutex::new(Vec::new()),
                captures: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Session identity, stable for the lifetime of the sink.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    /// Artifact directory, when screenshots are enabled.
    #[must_use]
    pub fn artifact_dir(&self) -> Option<&Path> {
        self.inner.artifact_dir.as_deref()
    }

    /// Append one operation to the session log and emit its trace line.
    pub fn operation(&self, op: &str, node: &str, detail: Option<String>) {
        match detail.as_deref() {
            Some(detail) => info!(target: "buscar::op", "[{op}] {node} {detail}"),
            None => info!(target: "buscar::op", "[{op}] {node}"),
        }
        let record = OperationRecord {
            at: Utc::now(),
            op: op.to_string(),
            node: node.to_string(),
            detail,
        };
        if let Ok(mut operations) = self.inner.operations.lock() {
            operations.push(record);
        }
    }

    /// All recorded operations, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<OperationRecord> {
        self.inner
            .operations
            .lock()
            .map(|operations| operations.clone())
            .unwrap_or_default()
    }

    /// Capture a screenshot for a failed node, best-effort.
    ///
    /// Returns the written path, or `None` when the sink is disabled or any
    /// step fails; capture problems are logged, never propagated.
    pub async fn capture(&self, driver: &dyn BuscarDriver, node: &str) -> Option<PathBuf> {
        let dir = self.inner.artifact_dir.as_ref()?;
        let bytes = match driver.capture_screenshot().await {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(node, %error, "screenshot capture failed");
                return None;
            }
        };
        if let Err(error) = tokio::fs::create_dir_all(dir).await {
            warn!(dir = %dir.display(), %error, "artifact directory unavailable");
            return None;
        }
        let path = dir.join(screenshot_name(node, Utc::now()));
        if let Err(error) = tokio::fs::write(&path, &bytes).await {
            warn!(path = %path.display(), %error, "screenshot write failed");
            return None;
        }
        if let Ok(mut captures) = self.inner.captures.lock() {
            captures.push(path.clone());
        }
        Some(path)
    }

    /// Screenshot files written so far.
    #[must_use]
    pub fn captures(&self) -> Vec<PathBuf> {
        self.inner
            .captures
            .lock()
            .map(|captures| captures.clone())
            .unwrap_or_default()
    }

    /// Number of screenshot files written so far.
    #[must_use]
    pub fn capture_count(&self) -> usize {
        self.inner.captures.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Save the operation log as JSON.
    pub fn save_session_log(&self, path: &Path) -> BuscarResult<()> {
        let log = SessionLog {
            session_id: self.session_id(),
            saved_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            operations: self.operations(),
        };
        let json = serde_json::to_string_pretty(&log)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::disabled()
    }
}

fn screenshot_name(node: &str, at: DateTime<Utc>) -> String {
    let stem = sanitize_name(node);
    format!("{stem}_{}.png", at.format("%Y%m%d_%H%M%S%3f"))
}

fn sanitize_name(node: &str) -> String {
    if node.is_empty() {
        return "page".to_string();
    }
    node.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Install a process-wide compact subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("buscar=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Install a process-wide JSON subscriber filtered by `RUST_LOG`, one event
/// per line, for machine consumption.
pub fn init_json_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("buscar=info"));
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::driver::MockDriver;

    mod name_tests {
        use super::*;
        use chrono::TimeZone;

        #[test]
        fn screenshot_names_keep_qualified_dots() {
            let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
            let name = screenshot_name("login.form.submit", at);
            assert!(name.starts_with("login.form.submit_20260314_092653"));
            assert!(name.ends_with(".png"));
        }

        #[test]
        fn hostile_characters_are_replaced() {
            assert_eq!(sanitize_name("a/b:c d"), "a-b-c-d");
            assert_eq!(sanitize_name(""), "page");
        }
    }

    mod operation_tests {
        use super::*;

        #[test]
        fn operations_append_in_order() {
            let diagnostics = Diagnostics::disabled();
            diagnostics.operation("click", "login.submit", None);
            diagnostics.operation("type", "login.user", Some("alice".to_string()));

            let operations = diagnostics.operations();
            assert_eq!(operations.len(), 2);
            assert_eq!(operations[0].op, "click");
            assert_eq!(operations[1].detail.as_deref(), Some("alice"));
        }

        #[test]
        fn clones_share_one_log() {
            let diagnostics = Diagnostics::disabled();
            let other = diagnostics.clone();
            diagnostics.operation("hover", "menu", None);
            assert_eq!(other.operations().len(), 1);
            assert_eq!(other.session_id(), diagnostics.session_id());
        }

        #[test]
        fn session_log_round_trips_as_json() {
            let dir = tempfile::tempdir().unwrap();
            let diagnostics = Diagnostics::disabled();
            diagnostics.operation("press", "search.box", Some("Enter".to_string()));

            let path = dir.path().join("session.log");
            diagnostics.save_session_log(&path).unwrap();

            let raw = std::fs::read_to_string(&path).unwrap();
            let log: SessionLog = serde_json::from_str(&raw).unwrap();
            assert_eq!(log.session_id, diagnostics.session_id());
            assert_eq!(log.operations.len(), 1);
            assert_eq!(log.operations[0].node, "search.box");
        }
    }

    mod capture_tests {
        use super::*;

        #[tokio::test]
        async fn disabled_sink_skips_driver_entirely() {
            let driver = MockDriver::new();
            let diagnostics = Diagnostics::disabled();

            let path = diagnostics.capture(&driver, "login.submit").await;
            assert!(path.is_none());
            assert_eq!(driver.call_count("screenshot"), 0);
        }

        #[tokio::test]
        async fn enabled_sink_writes_named_artifact() {
            let dir = tempfile::tempdir().unwrap();
            let driver = MockDriver::new();
            let diagnostics = Diagnostics::new(dir.path());

            let path = diagnostics
                .capture(&driver, "login.submit")
                .await
                .unwrap();
            assert!(path.exists());
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("login.submit_"));
            assert_eq!(diagnostics.capture_count(), 1);
        }

        #[tokio::test]
        async fn capture_into_missing_directory_creates_it() {
            let dir = tempfile::tempdir().unwrap();
            let nested = dir.path().join("artifacts").join("run-1");
            let driver = MockDriver::new();
            let diagnostics = Diagnostics::new(&nested);

            let path = diagnostics.capture(&driver, "checkout.pay").await;
            assert!(path.is_some());
            assert!(nested.is_dir());
        }
    }
}
