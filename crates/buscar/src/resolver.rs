//! Resolution and retry engine.
//!
//! Binding a declared [`Node`] to live elements is done here, as an explicit
//! service over the node tree rather than behavior hidden inside the nodes.
//! One resolution call walks `Searching -> (RetryWait -> Searching)*` until
//! it either produces a [`Resolution`] or exhausts its attempt budget, at
//! which point it captures a best-effort diagnostic screenshot and surfaces
//! the failure.
//!
//! Context resolution recurses up the parent chain: each attempt re-resolves
//! the parent with the parent's own full budget, so a node never acts on a
//! stale ancestor. An ancestor that exhausts its own budget is terminal for
//! every descendant in that call; its error propagates unchanged instead of
//! being wrapped or retried, which keeps worst-case duration linear in tree
//! depth rather than multiplicative.

use crate::driver::{ElementHandle, SearchContext};
use crate::node::{Node, Resolution};
use crate::result::{BuscarError, BuscarResult};
use async_recursion::async_recursion;
use tracing::{debug, trace, warn};

/// Whether an exhausted resolution captures a diagnostic screenshot.
///
/// Probe resolutions (visibility polls, match scans) fail as a matter of
/// course, so they skip capture; action and assertion paths keep it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenshotPolicy {
    /// Capture once when the attempt budget is exhausted
    #[default]
    OnExhaustion,
    /// Never capture
    Never,
}

enum AttemptFailure {
    /// Query matched nothing rendered; retryable
    NoMatch,
    /// Engine-level failure during query or context lookup; retryable
    Transient(BuscarError),
    /// An ancestor exhausted its own budget; terminal for this call
    Ancestor(BuscarError),
}

/// Resolve a node with its configured attempt budget.
pub async fn resolve(node: &Node) -> BuscarResult<Resolution> {
    resolve_with(node, node.config().attempts(), ScreenshotPolicy::OnExhaustion).await
}

/// Resolve a node and return every rendered match.
pub async fn resolve_all(node: &Node) -> BuscarResult<Vec<ElementHandle>> {
    resolve(node)
        .await
        .map(|resolution| resolution.all().to_vec())
}

/// Resolve a node with an explicit attempt budget and screenshot policy.
///
/// Makes up to `attempts` attempts (minimum one), sleeping the configured
/// fixed backoff between consecutive attempts. Failed attempts fall into two
/// classes: an empty rendered-match set or a transient engine error retries;
/// an exhausted ancestor surfaces immediately with the ancestor's own error.
/// On success the `(selected, all)` pair is cached on the node before it is
/// returned; on exhaustion the last failure surfaces after the diagnostic
/// capture.
pub async fn resolve_with(
    node: &Node,
    attempts: u32,
    policy: ScreenshotPolicy,
) -> BuscarResult<Resolution> {
    let attempts = attempts.max(1);
    let backoff = node.config().backoff();
    let mut engine_failure = None;

    for attempt in 1..=attempts {
        match attempt_once(node, policy).await {
            Ok(resolution) => {
                node.store_resolution(resolution.clone());
                debug!(
                    node = %node.qualified_name(),
                    attempt,
                    matches = resolution.match_count(),
                    "resolved"
                );
                return Ok(resolution);
            }
            Err(AttemptFailure::Ancestor(error)) => return Err(error),
            Err(AttemptFailure::NoMatch) => {
                engine_failure = None;
            }
            Err(AttemptFailure::Transient(error)) => {
                engine_failure = Some(error);
            }
        }
        if attempt < attempts {
            trace!(
                node = %node.qualified_name(),
                attempt,
                backoff = ?backoff,
                "retrying"
            );
            tokio::time::sleep(backoff).await;
        }
    }

    let error = engine_failure.unwrap_or_else(|| BuscarError::NotFound {
        node: node.qualified_name(),
        locator: node.locator().to_string(),
        attempts,
    });
    if policy == ScreenshotPolicy::OnExhaustion {
        capture_failure_state(node).await;
    }
    warn!(node = %node.qualified_name(), attempts, %error, "resolution exhausted");
    Err(error)
}

/// Best-effort diagnostic capture; never fails the surrounding operation.
pub(crate) async fn capture_failure_state(node: &Node) {
    let qualified = node.qualified_name();
    if let Some(path) = node
        .diagnostics()
        .capture(node.driver().as_ref(), &qualified)
        .await
    {
        debug!(node = %qualified, path = %path.display(), "failure screenshot written");
    }
}

async fn attempt_once(node: &Node, policy: ScreenshotPolicy) -> Result<Resolution, AttemptFailure> {
    let context = resolve_context(node, policy).await?;
    let raw = run_locator(node, &context)
        .await
        .map_err(AttemptFailure::Transient)?;
    let rendered: Vec<ElementHandle> = raw
        .into_iter()
        .filter(ElementHandle::is_rendered)
        .collect();
    if rendered.is_empty() {
        return Err(AttemptFailure::NoMatch);
    }

    // Stored index survives shrinkage; the selection clamps per call.
    let stored = node.selected_index();
    let index = if stored < rendered.len() { stored } else { 0 };
    let selected = rendered[index].clone();
    Ok(Resolution::new(selected, rendered))
}

async fn run_locator(
    node: &Node,
    context: &SearchContext,
) -> BuscarResult<Vec<ElementHandle>> {
    let locator = node.locator();
    let expression = locator.expression();
    if locator.is_path() {
        node.driver().query_xpath(context, &expression).await
    } else {
        node.driver().query_css(context, &expression).await
    }
}

/// Search root for a node's query.
///
/// Detached nodes and the root search the top-level document. Everything
/// else resolves its parent to a live element first; when the parent carries
/// the embedded-context flag, the search root becomes that element's embedded
/// document instead of the element itself.
#[async_recursion]
async fn resolve_context(
    node: &Node,
    policy: ScreenshotPolicy,
) -> Result<SearchContext, AttemptFailure> {
    if node.is_root() || node.is_detached() {
        return Ok(SearchContext::Document);
    }
    let Some(parent) = node.parent() else {
        return Ok(SearchContext::Document);
    };
    if parent.is_root() {
        return Ok(SearchContext::Document);
    }

    let parent_resolution = resolve_with(parent, parent.config().attempts(), policy)
        .await
        .map_err(AttemptFailure::Ancestor)?;
    let live = parent_resolution.selected().clone();

    if parent.uses_embedded_context() {
        node.driver()
            .embedded_document(&live)
            .await
            .map_err(AttemptFailure::Transient)
    } else {
        Ok(SearchContext::Element(live))
    }
}

impl Node {
    /// Resolve this node with the configured attempt budget.
    ///
    /// The `(selected, all)` pair is cached on the node; repeated calls on a
    /// stable document return equal pairs.
    pub async fn resolve(&self) -> BuscarResult<Resolution> {
        resolve(self).await
    }

    /// Resolve with an explicit attempt budget.
    pub async fn resolve_with(&self, attempts: u32) -> BuscarResult<Resolution> {
        resolve_with(self, attempts, ScreenshotPolicy::OnExhaustion).await
    }

    /// Resolve and return every rendered match.
    pub async fn resolve_all(&self) -> BuscarResult<Vec<ElementHandle>> {
        resolve_all(self).await
    }
}
