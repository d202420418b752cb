//! Driving-engine capability interface and the in-memory mock engine.
//!
//! The resolution core talks to a browser only through [`BuscarDriver`]: a
//! narrow, object-safe async trait covering navigation, selector queries
//! against a search context, geometry probes, input primitives, in-page
//! evaluation, and diagnostics capture. [`MockDriver`] implements the trait
//! over a scripted in-memory page and records every call, which is what the
//! unit and integration tests run against; the `browser` feature adds a real
//! CDP-backed implementation.

use crate::dialog::{Dialog, DialogAction, DialogCallback, DialogRouter};
use crate::locator::BoundingBox;
use crate::result::{BuscarError, BuscarResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

/// Readiness condition awaited after navigation or reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReadyCondition {
    /// The `load` event fired
    #[default]
    Load,
    /// The `DOMContentLoaded` event fired
    DomContentLoaded,
    /// No network activity for a short window after load
    NetworkIdle,
}

/// Handle to a live element returned by a query.
///
/// The `bounding_box` field is a query-time snapshot used by the resolver's
/// rendered filter; [`BuscarDriver::bounding_box`] re-probes the live box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-specific element identity
    pub id: String,
    /// Tag name, lowercase
    pub tag_name: String,
    /// Bounding box at query time; `None` when the element was not rendered
    pub bounding_box: Option<BoundingBox>,
}

impl ElementHandle {
    /// Create a handle.
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            bounding_box: None,
        }
    }

    /// Attach a query-time bounding box.
    #[must_use]
    pub const fn with_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }

    /// Whether the query-time snapshot carried a box.
    #[must_use]
    pub const fn is_rendered(&self) -> bool {
        self.bounding_box.is_some()
    }
}

/// Live document or element a locator query runs against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchContext {
    /// Top-level document of the controlled page
    Document,
    /// An embedded document (iframe content), keyed by a driver-specific id
    EmbeddedDocument(String),
    /// Scoped under a previously resolved live element
    Element(ElementHandle),
}

impl fmt::Display for SearchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::EmbeddedDocument(id) => write!(f, "embedded:{id}"),
            Self::Element(handle) => write!(f, "element:{}", handle.id),
        }
    }
}

/// Capability interface to the browser-driving engine.
///
/// Everything the resolution core needs from a browser, and nothing else.
/// Implementations must be shareable across cloned nodes, so methods take
/// `&self`; engines with mutable internals wrap them in their own locks.
#[async_trait]
pub trait BuscarDriver: Send + Sync {
    /// Navigate the controlled document and await the ready condition.
    async fn navigate(
        &self,
        url: &str,
        timeout: Duration,
        ready: ReadyCondition,
    ) -> BuscarResult<()>;

    /// Reload the current document and await the ready condition.
    async fn reload(&self, ready: ReadyCondition) -> BuscarResult<()>;

    /// URL of the controlled document.
    async fn current_url(&self) -> BuscarResult<String>;

    /// Evaluate a CSS selector against a context.
    async fn query_css(
        &self,
        context: &SearchContext,
        selector: &str,
    ) -> BuscarResult<Vec<ElementHandle>>;

    /// Evaluate an XPath expression against a context, relative paths
    /// resolving from the context itself.
    async fn query_xpath(
        &self,
        context: &SearchContext,
        expression: &str,
    ) -> BuscarResult<Vec<ElementHandle>>;

    /// Live rendering-presence probe; `None` when the element currently has
    /// no layout box.
    async fn bounding_box(&self, element: &ElementHandle) -> BuscarResult<Option<BoundingBox>>;

    /// Native click on the element.
    async fn click(&self, element: &ElementHandle) -> BuscarResult<()>;

    /// Move the pointer over the element.
    async fn hover(&self, element: &ElementHandle) -> BuscarResult<()>;

    /// Type text into the focused element with a per-character delay.
    async fn type_text(
        &self,
        element: &ElementHandle,
        text: &str,
        delay: Duration,
    ) -> BuscarResult<()>;

    /// Press a named key (for example `Enter`, `Backspace`) on the element.
    async fn press_key(&self, element: &ElementHandle, key: &str) -> BuscarResult<()>;

    /// Search context for the element's embedded document (iframe content).
    async fn embedded_document(&self, element: &ElementHandle) -> BuscarResult<SearchContext>;

    /// Evaluate a script in the top-level document context.
    async fn evaluate(&self, script: &str) -> BuscarResult<Value>;

    /// Evaluate a script with the element as first argument, plus extra
    /// JSON-serializable arguments. Used for attribute get/set, property
    /// reads, and script-driven clicks.
    async fn evaluate_on(
        &self,
        element: &ElementHandle,
        script: &str,
        args: Vec<Value>,
    ) -> BuscarResult<Value>;

    /// Capture a screenshot of the current viewport as PNG bytes.
    async fn capture_screenshot(&self) -> BuscarResult<Vec<u8>>;

    /// Register the dialog callback; replaces any previous one.
    fn set_dialog_handler(&self, callback: DialogCallback);
}

/// A scripted element inside a [`MockDriver`] page.
#[derive(Debug, Clone)]
pub struct MockElement {
    id: String,
    tag_name: String,
    bounding_box: Option<BoundingBox>,
    attributes: HashMap<String, String>,
    properties: HashMap<String, Value>,
    embedded_doc: Option<String>,
    reject_clicks: bool,
}

impl MockElement {
    /// New element with a default rendered box.
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            bounding_box: Some(BoundingBox::new(0.0, 0.0, 100.0, 20.0)),
            attributes: HashMap::new(),
            properties: HashMap::new(),
            embedded_doc: None,
            reject_clicks: false,
        }
    }

    /// Override the rendered box.
    #[must_use]
    pub const fn with_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }

    /// Mark the element as not rendered (no layout box).
    #[must_use]
    pub fn without_box(mut self) -> Self {
        self.bounding_box = None;
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Set the `innerText` property.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_property("innerText", Value::String(text.into()))
    }

    /// Set the `value` property.
    #[must_use]
    pub fn with_value(self, value: impl Into<String>) -> Self {
        self.with_property("value", Value::String(value.into()))
    }

    /// Set the `checked` property; clicks toggle it.
    #[must_use]
    pub fn with_checked(self, checked: bool) -> Self {
        self.with_property("checked", Value::Bool(checked))
    }

    /// Declare an embedded document reachable through this element.
    #[must_use]
    pub fn with_embedded_doc(mut self, doc_id: impl Into<String>) -> Self {
        self.embedded_doc = Some(doc_id.into());
        self
    }

    /// Make native clicks on this element fail, as one covered by an overlay
    /// would. Script-driven clicks still land.
    #[must_use]
    pub const fn rejecting_clicks(mut self) -> Self {
        self.reject_clicks = true;
        self
    }

    fn snapshot(&self) -> ElementHandle {
        ElementHandle {
            id: self.id.clone(),
            tag_name: self.tag_name.clone(),
            bounding_box: self.bounding_box,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ContextKey {
    Document,
    Embedded(String),
    Under(String),
}

impl ContextKey {
    fn of(context: &SearchContext) -> Self {
        match context {
            SearchContext::Document => Self::Document,
            SearchContext::EmbeddedDocument(id) => Self::Embedded(id.clone()),
            SearchContext::Element(handle) => Self::Under(handle.id.clone()),
        }
    }
}

#[derive(Debug)]
struct Binding {
    context: ContextKey,
    expression: String,
    ids: Vec<String>,
    appear_after: u32,
    queries_seen: u32,
}

#[derive(Default)]
struct MockState {
    url: String,
    elements: HashMap<String, MockElement>,
    bindings: Vec<Binding>,
    history: Vec<String>,
    eval_results: HashMap<String, Value>,
    screenshot_data: Vec<u8>,
}

/// In-memory scripted driving engine for tests.
///
/// Elements are registered up front and bound to selector expressions per
/// search context; bindings can be delayed so an element "appears" only after
/// a number of queries, which is how retry behavior is exercised. Every call
/// is recorded in a history that tests inspect with [`MockDriver::was_called`]
/// and [`MockDriver::call_count`].
pub struct MockDriver {
    state: Mutex<MockState>,
    router: DialogRouter,
}

impl MockDriver {
    /// Empty page at `about:blank`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_url("about:blank")
    }

    /// Empty page at the given URL.
    #[must_use]
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MockState {
                url: url.into(),
                screenshot_data: vec![0x89, b'P', b'N', b'G'],
                ..MockState::default()
            }),
            router: DialogRouter::new(),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Register an element.
    pub fn add_element(&self, element: MockElement) {
        self.with_state(|state| {
            state.elements.insert(element.id.clone(), element);
        });
    }

    /// Remove an element; later actions against its handle fail like a
    /// detached element.
    pub fn remove_element(&self, id: &str) {
        self.with_state(|state| {
            state.elements.remove(id);
        });
    }

    /// Bind an expression to element ids in the top-level document.
    pub fn bind(&self, expression: &str, ids: &[&str]) {
        self.bind_in(SearchContext::Document, expression, ids, 0);
    }

    /// Bind in the document, appearing only after `appear_after` queries
    /// returned empty.
    pub fn bind_delayed(&self, expression: &str, ids: &[&str], appear_after: u32) {
        self.bind_in(SearchContext::Document, expression, ids, appear_after);
    }

    /// Bind under a previously registered element.
    pub fn bind_under(&self, parent_id: &str, expression: &str, ids: &[&str]) {
        let parent = SearchContext::Element(ElementHandle::new(parent_id, ""));
        self.bind_in(parent, expression, ids, 0);
    }

    /// Bind inside an embedded document.
    pub fn bind_embedded(&self, doc_id: &str, expression: &str, ids: &[&str]) {
        self.bind_in(
            SearchContext::EmbeddedDocument(doc_id.to_string()),
            expression,
            ids,
            0,
        );
    }

    /// Bind in an arbitrary context with an appearance delay.
    pub fn bind_in(
        &self,
        context: SearchContext,
        expression: &str,
        ids: &[&str],
        appear_after: u32,
    ) {
        self.with_state(|state| {
            state.bindings.push(Binding {
                context: ContextKey::of(&context),
                expression: expression.to_string(),
                ids: ids.iter().map(|id| (*id).to_string()).collect(),
                appear_after,
                queries_seen: 0,
            });
        });
    }

    /// Replace the ids of every binding matching `expression`, keeping query
    /// counters. Simulates a result set that shrank or grew between calls.
    pub fn rebind(&self, expression: &str, ids: &[&str]) {
        self.with_state(|state| {
            for binding in &mut state.bindings {
                if binding.expression == expression {
                    binding.ids = ids.iter().map(|id| (*id).to_string()).collect();
                }
            }
        });
    }

    /// Update an element's live bounding box.
    pub fn set_box(&self, id: &str, bounding_box: Option<BoundingBox>) {
        self.with_state(|state| {
            if let Some(element) = state.elements.get_mut(id) {
                element.bounding_box = bounding_box;
            }
        });
    }

    /// Update an element property.
    pub fn set_property(&self, id: &str, name: &str, value: Value) {
        self.with_state(|state| {
            if let Some(element) = state.elements.get_mut(id) {
                element.properties.insert(name.to_string(), value);
            }
        });
    }

    /// Read an element property.
    #[must_use]
    pub fn property(&self, id: &str, name: &str) -> Option<Value> {
        self.with_state(|state| {
            state
                .elements
                .get(id)
                .and_then(|element| element.properties.get(name).cloned())
        })
    }

    /// Read an element attribute.
    #[must_use]
    pub fn attribute(&self, id: &str, name: &str) -> Option<String> {
        self.with_state(|state| {
            state
                .elements
                .get(id)
                .and_then(|element| element.attributes.get(name).cloned())
        })
    }

    /// Change the current URL without recording a navigation.
    pub fn set_url(&self, url: &str) {
        self.with_state(|state| {
            state.url = url.to_string();
        });
    }

    /// Stub a page-level evaluation result.
    pub fn stub_eval(&self, script: &str, result: Value) {
        self.with_state(|state| {
            state.eval_results.insert(script.to_string(), result);
        });
    }

    /// Full call history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.with_state(|state| state.history.clone())
    }

    /// Whether any recorded call starts with the prefix.
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.with_state(|state| state.history.iter().any(|call| call.starts_with(prefix)))
    }

    /// Number of recorded calls starting with the prefix.
    #[must_use]
    pub fn call_count(&self, prefix: &str) -> usize {
        self.with_state(|state| {
            state
                .history
                .iter()
                .filter(|call| call.starts_with(prefix))
                .count()
        })
    }

    /// Route a dialog through the registered callback, as the page raising
    /// one would.
    pub fn emit_dialog(&self, dialog: &Dialog) -> DialogAction {
        self.router.route(dialog)
    }

    /// Dialogs routed so far.
    #[must_use]
    pub fn dialogs_seen(&self) -> usize {
        self.router.count()
    }

    fn element(state: &MockState, id: &str) -> BuscarResult<MockElement> {
        state
            .elements
            .get(id)
            .cloned()
            .ok_or_else(|| BuscarError::action(format!("element detached or unknown: {id}")))
    }

    fn apply_click(state: &mut MockState, id: &str, record: &str, native: bool) -> BuscarResult<()> {
        let element = Self::element(state, id)?;
        if native && element.reject_clicks {
            state.history.push(format!("{record} {id} rejected"));
            return Err(BuscarError::action(format!("click rejected by engine: {id}")));
        }
        state.history.push(format!("{record} {id}"));
        if let Some(element) = state.elements.get_mut(id) {
            if let Some(Value::Bool(checked)) = element.properties.get("checked").cloned() {
                element
                    .properties
                    .insert("checked".to_string(), Value::Bool(!checked));
            }
        }
        Ok(())
    }

    fn run_query(&self, kind: &str, context: &SearchContext, expression: &str) -> Vec<ElementHandle> {
        self.with_state(|state| {
            state.history.push(format!("{kind} {context} {expression}"));
            let key = ContextKey::of(context);
            let position = state
                .bindings
                .iter()
                .position(|b| b.context == key && b.expression == expression);
            let Some(position) = position else {
                return Vec::new();
            };
            state.bindings[position].queries_seen += 1;
            let binding = &state.bindings[position];
            if binding.queries_seen <= binding.appear_after {
                return Vec::new();
            }
            let ids = binding.ids.clone();
            ids.iter()
                .filter_map(|id| state.elements.get(id).map(MockElement::snapshot))
                .collect()
        })
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_state(|state| {
            f.debug_struct("MockDriver")
                .field("url", &state.url)
                .field("elements", &state.elements.len())
                .field("bindings", &state.bindings.len())
                .field("calls", &state.history.len())
                .finish()
        })
    }
}

#[async_trait]
impl BuscarDriver for MockDriver {
    async fn navigate(
        &self,
        url: &str,
        _timeout: Duration,
        ready: ReadyCondition,
    ) -> BuscarResult<()> {
        self.with_state(|state| {
            state.history.push(format!("navigate {url} {ready:?}"));
            state.url = url.to_string();
        });
        Ok(())
    }

    async fn reload(&self, _ready: ReadyCondition) -> BuscarResult<()> {
        self.with_state(|state| state.history.push("reload".to_string()));
        Ok(())
    }

    async fn current_url(&self) -> BuscarResult<String> {
        Ok(self.with_state(|state| {
            state.history.push("current_url".to_string());
            state.url.clone()
        }))
    }

    async fn query_css(
        &self,
        context: &SearchContext,
        selector: &str,
    ) -> BuscarResult<Vec<ElementHandle>> {
        Ok(self.run_query("query_css", context, selector))
    }

    async fn query_xpath(
        &self,
        context: &SearchContext,
        expression: &str,
    ) -> BuscarResult<Vec<ElementHandle>> {
        Ok(self.run_query("query_xpath", context, expression))
    }

    async fn bounding_box(&self, element: &ElementHandle) -> BuscarResult<Option<BoundingBox>> {
        self.with_state(|state| {
            state.history.push(format!("bounding_box {}", element.id));
            Ok(Self::element(state, &element.id)?.bounding_box)
        })
    }

    async fn click(&self, element: &ElementHandle) -> BuscarResult<()> {
        self.with_state(|state| Self::apply_click(state, &element.id, "click", true))
    }

    async fn hover(&self, element: &ElementHandle) -> BuscarResult<()> {
        self.with_state(|state| {
            state.history.push(format!("hover {}", element.id));
            Self::element(state, &element.id).map(|_| ())
        })
    }

    async fn type_text(
        &self,
        element: &ElementHandle,
        text: &str,
        _delay: Duration,
    ) -> BuscarResult<()> {
        self.with_state(|state| {
            Self::element(state, &element.id)?;
            state.history.push(format!("type {} {text}", element.id));
            if let Some(target) = state.elements.get_mut(&element.id) {
                let mut value = match target.properties.get("value") {
                    Some(Value::String(existing)) => existing.clone(),
                    _ => String::new(),
                };
                value.push_str(text);
                target
                    .properties
                    .insert("value".to_string(), Value::String(value));
            }
            Ok(())
        })
    }

    async fn press_key(&self, element: &ElementHandle, key: &str) -> BuscarResult<()> {
        self.with_state(|state| {
            Self::element(state, &element.id)?;
            state.history.push(format!("press {} {key}", element.id));
            if key == "Backspace" {
                if let Some(target) = state.elements.get_mut(&element.id) {
                    if let Some(Value::String(value)) = target.properties.get("value").cloned() {
                        let mut value = value;
                        value.pop();
                        target
                            .properties
                            .insert("value".to_string(), Value::String(value));
                    }
                }
            }
            Ok(())
        })
    }

    async fn embedded_document(&self, element: &ElementHandle) -> BuscarResult<SearchContext> {
        self.with_state(|state| {
            state
                .history
                .push(format!("embedded_document {}", element.id));
            let doc = Self::element(state, &element.id)?.embedded_doc.ok_or_else(|| {
                BuscarError::action(format!("no embedded document under: {}", element.id))
            })?;
            Ok(SearchContext::EmbeddedDocument(doc))
        })
    }

    async fn evaluate(&self, script: &str) -> BuscarResult<Value> {
        Ok(self.with_state(|state| {
            state.history.push(format!("evaluate {script}"));
            state.eval_results.get(script).cloned().unwrap_or(Value::Null)
        }))
    }

    async fn evaluate_on(
        &self,
        element: &ElementHandle,
        script: &str,
        args: Vec<Value>,
    ) -> BuscarResult<Value> {
        let arg_str = |index: usize| -> String {
            args.get(index)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        if script.contains("setAttribute") {
            let (name, value) = (arg_str(0), arg_str(1));
            return self.with_state(|state| {
                Self::element(state, &element.id)?;
                state
                    .history
                    .push(format!("set_attribute {} {name}", element.id));
                if let Some(target) = state.elements.get_mut(&element.id) {
                    target.attributes.insert(name, value);
                }
                Ok(Value::Null)
            });
        }
        if script.contains("getAttribute") {
            let name = arg_str(0);
            return self.with_state(|state| {
                let target = Self::element(state, &element.id)?;
                state
                    .history
                    .push(format!("get_attribute {} {name}", element.id));
                Ok(target
                    .attributes
                    .get(&name)
                    .map_or(Value::Null, |v| Value::String(v.clone())))
            });
        }
        if script.contains(".click()") {
            return self.with_state(|state| {
                Self::apply_click(state, &element.id, "hidden_click", false)?;
                Ok(Value::Null)
            });
        }
        if script.contains("el[name]") {
            let name = arg_str(0);
            return self.with_state(|state| {
                let target = Self::element(state, &element.id)?;
                state
                    .history
                    .push(format!("get_property {} {name}", element.id));
                Ok(target.properties.get(&name).cloned().unwrap_or(Value::Null))
            });
        }
        self.with_state(|state| {
            Self::element(state, &element.id)?;
            state
                .history
                .push(format!("evaluate_on {} {script}", element.id));
            Ok(state.eval_results.get(script).cloned().unwrap_or(Value::Null))
        })
    }

    async fn capture_screenshot(&self) -> BuscarResult<Vec<u8>> {
        Ok(self.with_state(|state| {
            state.history.push("screenshot".to_string());
            state.screenshot_data.clone()
        }))
    }

    fn set_dialog_handler(&self, callback: DialogCallback) {
        self.router.set(move |dialog: &Dialog| callback(dialog));
    }
}
