//! Real browser control over the Chrome DevTools Protocol.
//!
//! [`CdpDriver`] implements [`BuscarDriver`] on top of a chromium instance
//! driven through chromiumoxide. Live elements are kept in an in-page
//! registry: every query stores its matches under fresh ids and hands those
//! ids back as [`ElementHandle`]s, so a handle stays valid exactly as long as
//! the document it was minted on. Clicks and keys go through raw
//! `Input.dispatch*` commands rather than synthetic DOM events; script-driven
//! interaction uses [`BuscarDriver::evaluate_on`].

use crate::dialog::{Dialog, DialogAction, DialogCallback, DialogRouter};
use crate::driver::{BuscarDriver, ElementHandle, ReadyCondition, SearchContext};
use crate::locator::BoundingBox;
use crate::result::{BuscarError, BuscarResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams, DispatchMouseEventType,
    MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, DialogType, EventJavascriptDialogOpening,
    HandleJavaScriptDialogParams, ReloadParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Interval between `document.readyState` polls after navigation.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Quiet period appended for [`ReadyCondition::NetworkIdle`] once the load
/// event has fired.
const NETWORK_IDLE_GRACE: Duration = Duration::from_millis(500);

/// In-page element registry, prepended to every driver script.
///
/// The registry lives on `window`, so a navigation discards it together with
/// the document; the random tag keeps ids from one document from aliasing
/// ids minted on the next.
const REGISTRY_JS: &str = r"
const reg = window.__buscarNodes = window.__buscarNodes || { seq: 0, tag: Math.random().toString(36).slice(2, 8), map: new Map() };
const put = (node) => { reg.seq += 1; const id = reg.tag + '-' + reg.seq; reg.map.set(id, node); return id; };
const grab = (id) => { const node = reg.map.get(id); if (!node) { throw new Error('stale element handle ' + id); } return node; };
const describe = (el) => {
  const r = el.getBoundingClientRect();
  const rendered = el.isConnected && (r.width > 0 || r.height > 0);
  return { id: put(el), tag: el.tagName.toLowerCase(), rect: rendered ? { x: r.x, y: r.y, width: r.width, height: r.height } : null };
};
";

/// Browser launch configuration for [`CdpDriver`].
#[derive(Debug, Clone)]
pub struct CdpConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (`None` = auto-detect)
    pub chromium_path: Option<String>,
    /// User agent override
    pub user_agent: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Timeout applied to reloads, which carry no per-call timeout
    pub navigation_timeout: Duration,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            user_agent: None,
            sandbox: true,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl CdpConfig {
    /// New config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode.
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions.
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set the chromium binary path.
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Disable the sandbox (for containers/CI).
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set the reload timeout.
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }
}

/// Element snapshot as produced by the in-page `describe` helper.
#[derive(Debug, Deserialize)]
struct RawNode {
    id: String,
    tag: String,
    rect: Option<RawRect>,
}

#[derive(Debug, Deserialize)]
struct RawRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl From<RawRect> for BoundingBox {
    fn from(rect: RawRect) -> Self {
        Self::new(rect.x, rect.y, rect.width, rect.height)
    }
}

impl From<RawNode> for ElementHandle {
    fn from(raw: RawNode) -> Self {
        let handle = ElementHandle::new(raw.id, raw.tag);
        match raw.rect {
            Some(rect) => handle.with_box(rect.into()),
            None => handle,
        }
    }
}

/// Encode a string as a JavaScript string literal.
fn js_string(value: &str) -> String {
    Value::from(value).to_string()
}

/// Wrap a script body (with `return`) in an IIFE carrying the registry.
fn wrap(body: &str) -> String {
    format!("(() => {{{REGISTRY_JS}{body}\n}})()")
}

/// JavaScript expression for the root node of a search context.
fn context_root(context: &SearchContext) -> String {
    match context {
        SearchContext::Document => "document".to_string(),
        SearchContext::EmbeddedDocument(id) => format!("grab({})", js_string(id)),
        SearchContext::Element(handle) => format!("grab({})", js_string(&handle.id)),
    }
}

/// Build evaluate params for an expression, returning the value by JSON.
fn expression(script: String) -> BuscarResult<EvaluateParams> {
    EvaluateParams::builder()
        .expression(script)
        .return_by_value(true)
        .await_promise(true)
        .build()
        .map_err(|e| BuscarError::Evaluation {
            message: e.to_string(),
        })
}

fn navigation_error(url: &str, message: impl Into<String>) -> BuscarError {
    BuscarError::Navigation {
        url: url.to_string(),
        message: message.into(),
    }
}

/// CDP dispatch data for a named key.
struct KeySpec {
    key: &'static str,
    code: &'static str,
    virtual_code: i64,
    /// Text a key-down produces; keys without text dispatch as raw key-downs
    text: Option<&'static str>,
}

fn key_spec(key: &str) -> Option<KeySpec> {
    let spec = match key {
        "Backspace" => KeySpec {
            key: "Backspace",
            code: "Backspace",
            virtual_code: 8,
            text: None,
        },
        "Tab" => KeySpec {
            key: "Tab",
            code: "Tab",
            virtual_code: 9,
            text: None,
        },
        "Enter" => KeySpec {
            key: "Enter",
            code: "Enter",
            virtual_code: 13,
            text: Some("\r"),
        },
        "Escape" => KeySpec {
            key: "Escape",
            code: "Escape",
            virtual_code: 27,
            text: None,
        },
        "Space" | " " => KeySpec {
            key: " ",
            code: "Space",
            virtual_code: 32,
            text: Some(" "),
        },
        "PageUp" => KeySpec {
            key: "PageUp",
            code: "PageUp",
            virtual_code: 33,
            text: None,
        },
        "PageDown" => KeySpec {
            key: "PageDown",
            code: "PageDown",
            virtual_code: 34,
            text: None,
        },
        "End" => KeySpec {
            key: "End",
            code: "End",
            virtual_code: 35,
            text: None,
        },
        "Home" => KeySpec {
            key: "Home",
            code: "Home",
            virtual_code: 36,
            text: None,
        },
        "ArrowLeft" => KeySpec {
            key: "ArrowLeft",
            code: "ArrowLeft",
            virtual_code: 37,
            text: None,
        },
        "ArrowUp" => KeySpec {
            key: "ArrowUp",
            code: "ArrowUp",
            virtual_code: 38,
            text: None,
        },
        "ArrowRight" => KeySpec {
            key: "ArrowRight",
            code: "ArrowRight",
            virtual_code: 39,
            text: None,
        },
        "ArrowDown" => KeySpec {
            key: "ArrowDown",
            code: "ArrowDown",
            virtual_code: 40,
            text: None,
        },
        "Delete" => KeySpec {
            key: "Delete",
            code: "Delete",
            virtual_code: 46,
            text: None,
        },
        _ => return None,
    };
    Some(spec)
}

fn dialog_from_event(event: &EventJavascriptDialogOpening) -> Dialog {
    match event.r#type {
        DialogType::Alert => Dialog::alert(event.message.clone()),
        DialogType::Confirm => Dialog::confirm(event.message.clone()),
        DialogType::Prompt => Dialog::prompt(event.message.clone(), event.default_prompt.clone()),
        DialogType::Beforeunload => Dialog::before_unload(event.message.clone()),
    }
}

async fn answer_dialog(page: &CdpPage, action: &DialogAction) -> BuscarResult<()> {
    let builder = HandleJavaScriptDialogParams::builder();
    let params = match action {
        DialogAction::Accept => builder.accept(true),
        DialogAction::AcceptWith(text) => builder.accept(true).prompt_text(text.as_str()),
        DialogAction::Dismiss => builder.accept(false),
    }
    .build()
    .map_err(|e| BuscarError::action(e.to_string()))?;
    page.execute(params)
        .await
        .map_err(|e| BuscarError::action(e.to_string()))?;
    Ok(())
}

/// Route dialog events through the router for the lifetime of the page.
///
/// The pump owns its own page clone, so an open dialog can be answered even
/// while a driver call holds the page lock.
async fn spawn_dialog_pump(
    page: &CdpPage,
    router: DialogRouter,
) -> BuscarResult<tokio::task::JoinHandle<()>> {
    let mut dialogs = page
        .event_listener::<EventJavascriptDialogOpening>()
        .await
        .map_err(|e| BuscarError::Launch {
            message: e.to_string(),
        })?;
    let page = page.clone();
    Ok(tokio::spawn(async move {
        while let Some(event) = dialogs.next().await {
            let dialog = dialog_from_event(&event);
            let action = router.route(&dialog);
            if let Err(error) = answer_dialog(&page, &action).await {
                warn!(target: "buscar::cdp", %error, "failed to answer dialog");
            }
        }
    }))
}

/// [`BuscarDriver`] backed by a launched chromium instance.
#[derive(Debug)]
pub struct CdpDriver {
    config: CdpConfig,
    browser: Arc<Mutex<Browser>>,
    page: Arc<Mutex<CdpPage>>,
    router: DialogRouter,
    handle: tokio::task::JoinHandle<()>,
    dialog_pump: tokio::task::JoinHandle<()>,
}

impl CdpDriver {
    /// Launch chromium and open a blank page.
    pub async fn launch(config: CdpConfig) -> BuscarResult<Self> {
        let mut builder =
            BrowserConfig::builder().window_size(config.viewport_width, config.viewport_height);

        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(ref agent) = config.user_agent {
            builder = builder.arg(format!("--user-agent={agent}"));
        }

        let browser_config = builder.build().map_err(|e| BuscarError::Launch {
            message: e.to_string(),
        })?;

        let (browser, mut handler) =
            Browser::launch(browser_config)
                .await
                .map_err(|e| BuscarError::Launch {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BuscarError::Launch {
                message: e.to_string(),
            })?;

        let router = DialogRouter::new();
        let dialog_pump = spawn_dialog_pump(&page, router.clone()).await?;

        Ok(Self {
            config,
            browser: Arc::new(Mutex::new(browser)),
            page: Arc::new(Mutex::new(page)),
            router,
            handle,
            dialog_pump,
        })
    }

    /// Launch configuration.
    #[must_use]
    pub const fn config(&self) -> &CdpConfig {
        &self.config
    }

    /// Dialogs routed so far, with the action each received.
    #[must_use]
    pub fn dialogs_seen(&self) -> Vec<(Dialog, DialogAction)> {
        self.router.seen()
    }

    /// Close the browser and stop the background tasks.
    pub async fn close(self) -> BuscarResult<()> {
        self.dialog_pump.abort();
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(|e| BuscarError::Launch {
            message: e.to_string(),
        })?;
        self.handle.abort();
        Ok(())
    }

    /// Evaluate an expression and deserialize its JSON result.
    async fn eval_json<T: DeserializeOwned>(&self, script: String) -> BuscarResult<T> {
        let params = expression(script)?;
        let page = self.page.lock().await;
        let result = page
            .evaluate(params)
            .await
            .map_err(|e| BuscarError::Evaluation {
                message: e.to_string(),
            })?;
        result.into_value().map_err(|e| BuscarError::Evaluation {
            message: e.to_string(),
        })
    }

    /// Focus the element. Key events dispatch to whatever holds focus.
    async fn focus(&self, element: &ElementHandle) -> BuscarResult<()> {
        let body = format!(
            "grab({id}).focus();\nreturn null;",
            id = js_string(&element.id),
        );
        self.eval_json::<Value>(wrap(&body)).await?;
        Ok(())
    }

    /// Scroll the element into view and return its viewport center.
    async fn scroll_into_view(&self, element: &ElementHandle) -> BuscarResult<(f64, f64)> {
        let body = format!(
            "const el = grab({id});\n\
             el.scrollIntoView({{ block: 'center', inline: 'center' }});\n\
             const r = el.getBoundingClientRect();\n\
             if (!el.isConnected || (r.width === 0 && r.height === 0)) {{\n\
               throw new Error('element has no visible box: ' + {id});\n\
             }}\n\
             return {{ x: r.x, y: r.y, width: r.width, height: r.height }};",
            id = js_string(&element.id),
        );
        let rect: RawRect = self.eval_json(wrap(&body)).await?;
        Ok(BoundingBox::from(rect).center())
    }

    async fn dispatch_mouse(
        &self,
        kind: DispatchMouseEventType,
        x: f64,
        y: f64,
        click_count: Option<i64>,
    ) -> BuscarResult<()> {
        let mut builder = DispatchMouseEventParams::builder().r#type(kind).x(x).y(y);
        if let Some(count) = click_count {
            builder = builder.button(MouseButton::Left).click_count(count);
        }
        let params = builder
            .build()
            .map_err(|e| BuscarError::action(e.to_string()))?;
        let page = self.page.lock().await;
        page.execute(params)
            .await
            .map_err(|e| BuscarError::action(e.to_string()))?;
        Ok(())
    }

    /// Dispatch a text-producing character event to the focused element.
    async fn dispatch_char(&self, ch: char) -> BuscarResult<()> {
        let params = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::Char)
            .text(ch.to_string())
            .build()
            .map_err(|e| BuscarError::action(e.to_string()))?;
        let page = self.page.lock().await;
        page.execute(params)
            .await
            .map_err(|e| BuscarError::action(e.to_string()))?;
        Ok(())
    }

    /// Poll `document.readyState` until the ready condition holds.
    ///
    /// `NetworkIdle` is approximated as the load event plus a quiet grace
    /// period; exact idle tracking would need the Network domain.
    async fn wait_until_ready(
        &self,
        url: &str,
        deadline: tokio::time::Instant,
        ready: ReadyCondition,
    ) -> BuscarResult<()> {
        loop {
            // An error here means the document is mid-transition; keep polling.
            let state: String = self
                .eval_json("document.readyState".to_string())
                .await
                .unwrap_or_default();
            let reached = match ready {
                ReadyCondition::DomContentLoaded => state == "interactive" || state == "complete",
                ReadyCondition::Load | ReadyCondition::NetworkIdle => state == "complete",
            };
            if reached {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(navigation_error(
                    url,
                    format!("document not ready ({ready:?}) before timeout"),
                ));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        if ready == ReadyCondition::NetworkIdle {
            tokio::time::sleep(NETWORK_IDLE_GRACE).await;
        }
        Ok(())
    }
}

#[async_trait]
impl BuscarDriver for CdpDriver {
    async fn navigate(
        &self,
        url: &str,
        timeout: Duration,
        ready: ReadyCondition,
    ) -> BuscarResult<()> {
        debug!(target: "buscar::cdp", url, "navigating");
        let deadline = tokio::time::Instant::now() + timeout;
        {
            let page = self.page.lock().await;
            tokio::time::timeout(timeout, page.goto(url))
                .await
                .map_err(|_| navigation_error(url, "navigation timed out"))?
                .map_err(|e| navigation_error(url, e.to_string()))?;
        }
        self.wait_until_ready(url, deadline, ready).await
    }

    async fn reload(&self, ready: ReadyCondition) -> BuscarResult<()> {
        let url = self.current_url().await.unwrap_or_default();
        let deadline = tokio::time::Instant::now() + self.config.navigation_timeout;
        {
            let page = self.page.lock().await;
            page.execute(ReloadParams::builder().build())
                .await
                .map_err(|e| navigation_error(&url, e.to_string()))?;
        }
        // Right after the reload command the old document may still report
        // itself complete; give the new load a poll interval to start.
        tokio::time::sleep(READY_POLL_INTERVAL).await;
        self.wait_until_ready(&url, deadline, ready).await
    }

    async fn current_url(&self) -> BuscarResult<String> {
        self.eval_json("window.location.href".to_string()).await
    }

    async fn query_css(
        &self,
        context: &SearchContext,
        selector: &str,
    ) -> BuscarResult<Vec<ElementHandle>> {
        let body = format!(
            "const root = {root};\n\
             return Array.from(root.querySelectorAll({selector})).map(describe);",
            root = context_root(context),
            selector = js_string(selector),
        );
        let nodes: Vec<RawNode> = self.eval_json(wrap(&body)).await?;
        Ok(nodes.into_iter().map(Into::into).collect())
    }

    async fn query_xpath(
        &self,
        context: &SearchContext,
        expression: &str,
    ) -> BuscarResult<Vec<ElementHandle>> {
        let body = format!(
            "const root = {root};\n\
             const doc = root.ownerDocument || root;\n\
             const found = doc.evaluate({expr}, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);\n\
             const out = [];\n\
             for (let i = 0; i < found.snapshotLength; i += 1) {{\n\
               const node = found.snapshotItem(i);\n\
               if (node.nodeType === Node.ELEMENT_NODE) {{ out.push(describe(node)); }}\n\
             }}\n\
             return out;",
            root = context_root(context),
            expr = js_string(expression),
        );
        let nodes: Vec<RawNode> = self.eval_json(wrap(&body)).await?;
        Ok(nodes.into_iter().map(Into::into).collect())
    }

    async fn bounding_box(&self, element: &ElementHandle) -> BuscarResult<Option<BoundingBox>> {
        let body = format!(
            "const el = grab({id});\n\
             const r = el.getBoundingClientRect();\n\
             if (!el.isConnected || (r.width === 0 && r.height === 0)) {{ return null; }}\n\
             return {{ x: r.x, y: r.y, width: r.width, height: r.height }};",
            id = js_string(&element.id),
        );
        let rect: Option<RawRect> = self.eval_json(wrap(&body)).await?;
        Ok(rect.map(Into::into))
    }

    async fn click(&self, element: &ElementHandle) -> BuscarResult<()> {
        let (x, y) = self.scroll_into_view(element).await?;
        self.dispatch_mouse(DispatchMouseEventType::MouseMoved, x, y, None)
            .await?;
        self.dispatch_mouse(DispatchMouseEventType::MousePressed, x, y, Some(1))
            .await?;
        self.dispatch_mouse(DispatchMouseEventType::MouseReleased, x, y, Some(1))
            .await
    }

    async fn hover(&self, element: &ElementHandle) -> BuscarResult<()> {
        let (x, y) = self.scroll_into_view(element).await?;
        self.dispatch_mouse(DispatchMouseEventType::MouseMoved, x, y, None)
            .await
    }

    async fn type_text(
        &self,
        element: &ElementHandle,
        text: &str,
        delay: Duration,
    ) -> BuscarResult<()> {
        self.focus(element).await?;
        for ch in text.chars() {
            if ch == '\n' {
                self.press_key(element, "Enter").await?;
            } else {
                self.dispatch_char(ch).await?;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    async fn press_key(&self, element: &ElementHandle, key: &str) -> BuscarResult<()> {
        self.focus(element).await?;
        let Some(spec) = key_spec(key) else {
            // Single characters dispatch as plain text; anything else is a
            // key this driver does not know how to synthesize.
            let mut chars = key.chars();
            return match (chars.next(), chars.next()) {
                (Some(ch), None) => self.dispatch_char(ch).await,
                _ => Err(BuscarError::action(format!("unsupported key {key:?}"))),
            };
        };

        let down_type = if spec.text.is_some() {
            DispatchKeyEventType::KeyDown
        } else {
            DispatchKeyEventType::RawKeyDown
        };
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(down_type)
            .key(spec.key)
            .code(spec.code)
            .windows_virtual_key_code(spec.virtual_code)
            .native_virtual_key_code(spec.virtual_code);
        if let Some(text) = spec.text {
            builder = builder.text(text);
        }
        let down = builder
            .build()
            .map_err(|e| BuscarError::action(e.to_string()))?;
        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(spec.key)
            .code(spec.code)
            .windows_virtual_key_code(spec.virtual_code)
            .native_virtual_key_code(spec.virtual_code)
            .build()
            .map_err(|e| BuscarError::action(e.to_string()))?;

        let page = self.page.lock().await;
        page.execute(down)
            .await
            .map_err(|e| BuscarError::action(e.to_string()))?;
        page.execute(up)
            .await
            .map_err(|e| BuscarError::action(e.to_string()))?;
        Ok(())
    }

    /// Same-origin frames only: a cross-origin `contentDocument` is null,
    /// which surfaces as a retryable evaluation error.
    async fn embedded_document(&self, element: &ElementHandle) -> BuscarResult<SearchContext> {
        let body = format!(
            "const el = grab({id});\n\
             const doc = el.contentDocument;\n\
             if (!doc) {{ throw new Error('no embedded document under ' + {id}); }}\n\
             return put(doc);",
            id = js_string(&element.id),
        );
        let doc_id: String = self.eval_json(wrap(&body)).await?;
        Ok(SearchContext::EmbeddedDocument(doc_id))
    }

    async fn evaluate(&self, script: &str) -> BuscarResult<Value> {
        let params = expression(script.to_string())?;
        let page = self.page.lock().await;
        let result = page
            .evaluate(params)
            .await
            .map_err(|e| BuscarError::Evaluation {
                message: e.to_string(),
            })?;
        // Scripts evaluating to undefined carry no value; report null.
        Ok(result.into_value().unwrap_or(Value::Null))
    }

    async fn evaluate_on(
        &self,
        element: &ElementHandle,
        script: &str,
        args: Vec<Value>,
    ) -> BuscarResult<Value> {
        let packed = serde_json::to_string(&args)?;
        let body = format!(
            "const el = grab({id});\n\
             const fn = {script};\n\
             const out = fn(el, ...{packed});\n\
             return out === undefined ? null : out;",
            id = js_string(&element.id),
        );
        self.eval_json(wrap(&body)).await
    }

    async fn capture_screenshot(&self) -> BuscarResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let page = self.page.lock().await;
        let screenshot = page
            .execute(params)
            .await
            .map_err(|e| BuscarError::action(e.to_string()))?;

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|e| BuscarError::action(e.to_string()))
    }

    fn set_dialog_handler(&self, callback: DialogCallback) {
        self.router.set(move |dialog: &Dialog| callback(dialog));
    }
}
