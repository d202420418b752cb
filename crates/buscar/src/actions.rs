//! Interaction primitives.
//!
//! Every primitive follows the same shape: log the operation line, resolve
//! the node with the full retry budget, act through the driver, and settle
//! where the action can trigger client-side reactions. The trace line is
//! written before resolution, so the operation log shows what a session
//! attempted even when resolution failed.

use crate::driver::ElementHandle;
use crate::node::Node;
use crate::resolver;
use crate::result::{BuscarError, BuscarResult};
use serde_json::Value;
use std::time::Duration;

/// Extra delete presses allowed beyond the initial value length when
/// clearing, for inputs that reformat while being emptied.
const CLEAR_SLACK: usize = 8;

/// Property names probed by [`Node::text`], in priority order.
const TEXT_PROPERTIES: [&str; 3] = ["innerText", "value", "textContent"];

pub(crate) const CLICK_SCRIPT: &str = "el => el.click()";
pub(crate) const GET_ATTRIBUTE_SCRIPT: &str = "(el, name) => el.getAttribute(name)";
pub(crate) const SET_ATTRIBUTE_SCRIPT: &str = "(el, name, value) => el.setAttribute(name, value)";
pub(crate) const GET_PROPERTY_SCRIPT: &str = "(el, name) => el[name]";

/// Options for [`Node::type_text_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeOptions {
    clear_first: bool,
    append_newline: bool,
    mask_log: bool,
    delay: Option<Duration>,
}

impl TypeOptions {
    /// Defaults: keep the existing value, plain logging, configured delay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the field before typing.
    #[must_use]
    pub const fn with_clear(mut self) -> Self {
        self.clear_first = true;
        self
    }

    /// Append an end-of-line character after the text.
    #[must_use]
    pub const fn with_newline(mut self) -> Self {
        self.append_newline = true;
        self
    }

    /// Log `***` instead of the typed text.
    #[must_use]
    pub const fn masked(mut self) -> Self {
        self.mask_log = true;
        self
    }

    /// Override the configured per-character delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Node {
    /// Native click on the resolved element.
    pub async fn click(&self) -> BuscarResult<()> {
        self.diagnostics()
            .operation("click", &self.op_label(), None);
        let resolution = resolver::resolve(self).await?;
        self.driver().click(resolution.selected()).await?;
        self.settle().await;
        Ok(())
    }

    /// Click through in-page script execution, bypassing hit-testing.
    ///
    /// Works on elements covered by overlays or scrolled out of view, where
    /// the native click would hit whatever is on top.
    pub async fn click_hidden(&self) -> BuscarResult<()> {
        self.diagnostics()
            .operation("click_hidden", &self.op_label(), None);
        let resolution = resolver::resolve(self).await?;
        self.driver()
            .evaluate_on(resolution.selected(), CLICK_SCRIPT, Vec::new())
            .await?;
        self.settle().await;
        Ok(())
    }

    /// Type text with default options.
    pub async fn type_text(&self, text: &str) -> BuscarResult<()> {
        self.type_text_with(text, TypeOptions::new()).await
    }

    /// Type text into the element.
    ///
    /// Waits for the element to become visible, clicks it to focus,
    /// optionally empties the current value one delete at a time, then sends
    /// the text (plus the optional end-of-line character) with the
    /// per-character delay.
    pub async fn type_text_with(&self, text: &str, options: TypeOptions) -> BuscarResult<()> {
        let logged = if options.mask_log {
            "***".to_string()
        } else {
            text.to_string()
        };
        self.diagnostics()
            .operation("type", &self.op_label(), Some(logged));

        self.wait_for_visibility(true).await?;
        let resolution = resolver::resolve(self).await?;
        let element = resolution.selected().clone();
        self.driver().click(&element).await?;
        if options.clear_first {
            self.clear_element(&element).await?;
        }

        let mut payload = text.to_string();
        if options.append_newline {
            payload.push('\n');
        }
        let delay = options.delay.unwrap_or_else(|| self.config().type_delay());
        self.driver().type_text(&element, &payload, delay).await?;
        self.settle().await;
        Ok(())
    }

    /// Empty the element's current value one delete press at a time.
    pub async fn clear(&self) -> BuscarResult<()> {
        self.diagnostics()
            .operation("clear", &self.op_label(), None);
        let resolution = resolver::resolve(self).await?;
        let element = resolution.selected().clone();
        self.driver().click(&element).await?;
        self.clear_element(&element).await
    }

    /// Converge the element's `checked` state onto the desired value.
    ///
    /// Reads the current state first and issues a hidden click only when it
    /// differs; checking an already-checked box is a no-op.
    pub async fn check(&self, desired: bool) -> BuscarResult<()> {
        self.diagnostics()
            .operation("check", &self.op_label(), Some(desired.to_string()));
        let resolution = resolver::resolve(self).await?;
        let element = resolution.selected().clone();
        let current = self
            .driver()
            .evaluate_on(
                &element,
                GET_PROPERTY_SCRIPT,
                vec![Value::String("checked".to_string())],
            )
            .await?
            .as_bool()
            .unwrap_or(false);
        if current != desired {
            self.driver()
                .evaluate_on(&element, CLICK_SCRIPT, Vec::new())
                .await?;
            self.settle().await;
        }
        Ok(())
    }

    /// Move the pointer over the resolved element.
    pub async fn hover(&self) -> BuscarResult<()> {
        self.diagnostics()
            .operation("hover", &self.op_label(), None);
        let resolution = resolver::resolve(self).await?;
        self.driver().hover(resolution.selected()).await
    }

    /// Press a named key on the resolved element.
    pub async fn press(&self, key: &str) -> BuscarResult<()> {
        self.diagnostics()
            .operation("press", &self.op_label(), Some(key.to_string()));
        let resolution = resolver::resolve(self).await?;
        self.driver().press_key(resolution.selected(), key).await
    }

    /// Set an attribute on the resolved element.
    pub async fn set_attribute(&self, name: &str, value: &str) -> BuscarResult<()> {
        self.diagnostics().operation(
            "set_attribute",
            &self.op_label(),
            Some(format!("{name}={value}")),
        );
        let resolution = resolver::resolve(self).await?;
        self.driver()
            .evaluate_on(
                resolution.selected(),
                SET_ATTRIBUTE_SCRIPT,
                vec![
                    Value::String(name.to_string()),
                    Value::String(value.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    /// Read an attribute from the resolved element; `None` when absent.
    pub async fn get_attribute(&self, name: &str) -> BuscarResult<Option<String>> {
        self.diagnostics()
            .operation("get_attribute", &self.op_label(), Some(name.to_string()));
        let resolution = resolver::resolve(self).await?;
        let value = self
            .driver()
            .evaluate_on(
                resolution.selected(),
                GET_ATTRIBUTE_SCRIPT,
                vec![Value::String(name.to_string())],
            )
            .await?;
        Ok(match value {
            Value::String(text) => Some(text),
            _ => None,
        })
    }

    /// Read a property from the resolved element as raw JSON.
    pub async fn get_property(&self, name: &str) -> BuscarResult<Value> {
        self.diagnostics()
            .operation("get_property", &self.op_label(), Some(name.to_string()));
        let resolution = resolver::resolve(self).await?;
        self.driver()
            .evaluate_on(
                resolution.selected(),
                GET_PROPERTY_SCRIPT,
                vec![Value::String(name.to_string())],
            )
            .await
    }

    /// Visible text of the element.
    ///
    /// First non-empty of `innerText`, `value`, `textContent`; empty string
    /// when all three are empty.
    pub async fn text(&self) -> BuscarResult<String> {
        let resolution = resolver::resolve(self).await?;
        self.read_text_of(resolution.selected()).await
    }

    pub(crate) async fn read_text_of(&self, element: &ElementHandle) -> BuscarResult<String> {
        for property in TEXT_PROPERTIES {
            let value = self
                .driver()
                .evaluate_on(
                    element,
                    GET_PROPERTY_SCRIPT,
                    vec![Value::String(property.to_string())],
                )
                .await?;
            if let Value::String(text) = value {
                if !text.is_empty() {
                    return Ok(text);
                }
            }
        }
        Ok(String::new())
    }

    async fn clear_element(&self, element: &ElementHandle) -> BuscarResult<()> {
        let initial = self.read_text_of(element).await?.chars().count();
        let budget = initial + CLEAR_SLACK;
        let mut presses = 0;
        let mut remaining = initial;
        while remaining > 0 {
            if presses >= budget {
                return Err(BuscarError::action(format!(
                    "value of {} did not empty after {presses} deletions",
                    self.qualified_name()
                )));
            }
            self.driver().press_key(element, "Backspace").await?;
            presses += 1;
            remaining = self.read_text_of(element).await?.chars().count();
        }
        Ok(())
    }

    pub(crate) async fn settle(&self) {
        let settle = self.config().settle();
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
    }
}
