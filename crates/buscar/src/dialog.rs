//! Browser dialog routing (alert, confirm, prompt, beforeunload).
//!
//! The session registers a single callback; the driver routes every dialog
//! event through it and answers the browser with the returned action. Without
//! a callback, dialogs are dismissed so they never block a test.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Kind of browser dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogKind {
    /// Alert dialog (OK button only)
    Alert,
    /// Confirm dialog (OK/Cancel buttons)
    Confirm,
    /// Prompt dialog (text input + OK/Cancel)
    Prompt,
    /// Before-unload dialog (Leave/Stay buttons)
    BeforeUnload,
}

impl std::fmt::Display for DialogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alert => write!(f, "alert"),
            Self::Confirm => write!(f, "confirm"),
            Self::Prompt => write!(f, "prompt"),
            Self::BeforeUnload => write!(f, "beforeunload"),
        }
    }
}

/// Answer given back to the browser for a dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogAction {
    /// Accept (OK/Yes/Leave)
    Accept,
    /// Accept with input text (for prompts)
    AcceptWith(String),
    /// Dismiss (Cancel/No/Stay)
    Dismiss,
}

/// A dialog raised by the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialog {
    kind: DialogKind,
    message: String,
    default_prompt: Option<String>,
}

impl Dialog {
    /// Create a dialog record.
    #[must_use]
    pub fn new(kind: DialogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            default_prompt: None,
        }
    }

    /// Alert dialog.
    #[must_use]
    pub fn alert(message: impl Into<String>) -> Self {
        Self::new(DialogKind::Alert, message)
    }

    /// Confirm dialog.
    #[must_use]
    pub fn confirm(message: impl Into<String>) -> Self {
        Self::new(DialogKind::Confirm, message)
    }

    /// Prompt dialog with an optional default input value.
    #[must_use]
    pub fn prompt(message: impl Into<String>, default: Option<String>) -> Self {
        let mut dialog = Self::new(DialogKind::Prompt, message);
        dialog.default_prompt = default;
        dialog
    }

    /// Before-unload dialog.
    #[must_use]
    pub fn before_unload(message: impl Into<String>) -> Self {
        Self::new(DialogKind::BeforeUnload, message)
    }

    /// Dialog kind.
    #[must_use]
    pub fn kind(&self) -> DialogKind {
        self.kind
    }

    /// Message shown in the dialog.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Default input value, for prompts.
    #[must_use]
    pub fn default_prompt(&self) -> Option<&str> {
        self.default_prompt.as_deref()
    }
}

/// Callback deciding how a dialog is answered
pub type DialogCallback = Arc<dyn Fn(&Dialog) -> DialogAction + Send + Sync>;

/// Routes dialog events from a driver to the registered callback.
///
/// Keeps a history of routed dialogs so tests can assert on what the page
/// raised.
#[derive(Clone, Default)]
pub struct DialogRouter {
    callback: Arc<Mutex<Option<DialogCallback>>>,
    seen: Arc<Mutex<Vec<(Dialog, DialogAction)>>>,
}

impl DialogRouter {
    /// Create an empty router (dismisses everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the callback. Replaces any previous one.
    pub fn set<F>(&self, callback: F)
    where
        F: Fn(&Dialog) -> DialogAction + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.callback.lock() {
            *slot = Some(Arc::new(callback));
        }
    }

    /// Route one dialog and return the action to answer the browser with.
    /// Without a registered callback the dialog is dismissed.
    pub fn route(&self, dialog: &Dialog) -> DialogAction {
        let action = self
            .callback
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|cb| cb(dialog)))
            .unwrap_or(DialogAction::Dismiss);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((dialog.clone(), action.clone()));
        }
        action
    }

    /// Dialogs routed so far, with the action each received.
    #[must_use]
    pub fn seen(&self) -> Vec<(Dialog, DialogAction)> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of dialogs routed so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Last routed dialog, if any.
    #[must_use]
    pub fn last(&self) -> Option<Dialog> {
        self.seen
            .lock()
            .ok()
            .and_then(|s| s.last().map(|(d, _)| d.clone()))
    }
}

impl std::fmt::Debug for DialogRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogRouter")
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    mod dialog_tests {
        use super::*;

        #[test]
        fn constructors_set_kind() {
            assert_eq!(Dialog::alert("a").kind(), DialogKind::Alert);
            assert_eq!(Dialog::confirm("c").kind(), DialogKind::Confirm);
            assert_eq!(Dialog::prompt("p", None).kind(), DialogKind::Prompt);
            assert_eq!(Dialog::before_unload("b").kind(), DialogKind::BeforeUnload);
        }

        #[test]
        fn prompt_carries_default() {
            let dialog = Dialog::prompt("Name?", Some("anon".to_string()));
            assert_eq!(dialog.default_prompt(), Some("anon"));
            assert_eq!(dialog.message(), "Name?");
        }

        #[test]
        fn kind_display() {
            assert_eq!(DialogKind::Alert.to_string(), "alert");
            assert_eq!(DialogKind::Confirm.to_string(), "confirm");
            assert_eq!(DialogKind::Prompt.to_string(), "prompt");
            assert_eq!(DialogKind::BeforeUnload.to_string(), "beforeunload");
        }
    }

    mod router_tests {
        use super::*;

        #[test]
        fn dismisses_without_callback() {
            let router = DialogRouter::new();
            let action = router.route(&Dialog::alert("hi"));
            assert_eq!(action, DialogAction::Dismiss);
            assert_eq!(router.count(), 1);
        }

        #[test]
        fn callback_decides_action() {
            let router = DialogRouter::new();
            router.set(|dialog| {
                if dialog.kind() == DialogKind::Confirm {
                    DialogAction::Accept
                } else {
                    DialogAction::Dismiss
                }
            });

            assert_eq!(router.route(&Dialog::confirm("?")), DialogAction::Accept);
            assert_eq!(router.route(&Dialog::alert("!")), DialogAction::Dismiss);
        }

        #[test]
        fn prompt_answered_with_text() {
            let router = DialogRouter::new();
            router.set(|_| DialogAction::AcceptWith("yes".to_string()));

            let action = router.route(&Dialog::prompt("Sure?", None));
            assert_eq!(action, DialogAction::AcceptWith("yes".to_string()));
        }

        #[test]
        fn history_records_dialog_and_action() {
            let router = DialogRouter::new();
            router.set(|_| DialogAction::Accept);
            router.route(&Dialog::alert("first"));
            router.route(&Dialog::alert("second"));

            let seen = router.seen();
            assert_eq!(seen.len(), 2);
            assert_eq!(seen[0].0.message(), "first");
            assert_eq!(seen[1].1, DialogAction::Accept);
            assert_eq!(router.last().unwrap().message(), "second");
        }

        #[test]
        fn replacing_callback_takes_effect() {
            let router = DialogRouter::new();
            router.set(|_| DialogAction::Accept);
            router.set(|_| DialogAction::Dismiss);
            assert_eq!(router.route(&Dialog::alert("x")), DialogAction::Dismiss);
        }
    }
}
