//! Result and error types for Buscar.

use thiserror::Error;

/// Result type for Buscar operations
pub type BuscarResult<T> = Result<T, BuscarError>;

/// Errors that can occur in Buscar
#[derive(Debug, Error)]
pub enum BuscarError {
    /// Locator query produced no usable match after the retry budget
    #[error("Element not found: {node} [{locator}] after {attempts} attempts")]
    NotFound {
        /// Qualified name of the node that failed to resolve
        node: String,
        /// Locator that produced no match
        locator: String,
        /// Attempts consumed before giving up
        attempts: u32,
    },

    /// A visibility, text, or URL expectation was not met
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// The driving engine rejected an action
    #[error("Action failed: {message}")]
    ActionFailed {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// In-page script evaluation error
    #[error("Evaluation failed: {message}")]
    Evaluation {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    Launch {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BuscarError {
    /// Shorthand for an [`ActionFailed`](Self::ActionFailed) error.
    pub fn action(message: impl Into<String>) -> Self {
        Self::ActionFailed {
            message: message.into(),
        }
    }

    /// Shorthand for an [`AssertionFailed`](Self::AssertionFailed) error.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// True for errors that mark a node (or one of its ancestors) as
    /// unresolvable; these are terminal for the operation that observed them.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    mod display_tests {
        use super::*;

        #[test]
        fn not_found_names_node_locator_and_attempts() {
            let err = BuscarError::NotFound {
                node: "login.submit".to_string(),
                locator: "testid=submit".to_string(),
                attempts: 20,
            };
            let msg = err.to_string();
            assert!(msg.contains("login.submit"));
            assert!(msg.contains("testid=submit"));
            assert!(msg.contains("20 attempts"));
        }

        #[test]
        fn assertion_failed_message() {
            let err = BuscarError::assertion("expected visible");
            assert_eq!(err.to_string(), "Assertion failed: expected visible");
        }

        #[test]
        fn action_failed_message() {
            let err = BuscarError::action("click rejected");
            assert_eq!(err.to_string(), "Action failed: click rejected");
        }

        #[test]
        fn navigation_includes_url() {
            let err = BuscarError::Navigation {
                url: "https://example.com".to_string(),
                message: "timeout".to_string(),
            };
            assert!(err.to_string().contains("https://example.com"));
        }
    }

    mod conversion_tests {
        use super::*;

        #[test]
        fn io_error_converts() {
            let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
            let err: BuscarError = io.into();
            assert!(matches!(err, BuscarError::Io(_)));
        }

        #[test]
        fn json_error_converts() {
            let json = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
            let err: BuscarError = json.into();
            assert!(matches!(err, BuscarError::Json(_)));
        }

        #[test]
        fn is_not_found_discriminates() {
            let nf = BuscarError::NotFound {
                node: "a".to_string(),
                locator: "css=a".to_string(),
                attempts: 1,
            };
            assert!(nf.is_not_found());
            assert!(!BuscarError::assertion("x").is_not_found());
        }
    }
}
