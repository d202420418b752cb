//! Locator model: how a declared node finds live elements.
//!
//! A node carries exactly one active locator. When a builder is given several,
//! precedence applies: test-id supersedes CSS, which supersedes a path
//! expression. A node with no locator at all falls back to the self path `.`,
//! which makes it an alias for its own search context.
//!
//! # Example
//!
//! ```
//! use buscar::Locator;
//!
//! let locator = Locator::from_parts(
//!     Some("submit".to_string()),
//!     Some("button.primary".to_string()),
//!     None,
//! );
//! assert_eq!(locator, Locator::TestId("submit".to_string()));
//! assert_eq!(locator.expression(), "[data-testid=\"submit\"]");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default path expression: the node's own search context.
pub const SELF_PATH: &str = ".";

/// Attribute queried by test-id locators.
pub const TEST_ID_ATTRIBUTE: &str = "data-testid";

/// Selector mechanism used to find live elements for a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locator {
    /// Lookup by `data-testid` attribute value
    TestId(String),
    /// CSS selector
    Css(String),
    /// XPath expression, evaluated relative to the search context
    XPath(String),
}

impl Locator {
    /// Locator for a `data-testid` attribute value.
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// CSS selector locator.
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// XPath locator, relative to the search context.
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// Build from an optional triple, applying precedence: test-id first,
    /// then CSS, then path expression. With nothing configured this falls
    /// back to the self path `.`, so it never fails.
    #[must_use]
    pub fn from_parts(
        test_id: Option<String>,
        css: Option<String>,
        xpath: Option<String>,
    ) -> Self {
        if let Some(id) = test_id {
            Self::TestId(id)
        } else if let Some(selector) = css {
            Self::Css(selector)
        } else if let Some(expression) = xpath {
            Self::XPath(expression)
        } else {
            Self::XPath(SELF_PATH.to_string())
        }
    }

    /// Expression handed to the driving engine. Test-ids compile to an
    /// attribute selector for the structural query capability.
    #[must_use]
    pub fn expression(&self) -> String {
        match self {
            Self::TestId(id) => format!("[{TEST_ID_ATTRIBUTE}=\"{id}\"]"),
            Self::Css(selector) => selector.clone(),
            Self::XPath(expression) => expression.clone(),
        }
    }

    /// True when the expression must run through the path-query capability
    /// rather than the structural one.
    #[must_use]
    pub const fn is_path(&self) -> bool {
        matches!(self, Self::XPath(_))
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::XPath(SELF_PATH.to_string())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TestId(id) => write!(f, "testid={id}"),
            Self::Css(selector) => write!(f, "css={selector}"),
            Self::XPath(expression) => write!(f, "xpath={expression}"),
        }
    }
}

/// Element bounding box in page coordinates.
///
/// A query-time snapshot of this box doubles as a rendering-presence probe:
/// elements without one are not laid out at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X coordinate of the top-left corner
    pub x: f64,
    /// Y coordinate of the top-left corner
    pub y: f64,
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point of the box, where clicks and hovers land.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether a point falls inside the box.
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    mod precedence_tests {
        use super::*;

        #[test]
        fn test_id_supersedes_css_and_xpath() {
            let locator = Locator::from_parts(
                Some("submit".to_string()),
                Some("button".to_string()),
                Some("//button".to_string()),
            );
            assert_eq!(locator, Locator::TestId("submit".to_string()));
        }

        #[test]
        fn css_supersedes_xpath() {
            let locator =
                Locator::from_parts(None, Some("button".to_string()), Some("//button".to_string()));
            assert_eq!(locator, Locator::Css("button".to_string()));
        }

        #[test]
        fn xpath_used_when_alone() {
            let locator = Locator::from_parts(None, None, Some("//button".to_string()));
            assert_eq!(locator, Locator::XPath("//button".to_string()));
        }

        #[test]
        fn empty_configuration_falls_back_to_self_path() {
            let locator = Locator::from_parts(None, None, None);
            assert_eq!(locator, Locator::XPath(SELF_PATH.to_string()));
            assert_eq!(locator, Locator::default());
        }
    }

    mod expression_tests {
        use super::*;

        #[test]
        fn test_id_compiles_to_attribute_selector() {
            let locator = Locator::test_id("username");
            assert_eq!(locator.expression(), "[data-testid=\"username\"]");
            assert!(!locator.is_path());
        }

        #[test]
        fn css_expression_is_verbatim() {
            let locator = Locator::css("form#login input");
            assert_eq!(locator.expression(), "form#login input");
            assert!(!locator.is_path());
        }

        #[test]
        fn xpath_expression_is_verbatim_and_path() {
            let locator = Locator::xpath(".//div[@role='row']");
            assert_eq!(locator.expression(), ".//div[@role='row']");
            assert!(locator.is_path());
        }

        #[test]
        fn display_tags_the_kind() {
            assert_eq!(Locator::test_id("a").to_string(), "testid=a");
            assert_eq!(Locator::css("b").to_string(), "css=b");
            assert_eq!(Locator::xpath("c").to_string(), "xpath=c");
        }
    }

    mod bounding_box_tests {
        use super::*;

        #[test]
        fn center_is_midpoint() {
            let bb = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
            assert_eq!(bb.center(), (60.0, 45.0));
        }

        #[test]
        fn contains_checks_bounds() {
            let bb = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
            assert!(bb.contains(5.0, 5.0));
            assert!(bb.contains(0.0, 0.0));
            assert!(bb.contains(10.0, 10.0));
            assert!(!bb.contains(11.0, 5.0));
            assert!(!bb.contains(5.0, -1.0));
        }

        #[test]
        fn serializes_roundtrip() {
            let bb = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
            let json = serde_json::to_string(&bb).unwrap();
            let back: BoundingBox = serde_json::from_str(&json).unwrap();
            assert_eq!(bb, back);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn precedence_never_picks_css_when_test_id_present(
                id in "[a-z]{1,12}",
                css in proptest::option::of("[a-z]{1,12}"),
                xpath in proptest::option::of("[a-z]{1,12}"),
            ) {
                let locator = Locator::from_parts(Some(id.clone()), css, xpath);
                prop_assert_eq!(locator, Locator::TestId(id));
            }

            #[test]
            fn from_parts_is_total(
                id in proptest::option::of("[a-z]{0,8}"),
                css in proptest::option::of("[a-z]{0,8}"),
                xpath in proptest::option::of("[a-z]{0,8}"),
            ) {
                // Always yields exactly one active locator kind.
                let locator = Locator::from_parts(id, css, xpath);
                let tagged = locator.to_string();
                prop_assert!(
                    tagged.starts_with("testid=")
                        || tagged.starts_with("css=")
                        || tagged.starts_with("xpath=")
                );
            }
        }
    }
}
