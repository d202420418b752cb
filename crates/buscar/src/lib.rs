//! Buscar: Resilient Element Resolution for Browser Test Automation
//!
//! Buscar (Spanish: "to search/look for") keeps end-to-end UI tests stable
//! against slow renders, animations, and late DOM mutations. Page objects
//! declare a tree of named nodes up front, before any content exists, and
//! every interaction re-finds its element at use time, retrying on a fixed
//! backoff until the page catches up or the attempt budget runs out.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       BUSCAR Architecture                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐     ┌─────────────┐     ┌────────────────┐      │
//! │   │ Page       │     │ Resolver    │     │ BuscarDriver   │      │
//! │   │ objects    │────►│ (retry +    │────►│ (CDP browser   │      │
//! │   │ (Node tree)│     │  contexts)  │     │  or mock)      │      │
//! │   └────────────┘     └─────────────┘     └────────────────┘      │
//! │         │                   │                                    │
//! │         ▼                   ▼                                    │
//! │   ┌────────────┐     ┌─────────────┐                             │
//! │   │ Actions /  │     │ Diagnostics │                             │
//! │   │ assertions │     │ (log, png)  │                             │
//! │   └────────────┘     └─────────────┘                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use buscar::{MockDriver, MockElement, Page};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> buscar::BuscarResult<()> {
//! let driver = Arc::new(MockDriver::new());
//! driver.add_element(MockElement::new("submit-el", "button"));
//! driver.bind("[data-testid=\"submit\"]", &["submit-el"]);
//!
//! // Nodes are declared before the content exists; resolution happens on use.
//! let page = Page::new(driver.clone());
//! let submit = page.child("submit").with_test_id("submit").build();
//!
//! submit.click().await?;
//! assert!(driver.was_called("click submit-el"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod actions;
mod assertions;
#[cfg(feature = "browser")]
mod cdp;
mod diagnostics;
mod dialog;
mod driver;
mod locator;
mod node;
mod page;
mod resolver;
mod result;

pub use actions::TypeOptions;
#[cfg(feature = "browser")]
pub use cdp::{CdpConfig, CdpDriver};
pub use diagnostics::{
    init_json_tracing, init_tracing, Diagnostics, OperationRecord, SessionLog,
};
pub use dialog::{Dialog, DialogAction, DialogCallback, DialogKind, DialogRouter};
pub use driver::{
    BuscarDriver, ElementHandle, MockDriver, MockElement, ReadyCondition, SearchContext,
};
pub use locator::{BoundingBox, Locator, SELF_PATH, TEST_ID_ATTRIBUTE};
pub use node::{Node, NodeBuilder, NodeKind, Resolution};
pub use page::{
    Page, PageConfig, DEFAULT_ATTEMPTS, DEFAULT_BACKOFF, DEFAULT_NAVIGATION_TIMEOUT,
    DEFAULT_SETTLE, DEFAULT_TYPE_DELAY,
};
pub use resolver::{resolve, resolve_all, resolve_with, ScreenshotPolicy};
pub use result::{BuscarError, BuscarResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::actions::*;
    #[cfg(feature = "browser")]
    pub use super::cdp::*;
    pub use super::diagnostics::*;
    pub use super::dialog::*;
    pub use super::driver::*;
    pub use super::locator::*;
    pub use super::node::*;
    pub use super::page::*;
    pub use super::resolver::*;
    pub use super::result::*;
}
