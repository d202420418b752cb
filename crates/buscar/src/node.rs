//! Declarative page-object tree.
//!
//! A [`Node`] is a named point in the element tree declared before the
//! underlying document exists: a locator, two context flags, and a parent
//! link set once at construction. Nothing here touches the live page; binding
//! a node to live elements is the resolver's job, and the only resolution
//! state a node carries is its mutable selected-index and the cached result
//! of the last resolution.

use crate::diagnostics::Diagnostics;
use crate::driver::{BuscarDriver, ElementHandle};
use crate::locator::Locator;
use crate::page::PageConfig;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Discriminates the tree root from declared elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The page itself; carries no locator and never appears in qualified
    /// names
    Root,
    /// A declared element with a locator
    Element,
}

/// Live result of one resolution: the element at the selected index plus the
/// full filtered match list it was chosen from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    selected: ElementHandle,
    all: Vec<ElementHandle>,
}

impl Resolution {
    /// Pair a selected element with the match list it came from.
    #[must_use]
    pub fn new(selected: ElementHandle, all: Vec<ElementHandle>) -> Self {
        Self { selected, all }
    }

    /// The element at the selected index.
    #[must_use]
    pub const fn selected(&self) -> &ElementHandle {
        &self.selected
    }

    /// Every rendered match from the query, in document order.
    #[must_use]
    pub fn all(&self) -> &[ElementHandle] {
        &self.all
    }

    /// Number of rendered matches.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.all.len()
    }
}

struct NodeInner {
    kind: NodeKind,
    name: String,
    locator: Locator,
    embedded_context: bool,
    detached: bool,
    parent: Option<Node>,
    driver: Arc<dyn BuscarDriver>,
    config: PageConfig,
    diagnostics: Diagnostics,
    selected: Mutex<usize>,
    cache: Mutex<Option<Resolution>>,
}

/// A named node in the page-object tree.
///
/// Cloning is cheap and shares state: clones see each other's selected-index
/// and cached resolution, so a tree handed out to test code behaves as one
/// tree. Parent links are fixed at construction, which keeps the structure a
/// tree and makes qualified-name derivation cycle-free.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Tree root standing for the page itself.
    #[must_use]
    pub fn root(
        driver: Arc<dyn BuscarDriver>,
        config: PageConfig,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                kind: NodeKind::Root,
                name: String::new(),
                locator: Locator::default(),
                embedded_context: false,
                detached: false,
                parent: None,
                driver,
                config,
                diagnostics,
                selected: Mutex::new(0),
                cache: Mutex::new(None),
            }),
        }
    }

    /// Start declaring a child of this node.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> NodeBuilder {
        NodeBuilder::new(self.clone(), name.into())
    }

    /// Node kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.inner.kind
    }

    /// Whether this is the tree root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.inner.kind == NodeKind::Root
    }

    /// Declared sibling-unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The node's locator.
    #[must_use]
    pub fn locator(&self) -> &Locator {
        &self.inner.locator
    }

    /// Whether children of this node are searched inside its embedded
    /// document.
    #[must_use]
    pub fn uses_embedded_context(&self) -> bool {
        self.inner.embedded_context
    }

    /// Whether this node searches from the document root instead of its
    /// parent's live element.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.inner.detached
    }

    /// Parent node; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<&Node> {
        self.inner.parent.as_ref()
    }

    /// Driving engine shared by the whole tree.
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn BuscarDriver> {
        &self.inner.driver
    }

    /// Resolution settings shared by the whole tree.
    #[must_use]
    pub fn config(&self) -> &PageConfig {
        &self.inner.config
    }

    /// Diagnostic sink shared by the whole tree.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    /// Dot-joined chain of names from below the root down to this node.
    ///
    /// The root contributes nothing; its own qualified name is empty.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        let mut names = Vec::new();
        let mut current = Some(self);
        while let Some(node) = current {
            if node.inner.kind != NodeKind::Root {
                names.push(node.inner.name.as_str());
            }
            current = node.parent();
        }
        names.reverse();
        names.join(".")
    }

    /// Label used in operation log lines; the root logs as `page`.
    pub(crate) fn op_label(&self) -> String {
        if self.is_root() {
            "page".to_string()
        } else {
            self.qualified_name()
        }
    }

    /// Currently selected match index.
    #[must_use]
    pub fn selected_index(&self) -> usize {
        self.inner.selected.lock().map(|index| *index).unwrap_or(0)
    }

    /// Point later resolutions at the match with this index.
    ///
    /// Out-of-range indexes are kept as-is; resolution clamps its selection
    /// to index 0 per call without rewriting this value.
    pub fn select_match(&self, index: usize) {
        if let Ok(mut selected) = self.inner.selected.lock() {
            *selected = index;
        }
    }

    /// Result of the last resolution, if any.
    #[must_use]
    pub fn cached_resolution(&self) -> Option<Resolution> {
        self.inner
            .cache
            .lock()
            .map(|cache| cache.clone())
            .unwrap_or_default()
    }

    /// Selected element from the last resolution, if any.
    #[must_use]
    pub fn selected_match(&self) -> Option<ElementHandle> {
        self.cached_resolution()
            .map(|resolution| resolution.selected().clone())
    }

    pub(crate) fn store_resolution(&self, resolution: Resolution) {
        if let Ok(mut cache) = self.inner.cache.lock() {
            *cache = Some(resolution);
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.qualified_name())
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.inner.kind)
            .field("name", &self.inner.name)
            .field("locator", &self.inner.locator)
            .field("embedded_context", &self.inner.embedded_context)
            .field("detached", &self.inner.detached)
            .field("selected", &self.selected_index())
            .finish()
    }
}

/// Builder for declaring a child node.
///
/// Locator parts may be given in any combination; precedence and the
/// self-path fallback are applied at build time, so a builder can never fail.
#[derive(Debug)]
pub struct NodeBuilder {
    parent: Node,
    name: String,
    test_id: Option<String>,
    css: Option<String>,
    xpath: Option<String>,
    embedded_context: bool,
    detached: bool,
}

impl NodeBuilder {
    fn new(parent: Node, name: String) -> Self {
        Self {
            parent,
            name,
            test_id: None,
            css: None,
            xpath: None,
            embedded_context: false,
            detached: false,
        }
    }

    /// Locate by test-id attribute.
    #[must_use]
    pub fn with_test_id(mut self, test_id: impl Into<String>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }

    /// Locate by CSS selector.
    #[must_use]
    pub fn with_css(mut self, selector: impl Into<String>) -> Self {
        self.css = Some(selector.into());
        self
    }

    /// Locate by path expression, relative paths resolving from the search
    /// context.
    #[must_use]
    pub fn with_xpath(mut self, expression: impl Into<String>) -> Self {
        self.xpath = Some(expression.into());
        self
    }

    /// Mark that children of this node live inside its embedded document.
    #[must_use]
    pub const fn with_embedded_context(mut self) -> Self {
        self.embedded_context = true;
        self
    }

    /// Search from the document root rather than the parent's live element.
    #[must_use]
    pub const fn with_detach(mut self) -> Self {
        self.detached = true;
        self
    }

    /// Construct the node and attach it under its parent.
    #[must_use]
    pub fn build(self) -> Node {
        let locator = Locator::from_parts(self.test_id, self.css, self.xpath);
        let parent_inner = &self.parent.inner;
        Node {
            inner: Arc::new(NodeInner {
                kind: NodeKind::Element,
                name: self.name,
                locator,
                embedded_context: self.embedded_context,
                detached: self.detached,
                driver: Arc::clone(&parent_inner.driver),
                config: parent_inner.config.clone(),
                diagnostics: parent_inner.diagnostics.clone(),
                parent: Some(self.parent),
                selected: Mutex::new(0),
                cache: Mutex::new(None),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::driver::MockDriver;
    use crate::locator::SELF_PATH;

    fn test_root() -> Node {
        Node::root(
            Arc::new(MockDriver::new()),
            PageConfig::default(),
            Diagnostics::disabled(),
        )
    }

    mod construction_tests {
        use super::*;

        #[test]
        fn root_has_root_kind_and_empty_qualified_name() {
            let root = test_root();
            assert_eq!(root.kind(), NodeKind::Root);
            assert!(root.is_root());
            assert_eq!(root.qualified_name(), "");
            assert!(root.parent().is_none());
        }

        #[test]
        fn child_without_locator_falls_back_to_self_path() {
            let node = test_root().child("wrapper").build();
            assert_eq!(node.locator(), &Locator::xpath(SELF_PATH));
        }

        #[test]
        fn test_id_supersedes_css_and_xpath() {
            let node = test_root()
                .child("submit")
                .with_xpath("//button")
                .with_css("button[type=submit]")
                .with_test_id("submit")
                .build();
            assert_eq!(node.locator(), &Locator::test_id("submit"));
        }

        #[test]
        fn context_flags_default_off() {
            let node = test_root().child("plain").build();
            assert!(!node.uses_embedded_context());
            assert!(!node.is_detached());

            let flagged = test_root()
                .child("frame")
                .with_embedded_context()
                .with_detach()
                .build();
            assert!(flagged.uses_embedded_context());
            assert!(flagged.is_detached());
        }

        #[test]
        fn children_share_driver_and_config() {
            let root = test_root();
            let child = root.child("a").build();
            let grandchild = child.child("b").build();
            assert!(Arc::ptr_eq(root.driver(), grandchild.driver()));
            assert_eq!(root.config().attempts(), grandchild.config().attempts());
        }
    }

    mod qualified_name_tests {
        use super::*;

        #[test]
        fn chain_excludes_root_and_joins_with_dots() {
            let root = test_root();
            let login = root.child("login").with_css("#login").build();
            let form = login.child("form").with_css("form").build();
            let submit = form.child("submit").with_test_id("submit").build();

            assert_eq!(login.qualified_name(), "login");
            assert_eq!(form.qualified_name(), "login.form");
            assert_eq!(submit.qualified_name(), "login.form.submit");
        }

        #[test]
        fn display_uses_qualified_name() {
            let root = test_root();
            let node = root.child("nav").build().child("menu").build();
            assert_eq!(node.to_string(), "nav.menu");
            assert_eq!(root.to_string(), "<root>");
        }
    }

    mod selection_tests {
        use super::*;

        #[test]
        fn selected_index_defaults_to_zero() {
            let node = test_root().child("rows").build();
            assert_eq!(node.selected_index(), 0);
        }

        #[test]
        fn select_match_mutates_stored_index() {
            let node = test_root().child("rows").build();
            node.select_match(3);
            assert_eq!(node.selected_index(), 3);
        }

        #[test]
        fn clones_share_selection_state() {
            let node = test_root().child("rows").build();
            let other = node.clone();
            node.select_match(2);
            assert_eq!(other.selected_index(), 2);
        }
    }

    mod cache_tests {
        use super::*;

        fn sample_resolution() -> Resolution {
            let first = ElementHandle::new("e1", "li");
            let second = ElementHandle::new("e2", "li");
            Resolution::new(first.clone(), vec![first, second])
        }

        #[test]
        fn cache_starts_empty() {
            let node = test_root().child("rows").build();
            assert!(node.cached_resolution().is_none());
            assert!(node.selected_match().is_none());
        }

        #[test]
        fn stored_resolution_is_readable() {
            let node = test_root().child("rows").build();
            node.store_resolution(sample_resolution());

            let cached = node.cached_resolution().unwrap();
            assert_eq!(cached.match_count(), 2);
            assert_eq!(node.selected_match().unwrap().id, "e1");
        }

        #[test]
        fn storing_replaces_previous_resolution() {
            let node = test_root().child("rows").build();
            node.store_resolution(sample_resolution());

            let only = ElementHandle::new("e9", "li");
            node.store_resolution(Resolution::new(only.clone(), vec![only]));
            assert_eq!(node.cached_resolution().unwrap().match_count(), 1);
            assert_eq!(node.selected_match().unwrap().id, "e9");
        }
    }
}
