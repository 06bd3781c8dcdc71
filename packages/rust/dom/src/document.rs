//! Mutable HTML document over `scraper`'s `ego_tree` arena.
//!
//! `scraper` is a read-only query API; stitching needs to move subtrees
//! between documents, rewrite attributes and splice parsed fragments. Every
//! query here walks from the `<html>` element, so nodes detached from the
//! tree (which stay in the arena) are never returned.

use ego_tree::{NodeId, NodeRef, Tree};
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node, Selector, StrTendril};
use tracing::trace;

use pagestitch_shared::{Result, StitchError};

use crate::events::{ClickHandler, ClickOutcome, Listener, Scroll, ScrollBehavior};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// A parsed HTML document that can be edited in place.
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
    listeners: Vec<Listener>,
}

impl Document {
    /// Parse a complete HTML document. Parsing never fails; malformed input
    /// is repaired the way browsers repair it.
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
            listeners: Vec::new(),
        }
    }

    /// Serialize the document.
    pub fn to_html(&self) -> String {
        self.html.html()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    fn document_element(&self) -> Option<ElementRef<'_>> {
        self.html.tree.root().children().find_map(ElementRef::wrap)
    }

    /// First connected element matching `selector`, in document order.
    pub fn select_first(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.select_all(selector)?.into_iter().next())
    }

    /// All connected elements matching `selector`, in document order.
    pub fn select_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let sel = parse_selector(selector)?;
        let Some(root) = self.document_element() else {
            return Ok(Vec::new());
        };

        let mut ids = Vec::new();
        if sel.matches(&root) {
            ids.push(root.id());
        }
        ids.extend(root.select(&sel).map(|el| el.id()));
        Ok(ids)
    }

    /// The `<head>` element. The HTML parser always creates one.
    pub fn head(&self) -> Result<NodeId> {
        self.select_first("head")?
            .ok_or_else(|| StitchError::parse("document has no <head>"))
    }

    /// The `<body>` element. The HTML parser always creates one.
    pub fn body(&self) -> Result<NodeId> {
        self.select_first("body")?
            .ok_or_else(|| StitchError::parse("document has no <body>"))
    }

    /// Connected element whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        let root = self.document_element()?;
        root.descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().id() == Some(id))
            .map(|el| el.id())
    }

    /// Connected elements carrying `class`, in document order.
    ///
    /// Class names come from configuration, so they are matched directly
    /// instead of being spliced into a selector string.
    pub fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        let Some(root) = self.document_element() else {
            return Vec::new();
        };
        root.descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().classes().any(|c| c == class))
            .map(|el| el.id())
            .collect()
    }

    /// Text of every connected `<script>` without a `src`, in document order.
    pub fn inline_scripts(&self) -> Vec<String> {
        let Ok(scripts) = self.select_all("script:not([src])") else {
            return Vec::new();
        };
        scripts.into_iter().map(|id| self.text(id)).collect()
    }

    /// Whether `node` is reachable from the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let root = self.html.tree.root().id();
        match self.html.tree.get(node) {
            Some(n) => n.id() == root || n.ancestors().any(|a| a.id() == root),
            None => false,
        }
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        self.html.tree.get(node)?.value().as_element()
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(Element::name)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attr(name)
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|el| el.classes().any(|c| c == class))
    }

    /// Element children of `node`, in order.
    pub fn child_elements(&self, node: NodeId) -> Vec<NodeId> {
        self.html
            .tree
            .get(node)
            .map(|n| n.children().filter(|c| c.value().is_element()).map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.html.tree.get(node)?.parent().map(|p| p.id())
    }

    /// Serialized children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        self.html
            .tree
            .get(node)
            .and_then(ElementRef::wrap)
            .map(|el| el.inner_html())
            .unwrap_or_default()
    }

    /// Concatenated text content of `node`.
    pub fn text(&self, node: NodeId) -> String {
        self.html
            .tree
            .get(node)
            .and_then(ElementRef::wrap)
            .map(|el| el.text().collect())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Set (or add) an attribute. Returns `false` if `node` is not an element.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        let Some(mut node_mut) = self.html.tree.get_mut(node) else {
            return false;
        };
        let Node::Element(element) = node_mut.value() else {
            return false;
        };

        // Rebuild rather than patch in place: `Element` caches its id and
        // class list on first access.
        let mut attrs: Vec<Attribute> = element
            .attrs
            .iter()
            .filter(|(qual, _)| qual.local.as_ref() != name)
            .map(|(qual, val)| Attribute {
                name: qual.clone(),
                value: val.clone(),
            })
            .collect();
        attrs.push(Attribute {
            name: attr_name(name),
            value: StrTendril::from_slice(value),
        });
        *element = Element::new(element.name.clone(), attrs);
        true
    }

    /// Create a detached element. It becomes visible once appended or inserted.
    pub fn create_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: attr_name(name),
                value: StrTendril::from_slice(value),
            })
            .collect();
        let element = Element::new(element_name(tag), attrs);
        self.html.tree.orphan(Node::Element(element)).id()
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertion(parent, child)?;
        let mut parent_mut = self
            .html
            .tree
            .get_mut(parent)
            .ok_or_else(|| StitchError::validation("append target does not exist"))?;
        parent_mut.append_id(child);
        Ok(())
    }

    /// Move `new_node` so it becomes the previous sibling of `reference`.
    pub fn insert_before(&mut self, reference: NodeId, new_node: NodeId) -> Result<()> {
        let parent = self
            .parent(reference)
            .ok_or_else(|| StitchError::validation("insertion reference has no parent"))?;
        self.check_insertion(parent, new_node)?;
        if reference == new_node {
            return Ok(());
        }
        let mut reference_mut = self
            .html
            .tree
            .get_mut(reference)
            .ok_or_else(|| StitchError::validation("insertion reference does not exist"))?;
        reference_mut.insert_id_before(new_node);
        Ok(())
    }

    /// Detach `node` (and its subtree) from the document.
    pub fn remove(&mut self, node: NodeId) {
        if let Some(mut node_mut) = self.html.tree.get_mut(node) {
            node_mut.detach();
        }
        self.listeners.retain(|l| l.node != node);
    }

    /// Detach every child of `node`.
    pub fn clear_children(&mut self, node: NodeId) {
        let children: Vec<NodeId> = match self.html.tree.get(node) {
            Some(n) => n.children().map(|c| c.id()).collect(),
            None => return,
        };
        for child in children {
            self.remove(child);
        }
    }

    /// Replace the children of `node` with `text` as a single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.clear_children(node);
        if let Some(mut node_mut) = self.html.tree.get_mut(node) {
            node_mut.append(Node::Text(Text {
                text: StrTendril::from_slice(text),
            }));
        }
    }

    /// Replace the children of `node` with `markup` parsed as an HTML fragment.
    ///
    /// The markup is trusted and inserted as-is.
    pub fn set_inner_html(&mut self, node: NodeId, markup: &str) -> Result<()> {
        if self.element(node).is_none() {
            return Err(StitchError::validation("inner HTML target is not an element"));
        }
        self.clear_children(node);

        let fragment = Html::parse_fragment(markup);
        let fragment_root = fragment.tree.root();
        // html5ever wraps fragment content in a synthetic <html> element.
        let container = fragment_root
            .children()
            .find(|c| c.value().as_element().is_some_and(|e| e.name() == "html"))
            .unwrap_or(fragment_root);

        for child in container.children() {
            let imported = self.html.tree.extend_tree(clone_subtree(child)).id();
            self.append_child(node, imported)?;
        }
        Ok(())
    }

    /// Move `node` out of `source` into this document as a detached subtree.
    ///
    /// Returns the id of the new root in this document, or `None` if `node`
    /// is not connected in `source`.
    pub fn adopt(&mut self, source: &mut Document, node: NodeId) -> Option<NodeId> {
        self.adopt_all(source, &[node]).pop().flatten()
    }

    /// Move several subtrees out of `source` at once.
    ///
    /// Every connected node is detached before any is copied, so a node
    /// nested inside another one in the batch moves on its own and is owned
    /// by exactly one document afterwards. Entries for nodes that are not
    /// connected in `source` are `None`.
    pub fn adopt_all(&mut self, source: &mut Document, nodes: &[NodeId]) -> Vec<Option<NodeId>> {
        let connected: Vec<bool> = nodes.iter().map(|&n| source.is_connected(n)).collect();
        for (&node, &ok) in nodes.iter().zip(&connected) {
            if ok {
                source.remove(node);
            }
        }

        nodes
            .iter()
            .zip(connected)
            .map(|(&node, ok)| {
                if !ok {
                    trace!(?node, "skipped disconnected node");
                    return None;
                }
                let subtree = clone_subtree(source.html.tree.get(node)?);
                let id = self.html.tree.extend_tree(subtree).id();
                trace!(?id, "adopted subtree");
                Some(id)
            })
            .collect()
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_ref = self
            .html
            .tree
            .get(parent)
            .ok_or_else(|| StitchError::validation("insertion parent does not exist"))?;
        if self.html.tree.get(child).is_none() {
            return Err(StitchError::validation("inserted node does not exist"));
        }
        if parent == child || parent_ref.ancestors().any(|a| a.id() == child) {
            return Err(StitchError::validation("cannot insert a node into its own subtree"));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Register a click handler on `node`. Handlers run in registration order.
    pub fn add_click_listener(&mut self, node: NodeId, handler: ClickHandler) {
        self.listeners.push(Listener { node, handler });
    }

    /// Number of click handlers registered on `node`.
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners.iter().filter(|l| l.node == node).count()
    }

    /// Dispatch a click on `node` to its handlers.
    pub fn click(&self, node: NodeId) -> ClickOutcome {
        let mut outcome = ClickOutcome::default();
        for listener in self.listeners.iter().filter(|l| l.node == node) {
            match listener.handler {
                ClickHandler::SmoothScroll => {
                    outcome.default_prevented = true;
                    let fragment = self
                        .attr(node, "href")
                        .and_then(|href| href.get(1..))
                        .unwrap_or_default();
                    if let Some(target) = self.element_by_id(fragment) {
                        outcome.scroll = Some(Scroll {
                            target,
                            behavior: ScrollBehavior::Smooth,
                        });
                    }
                }
            }
        }
        outcome
    }
}

/// Deep-copy the subtree rooted at `node` into a fresh tree.
fn clone_subtree(node: NodeRef<'_, Node>) -> Tree<Node> {
    let mut tree = Tree::new(node.value().clone());
    let root = tree.root().id();
    copy_children(node, &mut tree, root);
    tree
}

fn copy_children(source: NodeRef<'_, Node>, dest: &mut Tree<Node>, parent: NodeId) {
    for child in source.children() {
        let Some(mut parent_mut) = dest.get_mut(parent) else {
            return;
        };
        let id = parent_mut.append(child.value().clone()).id();
        copy_children(child, dest, id);
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| StitchError::parse(format!("invalid selector '{selector}': {e}")))
}

fn element_name(tag: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag))
}

fn attr_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}
