//! # PageLock DOM
//!
//! A small, single-threaded model of a page's script context: the window and
//! document event targets, an element tree, inline styles, and DOM Events
//! dispatch with capture/bubble phases.
//!
//! The tab agent runs against this model so its blocking behavior can be
//! exercised without a real browser.

pub mod document;
pub mod events;

pub use document::Document;
pub use events::{
    AddEventListenerOptions, Event, EventDispatcher, EventId, EventListenerCallback, EventPhase,
    EventTarget, ListenerId, TargetId,
};

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};
use thiserror::Error;

/// Errors that can occur in DOM operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomError {
    #[error("Node not found")]
    NodeNotFound,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Unique identifier for a DOM node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Create a new NodeId.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> usize {
        self.0
    }
}

/// An element node.
#[derive(Debug)]
pub struct Node {
    /// Unique ID for this node.
    pub id: NodeId,
    tag_name: String,
    attributes: RefCell<HashMap<String, String>>,
    /// Inline style declarations, kebab-case property names.
    style: RefCell<BTreeMap<String, String>>,
    parent: RefCell<Option<Weak<Node>>>,
    children: RefCell<Vec<Rc<Node>>>,
    /// Event target mixin for event handling.
    pub event_target: EventTarget,
}

impl Node {
    pub(crate) fn new(id: NodeId, tag_name: &str) -> Rc<Self> {
        Rc::new(Self {
            id,
            tag_name: tag_name.to_ascii_lowercase(),
            attributes: RefCell::new(HashMap::new()),
            style: RefCell::new(BTreeMap::new()),
            parent: RefCell::new(None),
            children: RefCell::new(Vec::new()),
            event_target: EventTarget::new(),
        })
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    /// The element's `id` attribute.
    pub fn element_id(&self) -> Option<String> {
        self.get_attribute("id")
    }

    /// Read one inline style property.
    pub fn style(&self, property: &str) -> Option<String> {
        self.style.borrow().get(property).cloned()
    }

    /// Set one inline style property.
    pub fn set_style(&self, property: &str, value: &str) {
        self.style
            .borrow_mut()
            .insert(property.to_string(), value.to_string());
    }

    /// Get parent node.
    pub fn parent(&self) -> Option<Rc<Node>> {
        self.parent.borrow().as_ref().and_then(|w| w.upgrade())
    }

    /// Get child nodes.
    pub fn children(&self) -> Vec<Rc<Node>> {
        self.children.borrow().clone()
    }

    /// Whether the node is currently attached under a parent.
    pub fn is_connected(&self) -> bool {
        self.parent().is_some()
    }

    /// Append a child node, detaching it from any previous parent first.
    pub fn append_child(self: &Rc<Self>, child: Rc<Node>) {
        child.remove();
        *child.parent.borrow_mut() = Some(Rc::downgrade(self));
        self.children.borrow_mut().push(child);
    }

    /// Detach this node from its parent. No-op when already detached.
    pub fn remove(&self) {
        if let Some(parent) = self.parent() {
            parent.children.borrow_mut().retain(|c| c.id != self.id);
        }
        *self.parent.borrow_mut() = None;
    }

    /// Depth-first search of this node's subtree, including itself.
    pub fn find<F>(self: &Rc<Self>, predicate: &F) -> Option<Rc<Node>>
    where
        F: Fn(&Node) -> bool,
    {
        if predicate(self) {
            return Some(self.clone());
        }
        self.children
            .borrow()
            .iter()
            .find_map(|child| child.find(predicate))
    }

    /// Ancestors ordered from the outermost down to the direct parent.
    pub fn ancestors(&self) -> Vec<Rc<Node>> {
        let mut chain = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            chain.push(node);
        }
        chain.reverse();
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_remove() {
        let parent = Node::new(NodeId::new(1), "DIV");
        let child = Node::new(NodeId::new(2), "span");
        assert_eq!(parent.tag_name(), "div");

        parent.append_child(child.clone());
        assert!(child.is_connected());
        assert_eq!(parent.children().len(), 1);

        child.remove();
        assert!(!child.is_connected());
        assert!(parent.children().is_empty());

        // Removing twice is fine
        child.remove();
    }

    #[test]
    fn test_reparenting_detaches() {
        let a = Node::new(NodeId::new(1), "div");
        let b = Node::new(NodeId::new(2), "div");
        let child = Node::new(NodeId::new(3), "p");

        a.append_child(child.clone());
        b.append_child(child.clone());
        assert!(a.children().is_empty());
        assert_eq!(b.children().len(), 1);
    }

    #[test]
    fn test_ancestors_order() {
        let root = Node::new(NodeId::new(1), "html");
        let body = Node::new(NodeId::new(2), "body");
        let leaf = Node::new(NodeId::new(3), "button");
        root.append_child(body.clone());
        body.append_child(leaf.clone());

        let chain: Vec<NodeId> = leaf.ancestors().iter().map(|n| n.id).collect();
        assert_eq!(chain, vec![root.id, body.id]);
    }

    #[test]
    fn test_style_and_attributes() {
        let node = Node::new(NodeId::new(1), "div");
        node.set_attribute("id", "x");
        node.set_style("z-index", "5");
        assert_eq!(node.element_id().as_deref(), Some("x"));
        assert_eq!(node.style("z-index").as_deref(), Some("5"));
        assert_eq!(node.style("position"), None);
    }
}
