//! Page document: window and document event targets plus the element tree

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::events::{Event, EventDispatcher, EventTarget, TargetId};
use crate::{DomError, Node, NodeId};

/// A page's document together with its window.
///
/// A freshly navigated page may not have a root element yet; see
/// [`Document::new`] and [`Document::with_body`].
pub struct Document {
    window: EventTarget,
    document: EventTarget,
    document_element: RefCell<Option<Rc<Node>>>,
    next_id: Cell<usize>,
}

impl Document {
    /// Create a document with no root element, as seen very early in a
    /// navigation.
    pub fn new() -> Self {
        Self {
            window: EventTarget::new(),
            document: EventTarget::new(),
            document_element: RefCell::new(None),
            next_id: Cell::new(1),
        }
    }

    /// Create a document with an `<html>` root holding an empty `<body>`.
    pub fn with_body() -> Self {
        let doc = Self::new();
        let html = doc.create_element("html");
        let body = doc.create_element("body");
        html.append_child(body);
        doc.set_document_element(html);
        doc
    }

    /// Create a detached element.
    pub fn create_element(&self, tag_name: &str) -> Rc<Node> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Node::new(NodeId::new(id), tag_name)
    }

    /// Install the root element.
    pub fn set_document_element(&self, root: Rc<Node>) {
        *self.document_element.borrow_mut() = Some(root);
    }

    /// The root element, if parsing has produced one.
    pub fn document_element(&self) -> Option<Rc<Node>> {
        self.document_element.borrow().clone()
    }

    /// The `<body>` element directly under the root.
    pub fn body(&self) -> Option<Rc<Node>> {
        self.document_element()?
            .children()
            .into_iter()
            .find(|n| n.tag_name() == "body")
    }

    /// Find an attached element by its `id` attribute.
    pub fn get_element_by_id(&self, id: &str) -> Option<Rc<Node>> {
        let root = self.document_element()?;
        root.find(&|n: &Node| n.element_id().as_deref() == Some(id))
    }

    /// Whether `node` is reachable from the root.
    pub fn contains(&self, node: &Node) -> bool {
        match self.document_element() {
            Some(root) => root.find(&|n: &Node| n.id == node.id).is_some(),
            None => false,
        }
    }

    /// The window-level event target.
    pub fn window_target(&self) -> &EventTarget {
        &self.window
    }

    /// The document-level event target.
    pub fn document_target(&self) -> &EventTarget {
        &self.document
    }

    /// Dispatch an event at an element. The propagation path is window,
    /// document, then the element's ancestors from the root down.
    /// Returns true if the default action was not prevented.
    pub fn dispatch(&self, event: &Event, target: &Rc<Node>) -> Result<bool, DomError> {
        if !self.contains(target) {
            return Err(DomError::NodeNotFound);
        }

        let ancestors = target.ancestors();
        let mut path: Vec<(TargetId, &EventTarget)> = Vec::with_capacity(ancestors.len() + 3);
        path.push((TargetId::Window, &self.window));
        path.push((TargetId::Document, &self.document));
        for node in &ancestors {
            path.push((TargetId::Node(node.id), &node.event_target));
        }
        path.push((TargetId::Node(target.id), &target.event_target));

        Ok(EventDispatcher::dispatch(event, &path))
    }

    /// Dispatch an event whose target is the document itself.
    pub fn dispatch_to_document(&self, event: &Event) -> bool {
        EventDispatcher::dispatch(
            event,
            &[
                (TargetId::Window, &self.window),
                (TargetId::Document, &self.document),
            ],
        )
    }

    /// Dispatch an event whose target is the window itself.
    pub fn dispatch_to_window(&self, event: &Event) -> bool {
        EventDispatcher::dispatch(event, &[(TargetId::Window, &self.window)])
    }

    /// Resolve which element a pointer aimed at `intended` actually hits.
    ///
    /// A fixed, full-viewport element that accepts pointer events and stacks
    /// above `intended` wins the hit test.
    pub fn hit_test(&self, intended: &Rc<Node>) -> Rc<Node> {
        let Some(root) = self.document_element() else {
            return intended.clone();
        };

        let mut covering: Vec<Rc<Node>> = Vec::new();
        collect(&root, &mut |node| {
            if covers_viewport(node) && node.id != intended.id {
                covering.push(node.clone());
            }
        });

        let intended_z = z_index(intended);
        covering
            .into_iter()
            .filter(|n| z_index(n) > intended_z)
            .max_by_key(|n| z_index(n))
            .unwrap_or_else(|| intended.clone())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn collect(node: &Rc<Node>, visit: &mut impl FnMut(&Rc<Node>)) {
    visit(node);
    for child in node.children() {
        collect(&child, visit);
    }
}

fn z_index(node: &Node) -> i64 {
    node.style("z-index")
        .and_then(|z| z.trim().parse().ok())
        .unwrap_or(0)
}

fn covers_viewport(node: &Node) -> bool {
    node.style("position").as_deref() == Some("fixed")
        && node.style("inset").as_deref() == Some("0")
        && node.style("pointer-events").as_deref() != Some("none")
}
