//! The transparent element that sits above the page while blocking

use pagelock_core::OverlayConfig;
use pagelock_dom::{Document, Node};
use std::rc::Rc;

/// Inline styles applied to a newly created overlay
pub const OVERLAY_STYLE: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("inset", "0"),
    ("z-index", "2147483647"),
    ("background", "transparent"),
    ("pointer-events", "all"),
    ("touch-action", "none"),
    ("user-select", "none"),
];

/// Result of [`ensure_overlay`]
#[derive(Debug)]
pub enum OverlayOutcome {
    /// An element with the overlay id was already in the document
    Adopted(Rc<Node>),
    /// A new overlay was appended to the document
    Created(Rc<Node>),
    /// The document has no root element yet
    RootMissing,
}

/// Make sure an overlay exists in `document`, creating it if needed.
pub fn ensure_overlay(document: &Document, config: &OverlayConfig) -> OverlayOutcome {
    if let Some(existing) = document.get_element_by_id(&config.element_id) {
        return OverlayOutcome::Adopted(existing);
    }

    let Some(root) = document.document_element() else {
        return OverlayOutcome::RootMissing;
    };

    let overlay = document.create_element("div");
    overlay.set_attribute("id", &config.element_id);
    for (property, value) in OVERLAY_STYLE {
        overlay.set_style(property, value);
    }
    root.append_child(overlay.clone());

    log::debug!("Inserted input overlay #{}", config.element_id);
    OverlayOutcome::Created(overlay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_overlay_under_root() {
        let doc = Document::with_body();
        let config = OverlayConfig::default();

        let OverlayOutcome::Created(overlay) = ensure_overlay(&doc, &config) else {
            panic!("expected a new overlay");
        };
        assert_eq!(
            overlay.parent().unwrap().id,
            doc.document_element().unwrap().id
        );
        assert_eq!(overlay.style("z-index").as_deref(), Some("2147483647"));
        assert_eq!(overlay.style("user-select").as_deref(), Some("none"));
        assert_eq!(overlay.style("pointer-events").as_deref(), Some("all"));
    }

    #[test]
    fn test_adopts_existing_overlay() {
        let doc = Document::with_body();
        let config = OverlayConfig::default();
        let first = match ensure_overlay(&doc, &config) {
            OverlayOutcome::Created(node) => node,
            other => panic!("unexpected {:?}", other),
        };

        match ensure_overlay(&doc, &config) {
            OverlayOutcome::Adopted(node) => assert_eq!(node.id, first.id),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(doc.document_element().unwrap().children().len(), 2);
    }

    #[test]
    fn test_root_without_body_is_enough() {
        let doc = Document::new();
        doc.set_document_element(doc.create_element("html"));

        let OverlayOutcome::Created(overlay) = ensure_overlay(&doc, &OverlayConfig::default())
        else {
            panic!("expected a new overlay");
        };
        assert_eq!(
            overlay.parent().unwrap().id,
            doc.document_element().unwrap().id
        );
    }

    #[test]
    fn test_root_missing() {
        let doc = Document::new();
        assert!(matches!(
            ensure_overlay(&doc, &OverlayConfig::default()),
            OverlayOutcome::RootMissing
        ));
    }
}
