//! Which input events get suppressed, and how
//!
//! This is the whole blocking contract reduced to a pure function so it can
//! be checked without a page.

/// Category of user input an event type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputCategory {
    Pointer,
    Touch,
    Wheel,
    Keyboard,
}

/// Every event type the agent listens for while blocking
pub const BLOCKED_EVENT_TYPES: &[&str] = &[
    "click",
    "dblclick",
    "contextmenu",
    "auxclick",
    "mousedown",
    "mouseup",
    "pointerdown",
    "pointerup",
    "wheel",
    "touchstart",
    "touchmove",
    "touchend",
    "keydown",
    "keyup",
    "keypress",
    "beforeinput",
    "compositionstart",
];

impl InputCategory {
    /// Classify an event type. Returns `None` for types the agent does not
    /// block (focus, scroll, load, ...).
    pub fn of(event_type: &str) -> Option<Self> {
        match event_type {
            "click" | "dblclick" | "contextmenu" | "auxclick" | "mousedown" | "mouseup"
            | "pointerdown" | "pointerup" => Some(InputCategory::Pointer),
            "touchstart" | "touchmove" | "touchend" => Some(InputCategory::Touch),
            "wheel" => Some(InputCategory::Wheel),
            "keydown" | "keyup" | "keypress" | "beforeinput" | "compositionstart" => {
                Some(InputCategory::Keyboard)
            }
            _ => None,
        }
    }
}

/// What the blocking handler does to one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Suppression {
    pub prevent_default: bool,
    pub stop_immediate: bool,
}

impl Suppression {
    pub const NONE: Suppression = Suppression {
        prevent_default: false,
        stop_immediate: false,
    };
}

/// Decide the suppression for an event of `category`.
///
/// Covered events always stop immediate propagation; the default action is
/// cancelled only when the event allows it.
pub fn suppression_for(category: Option<InputCategory>, cancelable: bool) -> Suppression {
    match category {
        Some(_) => Suppression {
            prevent_default: cancelable,
            stop_immediate: true,
        },
        None => Suppression::NONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_blocked_type_is_classified() {
        for event_type in BLOCKED_EVENT_TYPES {
            assert!(
                InputCategory::of(event_type).is_some(),
                "{} has no category",
                event_type
            );
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(InputCategory::of("auxclick"), Some(InputCategory::Pointer));
        assert_eq!(InputCategory::of("touchmove"), Some(InputCategory::Touch));
        assert_eq!(InputCategory::of("wheel"), Some(InputCategory::Wheel));
        assert_eq!(
            InputCategory::of("compositionstart"),
            Some(InputCategory::Keyboard)
        );
        assert_eq!(InputCategory::of("focus"), None);
        assert_eq!(InputCategory::of("scroll"), None);
    }

    #[test]
    fn test_covered_events_always_stop() {
        for category in [
            InputCategory::Pointer,
            InputCategory::Touch,
            InputCategory::Wheel,
            InputCategory::Keyboard,
        ] {
            assert_eq!(
                suppression_for(Some(category), true),
                Suppression {
                    prevent_default: true,
                    stop_immediate: true
                }
            );
            assert_eq!(
                suppression_for(Some(category), false),
                Suppression {
                    prevent_default: false,
                    stop_immediate: true
                }
            );
        }
    }

    #[test]
    fn test_uncovered_events_pass() {
        assert_eq!(suppression_for(None, true), Suppression::NONE);
        assert_eq!(suppression_for(None, false), Suppression::NONE);
    }
}
