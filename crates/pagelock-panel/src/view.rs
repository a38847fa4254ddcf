//! What the control panel shows

use serde::Serialize;

pub const TITLE: &str = "Page Lock";
pub const LOCKED_LABEL: &str = "Locked";
pub const UNLOCKED_LABEL: &str = "Unlocked";
pub const HINT: &str = "Applies to all tabs in this window.";

/// Rendered panel. Serializable so a host can hand it to a front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub title: &'static str,
    pub status: &'static str,
    pub hint: &'static str,
    /// Position of the switch
    pub checked: bool,
    /// The switch ignores input while the initial query is in flight
    pub disabled: bool,
}

impl PanelView {
    pub fn render(locked: bool, loading: bool) -> Self {
        Self {
            title: TITLE,
            status: if locked { LOCKED_LABEL } else { UNLOCKED_LABEL },
            hint: HINT,
            checked: locked,
            disabled: loading,
        }
    }
}

impl std::fmt::Display for PanelView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let switch = match (self.checked, self.disabled) {
            (_, true) => "[ ... ]",
            (true, false) => "[ ON  ]",
            (false, false) => "[ OFF ]",
        };
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{} {}", switch, self.status)?;
        write!(f, "{}", self.hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let view = PanelView::render(true, false);
        assert_eq!(view.status, "Locked");
        assert_eq!(view.title, "Page Lock");
        assert!(view.checked);
        assert!(!view.disabled);

        let view = PanelView::render(false, true);
        assert_eq!(view.status, "Unlocked");
        assert!(view.disabled);
    }

    #[test]
    fn test_text_rendering() {
        let text = PanelView::render(true, false).to_string();
        assert_eq!(
            text,
            "Page Lock\n[ ON  ] Locked\nApplies to all tabs in this window."
        );
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(PanelView::render(false, false)).unwrap();
        assert_eq!(value["status"], "Unlocked");
        assert_eq!(value["disabled"], false);
    }
}
