use serde::{Deserialize, Serialize};

/// Screen-space rectangle in physical pixels, edges inclusive on the left/top.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left).max(0) as u32
    }
}

/// One node of the foreground accessibility tree, as reported by the host.
///
/// Nodes are read-only for the duration of a single tick and are never kept
/// across ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiElement {
    /// Opaque view identifier, e.g. `com.google.android.youtube:id/reel_player_page_container`.
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Accessibility label (content description).
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub bounds: Bounds,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Owning application identifier. Usually only set on the root.
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub children: Vec<UiElement>,
}

fn default_visible() -> bool {
    true
}

// Same as a node the host sent with every optional field left out.
impl Default for UiElement {
    fn default() -> Self {
        Self {
            identifier: None,
            text: None,
            label: None,
            bounds: Bounds::default(),
            visible: default_visible(),
            package: None,
            children: Vec::new(),
        }
    }
}

impl UiElement {
    /// Lower-cased text and label joined by a newline, or `None` when the
    /// node carries neither.
    pub fn searchable_text(&self) -> Option<String> {
        match (self.text.as_deref(), self.label.as_deref()) {
            (None, None) => None,
            (Some(text), None) => Some(text.to_lowercase()),
            (None, Some(label)) => Some(label.to_lowercase()),
            (Some(text), Some(label)) => Some(format!("{}\n{}", text, label).to_lowercase()),
        }
    }

    pub fn identifier_lower(&self) -> Option<String> {
        self.identifier.as_deref().map(str::to_lowercase)
    }

    /// Depth-first, pre-order walk over this node and its descendants that
    /// stops after `budget` nodes or when `visit` returns `true`.
    pub fn walk_until<F>(&self, budget: usize, mut visit: F) -> Walk
    where
        F: FnMut(&UiElement) -> bool,
    {
        let mut stack: Vec<&UiElement> = vec![self];
        let mut visited = 0usize;

        while let Some(node) = stack.pop() {
            if visited >= budget {
                return Walk::OutOfBudget;
            }
            visited += 1;

            if visit(node) {
                return Walk::Matched;
            }

            // Reverse so the first child is popped first.
            stack.extend(node.children.iter().rev());
        }

        Walk::Finished
    }
}

/// How a bounded tree walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Matched,
    /// Every node was visited without a match.
    Finished,
    OutOfBudget,
}

impl Walk {
    pub fn is_match(self) -> bool {
        self == Walk::Matched
    }
}

/// One capture of the foreground window handed over by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenSnapshot {
    /// Physical display width in pixels. `0` means unknown, in which case the
    /// root's own width is used.
    #[serde(default)]
    pub screen_width: u32,
    pub root: UiElement,
}

impl ScreenSnapshot {
    pub fn effective_screen_width(&self) -> u32 {
        if self.screen_width > 0 {
            self.screen_width
        } else {
            self.root.bounds.width()
        }
    }
}
