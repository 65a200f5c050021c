use serde::{Deserialize, Serialize};

/// Independent heuristics that can flag short-form content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// A view identifier carries a short-form marker.
    Identifier,
    /// An action-rail keyword sits against the right screen edge.
    Geometry,
    /// Category keyword on screen while the bottom navigation bar is gone.
    Layout,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Identifier => "identifier",
            Signal::Geometry => "geometry",
            Signal::Layout => "layout",
        }
    }
}

/// Tunables for the short-form classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Signals to evaluate, in priority order. The first positive wins.
    pub strategies: Vec<Signal>,

    /// Substrings of view identifiers that only appear in the short-form player.
    pub identifier_markers: Vec<String>,

    /// Action-rail phrases (text or label). Kept as phrase fragments so
    /// ordinary "like" buttons elsewhere don't trip them.
    pub action_keywords: Vec<String>,

    /// A node's left edge must lie strictly beyond this fraction of the
    /// screen width for the geometry signal.
    pub right_edge_fraction: f64,

    /// Text naming the category itself, used by the layout signal.
    pub category_keywords: Vec<String>,

    /// Identifiers or labels of the regular navigation chrome (bottom tab bar).
    pub navigation_landmarks: Vec<String>,

    /// Maximum number of nodes visited per signal per tick.
    pub max_nodes: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strategies: vec![Signal::Identifier, Signal::Geometry, Signal::Layout],
            identifier_markers: vec!["reel_".into(), "shorts_player".into()],
            action_keywords: vec![
                "remix".into(),
                "like this".into(),
                "dislike this".into(),
                "share this".into(),
                "view comments".into(),
            ],
            right_edge_fraction: 0.65,
            category_keywords: vec!["shorts".into()],
            navigation_landmarks: vec!["pivot_bar".into(), "bottom_navigation".into()],
            max_nodes: 5_000,
        }
    }
}
