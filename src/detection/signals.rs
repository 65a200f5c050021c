use crate::a11y::{UiElement, Walk};

/// Lower-cased needles for one tick's worth of matching.
#[derive(Debug, Clone)]
pub struct Needles(Vec<String>);

impl Needles {
    pub fn new(values: &[String]) -> Self {
        Self(
            values
                .iter()
                .map(|value| value.trim().to_lowercase())
                .filter(|value| !value.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn found_in(&self, haystack: &str) -> bool {
        self.0.iter().any(|needle| haystack.contains(needle.as_str()))
    }
}

/// Any visible node whose identifier contains a marker.
pub fn identifier_signal(root: &UiElement, markers: &Needles, budget: usize) -> bool {
    if markers.is_empty() {
        return false;
    }

    root.walk_until(budget, |node| {
        node.visible
            && node
                .identifier_lower()
                .is_some_and(|identifier| markers.found_in(&identifier))
    })
    .is_match()
}

/// Any visible node with an action keyword whose left edge sits strictly
/// beyond `threshold_px`.
pub fn geometry_signal(
    root: &UiElement,
    keywords: &Needles,
    threshold_px: f64,
    budget: usize,
) -> bool {
    if keywords.is_empty() {
        return false;
    }

    root.walk_until(budget, |node| {
        node.visible
            && f64::from(node.bounds.left) > threshold_px
            && node
                .searchable_text()
                .is_some_and(|text| keywords.found_in(&text))
    })
    .is_match()
}

/// Category text is visible somewhere and no navigation landmark is.
///
/// Needs a full pass for the landmark, so it is the most expensive signal.
pub fn layout_signal(
    root: &UiElement,
    category: &Needles,
    landmarks: &Needles,
    budget: usize,
) -> bool {
    if category.is_empty() || landmarks.is_empty() {
        return false;
    }

    let mut category_seen = false;
    let walk = root.walk_until(budget, |node| {
        if !node.visible {
            return false;
        }

        let text = node.searchable_text();
        if !category_seen {
            category_seen = text.as_deref().is_some_and(|t| category.found_in(t));
        }

        node.identifier_lower()
            .is_some_and(|identifier| landmarks.found_in(&identifier))
            || text.is_some_and(|t| landmarks.found_in(&t))
    });

    // A truncated walk can't prove the landmark is absent.
    category_seen && walk == Walk::Finished
}
