use crate::a11y::UiElement;

use super::config::{ClassifierConfig, Signal};
use super::signals::{geometry_signal, identifier_signal, layout_signal, Needles};

/// What one classification pass concluded about the foreground UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The foreground window belongs to some other application (or to none).
    ForeignApp,
    /// Monitored app in front, no short-form signal.
    Clear,
    /// Short-form content on screen, flagged by the given signal.
    Target(Signal),
}

impl Verdict {
    pub fn is_target(&self) -> bool {
        matches!(self, Verdict::Target(_))
    }
}

/// Heuristic short-form detector over a foreground UI tree.
///
/// Holds pre-lowered needles so a tick only lowers node strings.
#[derive(Debug, Clone)]
pub struct Classifier {
    target_app_id: String,
    strategies: Vec<Signal>,
    identifier_markers: Needles,
    action_keywords: Needles,
    right_edge_fraction: f64,
    category_keywords: Needles,
    navigation_landmarks: Needles,
    max_nodes: usize,
}

impl Classifier {
    pub fn new(target_app_id: impl Into<String>, config: &ClassifierConfig) -> Self {
        Self {
            target_app_id: target_app_id.into(),
            strategies: config.strategies.clone(),
            identifier_markers: Needles::new(&config.identifier_markers),
            action_keywords: Needles::new(&config.action_keywords),
            right_edge_fraction: config.right_edge_fraction,
            category_keywords: Needles::new(&config.category_keywords),
            navigation_landmarks: Needles::new(&config.navigation_landmarks),
            max_nodes: config.max_nodes,
        }
    }

    /// `true` when short-form content is on screen.
    pub fn classify(&self, root: Option<&UiElement>, screen_width: u32) -> bool {
        self.inspect(root, screen_width).is_target()
    }

    pub fn inspect(&self, root: Option<&UiElement>, screen_width: u32) -> Verdict {
        let Some(root) = root else {
            return Verdict::ForeignApp;
        };

        // Skip the scan entirely unless the monitored app owns the window.
        if root.package.as_deref() != Some(self.target_app_id.as_str()) {
            return Verdict::ForeignApp;
        }

        let threshold_px = f64::from(screen_width) * self.right_edge_fraction;

        for signal in &self.strategies {
            let hit = match signal {
                Signal::Identifier => {
                    identifier_signal(root, &self.identifier_markers, self.max_nodes)
                }
                Signal::Geometry => {
                    geometry_signal(root, &self.action_keywords, threshold_px, self.max_nodes)
                }
                Signal::Layout => layout_signal(
                    root,
                    &self.category_keywords,
                    &self.navigation_landmarks,
                    self.max_nodes,
                ),
            };

            if hit {
                return Verdict::Target(*signal);
            }
        }

        Verdict::Clear
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a11y::Bounds;

    const YT: &str = "com.google.android.youtube";
    const WIDTH: u32 = 1080;

    fn config() -> ClassifierConfig {
        ClassifierConfig {
            right_edge_fraction: 0.75,
            ..ClassifierConfig::default()
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(YT, &config())
    }

    fn screen(children: Vec<UiElement>) -> UiElement {
        UiElement {
            package: Some(YT.into()),
            bounds: Bounds::new(0, 0, WIDTH as i32, 2400),
            children,
            ..UiElement::default()
        }
    }

    fn button(label: &str, left: i32) -> UiElement {
        UiElement {
            label: Some(label.into()),
            bounds: Bounds::new(left, 1200, left + 120, 1320),
            ..UiElement::default()
        }
    }

    fn with_id(identifier: &str) -> UiElement {
        UiElement {
            identifier: Some(identifier.into()),
            ..UiElement::default()
        }
    }

    fn home_feed() -> UiElement {
        screen(vec![
            UiElement {
                text: Some("Shorts".into()),
                bounds: Bounds::new(0, 300, 200, 360),
                ..UiElement::default()
            },
            button("Like this video", 40),
            with_id("com.google.android.youtube:id/pivot_bar"),
        ])
    }

    #[test]
    fn missing_root_is_not_target() {
        assert!(!classifier().classify(None, WIDTH));
    }

    #[test]
    fn foreign_app_short_circuits() {
        let mut root = screen(vec![with_id("reel_player_page_container")]);
        root.package = Some("com.android.chrome".into());

        assert_eq!(classifier().inspect(Some(&root), WIDTH), Verdict::ForeignApp);

        root.package = None;
        assert_eq!(classifier().inspect(Some(&root), WIDTH), Verdict::ForeignApp);
    }

    #[test]
    fn identifier_marker_matches_anywhere() {
        let root = screen(vec![UiElement {
            children: vec![with_id("com.google.android.youtube:id/REEL_player_page_container")],
            ..UiElement::default()
        }]);

        assert_eq!(
            classifier().inspect(Some(&root), WIDTH),
            Verdict::Target(Signal::Identifier)
        );
    }

    #[test]
    fn root_node_itself_can_match() {
        let mut root = screen(Vec::new());
        root.identifier = Some("shorts_player_root".into());

        assert!(classifier().classify(Some(&root), WIDTH));
    }

    #[test]
    fn right_edge_boundary_is_strict() {
        // 1080 * 0.75 = 810
        let at_edge = screen(vec![button("Remix", 810)]);
        let past_edge = screen(vec![button("Remix", 811)]);

        assert!(!classifier().classify(Some(&at_edge), WIDTH));
        assert_eq!(
            classifier().inspect(Some(&past_edge), WIDTH),
            Verdict::Target(Signal::Geometry)
        );
    }

    #[test]
    fn keyword_fragments_not_bare_words() {
        let root = screen(vec![
            button("Like", 950),
            with_id("com.google.android.youtube:id/pivot_bar"),
        ]);
        assert!(!classifier().classify(Some(&root), WIDTH));

        let root = screen(vec![button("LIKE THIS VIDEO", 950)]);
        assert!(classifier().classify(Some(&root), WIDTH));
    }

    #[test]
    fn invisible_nodes_never_match() {
        let mut hidden_button = button("Remix", 950);
        hidden_button.visible = false;
        let mut hidden_id = with_id("reel_player_page_container");
        hidden_id.visible = false;

        let root = screen(vec![
            hidden_button,
            hidden_id,
            with_id("com.google.android.youtube:id/pivot_bar"),
        ]);

        assert_eq!(classifier().inspect(Some(&root), WIDTH), Verdict::Clear);
    }

    #[test]
    fn null_fields_are_skipped_but_children_searched() {
        let root = screen(vec![UiElement {
            children: vec![UiElement {
                children: vec![button("Share this video", 1000)],
                ..UiElement::default()
            }],
            ..UiElement::default()
        }]);

        assert!(classifier().classify(Some(&root), WIDTH));
    }

    #[test]
    fn home_feed_is_clear() {
        assert_eq!(
            classifier().inspect(Some(&home_feed()), WIDTH),
            Verdict::Clear
        );
    }

    #[test]
    fn layout_signal_needs_missing_nav_bar() {
        let full_screen = screen(vec![UiElement {
            text: Some("Shorts".into()),
            ..UiElement::default()
        }]);

        assert_eq!(
            classifier().inspect(Some(&full_screen), WIDTH),
            Verdict::Target(Signal::Layout)
        );

        let strict = Classifier::new(
            YT,
            &ClassifierConfig {
                strategies: vec![Signal::Identifier, Signal::Geometry],
                ..config()
            },
        );
        assert!(!strict.classify(Some(&full_screen), WIDTH));
    }

    #[test]
    fn layout_signal_gives_up_on_truncated_walk() {
        let root = screen(vec![
            UiElement {
                text: Some("Shorts".into()),
                ..UiElement::default()
            },
            UiElement::default(),
            with_id("pivot_bar"),
        ]);
        let tight = Classifier::new(
            YT,
            &ClassifierConfig {
                max_nodes: 2,
                ..config()
            },
        );

        assert!(!tight.classify(Some(&root), WIDTH));
    }

    #[test]
    fn priority_order_reports_first_signal() {
        let root = screen(vec![button("Remix", 950), with_id("reel_watch_player")]);

        assert_eq!(
            classifier().inspect(Some(&root), WIDTH),
            Verdict::Target(Signal::Identifier)
        );

        let geometry_first = Classifier::new(
            YT,
            &ClassifierConfig {
                strategies: vec![Signal::Geometry, Signal::Identifier],
                ..config()
            },
        );
        assert_eq!(
            geometry_first.inspect(Some(&root), WIDTH),
            Verdict::Target(Signal::Geometry)
        );
    }

    #[test]
    fn child_order_does_not_change_result() {
        fn reversed(node: &UiElement) -> UiElement {
            let mut copy = node.clone();
            copy.children = node.children.iter().rev().map(reversed).collect();
            copy
        }

        let trees = vec![
            home_feed(),
            screen(vec![
                UiElement {
                    children: vec![button("Remix", 950), UiElement::default()],
                    ..UiElement::default()
                },
                with_id("pivot_bar"),
            ]),
            screen(vec![
                with_id("pivot_bar"),
                UiElement {
                    text: Some("Shorts".into()),
                    ..UiElement::default()
                },
            ]),
        ];

        let classifier = classifier();
        for tree in &trees {
            let forward = classifier.classify(Some(tree), WIDTH);
            assert_eq!(forward, classifier.classify(Some(&reversed(tree)), WIDTH));
            assert_eq!(forward, classifier.classify(Some(tree), WIDTH));
        }
    }
}
