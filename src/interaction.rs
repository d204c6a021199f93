//! Pan/zoom, node dragging, click-to-select and debounced resize refit.
//!
//! Pointer coordinates are screen pixels; the controller converts them into
//! diagram coordinates through the current [`ViewTransform`].

use std::time::{Duration, Instant};

use crate::config::InteractionConfig;
use crate::layout::{Bounds, LayoutResult, Viewport};
use crate::render::{HitTarget, Scene};

/// Screen = diagram * k + (x, y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub x: f32,
    pub y: f32,
    pub k: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewTransform {
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            k: 1.0,
        }
    }

    pub fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (x * self.k + self.x, y * self.k + self.y)
    }

    pub fn invert(&self, (sx, sy): (f32, f32)) -> (f32, f32) {
        ((sx - self.x) / self.k, (sy - self.y) / self.k)
    }

    /// Scales and centers `bounds` inside the viewport. Empty bounds give the identity.
    pub fn fit(
        bounds: &Bounds,
        viewport: Viewport,
        padding: f32,
        min_scale: f32,
        max_scale: f32,
    ) -> Self {
        if bounds.is_empty() {
            return Self::identity();
        }
        let avail_w = (viewport.width - padding * 2.0).max(1.0);
        let avail_h = (viewport.height - padding * 2.0).max(1.0);
        // Unlike clamp, max/min tolerate NaN or inverted bounds.
        let k = (avail_w / bounds.width().max(1.0))
            .min(avail_h / bounds.height().max(1.0))
            .max(min_scale.min(max_scale))
            .min(max_scale.max(min_scale));
        let (cx, cy) = bounds.center();
        Self {
            x: viewport.width / 2.0 - cx * k,
            y: viewport.height / 2.0 - cy * k,
            k,
        }
    }

    pub fn to_svg(&self) -> String {
        format!("translate({:.2},{:.2}) scale({:.4})", self.x, self.y, self.k)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
    pub button: PointerButton,
    pub alt: bool,
    /// Set when another handler already consumed the event.
    pub default_prevented: bool,
}

impl PointerEvent {
    pub fn primary(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            button: PointerButton::Primary,
            alt: false,
            default_prevented: false,
        }
    }

    pub fn secondary(x: f32, y: f32) -> Self {
        Self {
            button: PointerButton::Secondary,
            ..Self::primary(x, y)
        }
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn prevented(mut self) -> Self {
        self.default_prevented = true;
        self
    }

    fn is_reserved(&self) -> bool {
        self.alt || self.button == PointerButton::Secondary
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Selection now holds this step id.
    Selected(String),
    /// Alt or secondary click on a target; left to the host.
    Reserved(HitTarget),
    /// Swallowed by a drag or an earlier handler.
    Consumed,
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerMove {
    None,
    Panned,
    MovedNode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionSource {
    #[default]
    Local,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    selected: Option<String>,
    source: SelectionSource,
    revision: u64,
}

impl SelectionState {
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn source(&self) -> SelectionSource {
        self.source
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn set(&mut self, selected: Option<String>, source: SelectionSource) {
        self.selected = selected;
        self.source = source;
        self.revision += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DragTarget {
    Node(String),
    Background,
}

#[derive(Debug, Clone)]
struct DragState {
    target: DragTarget,
    origin: (f32, f32),
    last: (f32, f32),
    active: bool,
}

#[derive(Debug)]
pub struct InteractionController {
    config: InteractionConfig,
    viewport: Viewport,
    transform: ViewTransform,
    selection: SelectionState,
    drag: Option<DragState>,
    suppress_click: bool,
    resize_requested: Option<Instant>,
}

impl InteractionController {
    pub fn new(config: InteractionConfig, viewport: Viewport) -> Self {
        Self {
            config: config.sanitized(),
            viewport,
            transform: ViewTransform::identity(),
            selection: SelectionState::default(),
            drag: None,
            suppress_click: false,
            resize_requested: None,
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_transform(&mut self, transform: ViewTransform) {
        self.transform = ViewTransform {
            k: self.clamp_scale(transform.k),
            ..transform
        };
    }

    fn clamp_scale(&self, k: f32) -> f32 {
        if k.is_finite() {
            k.clamp(self.config.min_scale, self.config.max_scale)
        } else {
            self.transform.k
        }
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        if dx.is_finite() && dy.is_finite() {
            self.transform.x += dx;
            self.transform.y += dy;
        }
    }

    /// Multiplies the scale by `factor` keeping the screen point `(sx, sy)` fixed.
    pub fn zoom_at(&mut self, sx: f32, sy: f32, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let anchor = self.transform.invert((sx, sy));
        let k = self.clamp_scale(self.transform.k * factor);
        self.transform = ViewTransform {
            x: sx - anchor.0 * k,
            y: sy - anchor.1 * k,
            k,
        };
    }

    pub fn pointer_down(&mut self, event: PointerEvent, scene: &Scene) {
        self.suppress_click = false;
        if event.default_prevented || event.is_reserved() {
            self.drag = None;
            return;
        }
        let point = self.transform.invert((event.x, event.y));
        let target = match scene.hit_test(point.0, point.1) {
            Some((_, HitTarget::Node { node_id, .. })) => DragTarget::Node(node_id.clone()),
            _ => DragTarget::Background,
        };
        self.drag = Some(DragState {
            target,
            origin: (event.x, event.y),
            last: (event.x, event.y),
            active: false,
        });
    }

    /// Node drags only touch the given layout; nothing is rebuilt.
    pub fn pointer_move(&mut self, event: PointerEvent, layout: &mut LayoutResult) -> PointerMove {
        let threshold = self.config.drag_threshold;
        let k = self.transform.k;
        let Some(drag) = self.drag.as_mut() else {
            return PointerMove::None;
        };
        if !drag.active {
            let (ox, oy) = drag.origin;
            if (event.x - ox).hypot(event.y - oy) < threshold {
                return PointerMove::None;
            }
            drag.active = true;
        }
        let (dx, dy) = (event.x - drag.last.0, event.y - drag.last.1);
        drag.last = (event.x, event.y);
        match drag.target.clone() {
            DragTarget::Node(node_id) => {
                if layout.move_node(&node_id, dx / k, dy / k) {
                    PointerMove::MovedNode(node_id)
                } else {
                    PointerMove::None
                }
            }
            DragTarget::Background => {
                self.pan_by(dx, dy);
                PointerMove::Panned
            }
        }
    }

    pub fn pointer_up(&mut self, event: PointerEvent, layout: &mut LayoutResult) -> PointerMove {
        let moved = self.pointer_move(event, layout);
        if let Some(drag) = self.drag.take() {
            self.suppress_click = drag.active;
        }
        moved
    }

    pub fn click(&mut self, event: PointerEvent, scene: &Scene) -> ClickOutcome {
        if std::mem::take(&mut self.suppress_click) || event.default_prevented {
            return ClickOutcome::Consumed;
        }
        let point = self.transform.invert((event.x, event.y));
        let Some((_, target)) = scene.hit_test(point.0, point.1) else {
            return ClickOutcome::Ignored;
        };
        if event.is_reserved() {
            return ClickOutcome::Reserved(target.clone());
        }
        match target {
            HitTarget::Node { step_ids, .. } => match step_ids.first() {
                Some(step_id) => {
                    self.selection
                        .set(Some(step_id.clone()), SelectionSource::Local);
                    ClickOutcome::Selected(step_id.clone())
                }
                None => ClickOutcome::Ignored,
            },
            HitTarget::Link { .. } => ClickOutcome::Ignored,
        }
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.selected()
    }

    pub fn selection_state(&self) -> &SelectionState {
        &self.selection
    }

    /// Highlights `step_id` if the layout has it; otherwise clears the selection.
    pub fn set_external_selection(
        &mut self,
        step_id: Option<&str>,
        layout: Option<&LayoutResult>,
    ) -> Option<&str> {
        let selected = match (step_id, layout) {
            (Some(id), Some(layout)) if layout.contains_step(id) => Some(id.to_string()),
            _ => None,
        };
        self.selection.set(selected, SelectionSource::External);
        self.selection.selected()
    }

    /// Like [`set_external_selection`](Self::set_external_selection), but a value
    /// pushed by a host that had not yet seen the latest local click is dropped.
    /// Returns whether the value was applied.
    pub fn apply_external_selection(
        &mut self,
        step_id: Option<&str>,
        observed_revision: u64,
        layout: Option<&LayoutResult>,
    ) -> bool {
        if self.selection.source == SelectionSource::Local
            && observed_revision < self.selection.revision
        {
            tracing::trace!(
                observed_revision,
                revision = self.selection.revision,
                "ignoring stale external selection"
            );
            return false;
        }
        self.set_external_selection(step_id, layout);
        true
    }

    /// Drops a selection or drag that refers to nodes the new layout lacks.
    pub fn invalidate_selection(&mut self, layout: Option<&LayoutResult>) {
        self.drag = None;
        self.suppress_click = false;
        let stale = match (self.selection.selected(), layout) {
            (Some(id), Some(layout)) => !layout.contains_step(id),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if stale {
            let source = self.selection.source;
            self.selection.set(None, source);
        }
    }

    pub fn on_resize(&mut self, viewport: Viewport, now: Instant) {
        self.viewport = viewport;
        self.resize_requested = Some(now);
    }

    /// When the pending refit fires, if any.
    pub fn resize_deadline(&self) -> Option<Instant> {
        self.resize_requested
            .map(|requested| requested + self.config.resize_debounce())
    }

    /// Refits once the resize stream has been quiet for the debounce period.
    pub fn poll_resize(&mut self, now: Instant, layout: Option<&LayoutResult>) -> bool {
        match self.resize_deadline() {
            Some(deadline) if now >= deadline => {
                self.resize_requested = None;
                if let Some(layout) = layout {
                    self.refit(layout);
                }
                true
            }
            _ => false,
        }
    }

    /// Re-scales and re-centers on the current node positions.
    pub fn refit(&mut self, layout: &LayoutResult) {
        self.transform = ViewTransform::fit(
            &layout.bounds(),
            self.viewport,
            self.config.fit_padding,
            self.config.min_scale,
            self.config.max_scale,
        );
        tracing::trace!(k = self.transform.k, "refit view");
    }

    pub fn reset_transform(&mut self) {
        self.transform = ViewTransform::identity();
        self.drag = None;
        self.suppress_click = false;
    }

    pub fn debounce(&self) -> Duration {
        self.config.resize_debounce()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlowSettings, LayoutConfig};
    use crate::graph::build_graph;
    use crate::ir::FlowStep;
    use crate::layout::compute_layout;
    use crate::render::render_scene;
    use crate::theme::Theme;

    fn fixture() -> (LayoutResult, Scene) {
        let steps = vec![
            FlowStep::new("A").with_items(10.0).feeding("B", "ore", 10.0),
            FlowStep::new("B")
                .with_items(10.0)
                .feeding("C", "plate", 6.0)
                .feeding("D", "plate", 4.0),
            FlowStep::new("C"),
            FlowStep::new("D"),
        ];
        let settings = FlowSettings::default();
        let graph = build_graph(&steps, &settings).unwrap();
        let layout = compute_layout(
            &graph,
            &settings,
            &Theme::light(),
            &LayoutConfig::default(),
            Viewport::new(600.0, 400.0),
        )
        .unwrap();
        let scene = render_scene(&layout, &settings, &Theme::light(), &LayoutConfig::default(), None);
        (layout, scene)
    }

    fn center_of(layout: &LayoutResult, id: &str) -> (f32, f32) {
        let LayoutResult::Sankey(sankey) = layout else {
            panic!("expected sankey");
        };
        let node = sankey.nodes.iter().find(|n| n.id == id).unwrap();
        ((node.x0 + node.x1) / 2.0, (node.y0 + node.y1) / 2.0)
    }

    fn controller() -> InteractionController {
        InteractionController::new(InteractionConfig::default(), Viewport::new(600.0, 400.0))
    }

    #[test]
    fn transform_round_trips_points() {
        let t = ViewTransform {
            x: 10.0,
            y: -4.0,
            k: 2.0,
        };
        let p = t.apply((3.0, 5.0));
        assert_eq!(p, (16.0, 6.0));
        assert_eq!(t.invert(p), (3.0, 5.0));
        assert_eq!(t.to_svg(), t.to_svg());
    }

    #[test]
    fn zoom_is_clamped_and_keeps_anchor() {
        let mut ctl = controller();
        ctl.zoom_at(100.0, 50.0, 2.0);
        let t = ctl.transform();
        assert_eq!(t.k, 2.0);
        assert_eq!(t.apply(t.invert((100.0, 50.0))), (100.0, 50.0));

        ctl.zoom_at(0.0, 0.0, 1000.0);
        assert_eq!(ctl.transform().k, InteractionConfig::default().max_scale);
        ctl.zoom_at(0.0, 0.0, 1e-6);
        assert_eq!(ctl.transform().k, InteractionConfig::default().min_scale);
        ctl.zoom_at(0.0, 0.0, f32::NAN);
        assert_eq!(ctl.transform().k, InteractionConfig::default().min_scale);
    }

    #[test]
    fn invalid_scale_bounds_are_sanitized() {
        let (layout, _) = fixture();
        let inverted = InteractionConfig {
            min_scale: 4.0,
            max_scale: 2.0,
            ..Default::default()
        };
        let mut ctl = InteractionController::new(inverted, Viewport::new(600.0, 400.0));
        ctl.zoom_at(0.0, 0.0, 1.5);
        assert_eq!(ctl.transform().k, 2.0);
        ctl.zoom_at(0.0, 0.0, 100.0);
        assert_eq!(ctl.transform().k, 4.0);

        let nan = InteractionConfig {
            min_scale: f32::NAN,
            ..Default::default()
        };
        let mut ctl = InteractionController::new(nan, Viewport::new(600.0, 400.0));
        let t0 = Instant::now();
        ctl.on_resize(Viewport::new(300.0, 200.0), t0);
        assert!(ctl.poll_resize(t0 + Duration::from_millis(300), Some(&layout)));
        assert!(ctl.transform().k.is_finite());

        let t = ViewTransform::fit(&layout.bounds(), Viewport::new(300.0, 200.0), 0.0, 4.0, 2.0);
        assert!((2.0..=4.0).contains(&t.k));
    }

    #[test]
    fn click_selects_node_step() {
        let (mut layout, scene) = fixture();
        let mut ctl = controller();
        let (x, y) = center_of(&layout, "B");
        ctl.pointer_down(PointerEvent::primary(x, y), &scene);
        ctl.pointer_up(PointerEvent::primary(x, y), &mut layout);
        assert_eq!(
            ctl.click(PointerEvent::primary(x, y), &scene),
            ClickOutcome::Selected("B".to_string())
        );
        assert_eq!(ctl.selection(), Some("B"));
        assert_eq!(ctl.click(PointerEvent::primary(-50.0, -50.0), &scene), ClickOutcome::Ignored);
        assert_eq!(ctl.selection(), Some("B"));
    }

    #[test]
    fn reserved_and_prevented_clicks_keep_selection() {
        let (layout, scene) = fixture();
        let mut ctl = controller();
        ctl.set_external_selection(Some("A"), Some(&layout));
        let (x, y) = center_of(&layout, "B");

        let outcome = ctl.click(PointerEvent::primary(x, y).with_alt(), &scene);
        assert!(matches!(outcome, ClickOutcome::Reserved(HitTarget::Node { ref node_id, .. }) if node_id == "B"));
        assert!(matches!(
            ctl.click(PointerEvent::secondary(x, y), &scene),
            ClickOutcome::Reserved(_)
        ));
        assert_eq!(
            ctl.click(PointerEvent::primary(x, y).prevented(), &scene),
            ClickOutcome::Consumed
        );
        assert_eq!(ctl.selection(), Some("A"));
    }

    #[test]
    fn dragging_a_node_moves_it_and_consumes_the_click() {
        let (mut layout, scene) = fixture();
        let mut ctl = controller();
        let before = layout.node_origin("B").unwrap();
        let (x, y) = center_of(&layout, "B");
        ctl.pointer_down(PointerEvent::primary(x, y), &scene);
        assert_eq!(
            ctl.pointer_move(PointerEvent::primary(x + 1.0, y), &mut layout),
            PointerMove::None
        );
        assert_eq!(
            ctl.pointer_move(PointerEvent::primary(x + 30.0, y + 10.0), &mut layout),
            PointerMove::MovedNode("B".to_string())
        );
        ctl.pointer_up(PointerEvent::primary(x + 30.0, y + 10.0), &mut layout);
        assert_eq!(ctl.click(PointerEvent::primary(x + 30.0, y + 10.0), &scene), ClickOutcome::Consumed);
        assert_eq!(ctl.selection(), None);

        let after = layout.node_origin("B").unwrap();
        assert!((after.0 - before.0 - 30.0).abs() < 1e-3);
        assert!((after.1 - before.1 - 10.0).abs() < 1e-3);
        assert_eq!(ctl.transform(), ViewTransform::identity());
    }

    #[test]
    fn dragging_background_pans() {
        let (mut layout, scene) = fixture();
        let mut ctl = controller();
        ctl.pointer_down(PointerEvent::primary(-20.0, -20.0), &scene);
        ctl.pointer_move(PointerEvent::primary(0.0, -10.0), &mut layout);
        ctl.pointer_up(PointerEvent::primary(0.0, -10.0), &mut layout);
        assert_eq!(ctl.transform().x, 20.0);
        assert_eq!(ctl.transform().y, 10.0);
    }

    #[test]
    fn resize_refits_after_quiet_period_only() {
        let (layout, _) = fixture();
        let mut ctl = controller();
        let t0 = Instant::now();
        ctl.on_resize(Viewport::new(300.0, 200.0), t0);
        ctl.on_resize(Viewport::new(320.0, 200.0), t0 + Duration::from_millis(120));
        assert!(!ctl.poll_resize(t0 + Duration::from_millis(250), Some(&layout)));
        assert_eq!(ctl.transform(), ViewTransform::identity());
        assert!(ctl.poll_resize(t0 + Duration::from_millis(330), Some(&layout)));
        assert!(ctl.transform().k < 1.0);
        assert!(!ctl.poll_resize(t0 + Duration::from_millis(900), Some(&layout)));
    }

    #[test]
    fn external_selection_round_trip() {
        let (layout, _) = fixture();
        let mut ctl = controller();
        assert_eq!(ctl.set_external_selection(Some("C"), Some(&layout)), Some("C"));
        assert_eq!(ctl.selection(), Some("C"));
        assert_eq!(ctl.set_external_selection(Some("missing"), Some(&layout)), None);
        assert_eq!(ctl.selection(), None);
    }

    #[test]
    fn local_click_wins_over_stale_external_value() {
        let (mut layout, scene) = fixture();
        let mut ctl = controller();
        ctl.set_external_selection(Some("A"), Some(&layout));
        let observed = ctl.selection_state().revision();
        let (x, y) = center_of(&layout, "D");
        ctl.pointer_down(PointerEvent::primary(x, y), &scene);
        ctl.pointer_up(PointerEvent::primary(x, y), &mut layout);
        ctl.click(PointerEvent::primary(x, y), &scene);

        assert!(!ctl.apply_external_selection(Some("A"), observed, Some(&layout)));
        assert_eq!(ctl.selection(), Some("D"));
        let current = ctl.selection_state().revision();
        assert!(ctl.apply_external_selection(Some("C"), current, Some(&layout)));
        assert_eq!(ctl.selection(), Some("C"));
    }

    #[test]
    fn invalidate_clears_missing_selection() {
        let (layout, _) = fixture();
        let mut ctl = controller();
        ctl.set_external_selection(Some("B"), Some(&layout));
        ctl.invalidate_selection(Some(&layout));
        assert_eq!(ctl.selection(), Some("B"));
        ctl.invalidate_selection(None);
        assert_eq!(ctl.selection(), None);
    }

    #[test]
    fn fit_of_empty_bounds_is_identity() {
        let t = ViewTransform::fit(&Bounds::empty(), Viewport::default(), 10.0, 0.1, 8.0);
        assert_eq!(t, ViewTransform::identity());
    }
}
