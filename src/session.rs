//! Rebuild orchestration for one live diagram.
//!
//! Inputs arrive as [`SessionEvent`]s through [`DiagramSession::submit`], which
//! only records what changed. [`DiagramSession::flush`] then does the cheapest
//! work that covers everything recorded, so a burst of events builds once from
//! the latest state. Box-line layouts run on a [`LayoutWorker`];
//! [`DiagramSession::poll`] collects them and enforces the time budget.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, DiagramKind, FlowSettings, SettingsImpact};
use crate::error::FlowError;
use crate::graph::{FlowGraph, build_graph};
use crate::interaction::{ClickOutcome, InteractionController, PointerEvent, PointerMove};
use crate::ir::FlowStep;
use crate::layout::worker::timeout_error;
use crate::layout::{
    DagreBackend, JobPoll, LayoutBackend, LayoutResult, LayoutWorker, Viewport,
    compute_sankey_layout,
};
use crate::render::{Scene, render_scene, scene_to_svg};
use crate::theme::Theme;

#[derive(Debug, Clone, PartialEq)]
pub enum RebuildStatus {
    Idle,
    Building,
    Ready,
    Failed(FlowError),
}

impl RebuildStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, RebuildStatus::Ready)
    }

    pub fn error(&self) -> Option<&FlowError> {
        match self {
            RebuildStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    FlowData(Vec<FlowStep>),
    Settings(FlowSettings),
    Theme(Theme),
    Viewport(Viewport),
    /// Selection pushed by the host; `None` clears it.
    ExternalSelection(Option<String>),
}

#[derive(Debug, Default, Clone, Copy)]
struct Pending {
    graph: bool,
    layout: bool,
    render: bool,
    resize: bool,
}

pub struct DiagramSession {
    config: Config,
    backend: Arc<dyn LayoutBackend>,
    steps: Option<Vec<FlowStep>>,
    settings: FlowSettings,
    theme: Theme,
    viewport: Viewport,
    graph: Option<Arc<FlowGraph>>,
    pending: Pending,
    pending_selection: Option<Option<String>>,
    generation: u64,
    status: RebuildStatus,
    layout: Option<LayoutResult>,
    scene: Option<Scene>,
    controller: InteractionController,
    worker: Option<LayoutWorker>,
    render_count: u64,
}

impl DiagramSession {
    pub fn new(config: Config) -> Self {
        Self::with_backend(config, Arc::new(DagreBackend))
    }

    pub fn with_backend(config: Config, backend: Arc<dyn LayoutBackend>) -> Self {
        let viewport = Viewport::new(config.render.width, config.render.height);
        Self {
            backend,
            steps: None,
            settings: config.settings.clone(),
            theme: config.theme.clone(),
            viewport,
            graph: None,
            pending: Pending::default(),
            pending_selection: None,
            generation: 0,
            status: RebuildStatus::Idle,
            layout: None,
            scene: None,
            controller: InteractionController::new(config.interaction.clone(), viewport),
            worker: None,
            render_count: 0,
            config,
        }
    }

    /// Records an input change. Nothing is rebuilt until [`flush`](Self::flush).
    pub fn submit(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::FlowData(steps) => {
                if self.steps.as_ref() != Some(&steps) {
                    self.steps = Some(steps);
                    self.pending.graph = true;
                }
            }
            SessionEvent::Settings(next) => {
                match self.settings.impact_of(&next) {
                    SettingsImpact::Unchanged => {}
                    SettingsImpact::Render => self.pending.render = true,
                    SettingsImpact::Layout => self.pending.layout = true,
                    SettingsImpact::Graph => self.pending.graph = true,
                }
                self.settings = next;
            }
            SessionEvent::Theme(theme) => {
                if theme == self.theme {
                    return;
                }
                // Box-line node sizes come from label measurement.
                let remeasure = theme.font_size != self.theme.font_size
                    || theme.font_family != self.theme.font_family;
                if remeasure && self.settings.diagram == DiagramKind::BoxLine {
                    self.pending.layout = true;
                } else {
                    self.pending.render = true;
                }
                self.theme = theme;
            }
            SessionEvent::Viewport(viewport) => {
                if viewport != self.viewport {
                    self.viewport = viewport;
                    self.pending.resize = true;
                }
            }
            SessionEvent::ExternalSelection(step_id) => {
                self.pending_selection = Some(step_id);
            }
        }
    }

    /// Applies every recorded change with the least work that covers all of them.
    pub fn flush(&mut self, now: Instant) -> &RebuildStatus {
        let pending = std::mem::take(&mut self.pending);

        if pending.resize {
            self.controller.on_resize(self.viewport, now);
        }

        if self.steps.is_some() && (pending.graph || pending.layout) {
            self.start_rebuild(pending.graph, now);
        } else if self.layout.is_some() {
            // With a box-line job in flight the selection waits for its layout.
            let selection_changed = self.worker.is_none() && self.take_pending_selection();
            if pending.render || selection_changed {
                self.render();
            }
        }
        &self.status
    }

    /// Collects a finished background layout, enforces its time budget and
    /// fires a due resize refit.
    pub fn poll(&mut self, now: Instant) -> &RebuildStatus {
        if let Some(worker) = &self.worker {
            match worker.try_recv() {
                JobPoll::Pending => {
                    let elapsed = worker.elapsed(now);
                    let budget = self.config.layout.boxline.budget();
                    if elapsed >= budget {
                        let generation = worker.generation();
                        self.worker = None;
                        // Anything still computing for this generation is stale now.
                        self.generation += 1;
                        tracing::warn!(generation, ?elapsed, "box-line layout exceeded its budget");
                        self.fail(timeout_error(elapsed, budget));
                    }
                }
                JobPoll::Done(result) => {
                    let generation = worker.generation();
                    self.worker = None;
                    self.finish(generation, result.map(LayoutResult::BoxLine));
                }
            }
        }

        self.controller.poll_resize(now, self.layout.as_ref());
        &self.status
    }

    fn start_rebuild(&mut self, rebuild_graph: bool, now: Instant) {
        let Some(steps) = self.steps.as_ref() else {
            return;
        };
        if let Some(old) = self.worker.take() {
            tracing::trace!(generation = old.generation(), "superseding in-flight layout");
        }
        self.generation += 1;
        let generation = self.generation;
        self.status = RebuildStatus::Building;
        self.controller.reset_transform();
        tracing::debug!(generation, diagram = ?self.settings.diagram, rebuild_graph, "building diagram");

        let cached = if rebuild_graph { None } else { self.graph.clone() };
        let graph = match cached {
            Some(graph) => graph,
            None => match build_graph(steps, &self.settings) {
                Ok(graph) => {
                    let graph = Arc::new(graph);
                    self.graph = Some(Arc::clone(&graph));
                    graph
                }
                Err(err) => {
                    self.graph = None;
                    self.fail(err);
                    return;
                }
            },
        };

        match self.settings.diagram {
            DiagramKind::Sankey => {
                let result = compute_sankey_layout(
                    &graph,
                    self.settings.sankey_align,
                    self.settings.link_size,
                    &self.config.layout.sankey,
                    self.viewport,
                )
                .map(LayoutResult::Sankey);
                self.finish(generation, result);
            }
            DiagramKind::BoxLine => {
                self.worker = Some(LayoutWorker::spawn(
                    generation,
                    graph,
                    Arc::clone(&self.backend),
                    self.theme.clone(),
                    self.config.layout.clone(),
                    self.viewport,
                    now,
                ));
            }
        }
    }

    fn finish(&mut self, generation: u64, result: crate::error::Result<LayoutResult>) {
        if generation != self.generation {
            tracing::trace!(
                generation,
                current = self.generation,
                "dropping stale layout result"
            );
            return;
        }
        match result {
            Ok(layout) => {
                self.controller.invalidate_selection(Some(&layout));
                self.layout = Some(layout);
                self.take_pending_selection();
                self.render();
                self.status = RebuildStatus::Ready;
                tracing::debug!(generation, "diagram ready");
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: FlowError) {
        if err.is_user_visible() {
            tracing::warn!(%err, generation = self.generation, "diagram rebuild failed");
        } else {
            tracing::error!(%err, generation = self.generation, "diagram rebuild failed");
        }
        self.layout = None;
        self.scene = None;
        self.controller.invalidate_selection(None);
        self.status = RebuildStatus::Failed(err);
    }

    /// Hands a recorded host selection to the controller. Returns whether there was one.
    fn take_pending_selection(&mut self) -> bool {
        match self.pending_selection.take() {
            Some(step_id) => {
                self.controller
                    .set_external_selection(step_id.as_deref(), self.layout.as_ref());
                true
            }
            None => false,
        }
    }

    fn render(&mut self) {
        if let Some(layout) = &self.layout {
            self.scene = Some(render_scene(
                layout,
                &self.settings,
                &self.theme,
                &self.config.layout,
                self.controller.selection(),
            ));
            self.render_count += 1;
        }
    }

    pub fn pointer_down(&mut self, event: PointerEvent) {
        if let Some(scene) = &self.scene {
            self.controller.pointer_down(event, scene);
        }
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> PointerMove {
        let moved = match &mut self.layout {
            Some(layout) => self.controller.pointer_move(event, layout),
            None => PointerMove::None,
        };
        if matches!(moved, PointerMove::MovedNode(_)) {
            self.render();
        }
        moved
    }

    pub fn pointer_up(&mut self, event: PointerEvent) -> PointerMove {
        let moved = match &mut self.layout {
            Some(layout) => self.controller.pointer_up(event, layout),
            None => PointerMove::None,
        };
        if matches!(moved, PointerMove::MovedNode(_)) {
            self.render();
        }
        moved
    }

    pub fn click(&mut self, event: PointerEvent) -> ClickOutcome {
        let outcome = match &self.scene {
            Some(scene) => self.controller.click(event, scene),
            None => ClickOutcome::Ignored,
        };
        if matches!(outcome, ClickOutcome::Selected(_)) {
            self.render();
        }
        outcome
    }

    pub fn wheel(&mut self, x: f32, y: f32, factor: f32) {
        self.controller.zoom_at(x, y, factor);
    }

    pub fn status(&self) -> &RebuildStatus {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.worker.is_some()
    }

    pub fn layout(&self) -> Option<&LayoutResult> {
        self.layout.as_ref()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn graph(&self) -> Option<&FlowGraph> {
        self.graph.as_deref()
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn selection(&self) -> Option<&str> {
        self.controller.selection()
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut InteractionController {
        &mut self.controller
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of scenes produced so far.
    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    pub fn to_svg(&self) -> Option<String> {
        self.scene.as_ref().map(|scene| {
            scene_to_svg(
                scene,
                &self.theme,
                &self.config.layout,
                &self.controller.transform(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiagramKind, LinkValue, SankeyAlign};
    use crate::layout::boxline::tests::DiagonalBackend;
    use crate::layout::{BackendGraph, BoxLineLayout};
    use std::time::Duration;

    fn fork() -> Vec<FlowStep> {
        vec![
            FlowStep::new("A").with_items(10.0).feeding("B", "ore", 10.0),
            FlowStep::new("B")
                .with_items(10.0)
                .feeding("C", "plate", 6.0)
                .feeding("D", "plate", 4.0),
            FlowStep::new("C"),
            FlowStep::new("D"),
        ]
    }

    fn pair() -> Vec<FlowStep> {
        vec![FlowStep::new("A").feeding("B", "x", 1.0), FlowStep::new("B")]
    }

    fn cycle() -> Vec<FlowStep> {
        vec![
            FlowStep::new("A").feeding("B", "x", 1.0),
            FlowStep::new("B").feeding("A", "y", 1.0),
        ]
    }

    fn ready_session() -> DiagramSession {
        let mut session = DiagramSession::new(Config::default());
        session.submit(SessionEvent::FlowData(fork()));
        session.flush(Instant::now());
        assert_eq!(session.status(), &RebuildStatus::Ready);
        session
    }

    fn boxline_settings() -> FlowSettings {
        FlowSettings {
            diagram: DiagramKind::BoxLine,
            ..Default::default()
        }
    }

    fn wait_ready(session: &mut DiagramSession) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while session.is_busy() && Instant::now() < deadline {
            session.poll(Instant::now());
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    struct StalledBackend;

    impl LayoutBackend for StalledBackend {
        fn name(&self) -> &'static str {
            "stalled"
        }

        fn solve(&self, graph: &BackendGraph) -> crate::error::Result<Vec<(f32, f32)>> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(vec![(0.0, 0.0); graph.nodes.len()])
        }
    }

    #[test]
    fn theme_before_any_flow_data_stays_idle_until_data_arrives() {
        let mut session = DiagramSession::new(Config::default());
        assert_eq!(session.status(), &RebuildStatus::Idle);
        // No steps yet: the theme is recorded for the first build instead of
        // starting one.
        session.submit(SessionEvent::Theme(Theme::dark()));
        session.flush(Instant::now());
        assert_eq!(session.status(), &RebuildStatus::Idle);
        assert_eq!(session.generation(), 0);

        session.submit(SessionEvent::FlowData(fork()));
        session.flush(Instant::now());
        assert_eq!(session.status(), &RebuildStatus::Ready);
        assert_eq!(session.generation(), 1);
        assert_eq!(session.layout().unwrap().node_count(), 4);
        assert_eq!(session.render_count(), 1);
        assert_eq!(session.theme(), &Theme::dark());
    }

    #[test]
    fn bursts_are_coalesced_into_one_build() {
        let mut session = ready_session();
        session.submit(SessionEvent::FlowData(cycle()));
        session.submit(SessionEvent::Settings(FlowSettings {
            sankey_align: SankeyAlign::Left,
            ..Default::default()
        }));
        session.submit(SessionEvent::FlowData(pair()));
        session.flush(Instant::now());
        assert_eq!(session.generation(), 2);
        assert_eq!(session.status(), &RebuildStatus::Ready);
        assert_eq!(session.layout().unwrap().node_count(), 2);
    }

    #[test]
    fn theme_change_rerenders_without_rebuilding() {
        let mut session = ready_session();
        let generation = session.generation();
        session.submit(SessionEvent::Theme(Theme::dark()));
        assert_eq!(session.flush(Instant::now()), &RebuildStatus::Ready);
        assert_eq!(session.generation(), generation);
        assert_eq!(session.render_count(), 2);
        assert!(session.to_svg().unwrap().contains(&Theme::dark().background));
    }

    #[test]
    fn render_only_settings_keep_the_layout() {
        let mut session = ready_session();
        let before = session.layout().cloned();
        session.submit(SessionEvent::Settings(FlowSettings {
            link_text: LinkValue::Percent,
            ..Default::default()
        }));
        session.flush(Instant::now());
        assert_eq!(session.generation(), 1);
        assert_eq!(session.layout().cloned(), before);
        assert_eq!(session.render_count(), 2);
    }

    #[test]
    fn alignment_change_reuses_the_graph() {
        let mut session = ready_session();
        let graph = session.graph.clone().unwrap();
        session.submit(SessionEvent::Settings(FlowSettings {
            sankey_align: SankeyAlign::Right,
            ..Default::default()
        }));
        session.flush(Instant::now());
        assert_eq!(session.generation(), 2);
        assert!(Arc::ptr_eq(&graph, session.graph.as_ref().unwrap()));
    }

    #[test]
    fn cycle_fails_sankey_and_retries_on_new_data() {
        let mut session = DiagramSession::new(Config::default());
        session.submit(SessionEvent::FlowData(cycle()));
        session.flush(Instant::now());
        assert!(matches!(
            session.status().error(),
            Some(FlowError::CyclicGraph { .. })
        ));
        assert!(session.layout().is_none());

        session.submit(SessionEvent::Theme(Theme::dark()));
        session.flush(Instant::now());
        assert!(session.status().error().is_some());

        session.submit(SessionEvent::FlowData(fork()));
        session.flush(Instant::now());
        assert_eq!(session.status(), &RebuildStatus::Ready);
    }

    #[test]
    fn boxline_builds_in_background() {
        let mut config = Config::default();
        config.settings = boxline_settings();
        let mut session = DiagramSession::with_backend(config, Arc::new(DiagonalBackend));
        session.submit(SessionEvent::FlowData(cycle()));
        assert_eq!(session.flush(Instant::now()), &RebuildStatus::Building);
        wait_ready(&mut session);
        assert_eq!(session.status(), &RebuildStatus::Ready);
        assert_eq!(session.layout().unwrap().link_count(), 2);
    }

    #[test]
    fn superseded_boxline_result_is_never_applied() {
        let mut config = Config::default();
        config.settings = boxline_settings();
        let mut session = DiagramSession::with_backend(config, Arc::new(DiagonalBackend));
        session.submit(SessionEvent::FlowData(cycle()));
        session.flush(Instant::now());
        session.submit(SessionEvent::FlowData(fork()));
        session.flush(Instant::now());
        assert_eq!(session.generation(), 2);
        wait_ready(&mut session);
        assert_eq!(session.layout().unwrap().node_count(), 4);
        assert_eq!(session.render_count(), 1);
    }

    #[test]
    fn stale_generation_is_dropped() {
        let mut session = ready_session();
        let before = session.layout().cloned();
        session.finish(
            0,
            Ok(LayoutResult::BoxLine(BoxLineLayout {
                width: 1.0,
                height: 1.0,
                nodes: Vec::new(),
                links: Vec::new(),
            })),
        );
        assert_eq!(session.layout().cloned(), before);
    }

    #[test]
    fn slow_layout_times_out() {
        let mut config = Config::default();
        config.settings = boxline_settings();
        config.layout.boxline.budget_ms = 50;
        let mut session = DiagramSession::with_backend(config, Arc::new(StalledBackend));
        let start = Instant::now();
        session.submit(SessionEvent::FlowData(fork()));
        session.flush(start);
        assert_eq!(session.poll(start), &RebuildStatus::Building);
        let status = session.poll(start + Duration::from_millis(60)).clone();
        assert!(matches!(
            status,
            RebuildStatus::Failed(FlowError::LayoutTimeout { budget_ms: 50, .. })
        ));
        assert!(!session.is_busy());
    }

    #[test]
    fn external_selection_round_trips_and_survives_rebuild_only_if_present() {
        let mut session = ready_session();
        session.submit(SessionEvent::ExternalSelection(Some("C".to_string())));
        session.flush(Instant::now());
        assert_eq!(session.selection(), Some("C"));

        session.submit(SessionEvent::ExternalSelection(Some("zzz".to_string())));
        session.flush(Instant::now());
        assert_eq!(session.selection(), None);

        session.submit(SessionEvent::ExternalSelection(Some("D".to_string())));
        session.submit(SessionEvent::FlowData(pair()));
        session.flush(Instant::now());
        assert_eq!(session.selection(), None);
    }

    #[test]
    fn selection_made_during_boxline_build_applies_to_the_new_layout() {
        let mut config = Config::default();
        config.settings = boxline_settings();
        let mut session = DiagramSession::with_backend(config, Arc::new(StalledBackend));
        session.submit(SessionEvent::FlowData(pair()));
        session.flush(Instant::now());
        wait_ready(&mut session);
        assert_eq!(session.status(), &RebuildStatus::Ready);

        session.submit(SessionEvent::FlowData(fork()));
        assert_eq!(session.flush(Instant::now()), &RebuildStatus::Building);
        session.submit(SessionEvent::ExternalSelection(Some("C".to_string())));
        session.flush(Instant::now());
        assert_eq!(session.status(), &RebuildStatus::Building);

        wait_ready(&mut session);
        assert_eq!(session.status(), &RebuildStatus::Ready);
        assert!(session.layout().unwrap().contains_step("C"));
        assert_eq!(session.selection(), Some("C"));
        assert!(session.scene().unwrap().element_for_node("C").unwrap().selected);
    }

    #[test]
    fn inverted_scale_bounds_do_not_break_wheel_zoom() {
        let mut config = Config::default();
        config.interaction.min_scale = 4.0;
        config.interaction.max_scale = 2.0;
        let mut session = DiagramSession::new(config);
        session.submit(SessionEvent::FlowData(fork()));
        session.flush(Instant::now());
        session.wheel(10.0, 10.0, 1.1);
        assert_eq!(session.controller().transform().k, 2.0);
    }

    #[test]
    fn resize_refits_without_rebuilding() {
        let mut session = ready_session();
        let t0 = Instant::now();
        session.submit(SessionEvent::Viewport(Viewport::new(400.0, 300.0)));
        session.flush(t0);
        session.poll(t0 + Duration::from_millis(250));
        assert_eq!(session.generation(), 1);
        assert_eq!(session.status(), &RebuildStatus::Ready);
        assert!(session.controller().transform().k < 1.0);
    }
}
