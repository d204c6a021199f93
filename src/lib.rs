#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod interaction;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod session;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{
    Config, DiagramKind, FlowSettings, InteractionConfig, LayoutConfig, LinkValue, RenderConfig,
    SankeyAlign, load_config,
};
pub use error::{FlowError, Result};
pub use graph::{FlowGraph, NodeKind, build_graph};
pub use interaction::{ClickOutcome, InteractionController, PointerEvent, ViewTransform};
pub use ir::{FlowStep, StepTransfer, parse_flow_steps};
pub use layout::{LayoutResult, Viewport, compute_layout};
pub use render::{Scene, render_scene, scene_to_svg};
pub use session::{DiagramSession, RebuildStatus, SessionEvent};
pub use theme::Theme;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub theme: Theme,
    pub settings: FlowSettings,
    pub layout: LayoutConfig,
    pub viewport: Viewport,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::light()
    }
}

impl RenderOptions {
    pub fn light() -> Self {
        Self {
            theme: Theme::light(),
            settings: FlowSettings::default(),
            layout: LayoutConfig::default(),
            viewport: Viewport::default(),
        }
    }

    pub fn dark() -> Self {
        Self {
            theme: Theme::dark(),
            ..Self::light()
        }
    }
}

/// One-shot build, layout and render to SVG. Box-line layout runs inline.
pub fn render_flow(steps: &[FlowStep], options: &RenderOptions) -> Result<String> {
    let graph = build_graph(steps, &options.settings)?;
    let layout = compute_layout(
        &graph,
        &options.settings,
        &options.theme,
        &options.layout,
        options.viewport,
    )?;
    let scene = render_scene(&layout, &options.settings, &options.theme, &options.layout, None);
    Ok(scene_to_svg(
        &scene,
        &options.theme,
        &options.layout,
        &ViewTransform::identity(),
    ))
}
