pub mod align;
pub mod boxline;
mod sankey;
pub(crate) mod text;
pub(crate) mod types;
pub mod worker;
pub use boxline::{BackendGraph, BackendNode, DagreBackend, LayoutBackend, compute_boxline_layout};
pub use sankey::compute_sankey_layout;
pub use types::*;
pub use worker::{JobPoll, LayoutWorker};

use crate::config::{DiagramKind, FlowSettings, LayoutConfig};
use crate::error::Result;
use crate::graph::FlowGraph;
use crate::theme::Theme;

/// Lays the graph out synchronously with the variant `settings.diagram` selects.
pub fn compute_layout(
    graph: &FlowGraph,
    settings: &FlowSettings,
    theme: &Theme,
    config: &LayoutConfig,
    viewport: Viewport,
) -> Result<LayoutResult> {
    match settings.diagram {
        DiagramKind::Sankey => compute_sankey_layout(
            graph,
            settings.sankey_align,
            settings.link_size,
            &config.sankey,
            viewport,
        )
        .map(LayoutResult::Sankey),
        DiagramKind::BoxLine => {
            compute_boxline_layout(graph, &DagreBackend, theme, config, viewport)
                .map(LayoutResult::BoxLine)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::ir::FlowStep;

    #[test]
    fn dispatches_on_diagram_kind() {
        let steps = vec![FlowStep::new("A").feeding("B", "x", 1.0), FlowStep::new("B")];
        let mut settings = FlowSettings::default();
        let graph = build_graph(&steps, &settings).unwrap();
        let layout = compute_layout(
            &graph,
            &settings,
            &Theme::light(),
            &LayoutConfig::default(),
            Viewport::default(),
        )
        .unwrap();
        assert_eq!(layout.kind(), DiagramKind::Sankey);

        settings.diagram = DiagramKind::BoxLine;
        let layout = compute_layout(
            &graph,
            &settings,
            &Theme::light(),
            &LayoutConfig::default(),
            Viewport::default(),
        )
        .unwrap();
        assert_eq!(layout.kind(), DiagramKind::BoxLine);
        assert_eq!(layout.node_count(), 2);
        assert_eq!(layout.link_count(), 1);
    }

    #[test]
    fn move_node_drags_attached_link_ends() {
        let steps = vec![
            FlowStep::new("A").feeding("B", "x", 1.0),
            FlowStep::new("B"),
        ];
        let graph = build_graph(&steps, &FlowSettings::default()).unwrap();
        let mut layout = compute_layout(
            &graph,
            &FlowSettings::default(),
            &Theme::light(),
            &LayoutConfig::default(),
            Viewport::default(),
        )
        .unwrap();
        let before = layout.node_origin("B").unwrap();
        assert!(layout.move_node("B", 10.0, -5.0));
        assert!(!layout.move_node("nope", 1.0, 1.0));
        assert_eq!(layout.node_origin("B").unwrap(), (before.0 + 10.0, before.1 - 5.0));
        let LayoutResult::Sankey(sankey) = &layout else {
            panic!("expected sankey");
        };
        assert_eq!(sankey.links[0].x1, sankey.nodes[1].x0);
    }
}
