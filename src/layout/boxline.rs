use std::collections::{HashMap, HashSet};

use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};

use crate::config::LayoutConfig;
use crate::error::{FlowError, Result};
use crate::graph::{FlowGraph, NodeKind};
use crate::theme::Theme;

use super::text::measure_label;
use super::{Bounds, BoxLineLayout, BoxLink, BoxNode, Viewport};

const PARALLEL_LINK_SPACING: f32 = 24.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BackendNode {
    pub id: String,
    pub width: f32,
    pub height: f32,
}

/// Everything a position solver gets to see.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendGraph {
    pub nodes: Vec<BackendNode>,
    /// Node index pairs; may contain cycles, self loops and duplicates.
    pub edges: Vec<(usize, usize)>,
    pub node_spacing: f32,
    pub rank_spacing: f32,
}

/// General graph layout solver: node sizes and edges in, node centers out
/// (one per input node, same order).
pub trait LayoutBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, graph: &BackendGraph) -> Result<Vec<(f32, f32)>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DagreBackend;

impl LayoutBackend for DagreBackend {
    fn name(&self) -> &'static str {
        "dagre"
    }

    fn solve(&self, graph: &BackendGraph) -> Result<Vec<(f32, f32)>> {
        if graph.nodes.is_empty() {
            return Ok(Vec::new());
        }

        let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
            DagreGraph::new(Some(GraphOption {
                directed: Some(true),
                multigraph: Some(false),
                compound: Some(false),
            }));

        let mut graph_config = DagreConfig::default();
        graph_config.rankdir = Some("lr".to_string());
        graph_config.nodesep = Some(graph.node_spacing);
        graph_config.ranksep = Some(graph.rank_spacing);
        graph_config.marginx = Some(0.0);
        graph_config.marginy = Some(0.0);
        dagre_graph.set_graph(graph_config);

        for node in &graph.nodes {
            let mut dagre_node = DagreNode::default();
            dagre_node.width = node.width;
            dagre_node.height = node.height;
            dagre_graph.set_node(node.id.clone(), Some(dagre_node));
        }

        let mut edge_set: HashSet<(usize, usize)> = HashSet::new();
        for &(from, to) in &graph.edges {
            if from == to || !edge_set.insert((from, to)) {
                continue;
            }
            let (Some(from_node), Some(to_node)) = (graph.nodes.get(from), graph.nodes.get(to))
            else {
                return Err(FlowError::Backend {
                    message: format!("edge ({from}, {to}) references a missing node"),
                });
            };
            let _ = dagre_graph.set_edge(&from_node.id, &to_node.id, Some(DagreEdge::default()), None);
        }

        dagre_layout::run_layout(&mut dagre_graph);

        graph
            .nodes
            .iter()
            .map(|node| {
                dagre_graph
                    .node(&node.id)
                    .map(|placed| (placed.x, placed.y))
                    .filter(|(x, y)| x.is_finite() && y.is_finite())
                    .ok_or_else(|| FlowError::Backend {
                        message: format!("dagre did not place node `{}`", node.id),
                    })
            })
            .collect()
    }
}

fn node_size(
    kind: NodeKind,
    label: &str,
    theme: &Theme,
    config: &LayoutConfig,
) -> (f32, f32) {
    let boxline = &config.boxline;
    match kind {
        NodeKind::Recipe => {
            let block = measure_label(label, theme, config);
            (
                block.width + boxline.node_padding_x * 2.0,
                block.height + boxline.node_padding_y * 2.0,
            )
        }
        NodeKind::Item => {
            let diameter = boxline.item_radius * 2.0;
            (diameter, diameter)
        }
    }
}

/// Bend per link so parallel and opposing links between one pair fan out.
fn link_bends(graph: &FlowGraph) -> Vec<f32> {
    let mut groups: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (idx, link) in graph.links.iter().enumerate() {
        let key = (link.source.min(link.target), link.source.max(link.target));
        groups.entry(key).or_default().push(idx);
    }
    let mut bends = vec![0.0f32; graph.links.len()];
    for members in groups.values() {
        let count = members.len() as f32;
        for (pos, &link_idx) in members.iter().enumerate() {
            let link = &graph.links[link_idx];
            if link.source == link.target {
                continue;
            }
            let offset = (pos as f32 - (count - 1.0) / 2.0) * PARALLEL_LINK_SPACING;
            bends[link_idx] = if link.source <= link.target { offset } else { -offset };
        }
    }
    bends
}

pub fn compute_boxline_layout(
    graph: &FlowGraph,
    backend: &dyn LayoutBackend,
    theme: &Theme,
    config: &LayoutConfig,
    viewport: Viewport,
) -> Result<BoxLineLayout> {
    let sizes: Vec<(f32, f32)> = graph
        .nodes
        .iter()
        .map(|node| node_size(node.kind, &node.label, theme, config))
        .collect();

    let input = BackendGraph {
        nodes: graph
            .nodes
            .iter()
            .zip(&sizes)
            .map(|(node, &(width, height))| BackendNode {
                id: node.id.clone(),
                width,
                height,
            })
            .collect(),
        edges: graph
            .links
            .iter()
            .map(|link| (link.source, link.target))
            .collect(),
        node_spacing: config.boxline.node_spacing,
        rank_spacing: config.boxline.rank_spacing,
    };
    let centers = backend.solve(&input)?;
    if centers.len() != graph.nodes.len() {
        return Err(FlowError::Backend {
            message: format!(
                "{} returned {} positions for {} nodes",
                backend.name(),
                centers.len(),
                graph.nodes.len()
            ),
        });
    }

    let mut bounds = Bounds::empty();
    for (&(x, y), &(width, height)) in centers.iter().zip(&sizes) {
        bounds.include_rect(x - width / 2.0, y - height / 2.0, width, height);
    }
    let margin = config.boxline.margin;
    let width = (bounds.width() + margin * 2.0).max(viewport.width);
    let height = (bounds.height() + margin * 2.0).max(viewport.height);
    let (cx, cy) = bounds.center();
    let (dx, dy) = (width / 2.0 - cx, height / 2.0 - cy);

    let nodes: Vec<BoxNode> = graph
        .nodes
        .iter()
        .zip(centers.iter().zip(&sizes))
        .map(|(node, (&(x, y), &(w, h)))| BoxNode {
            id: node.id.clone(),
            label: node.label.clone(),
            kind: node.kind,
            step_ids: node.step_ids.clone(),
            color: node.color.clone(),
            x: x + dx,
            y: y + dy,
            width: w,
            height: h,
        })
        .collect();

    let bends = link_bends(graph);
    let links: Vec<BoxLink> = graph
        .links
        .iter()
        .zip(bends)
        .map(|(link, bend)| BoxLink {
            id: link.id.clone(),
            source: link.source,
            target: link.target,
            item_id: link.item_id.clone(),
            quantities: link.quantities,
            width: config.boxline.link_width,
            bend,
        })
        .collect();

    tracing::debug!(
        backend = backend.name(),
        nodes = nodes.len(),
        links = links.len(),
        "computed box-line layout"
    );

    Ok(BoxLineLayout {
        width,
        height,
        nodes,
        links,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{DiagramKind, FlowSettings};
    use crate::graph::build_graph;
    use crate::ir::FlowStep;

    /// Places nodes on a diagonal; keeps tests independent of dagre.
    pub(crate) struct DiagonalBackend;

    impl LayoutBackend for DiagonalBackend {
        fn name(&self) -> &'static str {
            "diagonal"
        }

        fn solve(&self, graph: &BackendGraph) -> Result<Vec<(f32, f32)>> {
            Ok((0..graph.nodes.len())
                .map(|idx| (idx as f32 * 100.0, idx as f32 * 50.0))
                .collect())
        }
    }

    struct ShortBackend;

    impl LayoutBackend for ShortBackend {
        fn name(&self) -> &'static str {
            "short"
        }

        fn solve(&self, _graph: &BackendGraph) -> Result<Vec<(f32, f32)>> {
            Ok(Vec::new())
        }
    }

    fn cycle_graph() -> FlowGraph {
        let steps = vec![
            FlowStep::new("A").with_recipe("gear").feeding("B", "x", 1.0),
            FlowStep::new("B").feeding("A", "y", 1.0),
        ];
        let settings = FlowSettings {
            diagram: DiagramKind::BoxLine,
            ..Default::default()
        };
        build_graph(&steps, &settings).unwrap()
    }

    #[test]
    fn cycle_lays_out_with_distinct_connectors() {
        let graph = cycle_graph();
        let layout = compute_boxline_layout(
            &graph,
            &DiagonalBackend,
            &Theme::light(),
            &LayoutConfig::default(),
            Viewport::new(400.0, 300.0),
        )
        .unwrap();
        assert_eq!(layout.nodes.len(), 2);
        assert_eq!(layout.links.len(), 2);
        let a = layout.links[0].point_at(&layout.nodes, 0.5);
        let b = layout.links[1].point_at(&layout.nodes, 0.5);
        assert!((a.0 - b.0).abs() + (a.1 - b.1).abs() > 1.0);
    }

    #[test]
    fn nodes_are_centered_in_viewport_and_sized_by_kind() {
        let graph = cycle_graph();
        let config = LayoutConfig::default();
        let layout = compute_boxline_layout(
            &graph,
            &DiagonalBackend,
            &Theme::light(),
            &config,
            Viewport::new(1000.0, 800.0),
        )
        .unwrap();
        assert_eq!(layout.width, 1000.0);
        let a = &layout.nodes[0];
        let b = &layout.nodes[1];
        assert!(a.width > a.height, "recipe box should be wider than tall");
        assert_eq!(b.width, config.boxline.item_radius * 2.0);
        let mid_x = (a.x + b.x) / 2.0;
        assert!((mid_x - 500.0).abs() < 60.0);
        assert!((b.x - a.x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn backend_position_mismatch_is_an_error() {
        let err = compute_boxline_layout(
            &cycle_graph(),
            &ShortBackend,
            &Theme::light(),
            &LayoutConfig::default(),
            Viewport::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FlowError::Backend { .. }));
    }

    #[test]
    fn single_link_is_straight() {
        let steps = vec![FlowStep::new("A").feeding("B", "x", 1.0), FlowStep::new("B")];
        let graph = build_graph(&steps, &FlowSettings::default()).unwrap();
        let bends = link_bends(&graph);
        assert_eq!(bends, vec![0.0]);
    }

    #[test]
    fn dagre_places_every_node() {
        let graph = cycle_graph();
        let layout = compute_boxline_layout(
            &graph,
            &DagreBackend,
            &Theme::light(),
            &LayoutConfig::default(),
            Viewport::default(),
        )
        .unwrap();
        assert_eq!(layout.nodes.len(), 2);
        assert!(layout.nodes.iter().all(|n| n.x.is_finite() && n.y.is_finite()));
        assert_ne!(
            (layout.nodes[0].x, layout.nodes[0].y),
            (layout.nodes[1].x, layout.nodes[1].y)
        );
    }
}
