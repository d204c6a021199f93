use crate::config::DiagramKind;
use crate::graph::{LinkQuantities, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(960.0, 540.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn empty() -> Self {
        Self {
            min_x: f32::INFINITY,
            min_y: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            max_y: f32::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn include_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x + width);
        self.max_y = self.max_y.max(y + height);
    }

    pub fn width(&self) -> f32 {
        if self.is_empty() { 0.0 } else { self.max_x - self.min_x }
    }

    pub fn height(&self) -> f32 {
        if self.is_empty() { 0.0 } else { self.max_y - self.min_y }
    }

    pub fn center(&self) -> (f32, f32) {
        if self.is_empty() {
            return (0.0, 0.0);
        }
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SankeyNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub step_ids: Vec<String>,
    pub color: Option<String>,
    pub value: f32,
    pub depth: usize,
    pub column: usize,
    pub x0: f32,
    pub x1: f32,
    pub y0: f32,
    pub y1: f32,
}

impl SankeyNode {
    /// Vertical extent; zero when the extent was never resolved.
    pub fn height(&self) -> f32 {
        let height = self.y1 - self.y0;
        if height.is_finite() && height > 0.0 {
            height
        } else {
            0.0
        }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SankeyLink {
    pub id: String,
    pub source: usize,
    pub target: usize,
    pub item_id: String,
    pub value: f32,
    pub quantities: LinkQuantities,
    /// Thickness, proportional to `value`.
    pub width: f32,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl SankeyLink {
    /// Horizontal cubic curve through the link's centerline.
    pub fn path(&self) -> String {
        let mid = (self.x0 + self.x1) / 2.0;
        format!(
            "M {:.2} {:.2} C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
            self.x0, self.y0, mid, self.y0, mid, self.y1, self.x1, self.y1
        )
    }

    pub fn point_at(&self, t: f32) -> (f32, f32) {
        let mid = (self.x0 + self.x1) / 2.0;
        let u = 1.0 - t;
        let x = u * u * u * self.x0 + 3.0 * u * u * t * mid + 3.0 * u * t * t * mid
            + t * t * t * self.x1;
        let y = u * u * u * self.y0 + 3.0 * u * u * t * self.y0 + 3.0 * u * t * t * self.y1
            + t * t * t * self.y1;
        (x, y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SankeyLayout {
    pub width: f32,
    pub height: f32,
    pub node_width: f32,
    pub columns: usize,
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub step_ids: Vec<String>,
    pub color: Option<String>,
    /// Center.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoxNode {
    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::empty();
        bounds.include_rect(
            self.x - self.width / 2.0,
            self.y - self.height / 2.0,
            self.width,
            self.height,
        );
        bounds
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxLink {
    pub id: String,
    pub source: usize,
    pub target: usize,
    pub item_id: String,
    pub quantities: LinkQuantities,
    pub width: f32,
    /// Perpendicular offset of the control point; zero draws a straight line.
    pub bend: f32,
}

impl BoxLink {
    /// Start, control and end points between the two node centers.
    pub fn control_points(&self, nodes: &[BoxNode]) -> [(f32, f32); 3] {
        let from = &nodes[self.source];
        let to = &nodes[self.target];
        if self.source == self.target {
            let top = from.y - from.height / 2.0;
            let reach = from.height.max(24.0);
            return [
                (from.x - from.width / 4.0, top),
                (from.x, top - reach),
                (from.x + from.width / 4.0, top),
            ];
        }
        let (sx, sy) = (from.x, from.y);
        let (tx, ty) = (to.x, to.y);
        let (mx, my) = ((sx + tx) / 2.0, (sy + ty) / 2.0);
        let (dx, dy) = (tx - sx, ty - sy);
        let len = (dx * dx + dy * dy).sqrt().max(f32::EPSILON);
        let (nx, ny) = (-dy / len, dx / len);
        [(sx, sy), (mx + nx * self.bend, my + ny * self.bend), (tx, ty)]
    }

    pub fn path(&self, nodes: &[BoxNode]) -> String {
        let [start, control, end] = self.control_points(nodes);
        if self.bend == 0.0 && self.source != self.target {
            return format!(
                "M {:.2} {:.2} L {:.2} {:.2}",
                start.0, start.1, end.0, end.1
            );
        }
        format!(
            "M {:.2} {:.2} Q {:.2} {:.2} {:.2} {:.2}",
            start.0, start.1, control.0, control.1, end.0, end.1
        )
    }

    pub fn point_at(&self, nodes: &[BoxNode], t: f32) -> (f32, f32) {
        let [p0, p1, p2] = self.control_points(nodes);
        let u = 1.0 - t;
        (
            u * u * p0.0 + 2.0 * u * t * p1.0 + t * t * p2.0,
            u * u * p0.1 + 2.0 * u * t * p1.1 + t * t * p2.1,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxLineLayout {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<BoxNode>,
    pub links: Vec<BoxLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutResult {
    Sankey(SankeyLayout),
    BoxLine(BoxLineLayout),
}

impl LayoutResult {
    pub fn kind(&self) -> DiagramKind {
        match self {
            LayoutResult::Sankey(_) => DiagramKind::Sankey,
            LayoutResult::BoxLine(_) => DiagramKind::BoxLine,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    pub fn node_count(&self) -> usize {
        match self {
            LayoutResult::Sankey(layout) => layout.nodes.len(),
            LayoutResult::BoxLine(layout) => layout.nodes.len(),
        }
    }

    pub fn link_count(&self) -> usize {
        match self {
            LayoutResult::Sankey(layout) => layout.links.len(),
            LayoutResult::BoxLine(layout) => layout.links.len(),
        }
    }

    pub fn width(&self) -> f32 {
        match self {
            LayoutResult::Sankey(layout) => layout.width,
            LayoutResult::BoxLine(layout) => layout.width,
        }
    }

    pub fn height(&self) -> f32 {
        match self {
            LayoutResult::Sankey(layout) => layout.height,
            LayoutResult::BoxLine(layout) => layout.height,
        }
    }

    pub fn node_ids(&self) -> Vec<&str> {
        match self {
            LayoutResult::Sankey(layout) => layout.nodes.iter().map(|n| n.id.as_str()).collect(),
            LayoutResult::BoxLine(layout) => layout.nodes.iter().map(|n| n.id.as_str()).collect(),
        }
    }

    pub fn step_ids(&self, node_id: &str) -> Option<&[String]> {
        match self {
            LayoutResult::Sankey(layout) => layout
                .nodes
                .iter()
                .find(|n| n.id == node_id)
                .map(|n| n.step_ids.as_slice()),
            LayoutResult::BoxLine(layout) => layout
                .nodes
                .iter()
                .find(|n| n.id == node_id)
                .map(|n| n.step_ids.as_slice()),
        }
    }

    pub fn contains_step(&self, step_id: &str) -> bool {
        match self {
            LayoutResult::Sankey(layout) => layout
                .nodes
                .iter()
                .any(|n| n.step_ids.iter().any(|s| s == step_id)),
            LayoutResult::BoxLine(layout) => layout
                .nodes
                .iter()
                .any(|n| n.step_ids.iter().any(|s| s == step_id)),
        }
    }

    /// Top-left corner of the node's shape.
    pub fn node_origin(&self, node_id: &str) -> Option<(f32, f32)> {
        match self {
            LayoutResult::Sankey(layout) => layout
                .nodes
                .iter()
                .find(|n| n.id == node_id)
                .map(|n| (n.x0, n.y0)),
            LayoutResult::BoxLine(layout) => layout
                .nodes
                .iter()
                .find(|n| n.id == node_id)
                .map(|n| (n.x - n.width / 2.0, n.y - n.height / 2.0)),
        }
    }

    /// Shifts one node and the link ends attached to it. Returns false for unknown ids.
    pub fn move_node(&mut self, node_id: &str, dx: f32, dy: f32) -> bool {
        match self {
            LayoutResult::Sankey(layout) => {
                let Some(idx) = layout.nodes.iter().position(|n| n.id == node_id) else {
                    return false;
                };
                let node = &mut layout.nodes[idx];
                node.x0 += dx;
                node.x1 += dx;
                node.y0 += dy;
                node.y1 += dy;
                for link in &mut layout.links {
                    if link.source == idx {
                        link.x0 += dx;
                        link.y0 += dy;
                    }
                    if link.target == idx {
                        link.x1 += dx;
                        link.y1 += dy;
                    }
                }
                true
            }
            LayoutResult::BoxLine(layout) => {
                let Some(node) = layout.nodes.iter_mut().find(|n| n.id == node_id) else {
                    return false;
                };
                node.x += dx;
                node.y += dy;
                true
            }
        }
    }

    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::empty();
        match self {
            LayoutResult::Sankey(layout) => {
                for node in &layout.nodes {
                    bounds.include_rect(node.x0, node.y0, node.width(), node.height());
                }
            }
            LayoutResult::BoxLine(layout) => {
                for node in &layout.nodes {
                    let b = node.bounds();
                    bounds.include_rect(b.min_x, b.min_y, b.width(), b.height());
                }
            }
        }
        bounds
    }
}
