use crate::config::{FlowSettings, LayoutConfig, LinkValue, RenderConfig};
use crate::graph::{LinkQuantities, NodeKind};
use crate::interaction::ViewTransform;
use crate::layout::text::measure_label;
use crate::layout::{BoxLineLayout, LayoutResult, SankeyLayout};
use crate::theme::{Theme, blend_colors};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

const LABEL_GAP: f32 = 6.0;
const LINK_HIT_SAMPLES: usize = 16;
const LINK_HIT_SLOP: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    fn as_svg(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
    },
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
    },
    Path {
        d: String,
        /// Polyline approximation used for hit testing.
        samples: Vec<(f32, f32)>,
    },
    Text {
        x: f32,
        y: f32,
        anchor: TextAnchor,
        lines: Vec<String>,
    },
}

/// What a rendered element stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Node {
        node_id: String,
        step_ids: Vec<String>,
    },
    Link {
        link_id: String,
        source: String,
        target: String,
        step_ids: Vec<String>,
    },
}

impl HitTarget {
    pub fn step_ids(&self) -> &[String] {
        match self {
            HitTarget::Node { step_ids, .. } | HitTarget::Link { step_ids, .. } => step_ids,
        }
    }

    pub fn node_id(&self) -> Option<&str> {
        match self {
            HitTarget::Node { node_id, .. } => Some(node_id),
            HitTarget::Link { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneElement {
    pub id: String,
    pub shape: Shape,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f32,
    pub opacity: f32,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f32,
    pub height: f32,
    pub elements: Vec<SceneElement>,
    targets: BTreeMap<String, HitTarget>,
}

impl Scene {
    pub fn empty(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
            targets: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn target(&self, element_id: &str) -> Option<&HitTarget> {
        self.targets.get(element_id)
    }

    /// Element id -> target for every interactive element.
    pub fn targets(&self) -> &BTreeMap<String, HitTarget> {
        &self.targets
    }

    pub fn element(&self, element_id: &str) -> Option<&SceneElement> {
        self.elements.iter().find(|el| el.id == element_id)
    }

    pub fn element_for_node(&self, node_id: &str) -> Option<&SceneElement> {
        self.element(&node_element_id(node_id))
    }

    /// Topmost interactive element under a point in diagram coordinates.
    /// Nodes win over links.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<(&str, &HitTarget)> {
        let mut link_hit = None;
        for element in self.elements.iter().rev() {
            let Some(target) = self.targets.get(&element.id) else {
                continue;
            };
            let inside = match &element.shape {
                Shape::Rect {
                    x: rx,
                    y: ry,
                    width,
                    height,
                    ..
                } => x >= *rx && x <= rx + width && y >= *ry && y <= ry + height,
                Shape::Circle { cx, cy, r } => {
                    let (dx, dy) = (x - cx, y - cy);
                    dx * dx + dy * dy <= r * r
                }
                Shape::Path { samples, .. } => {
                    if link_hit.is_some() {
                        false
                    } else {
                        near_polyline(samples, x, y, element.stroke_width / 2.0 + LINK_HIT_SLOP)
                    }
                }
                Shape::Text { .. } => false,
            };
            if !inside {
                continue;
            }
            match target {
                HitTarget::Node { .. } => return Some((element.id.as_str(), target)),
                HitTarget::Link { .. } => link_hit = Some((element.id.as_str(), target)),
            }
        }
        link_hit
    }
}

pub fn node_element_id(node_id: &str) -> String {
    format!("node-{node_id}")
}

pub fn link_element_id(link_id: &str) -> String {
    format!("link-{link_id}")
}

fn near_polyline(points: &[(f32, f32)], x: f32, y: f32, tolerance: f32) -> bool {
    points.windows(2).any(|pair| {
        let ((ax, ay), (bx, by)) = (pair[0], pair[1]);
        let (vx, vy) = (bx - ax, by - ay);
        let len_sq = vx * vx + vy * vy;
        let t = if len_sq > 0.0 {
            (((x - ax) * vx + (y - ay) * vy) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let (px, py) = (ax + vx * t, ay + vy * t);
        (x - px).powi(2) + (y - py).powi(2) <= tolerance * tolerance
    })
}

fn sample_curve(point_at: impl Fn(f32) -> (f32, f32)) -> Vec<(f32, f32)> {
    (0..=LINK_HIT_SAMPLES)
        .map(|i| point_at(i as f32 / LINK_HIT_SAMPLES as f32))
        .collect()
}

fn format_number(value: f64, precision: Option<usize>) -> String {
    match precision {
        Some(digits) => format!("{value:.digits$}"),
        None => {
            let text = format!("{value:.3}");
            let text = text.trim_end_matches('0').trim_end_matches('.');
            if text.is_empty() || text == "-0" {
                "0".to_string()
            } else {
                text.to_string()
            }
        }
    }
}

/// Text shown on a link for the configured value mode, if any.
pub fn format_link_value(
    quantities: &LinkQuantities,
    mode: LinkValue,
    precision: Option<usize>,
) -> Option<String> {
    match mode {
        LinkValue::None => None,
        LinkValue::Percent => Some(format!(
            "{}%",
            format_number(quantities.share * 100.0, precision)
        )),
        other => Some(format_number(quantities.get(other), precision)),
    }
}

fn node_color(theme: &Theme, color: &Option<String>, idx: usize) -> String {
    color
        .clone()
        .unwrap_or_else(|| theme.palette_color(idx).to_string())
}

fn is_selected(step_ids: &[String], selection: Option<&str>) -> bool {
    selection.is_some_and(|sel| step_ids.iter().any(|id| id == sel))
}

struct SceneBuilder<'a> {
    theme: &'a Theme,
    settings: &'a FlowSettings,
    scene: Scene,
}

impl SceneBuilder<'_> {
    fn push(&mut self, element: SceneElement, target: Option<HitTarget>) {
        if let Some(target) = target {
            self.scene.targets.insert(element.id.clone(), target);
        }
        self.scene.elements.push(element);
    }

    fn text(&mut self, id: String, x: f32, y: f32, anchor: TextAnchor, lines: Vec<String>) {
        let element = SceneElement {
            id,
            shape: Shape::Text {
                x,
                y,
                anchor,
                lines,
            },
            fill: self.theme.text_color.clone(),
            stroke: "none".to_string(),
            stroke_width: 0.0,
            opacity: 1.0,
            selected: false,
        };
        self.push(element, None);
    }

    fn link_label(&mut self, link_id: &str, quantities: &LinkQuantities, at: (f32, f32)) {
        if let Some(text) =
            format_link_value(quantities, self.settings.link_text, self.settings.precision)
        {
            self.text(
                format!("link-label-{link_id}"),
                at.0,
                at.1,
                TextAnchor::Middle,
                vec![text],
            );
        }
    }
}

fn render_sankey(builder: &mut SceneBuilder<'_>, layout: &SankeyLayout, selection: Option<&str>) {
    let theme = builder.theme;
    let colors: Vec<String> = layout
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| node_color(theme, &node.color, idx))
        .collect();

    for link in &layout.links {
        let source = &layout.nodes[link.source];
        let target = &layout.nodes[link.target];
        let touches_selection =
            is_selected(&source.step_ids, selection) || is_selected(&target.step_ids, selection);
        let mut step_ids = source.step_ids.clone();
        step_ids.extend(target.step_ids.iter().cloned());
        builder.push(
            SceneElement {
                id: link_element_id(&link.id),
                shape: Shape::Path {
                    d: link.path(),
                    samples: sample_curve(|t| link.point_at(t)),
                },
                fill: "none".to_string(),
                stroke: colors[link.source].clone(),
                stroke_width: link.width.max(1.0),
                opacity: if touches_selection {
                    (theme.link_opacity * 1.6).min(1.0)
                } else {
                    theme.link_opacity
                },
                selected: touches_selection,
            },
            Some(HitTarget::Link {
                link_id: link.id.clone(),
                source: source.id.clone(),
                target: target.id.clone(),
                step_ids,
            }),
        );
    }

    for (idx, node) in layout.nodes.iter().enumerate() {
        let selected = is_selected(&node.step_ids, selection);
        builder.push(
            SceneElement {
                id: node_element_id(&node.id),
                shape: Shape::Rect {
                    x: node.x0,
                    y: node.y0,
                    width: node.width(),
                    height: node.height(),
                    radius: 0.0,
                },
                fill: colors[idx].clone(),
                stroke: if selected {
                    theme.selection_color.clone()
                } else {
                    theme.node_stroke.clone()
                },
                stroke_width: if selected { 2.0 } else { 1.0 },
                opacity: 1.0,
                selected,
            },
            Some(HitTarget::Node {
                node_id: node.id.clone(),
                step_ids: node.step_ids.clone(),
            }),
        );
    }

    for node in &layout.nodes {
        let (x, anchor) = if node.x0 < layout.width / 2.0 {
            (node.x1 + LABEL_GAP, TextAnchor::Start)
        } else {
            (node.x0 - LABEL_GAP, TextAnchor::End)
        };
        builder.text(
            format!("label-{}", node.id),
            x,
            (node.y0 + node.y1) / 2.0,
            anchor,
            vec![node.label.clone()],
        );
    }

    for link in &layout.links {
        builder.link_label(&link.id, &link.quantities, link.point_at(0.5));
    }
}

fn render_boxline(
    builder: &mut SceneBuilder<'_>,
    layout: &BoxLineLayout,
    config: &LayoutConfig,
    selection: Option<&str>,
) {
    let theme = builder.theme;
    for link in &layout.links {
        let source = &layout.nodes[link.source];
        let target = &layout.nodes[link.target];
        let touches_selection =
            is_selected(&source.step_ids, selection) || is_selected(&target.step_ids, selection);
        let mut step_ids = source.step_ids.clone();
        step_ids.extend(target.step_ids.iter().cloned());
        builder.push(
            SceneElement {
                id: link_element_id(&link.id),
                shape: Shape::Path {
                    d: link.path(&layout.nodes),
                    samples: sample_curve(|t| link.point_at(&layout.nodes, t)),
                },
                fill: "none".to_string(),
                stroke: if touches_selection {
                    theme.selection_color.clone()
                } else {
                    theme.link_color.clone()
                },
                stroke_width: link.width,
                opacity: 1.0,
                selected: touches_selection,
            },
            Some(HitTarget::Link {
                link_id: link.id.clone(),
                source: source.id.clone(),
                target: target.id.clone(),
                step_ids,
            }),
        );
    }

    for (idx, node) in layout.nodes.iter().enumerate() {
        let selected = is_selected(&node.step_ids, selection);
        let color = node_color(theme, &node.color, idx);
        let shape = match node.kind {
            NodeKind::Recipe => Shape::Rect {
                x: node.x - node.width / 2.0,
                y: node.y - node.height / 2.0,
                width: node.width,
                height: node.height,
                radius: 6.0,
            },
            NodeKind::Item => Shape::Circle {
                cx: node.x,
                cy: node.y,
                r: node.width.min(node.height) / 2.0,
            },
        };
        builder.push(
            SceneElement {
                id: node_element_id(&node.id),
                shape,
                fill: blend_colors(&color, &theme.background, 0.65),
                stroke: if selected {
                    theme.selection_color.clone()
                } else {
                    color
                },
                stroke_width: if selected { 3.0 } else { 1.5 },
                opacity: 1.0,
                selected,
            },
            Some(HitTarget::Node {
                node_id: node.id.clone(),
                step_ids: node.step_ids.clone(),
            }),
        );
    }

    for node in &layout.nodes {
        let block = measure_label(&node.label, theme, config);
        let y = match node.kind {
            NodeKind::Recipe => node.y,
            NodeKind::Item => node.y + node.height / 2.0 + LABEL_GAP + block.height / 2.0,
        };
        builder.text(
            format!("label-{}", node.id),
            node.x,
            y,
            TextAnchor::Middle,
            block.lines,
        );
    }

    for link in &layout.links {
        builder.link_label(&link.id, &link.quantities, link.point_at(&layout.nodes, 0.5));
    }
}

/// Builds the scene for a layout. The same input always yields the same scene.
pub fn render_scene(
    layout: &LayoutResult,
    settings: &FlowSettings,
    theme: &Theme,
    config: &LayoutConfig,
    selection: Option<&str>,
) -> Scene {
    let mut builder = SceneBuilder {
        theme,
        settings,
        scene: Scene::empty(layout.width(), layout.height()),
    };
    match layout {
        LayoutResult::Sankey(sankey) => render_sankey(&mut builder, sankey, selection),
        LayoutResult::BoxLine(boxline) => render_boxline(&mut builder, boxline, config, selection),
    }
    builder.scene
}

pub fn scene_to_svg(
    scene: &Scene,
    theme: &Theme,
    config: &LayoutConfig,
    transform: &ViewTransform,
) -> String {
    let mut svg = String::new();
    let width = scene.width.max(1.0);
    let height = scene.height.max(1.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));
    svg.push_str(&format!("<g transform=\"{}\">", transform.to_svg()));

    for element in &scene.elements {
        let id = escape_xml(&element.id);
        match &element.shape {
            Shape::Rect {
                x,
                y,
                width,
                height,
                radius,
            } => svg.push_str(&format!(
                "<rect id=\"{id}\" x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" rx=\"{radius:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
                element.fill, element.stroke, element.stroke_width
            )),
            Shape::Circle { cx, cy, r } => svg.push_str(&format!(
                "<circle id=\"{id}\" cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
                element.fill, element.stroke, element.stroke_width
            )),
            Shape::Path { d, .. } => svg.push_str(&format!(
                "<path id=\"{id}\" d=\"{d}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{:.2}\" stroke-opacity=\"{:.2}\"/>",
                element.fill, element.stroke, element.stroke_width, element.opacity
            )),
            Shape::Text {
                x,
                y,
                anchor,
                lines,
            } => svg.push_str(&text_block_svg(
                &id,
                *x,
                *y,
                *anchor,
                lines,
                &element.fill,
                theme,
                config,
            )),
        }
    }

    svg.push_str("</g></svg>");
    svg
}

#[allow(clippy::too_many_arguments)]
fn text_block_svg(
    id: &str,
    x: f32,
    y: f32,
    anchor: TextAnchor,
    lines: &[String],
    fill: &str,
    theme: &Theme,
    config: &LayoutConfig,
) -> String {
    let line_height = theme.font_size * config.label_line_height;
    let total_height = lines.len() as f32 * line_height;
    let start_y = y - total_height / 2.0 + theme.font_size;
    let mut text = String::new();
    text.push_str(&format!(
        "<text id=\"{id}\" x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"{}\" font-family=\"{}\" font-size=\"{}\" fill=\"{fill}\">",
        anchor.as_svg(),
        escape_xml(&theme.font_family),
        theme.font_size,
    ));
    for (idx, line) in lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("invalid output size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiagramKind;
    use crate::graph::build_graph;
    use crate::ir::FlowStep;
    use crate::layout::{Viewport, compute_layout};

    fn sankey() -> LayoutResult {
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
        compute_layout(
            &graph,
            &settings,
            &Theme::light(),
            &LayoutConfig::default(),
            Viewport::new(600.0, 400.0),
        )
        .unwrap()
    }

    fn scene(layout: &LayoutResult, selection: Option<&str>) -> Scene {
        render_scene(
            layout,
            &FlowSettings::default(),
            &Theme::light(),
            &LayoutConfig::default(),
            selection,
        )
    }

    #[test]
    fn rendering_is_deterministic() {
        let layout = sankey();
        assert_eq!(scene(&layout, None), scene(&layout, None));
    }

    #[test]
    fn every_node_and_link_has_a_target() {
        let layout = sankey();
        let scene = scene(&layout, None);
        for id in layout.node_ids() {
            let element = scene.element_for_node(id).unwrap();
            let target = scene.target(&element.id).unwrap();
            assert_eq!(target.node_id(), Some(id));
            assert_eq!(target.step_ids(), &[id.to_string()]);
        }
        let links = scene
            .targets()
            .values()
            .filter(|t| matches!(t, HitTarget::Link { .. }))
            .count();
        assert_eq!(links, layout.link_count());
    }

    #[test]
    fn separator_characters_do_not_merge_link_targets() {
        let steps = vec![
            FlowStep::new("a")
                .with_items(2.0)
                .feeding("b:c", "d", 1.0)
                .feeding("b", "c:d", 1.0),
            FlowStep::new("b:c"),
            FlowStep::new("b"),
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
        let scene = scene(&layout, None);
        let links = scene
            .targets()
            .values()
            .filter(|t| matches!(t, HitTarget::Link { .. }))
            .count();
        assert_eq!(links, 2);
    }

    #[test]
    fn hit_test_prefers_nodes() {
        let layout = sankey();
        let LayoutResult::Sankey(sankey) = &layout else {
            unreachable!()
        };
        let b = sankey.nodes.iter().find(|n| n.id == "B").unwrap();
        let scene = scene(&layout, None);
        let (element, target) = scene
            .hit_test((b.x0 + b.x1) / 2.0, (b.y0 + b.y1) / 2.0)
            .unwrap();
        assert_eq!(element, "node-B");
        assert_eq!(target.node_id(), Some("B"));

        let link = &sankey.links[0];
        let (mx, my) = link.point_at(0.5);
        let (element, _) = scene.hit_test(mx, my).unwrap();
        assert_eq!(element, link_element_id(&link.id));
        assert!(scene.hit_test(-100.0, -100.0).is_none());
    }

    #[test]
    fn selection_highlights_node() {
        let layout = sankey();
        let scene = scene(&layout, Some("B"));
        let b = scene.element_for_node("B").unwrap();
        assert!(b.selected);
        assert_eq!(b.stroke, Theme::light().selection_color);
        let a = scene.element_for_node("A").unwrap();
        assert!(!a.selected);
        assert_eq!(a.stroke, Theme::light().node_stroke);
    }

    #[test]
    fn link_text_respects_mode_and_precision() {
        let q = LinkQuantities {
            items: 2.5,
            share: 0.25,
            ..Default::default()
        };
        assert_eq!(format_link_value(&q, LinkValue::Items, Some(2)).unwrap(), "2.50");
        assert_eq!(format_link_value(&q, LinkValue::Items, None).unwrap(), "2.5");
        assert_eq!(format_link_value(&q, LinkValue::Percent, Some(0)).unwrap(), "25%");
        assert_eq!(format_link_value(&q, LinkValue::Belts, None).unwrap(), "0");
        assert!(format_link_value(&q, LinkValue::None, None).is_none());
    }

    #[test]
    fn svg_contains_transform_and_escaped_labels() {
        let steps = vec![FlowStep {
            label: Some("Iron & <Steel>".to_string()),
            ..FlowStep::new("A")
        }];
        let settings = FlowSettings {
            diagram: DiagramKind::BoxLine,
            ..Default::default()
        };
        let graph = build_graph(&steps, &settings).unwrap();
        let layout = compute_layout(
            &graph,
            &settings,
            &Theme::dark(),
            &LayoutConfig::default(),
            Viewport::default(),
        )
        .unwrap();
        let scene = render_scene(&layout, &settings, &Theme::dark(), &LayoutConfig::default(), None);
        assert!(matches!(
            scene.element_for_node("A").unwrap().shape,
            Shape::Circle { .. }
        ));
        let transform = ViewTransform {
            x: 5.0,
            y: 6.0,
            k: 2.0,
        };
        let svg = scene_to_svg(&scene, &Theme::dark(), &LayoutConfig::default(), &transform);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("translate(5.00,6.00) scale(2.0000)"));
        assert!(svg.contains("Iron &amp; &lt;Steel&gt;"));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn empty_layout_renders_empty_scene() {
        let graph = build_graph(&[], &FlowSettings::default()).unwrap();
        let layout = compute_layout(
            &graph,
            &FlowSettings::default(),
            &Theme::light(),
            &LayoutConfig::default(),
            Viewport::default(),
        )
        .unwrap();
        assert!(scene(&layout, None).is_empty());
    }
}
