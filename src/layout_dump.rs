use crate::graph::NodeKind;
use crate::layout::LayoutResult;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutDump {
    pub kind: String,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub links: Vec<LinkDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub label: String,
    pub kind: String,
    pub step_ids: Vec<String>,
    /// Top-left corner.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Sankey only.
    pub column: Option<usize>,
    pub value: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub item_id: String,
    pub width: f32,
    pub path: String,
}

fn kind_name(kind: NodeKind) -> String {
    match kind {
        NodeKind::Recipe => "recipe".to_string(),
        NodeKind::Item => "item".to_string(),
    }
}

impl LayoutDump {
    pub fn from_layout(layout: &LayoutResult) -> Self {
        match layout {
            LayoutResult::Sankey(sankey) => LayoutDump {
                kind: "sankey".to_string(),
                width: sankey.width,
                height: sankey.height,
                nodes: sankey
                    .nodes
                    .iter()
                    .map(|node| NodeDump {
                        id: node.id.clone(),
                        label: node.label.clone(),
                        kind: kind_name(node.kind),
                        step_ids: node.step_ids.clone(),
                        x: node.x0,
                        y: node.y0,
                        width: node.width(),
                        height: node.height(),
                        column: Some(node.column),
                        value: Some(node.value),
                    })
                    .collect(),
                links: sankey
                    .links
                    .iter()
                    .map(|link| LinkDump {
                        id: link.id.clone(),
                        source: sankey.nodes[link.source].id.clone(),
                        target: sankey.nodes[link.target].id.clone(),
                        item_id: link.item_id.clone(),
                        width: link.width,
                        path: link.path(),
                    })
                    .collect(),
            },
            LayoutResult::BoxLine(boxline) => LayoutDump {
                kind: "boxline".to_string(),
                width: boxline.width,
                height: boxline.height,
                nodes: boxline
                    .nodes
                    .iter()
                    .map(|node| NodeDump {
                        id: node.id.clone(),
                        label: node.label.clone(),
                        kind: kind_name(node.kind),
                        step_ids: node.step_ids.clone(),
                        x: node.x - node.width / 2.0,
                        y: node.y - node.height / 2.0,
                        width: node.width,
                        height: node.height,
                        column: None,
                        value: None,
                    })
                    .collect(),
                links: boxline
                    .links
                    .iter()
                    .map(|link| LinkDump {
                        id: link.id.clone(),
                        source: boxline.nodes[link.source].id.clone(),
                        target: boxline.nodes[link.target].id.clone(),
                        item_id: link.item_id.clone(),
                        width: link.width,
                        path: link.path(&boxline.nodes),
                    })
                    .collect(),
            },
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &LayoutResult) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
