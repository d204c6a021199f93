//! Turns a flow-step list into the node/link model both diagram variants share.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::{DiagramKind, FlowSettings, LinkValue};
use crate::error::{FlowError, Result};
use crate::ir::FlowStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Step that runs a recipe in machines.
    Recipe,
    /// Raw input, output or surplus item without a recipe.
    Item,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepTotals {
    pub items: f64,
    pub machines: f64,
    pub belts: f64,
    pub wagons: f64,
    pub power: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub step_ids: Vec<String>,
    /// Largest of own output, total outflow and total inflow.
    pub quantity: f64,
    pub totals: StepTotals,
    pub color: Option<String>,
}

/// Every quantity a link can be sized or labelled by.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinkQuantities {
    pub items: f64,
    /// Fraction of the producer's output carried by this link.
    pub share: f64,
    pub machines: f64,
    pub belts: f64,
    pub wagons: f64,
}

impl LinkQuantities {
    pub fn get(&self, mode: LinkValue) -> f64 {
        match mode {
            LinkValue::None => 1.0,
            LinkValue::Percent => self.share,
            LinkValue::Items => self.items,
            LinkValue::Belts => self.belts,
            LinkValue::Wagons => self.wagons,
            LinkValue::Machines => self.machines,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphLink {
    pub id: String,
    pub source: usize,
    pub target: usize,
    pub item_id: String,
    pub quantities: LinkQuantities,
}

#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    index: HashMap<String, usize>,
}

impl FlowGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index(id).map(|idx| &self.nodes[idx])
    }

    pub fn links_from(&self, node_idx: usize) -> impl Iterator<Item = &GraphLink> {
        self.links.iter().filter(move |link| link.source == node_idx)
    }

    pub fn links_to(&self, node_idx: usize) -> impl Iterator<Item = &GraphLink> {
        self.links.iter().filter(move |link| link.target == node_idx)
    }

    /// Node id owning `step_id`, if any.
    pub fn node_for_step(&self, step_id: &str) -> Option<&GraphNode> {
        self.nodes
            .iter()
            .find(|node| node.step_ids.iter().any(|id| id == step_id))
    }

    /// Kahn order over node indices; `Err` carries a node left inside a cycle.
    pub fn topological_order(&self) -> std::result::Result<Vec<usize>, usize> {
        let node_count = self.nodes.len();
        let mut indegree = vec![0usize; node_count];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        for link in &self.links {
            indegree[link.target] += 1;
            outgoing[link.source].push(link.target);
        }
        let mut queue: VecDeque<usize> = indegree
            .iter()
            .enumerate()
            .filter_map(|(idx, deg)| (*deg == 0).then_some(idx))
            .collect();
        let mut topo = Vec::with_capacity(node_count);
        while let Some(node_idx) = queue.pop_front() {
            topo.push(node_idx);
            for &to_idx in &outgoing[node_idx] {
                indegree[to_idx] -= 1;
                if indegree[to_idx] == 0 {
                    queue.push_back(to_idx);
                }
            }
        }
        if topo.len() == node_count {
            return Ok(topo);
        }
        let stuck = indegree
            .iter()
            .position(|deg| *deg > 0)
            .unwrap_or_default();
        Err(stuck)
    }

    pub fn is_acyclic(&self) -> bool {
        self.topological_order().is_ok()
    }

    pub(crate) fn cycle_error(&self, node_idx: usize) -> FlowError {
        FlowError::CyclicGraph {
            node: self
                .nodes
                .get(node_idx)
                .map(|node| node.id.clone())
                .unwrap_or_default(),
        }
    }
}

/// Item quantity after undoing the productivity bonus of research recipes.
pub fn adjusted_items(step: &FlowStep, items: f64) -> f64 {
    match step.recipe_productivity {
        Some(factor) if step.is_technology && factor > 0.0 => items / factor,
        _ => items,
    }
}

/// `source->consumer:item`, with `%`, `>` and `:` escaped inside each part so
/// distinct triples never share a key.
fn link_key(source: &str, consumer: &str, item_id: &str) -> String {
    fn escape(part: &str) -> String {
        part.replace('%', "%25")
            .replace('>', "%3E")
            .replace(':', "%3A")
    }
    format!("{}->{}:{}", escape(source), escape(consumer), escape(item_id))
}

pub fn build_graph(steps: &[FlowStep], settings: &FlowSettings) -> Result<FlowGraph> {
    let hidden: HashSet<&str> = if settings.hide_excluded {
        steps
            .iter()
            .filter(|step| step.excluded)
            .map(|step| step.id.as_str())
            .collect()
    } else {
        HashSet::new()
    };

    let mut graph = FlowGraph::default();
    for step in steps {
        if hidden.contains(step.id.as_str()) {
            continue;
        }
        let totals = StepTotals {
            items: adjusted_items(step, step.items.unwrap_or(0.0).max(0.0)),
            machines: step.machines.unwrap_or(0.0).max(0.0),
            belts: step.belts.unwrap_or(0.0).max(0.0),
            wagons: step.wagons.unwrap_or(0.0).max(0.0),
            power: step.power.unwrap_or(0.0),
        };
        match graph.index.get(&step.id) {
            Some(&idx) => {
                let node = &mut graph.nodes[idx];
                node.totals.items += totals.items;
                node.totals.machines += totals.machines;
                node.totals.belts += totals.belts;
                node.totals.wagons += totals.wagons;
                node.totals.power += totals.power;
                if node.color.is_none() {
                    node.color = step.color.clone();
                }
            }
            None => {
                graph.index.insert(step.id.clone(), graph.nodes.len());
                graph.nodes.push(GraphNode {
                    id: step.id.clone(),
                    label: step.display_label(),
                    kind: if step.recipe_id.is_some() {
                        NodeKind::Recipe
                    } else {
                        NodeKind::Item
                    },
                    step_ids: vec![step.id.clone()],
                    quantity: 0.0,
                    totals,
                    color: step.color.clone(),
                });
            }
        }
    }

    let mut link_keys: HashMap<(usize, usize, String), usize> = HashMap::new();
    for step in steps {
        let Some(&source) = graph.index.get(&step.id) else {
            continue;
        };
        for transfer in &step.outputs {
            if hidden.contains(transfer.consumer.as_str()) {
                continue;
            }
            let Some(&target) = graph.index.get(&transfer.consumer) else {
                return Err(FlowError::UnknownStep {
                    step: transfer.consumer.clone(),
                    referenced_by: step.id.clone(),
                });
            };
            let items = adjusted_items(step, transfer.items.max(0.0));
            let key = (source, target, transfer.item_id.clone());
            match link_keys.get(&key) {
                Some(&link_idx) => graph.links[link_idx].quantities.items += items,
                None => {
                    link_keys.insert(key, graph.links.len());
                    graph.links.push(GraphLink {
                        id: link_key(&step.id, &transfer.consumer, &transfer.item_id),
                        source,
                        target,
                        item_id: transfer.item_id.clone(),
                        quantities: LinkQuantities {
                            items,
                            ..Default::default()
                        },
                    });
                }
            }
        }
    }

    let node_count = graph.nodes.len();
    let mut out_total = vec![0.0f64; node_count];
    let mut in_total = vec![0.0f64; node_count];
    for link in &graph.links {
        out_total[link.source] += link.quantities.items;
        in_total[link.target] += link.quantities.items;
    }
    for (idx, node) in graph.nodes.iter_mut().enumerate() {
        node.quantity = node.totals.items.max(out_total[idx]).max(in_total[idx]);
    }
    for link in &mut graph.links {
        let producer = &graph.nodes[link.source];
        let share = if producer.quantity > 0.0 {
            (link.quantities.items / producer.quantity).min(1.0)
        } else {
            0.0
        };
        link.quantities.share = share;
        link.quantities.machines = producer.totals.machines * share;
        link.quantities.belts = producer.totals.belts * share;
        link.quantities.wagons = producer.totals.wagons * share;
    }

    if settings.diagram == DiagramKind::Sankey {
        if let Err(stuck) = graph.topological_order() {
            let err = graph.cycle_error(stuck);
            tracing::debug!(%err, "rejecting cyclic flow for sankey");
            return Err(err);
        }
    }

    tracing::debug!(
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        diagram = ?settings.diagram,
        "built flow graph"
    );
    Ok(graph)
}
