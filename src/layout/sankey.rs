use crate::config::{LinkValue, SankeyAlign, SankeyConfig};
use crate::error::Result;
use crate::graph::FlowGraph;

use super::align::NodeDepth;
use super::{SankeyLayout, SankeyLink, SankeyNode, Viewport};

/// Vertical state shared by the relaxation passes. Link lists hold link indices
/// and are kept sorted by the breadth of the node at the other end.
struct Breadths {
    y0: Vec<f32>,
    y1: Vec<f32>,
    column: Vec<usize>,
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Vec<usize>>,
    link_source: Vec<usize>,
    link_target: Vec<usize>,
    link_width: Vec<f32>,
    padding: f32,
    top: f32,
    bottom: f32,
}

impl Breadths {
    fn sort_by_target_breadth(&self, links: &mut [usize]) {
        links.sort_by(|a, b| {
            self.y0[self.link_target[*a]]
                .total_cmp(&self.y0[self.link_target[*b]])
                .then_with(|| a.cmp(b))
        });
    }

    fn sort_by_source_breadth(&self, links: &mut [usize]) {
        links.sort_by(|a, b| {
            self.y0[self.link_source[*a]]
                .total_cmp(&self.y0[self.link_source[*b]])
                .then_with(|| a.cmp(b))
        });
    }

    fn reorder_links(&mut self, node_idx: usize) {
        let mut out = std::mem::take(&mut self.outgoing[node_idx]);
        self.sort_by_target_breadth(&mut out);
        self.outgoing[node_idx] = out;
        let mut inc = std::mem::take(&mut self.incoming[node_idx]);
        self.sort_by_source_breadth(&mut inc);
        self.incoming[node_idx] = inc;
    }

    /// After `node_idx` moved, its neighbours' link lists may be out of order.
    fn reorder_neighbour_links(&mut self, node_idx: usize) {
        for pos in 0..self.incoming[node_idx].len() {
            let source = self.link_source[self.incoming[node_idx][pos]];
            let mut out = std::mem::take(&mut self.outgoing[source]);
            self.sort_by_target_breadth(&mut out);
            self.outgoing[source] = out;
        }
        for pos in 0..self.outgoing[node_idx].len() {
            let target = self.link_target[self.outgoing[node_idx][pos]];
            let mut inc = std::mem::take(&mut self.incoming[target]);
            self.sort_by_source_breadth(&mut inc);
            self.incoming[target] = inc;
        }
    }

    fn shift(&mut self, node_idx: usize, dy: f32) {
        self.y0[node_idx] += dy;
        self.y1[node_idx] += dy;
    }

    /// Where the link from `source` would ideally enter `target`, measured at the target's top.
    fn target_top(&self, source: usize, target: usize) -> f32 {
        let out = &self.outgoing[source];
        let mut y = self.y0[source] - (out.len() as f32 - 1.0) * self.padding / 2.0;
        for &link in out {
            if self.link_target[link] == target {
                break;
            }
            y += self.link_width[link] + self.padding;
        }
        for &link in &self.incoming[target] {
            if self.link_source[link] == source {
                break;
            }
            y -= self.link_width[link];
        }
        y
    }

    fn source_top(&self, source: usize, target: usize) -> f32 {
        let inc = &self.incoming[target];
        let mut y = self.y0[target] - (inc.len() as f32 - 1.0) * self.padding / 2.0;
        for &link in inc {
            if self.link_source[link] == source {
                break;
            }
            y += self.link_width[link] + self.padding;
        }
        for &link in &self.outgoing[source] {
            if self.link_target[link] == target {
                break;
            }
            y -= self.link_width[link];
        }
        y
    }

    fn relax_left_to_right(
        &mut self,
        columns: &mut [Vec<usize>],
        values: &[f32],
        alpha: f32,
        beta: f32,
    ) {
        for col in 1..columns.len() {
            for pos in 0..columns[col].len() {
                let target = columns[col][pos];
                let mut y = 0.0f32;
                let mut w = 0.0f32;
                for &link in &self.incoming[target] {
                    let source = self.link_source[link];
                    let span = self.column[target] as f32 - self.column[source] as f32;
                    let v = values[link] * span;
                    y += self.target_top(source, target) * v;
                    w += v;
                }
                if w <= 0.0 {
                    continue;
                }
                let dy = (y / w - self.y0[target]) * alpha;
                self.shift(target, dy);
                self.reorder_neighbour_links(target);
            }
            self.sort_column(&mut columns[col]);
            self.resolve_collisions(&columns[col], beta);
        }
    }

    fn relax_right_to_left(
        &mut self,
        columns: &mut [Vec<usize>],
        values: &[f32],
        alpha: f32,
        beta: f32,
    ) {
        for col in (0..columns.len().saturating_sub(1)).rev() {
            for pos in 0..columns[col].len() {
                let source = columns[col][pos];
                let mut y = 0.0f32;
                let mut w = 0.0f32;
                for &link in &self.outgoing[source] {
                    let target = self.link_target[link];
                    let span = self.column[target] as f32 - self.column[source] as f32;
                    let v = values[link] * span;
                    y += self.source_top(source, target) * v;
                    w += v;
                }
                if w <= 0.0 {
                    continue;
                }
                let dy = (y / w - self.y0[source]) * alpha;
                self.shift(source, dy);
                self.reorder_neighbour_links(source);
            }
            self.sort_column(&mut columns[col]);
            self.resolve_collisions(&columns[col], beta);
        }
    }

    fn sort_column(&self, column: &mut [usize]) {
        column.sort_by(|a, b| self.y0[*a].total_cmp(&self.y0[*b]).then_with(|| a.cmp(b)));
    }

    /// Pushes overlapping nodes apart outward from the middle of the column,
    /// then pulls everything back inside the extent.
    fn resolve_collisions(&mut self, column: &[usize], alpha: f32) {
        if column.is_empty() {
            return;
        }
        let mid = column.len() >> 1;
        let subject = column[mid];
        let (subject_top, subject_bottom) = (self.y0[subject], self.y1[subject]);
        if mid > 0 {
            self.push_up(column, subject_top - self.padding, mid - 1, alpha);
        }
        self.push_down(column, subject_bottom + self.padding, mid + 1, alpha);
        self.push_up(column, self.bottom, column.len() - 1, alpha);
        self.push_down(column, self.top, 0, alpha);
    }

    fn push_down(&mut self, column: &[usize], mut y: f32, start: usize, alpha: f32) {
        for &node in column.iter().skip(start) {
            let dy = (y - self.y0[node]) * alpha;
            if dy > 1e-6 {
                self.shift(node, dy);
            }
            y = self.y1[node] + self.padding;
        }
    }

    fn push_up(&mut self, column: &[usize], mut y: f32, start: usize, alpha: f32) {
        for &node in column[..=start].iter().rev() {
            let dy = (self.y1[node] - y) * alpha;
            if dy > 1e-6 {
                self.shift(node, -dy);
            }
            y = self.y0[node] - self.padding;
        }
    }
}

pub fn compute_sankey_layout(
    graph: &FlowGraph,
    align: SankeyAlign,
    link_size: LinkValue,
    config: &SankeyConfig,
    viewport: Viewport,
) -> Result<SankeyLayout> {
    let node_count = graph.nodes.len();
    let topo = graph
        .topological_order()
        .map_err(|stuck| graph.cycle_error(stuck))?;

    let link_values: Vec<f32> = graph
        .links
        .iter()
        .map(|link| {
            let value = link.quantities.get(link_size) as f32;
            if value.is_finite() { value.max(0.0) } else { 0.0 }
        })
        .collect();

    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut in_total = vec![0.0f32; node_count];
    let mut out_total = vec![0.0f32; node_count];
    for (idx, link) in graph.links.iter().enumerate() {
        outgoing[link.source].push(idx);
        incoming[link.target].push(idx);
        out_total[link.source] += link_values[idx];
        in_total[link.target] += link_values[idx];
    }
    let values: Vec<f32> = (0..node_count)
        .map(|idx| in_total[idx].max(out_total[idx]))
        .collect();

    let mut depth = vec![0usize; node_count];
    for &node_idx in &topo {
        for &link in &outgoing[node_idx] {
            let to_idx = graph.links[link].target;
            depth[to_idx] = depth[to_idx].max(depth[node_idx] + 1);
        }
    }
    let mut height = vec![0usize; node_count];
    for &node_idx in topo.iter().rev() {
        for &link in &incoming[node_idx] {
            let from_idx = graph.links[link].source;
            height[from_idx] = height[from_idx].max(height[node_idx] + 1);
        }
    }

    let column_count = depth.iter().copied().max().map(|d| d + 1).unwrap_or(0);
    let margin = config.margin.max(0.0);
    let left = margin;
    let right = (viewport.width - margin).max(left + config.node_width);
    let top = margin;
    let bottom = (viewport.height - margin).max(top);
    let kx = if column_count > 1 {
        (right - left - config.node_width) / (column_count - 1) as f32
    } else {
        0.0
    };

    let mut column = vec![0usize; node_count];
    let mut columns: Vec<Vec<usize>> = vec![Vec::new(); column_count];
    for idx in 0..node_count {
        let info = NodeDepth {
            depth: depth[idx],
            height: height[idx],
            has_incoming: !incoming[idx].is_empty(),
            has_outgoing: !outgoing[idx].is_empty(),
            min_successor_depth: outgoing[idx]
                .iter()
                .map(|&link| depth[graph.links[link].target])
                .min(),
        };
        let col = align.column(&info, column_count);
        column[idx] = col;
        columns[col].push(idx);
    }

    let extent = bottom - top;
    let max_len = columns.iter().map(Vec::len).max().unwrap_or(0);
    let padding = if max_len > 1 {
        config.node_padding.min(extent / (max_len - 1) as f32)
    } else {
        config.node_padding
    };
    let ky = columns
        .iter()
        .filter_map(|nodes| {
            let sum: f32 = nodes.iter().map(|&idx| values[idx]).sum();
            (sum > 0.0).then(|| (extent - (nodes.len() as f32 - 1.0) * padding) / sum)
        })
        .fold(f32::INFINITY, f32::min);
    let ky = if ky.is_finite() { ky.max(0.0) } else { 0.0 };

    let mut state = Breadths {
        y0: vec![0.0; node_count],
        y1: vec![0.0; node_count],
        column,
        incoming,
        outgoing,
        link_source: graph.links.iter().map(|link| link.source).collect(),
        link_target: graph.links.iter().map(|link| link.target).collect(),
        link_width: link_values.iter().map(|value| value * ky).collect(),
        padding,
        top,
        bottom,
    };

    for nodes in &columns {
        let mut y = top;
        for &idx in nodes {
            state.y0[idx] = y;
            state.y1[idx] = y + values[idx] * ky;
            y = state.y1[idx] + padding;
        }
        let spread = (bottom - y + padding) / (nodes.len() as f32 + 1.0);
        for (pos, &idx) in nodes.iter().enumerate() {
            state.shift(idx, spread * (pos as f32 + 1.0));
        }
    }
    for idx in 0..node_count {
        state.reorder_links(idx);
    }

    let iterations = config.iterations;
    for i in 0..iterations {
        let alpha = 0.99f32.powi(i as i32);
        let beta = (1.0 - alpha).max((i + 1) as f32 / iterations as f32);
        state.relax_right_to_left(&mut columns, &link_values, alpha, beta);
        state.relax_left_to_right(&mut columns, &link_values, alpha, beta);
    }

    let x0_of = |idx: usize| left + state.column[idx] as f32 * kx;
    let mut link_y0 = vec![0.0f32; graph.links.len()];
    let mut link_y1 = vec![0.0f32; graph.links.len()];
    for idx in 0..node_count {
        let mut y = state.y0[idx];
        for &link in &state.outgoing[idx] {
            link_y0[link] = y + state.link_width[link] / 2.0;
            y += state.link_width[link];
        }
        let mut y = state.y0[idx];
        for &link in &state.incoming[idx] {
            link_y1[link] = y + state.link_width[link] / 2.0;
            y += state.link_width[link];
        }
    }

    let nodes: Vec<SankeyNode> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| SankeyNode {
            id: node.id.clone(),
            label: node.label.clone(),
            kind: node.kind,
            step_ids: node.step_ids.clone(),
            color: node.color.clone(),
            value: values[idx],
            depth: depth[idx],
            column: state.column[idx],
            x0: x0_of(idx),
            x1: x0_of(idx) + config.node_width,
            y0: state.y0[idx],
            y1: state.y1[idx],
        })
        .collect();

    let links: Vec<SankeyLink> = graph
        .links
        .iter()
        .enumerate()
        .map(|(idx, link)| SankeyLink {
            id: link.id.clone(),
            source: link.source,
            target: link.target,
            item_id: link.item_id.clone(),
            value: link_values[idx],
            quantities: link.quantities,
            width: state.link_width[idx],
            x0: nodes[link.source].x1,
            y0: link_y0[idx],
            x1: nodes[link.target].x0,
            y1: link_y1[idx],
        })
        .collect();

    tracing::debug!(
        nodes = nodes.len(),
        links = links.len(),
        columns = column_count,
        ?align,
        "computed sankey layout"
    );

    Ok(SankeyLayout {
        width: viewport.width,
        height: viewport.height,
        node_width: config.node_width,
        columns: column_count,
        nodes,
        links,
    })
}
