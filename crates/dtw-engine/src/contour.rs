//! Contour search: salient closed outlines as minimum-mean cycles.
//!
//! A contour is a closed walk of orthogonally adjacent cells. Scoring
//! an edge `u -> v` with the negated energy of `v` turns "highest mean
//! energy outline" into a minimum-mean-cycle problem on a directed
//! graph.
//!
//! Two searches run on the same [`Region`] graph:
//!
//! - [`trace_contour`] anchors the walk at a chosen cell and runs a
//!   layered Bellman-Ford relaxation over non-backtracking walks, keeping
//!   the closed walk with the lowest mean weight among those at least
//!   `contour_min_length` long. It is best-effort: walks may revisit
//!   cells, and only walks up to `contour_max_length` edges are
//!   considered.
//! - [`minimum_mean_cycle`] is Karp's algorithm. It finds the exact
//!   minimum mean over every cycle of the graph, with no anchor or
//!   length floor, and serves as the reference bound for the traced
//!   contour (no closed walk can beat it).
//!
//! Both are quadratic or worse in the region size, which is why the
//! region is capped.

use std::collections::{HashMap, VecDeque};

use petgraph::Direction::Incoming;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::grid::{CellId, PixelGrid, Side};
use crate::types::{EngineConfig, EngineError};

/// A node of the contour search graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionCell {
    /// Arena index.
    pub id: CellId,
    /// Logical column.
    pub x: u32,
    /// Logical row.
    pub y: u32,
}

/// The neighbourhood contour search runs on.
#[derive(Debug, Clone)]
pub struct Region {
    graph: DiGraph<RegionCell, f64>,
    anchor: NodeIndex,
}

impl Region {
    /// Directed graph with one edge per adjacent pair and direction,
    /// weighted by the negated energy of the edge's target.
    #[must_use]
    pub const fn graph(&self) -> &DiGraph<RegionCell, f64> {
        &self.graph
    }

    /// Node of the cell the region was grown from.
    #[must_use]
    pub const fn anchor(&self) -> NodeIndex {
        self.anchor
    }
}

/// A closed walk of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    cells: Vec<CellId>,
    points: Vec<(u32, u32)>,
    mean_energy: f64,
}

impl Contour {
    fn from_nodes(graph: &DiGraph<RegionCell, f64>, nodes: &[NodeIndex], mean_weight: f64) -> Self {
        let cells: Vec<RegionCell> = nodes.iter().map(|&n| graph[n]).collect();
        Self {
            cells: cells.iter().map(|c| c.id).collect(),
            points: cells.iter().map(|c| (c.x, c.y)).collect(),
            mean_energy: -mean_weight,
        }
    }

    /// Arena indices in walk order. The walk closes back on the first.
    #[must_use]
    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    /// Logical `(x, y)` positions in walk order.
    #[must_use]
    pub fn points(&self) -> &[(u32, u32)] {
        &self.points
    }

    /// Mean energy of the cells on the walk.
    #[must_use]
    pub const fn mean_energy(&self) -> f64 {
        self.mean_energy
    }

    /// Number of edges in the closed walk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the walk is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A cycle found by [`minimum_mean_cycle`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeanCycle {
    /// Mean edge weight around the cycle.
    pub mean_weight: f64,
    /// Nodes in cycle order; the last links back to the first.
    pub nodes: Vec<NodeIndex>,
}

fn step(x: u32, y: u32, side: Side) -> Option<(u32, u32)> {
    match side {
        Side::Up => y.checked_sub(1).map(|y| (x, y)),
        Side::Right => Some((x + 1, y)),
        Side::Down => Some((x, y + 1)),
        Side::Left => x.checked_sub(1).map(|x| (x, y)),
    }
}

/// Grow a region breadth-first from the cell at `start`, keeping at most
/// `max_cells` cells, and build its search graph.
///
/// # Errors
///
/// Returns [`EngineError::CellOutOfBounds`] if `start` is outside the
/// grid and [`EngineError::CorruptTopology`] if a link leads off the
/// logical grid.
pub fn region_graph(
    grid: &PixelGrid,
    start: (u32, u32),
    max_cells: usize,
) -> Result<Region, EngineError> {
    let (x, y) = start;
    let first = grid
        .cell_at(x, y)
        .ok_or(EngineError::CellOutOfBounds { x, y })?;

    let mut graph = DiGraph::new();
    let mut nodes: HashMap<CellId, NodeIndex> = HashMap::new();
    let anchor = graph.add_node(RegionCell { id: first, x, y });
    nodes.insert(first, anchor);

    let mut queue = VecDeque::from([anchor]);
    while let Some(node) = queue.pop_front() {
        let RegionCell { id, x, y } = graph[node];
        for side in Side::ALL {
            let Some(next) = grid.link(id, side) else {
                continue;
            };
            if nodes.contains_key(&next) || nodes.len() >= max_cells {
                continue;
            }
            let (nx, ny) = step(x, y, side).ok_or_else(|| {
                EngineError::CorruptTopology(format!("cell {id} links {side:?} off the grid"))
            })?;
            let added = graph.add_node(RegionCell {
                id: next,
                x: nx,
                y: ny,
            });
            nodes.insert(next, added);
            queue.push_back(added);
        }
    }

    for from in graph.node_indices().collect::<Vec<_>>() {
        let id = graph[from].id;
        for side in Side::ALL {
            if let Some(to) = grid.link(id, side).and_then(|n| nodes.get(&n).copied()) {
                let weight = -grid.energy(graph[to].id);
                graph.add_edge(from, to, weight);
            }
        }
    }

    Ok(Region { graph, anchor })
}

/// Trace the best closed walk through the cell at `start`.
///
/// Returns `Ok(None)` when no closed walk of at least
/// `config.contour_min_length` edges exists within
/// `config.contour_max_length` relaxation layers.
///
/// # Errors
///
/// See [`region_graph`].
pub fn trace_contour(
    grid: &PixelGrid,
    start: (u32, u32),
    config: &EngineConfig,
) -> Result<Option<Contour>, EngineError> {
    let region = region_graph(grid, start, config.contour_max_cells)?;
    let contour = trace_in_region(&region, config.contour_min_length, config.contour_max_length);
    match &contour {
        Some(c) => log::debug!(
            "contour from ({}, {}): {} cells, mean energy {:.2}",
            start.0,
            start.1,
            c.len(),
            c.mean_energy(),
        ),
        None => log::debug!("no contour from ({}, {})", start.0, start.1),
    }
    Ok(contour)
}

/// Karp's minimum-mean cycle over the region grown from `start`, as a
/// [`Contour`].
///
/// # Errors
///
/// See [`region_graph`].
pub fn reference_contour(
    grid: &PixelGrid,
    start: (u32, u32),
    config: &EngineConfig,
) -> Result<Option<Contour>, EngineError> {
    let region = region_graph(grid, start, config.contour_max_cells)?;
    Ok(minimum_mean_cycle(&region.graph)
        .map(|cycle| Contour::from_nodes(&region.graph, &cycle.nodes, cycle.mean_weight)))
}

/// Layered relaxation over directed edges. `dist[e]` is the lightest
/// non-backtracking walk from the anchor whose last edge is `e`.
#[allow(clippy::cast_precision_loss)]
fn trace_in_region(region: &Region, min_length: usize, max_length: usize) -> Option<Contour> {
    let graph = &region.graph;
    let anchor = region.anchor;
    let edges = graph.edge_count();

    let mut dist = vec![f64::INFINITY; edges];
    for edge in graph.edges(anchor) {
        dist[edge.id().index()] = *edge.weight();
    }
    // `preds[k]` holds back-pointers for walks of `k + 1` edges.
    let mut preds: Vec<Vec<Option<EdgeIndex>>> = vec![vec![None; edges]];
    let mut best: Option<(f64, usize, EdgeIndex)> = None;

    for length in 1..=max_length {
        if length >= min_length {
            for edge in graph.edges_directed(anchor, Incoming) {
                let total = dist[edge.id().index()];
                if !total.is_finite() {
                    continue;
                }
                let mean = total / length as f64;
                if best.is_none_or(|(m, _, _)| mean < m) {
                    best = Some((mean, length, edge.id()));
                }
            }
        }
        if length == max_length {
            break;
        }

        let mut next = vec![f64::INFINITY; edges];
        let mut pred = vec![None; edges];
        for edge in graph.edge_references() {
            let total = dist[edge.id().index()];
            if !total.is_finite() {
                continue;
            }
            for out in graph.edges(edge.target()) {
                if out.target() == edge.source() {
                    continue;
                }
                let candidate = total + out.weight();
                let slot = out.id().index();
                if candidate < next[slot] {
                    next[slot] = candidate;
                    pred[slot] = Some(edge.id());
                }
            }
        }
        dist = next;
        preds.push(pred);
    }

    let (mean, length, last) = best?;
    let mut walk = Vec::with_capacity(length);
    let mut cursor = Some(last);
    for layer in (0..length).rev() {
        let edge = cursor?;
        walk.push(edge);
        cursor = preds[layer][edge.index()];
    }
    walk.reverse();

    let mut nodes = Vec::with_capacity(length);
    for &edge in &walk {
        let (source, _) = graph.edge_endpoints(edge)?;
        nodes.push(source);
    }
    Some(Contour::from_nodes(graph, &nodes, mean))
}

/// Karp's minimum-mean cycle.
///
/// Returns `None` if the graph has no cycle.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn minimum_mean_cycle<N>(graph: &DiGraph<N, f64>) -> Option<MeanCycle> {
    let n = graph.node_count();
    if n == 0 {
        return None;
    }

    // table[k][v]: lightest walk of exactly k edges ending at v, from any
    // start.
    let mut table = vec![vec![f64::INFINITY; n]; n + 1];
    let mut parent: Vec<Vec<Option<NodeIndex>>> = vec![vec![None; n]; n + 1];
    table[0].fill(0.0);
    for k in 1..=n {
        for edge in graph.edge_references() {
            let (u, v) = (edge.source(), edge.target());
            let candidate = table[k - 1][u.index()] + edge.weight();
            if candidate < table[k][v.index()] {
                table[k][v.index()] = candidate;
                parent[k][v.index()] = Some(u);
            }
        }
    }

    let mut best: Option<(f64, usize)> = None;
    for v in 0..n {
        let full = table[n][v];
        if !full.is_finite() {
            continue;
        }
        let worst = (0..n)
            .filter(|&k| table[k][v].is_finite())
            .map(|k| (full - table[k][v]) / (n - k) as f64)
            .fold(f64::NEG_INFINITY, f64::max);
        if best.is_none_or(|(b, _)| worst < b) {
            best = Some((worst, v));
        }
    }
    let (_, end) = best?;

    // The n-edge walk into `end` repeats a node, so it contains at least
    // one cycle; a minimum-mean one is among them.
    let mut walk = Vec::with_capacity(n + 1);
    let mut cursor = NodeIndex::new(end);
    walk.push(cursor);
    for k in (1..=n).rev() {
        cursor = parent[k][cursor.index()]?;
        walk.push(cursor);
    }
    walk.reverse();
    best_cycle_on_walk(graph, &walk)
}

/// Split `walk` into its cycles and return the one with the lowest mean.
#[allow(clippy::cast_precision_loss)]
fn best_cycle_on_walk<N>(graph: &DiGraph<N, f64>, walk: &[NodeIndex]) -> Option<MeanCycle> {
    let mut stack: Vec<NodeIndex> = Vec::with_capacity(walk.len());
    let mut best: Option<MeanCycle> = None;
    for &node in walk {
        if let Some(i) = stack.iter().position(|&s| s == node) {
            let cycle = stack.split_off(i);
            let mean_weight = cycle_weight(graph, &cycle)? / cycle.len() as f64;
            if best.as_ref().is_none_or(|b| mean_weight < b.mean_weight) {
                best = Some(MeanCycle {
                    mean_weight,
                    nodes: cycle,
                });
            }
        }
        stack.push(node);
    }
    best
}

fn cycle_weight<N>(graph: &DiGraph<N, f64>, cycle: &[NodeIndex]) -> Option<f64> {
    let mut total = 0.0;
    for (i, &from) in cycle.iter().enumerate() {
        let to = cycle[(i + 1) % cycle.len()];
        total += graph
            .edges_connecting(from, to)
            .map(|e| *e.weight())
            .min_by(f64::total_cmp)?;
    }
    Some(total)
}

/// Logical position of the highest-energy interior cell; the first in
/// row-major order wins ties.
///
/// # Errors
///
/// Returns [`EngineError::CorruptTopology`] if the grid cannot be walked.
pub fn hottest_interior_cell(grid: &PixelGrid) -> Result<(u32, u32), EngineError> {
    let size = grid.dimensions();
    let width = size.width as usize;
    let ids = grid.row_major()?;

    let mut best: Option<((u32, u32), f64)> = None;
    for (y, row) in (0..size.height).zip(ids.chunks(width)) {
        if y == 0 || y + 1 == size.height {
            continue;
        }
        for (x, &id) in (0..size.width).zip(row) {
            if x == 0 || x + 1 == size.width {
                continue;
            }
            let energy = grid.energy(id);
            if best.is_none_or(|(_, e)| energy > e) {
                best = Some(((x, y), energy));
            }
        }
    }
    best.map(|(position, _)| position).ok_or_else(|| {
        EngineError::CorruptTopology(format!("{size} grid has no interior cell"))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgba;
    use petgraph::algo::find_negative_cycle;

    use super::*;
    use crate::energy::EnergyModel;
    use crate::types::RgbaImage;

    fn flat_grid(width: u32, height: u32) -> PixelGrid {
        PixelGrid::build(&RgbaImage::new(width, height), EnergyModel::default()).unwrap()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn noisy_grid(width: u32, height: u32) -> PixelGrid {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            let v = x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503);
            Rgba([(v >> 3) as u8, (v >> 11) as u8, (v >> 19) as u8, 255])
        });
        PixelGrid::build(&image, EnergyModel::default()).unwrap()
    }

    /// Perimeter of the square with corners (2, 2) and (5, 5), clockwise.
    fn ring() -> Vec<(u32, u32)> {
        let mut ring = Vec::new();
        ring.extend((2..5).map(|x| (x, 2)));
        ring.extend((2..5).map(|y| (5, y)));
        ring.extend((3..=5).rev().map(|x| (x, 5)));
        ring.extend((3..=5).rev().map(|y| (2, y)));
        ring
    }

    fn grid_with_ring() -> PixelGrid {
        let mut grid = flat_grid(9, 9);
        for (x, y) in ring() {
            grid.set_energy(y * 9 + x, 100.0);
        }
        grid
    }

    #[test]
    fn karp_finds_cheapest_cycle() {
        let graph = DiGraph::<(), f64>::from_edges([
            (0u32, 1, 1.0),
            (1, 2, 1.0),
            (2, 0, 1.0),
            (1, 0, 5.0),
        ]);
        let cycle = minimum_mean_cycle(&graph).unwrap();
        assert!((cycle.mean_weight - 1.0).abs() < 1e-12);
        assert_eq!(cycle.nodes.len(), 3);
    }

    #[test]
    fn karp_prefers_lower_mean_over_lower_total() {
        let graph = DiGraph::<(), f64>::from_edges([
            (0u32, 1, -2.0),
            (1, 0, 0.0),
            (1, 2, 1.0),
            (2, 2, -0.5),
        ]);
        let cycle = minimum_mean_cycle(&graph).unwrap();
        assert!((cycle.mean_weight + 1.0).abs() < 1e-12);
        let mut nodes: Vec<usize> = cycle.nodes.iter().map(|n| n.index()).collect();
        nodes.sort_unstable();
        assert_eq!(nodes, vec![0, 1]);
    }

    #[test]
    fn karp_on_acyclic_graph_is_none() {
        let graph = DiGraph::<(), f64>::from_edges([(0u32, 1, 1.0), (1, 2, 1.0)]);
        assert!(minimum_mean_cycle(&graph).is_none());
    }

    #[test]
    fn karp_agrees_with_negative_cycle_detection() {
        let grid = noisy_grid(6, 6);
        let region = region_graph(&grid, (0, 0), 256).unwrap();
        let mu = minimum_mean_cycle(region.graph()).unwrap().mean_weight;

        // Shifting every edge by slightly more than the minimum mean
        // creates a negative cycle; slightly less removes all of them.
        let below = region.graph().map(|_, c| *c, |_, w| w - (mu + 1e-6));
        assert!(find_negative_cycle(&below, NodeIndex::new(0)).is_some());
        let above = region.graph().map(|_, c| *c, |_, w| w - (mu - 1e-6));
        assert!(find_negative_cycle(&above, NodeIndex::new(0)).is_none());
    }

    #[test]
    fn region_respects_cell_cap() {
        let grid = flat_grid(10, 10);
        let region = region_graph(&grid, (4, 4), 5).unwrap();
        assert_eq!(region.graph().node_count(), 5);
        assert_eq!(region.graph()[region.anchor()].id, 44);
        // The anchor and its four neighbours form a plus: 4 links each way.
        assert_eq!(region.graph().edge_count(), 8);
    }

    #[test]
    fn region_edges_carry_negated_target_energy() {
        let grid = grid_with_ring();
        let region = region_graph(&grid, (2, 2), 256).unwrap();
        assert_eq!(region.graph().node_count(), 81);
        for edge in region.graph().edge_references() {
            let target = region.graph()[edge.target()];
            assert!((edge.weight() + grid.energy(target.id)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn start_outside_grid_is_rejected() {
        let grid = flat_grid(5, 5);
        assert!(matches!(
            region_graph(&grid, (5, 0), 16),
            Err(EngineError::CellOutOfBounds { x: 5, y: 0 })
        ));
    }

    #[test]
    fn traces_bright_ring_through_anchor() {
        let grid = grid_with_ring();
        let contour = trace_contour(&grid, (2, 2), &EngineConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(contour.len(), 12);
        assert!((contour.mean_energy() - 100.0).abs() < 1e-9);
        assert_eq!(contour.points()[0], (2, 2));

        let mut found = contour.points().to_vec();
        let mut expected = ring();
        found.sort_unstable();
        expected.sort_unstable();
        assert_eq!(found, expected);
    }

    #[test]
    fn traced_contour_never_beats_karp() {
        let grid = noisy_grid(7, 6);
        let config = EngineConfig::default();
        let traced = trace_contour(&grid, (3, 3), &config).unwrap().unwrap();
        let reference = reference_contour(&grid, (3, 3), &config).unwrap().unwrap();
        assert!(traced.len() >= config.contour_min_length);
        assert!(traced.mean_energy() <= reference.mean_energy() + 1e-9);
    }

    #[test]
    fn odd_length_walks_do_not_exist() {
        // The grid graph is bipartite, so no closed walk has 3 edges.
        let grid = noisy_grid(5, 5);
        let config = EngineConfig {
            contour_min_length: 3,
            contour_max_length: 3,
            ..EngineConfig::default()
        };
        assert_eq!(trace_contour(&grid, (2, 2), &config).unwrap(), None);
    }

    #[test]
    fn hottest_interior_cell_skips_border() {
        let mut grid = flat_grid(6, 5);
        grid.set_energy(0, 900.0);
        grid.set_energy(2 * 6 + 3, 50.0);
        assert_eq!(hottest_interior_cell(&grid).unwrap(), (3, 2));
    }
}
