//! Category assignment by greedy colouring of a proximity graph.

use std::collections::BTreeSet;

use mazeduel_protocol::{Category, Position};

use crate::{DistanceField, Grid};

/// Quiz tiles this many moves apart (or closer) must differ in category.
pub const DEFAULT_PROXIMITY_RADIUS: u32 = 7;

/// Undirected graph over quiz-tile indices. `i` and `j` are adjacent when
/// the walking distance between their cells is finite and within the radius.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProximityGraph {
    adjacency: Vec<BTreeSet<usize>>,
}

impl ProximityGraph {
    /// One BFS per position, so O(n × cells).
    pub fn build(grid: &Grid, positions: &[Position], radius: u32) -> Self {
        let mut adjacency = vec![BTreeSet::new(); positions.len()];
        for (i, &from) in positions.iter().enumerate() {
            let field = DistanceField::from_source(grid, from);
            for (j, &to) in positions.iter().enumerate().skip(i + 1) {
                if field.distance(to).is_some_and(|d| d <= radius) {
                    adjacency[i].insert(j);
                    adjacency[j].insert(i);
                }
            }
        }
        Self { adjacency }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency.get(node).into_iter().flatten().copied()
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adjacency.get(node).map_or(0, BTreeSet::len)
    }

    /// Every edge once, as `(i, j)` with `i < j`.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(i, ns)| ns.range(i + 1..).map(move |&j| (i, j)))
            .collect()
    }
}

/// Welsh–Powell style greedy colouring.
///
/// Nodes are visited by descending degree (ties by index) and each takes
/// the smallest colour no already-coloured neighbour holds. Adjacent nodes
/// always differ; the number of colours is at most max degree + 1 but not
/// necessarily minimal.
pub fn greedy_coloring(graph: &ProximityGraph) -> Vec<usize> {
    let mut order: Vec<usize> = (0..graph.len()).collect();
    order.sort_by_key(|&n| std::cmp::Reverse(graph.degree(n)));

    let mut colors: Vec<Option<usize>> = vec![None; graph.len()];
    for node in order {
        let taken: BTreeSet<usize> = graph.neighbors(node).filter_map(|n| colors[n]).collect();
        let color = (0..).find(|c| !taken.contains(c)).unwrap_or(0);
        colors[node] = Some(color);
    }
    colors.into_iter().map(|c| c.unwrap_or(0)).collect()
}

/// Maps colour ids onto categories, wrapping modulo the category count.
pub fn assign_categories(colors: &[usize]) -> Vec<Category> {
    colors.iter().map(|&c| Category::from_color(c)).collect()
}
