//! Site adjacency derived from shared cell edges.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::shapegrid::{CellShape, ShapeGrid};

type VertexKey = (i64, i64);

/// Neighbor lists indexed by site position.
///
/// Two sites are neighbors when their cells share an edge. Vertices are
/// snapped to a lattice far finer than the cell size before comparison so
/// that independently computed corners coincide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyGraph {
    neighbors: Vec<Vec<usize>>,
    cell_sides: usize,
}

impl AdjacencyGraph {
    /// Derives the adjacency of every site in `grid`.
    pub fn from_grid(grid: &ShapeGrid) -> Self {
        let quantum = grid.cell_size * 1e-6;
        let snap = |p: &Point| -> VertexKey {
            (
                (p[0] / quantum).round() as i64,
                (p[1] / quantum).round() as i64,
            )
        };

        let mut edges: HashMap<(VertexKey, VertexKey), Vec<usize>> = HashMap::new();
        for (position, site) in grid.sites.iter().enumerate() {
            let count = site.ring.len();
            for idx in 0..count {
                let a = snap(&site.ring[idx]);
                let b = snap(&site.ring[(idx + 1) % count]);
                let key = if a <= b { (a, b) } else { (b, a) };
                edges.entry(key).or_default().push(position);
            }
        }

        let mut neighbors = vec![Vec::new(); grid.site_count()];
        for owners in edges.values() {
            for (i, &a) in owners.iter().enumerate() {
                for &b in &owners[i + 1..] {
                    if a != b {
                        neighbors[a].push(b);
                        neighbors[b].push(a);
                    }
                }
            }
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }

        let cell_sides = match grid.shape {
            CellShape::Square => 4,
            CellShape::Hexagon => 6,
        };
        Self {
            neighbors,
            cell_sides,
        }
    }

    /// Builds a graph from explicit neighbor lists.
    pub fn from_neighbors(neighbors: Vec<Vec<usize>>, cell_sides: usize) -> Self {
        Self {
            neighbors,
            cell_sides,
        }
    }

    /// Number of sites in the graph.
    pub fn site_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Neighbors of the site at `position`, sorted ascending.
    pub fn neighbors(&self, position: usize) -> &[usize] {
        self.neighbors
            .get(position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of sides of each cell.
    pub fn cell_sides(&self) -> usize {
        self.cell_sides
    }

    /// Edges of the cell at `position` that face outside the grid.
    pub fn boundary_edges(&self, position: usize) -> usize {
        self.cell_sides.saturating_sub(self.neighbors(position).len())
    }
}
