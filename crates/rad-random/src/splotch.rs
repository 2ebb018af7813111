//! Splotch randomization: each species becomes one contiguous patch.

use log::debug;
use ndarray::{Array2, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

use rad_core::errors::{codes, ErrorInfo, RadError};
use rad_core::rng::RngHandle;
use rad_grid::AdjacencyGraph;

fn placement_error(message: &str) -> ErrorInfo {
    ErrorInfo::new(codes::SPLOTCH_PLACEMENT, message)
}

/// Growth weight of patch site `site`: its unoccupied neighbors plus its
/// edges on the grid boundary. A site with no unoccupied neighbor cannot
/// grow and weighs zero whatever its boundary.
fn growth_weight(adjacency: &AdjacencyGraph, column: &[bool], site: usize) -> usize {
    let open = adjacency.neighbors(site).iter().filter(|n| !column[**n]).count();
    if open == 0 {
        0
    } else {
        open + adjacency.boundary_edges(site)
    }
}

/// Places `occupied` presences as a contiguous patch on the grid.
///
/// Growth starts from a random site. Each step picks a patch site with
/// probability proportional to its unoccupied neighbors plus its boundary
/// edges, then occupies one of its unoccupied neighbors at random. If the
/// patch is enclosed before reaching the target (a disconnected grid),
/// growth restarts from a random unoccupied site.
pub fn splotch_column<R: Rng + ?Sized>(
    adjacency: &AdjacencyGraph,
    occupied: usize,
    rng: &mut R,
) -> Result<Vec<bool>, RadError> {
    let sites = adjacency.site_count();
    if occupied > sites {
        return Err(RadError::Randomization(
            placement_error("more presences than sites")
                .with_context("occupied", occupied.to_string())
                .with_context("sites", sites.to_string()),
        ));
    }
    if occupied == sites {
        return Ok(vec![true; sites]);
    }

    let mut column = vec![false; sites];
    let mut patch: Vec<usize> = Vec::with_capacity(occupied);
    while patch.len() < occupied {
        let weights: Vec<usize> = patch
            .iter()
            .map(|site| growth_weight(adjacency, &column, *site))
            .collect();

        let next = match WeightedIndex::new(&weights) {
            Ok(weights) => {
                let from = patch[weights.sample(rng)];
                let open: Vec<usize> = adjacency
                    .neighbors(from)
                    .iter()
                    .copied()
                    .filter(|n| !column[*n])
                    .collect();
                open.choose(rng).copied()
            }
            // Empty patch or fully enclosed patch.
            Err(_) => {
                if !patch.is_empty() {
                    debug!(placed = patch.len(), target = occupied; "patch enclosed, reseeding");
                }
                let free: Vec<usize> = (0..sites).filter(|s| !column[*s]).collect();
                free.choose(rng).copied()
            }
        };
        let site = next.ok_or_else(|| {
            RadError::Randomization(placement_error("no unoccupied site left to grow into"))
        })?;
        column[site] = true;
        patch.push(site);
    }
    Ok(column)
}

/// Redraws every column of `matrix` as a contiguous patch of the same size.
///
/// Column `j` uses the substream `j` of `seed`, so the result matches the
/// per-column worker path regardless of execution order.
pub fn splotch_randomize(
    matrix: &Array2<bool>,
    adjacency: &AdjacencyGraph,
    seed: u64,
) -> Result<Array2<bool>, RadError> {
    let (rows, cols) = matrix.dim();
    if rows != adjacency.site_count() {
        return Err(RadError::Configuration(
            ErrorInfo::new(
                codes::MATRIX_SHAPE_MISMATCH,
                "splotch needs the full matrix with one row per grid site",
            )
            .with_context("rows", rows.to_string())
            .with_context("sites", adjacency.site_count().to_string()),
        ));
    }

    let mut out = Array2::from_elem((rows, cols), false);
    for (col, column) in matrix.axis_iter(Axis(1)).enumerate() {
        let occupied = column.iter().filter(|cell| **cell).count();
        let mut rng = RngHandle::for_substream(seed, col as u64);
        let placed = splotch_column(adjacency, occupied, &mut rng)?;
        for (row, present) in placed.into_iter().enumerate() {
            out[[row, col]] = present;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 3x3 rook grid, sites numbered row by row.
    fn three_by_three() -> AdjacencyGraph {
        AdjacencyGraph::from_neighbors(
            vec![
                vec![1, 3],
                vec![0, 2, 4],
                vec![1, 5],
                vec![0, 4, 6],
                vec![1, 3, 5, 7],
                vec![2, 4, 8],
                vec![3, 7],
                vec![4, 6, 8],
                vec![5, 7],
            ],
            4,
        )
    }

    #[test]
    fn growth_weight_counts_open_and_boundary_edges() {
        let adjacency = three_by_three();
        let mut column = vec![false; 9];
        column[0] = true;
        column[4] = true;
        // Corner: two open neighbors, two boundary edges.
        assert_eq!(growth_weight(&adjacency, &column, 0), 4);
        // Center: three open neighbors, no boundary.
        column[1] = true;
        assert_eq!(growth_weight(&adjacency, &column, 4), 3);
        // Corner with both neighbors taken cannot grow.
        column[3] = true;
        assert_eq!(growth_weight(&adjacency, &column, 0), 0);
    }
}
