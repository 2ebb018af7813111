//! Grady fill randomization.
//!
//! The fill runs in four phases: a weighted random start, trimming of rows
//! and columns that exceed their totals, random filling of deficient rows
//! restricted to deficient columns, and a bounded repair search for rows that
//! could not be filled directly. Row and column totals of the input are
//! reproduced exactly on success.

use log::debug;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;

use rad_core::errors::{codes, ErrorInfo, RadError};

use crate::marginals;

fn unsatisfiable(message: &str) -> RadError {
    RadError::Randomization(ErrorInfo::new(codes::GRADY_UNSATISFIABLE, message))
}

struct Fill {
    cells: Array2<bool>,
    row_totals: Vec<usize>,
    col_totals: Vec<usize>,
    row_sums: Vec<usize>,
    col_sums: Vec<usize>,
}

impl Fill {
    fn set(&mut self, row: usize, col: usize, value: bool) {
        if self.cells[[row, col]] == value {
            return;
        }
        self.cells[[row, col]] = value;
        if value {
            self.row_sums[row] += 1;
            self.col_sums[col] += 1;
        } else {
            self.row_sums[row] -= 1;
            self.col_sums[col] -= 1;
        }
    }

    fn row_deficient(&self, row: usize) -> bool {
        self.row_sums[row] < self.row_totals[row]
    }

    fn col_deficient(&self, col: usize) -> bool {
        self.col_sums[col] < self.col_totals[col]
    }
}

/// Draws a matrix with the same row and column totals as `matrix`.
///
/// `search_threshold` bounds both the random search for a repair and the
/// number of failed repairs tolerated before giving up.
pub fn grady_randomize<R: Rng + ?Sized>(
    matrix: &Array2<bool>,
    search_threshold: u64,
    rng: &mut R,
) -> Result<Array2<bool>, RadError> {
    let (rows, cols) = matrix.dim();
    let (row_totals, col_totals) = marginals(matrix);
    if rows == 0 || cols == 0 {
        return Ok(matrix.clone());
    }

    let mut fill = Fill {
        cells: Array2::from_elem((rows, cols), false),
        row_sums: vec![0; rows],
        col_sums: vec![0; cols],
        row_totals,
        col_totals,
    };

    // Weighted start: each cell is drawn with probability 1.5 * max(row share, column share).
    for row in 0..rows {
        let row_share = fill.row_totals[row] as f64 / cols as f64;
        for col in 0..cols {
            let col_share = fill.col_totals[col] as f64 / rows as f64;
            let p = (1.5 * row_share.max(col_share)).min(1.0);
            if rng.gen::<f64>() < p {
                fill.set(row, col, true);
            }
        }
    }

    // Trim rows, then columns, back down to their totals.
    for row in 0..rows {
        while fill.row_sums[row] > fill.row_totals[row] {
            let filled: Vec<usize> = (0..cols).filter(|c| fill.cells[[row, *c]]).collect();
            if let Some(col) = filled.choose(rng) {
                fill.set(row, *col, false);
            }
        }
    }
    for col in 0..cols {
        while fill.col_sums[col] > fill.col_totals[col] {
            let filled: Vec<usize> = (0..rows).filter(|r| fill.cells[[*r, col]]).collect();
            if let Some(row) = filled.choose(rng) {
                fill.set(*row, col, false);
            }
        }
    }

    // Fill deficient rows from deficient columns.
    let mut open_rows: Vec<usize> = (0..rows).filter(|r| fill.row_deficient(*r)).collect();
    let mut open_cols: Vec<usize> = (0..cols).filter(|c| fill.col_deficient(*c)).collect();
    let mut problem_rows: Vec<usize> = Vec::new();
    while !open_rows.is_empty() {
        let pick = rng.gen_range(0..open_rows.len());
        let row = open_rows[pick];
        let candidates: Vec<usize> = open_cols
            .iter()
            .copied()
            .filter(|c| !fill.cells[[row, *c]])
            .collect();
        let Some(&col) = candidates.choose(rng) else {
            problem_rows.push(open_rows.swap_remove(pick));
            continue;
        };
        fill.set(row, col, true);
        if !fill.row_deficient(row) {
            open_rows.swap_remove(pick);
        }
        if !fill.col_deficient(col) {
            open_cols.retain(|c| *c != col);
        }
    }

    // Repair: move a presence so that a problem row gains one in a deficient column.
    let mut failed_repairs = 0u64;
    while !problem_rows.is_empty() {
        if open_cols.is_empty() {
            return Err(unsatisfiable("deficient rows remain without deficient columns"));
        }
        let pick = rng.gen_range(0..problem_rows.len());
        let row = problem_rows[pick];
        let col = open_cols[rng.gen_range(0..open_cols.len())];

        let mut repaired = false;
        for _ in 0..search_threshold {
            let other_row = rng.gen_range(0..rows);
            let other_col = rng.gen_range(0..cols);
            if !fill.cells[[row, other_col]]
                && fill.cells[[other_row, other_col]]
                && !fill.cells[[other_row, col]]
            {
                fill.set(row, other_col, true);
                fill.set(other_row, other_col, false);
                fill.set(other_row, col, true);
                repaired = true;
                break;
            }
        }
        if !repaired {
            failed_repairs += 1;
            if failed_repairs >= search_threshold {
                return Err(RadError::Randomization(
                    ErrorInfo::new(codes::GRADY_UNSATISFIABLE, "repair search exhausted")
                        .with_context("problem_rows", problem_rows.len().to_string())
                        .with_context("search_threshold", search_threshold.to_string()),
                ));
            }
            continue;
        }
        if !fill.row_deficient(row) {
            problem_rows.swap_remove(pick);
        }
        if !fill.col_deficient(col) {
            open_cols.retain(|c| *c != col);
        }
    }

    debug!(rows = rows, cols = cols, failed_repairs = failed_repairs; "grady fill finished");
    Ok(fill.cells)
}
