//! Checkerboard swap randomization.

use std::collections::HashMap;

use log::debug;
use ndarray::Array2;
use rand::Rng;

use rad_core::errors::{codes, ErrorInfo, RadError};

/// Outcome of [`swap_randomize`].
#[derive(Debug, Clone, PartialEq)]
pub struct SwapReport {
    /// Randomized matrix.
    pub matrix: Array2<bool>,
    /// Number of swaps applied.
    pub swaps: usize,
    /// Total attempts made, successful or not.
    pub attempts: u64,
}

/// Multiset of row patterns used to reject swaps that would duplicate a row.
struct RowCounts(HashMap<Vec<bool>, usize>);

impl RowCounts {
    fn new(matrix: &Array2<bool>) -> Self {
        let mut counts = HashMap::new();
        for row in matrix.rows() {
            *counts.entry(row.to_vec()).or_insert(0) += 1;
        }
        Self(counts)
    }

    fn count(&self, row: &[bool]) -> usize {
        self.0.get(row).copied().unwrap_or(0)
    }

    fn remove(&mut self, row: &[bool]) {
        if let Some(count) = self.0.get_mut(row) {
            *count -= 1;
            if *count == 0 {
                self.0.remove(row);
            }
        }
    }

    fn add(&mut self, row: Vec<bool>) {
        *self.0.entry(row).or_insert(0) += 1;
    }
}

/// Applies `num_swaps` checkerboard swaps to a copy of `matrix`.
///
/// An attempt picks one row and two columns; when the row holds exactly one
/// presence among them, a second row with the opposite pattern is drawn and
/// the 2x2 submatrix is flipped. A flip is rejected when either new row would
/// equal another row of the matrix. The retry budget counts consecutive
/// failed attempts and resets after each accepted swap.
pub fn swap_randomize<R: Rng + ?Sized>(
    matrix: &Array2<bool>,
    num_swaps: usize,
    retry_budget: u64,
    rng: &mut R,
) -> Result<SwapReport, RadError> {
    let (rows, cols) = matrix.dim();
    if rows < 2 || cols < 2 {
        return Err(RadError::Randomization(
            ErrorInfo::new(
                codes::SWAP_TOO_FEW_COLUMNS_OR_ROWS,
                "swap needs at least two rows and two columns",
            )
            .with_context("shape", format!("{rows}x{cols}")),
        ));
    }

    let mut out = matrix.clone();
    let mut row_counts = RowCounts::new(&out);
    let mut swaps = 0usize;
    let mut attempts = 0u64;
    let mut failures = 0u64;

    while swaps < num_swaps {
        if failures >= retry_budget {
            return Err(RadError::Randomization(
                ErrorInfo::new(codes::SWAP_RETRY_EXHAUSTED, "no acceptable swap found")
                    .with_context("accepted", swaps.to_string())
                    .with_context("requested", num_swaps.to_string())
                    .with_context("retry_budget", retry_budget.to_string())
                    .with_hint("the matrix may be too constrained for the requested swaps"),
            ));
        }
        attempts += 1;

        let col1 = rng.gen_range(0..cols);
        let mut col2 = rng.gen_range(0..cols - 1);
        if col2 >= col1 {
            col2 += 1;
        }
        let row1 = rng.gen_range(0..rows);
        let first = out[[row1, col1]];
        if first == out[[row1, col2]] {
            failures += 1;
            continue;
        }
        let mut row2 = rng.gen_range(0..rows - 1);
        if row2 >= row1 {
            row2 += 1;
        }
        if out[[row2, col1]] == first || out[[row2, col2]] != first {
            failures += 1;
            continue;
        }

        let old1 = out.row(row1).to_vec();
        let old2 = out.row(row2).to_vec();
        let mut new1 = old1.clone();
        let mut new2 = old2.clone();
        for row in [&mut new1, &mut new2] {
            row[col1] = !row[col1];
            row[col2] = !row[col2];
        }
        row_counts.remove(&old1);
        row_counts.remove(&old2);
        if new1 == new2 || row_counts.count(&new1) > 0 || row_counts.count(&new2) > 0 {
            row_counts.add(old1);
            row_counts.add(old2);
            failures += 1;
            continue;
        }

        for (row, values) in [(row1, &new1), (row2, &new2)] {
            out[[row, col1]] = values[col1];
            out[[row, col2]] = values[col2];
        }
        row_counts.add(new1);
        row_counts.add(new2);
        swaps += 1;
        failures = 0;
    }

    debug!(swaps = swaps, attempts = attempts; "swap randomization finished");
    Ok(SwapReport {
        matrix: out,
        swaps,
        attempts,
    })
}
