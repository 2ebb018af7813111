#![deny(missing_docs)]
#![doc = "Randomizes presence-absence matrices for null-model tests. Swap and Grady preserve every row and column total; Splotch preserves column totals while drawing each species as one contiguous patch."]

pub mod grady;
pub mod splotch;
pub mod swap;

pub use grady::grady_randomize;
pub use splotch::{splotch_column, splotch_randomize};
pub use swap::{swap_randomize, SwapReport};

/// Row and column totals of a boolean matrix.
pub fn marginals(matrix: &ndarray::Array2<bool>) -> (Vec<usize>, Vec<usize>) {
    let rows = matrix
        .rows()
        .into_iter()
        .map(|row| row.iter().filter(|cell| **cell).count())
        .collect();
    let cols = matrix
        .columns()
        .into_iter()
        .map(|col| col.iter().filter(|cell| **cell).count())
        .collect();
    (rows, cols)
}
