use ndarray::{array, Array2};
use proptest::prelude::*;
use rad_core::errors::codes;
use rad_matrix::{compress, decompress, from_columns, PresenceMap};

#[test]
fn empty_site_and_layer_are_dropped() {
    // Site 2 and layer 1 are empty.
    let matrix = array![
        [true, false, false],
        [false, false, true],
        [false, false, false],
        [true, false, true],
        [false, false, true],
    ];
    let compressed = compress(&matrix);
    assert_eq!(compressed.matrix.dim(), (4, 2));
    assert_eq!(
        compressed.matrix,
        array![[true, false], [false, true], [true, true], [false, true]]
    );
    assert_eq!(compressed.sites_present.get(2), Some(false));
    assert_eq!(compressed.layers_present.get(1), Some(false));
    assert_eq!(compressed.sites_present.present_indices(), vec![0, 1, 3, 4]);

    let restored =
        decompress(&compressed.matrix, &compressed.sites_present, &compressed.layers_present)
            .unwrap();
    assert_eq!(restored, matrix);
}

#[test]
fn mismatched_presence_maps_are_rejected() {
    let compressed = array![[true, true]];
    let sites = PresenceMap::from_flags([true, true]);
    let layers = PresenceMap::from_flags([true, true]);
    let err = decompress(&compressed, &sites, &layers).unwrap_err();
    assert_eq!(err.code(), codes::MATRIX_SHAPE_MISMATCH);
}

#[test]
fn columns_assemble_in_layer_order() {
    let matrix = from_columns(3, &[vec![true, false, true], vec![false, false, true]]).unwrap();
    assert_eq!(matrix, array![[true, false], [false, false], [true, true]]);

    let err = from_columns(3, &[vec![true, false]]).unwrap_err();
    assert_eq!(err.code(), codes::MATRIX_SHAPE_MISMATCH);
}

fn bool_matrix() -> impl Strategy<Value = Array2<bool>> {
    (1usize..8, 1usize..8).prop_flat_map(|(rows, cols)| {
        prop::collection::vec(prop::bool::weighted(0.3), rows * cols).prop_map(move |cells| {
            Array2::from_shape_vec((rows, cols), cells).expect("shape")
        })
    })
}

proptest! {
    #[test]
    fn decompress_restores_compressed_matrices(matrix in bool_matrix()) {
        let compressed = compress(&matrix);
        for row in compressed.matrix.rows() {
            prop_assert!(row.iter().any(|cell| *cell));
        }
        for col in compressed.matrix.columns() {
            prop_assert!(col.iter().any(|cell| *cell));
        }
        let restored = decompress(&compressed.matrix, &compressed.sites_present, &compressed.layers_present).unwrap();
        prop_assert_eq!(restored, matrix);
    }
}

fn value_matrix() -> impl Strategy<Value = Array2<f64>> {
    let cell = prop_oneof![Just(0.0), -1.0e6f64..1.0e6];
    (1usize..8, 1usize..8).prop_flat_map(move |(rows, cols)| {
        (
            prop::collection::vec(cell.clone(), rows * cols),
            0..rows,
            0..cols,
        )
            .prop_map(move |(cells, empty_row, empty_col)| {
                let mut matrix = Array2::from_shape_vec((rows, cols), cells).expect("shape");
                matrix.row_mut(empty_row).fill(0.0);
                matrix.column_mut(empty_col).fill(0.0);
                matrix
            })
    })
}

proptest! {
    #[test]
    fn decompress_restores_value_matrices(matrix in value_matrix()) {
        let compressed = compress(&matrix);
        prop_assert!(compressed.matrix.nrows() < matrix.nrows());
        prop_assert!(compressed.matrix.ncols() < matrix.ncols());
        let restored = decompress(&compressed.matrix, &compressed.sites_present, &compressed.layers_present).unwrap();
        prop_assert_eq!(restored, matrix);
    }
}
