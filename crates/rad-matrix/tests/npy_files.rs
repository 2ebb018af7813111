use ndarray::{array, Array1, Array2, ArrayD, Ix2};
use rad_matrix::{from_npy_bytes, read_matrix, to_npy_bytes, write_matrix};

#[test]
fn boolean_matrix_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("pam.npy");
    let matrix = array![[true, false, true], [false, true, false]];

    write_matrix(&path, &matrix).unwrap();
    let restored: Array2<bool> = read_matrix(&path).unwrap();
    assert_eq!(restored, matrix);
}

#[test]
fn float_vectors_decode_as_dynamic_arrays() {
    let column: Array1<f64> = array![0.25, f64::NAN, 3.0];
    let bytes = to_npy_bytes(&column).unwrap();
    assert!(bytes.starts_with(b"\x93NUMPY"));

    let restored: ArrayD<f64> = from_npy_bytes(&bytes).unwrap();
    assert_eq!(restored.shape(), &[3]);
    assert_eq!(restored[[0]], 0.25);
    assert!(restored[[1]].is_nan());
}

#[test]
fn wrong_dimensionality_is_a_read_error() {
    let column: Array1<f64> = array![1.0, 2.0];
    let bytes = to_npy_bytes(&column).unwrap();
    let err = from_npy_bytes::<f64, Ix2>(&bytes).unwrap_err();
    assert_eq!(err.code(), rad_core::errors::codes::MATRIX_READ);
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_matrix::<bool, Ix2>(&dir.path().join("absent.npy")).unwrap_err();
    assert!(matches!(err, rad_core::RadError::Io(_)));
}
