//! `.npy` encoding of matrices and columns.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::{Array, ArrayBase, Data, Dimension};
use ndarray_npy::{ReadNpyExt, ReadableElement, WritableElement, WriteNpyExt};

use rad_core::errors::{codes, ErrorInfo, RadError};

fn npy_error(code: &str, path: Option<&Path>, err: impl ToString) -> RadError {
    let mut info = ErrorInfo::new(code, err.to_string());
    if let Some(path) = path {
        info = info.with_context("path", path.display().to_string());
    }
    RadError::Io(info)
}

/// Encodes an array as `.npy` bytes.
pub fn to_npy_bytes<A, S, D>(array: &ArrayBase<S, D>) -> Result<Vec<u8>, RadError>
where
    A: WritableElement,
    S: Data<Elem = A>,
    D: Dimension,
{
    let mut bytes = Vec::new();
    array
        .write_npy(&mut bytes)
        .map_err(|err| npy_error(codes::MATRIX_WRITE, None, err))?;
    Ok(bytes)
}

/// Decodes `.npy` bytes into an owned array of the requested shape.
pub fn from_npy_bytes<A, D>(bytes: &[u8]) -> Result<Array<A, D>, RadError>
where
    A: ReadableElement,
    D: Dimension,
{
    Array::<A, D>::read_npy(bytes).map_err(|err| npy_error(codes::MATRIX_READ, None, err))
}

/// Writes an array to a `.npy` file, creating parent directories.
pub fn write_matrix<A, S, D>(path: &Path, array: &ArrayBase<S, D>) -> Result<(), RadError>
where
    A: WritableElement,
    S: Data<Elem = A>,
    D: Dimension,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|err| npy_error(codes::MATRIX_WRITE, Some(parent), err))?;
        }
    }
    let file = File::create(path).map_err(|err| npy_error(codes::MATRIX_WRITE, Some(path), err))?;
    let mut writer = BufWriter::new(file);
    array
        .write_npy(&mut writer)
        .map_err(|err| npy_error(codes::MATRIX_WRITE, Some(path), err))?;
    writer
        .flush()
        .map_err(|err| npy_error(codes::MATRIX_WRITE, Some(path), err))
}

/// Reads a `.npy` file.
pub fn read_matrix<A, D>(path: &Path) -> Result<Array<A, D>, RadError>
where
    A: ReadableElement,
    D: Dimension,
{
    let file = File::open(path).map_err(|err| npy_error(codes::MATRIX_READ, Some(path), err))?;
    Array::<A, D>::read_npy(BufReader::new(file))
        .map_err(|err| npy_error(codes::MATRIX_READ, Some(path), err))
}
