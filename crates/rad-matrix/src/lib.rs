#![deny(missing_docs)]
#![doc = "Site by species matrices: assembly from intersection columns, removal of empty rows and columns, and .npy persistence."]

pub mod compress;
pub mod npy;
pub mod presence;

pub use compress::{compress, decompress, from_columns, Compressed, MatrixCell};
pub use npy::{from_npy_bytes, read_matrix, to_npy_bytes, write_matrix};
pub use presence::PresenceMap;
