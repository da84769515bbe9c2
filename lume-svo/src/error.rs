//! Error taxonomy for the SVO model (spec error kinds 5 and the `insert` bounds check).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SvoError {
    #[error("coordinate ({x}, {y}, {z}) is outside the tree bounds")]
    OutOfBounds { x: u32, y: u32, z: u32 },
    #[error("deserialization failed: {0}")]
    Deserialize(#[from] DeserializeError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeserializeError {
    #[error("bad magic bytes")]
    BadMagic,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),
    #[error("buffer truncated before the record could be fully read")]
    Truncated,
    #[error("invalid node descriptor byte {0:#04x}")]
    InvalidDescriptorByte(u8),
}
