use thiserror::Error;

/// Why a cartridge or BIOS image could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("corrupt image: {0}")]
    CorruptImage(String),
    #[error("truncated data: needed {needed} bytes, {available} available")]
    TruncatedData { needed: usize, available: usize },
    #[error("checksum mismatch: expected {expected:08X}, got {actual:08X}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    #[error("known-cartridge table line {line}: {message}")]
    KnownCarts { line: usize, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}
