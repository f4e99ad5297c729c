use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid snapshot endianness identifier {0:X?}")]
    EndiannessIdentifier(u32),

    #[error("Snapshot format version {0} is not supported")]
    UnsupportedFormatVersion(u16),

    #[error("Invalid field value tag {0:X?}")]
    InvalidFieldValueTag(u8),

    #[error("Name or field of length {0} exceeds the wire length limit")]
    OversizedRecord(usize),

    #[error("Snapshot contains a non-UTF-8 name")]
    NonUtf8Name(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
