use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Compact stream is malformed: bad header fields, an inconsistent
    /// marker chain, or a buffer that does not partition into blocks.
    #[error("invalid format")]
    InvalidFormat,
    /// A value does not fit the 32-bit fields of the compact format.
    #[error("out of range")]
    OutOfRange,
    #[error("io error")]
    IOError,
}

impl From<std::io::Error> for Error {
    #[inline]
    fn from(_src: std::io::Error) -> Self {
        Error::IOError
    }
}
