//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Underlying failures (zip, image or
//! I/O errors) are attached as child frames of the kind they caused.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nothing exists at the requested path.
    #[display("archive not found: {}", _0.display())]
    ArchiveNotFound(#[error(not(source))] PathBuf),
    /// The path is neither a directory nor a zip/rar archive.
    #[display("unsupported format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The container could not be opened, enumerated or read.
    #[display("failed to extract archive: {_0}")]
    ExtractionFailed(#[error(not(source))] String),
    /// Bytes were read but are not a decodable raster image.
    #[display("invalid image data")]
    InvalidImageData,
    /// Requested page index is past the end of the book. Always a caller bug.
    #[display("page {_0} is out of range (total: {_1})")]
    PageOutOfRange(#[error(not(source))] usize, #[error(not(source))] usize),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Nothing in this crate is retried automatically; navigating back to a
    /// page is the retry mechanism.
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub(crate) fn extraction(detail: impl Into<String>) -> Self {
        Self::ExtractionFailed(detail.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::InvalidImageData.to_string(), "invalid image data");
        assert_eq!(ErrorKind::PageOutOfRange(7, 3).to_string(), "page 7 is out of range (total: 3)");
        assert_eq!(ErrorKind::extraction("no images").to_string(), "failed to extract archive: no images");
        assert_eq!(
            ErrorKind::UnsupportedFormat(PathBuf::from("book.pdf")).to_string(),
            "unsupported format: book.pdf"
        );
    }

    #[test]
    fn error_kind_never_retryable() {
        assert!(!ErrorKind::ArchiveNotFound(PathBuf::from("x")).is_retryable());
        assert!(!ErrorKind::extraction("io").is_retryable());
        assert!(!ErrorKind::PageOutOfRange(0, 0).is_retryable());
    }

    #[test]
    fn error_from_result() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated"));
        let err: Result<()> = result.or_raise(|| ErrorKind::extraction("truncated member"));
        let exn = err.unwrap_err();
        assert_eq!(*exn, ErrorKind::ExtractionFailed("truncated member".to_string()));
    }
}
