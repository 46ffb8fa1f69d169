//! Library Error Types
//!
//! The archive, cache or config error that caused a failure is kept as a
//! child frame in the `exn` tree.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Read access to the path was not granted.
    #[display("access denied: {}", _0.display())]
    Access(#[error(not(source))] PathBuf),
    /// Configuration could not be turned into runtime settings.
    #[display("invalid configuration")]
    Config,
    /// The book could not be opened.
    #[display("cannot open book: {}", _0.display())]
    Open(#[error(not(source))] PathBuf),
    /// A single page could not be loaded; the session remains usable.
    #[display("cannot load page {_0}")]
    Page(#[error(not(source))] usize),
    /// No cover thumbnail could be produced.
    #[display("cannot generate thumbnail")]
    Thumbnail,
    /// A library folder could not be scanned.
    #[display("cannot scan folder: {}", _0.display())]
    Scan(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Only page loads are worth retrying, by navigating back to the page.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Page(_))
    }
}
