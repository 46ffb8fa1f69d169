//! Cache Error Types
//!
//! Only the foreground [`load`](crate::PrefetchCache::load) path can fail;
//! background prefetch failures are logged and dropped.

use derive_more::{Display, Error};
use tankobon_archive::error::{Error as PageError, ErrorKind as PageErrorKind};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The page source could not produce the page.
    #[display("page unavailable: {_0}")]
    Page(#[error(not(source))] PageErrorKind),
    /// The blocking worker decoding the page panicked or was shut down.
    #[display("page worker failed")]
    Worker,
}

impl ErrorKind {
    /// Convert a page source error into a cache error, preserving the
    /// archive crate's `Exn` frame as a child in its own error tree.
    #[track_caller]
    pub fn page(err: PageError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Page(inner))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Page(inner) => inner.is_retryable(),
            Self::Worker => true,
        }
    }
}
