//! # Tankobon Cache
//!
//! In-memory cache of decoded pages for the book being read, plus the
//! background prefetch that keeps the pages around the reader's position
//! warm.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tankobon_archive::{ExtractOptions, open};
//! use tankobon_cache::error::ErrorKind;
//! use tankobon_cache::{CacheLimits, PrefetchCache};
//!
//! # async fn example() -> tankobon_cache::error::Result<()> {
//! let book = open("/library/Akira v01.cbz", &ExtractOptions::default()).map_err(ErrorKind::page)?;
//! let cache = PrefetchCache::new(CacheLimits::default());
//! let page = cache.load(0, Arc::clone(&book)).await?;
//! cache.prefetch(0, book.page_count(), Arc::clone(&book));
//! # Ok(())
//! # }
//! ```

pub mod error;
mod prefetch;
mod store;

pub use crate::prefetch::PrefetchCache;
pub use crate::store::CacheLimits;
