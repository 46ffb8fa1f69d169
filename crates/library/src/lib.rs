//! # Tankobon Library
//!
//! The layer between a comic reader's UI and its books: importing a book
//! into a library record, discovering books under a folder, and reading one
//! page at a time with a warm cache around the current page.

mod access;
pub mod error;
mod import;
mod scan;
mod session;

pub use crate::access::{PathAccess, Unrestricted};
pub use crate::import::{BookImport, import_book, thumbnail};
pub use crate::scan::{Discovered, scan_folder};
pub use crate::session::ReaderSession;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::sync::Arc;
use tankobon_archive::ExtractOptions;
use tankobon_cache::CacheLimits;
use tankobon_config::{Config, ThumbnailConfig};

/// Settings and collaborators shared by every library operation.
#[derive(Clone)]
pub struct Context {
    pub extract: ExtractOptions,
    pub limits: CacheLimits,
    pub thumbnail: ThumbnailConfig,
    pub access: Arc<dyn PathAccess>,
}

impl Context {
    /// Build a context from loaded configuration, with unrestricted access.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            extract: config.extract_options().or_raise(|| ErrorKind::Config)?,
            limits: config.cache_limits(),
            thumbnail: config.thumbnail,
            access: Arc::new(Unrestricted),
        })
    }

    /// Replace the path access collaborator.
    #[must_use]
    pub fn with_access(mut self, access: Arc<dyn PathAccess>) -> Self {
        self.access = access;
        self
    }
}

impl Default for Context {
    fn default() -> Self {
        Self {
            extract: ExtractOptions::default(),
            limits: CacheLimits::default(),
            thumbnail: ThumbnailConfig::default(),
            access: Arc::new(Unrestricted),
        }
    }
}
