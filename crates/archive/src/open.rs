use crate::directory::DirectoryPageSource;
use crate::error::{ErrorKind, Result};
use crate::kind::{BookType, book_type};
use crate::rar::{RarPageSource, RarTool};
use crate::source::SourceHandle;
use crate::zipped::ZipPageSource;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::instrument;

const TEMP_PREFIX: &str = "tankobon-";

/// How RAR archives get unpacked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Extraction tools to try, most preferred first.
    pub rar_tools: Vec<RarTool>,
    /// Directories searched for the tools before `PATH`.
    pub tool_dirs: Vec<PathBuf>,
    /// Parent directory for extraction; the system temporary directory if unset.
    pub temp_dir: Option<PathBuf>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { rar_tools: RarTool::ALL.to_vec(), tool_dirs: Vec::new(), temp_dir: None }
    }
}

impl ExtractOptions {
    /// Create a fresh, uniquely named extraction directory.
    pub(crate) fn temporary_directory(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX);
        let created = match &self.temp_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        };
        created.or_raise(|| ErrorKind::extraction("cannot create a temporary directory"))
    }
}

/// Open the book at `path` as a [`SourceHandle`].
///
/// A directory is always a folder book. Otherwise `.zip`/`.cbz` and
/// `.rar`/`.cbr` are dispatched on extension alone, so a missing archive
/// reports [`ArchiveNotFound`](ErrorKind::ArchiveNotFound) from the matching
/// source; any other extension is
/// [`UnsupportedFormat`](ErrorKind::UnsupportedFormat), existing or not.
///
/// # Examples
///
/// ```no_run
/// use tankobon_archive::{ExtractOptions, open};
///
/// let book = open("/library/Akira v01.cbz", &ExtractOptions::default())?;
/// println!("{} pages", book.page_count());
/// # Ok::<(), tankobon_archive::error::Error>(())
/// ```
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open(path: impl AsRef<Path>, options: &ExtractOptions) -> Result<SourceHandle> {
    let path = path.as_ref();
    let source: SourceHandle = match book_type(path) {
        Some(BookType::Folder) => Arc::new(DirectoryPageSource::open(path)?),
        Some(BookType::Zip) => Arc::new(ZipPageSource::open(path)?),
        Some(BookType::Rar) => Arc::new(RarPageSource::open(path, options)?),
        None => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    };
    tracing::debug!(kind = %source.kind(), pages = source.page_count(), "Opened book");
    Ok(source)
}
