//! Pages served straight from a directory tree on disk.

use crate::BookType;
use crate::error::{ErrorKind, Result};
use crate::filter::{is_hidden, is_image_path};
use crate::order::natural_cmp;
use crate::source::{Entry, Locator, PageSource, entry_at, verify_image};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::instrument;
use walkdir::WalkDir;

/// Recursively collect every non-hidden image file under `root`, naturally
/// sorted by path relative to `root`.
///
/// Hidden directories are not descended into. Unreadable entries are skipped
/// with a warning rather than failing the whole listing.
pub(crate) fn list_images(root: &Path) -> Vec<Entry> {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        // The root itself may be hidden (e.g. a temporary directory); only
        // prune below it.
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));
    let mut entries: Vec<Entry> = walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "Skipping unreadable directory entry");
                None
            },
        })
        .filter(|entry| entry.file_type().is_file() && is_image_path(entry.path()))
        .map(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            Entry {
                name: relative.to_string_lossy().into_owned(),
                locator: Locator::Path(entry.into_path()),
            }
        })
        .collect();
    entries.sort_by(|a, b| natural_cmp(&a.name, &b.name));
    entries
}

/// Read a page file from disk and verify it is an image.
pub(crate) fn read_image_file(entry: &Entry) -> Result<Vec<u8>> {
    let Locator::Path(path) = &entry.locator else {
        exn::bail!(ErrorKind::extraction(format!("{}: not a file entry", entry.name)));
    };
    let bytes =
        std::fs::read(path).or_raise(|| ErrorKind::extraction(format!("{}: failed to read file", entry.name)))?;
    verify_image(&bytes)?;
    Ok(bytes)
}

/// A book stored as a plain directory of image files.
///
/// # Examples
///
/// ```no_run
/// use tankobon_archive::{DirectoryPageSource, PageSource};
///
/// let source = DirectoryPageSource::open("/library/My Manga v01")?;
/// let first = source.fetch_page(0)?;
/// # Ok::<(), tankobon_archive::error::Error>(())
/// ```
#[derive(Debug)]
pub struct DirectoryPageSource {
    root: PathBuf,
    entries: Vec<Entry>,
    closed: AtomicBool,
}

impl DirectoryPageSource {
    /// Enumerate the images under `root`.
    ///
    /// # Errors
    /// - [`ArchiveNotFound`](ErrorKind::ArchiveNotFound) if `root` does not exist
    /// - [`UnsupportedFormat`](ErrorKind::UnsupportedFormat) if `root` is not a directory
    /// - [`ExtractionFailed`](ErrorKind::ExtractionFailed) if it contains no images
    #[instrument(skip_all, fields(root = %root.as_ref().display(), pages))]
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let metadata = match std::fs::metadata(&root) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                exn::bail!(ErrorKind::ArchiveNotFound(root))
            },
            Err(err) => {
                return Err(err).or_raise(|| ErrorKind::extraction(format!("cannot stat {}", root.display())));
            },
        };
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::UnsupportedFormat(root));
        }
        let entries = list_images(&root);
        if entries.is_empty() {
            exn::bail!(ErrorKind::extraction("no images"));
        }
        tracing::Span::current().record("pages", entries.len());
        Ok(Self { root, entries, closed: AtomicBool::new(false) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PageSource for DirectoryPageSource {
    fn kind(&self) -> BookType {
        BookType::Folder
    }

    fn entries(&self) -> &[Entry] {
        &self.entries
    }

    fn fetch_page(&self, index: usize) -> Result<Vec<u8>> {
        let entry = entry_at(&self.entries, index)?;
        if self.closed.load(Ordering::Acquire) {
            exn::bail!(ErrorKind::extraction(format!("{}: book is closed", self.root.display())));
        }
        read_image_file(entry)
    }

    fn close(&self) {
        // Nothing is held open between reads; only further fetches are refused.
        self.closed.store(true, Ordering::Release);
    }
}
