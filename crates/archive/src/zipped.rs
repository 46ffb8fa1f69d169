//! Pages served from a zip (`.zip`/`.cbz`) archive.

use crate::BookType;
use crate::error::{ErrorKind, Result};
use crate::filter::is_image_path;
use crate::order::natural_cmp;
use crate::source::{Entry, Locator, PageSource, entry_at, verify_image};
use exn::ResultExt;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::instrument;
use zip::ZipArchive;

type Archive = ZipArchive<BufReader<File>>;

/// A book stored as a zip archive.
///
/// The archive stays open for the lifetime of the source. Reads go through a
/// mutex because a [`ZipArchive`] seeks a single underlying file handle.
///
/// Unlike the folder and RAR sources, an archive without any images is
/// accepted and reports zero pages; callers must cope with an empty book.
#[derive(Debug)]
pub struct ZipPageSource {
    path: PathBuf,
    archive: Mutex<Option<Archive>>,
    entries: Vec<Entry>,
}

impl ZipPageSource {
    /// Open `path` and index its image members.
    ///
    /// # Errors
    /// - [`ArchiveNotFound`](ErrorKind::ArchiveNotFound) if nothing exists at `path`
    /// - [`ExtractionFailed`](ErrorKind::ExtractionFailed) if the file is not a readable zip archive
    #[instrument(skip_all, fields(path = %path.as_ref().display(), pages))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                exn::bail!(ErrorKind::ArchiveNotFound(path))
            },
            Err(err) => {
                return Err(err).or_raise(|| ErrorKind::extraction(format!("cannot open {}", path.display())));
            },
        };
        let mut archive = ZipArchive::new(BufReader::new(file))
            .or_raise(|| ErrorKind::extraction(format!("not a zip archive: {}", path.display())))?;
        let entries = Self::index(&mut archive)?;
        tracing::Span::current().record("pages", entries.len());
        Ok(Self { path, archive: Mutex::new(Some(archive)), entries })
    }

    /// Build the sorted list of image members from the central directory.
    fn index(archive: &mut Archive) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for index in 0..archive.len() {
            // Raw access reads only the header; nothing is decompressed here.
            let member = archive
                .by_index_raw(index)
                .or_raise(|| ErrorKind::extraction(format!("unreadable zip member #{index}")))?;
            if !member.is_file() || !is_image_path(member.name()) {
                continue;
            }
            entries.push(Entry { name: member.name().to_string(), locator: Locator::ZipIndex(index) });
        }
        entries.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn extract(&self, entry: &Entry) -> Result<Vec<u8>> {
        let Locator::ZipIndex(index) = entry.locator else {
            exn::bail!(ErrorKind::extraction(format!("{}: not a zip member", entry.name)));
        };
        let mut guard = self.archive.lock();
        let Some(archive) = guard.as_mut() else {
            exn::bail!(ErrorKind::extraction(format!("{}: archive is closed", self.path.display())));
        };
        let mut member =
            archive.by_index(index).or_raise(|| ErrorKind::extraction(format!("{}: cannot open member", entry.name)))?;
        // The declared size is only a hint; a hostile header must not force a
        // huge allocation up front.
        let hint = usize::try_from(member.size()).unwrap_or(0).min(64 * 1024 * 1024);
        let mut bytes = Vec::with_capacity(hint);
        member
            .read_to_end(&mut bytes)
            .or_raise(|| ErrorKind::extraction(format!("{}: failed to decompress", entry.name)))?;
        Ok(bytes)
    }
}

impl PageSource for ZipPageSource {
    fn kind(&self) -> BookType {
        BookType::Zip
    }

    fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn fetch_page(&self, index: usize) -> Result<Vec<u8>> {
        let entry = entry_at(&self.entries, index)?;
        let bytes = self.extract(entry)?;
        verify_image(&bytes)?;
        Ok(bytes)
    }

    fn close(&self) {
        if self.archive.lock().take().is_some() {
            tracing::debug!(path = %self.path.display(), "Closed zip archive");
        }
    }
}
