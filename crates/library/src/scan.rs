use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};
use tankobon_archive::{BookType, natural_path_cmp};
use tracing::instrument;
use walkdir::WalkDir;

/// A book found under a library folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discovered {
    pub path: PathBuf,
    pub book_type: BookType,
}

/// Find every book below `root`.
///
/// Zip and RAR archives are recognised by extension and every subdirectory
/// is reported as a folder book, so nested volumes inside a series folder
/// are listed alongside the series folder itself. Hidden files and
/// directories are skipped and not descended into. `root` itself is not
/// reported. Results are in natural path order.
///
/// # Errors
/// [`Scan`](ErrorKind::Scan) if `root` is not a readable directory.
/// Unreadable entries below it are skipped with a warning.
#[instrument(skip_all, fields(root = %root.as_ref().display(), found))]
pub fn scan_folder(root: impl AsRef<Path>) -> Result<Vec<Discovered>> {
    let root = root.as_ref();
    if !root.is_dir() {
        exn::bail!(ErrorKind::Scan(root.to_path_buf()));
    }
    let walker = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| entry.file_name().as_encoded_bytes().first() != Some(&b'.'));
    let mut found = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable library entry");
                continue;
            },
        };
        let book_type = if entry.file_type().is_dir() {
            Some(BookType::Folder)
        } else if entry.file_type().is_file() {
            BookType::from_extension(entry.path())
        } else {
            None
        };
        if let Some(book_type) = book_type {
            found.push(Discovered { path: entry.into_path(), book_type });
        }
    }
    found.sort_by(|a, b| natural_path_cmp(&a.path, &b.path));
    tracing::Span::current().record("found", found.len());
    Ok(found)
}
