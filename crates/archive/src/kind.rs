use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The kind of container a book is stored in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BookType {
    /// Zip archive (`.zip`, `.cbz`)
    #[cfg_attr(feature = "serde", serde(rename = "cbz"))]
    Zip,
    /// RAR archive (`.rar`, `.cbr`)
    #[cfg_attr(feature = "serde", serde(rename = "cbr"))]
    Rar,
    /// Plain directory of image files
    #[cfg_attr(feature = "serde", serde(rename = "folder"))]
    Folder,
}

impl BookType {
    /// Classify a book by extension only, without touching the filesystem.
    #[must_use]
    pub fn from_extension(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "zip" | "cbz" => Some(BookType::Zip),
                "rar" | "cbr" => Some(BookType::Rar),
                _ => None,
            })
    }

    /// Stable short name, as stored by the record store.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BookType::Zip => "cbz",
            BookType::Rar => "cbr",
            BookType::Folder => "folder",
        }
    }
}

impl Display for BookType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.pad(self.as_str())
    }
}

impl FromStr for BookType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cbz" => Ok(BookType::Zip),
            "cbr" => Ok(BookType::Rar),
            "folder" => Ok(BookType::Folder),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(PathBuf::from(s))),
        }
    }
}

/// Classify `path` the same way [`open`](crate::open) would, without
/// opening anything.
///
/// The only filesystem access is a single `stat` to tell directories apart
/// from files.
///
/// # Examples
///
/// ```
/// use tankobon_archive::{BookType, book_type};
///
/// assert_eq!(book_type("/library/One Piece v01.cbz"), Some(BookType::Zip));
/// assert_eq!(book_type("/library/manual.pdf"), None);
/// ```
pub fn book_type(path: impl AsRef<Path>) -> Option<BookType> {
    let path = path.as_ref();
    if path.is_dir() {
        return Some(BookType::Folder);
    }
    BookType::from_extension(path)
}
