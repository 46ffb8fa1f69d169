//! # Tankobon Archive
//!
//! Uniform, random access to the pages of a comic book, whatever it is stored
//! in: a zip archive (`.zip`/`.cbz`), a RAR archive (`.rar`/`.cbr`) or a
//! plain directory of images.
//!
//! Every container is exposed as a [`PageSource`]: an ordered list of image
//! entries (sorted with [`natural_cmp`], so `page2` comes before `page10`)
//! and a way to read page *N* as bytes or as a decoded [`PageImage`].
//!
//! ```no_run
//! use tankobon_archive::{ExtractOptions, open};
//!
//! let book = open("/library/Nausicaa v01.cbr", &ExtractOptions::default())?;
//! let cover = book.fetch_image(0)?;
//! println!("{}x{}", cover.width(), cover.height());
//! book.close();
//! # Ok::<(), tankobon_archive::error::Error>(())
//! ```

mod directory;
pub mod error;
mod filter;
mod kind;
mod open;
mod order;
mod rar;
mod source;
mod zipped;

pub use crate::directory::DirectoryPageSource;
pub use crate::filter::{IMAGE_EXTENSIONS, is_image_path};
pub use crate::kind::{BookType, book_type};
pub use crate::open::{ExtractOptions, open};
pub use crate::order::{natural_cmp, natural_path_cmp, sort_naturally, sort_paths_naturally};
pub use crate::rar::{RarPageSource, RarTool};
pub use crate::source::{Entry, Locator, PageImage, PageSource, SourceHandle};
pub use crate::zipped::ZipPageSource;
