//! The page source abstraction shared by every container kind.

use crate::BookType;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared, thread-safe handle to an open page source.
pub type SourceHandle = Arc<dyn PageSource>;

/// Where an entry's bytes live inside its container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Locator {
    /// A regular file on disk (folders, extracted RAR archives).
    Path(PathBuf),
    /// Member index within a zip archive's central directory.
    ZipIndex(usize),
}

/// One image-typed member of a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Path of the member relative to the container root, used for ordering
    /// and display.
    pub name: String,
    pub locator: Locator,
}

/// Random access to the pages of one book.
///
/// Implementations enumerate and naturally sort their image members once, at
/// construction; page count and order never change afterwards. All methods
/// take `&self` so one source can be shared between the foreground reader
/// and background prefetch workers. Implementations that wrap a
/// non-reentrant container handle serialise access internally.
pub trait PageSource: Send + Sync {
    /// The container kind backing this source.
    fn kind(&self) -> BookType;

    /// Image entries in page order.
    fn entries(&self) -> &[Entry];

    /// Number of pages. Fixed for the lifetime of the source.
    fn page_count(&self) -> usize {
        self.entries().len()
    }

    /// Read the raw bytes of page `index`.
    ///
    /// # Errors
    /// - [`PageOutOfRange`](ErrorKind::PageOutOfRange) when `index >= page_count()`
    /// - [`ExtractionFailed`](ErrorKind::ExtractionFailed) when the container cannot be read
    /// - [`InvalidImageData`](ErrorKind::InvalidImageData) when the bytes are not a raster image
    fn fetch_page(&self, index: usize) -> Result<Vec<u8>>;

    /// Read and fully decode page `index`.
    fn fetch_image(&self, index: usize) -> Result<PageImage> {
        PageImage::decode(&self.fetch_page(index)?)
    }

    /// Release the container handle and any temporary storage. Idempotent;
    /// fetching after close fails with
    /// [`ExtractionFailed`](ErrorKind::ExtractionFailed).
    fn close(&self);
}

impl std::fmt::Debug for dyn PageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSource").field("kind", &self.kind()).field("pages", &self.page_count()).finish()
    }
}

/// Look up the entry for `index`, or fail with `PageOutOfRange`.
pub(crate) fn entry_at(entries: &[Entry], index: usize) -> Result<&Entry> {
    match entries.get(index) {
        Some(entry) => Ok(entry),
        None => exn::bail!(ErrorKind::PageOutOfRange(index, entries.len())),
    }
}

/// Check that `bytes` look like a decodable raster image: a known format
/// signature followed by a readable header. Pixel data is not decoded.
pub(crate) fn verify_image(bytes: &[u8]) -> Result<()> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format().or_raise(|| ErrorKind::InvalidImageData)?;
    if reader.format().is_none() {
        exn::bail!(ErrorKind::InvalidImageData);
    }
    reader.into_dimensions().or_raise(|| ErrorKind::InvalidImageData)?;
    Ok(())
}

/// A decoded page bitmap. Cloning is cheap (reference counted).
#[derive(Clone, Debug)]
pub struct PageImage {
    image: Arc<DynamicImage>,
}

impl PageImage {
    /// Decode encoded image bytes (format is sniffed from the content).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .or_raise(|| ErrorKind::InvalidImageData)?
            .decode()
            .or_raise(|| ErrorKind::InvalidImageData)?;
        Ok(Self::from(image))
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Approximate in-memory size: `width * height * bytes_per_pixel`.
    pub fn cost(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height()) * u64::from(self.image.color().bytes_per_pixel())
    }

    /// Whether both handles share the same decoded bitmap.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

impl From<DynamicImage> for PageImage {
    fn from(image: DynamicImage) -> Self {
        Self { image: Arc::new(image) }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// Encode a tiny solid-colour PNG. `shade` makes pages distinguishable.
    pub(crate) fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([shade, shade, shade])));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }
}
