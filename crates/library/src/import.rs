use crate::Context;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use tankobon_archive::{BookType, PageSource, open};
use tankobon_config::ThumbnailConfig;
use tracing::instrument;

/// What a library record needs to know about a newly added book.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookImport {
    pub path: PathBuf,
    /// File name without its final extension.
    pub title: String,
    pub book_type: BookType,
    pub page_count: usize,
    /// JPEG cover thumbnail; `None` if the book has no pages or the cover
    /// could not be decoded.
    pub thumbnail: Option<Vec<u8>>,
}

pub(crate) fn title_for(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Open a book once to collect its title, page count and cover thumbnail.
///
/// The book is closed again before returning. Opening blocks on I/O (and,
/// for RAR books, on a full extraction), so call this off any
/// latency-sensitive thread.
///
/// # Errors
/// - [`Access`](ErrorKind::Access) if the path cannot be granted
/// - [`Open`](ErrorKind::Open) if the book cannot be opened
#[instrument(skip_all, fields(path = %path.as_ref().display(), pages))]
pub fn import_book(path: impl AsRef<Path>, ctx: &Context) -> Result<BookImport> {
    let path = path.as_ref();
    let granted = ctx.access.grant(path)?;
    let opened = open(&granted, &ctx.extract);
    let source = match opened {
        Ok(source) => source,
        Err(err) => {
            ctx.access.revoke(&granted);
            return Err(err.raise(ErrorKind::Open(path.to_path_buf())));
        },
    };
    let page_count = source.page_count();
    tracing::Span::current().record("pages", page_count);
    let thumbnail = match thumbnail(source.as_ref(), &ctx.thumbnail) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            tracing::debug!(error = %*err, "Importing without a thumbnail");
            None
        },
    };
    let import = BookImport {
        path: path.to_path_buf(),
        title: title_for(path),
        book_type: source.kind(),
        page_count,
        thumbnail,
    };
    source.close();
    ctx.access.revoke(&granted);
    Ok(import)
}

/// Render the first page as a JPEG scaled to fit within the configured
/// width and height, keeping its aspect ratio.
///
/// # Errors
/// [`Thumbnail`](ErrorKind::Thumbnail) if the book has no pages or the
/// first page cannot be decoded or encoded.
pub fn thumbnail(source: &dyn PageSource, settings: &ThumbnailConfig) -> Result<Vec<u8>> {
    if source.page_count() == 0 {
        exn::bail!(ErrorKind::Thumbnail);
    }
    let cover = source.fetch_image(0).or_raise(|| ErrorKind::Thumbnail)?;
    let resized = cover.image().resize(settings.width, settings.height, FilterType::Triangle);
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut bytes = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, settings.quality))
        .or_raise(|| ErrorKind::Thumbnail)?;
    Ok(bytes)
}
