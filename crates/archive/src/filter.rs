use std::path::Path;

/// File extensions (lowercase) recognised as page images.
pub const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "tif"];

/// Whether `path` names an image file, judged solely by its extension.
///
/// # Examples
///
/// ```
/// use tankobon_archive::is_image_path;
///
/// assert!(is_image_path("chapter 1/003.JPG"));
/// assert!(!is_image_path("notes.txt"));
/// ```
pub fn is_image_path(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Whether a file or directory name is hidden (dot-prefixed).
pub(crate) fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("test.jpg")]
    #[case("test.jpeg")]
    #[case("test.png")]
    #[case("test.gif")]
    #[case("test.webp")]
    #[case("test.bmp")]
    #[case("test.tiff")]
    #[case("test.tif")]
    #[case("test.JPG")]
    #[case("test.PNG")]
    #[case("dir/sub/page.Jpeg")]
    fn test_image_extensions(#[case] path: &str) {
        assert!(is_image_path(path));
    }

    #[rstest]
    #[case("test.txt")]
    #[case("test.pdf")]
    #[case("test.zip")]
    #[case("test")]
    #[case("jpg")]
    // A dotfile has no extension at all.
    #[case(".png")]
    #[case("cover.png.txt")]
    fn test_non_image_extensions(#[case] path: &str) {
        assert!(!is_image_path(path));
    }

    #[test]
    fn test_hidden() {
        assert!(is_hidden(std::ffi::OsStr::new(".DS_Store")));
        assert!(is_hidden(std::ffi::OsStr::new(".thumbs")));
        assert!(!is_hidden(std::ffi::OsStr::new("page.png")));
    }
}
