use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::{Cursor, Write};
use std::path::Path;
use std::time::Duration;
use tankobon_archive::BookType;
use tankobon_library::{Context, ReaderSession, import_book, scan_folder};

fn png(shade: u8) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 12, Rgb([shade, shade, shade])));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn write_zip(path: &Path, members: &[(&str, Vec<u8>)]) {
    let mut writer = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    for (name, data) in members {
        writer.start_file(*name, zip::write::SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

async fn wait_for_prefetch(session: &ReaderSession) {
    for _ in 0..400 {
        if session.cache().live_tasks().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("prefetch did not settle");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_library_round_trip() {
    let library = tempfile::tempdir().unwrap();
    let root = library.path();

    let zip_path = root.join("Volume 1.cbz");
    write_zip(
        &zip_path,
        &[("img/page2.jpg", png(2)), ("img/page1.jpg", png(1)), ("notes.txt", b"credits".to_vec())],
    );
    let folder = root.join("Volume 2");
    std::fs::create_dir(&folder).unwrap();
    for page in 1..=12u8 {
        std::fs::write(folder.join(format!("p{page}.png")), png(page)).unwrap();
    }

    let found = scan_folder(root).unwrap();
    let kinds: Vec<(String, BookType)> = found
        .iter()
        .map(|book| (book.path.file_name().unwrap().to_string_lossy().into_owned(), book.book_type))
        .collect();
    assert_eq!(kinds, [("Volume 1.cbz".to_string(), BookType::Zip), ("Volume 2".to_string(), BookType::Folder)]);

    let ctx = Context::default();
    let imported: Vec<_> = found.iter().map(|book| import_book(&book.path, &ctx).unwrap()).collect();
    assert_eq!(imported[0].title, "Volume 1");
    assert_eq!(imported[0].page_count, 2);
    assert_eq!(imported[1].title, "Volume 2");
    assert_eq!(imported[1].page_count, 12);
    assert!(imported.iter().all(|book| book.thumbnail.is_some()));

    // The zip book serves page1.jpg first; notes.txt is not a page.
    let mut session = ReaderSession::open(&zip_path, &ctx, 0).unwrap();
    let first = session.current_image().await.unwrap();
    assert_eq!(first.image().to_rgb8().get_pixel(0, 0), &Rgb([1, 1, 1]));
    assert!(session.next(1));
    let second = session.current_image().await.unwrap();
    assert_eq!(second.image().to_rgb8().get_pixel(0, 0), &Rgb([2, 2, 2]));
    session.close().await;

    // Reading through the folder book keeps the window around the reader warm.
    let mut session = ReaderSession::open(&folder, &ctx, 0).unwrap();
    session.current_image().await.unwrap();
    wait_for_prefetch(&session).await;
    assert!(session.cache().contains(3));
    session.go_to(8);
    session.current_image().await.unwrap();
    wait_for_prefetch(&session).await;
    for page in 5..=11 {
        assert!(session.cache().contains(page), "page {page} should be cached");
    }
    let page = session.current_image().await.unwrap();
    assert_eq!(page.image().to_rgb8().get_pixel(0, 0), &Rgb([9, 9, 9]));
    session.close().await;
    assert!(session.cache().is_empty());
}
