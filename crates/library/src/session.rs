use crate::Context;
use crate::access::PathAccess;
use crate::error::{ErrorKind, Result};
use crate::import::title_for;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tankobon_archive::{BookType, PageImage, SourceHandle, open};
use tankobon_cache::PrefetchCache;
use tracing::instrument;

/// One open book being read, page by page.
///
/// Holds the book's page source, a [`PrefetchCache`] private to this book
/// and the reader's position. Every page request also schedules background
/// prefetch of the neighbouring pages.
///
/// Call [`close`](Self::close) when done. Dropping an open session closes it
/// synchronously.
pub struct ReaderSession {
    path: PathBuf,
    granted: PathBuf,
    source: SourceHandle,
    cache: PrefetchCache,
    access: Arc<dyn PathAccess>,
    current: usize,
    closed: bool,
}

impl ReaderSession {
    /// Open the book at `path`, positioned at `start_page` (clamped into
    /// the book).
    ///
    /// Blocks while the book is opened; RAR books are fully extracted here.
    ///
    /// # Errors
    /// - [`Access`](ErrorKind::Access) if the path cannot be granted
    /// - [`Open`](ErrorKind::Open) if the book cannot be opened
    #[instrument(skip_all, fields(path = %path.as_ref().display(), pages))]
    pub fn open(path: impl AsRef<Path>, ctx: &Context, start_page: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let granted = ctx.access.grant(&path)?;
        let source = match open(&granted, &ctx.extract) {
            Ok(source) => source,
            Err(err) => {
                ctx.access.revoke(&granted);
                return Err(err.raise(ErrorKind::Open(path)));
            },
        };
        tracing::Span::current().record("pages", source.page_count());
        let mut session = Self {
            path,
            granted,
            source,
            cache: PrefetchCache::new(ctx.limits),
            access: Arc::clone(&ctx.access),
            current: 0,
            closed: false,
        };
        session.go_to(start_page);
        Ok(session)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display title, taken from the book's file or folder name.
    pub fn title(&self) -> String {
        title_for(&self.path)
    }

    pub fn book_type(&self) -> BookType {
        self.source.kind()
    }

    pub fn page_count(&self) -> usize {
        self.source.page_count()
    }

    pub fn current_page(&self) -> usize {
        self.current
    }

    /// The page cache backing this session.
    pub fn cache(&self) -> &PrefetchCache {
        &self.cache
    }

    /// Move to `page`, clamped into `[0, page_count)`. Returns whether the
    /// position changed.
    pub fn go_to(&mut self, page: usize) -> bool {
        let target = page.min(self.page_count().saturating_sub(1));
        let changed = target != self.current;
        self.current = target;
        changed
    }

    /// Move forward `step` pages (two for a spread), stopping at the last page.
    pub fn next(&mut self, step: usize) -> bool {
        self.go_to(self.current.saturating_add(step))
    }

    /// Move back `step` pages, stopping at the first page.
    pub fn previous(&mut self, step: usize) -> bool {
        self.go_to(self.current.saturating_sub(step))
    }

    /// Decoded image for the current page, then prefetch around it.
    ///
    /// # Errors
    /// [`Page`](ErrorKind::Page) if this page cannot be loaded. The session
    /// stays usable; other pages may still load.
    pub async fn current_image(&self) -> Result<PageImage> {
        let page = self.current;
        let loaded = self.cache.load(page, Arc::clone(&self.source)).await;
        self.cache.prefetch(page, self.page_count(), Arc::clone(&self.source));
        loaded.or_raise(|| ErrorKind::Page(page))
    }

    fn release(&mut self) {
        self.closed = true;
        self.cache.clear();
        self.access.revoke(&self.granted);
    }

    /// Drop cached pages, stop prefetching, close the book and release the
    /// path grant. Calling it again does nothing.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.cache.clear();
        let source = Arc::clone(&self.source);
        if let Err(err) = tokio::task::spawn_blocking(move || source.close()).await {
            tracing::warn!(error = %err, "Failed to close book");
        }
        self.release();
    }
}

impl Drop for ReaderSession {
    fn drop(&mut self) {
        if !self.closed {
            self.source.close();
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::fixtures::Recording;
    use crate::fixtures::{folder_book, png, zip_book};
    use rstest::rstest;
    use std::time::Duration;

    fn book(pages: usize) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("book");
        folder_book(&root, pages);
        (dir, root)
    }

    #[rstest]
    #[case(0, 0)]
    #[case(4, 4)]
    #[case(9, 9)]
    #[case(10, 9)]
    #[case(usize::MAX, 9)]
    fn test_open_clamps_start(#[case] start: usize, #[case] expected: usize) {
        let (_dir, root) = book(10);
        let session = ReaderSession::open(&root, &Context::default(), start).unwrap();
        assert_eq!(session.current_page(), expected);
        assert_eq!(session.page_count(), 10);
        assert_eq!(session.book_type(), BookType::Folder);
        assert_eq!(session.title(), "book");
    }

    #[test]
    fn test_navigation() {
        let (_dir, root) = book(5);
        let mut session = ReaderSession::open(&root, &Context::default(), 0).unwrap();
        assert!(!session.previous(1));
        assert!(session.next(2));
        assert_eq!(session.current_page(), 2);
        assert!(session.next(10));
        assert_eq!(session.current_page(), 4);
        assert!(!session.next(1));
        assert!(session.previous(3));
        assert_eq!(session.current_page(), 1);
        assert!(!session.go_to(1));
        assert!(session.go_to(usize::MAX));
        assert_eq!(session.current_page(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_current_image_prefetches_neighbours() {
        let (_dir, root) = book(10);
        let mut session = ReaderSession::open(&root, &Context::default(), 5).unwrap();
        let image = session.current_image().await.unwrap();
        assert_eq!((image.width(), image.height()), (4, 6));
        for _ in 0..200 {
            if session.cache().live_tasks().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        for page in [2, 3, 4, 5, 6, 7, 8] {
            assert!(session.cache().contains(page), "page {page} not cached");
        }
        assert!(!session.cache().contains(1));
        assert!(!session.cache().contains(9));
        session.close().await;
    }

    #[tokio::test]
    async fn test_page_error_keeps_session_usable() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("book");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("1.png"), png(2, 2, 1)).unwrap();
        std::fs::write(root.join("2.png"), b"corrupt").unwrap();
        let mut session = ReaderSession::open(&root, &Context::default(), 1).unwrap();
        let err = session.current_image().await.unwrap_err();
        assert_eq!(*err, ErrorKind::Page(1));
        assert!(session.previous(1));
        assert!(session.current_image().await.is_ok());
        session.close().await;
    }

    #[tokio::test]
    async fn test_empty_zip_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.cbz");
        zip_book(&path, 0);
        let mut session = ReaderSession::open(&path, &Context::default(), 3).unwrap();
        assert_eq!(session.title(), "empty");
        assert_eq!(session.book_type(), BookType::Zip);
        assert_eq!(session.page_count(), 0);
        assert_eq!(session.current_page(), 0);
        assert!(!session.next(1));
        let err = session.current_image().await.unwrap_err();
        assert_eq!(*err, ErrorKind::Page(0));
        session.close().await;
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_revokes() {
        let (_dir, root) = book(3);
        let access = Arc::new(Recording::default());
        let ctx = Context::default().with_access(access.clone());
        let mut session = ReaderSession::open(&root, &ctx, 0).unwrap();
        session.current_image().await.unwrap();
        let generation = session.cache().generation();
        session.close().await;
        session.close().await;
        assert!(session.cache().is_empty());
        assert!(session.cache().generation() > generation);
        assert_eq!(*access.revoked.lock().unwrap(), [root.clone()]);
        drop(session);
        assert_eq!(access.revoked.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_drop_releases_grant() {
        let (_dir, root) = book(1);
        let access = Arc::new(Recording::default());
        let ctx = Context::default().with_access(access.clone());
        drop(ReaderSession::open(&root, &ctx, 0).unwrap());
        assert_eq!(*access.revoked.lock().unwrap(), [root]);
    }

    #[test]
    fn test_open_errors() {
        let dir = tempfile::tempdir().unwrap();
        let access = Arc::new(Recording::default());
        let ctx = Context::default().with_access(access.clone());
        let missing = dir.path().join("missing.cbz");
        let err = ReaderSession::open(&missing, &ctx, 0).err().unwrap();
        assert_eq!(*err, ErrorKind::Open(missing.clone()));
        assert_eq!(*access.revoked.lock().unwrap(), [missing]);
        // The archive failure is kept underneath.
        let child = err.frame().children().first().map(|frame| frame.error().to_string());
        assert!(child.is_some_and(|message| message.contains("archive not found")));

        let denied = dir.path().join("denied");
        let err = ReaderSession::open(&denied, &ctx, 0).err().unwrap();
        assert!(matches!(&*err, ErrorKind::Access(_)));
    }
}
