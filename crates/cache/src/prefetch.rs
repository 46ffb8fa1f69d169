use crate::error::{ErrorKind, Result};
use crate::store::{CacheLimits, Store};
use exn::ResultExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tankobon_archive::{PageImage, SourceHandle};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// A scheduled background fetch for one page index.
struct Task {
    id: u64,
    token: CancellationToken,
}

/// Everything guarded by the cache's single lock.
struct State {
    generation: u64,
    store: Store,
    tasks: HashMap<usize, Task>,
}

struct Inner {
    limits: CacheLimits,
    runtime: Option<Handle>,
    next_task: AtomicU64,
    state: Mutex<State>,
}

/// Decoded page cache with windowed background prefetch.
///
/// Pages are held in a least-recently-used store bounded by both
/// [`max_entries`](CacheLimits::max_entries) and
/// [`max_cost`](CacheLimits::max_cost). [`prefetch`](Self::prefetch) keeps
/// at most one background task per page index, all within
/// [`window`](CacheLimits::window) pages of the current page.
///
/// Every background result is tagged with the generation current when its
/// task was scheduled. [`clear`](Self::clear) advances the generation, so a
/// page fetched for a book that has since been closed is discarded instead
/// of leaking into the next book.
///
/// Cloning is cheap; clones share the same cache.
#[derive(Clone)]
pub struct PrefetchCache {
    inner: Arc<Inner>,
}

impl PrefetchCache {
    /// Create a cache that runs prefetch tasks on the current Tokio runtime.
    ///
    /// Outside a runtime the cache still works, but [`prefetch`](Self::prefetch)
    /// schedules nothing.
    pub fn new(limits: CacheLimits) -> Self {
        Self::build(limits, Handle::try_current().ok())
    }

    /// Create a cache that runs prefetch tasks on `runtime`.
    pub fn with_runtime(limits: CacheLimits, runtime: Handle) -> Self {
        Self::build(limits, Some(runtime))
    }

    fn build(limits: CacheLimits, runtime: Option<Handle>) -> Self {
        let state = State { generation: 0, store: Store::new(&limits), tasks: HashMap::new() };
        Self {
            inner: Arc::new(Inner { limits, runtime, next_task: AtomicU64::new(0), state: Mutex::new(state) }),
        }
    }

    pub fn limits(&self) -> &CacheLimits {
        &self.inner.limits
    }

    /// Cached page for `index`, marking it most recently used. Never blocks
    /// on I/O.
    pub fn get(&self, index: usize) -> Option<PageImage> {
        self.inner.state.lock().store.get(index)
    }

    /// Store a decoded page, evicting least-recently-used pages as needed.
    /// A page too large to ever fit is not stored.
    pub fn put(&self, index: usize, image: PageImage) {
        if !self.inner.state.lock().store.insert(index, image) {
            tracing::debug!(index, max_cost = self.inner.limits.max_cost, "Page exceeds cache cost ceiling");
        }
    }

    /// Foreground page load: the cached page, or fetch and decode it now.
    ///
    /// The decode runs on a blocking worker. Unlike prefetch this is not
    /// cancellable and errors are returned. The decoded page is only cached
    /// if the cache was not cleared while it was loading.
    ///
    /// # Errors
    /// - [`Page`](ErrorKind::Page) if the source cannot produce the page
    /// - [`Worker`](ErrorKind::Worker) if the blocking worker did not finish
    #[instrument(skip(self, source), fields(hit))]
    pub async fn load(&self, index: usize, source: SourceHandle) -> Result<PageImage> {
        let generation = {
            let mut state = self.inner.state.lock();
            if let Some(image) = state.store.get(index) {
                tracing::Span::current().record("hit", true);
                return Ok(image);
            }
            state.generation
        };
        tracing::Span::current().record("hit", false);
        let image = tokio::task::spawn_blocking(move || source.fetch_image(index))
            .await
            .or_raise(|| ErrorKind::Worker)?
            .map_err(ErrorKind::page)?;
        let mut state = self.inner.state.lock();
        if state.generation == generation {
            state.store.insert(index, image.clone());
        }
        Ok(image)
    }

    /// Pages eligible for prefetch around `index`.
    fn window(&self, index: usize) -> RangeInclusive<usize> {
        let k = self.inner.limits.window;
        index.saturating_sub(k)..=index.saturating_add(k)
    }

    /// Indices to prefetch around `index`: forward pages first, then
    /// backward, each nearest first, all within `[0, total_pages)`.
    fn targets(&self, index: usize, total_pages: usize) -> Vec<usize> {
        let k = self.inner.limits.window;
        let forward = (1..=k).filter_map(|offset| index.checked_add(offset)).filter(|&i| i < total_pages);
        let backward = (1..=k).filter_map(|offset| index.checked_sub(offset)).filter(|&i| i < total_pages);
        forward.chain(backward).collect()
    }

    /// Start background fetches for the pages around `index`.
    ///
    /// Returns immediately. Tasks for pages outside the window are
    /// cancelled first. Pages already cached or already being fetched are
    /// skipped. Fetch errors are logged and otherwise ignored.
    #[instrument(skip(self, source), fields(generation, scheduled))]
    pub fn prefetch(&self, index: usize, total_pages: usize, source: SourceHandle) {
        let Some(runtime) = &self.inner.runtime else {
            tracing::warn!("No async runtime available; prefetch disabled");
            return;
        };
        let window = self.window(index);
        let targets = self.targets(index, total_pages);
        let mut state = self.inner.state.lock();
        let generation = state.generation;
        tracing::Span::current().record("generation", generation);
        state.tasks.retain(|task_index, task| {
            let keep = window.contains(task_index);
            if !keep {
                tracing::trace!(index = task_index, "Cancelling prefetch outside window");
                task.token.cancel();
            }
            keep
        });
        let mut scheduled = 0;
        for target in targets {
            if state.store.contains(target) || state.tasks.contains_key(&target) {
                continue;
            }
            let id = self.inner.next_task.fetch_add(1, Ordering::Relaxed);
            let token = CancellationToken::new();
            state.tasks.insert(target, Task { id, token: token.clone() });
            runtime.spawn(Self::run(Arc::clone(&self.inner), target, id, generation, token, Arc::clone(&source)));
            scheduled += 1;
        }
        tracing::Span::current().record("scheduled", scheduled);
    }

    /// Body of one prefetch task.
    async fn run(
        inner: Arc<Inner>,
        index: usize,
        id: u64,
        generation: u64,
        token: CancellationToken,
        source: SourceHandle,
    ) {
        let image = if token.is_cancelled() {
            None
        } else {
            match tokio::task::spawn_blocking(move || source.fetch_image(index)).await {
                Ok(Ok(image)) => Some(image),
                Ok(Err(err)) => {
                    tracing::debug!(index, error = %*err, "Prefetch failed");
                    None
                },
                Err(err) => {
                    tracing::debug!(index, error = %err, "Prefetch worker failed");
                    None
                },
            }
        };
        let mut state = inner.state.lock();
        if state.tasks.get(&index).is_some_and(|task| task.id == id) {
            state.tasks.remove(&index);
        }
        let Some(image) = image else {
            return;
        };
        if token.is_cancelled() || state.generation != generation {
            tracing::trace!(index, generation, current = state.generation, "Discarding stale prefetch");
            return;
        }
        state.store.insert(index, image);
    }

    /// Forget every cached page and cancel every background fetch.
    ///
    /// Advances the generation, so fetches already in flight can never
    /// commit afterwards.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.generation += 1;
        for (_, task) in state.tasks.drain() {
            task.token.cancel();
        }
        state.store.clear();
        tracing::debug!(generation = state.generation, "Cleared page cache");
    }

    /// Whether `index` is cached, without touching its recency.
    pub fn contains(&self, index: usize) -> bool {
        self.inner.state.lock().store.contains(index)
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Summed cost of every cached page, in bytes.
    pub fn total_cost(&self) -> u64 {
        self.inner.state.lock().store.total_cost()
    }

    pub fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }

    /// Indices with a live prefetch task, ascending.
    pub fn live_tasks(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.inner.state.lock().tasks.keys().copied().collect();
        indices.sort_unstable();
        indices
    }
}
