use lru::LruCache;
use tankobon_archive::PageImage;

/// Upper bounds on what the cache holds and how far ahead it reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheLimits {
    /// Maximum number of decoded pages held at once.
    pub max_entries: usize,
    /// Maximum summed [`cost`](PageImage::cost) of held pages, in bytes.
    pub max_cost: u64,
    /// Pages prefetched on each side of the current page.
    pub window: usize,
}

impl CacheLimits {
    pub const DEFAULT_MAX_ENTRIES: usize = 50;
    pub const DEFAULT_MAX_COST: u64 = 500 * 1024 * 1024;
    pub const DEFAULT_WINDOW: usize = 3;
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self { max_entries: Self::DEFAULT_MAX_ENTRIES, max_cost: Self::DEFAULT_MAX_COST, window: Self::DEFAULT_WINDOW }
    }
}

struct Slot {
    image: PageImage,
    cost: u64,
}

/// Least-recently-used page store bounded by entry count and total cost.
///
/// The [`LruCache`] itself is unbounded; both ceilings are enforced here by
/// popping the least recently used page until they hold.
pub(crate) struct Store {
    max_entries: usize,
    max_cost: u64,
    slots: LruCache<usize, Slot>,
    total_cost: u64,
}

impl Store {
    pub(crate) fn new(limits: &CacheLimits) -> Self {
        Self { max_entries: limits.max_entries, max_cost: limits.max_cost, slots: LruCache::unbounded(), total_cost: 0 }
    }

    /// Look up a page and mark it most recently used.
    pub(crate) fn get(&mut self, index: usize) -> Option<PageImage> {
        self.slots.get(&index).map(|slot| slot.image.clone())
    }

    /// Whether a page is held, without touching its recency.
    pub(crate) fn contains(&self, index: usize) -> bool {
        self.slots.contains(&index)
    }

    /// Insert or replace a page, then evict until both ceilings hold.
    ///
    /// Returns `false` if the page alone exceeds the cost ceiling; it is not
    /// stored and nothing else is evicted for it.
    pub(crate) fn insert(&mut self, index: usize, image: PageImage) -> bool {
        let cost = image.cost();
        if cost > self.max_cost || self.max_entries == 0 {
            return false;
        }
        if let Some(replaced) = self.slots.put(index, Slot { image, cost }) {
            self.total_cost -= replaced.cost;
        }
        self.total_cost += cost;
        while self.slots.len() > self.max_entries || self.total_cost > self.max_cost {
            let Some((oldest, slot)) = self.slots.pop_lru() else {
                break;
            };
            self.total_cost -= slot.cost;
            tracing::trace!(index = oldest, cost = slot.cost, "Evicted cached page");
        }
        true
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.total_cost = 0;
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn total_cost(&self) -> u64 {
        self.total_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage};
    use rstest::rstest;

    /// A page costing exactly `cost` bytes (8-bit greyscale, one row).
    fn page(cost: u32) -> PageImage {
        PageImage::from(DynamicImage::ImageLuma8(GrayImage::new(cost, 1)))
    }

    fn store(max_entries: usize, max_cost: u64) -> Store {
        Store::new(&CacheLimits { max_entries, max_cost, window: 3 })
    }

    #[test]
    fn test_defaults() {
        let limits = CacheLimits::default();
        assert_eq!(limits.max_entries, 50);
        assert_eq!(limits.max_cost, 524_288_000);
        assert_eq!(limits.window, 3);
    }

    #[test]
    fn test_get_is_idempotent() {
        let mut store = store(4, 1_000);
        let image = page(10);
        store.insert(1, image.clone());
        let first = store.get(1).unwrap();
        let second = store.get(1).unwrap();
        assert!(first.ptr_eq(&second));
        assert!(first.ptr_eq(&image));
        assert!(store.get(2).is_none());
        assert!(store.get(2).is_none());
    }

    #[test]
    fn test_count_eviction_is_lru() {
        let mut store = store(3, 1_000);
        for index in 0..3 {
            store.insert(index, page(1));
        }
        // Touch 0 so 1 becomes the oldest.
        store.get(0);
        store.insert(3, page(1));
        assert!(store.contains(0));
        assert!(!store.contains(1));
        assert!(store.contains(2));
        assert!(store.contains(3));
        assert_eq!(store.len(), 3);
    }

    #[rstest]
    #[case(&[40, 40, 40], &[1, 2])]
    #[case(&[60, 30, 20], &[1, 2])]
    #[case(&[10, 10, 95], &[2])]
    #[case(&[100, 1], &[1])]
    fn test_cost_eviction(#[case] costs: &[u32], #[case] kept: &[usize]) {
        let mut store = store(10, 100);
        for (index, cost) in costs.iter().enumerate() {
            assert!(store.insert(index, page(*cost)));
            assert!(store.total_cost() <= 100);
        }
        let mut held: Vec<usize> = (0..costs.len()).filter(|i| store.contains(*i)).collect();
        held.sort_unstable();
        assert_eq!(held, kept);
    }

    #[test]
    fn test_oversized_entry_not_stored() {
        let mut store = store(10, 100);
        store.insert(0, page(50));
        assert!(!store.insert(1, page(101)));
        assert!(store.contains(0));
        assert!(!store.contains(1));
        assert_eq!(store.total_cost(), 50);
    }

    #[test]
    fn test_replace_updates_cost() {
        let mut store = store(10, 100);
        store.insert(0, page(50));
        store.insert(0, page(20));
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_cost(), 20);
    }

    #[test]
    fn test_replace_refreshes_recency() {
        let mut store = store(2, 1_000);
        store.insert(0, page(1));
        store.insert(1, page(1));
        store.insert(0, page(2));
        store.insert(2, page(1));
        assert!(store.contains(0));
        assert!(!store.contains(1));
        assert_eq!(store.total_cost(), 3);
    }

    #[test]
    fn test_contains_keeps_recency() {
        let mut store = store(2, 1_000);
        store.insert(0, page(1));
        store.insert(1, page(1));
        assert!(store.contains(0));
        store.insert(2, page(1));
        assert!(!store.contains(0));
        assert!(store.contains(1));
    }

    #[test]
    fn test_clear() {
        let mut store = store(10, 100);
        store.insert(0, page(5));
        store.insert(1, page(5));
        store.clear();
        assert_eq!(store.len(), 0);
        assert_eq!(store.total_cost(), 0);
        assert!(store.get(0).is_none());
    }
}
