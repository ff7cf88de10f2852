//! Region-chained bump arena
//!
//! Hands out runs of default-initialized slots from a list of fixed-capacity
//! regions. Nothing is freed individually: `clear` rewinds every region in one
//! pass and keeps the backing memory, so after the first few ticks the region
//! chain stops growing and per-tick allocation is just offset bumps.

/// Default number of slots per region
pub const DEFAULT_REGION_CAPACITY: usize = 4096;

/// Handle to a run of slots inside an [`Arena`].
///
/// Spans stay valid until the next `clear` or `teardown`; no allocation ever
/// moves previously handed out slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    region: u32,
    start: u32,
    len: u32,
}

impl Span {
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Span addressing the `index`-th slot of this span
    #[inline]
    pub fn at(&self, index: usize) -> Span {
        debug_assert!(index < self.len(), "span index out of bounds");
        Span {
            region: self.region,
            start: self.start + index as u32,
            len: 1,
        }
    }
}

/// One contiguous block; `slots.len()` is the write offset
#[derive(Debug)]
struct Region<T> {
    slots: Vec<T>,
}

impl<T> Region<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.slots.capacity() - self.slots.len()
    }
}

/// Bump arena over growable regions of `T` slots
#[derive(Debug)]
pub struct Arena<T> {
    regions: Vec<Region<T>>,
    /// Index of the region currently receiving allocations
    active: usize,
    region_capacity: usize,
}

impl<T: Default> Arena<T> {
    /// Empty arena; the first region is allocated lazily
    pub fn new() -> Self {
        Self::with_region_capacity(DEFAULT_REGION_CAPACITY)
    }

    pub fn with_region_capacity(region_capacity: usize) -> Self {
        Self {
            regions: Vec::new(),
            active: 0,
            region_capacity: region_capacity.max(1),
        }
    }

    /// Allocate `len` default-initialized slots.
    ///
    /// A zero-length request still reserves one slot so every span is
    /// distinct. Running out of memory aborts, as with any Rust allocation.
    pub fn alloc_slice(&mut self, len: usize) -> Span {
        let len = len.max(1);
        let region = self.region_with_room(len);
        let slots = &mut self.regions[region].slots;
        let start = slots.len();
        slots.resize_with(start + len, T::default);

        Span {
            region: region as u32,
            start: start as u32,
            len: len as u32,
        }
    }

    /// Allocate a single slot holding `value`
    pub fn alloc(&mut self, value: T) -> Span {
        let span = self.alloc_slice(1);
        self.get_mut(span)[0] = value;
        span
    }

    /// Find (or append) a region able to take `len` more slots and make it active
    fn region_with_room(&mut self, len: usize) -> usize {
        while self.active < self.regions.len() {
            if self.regions[self.active].remaining() >= len {
                return self.active;
            }
            // Regions after the cursor are empty since the last clear; skip
            // only those too small for this request.
            if self.active + 1 < self.regions.len() {
                self.active += 1;
            } else {
                break;
            }
        }

        let capacity = self.region_capacity.max(len);
        self.regions.push(Region::with_capacity(capacity));
        self.active = self.regions.len() - 1;
        self.active
    }

    #[inline]
    pub fn get(&self, span: Span) -> &[T] {
        let start = span.start as usize;
        &self.regions[span.region as usize].slots[start..start + span.len()]
    }

    #[inline]
    pub fn get_mut(&mut self, span: Span) -> &mut [T] {
        let start = span.start as usize;
        &mut self.regions[span.region as usize].slots[start..start + span.len()]
    }

    /// Rewind every region to offset zero without releasing memory
    pub fn clear(&mut self) {
        for region in &mut self.regions {
            region.slots.clear();
        }
        self.active = 0;
    }

    /// Release every region's backing memory
    pub fn teardown(&mut self) {
        self.regions = Vec::new();
        self.active = 0;
    }

    /// Number of regions currently held (allocated or rewound)
    #[inline]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Slots handed out since the last clear
    pub fn allocated_slots(&self) -> usize {
        self.regions.iter().map(|r| r.slots.len()).sum()
    }

    /// Total slot capacity reserved across all regions
    pub fn reserved_slots(&self) -> usize {
        self.regions.iter().map(|r| r.slots.capacity()).sum()
    }
}

impl<T: Default> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_arena_is_lazy() {
        let arena: Arena<u64> = Arena::new();
        assert_eq!(arena.region_count(), 0);
        assert_eq!(arena.reserved_slots(), 0);
    }

    #[test]
    fn test_alloc_is_default_initialized() {
        let mut arena: Arena<u64> = Arena::with_region_capacity(16);
        let span = arena.alloc_slice(8);
        assert_eq!(span.len(), 8);
        assert!(arena.get(span).iter().all(|&v| v == 0));
        assert_eq!(arena.region_count(), 1);
    }

    #[test]
    fn test_zero_length_rounds_up() {
        let mut arena: Arena<u8> = Arena::with_region_capacity(4);
        let a = arena.alloc_slice(0);
        let b = arena.alloc_slice(0);
        assert_eq!(a.len(), 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_spans_survive_later_allocations() {
        let mut arena: Arena<u32> = Arena::with_region_capacity(4);
        let first = arena.alloc(7);
        // Force several new regions
        let mut others = Vec::new();
        for i in 0..20 {
            others.push(arena.alloc(i));
        }
        assert_eq!(arena.get(first), &[7]);
        for (i, span) in others.iter().enumerate() {
            assert_eq!(arena.get(*span), &[i as u32]);
        }
        assert!(arena.region_count() > 1);
    }

    #[test]
    fn test_oversized_request_gets_own_region() {
        let mut arena: Arena<u16> = Arena::with_region_capacity(8);
        let big = arena.alloc_slice(100);
        assert_eq!(big.len(), 100);
        assert!(arena.reserved_slots() >= 100);
    }

    #[test]
    fn test_clear_keeps_regions_and_zeroes_reuse() {
        let mut arena: Arena<u64> = Arena::with_region_capacity(8);
        for i in 0..30 {
            arena.alloc(i + 1);
        }
        let regions = arena.region_count();
        let reserved = arena.reserved_slots();

        arena.clear();
        assert_eq!(arena.allocated_slots(), 0);
        assert_eq!(arena.region_count(), regions);
        assert_eq!(arena.reserved_slots(), reserved);

        // Reused slots come back default-initialized, not with stale values
        let span = arena.alloc_slice(8);
        assert!(arena.get(span).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_region_count_stabilizes_across_cycles() {
        let mut arena: Arena<u64> = Arena::with_region_capacity(64);
        let mut counts = Vec::new();
        for _ in 0..50 {
            for len in [10, 40, 3, 64, 25, 7] {
                let span = arena.alloc_slice(len);
                assert!(arena.get(span).iter().all(|&v| v == 0));
                arena.get_mut(span).fill(u64::MAX);
            }
            counts.push(arena.region_count());
            arena.clear();
        }
        let settled = counts[2];
        assert!(counts[2..].iter().all(|&c| c == settled), "{:?}", counts);
    }

    #[test]
    fn test_teardown_releases_memory() {
        let mut arena: Arena<u64> = Arena::with_region_capacity(8);
        arena.alloc_slice(20);
        arena.teardown();
        assert_eq!(arena.region_count(), 0);
        assert_eq!(arena.reserved_slots(), 0);

        // Still usable afterwards
        let span = arena.alloc(3);
        assert_eq!(arena.get(span), &[3]);
    }
}
