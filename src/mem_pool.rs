// nexus_core/src/mem_pool.rs
//
// §4.2 bounded object pool: O(1) allocate/deallocate of a fixed-type `T`
// from a contiguous region of `M` cells, so the matching thread never
// touches the heap after startup. Mirrors `Common::MemPool<T>`: a
// `Vec<ObjectBlock<T>>` of `{object, is_free}` pairs with a rotating
// free-index hint.

/// One cell of the pool: the payload followed by a free flag. `T` must be
/// the first field so a raw pointer to `object` can be cast back to the
/// containing `ObjectBlock` (§9 "Pool pointer arithmetic") — enforced here
/// by construction rather than by unsafe pointer-arithmetic tricks, since
/// Rust's pool returns indices rather than raw `T*` back into the pool.
struct ObjectBlock<T> {
    object: T,
    is_free: bool,
}

/// A bounded pool of `T`, allocated once at startup. `allocate` returns a
/// `PoolIndex` rather than a raw pointer: idiomatic Rust has no legal way
/// to reconstruct a `&mut T` from a bare pointer without holding the pool
/// borrowed, so every caller (the order book, the snapshot synthesizer)
/// stores the index and calls back into the pool to dereference it. This
/// preserves the O(1) allocate/deallocate/lookup contract of §4.2 without
/// aliasing raw pointers across the order book's lifetime.
pub struct MemPool<T> {
    store: Vec<ObjectBlock<T>>,
    next_free_index: usize,
}

/// Opaque handle into a `MemPool`. `usize::MAX` is never a valid index
/// (the pool is asserted to contain fewer than `usize::MAX` cells), so it
/// doubles as the pool-local "null" sentinel used by intrusive links in
/// `book` module.
pub type PoolIndex = usize;
pub const POOL_INDEX_INVALID: PoolIndex = usize::MAX;

impl<T: Default> MemPool<T> {
    pub fn new(num_elems: usize) -> Self {
        let store = (0..num_elems)
            .map(|_| ObjectBlock {
                object: T::default(),
                is_free: true,
            })
            .collect();
        Self {
            store,
            next_free_index: 0,
        }
    }

    /// Allocate a cell, overwrite it with `value`, and return its index.
    /// Fatal (panics) if the pool is exhausted — §4.2 "Behavior when full
    /// is fatal" / §7 "pool exhaustion" is an invariant violation, not a
    /// recoverable error.
    pub fn allocate(&mut self, value: T) -> PoolIndex {
        let idx = self.next_free_index;
        assert!(
            self.store[idx].is_free,
            "mem pool corruption: expected free block at index {idx}"
        );
        self.store[idx].object = value;
        self.store[idx].is_free = false;
        self.advance_free_hint();
        idx
    }

    /// Mark a cell free without running any destructor logic beyond
    /// Rust's normal drop glue on overwrite at the next `allocate` —
    /// matches the original's "mark the cell free, don't destroy" note in
    /// §4.2 as closely as a safe Rust pool can.
    pub fn deallocate(&mut self, index: PoolIndex) {
        assert!(index < self.store.len(), "index does not belong to this pool");
        assert!(!self.store[index].is_free, "double free in mem pool at index {index}");
        self.store[index].is_free = true;
    }

    pub fn get(&self, index: PoolIndex) -> &T {
        debug_assert!(!self.store[index].is_free, "reading a freed pool cell");
        &self.store[index].object
    }

    pub fn get_mut(&mut self, index: PoolIndex) -> &mut T {
        debug_assert!(!self.store[index].is_free, "mutating a freed pool cell");
        &mut self.store[index].object
    }

    pub fn capacity(&self) -> usize {
        self.store.len()
    }

    /// O(1) average, O(M) worst case (§4.2) — scans forward from the last
    /// hint, wrapping once, and is fatal if no free cell is found.
    fn advance_free_hint(&mut self) {
        let initial = self.next_free_index;
        loop {
            self.next_free_index = (self.next_free_index + 1) % self.store.len();
            if self.store[self.next_free_index].is_free {
                return;
            }
            if self.next_free_index == initial {
                panic!("mem pool out of space: all {} cells in use", self.store.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_then_deallocate_reuses_cell() {
        let mut pool: MemPool<u64> = MemPool::new(4);
        let a = pool.allocate(10);
        let b = pool.allocate(20);
        assert_eq!(*pool.get(a), 10);
        assert_eq!(*pool.get(b), 20);
        pool.deallocate(a);
        let c = pool.allocate(30);
        assert_eq!(*pool.get(c), 30);
    }

    #[test]
    #[should_panic(expected = "out of space")]
    fn exhaustion_is_fatal() {
        let mut pool: MemPool<u64> = MemPool::new(2);
        pool.allocate(1);
        pool.allocate(2);
        pool.allocate(3);
    }

    #[test]
    #[should_panic(expected = "double free")]
    fn double_free_is_fatal() {
        let mut pool: MemPool<u64> = MemPool::new(2);
        let a = pool.allocate(1);
        pool.deallocate(a);
        pool.deallocate(a);
    }
}
