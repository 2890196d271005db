// nexus_core/src/ring_buffer.rs
//
// §4.1 single-producer/single-consumer ring buffer. The sole inter-thread
// conduit in this crate: every queue named in §2's dataflow diagram (client
// requests, client responses, market updates, md-updates, strategy
// requests/responses) is one of these, instantiated over the wire/internal
// type it carries.
//
// Two-step protocol on both ends (reserve-then-commit) mirrors the
// original `Common::LFQueue<T>`: producer calls `reserve_write` then
// `commit_write`; consumer calls `peek_read` then `commit_read`. Neither
// side ever blocks or allocates past construction.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A fixed-capacity SPSC ring buffer. `T` must be `Copy` — every element
/// in this system is a plain value type (§3 "any `T` with trivial copy and
/// no internal ownership of heap").
pub struct SpscRingBuffer<T> {
    store: Box<[UnsafeCell<T>]>,
    capacity: usize,
    write_index: AtomicUsize,
    read_index: AtomicUsize,
    count: AtomicUsize,
}

// Safety: `store` is only ever written through `reserve_write` (producer
// thread only) and only ever read through `peek_read` (consumer thread
// only); the atomic counters provide the release/acquire handoff the
// contract in §4.1 requires.
unsafe impl<T: Send> Send for SpscRingBuffer<T> {}
unsafe impl<T: Send> Sync for SpscRingBuffer<T> {}

impl<T: Copy + Default> SpscRingBuffer<T> {
    /// Pre-allocates `capacity` default-constructed slots. A power-of-two
    /// capacity is recommended (§4.1) but not required; this implementation
    /// uses `%` rather than masking so any positive capacity works.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        let store = (0..capacity)
            .map(|_| UnsafeCell::new(T::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            store,
            capacity,
            write_index: AtomicUsize::new(0),
            read_index: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
        }
    }

    /// Producer only. Returns a pointer to the slot at the current write
    /// index for in-place writing. Never fails, never blocks; the caller
    /// is responsible for not overrunning (`size() < capacity`).
    #[inline]
    pub fn reserve_write(&self) -> *mut T {
        let idx = self.write_index.load(Ordering::Relaxed);
        self.store[idx].get()
    }

    /// Producer only. Advances the write index and publishes the slot to
    /// the consumer. Precondition: `size() < capacity`; violating it is a
    /// caller bug (§4.1 "Failure semantics"), asserted in debug builds.
    #[inline]
    pub fn commit_write(&self) {
        debug_assert!(
            self.count.load(Ordering::Relaxed) < self.capacity,
            "ring buffer overrun: producer committed past capacity"
        );
        let idx = self.write_index.load(Ordering::Relaxed);
        self.write_index.store((idx + 1) % self.capacity, Ordering::Relaxed);
        // Release: the element store above must be visible to the consumer
        // once it observes this incremented count.
        self.count.fetch_add(1, Ordering::Release);
    }

    /// Producer convenience: write `value` into the next slot and commit in
    /// one call.
    #[inline]
    pub fn push(&self, value: T) {
        unsafe {
            *self.reserve_write() = value;
        }
        self.commit_write();
    }

    /// Consumer only. Returns a pointer to the next unread slot, or `None`
    /// if the queue is empty. Never blocks.
    #[inline]
    pub fn peek_read(&self) -> Option<*const T> {
        // Acquire: pairs with the producer's Release in `commit_write` so
        // the slot contents written before that commit are visible here.
        if self.count.load(Ordering::Acquire) == 0 {
            return None;
        }
        let idx = self.read_index.load(Ordering::Relaxed);
        Some(self.store[idx].get() as *const T)
    }

    /// Consumer only. Advances the read index, freeing the slot for reuse
    /// by the producer. Precondition: the queue is non-empty; an
    /// attempted commit-read on an empty queue is fatal (§4.1 "Failure
    /// semantics").
    #[inline]
    pub fn commit_read(&self) {
        let idx = self.read_index.load(Ordering::Relaxed);
        self.read_index.store((idx + 1) % self.capacity, Ordering::Relaxed);
        let prev = self.count.fetch_sub(1, Ordering::Release);
        assert!(prev != 0, "ring buffer underrun: commit_read on an empty queue");
    }

    /// Consumer convenience: read and pop the next element by value.
    #[inline]
    pub fn pop(&self) -> Option<T> {
        let ptr = self.peek_read()?;
        let value = unsafe { *ptr };
        self.commit_read();
        Some(value)
    }

    /// Safe from either thread; may be stale immediately (§4.1 `size`).
    #[inline]
    pub fn size(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn push_pop_preserves_order() {
        let q: SpscRingBuffer<u32> = SpscRingBuffer::new(4);
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn wraps_around_capacity() {
        let q: SpscRingBuffer<u32> = SpscRingBuffer::new(2);
        q.push(1);
        q.push(2);
        assert_eq!(q.pop(), Some(1));
        q.push(3);
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
        assert_eq!(q.size(), 0);
    }

    #[test]
    fn size_bounded_by_capacity() {
        let q: SpscRingBuffer<u32> = SpscRingBuffer::new(8);
        for i in 0..5 {
            q.push(i);
            assert!(q.size() <= 8);
        }
        assert_eq!(q.size(), 5);
    }

    #[test]
    #[should_panic(expected = "underrun")]
    fn commit_read_on_empty_is_fatal() {
        let q: SpscRingBuffer<u32> = SpscRingBuffer::new(4);
        q.commit_read();
    }

    #[test]
    fn cross_thread_handoff_preserves_sequence() {
        let q = Arc::new(SpscRingBuffer::<u64>::new(64));
        let producer_q = q.clone();
        let producer = thread::spawn(move || {
            for i in 0..10_000u64 {
                loop {
                    if producer_q.size() < producer_q.capacity() {
                        producer_q.push(i);
                        break;
                    }
                }
            }
        });

        let mut received = Vec::with_capacity(10_000);
        while received.len() < 10_000 {
            if let Some(v) = q.pop() {
                received.push(v);
            }
        }
        producer.join().unwrap();
        assert_eq!(received, (0..10_000u64).collect::<Vec<_>>());
    }
}
