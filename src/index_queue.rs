//! Bounded single-producer/single-consumer queue of buffer indices.
//!
//! Only the event-loop thread ever touches this queue (it both recycles
//! buffers and hands them out), so the atomics here see no real
//! contention. They exist for the same reason the teacher's
//! [`crate::buffer_pool::BufferPool`] cursors are atomic: to make the
//! acquire/release discipline explicit at the type level rather than
//! relying on single-threaded convention to stay correct under future
//! refactors.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bounded SPSC ring of `u16` buffer indices.
///
/// `push` publishes with release ordering and `pop` observes with
/// acquire ordering, per spec §3's free-index queue semantics. Capacity
/// is fixed at construction and never grows.
pub struct IndexQueue {
    slots: Box<[UnsafeCell<u16>]>,
    mask: usize,
    head: AtomicUsize,
    tail: AtomicUsize,
}

unsafe impl Sync for IndexQueue {}

impl IndexQueue {
    /// `capacity` is rounded up to the next power of two internally so
    /// index math can use a mask instead of a modulo.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = capacity.next_power_of_two().max(1);
        let slots = (0..cap).map(|_| UnsafeCell::new(0u16)).collect();
        Self {
            slots,
            mask: cap - 1,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Number of indices currently enqueued.
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Enqueue `index`. Returns `false` if the queue is full (should not
    /// happen in steady state: the queue is sized to hold every index).
    pub fn push(&self, index: u16) -> bool {
        if self.is_full() {
            return false;
        }
        let tail = self.tail.load(Ordering::Relaxed);
        let slot = tail & self.mask;
        unsafe {
            *self.slots[slot].get() = index;
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Dequeue the oldest index, or `None` if empty.
    pub fn pop(&self) -> Option<u16> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let slot = head & self.mask;
        let value = unsafe { *self.slots[slot].get() };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(value)
    }
}
