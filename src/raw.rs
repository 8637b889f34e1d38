// src/raw.rs

//! The untyped channel object shared by every flavor.
//!
//! A `RawChannel` is a fixed byte ring buffer plus the synchronization state
//! the flavor protocols operate on. It knows nothing about payload types;
//! the typed layer in `chan` copies `itemsize`-byte payloads in and out and
//! owns their lifecycle. Channels are allocated and destroyed through the
//! per-thread cache in `cache`, which recycles them by exact shape.
//!
//! Layout rules:
//!
//! - Buffered channels reserve one extra ring slot (`slots == capacity + 1`)
//!   so `head == tail` means empty and `head == tail + 1 (mod slots)` means
//!   full, without a shared item counter.
//! - Rendezvous channels (`capacity == 0`) have a single slot and use `head`
//!   as the occupancy flag; `tail` is unused.
//! - `head`, `tail`, and the two locks each sit on their own cache line:
//!   the producer and consumer hot paths must not share a line.

use crate::flavor::Flavor;
use crate::internal::cache_padded::{CachePadded, CACHE_LINE_SIZE};
use crate::telemetry;

use parking_lot::{Condvar, Mutex};
use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub(crate) struct RawChannel {
  /// Dequeue index, advanced by consumers. Occupancy flag for rendezvous.
  pub(crate) head: CachePadded<AtomicUsize>,
  /// Enqueue index, advanced by producers. Unused for rendezvous.
  pub(crate) tail: CachePadded<AtomicUsize>,
  /// Serializes producers; buffered `not_full` waits are bound to it.
  pub(crate) tail_lock: CachePadded<Mutex<()>>,
  /// Serializes consumers, and both sides of a rendezvous channel.
  pub(crate) head_lock: CachePadded<Mutex<()>>,
  pub(crate) not_full: Condvar,
  pub(crate) not_empty: Condvar,
  /// Advisory shutdown flag. Never consulted by the send/recv paths.
  pub(crate) closed: AtomicBool,
  /// Live typed handles referring to this channel.
  pub(crate) handles: AtomicUsize,
  capacity: usize,
  slots: usize,
  itemsize: usize,
  flavor: Flavor,
  buf: NonNull<u8>,
}

// The flavor protocols synchronize all access to `buf`; the remaining fields
// are atomics and locks. Shared references are handed out by the typed
// handles, which carry the `T: Send` bound.
unsafe impl Send for RawChannel {}
unsafe impl Sync for RawChannel {}

impl RawChannel {
  /// Heap-allocates a channel and its buffer. Aborts on out-of-memory.
  pub(crate) fn alloc(itemsize: usize, capacity: usize, flavor: Flavor) -> NonNull<RawChannel> {
    let slots = if capacity == 0 { 1 } else { capacity + 1 };
    let bytes = slots
      .checked_mul(itemsize)
      .expect("channel buffer size overflows usize");
    let buf = if bytes == 0 {
      NonNull::dangling()
    } else {
      let layout = Layout::from_size_align(bytes, CACHE_LINE_SIZE).expect("invalid buffer layout");
      match NonNull::new(unsafe { alloc::alloc(layout) }) {
        Some(p) => p,
        None => alloc::handle_alloc_error(layout),
      }
    };
    telemetry::increment_counter("channel.alloc");
    let chan = Box::new(RawChannel {
      head: CachePadded::new(AtomicUsize::new(0)),
      tail: CachePadded::new(AtomicUsize::new(0)),
      tail_lock: CachePadded::new(Mutex::new(())),
      head_lock: CachePadded::new(Mutex::new(())),
      not_full: Condvar::new(),
      not_empty: Condvar::new(),
      closed: AtomicBool::new(false),
      handles: AtomicUsize::new(0),
      capacity,
      slots,
      itemsize,
      flavor,
      buf,
    });
    unsafe { NonNull::new_unchecked(Box::into_raw(chan)) }
  }

  /// Frees a channel object and its buffer.
  ///
  /// # Safety
  ///
  /// `ptr` must come from [`RawChannel::alloc`], no other thread may still
  /// reference it, and it must not be freed twice.
  pub(crate) unsafe fn destroy(ptr: NonNull<RawChannel>) {
    telemetry::increment_counter("channel.destroy");
    let chan = Box::from_raw(ptr.as_ptr());
    let bytes = chan.slots * chan.itemsize;
    if bytes != 0 {
      let layout = Layout::from_size_align_unchecked(bytes, CACHE_LINE_SIZE);
      alloc::dealloc(chan.buf.as_ptr(), layout);
    }
  }

  #[inline]
  pub(crate) fn capacity(&self) -> usize {
    self.capacity
  }

  #[inline]
  pub(crate) fn slots(&self) -> usize {
    self.slots
  }

  #[inline]
  pub(crate) fn itemsize(&self) -> usize {
    self.itemsize
  }

  #[inline]
  pub(crate) fn flavor(&self) -> Flavor {
    self.flavor
  }

  #[inline]
  pub(crate) fn is_rendezvous(&self) -> bool {
    self.capacity == 0
  }

  /// Pointer to the start of ring slot `index`.
  #[inline]
  pub(crate) fn slot_ptr(&self, index: usize) -> *mut u8 {
    debug_assert!(index < self.slots);
    unsafe { self.buf.as_ptr().add(index * self.itemsize) }
  }

  /// Buffered item count, or the occupancy flag for rendezvous channels.
  /// Racy when read outside the relevant lock; callers treat it as a hint
  /// and re-check after synchronizing.
  #[inline]
  pub(crate) fn num_items(&self) -> usize {
    let head = self.head.load(Ordering::Relaxed);
    if self.capacity == 0 {
      head
    } else {
      let tail = self.tail.load(Ordering::Relaxed);
      (self.slots + tail - head) % self.slots
    }
  }

  #[inline]
  pub(crate) fn is_full(&self) -> bool {
    if self.capacity == 0 {
      self.head.load(Ordering::Relaxed) == 1
    } else {
      self.num_items() == self.slots - 1
    }
  }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool {
    if self.capacity == 0 {
      self.head.load(Ordering::Relaxed) == 0
    } else {
      self.head.load(Ordering::Relaxed) == self.tail.load(Ordering::Relaxed)
    }
  }

  /// Returns the channel to its freshly-constructed state so the cache can
  /// hand it out again. The caller must hold the only reference and must
  /// have drained any remaining payloads first.
  pub(crate) fn reset(&self) {
    self.head.store(0, Ordering::Relaxed);
    self.tail.store(0, Ordering::Relaxed);
    self.closed.store(false, Ordering::Relaxed);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn buffered_layout() {
    let chan = RawChannel::alloc(4, 8, Flavor::Mpmc);
    let raw = unsafe { chan.as_ref() };
    assert_eq!(raw.capacity(), 8);
    assert_eq!(raw.slots(), 9);
    assert_eq!(raw.itemsize(), 4);
    assert!(raw.is_empty());
    assert!(!raw.is_full());
    assert_eq!(raw.num_items(), 0);
    unsafe { RawChannel::destroy(chan) };
  }

  #[test]
  fn rendezvous_layout() {
    let chan = RawChannel::alloc(8, 0, Flavor::Spsc);
    let raw = unsafe { chan.as_ref() };
    assert!(raw.is_rendezvous());
    assert_eq!(raw.slots(), 1);
    assert!(raw.is_empty());
    raw.head.store(1, Ordering::Relaxed);
    assert!(raw.is_full());
    assert_eq!(raw.num_items(), 1);
    unsafe { RawChannel::destroy(chan) };
  }

  #[test]
  fn occupancy_wraps_around() {
    let chan = RawChannel::alloc(4, 2, Flavor::Mpmc);
    let raw = unsafe { chan.as_ref() };
    // Walk the indices through a full cycle of the 3-slot ring.
    for start in 0..raw.slots() {
      raw.head.store(start, Ordering::Relaxed);
      raw.tail.store(start, Ordering::Relaxed);
      assert!(raw.is_empty());
      raw.tail.store((start + 2) % raw.slots(), Ordering::Relaxed);
      assert_eq!(raw.num_items(), 2);
      assert!(raw.is_full());
    }
    unsafe { RawChannel::destroy(chan) };
  }

  #[test]
  fn zero_sized_items() {
    let chan = RawChannel::alloc(0, 4, Flavor::Spsc);
    let raw = unsafe { chan.as_ref() };
    assert_eq!(raw.itemsize(), 0);
    assert!(raw.is_empty());
    unsafe { RawChannel::destroy(chan) };
  }
}
