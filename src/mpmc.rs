// src/mpmc.rs

//! The multi-producer, multi-consumer protocol.
//!
//! Two locks partition access: producers serialize on `tail_lock`, consumers
//! on `head_lock`, so an enqueue and a dequeue can run simultaneously. A
//! blocked producer parks on `not_full` under the tail lock; a blocked
//! consumer parks on `not_empty` under the head lock. Each side notifies the
//! opposite condvar after publishing its index advance.
//!
//! Rendezvous channels (capacity 0) funnel both sides through `head_lock`
//! and hand items through the single slot, with `head` as occupancy flag.
//!
//! Payload bytes are always published before the index that makes them
//! visible: a sequentially consistent fence separates the copy from the
//! index store, and the observing side fences again after reading the index.

use crate::chan::{self, MultiReceiver, MultiSender};
use crate::flavor::Flavor;
use crate::raw::RawChannel;
use crate::sync_util;

use std::ptr;
use std::sync::atomic::{fence, Ordering};

/// Creates an MPMC channel. Both handles are cloneable and shareable;
/// `capacity == 0` yields a rendezvous channel.
pub fn channel<T: Send>(capacity: usize) -> (MultiSender<T>, MultiReceiver<T>) {
  chan::mpmc_pair(capacity, Flavor::Mpmc)
}

pub(crate) unsafe fn send(chan: &RawChannel, src: *const u8, size: usize, non_blocking: bool) -> bool {
  assert!(size <= chan.itemsize());
  if chan.is_rendezvous() {
    return rendezvous_send(chan, src, size, non_blocking);
  }
  // Racy fast path: a hint, not a decision.
  if non_blocking && chan.is_full() {
    return false;
  }
  let mut guard = chan.tail_lock.lock();
  if non_blocking && chan.is_full() {
    return false;
  }
  sync_util::wait_while(&chan.not_full, &mut guard, || chan.is_full());
  // Order the consumer's copy-out of the slot we are about to reuse before
  // our overwrite of it.
  fence(Ordering::SeqCst);
  let tail = chan.tail.load(Ordering::Relaxed);
  ptr::copy_nonoverlapping(src, chan.slot_ptr(tail), size);
  fence(Ordering::SeqCst);
  chan.tail.store((tail + 1) % chan.slots(), Ordering::Relaxed);
  drop(guard);
  chan.not_empty.notify_one();
  true
}

pub(crate) unsafe fn recv(chan: &RawChannel, dst: *mut u8, size: usize, non_blocking: bool) -> bool {
  assert!(size <= chan.itemsize());
  if chan.is_rendezvous() {
    return rendezvous_recv(chan, dst, size, non_blocking);
  }
  if non_blocking && chan.is_empty() {
    return false;
  }
  let mut guard = chan.head_lock.lock();
  if non_blocking && chan.is_empty() {
    return false;
  }
  sync_util::wait_while(&chan.not_empty, &mut guard, || chan.is_empty());
  fence(Ordering::SeqCst);
  let head = chan.head.load(Ordering::Relaxed);
  ptr::copy_nonoverlapping(chan.slot_ptr(head), dst, size);
  fence(Ordering::SeqCst);
  chan.head.store((head + 1) % chan.slots(), Ordering::Relaxed);
  drop(guard);
  chan.not_full.notify_one();
  true
}

// Rendezvous: one slot, `head` is the occupancy flag. Send completes by
// occupying the slot; it does not wait for the consumer to pick the item up.

unsafe fn rendezvous_send(
  chan: &RawChannel,
  src: *const u8,
  size: usize,
  non_blocking: bool,
) -> bool {
  if non_blocking && chan.is_full() {
    return false;
  }
  let mut guard = chan.head_lock.lock();
  if non_blocking && chan.is_full() {
    return false;
  }
  sync_util::wait_while(&chan.not_full, &mut guard, || chan.is_full());
  ptr::copy_nonoverlapping(src, chan.slot_ptr(0), size);
  fence(Ordering::SeqCst);
  chan.head.store(1, Ordering::Relaxed);
  drop(guard);
  chan.not_empty.notify_one();
  true
}

unsafe fn rendezvous_recv(
  chan: &RawChannel,
  dst: *mut u8,
  size: usize,
  non_blocking: bool,
) -> bool {
  if non_blocking && chan.is_empty() {
    return false;
  }
  let mut guard = chan.head_lock.lock();
  if non_blocking && chan.is_empty() {
    return false;
  }
  sync_util::wait_while(&chan.not_empty, &mut guard, || chan.is_empty());
  fence(Ordering::SeqCst);
  ptr::copy_nonoverlapping(chan.slot_ptr(0), dst, size);
  fence(Ordering::SeqCst);
  chan.head.store(0, Ordering::Relaxed);
  drop(guard);
  chan.not_full.notify_one();
  true
}
