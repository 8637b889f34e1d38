// src/mpsc.rs

//! The multi-producer, single-consumer protocol.
//!
//! Producers take the same tail-lock path as MPMC. The consumer is unique,
//! so its path drops the head lock entirely: it busy-waits on the emptiness
//! predicate with a CPU relaxation hint, fences, copies the item out, fences
//! again, publishes the new `head`, and notifies `not_full` to release any
//! parked producer. This trades a lock acquisition on the hot receive path
//! for spinning over micro-contention windows.

use crate::chan::{self, MultiSender, Receiver};
use crate::flavor::Flavor;
use crate::raw::RawChannel;
use crate::sync_util;

use std::ptr;
use std::sync::atomic::{fence, Ordering};

/// Creates an MPSC channel: a cloneable sender, a unique receiver.
/// `capacity == 0` yields a rendezvous channel.
pub fn channel<T: Send>(capacity: usize) -> (MultiSender<T>, Receiver<T>) {
  chan::mpsc_pair(capacity, Flavor::Mpsc)
}

/// Single-consumer receive, shared by the MPSC and SPSC flavors.
pub(crate) unsafe fn recv(chan: &RawChannel, dst: *mut u8, size: usize, non_blocking: bool) -> bool {
  assert!(size <= chan.itemsize());
  if chan.is_empty() {
    if non_blocking {
      return false;
    }
    sync_util::spin_while(|| chan.is_empty());
  }
  fence(Ordering::SeqCst);
  if chan.is_rendezvous() {
    ptr::copy_nonoverlapping(chan.slot_ptr(0), dst, size);
    fence(Ordering::SeqCst);
    chan.head.store(0, Ordering::Relaxed);
  } else {
    let head = chan.head.load(Ordering::Relaxed);
    ptr::copy_nonoverlapping(chan.slot_ptr(head), dst, size);
    fence(Ordering::SeqCst);
    chan.head.store((head + 1) % chan.slots(), Ordering::Relaxed);
  }
  chan.not_full.notify_one();
  true
}
