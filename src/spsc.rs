// src/spsc.rs

//! The single-producer, single-consumer protocol.
//!
//! Both sides are unique, so neither takes a lock on the hot path. Each
//! busy-waits on its predicate with a CPU relaxation hint, copies, fences,
//! publishes its index, and notifies the opposite condvar. The receive path
//! is the shared single-consumer one in `mpsc`.

use crate::chan::{self, Receiver, Sender};
use crate::flavor::Flavor;
use crate::raw::RawChannel;
use crate::sync_util;

use std::ptr;
use std::sync::atomic::{fence, Ordering};

/// Creates an SPSC channel. Neither handle is cloneable; each may be moved
/// to one other thread. `capacity == 0` yields a rendezvous channel.
pub fn channel<T: Send>(capacity: usize) -> (Sender<T>, Receiver<T>) {
  chan::spsc_pair(capacity, Flavor::Spsc)
}

/// Single-producer send: lock-free busy-wait counterpart of the MPMC path.
pub(crate) unsafe fn send(chan: &RawChannel, src: *const u8, size: usize, non_blocking: bool) -> bool {
  assert!(size <= chan.itemsize());
  if chan.is_full() {
    if non_blocking {
      return false;
    }
    sync_util::spin_while(|| chan.is_full());
  }
  // Order the consumer's copy-out of the slot being reused before our write.
  fence(Ordering::SeqCst);
  if chan.is_rendezvous() {
    ptr::copy_nonoverlapping(src, chan.slot_ptr(0), size);
    fence(Ordering::SeqCst);
    chan.head.store(1, Ordering::Relaxed);
  } else {
    let tail = chan.tail.load(Ordering::Relaxed);
    ptr::copy_nonoverlapping(src, chan.slot_ptr(tail), size);
    fence(Ordering::SeqCst);
    chan.tail.store((tail + 1) % chan.slots(), Ordering::Relaxed);
  }
  chan.not_empty.notify_one();
  true
}

#[cfg(test)]
mod tests {
  use crate::error::TrySendError;

  #[test]
  fn create_channel() {
    let (tx, rx) = super::channel::<i32>(1);
    assert_eq!(tx.capacity(), 1);
    assert_eq!(rx.capacity(), 1);
  }

  #[test]
  fn send_recv_single_item() {
    let (mut tx, mut rx) = super::channel(1);
    tx.send(42i32);
    assert_eq!(rx.recv(), 42);
  }

  #[test]
  fn try_send_full() {
    let (mut tx, mut rx) = super::channel::<i32>(1);
    tx.try_send(10).unwrap();
    match tx.try_send(20) {
      Err(TrySendError::Full(v)) => assert_eq!(v, 20),
      res => panic!("expected Full, got {:?}", res),
    }
    assert_eq!(rx.try_recv(), Ok(10));
    // Space freed by the receive is usable at once.
    tx.try_send(20).unwrap();
  }
}
