// src/flavor.rs

//! The flavor tag and the dispatch into the per-flavor protocols.

use crate::raw::RawChannel;
use crate::{mpmc, mpsc, spsc};

/// Producer/consumer cardinality mode of a channel, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flavor {
  /// Any number of producers, any number of consumers.
  Mpmc,
  /// Any number of producers, a unique consumer.
  Mpsc,
  /// A unique producer and a unique consumer.
  Spsc,
}

/// Copies `size` bytes from `src` into the channel, honoring the flavor's
/// send protocol. Returns `false` only when `non_blocking` is set and the
/// channel was observed full.
///
/// # Safety
///
/// `src` must be valid for `size` bytes, and `size` must not exceed the
/// channel's `itemsize` (asserted by the protocols).
pub(crate) unsafe fn raw_send(
  chan: &RawChannel,
  src: *const u8,
  size: usize,
  non_blocking: bool,
) -> bool {
  match chan.flavor() {
    // Producers serialize on the tail lock regardless of consumer count.
    Flavor::Mpmc | Flavor::Mpsc => mpmc::send(chan, src, size, non_blocking),
    Flavor::Spsc => spsc::send(chan, src, size, non_blocking),
  }
}

/// Copies the next item's bytes into `dst`, honoring the flavor's receive
/// protocol. Returns `false` only when `non_blocking` is set and the channel
/// was observed empty.
///
/// # Safety
///
/// `dst` must be writable for `size` bytes, and `size` must not exceed the
/// channel's `itemsize` (asserted by the protocols).
pub(crate) unsafe fn raw_recv(
  chan: &RawChannel,
  dst: *mut u8,
  size: usize,
  non_blocking: bool,
) -> bool {
  match chan.flavor() {
    Flavor::Mpmc => mpmc::recv(chan, dst, size, non_blocking),
    // The single-consumer path does not depend on the producer count.
    Flavor::Mpsc | Flavor::Spsc => mpsc::recv(chan, dst, size, non_blocking),
  }
}
