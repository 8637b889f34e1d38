// src/cache.rs

//! Per-thread recycling of channel objects.
//!
//! Building a channel means heap allocations plus lock and condvar
//! initialization, which is expensive next to typical channel throughput.
//! Each thread therefore keeps a free list of fully-initialized channels,
//! bucketed by exact shape `(itemsize, capacity, flavor)`, and satisfies
//! allocations from it before touching the global allocator. A recycled
//! channel is always empty and not closed.
//!
//! The cache is torn down when the thread exits; threads that outlive the
//! process teardown order can call [`flush_thread_cache`] explicitly.

use crate::flavor::Flavor;
use crate::raw::RawChannel;
use crate::telemetry;

use std::cell::RefCell;
use std::ptr::NonNull;

/// Maximum recycled channels kept per bucket. `0` disables caching.
pub(crate) const CHANNEL_CACHE_SIZE: usize = 100;

struct Bucket {
  itemsize: usize,
  capacity: usize,
  flavor: Flavor,
  free: Vec<NonNull<RawChannel>>,
}

impl Bucket {
  #[inline]
  fn matches(&self, itemsize: usize, capacity: usize, flavor: Flavor) -> bool {
    self.itemsize == itemsize && self.capacity == capacity && self.flavor == flavor
  }
}

#[derive(Default)]
struct ChannelCache {
  buckets: Vec<Bucket>,
}

impl ChannelCache {
  fn acquire(&mut self, itemsize: usize, capacity: usize, flavor: Flavor) -> NonNull<RawChannel> {
    for bucket in &mut self.buckets {
      if bucket.matches(itemsize, capacity, flavor) {
        if let Some(chan) = bucket.free.pop() {
          debug_assert!(unsafe { chan.as_ref() }.is_empty());
          telemetry::increment_counter("channel-cache.hit");
          log::trace!(
            "channel cache hit: itemsize={} capacity={} flavor={:?}",
            itemsize,
            capacity,
            flavor
          );
          return chan;
        }
        telemetry::increment_counter("channel-cache.miss");
        return RawChannel::alloc(itemsize, capacity, flavor);
      }
    }
    // First channel of this shape on this thread; keep an empty bucket so
    // future frees can be cached.
    telemetry::increment_counter("channel-cache.miss");
    let chan = RawChannel::alloc(itemsize, capacity, flavor);
    self.buckets.push(Bucket {
      itemsize,
      capacity,
      flavor,
      free: Vec::new(),
    });
    chan
  }

  fn release(&mut self, chan: NonNull<RawChannel>) {
    let (itemsize, capacity, flavor) = {
      let raw = unsafe { chan.as_ref() };
      debug_assert!(raw.is_empty());
      (raw.itemsize(), raw.capacity(), raw.flavor())
    };
    for bucket in &mut self.buckets {
      if bucket.matches(itemsize, capacity, flavor) && bucket.free.len() < CHANNEL_CACHE_SIZE {
        bucket.free.push(chan);
        return;
      }
    }
    unsafe { RawChannel::destroy(chan) };
  }

  fn flush(&mut self) {
    for mut bucket in self.buckets.drain(..) {
      log::trace!(
        "destroying {} cached channels: itemsize={} capacity={} flavor={:?}",
        bucket.free.len(),
        bucket.itemsize,
        bucket.capacity,
        bucket.flavor
      );
      for chan in bucket.free.drain(..) {
        unsafe { RawChannel::destroy(chan) };
      }
    }
  }
}

impl Drop for ChannelCache {
  fn drop(&mut self) {
    self.flush();
  }
}

thread_local! {
  static CACHE: RefCell<ChannelCache> = RefCell::new(ChannelCache::default());
}

/// Hands out a channel of the requested shape, recycled if possible.
pub(crate) fn acquire(itemsize: usize, capacity: usize, flavor: Flavor) -> NonNull<RawChannel> {
  if CHANNEL_CACHE_SIZE == 0 {
    return RawChannel::alloc(itemsize, capacity, flavor);
  }
  match CACHE.try_with(|cache| cache.borrow_mut().acquire(itemsize, capacity, flavor)) {
    Ok(chan) => chan,
    // Thread-local storage already torn down; fall back to a plain allocation.
    Err(_) => RawChannel::alloc(itemsize, capacity, flavor),
  }
}

/// Takes back a channel whose last handle was dropped. The channel must be
/// empty and reset. Cached if its bucket has room, destroyed otherwise.
pub(crate) fn release(chan: NonNull<RawChannel>) {
  if CHANNEL_CACHE_SIZE == 0 {
    unsafe { RawChannel::destroy(chan) };
    return;
  }
  let released = CACHE.try_with(|cache| cache.borrow_mut().release(chan));
  if released.is_err() {
    // Dropped during thread teardown, after the cache itself was destroyed.
    unsafe { RawChannel::destroy(chan) };
  }
}

/// Destroys every channel cached by the current thread.
///
/// Runs automatically at thread exit; calling it earlier just releases the
/// memory sooner. Channels still owned by live handles are unaffected.
pub fn flush_thread_cache() {
  let _ = CACHE.try_with(|cache| cache.borrow_mut().flush());
}

#[cfg(test)]
mod tests {
  use super::*;

  fn acquire_release_once(itemsize: usize, capacity: usize, flavor: Flavor) -> usize {
    let chan = acquire(itemsize, capacity, flavor);
    let addr = chan.as_ptr() as usize;
    release(chan);
    addr
  }

  #[test]
  fn recycles_by_exact_shape() {
    flush_thread_cache();
    let first = acquire_release_once(4, 8, Flavor::Mpmc);
    // Same shape: the freed channel comes back, by identity.
    for _ in 0..5 {
      assert_eq!(acquire_release_once(4, 8, Flavor::Mpmc), first);
    }
    flush_thread_cache();
  }

  #[test]
  fn shape_mismatch_allocates_fresh() {
    flush_thread_cache();
    let chan = acquire(4, 8, Flavor::Mpsc);
    let addr = chan.as_ptr() as usize;
    release(chan);
    // Different capacity, different flavor, different itemsize: none may
    // reuse the cached object.
    let other = acquire(4, 9, Flavor::Mpsc);
    assert_ne!(other.as_ptr() as usize, addr);
    release(other);
    let other = acquire(4, 8, Flavor::Spsc);
    assert_ne!(other.as_ptr() as usize, addr);
    release(other);
    let other = acquire(8, 8, Flavor::Mpsc);
    assert_ne!(other.as_ptr() as usize, addr);
    release(other);
    flush_thread_cache();
  }

  #[test]
  fn recycled_channels_are_reset() {
    flush_thread_cache();
    let chan = acquire(8, 4, Flavor::Spsc);
    unsafe { chan.as_ref() }.closed.store(true, std::sync::atomic::Ordering::Relaxed);
    unsafe { chan.as_ref() }.reset();
    release(chan);
    let again = acquire(8, 4, Flavor::Spsc);
    let raw = unsafe { again.as_ref() };
    assert!(raw.is_empty());
    assert!(!raw.closed.load(std::sync::atomic::Ordering::Relaxed));
    release(again);
    flush_thread_cache();
  }

  #[test]
  fn flush_empties_the_free_list() {
    flush_thread_cache();
    let first = acquire_release_once(16, 2, Flavor::Mpmc);
    flush_thread_cache();
    // After the flush nothing is recycled, so identity reuse is no longer
    // guaranteed to hold across shapes; what must hold is that the cache
    // still works afterwards.
    let next = acquire_release_once(16, 2, Flavor::Mpmc);
    assert_eq!(acquire_release_once(16, 2, Flavor::Mpmc), next);
    let _ = first;
    flush_thread_cache();
  }

  #[test]
  fn caches_are_per_thread() {
    flush_thread_cache();
    let here = acquire_release_once(4, 6, Flavor::Mpmc);
    let there = std::thread::spawn(move || {
      // A fresh thread has an empty cache: it cannot see `here`'s object.
      let chan = acquire(4, 6, Flavor::Mpmc);
      let addr = chan.as_ptr() as usize;
      release(chan);
      addr
    })
    .join()
    .unwrap();
    assert_ne!(here, there);
    flush_thread_cache();
  }
}
