//! Blocking and spinning helpers shared by the flavor protocols.

use parking_lot::{Condvar, MutexGuard};
use std::time::Duration;

/// Upper bound on a single condvar wait.
///
/// The fullness/emptiness predicates are published under the peer side's
/// lock, so a notification can land between a waiter's predicate check and
/// its wait. The bounded tick turns that lost wakeup into a short stall
/// instead of a hang; spurious wakeups are already tolerated by every
/// caller's re-check loop.
const WAIT_TICK: Duration = Duration::from_micros(500);

/// Blocks on `cond` until `pred` turns false, re-checking on every wakeup.
pub(crate) fn wait_while<F>(cond: &Condvar, guard: &mut MutexGuard<'_, ()>, mut pred: F)
where
  F: FnMut() -> bool,
{
  while pred() {
    cond.wait_for(guard, WAIT_TICK);
  }
}

/// Busy-waits until `pred` turns false, with a CPU relaxation hint per spin.
#[inline]
pub(crate) fn spin_while<F>(mut pred: F)
where
  F: FnMut() -> bool,
{
  while pred() {
    core::hint::spin_loop();
  }
}
