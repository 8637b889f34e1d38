// src/chan.rs

//! Typed handles over the untyped channel engine.
//!
//! A payload crosses the thread boundary as a raw byte copy: `send` wraps
//! the value in `ManuallyDrop`, copies its bytes into a ring slot, and lets
//! the source die without running its destructor; `recv` copies the slot
//! into a `MaybeUninit` and adopts it as the owning representation. That is
//! a genuine move provided the payload may be owned by another thread at
//! all, which is exactly the `T: Send` bound every constructor carries.
//!
//! Flavor cardinality is enforced by the handle types instead of caller
//! discipline: [`Sender`] and [`Receiver`] are the unique sides (movable to
//! one thread, neither `Clone` nor `Sync`), while [`MultiSender`] and
//! [`MultiReceiver`] may be cloned and shared freely.
//!
//! The last handle to drop drains whatever payloads are still buffered,
//! resets the channel, and returns it to the per-thread cache.

use crate::cache;
use crate::error::{TryRecvError, TrySendError};
use crate::flavor::{self, Flavor};
use crate::raw::RawChannel;

use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop, MaybeUninit};
use std::ptr::NonNull;
use std::sync::atomic::{fence, Ordering};

/// A value proven to be the caller's alone, ready for transfer to another
/// thread in one step.
///
/// Construction consumes the value, and the `T: Send` bound rejects
/// payloads that must not change threads. [`Receiver::recv_owned`] and
/// [`MultiReceiver::recv_owned`] return received items in this form.
pub struct Isolated<T: Send>(T);

impl<T: Send> Isolated<T> {
  /// Wraps a value the caller fully owns.
  #[inline]
  pub fn new(value: T) -> Self {
    Isolated(value)
  }

  /// Unwraps the value.
  #[inline]
  pub fn into_inner(self) -> T {
    self.0
  }
}

impl<T: Send> fmt::Debug for Isolated<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Isolated(..)")
  }
}

/// Shared plumbing behind the four public handle types.
struct ChanRef<T> {
  chan: NonNull<RawChannel>,
  _marker: PhantomData<T>,
}

impl<T: Send> ChanRef<T> {
  /// Acquires a channel of the right shape and returns the two initial
  /// handles. The handle count starts at two, one per side.
  fn create(capacity: usize, flavor: Flavor) -> (Self, Self) {
    let chan = cache::acquire(mem::size_of::<T>(), capacity, flavor);
    unsafe { chan.as_ref() }.handles.store(2, Ordering::Relaxed);
    (
      ChanRef {
        chan,
        _marker: PhantomData,
      },
      ChanRef {
        chan,
        _marker: PhantomData,
      },
    )
  }
}

impl<T> ChanRef<T> {
  #[inline]
  fn raw(&self) -> &RawChannel {
    unsafe { self.chan.as_ref() }
  }

  fn send(&self, item: T) {
    let item = ManuallyDrop::new(item);
    // The copy is the move; the source must not run its destructor.
    unsafe {
      flavor::raw_send(
        self.raw(),
        &*item as *const T as *const u8,
        mem::size_of::<T>(),
        false,
      );
    }
  }

  fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
    let item = ManuallyDrop::new(item);
    let sent = unsafe {
      flavor::raw_send(
        self.raw(),
        &*item as *const T as *const u8,
        mem::size_of::<T>(),
        true,
      )
    };
    if sent {
      Ok(())
    } else {
      Err(TrySendError::Full(ManuallyDrop::into_inner(item)))
    }
  }

  fn recv(&self) -> T {
    let mut slot = MaybeUninit::<T>::uninit();
    unsafe {
      flavor::raw_recv(
        self.raw(),
        slot.as_mut_ptr().cast(),
        mem::size_of::<T>(),
        false,
      );
      slot.assume_init()
    }
  }

  fn try_recv(&self) -> Result<T, TryRecvError> {
    let mut slot = MaybeUninit::<T>::uninit();
    let received = unsafe {
      flavor::raw_recv(
        self.raw(),
        slot.as_mut_ptr().cast(),
        mem::size_of::<T>(),
        true,
      )
    };
    if received {
      Ok(unsafe { slot.assume_init() })
    } else {
      Err(TryRecvError::Empty)
    }
  }

  #[inline]
  fn peek(&self) -> usize {
    self.raw().num_items()
  }

  #[inline]
  fn capacity(&self) -> usize {
    self.raw().capacity()
  }

  fn close(&self) -> bool {
    !self.raw().closed.swap(true, Ordering::Relaxed)
  }

  fn open(&self) -> bool {
    self.raw().closed.swap(false, Ordering::Relaxed)
  }

  #[inline]
  fn is_closed(&self) -> bool {
    self.raw().closed.load(Ordering::Relaxed)
  }

  fn clone_handle(&self) -> Self {
    self.raw().handles.fetch_add(1, Ordering::Relaxed);
    ChanRef {
      chan: self.chan,
      _marker: PhantomData,
    }
  }

  fn fmt_handle(&self, name: &'static str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct(name)
      .field("flavor", &self.raw().flavor())
      .field("capacity", &self.capacity())
      .field("len", &self.peek())
      .field("closed", &self.is_closed())
      .finish()
  }
}

impl<T> Drop for ChanRef<T> {
  fn drop(&mut self) {
    if self.raw().handles.fetch_sub(1, Ordering::Release) != 1 {
      return;
    }
    // Last handle: synchronize with the other side's final operations before
    // touching the buffer exclusively.
    fence(Ordering::Acquire);
    if mem::needs_drop::<T>() {
      while let Ok(item) = self.try_recv() {
        drop(item);
      }
    }
    self.raw().reset();
    cache::release(self.chan);
  }
}

/// The unique producer of an SPSC channel.
///
/// Movable to another thread, but neither cloneable nor shareable; the
/// protocol relies on there being exactly one.
pub struct Sender<T> {
  inner: ChanRef<T>,
}

/// The unique consumer of an SPSC or MPSC channel.
///
/// Movable to another thread, but neither cloneable nor shareable; the
/// lock-free receive path relies on there being exactly one.
pub struct Receiver<T> {
  inner: ChanRef<T>,
}

/// A producer handle that may be cloned and shared across threads.
pub struct MultiSender<T> {
  inner: ChanRef<T>,
}

/// A consumer handle that may be cloned and shared across threads.
pub struct MultiReceiver<T> {
  inner: ChanRef<T>,
}

// The raw pointer in ChanRef suppresses the auto traits; the protocols make
// the handles safe to move (and, for the multi forms, share) whenever the
// payload itself may change threads.
unsafe impl<T: Send> Send for Sender<T> {}
unsafe impl<T: Send> Send for Receiver<T> {}
unsafe impl<T: Send> Send for MultiSender<T> {}
unsafe impl<T: Send> Sync for MultiSender<T> {}
unsafe impl<T: Send> Send for MultiReceiver<T> {}
unsafe impl<T: Send> Sync for MultiReceiver<T> {}

pub(crate) fn spsc_pair<T: Send>(capacity: usize, flavor: Flavor) -> (Sender<T>, Receiver<T>) {
  let (a, b) = ChanRef::create(capacity, flavor);
  (Sender { inner: a }, Receiver { inner: b })
}

pub(crate) fn mpsc_pair<T: Send>(capacity: usize, flavor: Flavor) -> (MultiSender<T>, Receiver<T>) {
  let (a, b) = ChanRef::create(capacity, flavor);
  (MultiSender { inner: a }, Receiver { inner: b })
}

pub(crate) fn mpmc_pair<T: Send>(
  capacity: usize,
  flavor: Flavor,
) -> (MultiSender<T>, MultiReceiver<T>) {
  let (a, b) = ChanRef::create(capacity, flavor);
  (MultiSender { inner: a }, MultiReceiver { inner: b })
}

impl<T> Sender<T> {
  /// Blocks until the value is enqueued. Always consumes the value.
  pub fn send(&mut self, item: T) {
    self.inner.send(item);
  }

  /// Enqueues without blocking; on failure the value is handed back.
  pub fn try_send(&mut self, item: T) -> Result<(), TrySendError<T>> {
    self.inner.try_send(item)
  }

  /// Like [`send`](Self::send), for a value already proven isolated.
  pub fn send_isolated(&mut self, item: Isolated<T>)
  where
    T: Send,
  {
    self.inner.send(item.into_inner());
  }

  /// Approximate number of buffered items. Racy; a hint only.
  pub fn peek(&self) -> usize {
    self.inner.peek()
  }

  /// The number of items the channel can buffer.
  pub fn capacity(&self) -> usize {
    self.inner.capacity()
  }

  /// Sets the advisory closed flag. Returns `false` if already closed.
  /// Carries no ordering with respect to in-flight sends or receives, and
  /// wakes no blocked peer.
  pub fn close(&self) -> bool {
    self.inner.close()
  }

  /// Clears the advisory closed flag. Returns `false` if already open.
  pub fn open(&self) -> bool {
    self.inner.open()
  }

  /// Reads the advisory closed flag.
  pub fn is_closed(&self) -> bool {
    self.inner.is_closed()
  }
}

impl<T> Receiver<T> {
  /// Blocks until an item is dequeued.
  pub fn recv(&mut self) -> T {
    self.inner.recv()
  }

  /// Dequeues without blocking.
  pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
    self.inner.try_recv()
  }

  /// Like [`recv`](Self::recv), returning the item as a transfer-safe
  /// wrapper.
  pub fn recv_owned(&mut self) -> Isolated<T>
  where
    T: Send,
  {
    Isolated::new(self.inner.recv())
  }

  /// Approximate number of buffered items. Racy; a hint only.
  pub fn peek(&self) -> usize {
    self.inner.peek()
  }

  /// The number of items the channel can buffer.
  pub fn capacity(&self) -> usize {
    self.inner.capacity()
  }

  /// Sets the advisory closed flag. Returns `false` if already closed.
  pub fn close(&self) -> bool {
    self.inner.close()
  }

  /// Clears the advisory closed flag. Returns `false` if already open.
  pub fn open(&self) -> bool {
    self.inner.open()
  }

  /// Reads the advisory closed flag.
  pub fn is_closed(&self) -> bool {
    self.inner.is_closed()
  }
}

impl<T> MultiSender<T> {
  /// Blocks until the value is enqueued. Always consumes the value.
  pub fn send(&self, item: T) {
    self.inner.send(item);
  }

  /// Enqueues without blocking; on failure the value is handed back.
  pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
    self.inner.try_send(item)
  }

  /// Like [`send`](Self::send), for a value already proven isolated.
  pub fn send_isolated(&self, item: Isolated<T>)
  where
    T: Send,
  {
    self.inner.send(item.into_inner());
  }

  /// Approximate number of buffered items. Racy; a hint only.
  pub fn peek(&self) -> usize {
    self.inner.peek()
  }

  /// The number of items the channel can buffer.
  pub fn capacity(&self) -> usize {
    self.inner.capacity()
  }

  /// Sets the advisory closed flag. Returns `false` if already closed.
  /// Carries no ordering with respect to in-flight sends or receives, and
  /// wakes no blocked peer.
  pub fn close(&self) -> bool {
    self.inner.close()
  }

  /// Clears the advisory closed flag. Returns `false` if already open.
  pub fn open(&self) -> bool {
    self.inner.open()
  }

  /// Reads the advisory closed flag.
  pub fn is_closed(&self) -> bool {
    self.inner.is_closed()
  }
}

impl<T> MultiReceiver<T> {
  /// Blocks until an item is dequeued.
  pub fn recv(&self) -> T {
    self.inner.recv()
  }

  /// Dequeues without blocking.
  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    self.inner.try_recv()
  }

  /// Like [`recv`](Self::recv), returning the item as a transfer-safe
  /// wrapper.
  pub fn recv_owned(&self) -> Isolated<T>
  where
    T: Send,
  {
    Isolated::new(self.inner.recv())
  }

  /// Approximate number of buffered items. Racy; a hint only.
  pub fn peek(&self) -> usize {
    self.inner.peek()
  }

  /// The number of items the channel can buffer.
  pub fn capacity(&self) -> usize {
    self.inner.capacity()
  }

  /// Sets the advisory closed flag. Returns `false` if already closed.
  pub fn close(&self) -> bool {
    self.inner.close()
  }

  /// Clears the advisory closed flag. Returns `false` if already open.
  pub fn open(&self) -> bool {
    self.inner.open()
  }

  /// Reads the advisory closed flag.
  pub fn is_closed(&self) -> bool {
    self.inner.is_closed()
  }
}

impl<T> Clone for MultiSender<T> {
  fn clone(&self) -> Self {
    MultiSender {
      inner: self.inner.clone_handle(),
    }
  }
}

impl<T> Clone for MultiReceiver<T> {
  fn clone(&self) -> Self {
    MultiReceiver {
      inner: self.inner.clone_handle(),
    }
  }
}

impl<T> fmt::Debug for Sender<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.inner.fmt_handle("Sender", f)
  }
}

impl<T> fmt::Debug for Receiver<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.inner.fmt_handle("Receiver", f)
  }
}

impl<T> fmt::Debug for MultiSender<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.inner.fmt_handle("MultiSender", f)
  }
}

impl<T> fmt::Debug for MultiReceiver<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.inner.fmt_handle("MultiReceiver", f)
  }
}
