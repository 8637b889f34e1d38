#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! Fixed-capacity blocking channels for communication between threads.
//!
//! `strand` provides FIFO channels in three producer/consumer cardinality
//! flavors (MPMC, MPSC and SPSC), all backed by a single untyped
//! ring-buffer engine. A capacity of zero selects a rendezvous channel that
//! hands items through one slot. Channel objects are recycled through a
//! per-thread cache, so repeatedly building and dropping channels of the
//! same shape is cheap.
//!
//! Blocking operations wait indefinitely: `send` parks (or, on the
//! single-cardinality paths, spins) until space frees up, and `recv` until
//! an item arrives. The `try_` forms never block. There is no timeout, no
//! select, and no disconnect-on-drop: the advisory [`close`](MultiSender::close)
//! flag is the only shutdown signal, and observing it is the caller's
//! protocol.
//!
//! # Example
//!
//! ```
//! use std::thread;
//!
//! let (mut tx, mut rx) = strand::spsc::channel::<u32>(4);
//! let producer = thread::spawn(move || {
//!   for i in 1..=10 {
//!     tx.send(i);
//!   }
//! });
//! let got: Vec<u32> = (0..10).map(|_| rx.recv()).collect();
//! producer.join().unwrap();
//! assert_eq!(got, (1..=10).collect::<Vec<_>>());
//! ```

pub mod error;
pub mod mpmc;
pub mod mpsc;
pub mod spsc;
pub mod telemetry;

mod cache;
mod chan;
mod flavor;
mod internal;
mod raw;
mod sync_util;

pub use cache::flush_thread_cache;
pub use chan::{Isolated, MultiReceiver, MultiSender, Receiver, Sender};
pub use error::{TryRecvError, TrySendError};
pub use flavor::Flavor;

/// Capacity used when a caller has no particular buffering requirement.
pub const DEFAULT_CAPACITY: usize = 30;
