use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Drains `total` items spread over several consumers. Blocking `recv`
/// cannot be used once the channel may stay empty forever, so consumers
/// poll with `try_recv` against a shared count of items taken.
fn drain_concurrently(
  rx: &strand::MultiReceiver<u64>,
  taken: &Arc<AtomicUsize>,
  total: usize,
) -> Vec<u64> {
  let mut out = Vec::new();
  loop {
    if taken.load(Ordering::SeqCst) >= total {
      // Someone may still have published the count before our last poll.
      match rx.try_recv() {
        Ok(v) => {
          out.push(v);
          taken.fetch_add(1, Ordering::SeqCst);
        }
        Err(_) => return out,
      }
      continue;
    }
    match rx.try_recv() {
      Ok(v) => {
        out.push(v);
        taken.fetch_add(1, Ordering::SeqCst);
      }
      Err(_) => thread::yield_now(),
    }
  }
}

#[test]
fn per_producer_order_and_multiset() {
  let (tx, rx) = strand::mpmc::channel::<u64>(8);
  let taken = Arc::new(AtomicUsize::new(0));

  let tx2 = tx.clone();
  let p1 = thread::spawn(move || {
    for v in [10, 11, 12] {
      tx.send(v);
    }
  });
  let p2 = thread::spawn(move || {
    for v in [20, 21, 22] {
      tx2.send(v);
    }
  });

  let rx2 = rx.clone();
  let taken2 = Arc::clone(&taken);
  let c1 = thread::spawn(move || drain_concurrently(&rx, &taken, 6));
  let c2 = thread::spawn(move || drain_concurrently(&rx2, &taken2, 6));

  p1.join().unwrap();
  p2.join().unwrap();
  let out1 = c1.join().unwrap();
  let out2 = c2.join().unwrap();

  // Each consumer's stream, filtered to one producer, preserves that
  // producer's send order.
  for out in [&out1, &out2] {
    for decade in [10u64, 20] {
      let seen: Vec<u64> = out.iter().copied().filter(|v| v / 10 == decade / 10).collect();
      assert!(seen.windows(2).all(|w| w[0] < w[1]), "reordered: {:?}", seen);
    }
  }

  let mut all: Vec<u64> = out1.into_iter().chain(out2).collect();
  all.sort_unstable();
  assert_eq!(all, vec![10, 11, 12, 20, 21, 22]);
}

#[test]
fn multiset_is_conserved() {
  const PRODUCERS: usize = 4;
  const CONSUMERS: usize = 4;
  const ITEMS: usize = 5_000;

  let (tx, rx) = strand::mpmc::channel::<u64>(32);
  let taken = Arc::new(AtomicUsize::new(0));

  let producers: Vec<_> = (0..PRODUCERS)
    .map(|p| {
      let tx = tx.clone();
      thread::spawn(move || {
        for i in 0..ITEMS {
          tx.send((p * ITEMS + i) as u64);
        }
      })
    })
    .collect();
  drop(tx);

  let consumers: Vec<_> = (0..CONSUMERS)
    .map(|_| {
      let rx = rx.clone();
      let taken = Arc::clone(&taken);
      thread::spawn(move || drain_concurrently(&rx, &taken, PRODUCERS * ITEMS))
    })
    .collect();
  drop(rx);

  for p in producers {
    p.join().unwrap();
  }
  let mut all: Vec<u64> = Vec::with_capacity(PRODUCERS * ITEMS);
  for c in consumers {
    all.extend(c.join().unwrap());
  }
  all.sort_unstable();
  let expected: Vec<u64> = (0..(PRODUCERS * ITEMS) as u64).collect();
  assert_eq!(all, expected);
}

#[test]
fn simultaneous_enqueue_dequeue() {
  // One producer and one consumer running flat out over a tiny buffer; the
  // two-lock layout must let them make progress concurrently.
  let (tx, rx) = strand::mpmc::channel::<u64>(2);
  let producer = thread::spawn(move || {
    for i in 0..50_000u64 {
      tx.send(i);
    }
  });
  let consumer = thread::spawn(move || {
    for i in 0..50_000u64 {
      assert_eq!(rx.recv(), i);
    }
  });
  producer.join().unwrap();
  consumer.join().unwrap();
}
