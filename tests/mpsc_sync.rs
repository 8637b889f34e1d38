use std::thread;

#[test]
fn per_producer_order_is_preserved() {
  const PRODUCERS: usize = 4;
  const ITEMS: u64 = 2_000;

  let (tx, mut rx) = strand::mpsc::channel::<(usize, u64)>(8);

  let handles: Vec<_> = (0..PRODUCERS)
    .map(|p| {
      let tx = tx.clone();
      thread::spawn(move || {
        for i in 0..ITEMS {
          tx.send((p, i));
        }
      })
    })
    .collect();
  drop(tx);

  // The received stream, projected onto each producer, must be exactly that
  // producer's send order.
  let mut next = vec![0u64; PRODUCERS];
  for _ in 0..PRODUCERS as u64 * ITEMS {
    let (p, i) = rx.recv();
    assert_eq!(i, next[p], "producer {} reordered", p);
    next[p] += 1;
  }

  for handle in handles {
    handle.join().unwrap();
  }
  assert!(rx.try_recv().is_err());
}

#[test]
fn single_producer_fifo() {
  let (tx, mut rx) = strand::mpsc::channel::<u32>(16);
  let producer = thread::spawn(move || {
    for i in 0..500 {
      tx.send(i);
    }
  });
  for i in 0..500 {
    assert_eq!(rx.recv(), i);
  }
  producer.join().unwrap();
}

#[test]
fn rendezvous_many_producers() {
  const PRODUCERS: usize = 3;
  const ITEMS: u64 = 200;

  let (tx, mut rx) = strand::mpsc::channel::<u64>(0);
  let handles: Vec<_> = (0..PRODUCERS)
    .map(|p| {
      let tx = tx.clone();
      thread::spawn(move || {
        for i in 0..ITEMS {
          tx.send(p as u64 * ITEMS + i);
        }
      })
    })
    .collect();
  drop(tx);

  let mut got: Vec<u64> = (0..PRODUCERS as u64 * ITEMS).map(|_| rx.recv()).collect();
  got.sort_unstable();
  let expected: Vec<u64> = (0..PRODUCERS as u64 * ITEMS).collect();
  assert_eq!(got, expected);

  for handle in handles {
    handle.join().unwrap();
  }
}
