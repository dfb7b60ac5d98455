use std::{iter, marker::PhantomData};

use crate::{observable::Observable, observer::Observer};

/// Creates an observable that emits every value of `iter` synchronously on
/// subscribe, then completes.
///
/// Emission stops early once the subscriber is closed.
pub fn from_iter<I, Err>(iter: I) -> FromIter<I, Err>
where
  I: IntoIterator,
{
  FromIter { iter, _err: PhantomData }
}

/// Creates an observable producing a single value.
pub fn of<Item, Err>(value: Item) -> FromIter<iter::Once<Item>, Err> { from_iter(iter::once(value)) }

#[derive(Clone)]
pub struct FromIter<I, Err> {
  iter: I,
  _err: PhantomData<fn() -> Err>,
}

impl<I, Err> Observable for FromIter<I, Err>
where
  I: IntoIterator,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = I::Item;
  type Err = Err;
  type Unsub = ();

  fn actual_subscribe<O>(self, mut observer: O) -> Self::Unsub
  where
    O: Observer<I::Item, Err> + Send + 'static,
  {
    let mut iter = self.iter.into_iter();
    while !observer.is_closed() {
      match iter.next() {
        Some(value) => observer.next(value),
        None => return observer.complete(),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn emits_in_order_then_completes() {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    from_iter::<_, ()>(0..3).subscribe_all(
      move |v| l1.lock().unwrap().push(v),
      |_| {},
      move || l2.lock().unwrap().push(99),
    );
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 99]);
  }

  #[rxcore_macro::test]
  fn stops_when_downstream_takes_enough() {
    let pulled = Arc::new(Mutex::new(0));
    let c_pulled = pulled.clone();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    from_iter((0..).inspect(move |_| *c_pulled.lock().unwrap() += 1))
      .take(3)
      .subscribe(move |v| c_seen.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(*pulled.lock().unwrap(), 3);
  }
}
