use crate::{
  observable::Observable,
  observer::Observer,
  sink::{Sink, SinkSubscription},
};

#[derive(Clone)]
pub struct MapOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: F,
}

impl<S, F, B> Observable for MapOp<S, F>
where
  S: Observable,
  F: FnMut(S::Item) -> B + Send + 'static,
  B: Send + 'static,
{
  type Item = B;
  type Err = S::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<B, S::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let upstream = self.source.actual_subscribe(MapObserver { sink, func: self.func });
    subscription.assign_upstream(upstream);
    subscription
  }
}

pub struct MapObserver<O, F, B, Err> {
  sink: Sink<O, B, Err>,
  func: F,
}

impl<O, F, Item, B, Err> Observer<Item, Err> for MapObserver<O, F, B, Err>
where
  O: Observer<B, Err>,
  F: FnMut(Item) -> B,
{
  fn next(&mut self, value: Item) {
    if self.sink.is_active() {
      let mapped = (self.func)(value);
      self.sink.forward_next(mapped);
    }
  }

  fn error(&mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(&mut self) { self.sink.forward_complete() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

#[derive(Clone)]
pub struct TryMapOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: F,
}

impl<S, F, B> Observable for TryMapOp<S, F>
where
  S: Observable,
  F: FnMut(S::Item) -> Result<B, S::Err> + Send + 'static,
  B: Send + 'static,
{
  type Item = B;
  type Err = S::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<B, S::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let upstream = self.source.actual_subscribe(TryMapObserver { sink, func: self.func });
    subscription.assign_upstream(upstream);
    subscription
  }
}

pub struct TryMapObserver<O, F, B, Err> {
  sink: Sink<O, B, Err>,
  func: F,
}

impl<O, F, Item, B, Err> Observer<Item, Err> for TryMapObserver<O, F, B, Err>
where
  O: Observer<B, Err>,
  F: FnMut(Item) -> Result<B, Err>,
{
  fn next(&mut self, value: Item) {
    if !self.sink.is_active() {
      return;
    }
    match (self.func)(value) {
      Ok(mapped) => self.sink.forward_next(mapped),
      Err(err) => self.sink.forward_error(err),
    }
  }

  fn error(&mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(&mut self) { self.sink.forward_complete() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
  };

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn primitive_type() {
    let i = Arc::new(Mutex::new(0));
    let c_i = i.clone();
    from_iter::<_, Infallible>(100..101)
      .map(|v| v * 2)
      .subscribe(move |v| *c_i.lock().unwrap() = v);
    assert_eq!(*i.lock().unwrap(), 200);
  }

  #[rxcore_macro::test]
  fn map_types_mixed() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    from_iter::<_, Infallible>(vec!['a', 'b', 'c'])
      .map(|c| c.to_string())
      .map(|s| s.len())
      .subscribe(move |v| c_seen.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec![1, 1, 1]);
  }

  #[rxcore_macro::test]
  fn selector_failure_terminates() {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    let calls = Arc::new(Mutex::new(0));
    let c_calls = calls.clone();
    from_iter(1..=5)
      .try_map(move |v| {
        *c_calls.lock().unwrap() += 1;
        if v == 3 { Err(format!("rejected {v}")) } else { Ok(v * 10) }
      })
      .subscribe_all(
        move |v| l1.lock().unwrap().push(format!("next {v}")),
        move |e| l2.lock().unwrap().push(format!("error {e}")),
        move || l3.lock().unwrap().push("complete".to_string()),
      );
    assert_eq!(*log.lock().unwrap(), vec!["next 10", "next 20", "error rejected 3"]);
    assert_eq!(*calls.lock().unwrap(), 3);
  }
}
