use crate::{
  observable::Observable,
  observer::Observer,
  sink::{Sink, SinkSubscription},
};

#[derive(Clone)]
pub struct FilterOp<S, F> {
  pub(crate) source: S,
  pub(crate) predicate: F,
}

impl<S, F> Observable for FilterOp<S, F>
where
  S: Observable,
  F: FnMut(&S::Item) -> bool + Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let upstream =
      self.source.actual_subscribe(FilterObserver { sink, predicate: self.predicate });
    subscription.assign_upstream(upstream);
    subscription
  }
}

pub struct FilterObserver<O, F, Item, Err> {
  sink: Sink<O, Item, Err>,
  predicate: F,
}

impl<O, F, Item, Err> Observer<Item, Err> for FilterObserver<O, F, Item, Err>
where
  O: Observer<Item, Err>,
  F: FnMut(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if self.sink.is_active() && (self.predicate)(&value) {
      self.sink.forward_next(value);
    }
  }

  fn error(&mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(&mut self) { self.sink.forward_complete() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

#[derive(Clone)]
pub struct TryFilterOp<S, F> {
  pub(crate) source: S,
  pub(crate) predicate: F,
}

impl<S, F> Observable for TryFilterOp<S, F>
where
  S: Observable,
  F: FnMut(&S::Item) -> Result<bool, S::Err> + Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let upstream =
      self.source.actual_subscribe(TryFilterObserver { sink, predicate: self.predicate });
    subscription.assign_upstream(upstream);
    subscription
  }
}

pub struct TryFilterObserver<O, F, Item, Err> {
  sink: Sink<O, Item, Err>,
  predicate: F,
}

impl<O, F, Item, Err> Observer<Item, Err> for TryFilterObserver<O, F, Item, Err>
where
  O: Observer<Item, Err>,
  F: FnMut(&Item) -> Result<bool, Err>,
{
  fn next(&mut self, value: Item) {
    if !self.sink.is_active() {
      return;
    }
    match (self.predicate)(&value) {
      Ok(true) => self.sink.forward_next(value),
      Ok(false) => {}
      Err(err) => self.sink.forward_error(err),
    }
  }

  fn error(&mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(&mut self) { self.sink.forward_complete() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}
