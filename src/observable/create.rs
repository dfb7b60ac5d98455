use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::{BoxedObserver, Observer},
  sink::{Sink, SinkSubscription},
  subscription::Subscription,
};

/// Observable created from a function.
///
/// The function receives an [`Emitter`] and returns the teardown for whatever
/// it started. The emitter may be moved to another thread; once the
/// subscriber disposes, or after a terminal call, it drops everything.
pub fn create<F, Item, Err, U>(subscribe: F) -> Create<F, Item, Err>
where
  F: FnOnce(Emitter<Item, Err>) -> U,
  U: Subscription + Send + Sync + 'static,
{
  Create { subscribe, _marker: PhantomData }
}

#[derive(Clone)]
pub struct Create<F, Item, Err> {
  subscribe: F,
  _marker: PhantomData<fn() -> (Item, Err)>,
}

/// Handle through which a [`create`] function emits.
pub struct Emitter<Item, Err>(Sink<BoxedObserver<Item, Err>, Item, Err>);

impl<Item, Err> Emitter<Item, Err> {
  #[inline]
  pub fn next(&mut self, value: Item) { self.0.forward_next(value) }

  #[inline]
  pub fn error(&mut self, err: Err) { self.0.forward_error(err) }

  #[inline]
  pub fn complete(&mut self) { self.0.forward_complete() }

  /// True once the subscriber disposed or a terminal call was made. Emitting
  /// loops should check this between values.
  #[inline]
  pub fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<F, Item, Err, U> Observable for Create<F, Item, Err>
where
  F: FnOnce(Emitter<Item, Err>) -> U,
  U: Subscription + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(Box::new(observer) as BoxedObserver<Item, Err>);
    let teardown = (self.subscribe)(Emitter(sink));
    subscription.assign_upstream(teardown);
    subscription
  }
}
