use crate::{
  observable::Observable,
  observer::Observer,
  sink::{Sink, SinkSubscription},
};

#[derive(Clone)]
pub struct TakeOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<S: Observable> Observable for TakeOp<S> {
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let (mut sink, subscription) = Sink::new(observer);
    if self.count == 0 {
      sink.forward_complete();
      return subscription;
    }
    let upstream = self.source.actual_subscribe(TakeObserver { sink, remaining: self.count });
    subscription.assign_upstream(upstream);
    subscription
  }
}

pub struct TakeObserver<O, Item, Err> {
  sink: Sink<O, Item, Err>,
  remaining: usize,
}

impl<O, Item, Err> Observer<Item, Err> for TakeObserver<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.remaining == 0 {
      return;
    }
    self.remaining -= 1;
    self.sink.forward_next(value);
    if self.remaining == 0 {
      self.sink.forward_complete();
    }
  }

  fn error(&mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(&mut self) { self.sink.forward_complete() }

  fn is_closed(&self) -> bool { self.remaining == 0 || self.sink.is_closed() }
}
