use crate::{
  observable::Observable,
  observer::Observer,
  sink::{Sink, SinkSubscription},
};

/// Accumulating stage. Each value folds into the accumulator and a clone of
/// the new accumulator is emitted.
#[derive(Clone)]
pub struct ScanOp<S, F, B> {
  pub(crate) source: S,
  pub(crate) func: F,
  pub(crate) seed: B,
}

impl<S, F, B> Observable for ScanOp<S, F, B>
where
  S: Observable,
  F: FnMut(B, S::Item) -> B + Send + 'static,
  B: Clone + Send + 'static,
{
  type Item = B;
  type Err = S::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<B, S::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let upstream = self.source.actual_subscribe(ScanObserver {
      sink,
      func: self.func,
      acc: Some(self.seed),
    });
    subscription.assign_upstream(upstream);
    subscription
  }
}

pub struct ScanObserver<O, F, B, Err> {
  sink: Sink<O, B, Err>,
  func: F,
  acc: Option<B>,
}

impl<O, F, Item, B, Err> Observer<Item, Err> for ScanObserver<O, F, B, Err>
where
  O: Observer<B, Err>,
  F: FnMut(B, Item) -> B,
  B: Clone,
{
  fn next(&mut self, value: Item) {
    if !self.sink.is_active() {
      return;
    }
    if let Some(acc) = self.acc.take() {
      let acc = (self.func)(acc, value);
      self.acc = Some(acc.clone());
      self.sink.forward_next(acc);
    }
  }

  fn error(&mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(&mut self) { self.sink.forward_complete() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

#[derive(Clone)]
pub struct TryScanOp<S, F, B> {
  pub(crate) source: S,
  pub(crate) func: F,
  pub(crate) seed: B,
}

impl<S, F, B> Observable for TryScanOp<S, F, B>
where
  S: Observable,
  F: FnMut(B, S::Item) -> Result<B, S::Err> + Send + 'static,
  B: Clone + Send + 'static,
{
  type Item = B;
  type Err = S::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<B, S::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let upstream = self.source.actual_subscribe(TryScanObserver {
      sink,
      func: self.func,
      acc: Some(self.seed),
    });
    subscription.assign_upstream(upstream);
    subscription
  }
}

pub struct TryScanObserver<O, F, B, Err> {
  sink: Sink<O, B, Err>,
  func: F,
  acc: Option<B>,
}

impl<O, F, Item, B, Err> Observer<Item, Err> for TryScanObserver<O, F, B, Err>
where
  O: Observer<B, Err>,
  F: FnMut(B, Item) -> Result<B, Err>,
  B: Clone,
{
  fn next(&mut self, value: Item) {
    if !self.sink.is_active() {
      return;
    }
    let Some(acc) = self.acc.take() else { return };
    match (self.func)(acc, value) {
      Ok(acc) => {
        self.acc = Some(acc.clone());
        self.sink.forward_next(acc);
      }
      Err(err) => self.sink.forward_error(err),
    }
  }

  fn error(&mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(&mut self) { self.sink.forward_complete() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}
