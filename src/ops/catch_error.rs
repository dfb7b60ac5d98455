use crate::{
  observable::Observable,
  observer::Observer,
  sink::{Sink, SinkSubscription},
};

#[derive(Clone)]
pub struct CatchErrorOp<S, F> {
  pub(crate) source: S,
  pub(crate) handler: F,
}

impl<S, F, S2> Observable for CatchErrorOp<S, F>
where
  S: Observable,
  F: FnOnce(S::Err) -> S2 + Send + 'static,
  S2: Observable<Item = S::Item>,
{
  type Item = S::Item;
  type Err = S2::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<S::Item, S2::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let upstream = self
      .source
      .actual_subscribe(CatchErrorObserver { sink: Some(sink), handler: Some(self.handler) });
    subscription.assign_upstream(upstream);
    subscription
  }
}

pub struct CatchErrorObserver<O, F, Item, Err2> {
  sink: Option<Sink<O, Item, Err2>>,
  handler: Option<F>,
}

impl<O, F, Item, Err, Err2, S2> Observer<Item, Err> for CatchErrorObserver<O, F, Item, Err2>
where
  O: Observer<Item, Err2> + Send + 'static,
  Item: Send + 'static,
  Err2: Send + 'static,
  F: FnOnce(Err) -> S2,
  S2: Observable<Item = Item, Err = Err2>,
{
  fn next(&mut self, value: Item) {
    if let Some(sink) = self.sink.as_mut() {
      sink.forward_next(value);
    }
  }

  fn error(&mut self, err: Err) {
    let (Some(sink), Some(handler)) = (self.sink.take(), self.handler.take()) else { return };
    if !sink.is_active() {
      return;
    }
    tracing::debug!("source failed, switching to the fallback stream");
    let subscription = sink.subscription();
    let fallback = handler(err).actual_subscribe(ResumeObserver(sink));
    subscription.track(fallback);
  }

  fn complete(&mut self) {
    if let Some(sink) = self.sink.as_mut() {
      sink.forward_complete();
    }
  }

  fn is_closed(&self) -> bool { self.sink.as_ref().is_none_or(Sink::is_closed) }
}

/// Forwards the fallback stream straight into the original sink.
struct ResumeObserver<O, Item, Err>(Sink<O, Item, Err>);

impl<O, Item, Err> Observer<Item, Err> for ResumeObserver<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.0.forward_next(value) }

  fn error(&mut self, err: Err) { self.0.forward_error(err) }

  fn complete(&mut self) { self.0.forward_complete() }

  fn is_closed(&self) -> bool { self.0.is_closed() }
}
