use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use crate::{
  error::RxError,
  observable::Observable,
  observer::Observer,
  scheduler::{Duration, SchedulerRef},
  sink::{Serializer, Sink, SinkSubscription},
  subscription::SerialSubscription,
};

#[derive(Clone)]
pub struct TimeoutOp<S> {
  pub(crate) source: S,
  pub(crate) due: Duration,
  pub(crate) scheduler: SchedulerRef,
}

impl<S> Observable for TimeoutOp<S>
where
  S: Observable,
  S::Err: From<RxError>,
{
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let timer = SerialSubscription::new();
    subscription.track(timer.clone());
    let observer = TimeoutObserver {
      serializer: Serializer::new(sink),
      due: self.due,
      scheduler: self.scheduler,
      timer,
      generation: Arc::new(AtomicUsize::new(0)),
    };
    observer.arm(0);
    let upstream = self.source.actual_subscribe(observer);
    subscription.assign_upstream(upstream);
    subscription
  }
}

pub struct TimeoutObserver<O, Item, Err> {
  serializer: Arc<Serializer<O, Item, Err>>,
  due: Duration,
  scheduler: SchedulerRef,
  timer: SerialSubscription,
  // Bumped on every notification; a timer only fires for its own generation.
  generation: Arc<AtomicUsize>,
}

impl<O, Item, Err> TimeoutObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: From<RxError> + Send + 'static,
{
  fn arm(&self, id: usize) {
    let serializer = self.serializer.clone();
    let generation = self.generation.clone();
    let handle = self.scheduler.schedule_after((), self.due, move |_| {
      if generation.load(Ordering::Acquire) == id {
        tracing::debug!("no notification within the timeout window");
        serializer.error(RxError::Timeout.into());
      }
    });
    self.timer.set(handle);
  }
}

impl<O, Item, Err> Observer<Item, Err> for TimeoutObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: From<RxError> + Send + 'static,
{
  fn next(&mut self, value: Item) {
    let id = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
    self.serializer.next(value);
    if !self.serializer.is_closed() {
      self.arm(id);
    }
  }

  fn error(&mut self, err: Err) {
    self.generation.fetch_add(1, Ordering::AcqRel);
    self.serializer.error(err)
  }

  fn complete(&mut self) {
    self.generation.fetch_add(1, Ordering::AcqRel);
    self.serializer.complete()
  }

  fn is_closed(&self) -> bool { self.serializer.is_closed() }
}
