use std::sync::Arc;

use crate::{
  observable::Observable,
  observer::{Notification, Observer},
  rc::MutArc,
  scheduler::{Duration, SchedulerRef},
  sink::{Serializer, Sink, SinkSubscription},
};

#[derive(Clone)]
pub struct SampleOp<S> {
  pub(crate) source: S,
  pub(crate) period: Duration,
  pub(crate) scheduler: SchedulerRef,
}

impl<S: Observable> Observable for SampleOp<S> {
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let serializer = Serializer::new(sink);
    let latest = MutArc::own(None);

    let c_serializer = serializer.clone();
    let c_latest = latest.clone();
    let ticks = self.scheduler.schedule_periodic(self.period, move || {
      c_serializer.push_with(|| c_latest.rc_deref_mut().take().map(Notification::Next));
    });
    subscription.track(ticks);

    let upstream = self.source.actual_subscribe(SampleObserver { serializer, latest });
    subscription.assign_upstream(upstream);
    subscription
  }
}

pub struct SampleObserver<O, Item, Err> {
  serializer: Arc<Serializer<O, Item, Err>>,
  latest: MutArc<Option<Item>>,
}

impl<O, Item, Err> Observer<Item, Err> for SampleObserver<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { *self.latest.rc_deref_mut() = Some(value); }

  fn error(&mut self, err: Err) { self.serializer.error(err) }

  /// A value that arrived since the last tick is flushed before completing.
  fn complete(&mut self) {
    let latest = &self.latest;
    self.serializer.push_with(|| latest.rc_deref_mut().take().map(Notification::Next));
    self.serializer.complete();
  }

  fn is_closed(&self) -> bool { self.serializer.is_closed() }
}
