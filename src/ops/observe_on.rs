use std::{
  collections::VecDeque,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
};

use crate::{
  observable::Observable,
  observer::{Notification, Observer},
  rc::MutArc,
  scheduler::SchedulerRef,
  sink::{Sink, SinkSubscription},
  subscription::{SerialSubscription, Subscription},
};

#[derive(Clone)]
pub struct ObserveOnOp<S> {
  pub(crate) source: S,
  pub(crate) scheduler: SchedulerRef,
}

impl<S: Observable> Observable for ObserveOnOp<S> {
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let drain = SerialSubscription::new();
    subscription.track(drain.clone());
    let shared = Arc::new(ObserveOnShared {
      queue: MutArc::own(VecDeque::new()),
      wip: AtomicUsize::new(0),
      sink: MutArc::own(sink),
      scheduler: self.scheduler,
      drain,
      subscription: subscription.clone(),
    });
    let upstream = self.source.actual_subscribe(ObserveOnObserver(shared));
    subscription.assign_upstream(upstream);
    subscription
  }
}

struct ObserveOnShared<O, Item, Err> {
  queue: MutArc<VecDeque<Notification<Item, Err>>>,
  wip: AtomicUsize,
  sink: MutArc<Sink<O, Item, Err>>,
  scheduler: SchedulerRef,
  drain: SerialSubscription,
  subscription: SinkSubscription,
}

impl<O, Item, Err> ObserveOnShared<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Queue a notification. The push that finds the queue idle schedules one
  /// drain on the target scheduler; later pushes ride along with it.
  fn push(self: &Arc<Self>, notification: Notification<Item, Err>) {
    if self.subscription.is_closed() {
      return;
    }
    self.queue.rc_deref_mut().push_back(notification);
    if self.wip.fetch_add(1, Ordering::AcqRel) == 0 {
      let handle = self.scheduler.schedule(self.clone(), |this| this.drain());
      self.drain.set(handle);
    }
  }

  fn drain(&self) {
    loop {
      let next = self.queue.rc_deref_mut().pop_front();
      if let Some(notification) = next {
        self.sink.rc_deref_mut().forward(notification);
      }
      if self.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
        break;
      }
    }
  }
}

pub struct ObserveOnObserver<O, Item, Err>(Arc<ObserveOnShared<O, Item, Err>>);

impl<O, Item, Err> Observer<Item, Err> for ObserveOnObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.0.push(Notification::Next(value)) }

  fn error(&mut self, err: Err) { self.0.push(Notification::Error(err)) }

  fn complete(&mut self) { self.0.push(Notification::Complete) }

  fn is_closed(&self) -> bool { self.0.subscription.is_closed() }
}
