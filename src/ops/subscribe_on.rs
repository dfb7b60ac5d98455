use crate::{
  observable::Observable,
  observer::Observer,
  scheduler::{SchedulerRef, TaskHandle},
  subscription::SingleAssignmentSubscription,
};

#[derive(Clone)]
pub struct SubscribeOnOp<S> {
  pub(crate) source: S,
  pub(crate) scheduler: SchedulerRef,
}

impl<S> Observable for SubscribeOnOp<S>
where
  S: Observable + Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;
  /// Cancels the pending subscribe or, once it ran, the source subscription.
  type Unsub = (TaskHandle, SingleAssignmentSubscription);

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let upstream = SingleAssignmentSubscription::new();
    let c_upstream = upstream.clone();
    let source = self.source;
    let handle = self.scheduler.schedule(observer, move |observer| {
      // Assignment after disposal disposes the fresh subscription.
      let _ = c_upstream.assign(source.actual_subscribe(observer));
    });
    (handle, upstream)
  }
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
  };

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn subscribes_when_the_scheduler_runs() {
    let scheduler = VirtualTimeScheduler::new();
    let subject = Subject::<i32, Infallible>::default();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let _sub = subject
      .clone()
      .subscribe_on(scheduler.clone())
      .subscribe(move |v| c_seen.lock().unwrap().push(v));
    assert_eq!(subject.subscriber_count(), 0);
    scheduler.flush();
    assert_eq!(subject.subscriber_count(), 1);
    subject.clone().next(5);
    assert_eq!(*seen.lock().unwrap(), vec![5]);
  }

  #[rxcore_macro::test]
  fn dispose_before_and_after_subscribing() {
    let scheduler = VirtualTimeScheduler::new();
    let subject = Subject::<i32, Infallible>::default();
    let early = subject.clone().subscribe_on(scheduler.clone()).subscribe(|_| {});
    early.unsubscribe();
    scheduler.flush();
    assert_eq!(subject.subscriber_count(), 0);

    let late = subject.clone().subscribe_on(scheduler.clone()).subscribe(|_| {});
    scheduler.flush();
    assert_eq!(subject.subscriber_count(), 1);
    late.unsubscribe();
    assert_eq!(subject.subscriber_count(), 0);
  }
}
