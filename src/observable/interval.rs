use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::Observer,
  scheduler::{Duration, SchedulerRef},
  sink::{Sink, SinkSubscription},
};

/// Emits `0, 1, 2, ...` every `period` on `scheduler`, forever.
///
/// Uses the scheduler's native periodic capability when present and the
/// drift-corrected emulation otherwise.
pub fn interval<Err>(period: Duration, scheduler: impl Into<SchedulerRef>) -> Interval<Err> {
  Interval { period, scheduler: scheduler.into(), _err: PhantomData }
}

/// Emits `value` once after `delay`, then completes.
pub fn timer<Item, Err>(
  value: Item, delay: Duration, scheduler: impl Into<SchedulerRef>,
) -> Timer<Item, Err> {
  Timer { value, delay, scheduler: scheduler.into(), _err: PhantomData }
}

#[derive(Clone)]
pub struct Interval<Err> {
  period: Duration,
  scheduler: SchedulerRef,
  _err: PhantomData<fn() -> Err>,
}

impl<Err: Send + 'static> Observable for Interval<Err> {
  type Item = usize;
  type Err = Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<usize, Err> + Send + 'static,
  {
    let (mut sink, subscription) = Sink::new(observer);
    let mut count = 0;
    let periodic = self.scheduler.schedule_periodic(self.period, move || {
      sink.forward_next(count);
      count += 1;
    });
    subscription.assign_upstream(periodic);
    subscription
  }
}

#[derive(Clone)]
pub struct Timer<Item, Err> {
  value: Item,
  delay: Duration,
  scheduler: SchedulerRef,
  _err: PhantomData<fn() -> Err>,
}

impl<Item, Err> Observable for Timer<Item, Err>
where
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
    let (mut sink, subscription) = Sink::new(observer);
    let handle = self
      .scheduler
      .schedule_after(self.value, self.delay, move |value| {
        sink.forward_next(value);
        sink.forward_complete();
      });
    subscription.assign_upstream(handle);
    subscription
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
  fn interval_ticks_on_virtual_time() {
    let scheduler = VirtualTimeScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let sub = interval::<Infallible>(Duration::from_millis(10), scheduler.clone())
      .subscribe(move |v| c_seen.lock().unwrap().push(v));

    scheduler.advance_by(Duration::from_millis(35));
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    sub.unsubscribe();
    scheduler.advance_by(Duration::from_millis(100));
    assert_eq!(seen.lock().unwrap().len(), 3);
  }

  #[rxcore_macro::test]
  fn timer_emits_once_then_completes() {
    let scheduler = VirtualTimeScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    timer::<_, ()>("tick", Duration::from_millis(50), scheduler.clone()).subscribe_all(
      move |v| l1.lock().unwrap().push(v),
      |_| {},
      move || l2.lock().unwrap().push("done"),
    );
    scheduler.advance_by(Duration::from_millis(49));
    assert!(log.lock().unwrap().is_empty());
    scheduler.advance_by(Duration::from_millis(1));
    assert_eq!(*log.lock().unwrap(), vec!["tick", "done"]);
  }

  #[cfg(feature = "futures-scheduler")]
  #[rxcore_macro::test]
  fn timer_on_pool() {
    let (tx, rx) = std::sync::mpsc::channel();
    let _sub = timer::<_, Infallible>(5, Duration::from_millis(10), PoolScheduler::shared())
      .subscribe(move |v| tx.send(v).unwrap());
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 5);
  }
}
