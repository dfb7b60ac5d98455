use std::{collections::VecDeque, sync::Arc};

use crate::{
  observable::Observable,
  observer::{Notification, Observer},
  rc::MutArc,
  scheduler::{Duration, SchedulerRef, Task, TaskState},
  sink::{Serializer, Sink, SinkSubscription},
};

#[derive(Clone)]
pub struct DelayOp<S> {
  pub(crate) source: S,
  pub(crate) delay: Duration,
  pub(crate) scheduler: SchedulerRef,
}

impl<S: Observable> Observable for DelayOp<S> {
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let shared = Arc::new(DelayShared {
      pending: MutArc::own(Pending { queue: VecDeque::new(), armed: false }),
      serializer: Serializer::new(sink),
      delay: self.delay,
      scheduler: self.scheduler,
    });
    let upstream = self.source.actual_subscribe(DelayObserver(shared));
    subscription.assign_upstream(upstream);
    subscription
  }
}

struct Pending<Item, Err> {
  queue: VecDeque<(Duration, Notification<Item, Err>)>,
  /// A drain task is scheduled or running.
  armed: bool,
}

struct DelayShared<O, Item, Err> {
  pending: MutArc<Pending<Item, Err>>,
  serializer: Arc<Serializer<O, Item, Err>>,
  delay: Duration,
  scheduler: SchedulerRef,
}

impl<O, Item, Err> DelayShared<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Queue a notification due `delay` from now. Only the push that finds no
  /// drain armed schedules one; a single drain delivers in queue order.
  fn push(self: &Arc<Self>, notification: Notification<Item, Err>) {
    if self.serializer.is_closed() {
      return;
    }
    let arm = {
      let mut pending = self.pending.rc_deref_mut();
      pending.queue.push_back((self.scheduler.now() + self.delay, notification));
      !std::mem::replace(&mut pending.armed, true)
    };
    if arm {
      let task = Task::new(self.clone(), |this: &mut Arc<Self>| this.drain_step());
      let handle = self.scheduler.schedule_task(task, self.delay);
      self.serializer.track(handle);
    }
  }

  /// Deliver everything that is due, then sleep until the next head is due.
  fn drain_step(&self) -> TaskState {
    loop {
      if self.serializer.is_closed() {
        return TaskState::Finished;
      }
      let now = self.scheduler.now();
      let due = {
        let mut pending = self.pending.rc_deref_mut();
        match pending.queue.front().map(|(at, _)| *at) {
          None => {
            pending.armed = false;
            return TaskState::Finished;
          }
          Some(at) if at > now => return TaskState::Sleeping(at - now),
          Some(_) => pending.queue.pop_front().map(|(_, n)| n),
        }
      };
      match due {
        Some(Notification::Next(value)) => self.serializer.next(value),
        Some(Notification::Error(err)) => self.serializer.error(err),
        Some(Notification::Complete) => self.serializer.complete(),
        None => {}
      }
    }
  }
}

pub struct DelayObserver<O, Item, Err>(Arc<DelayShared<O, Item, Err>>);

impl<O, Item, Err> Observer<Item, Err> for DelayObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.0.push(Notification::Next(value)) }

  fn error(&mut self, err: Err) {
    self.0.pending.rc_deref_mut().queue.clear();
    self.0.serializer.error(err)
  }

  fn complete(&mut self) { self.0.push(Notification::Complete) }

  fn is_closed(&self) -> bool { self.0.serializer.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn shifts_values_and_completion() {
    let scheduler = VirtualTimeScheduler::new();
    let subject = Subject::<i32, &'static str>::default();
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    let c_scheduler = scheduler.clone();
    subject.clone().delay(Duration::from_millis(50), scheduler.clone()).subscribe_all(
      move |v| l1.lock().unwrap().push((v, c_scheduler.now())),
      |_| {},
      move || l2.lock().unwrap().push((-1, Duration::ZERO)),
    );

    let mut producer = subject.clone();
    producer.next(1);
    scheduler.advance_by(Duration::from_millis(10));
    producer.next(2);
    producer.complete();
    scheduler.advance_by(Duration::from_millis(45));
    assert_eq!(*log.lock().unwrap(), vec![(1, Duration::from_millis(50))]);

    scheduler.advance_by(Duration::from_millis(5));
    assert_eq!(
      *log.lock().unwrap(),
      vec![(1, Duration::from_millis(50)), (2, Duration::from_millis(60)), (-1, Duration::ZERO)]
    );
  }

  #[rxcore_macro::test]
  fn error_is_not_delayed_and_drops_pending_values() {
    let scheduler = VirtualTimeScheduler::new();
    let subject = Subject::<i32, &'static str>::default();
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    subject.clone().delay(Duration::from_millis(50), scheduler.clone()).subscribe_err(
      move |v| l1.lock().unwrap().push(format!("next {v}")),
      move |e| l2.lock().unwrap().push(format!("error {e}")),
    );
    let mut producer = subject.clone();
    producer.next(1);
    producer.error("boom");
    assert_eq!(*log.lock().unwrap(), vec!["error boom"]);
    assert!(scheduler.is_empty());
    scheduler.advance_by(Duration::from_millis(100));
    assert_eq!(log.lock().unwrap().len(), 1);
  }

  #[rxcore_macro::test]
  fn unsubscribe_cancels_pending_values() {
    let scheduler = VirtualTimeScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let sub = from_iter::<_, std::convert::Infallible>(0..3)
      .delay(Duration::from_millis(5), scheduler.clone())
      .subscribe(move |v| c_seen.lock().unwrap().push(v));
    assert_eq!(scheduler.pending_count(), 1);
    sub.unsubscribe();
    assert!(scheduler.is_empty());
    scheduler.advance_by(Duration::from_millis(10));
    assert!(seen.lock().unwrap().is_empty());
  }

  #[cfg(feature = "futures-scheduler")]
  #[rxcore_macro::test]
  fn keeps_upstream_order_on_a_pool() {
    for _ in 0..10 {
      let (tx, rx) = std::sync::mpsc::channel();
      let c_tx = tx.clone();
      from_iter::<_, std::convert::Infallible>(0..2000)
        .delay(Duration::from_millis(5), PoolScheduler::shared())
        .subscribe_all(
          move |v| {
            let _ = tx.send(Some(v));
          },
          |_| {},
          move || {
            let _ = c_tx.send(None);
          },
        );
      let delivered: Vec<_> = rx.iter().map_while(|v| v).collect();
      assert_eq!(delivered, (0..2000).collect::<Vec<_>>());
    }
  }
}
