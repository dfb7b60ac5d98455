use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::Observer,
  scheduler::{Duration, SchedulerRef, Task, TaskState},
  sink::{Sink, SinkSubscription},
};

/// Emits the values of `iter` from `scheduler`.
///
/// On a scheduler with the long-running capability the whole iteration runs
/// as one tight loop on a dedicated context, polling a cancellation flag
/// between values. Otherwise every value is its own scheduled step, so the
/// iteration can be cancelled between any two values.
pub fn from_iter_on<I, Err>(iter: I, scheduler: impl Into<SchedulerRef>) -> FromIterOn<I, Err>
where
  I: IntoIterator,
{
  FromIterOn { iter, scheduler: scheduler.into(), _err: PhantomData }
}

#[derive(Clone)]
pub struct FromIterOn<I, Err> {
  iter: I,
  scheduler: SchedulerRef,
  _err: PhantomData<fn() -> Err>,
}

impl<I, Err> Observable for FromIterOn<I, Err>
where
  I: IntoIterator,
  I::IntoIter: Send + 'static,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = I::Item;
  type Err = Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<I::Item, Err> + Send + 'static,
  {
    let (mut sink, subscription) = Sink::new(observer);
    let mut iter = self.iter.into_iter();

    if let Some(long_running) = self.scheduler.as_long_running() {
      let handle = long_running.schedule_long_running(Box::new(move |cancelled| {
        while !cancelled.is_cancelled() && !sink.is_closed() {
          match iter.next() {
            Some(value) => sink.forward_next(value),
            None => return sink.forward_complete(),
          }
        }
      }));
      subscription.assign_upstream(handle);
    } else {
      let task = Task::new((iter, sink), |state: &mut (I::IntoIter, Sink<O, I::Item, Err>)| {
        let (iter, sink) = state;
        if sink.is_closed() {
          return TaskState::Finished;
        }
        match iter.next() {
          Some(value) => {
            sink.forward_next(value);
            TaskState::Yield
          }
          None => {
            sink.forward_complete();
            TaskState::Finished
          }
        }
      });
      subscription.assign_upstream(self.scheduler.schedule_task(task, Duration::ZERO));
    }
    subscription
  }
}
