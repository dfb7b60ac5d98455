//! Scheduler abstraction.
//!
//! A [`Scheduler`] is a logical executor plus a clock. It only has to know how
//! to run a boxed unit of work no earlier than a due time; everything else
//! (state passing, relative delays, trampolined tasks, periodic execution) is
//! layered on top by [`SchedulerRef`].
//!
//! Optional capabilities are discovered through `as_*` queries that default to
//! `None`:
//!
//! | Capability | Query | Fallback when absent |
//! |------------|-------|----------------------|
//! | [`StopwatchProvider`] | `as_stopwatch_provider` | stopwatch derived from `now()` |
//! | [`LongRunning`] | `as_long_running` | tail-recursive [`Task`] scheduling |
//! | [`PeriodicScheduler`] | `as_periodic` | drift-corrected emulation, see [`periodic`] |
//!
//! Time is a [`Duration`] measured from the scheduler's own clock origin. Real
//! clocks share one process-wide origin; [`VirtualTimeScheduler`] starts at
//! zero and only moves when told to.

use std::{sync::Arc, time::Instant};

pub use std::time::Duration;

use once_cell::sync::Lazy;

use crate::subscription::{BoxedSubscription, CancellationFlag};

mod immediate;
mod lifecycle;
pub mod periodic;
#[cfg(feature = "futures-scheduler")]
mod pool;
mod task;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
mod virtual_time;

pub use immediate::ImmediateScheduler;
pub use lifecycle::{HostLifecycle, LifecycleEvent};
#[cfg(feature = "futures-scheduler")]
pub use pool::{PoolScheduler, PoolSchedulerBuilder};
pub use task::{Task, TaskHandle, TaskState};
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;
pub use virtual_time::VirtualTimeScheduler;

/// A unit of work handed to a scheduler.
pub type Work = Box<dyn FnOnce() + Send>;

// ============================================================================
// Scheduler trait and capabilities
// ============================================================================

pub trait Scheduler: Send + Sync + 'static {
  /// Current time of this scheduler's clock.
  fn now(&self) -> Duration;

  /// Queue `work` to run no earlier than `due`.
  ///
  /// Implementations must order work by due time with ties broken by
  /// insertion order, and must execute it through [`TaskHandle::run`], which
  /// skips cancelled work and cancels the handle before re-raising a panic.
  fn enqueue(&self, due: Duration, handle: TaskHandle, work: Work);

  fn as_stopwatch_provider(&self) -> Option<&dyn StopwatchProvider> { None }

  fn as_long_running(&self) -> Option<&dyn LongRunning> { None }

  fn as_periodic(&self) -> Option<&dyn PeriodicScheduler> { None }

  /// Host suspend/resume events this scheduler was constructed with.
  fn lifecycle(&self) -> Option<&HostLifecycle> { None }
}

/// Measures elapsed time from the moment it was started.
pub trait Stopwatch: Send + Sync {
  fn elapsed(&self) -> Duration;
}

pub trait StopwatchProvider {
  fn start_stopwatch(&self) -> Box<dyn Stopwatch>;
}

/// Runs a tight loop on a dedicated execution context. The loop polls the
/// flag between iterations and returns once it is set.
pub trait LongRunning {
  fn schedule_long_running(
    &self, work: Box<dyn FnOnce(&CancellationFlag) + Send>,
  ) -> BoxedSubscription;
}

/// Native periodic execution.
pub trait PeriodicScheduler {
  fn schedule_periodic(
    &self, period: Duration, action: Box<dyn FnMut() + Send>,
  ) -> BoxedSubscription;
}

// ============================================================================
// Real clock
// ============================================================================

static CLOCK_ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// Time elapsed since the process-wide origin shared by every real-clock
/// scheduler.
pub(crate) fn real_now() -> Duration { CLOCK_ORIGIN.elapsed() }

pub(crate) struct InstantStopwatch(Instant);

impl InstantStopwatch {
  pub(crate) fn start() -> Self { InstantStopwatch(Instant::now()) }
}

impl Stopwatch for InstantStopwatch {
  fn elapsed(&self) -> Duration { self.0.elapsed() }
}

struct ClockStopwatch {
  scheduler: SchedulerRef,
  started: Duration,
}

impl Stopwatch for ClockStopwatch {
  fn elapsed(&self) -> Duration { self.scheduler.now().saturating_sub(self.started) }
}

// ============================================================================
// SchedulerRef
// ============================================================================

/// Cheap, cloneable handle to a scheduler. Operators store this.
#[derive(Clone)]
pub struct SchedulerRef(Arc<dyn Scheduler>);

impl SchedulerRef {
  pub fn new(scheduler: impl Scheduler) -> Self { SchedulerRef(Arc::new(scheduler)) }

  #[inline]
  pub fn now(&self) -> Duration { self.0.now() }

  #[inline]
  pub fn inner(&self) -> &dyn Scheduler { &*self.0 }

  /// Run `action` with `state` as soon as possible.
  pub fn schedule<S, F>(&self, state: S, action: F) -> TaskHandle
  where
    S: Send + 'static,
    F: FnOnce(S) + Send + 'static,
  {
    self.schedule_at(state, self.now(), action)
  }

  /// Run `action` with `state` after `delay`.
  pub fn schedule_after<S, F>(&self, state: S, delay: Duration, action: F) -> TaskHandle
  where
    S: Send + 'static,
    F: FnOnce(S) + Send + 'static,
  {
    self.schedule_at(state, self.now() + delay, action)
  }

  /// Run `action` with `state` at the absolute time `due`. A due time in the
  /// past runs as soon as possible.
  pub fn schedule_at<S, F>(&self, state: S, due: Duration, action: F) -> TaskHandle
  where
    S: Send + 'static,
    F: FnOnce(S) + Send + 'static,
  {
    let handle = TaskHandle::new();
    let c_handle = handle.clone();
    self.0.enqueue(
      due,
      handle.clone(),
      Box::new(move || {
        action(state);
        c_handle.mark_finished();
      }),
    );
    handle
  }

  /// Schedule a multi-step [`Task`] after `delay`.
  ///
  /// Every step is a fresh queue item, so cancelling the returned handle
  /// takes effect between any two steps and the call stack never grows with
  /// the number of steps.
  pub fn schedule_task<S: Send + 'static>(&self, task: Task<S>, delay: Duration) -> TaskHandle {
    let handle = TaskHandle::new();
    trampoline(self.clone(), task, self.now() + delay, handle.clone());
    handle
  }

  /// Run `action` every `period`. Uses the scheduler's native periodic
  /// capability when it has one and the emulation otherwise.
  ///
  /// # Panics
  ///
  /// Panics when `period` is zero.
  pub fn schedule_periodic<F>(&self, period: Duration, action: F) -> BoxedSubscription
  where
    F: FnMut() + Send + 'static,
  {
    assert!(!period.is_zero(), "periodic scheduling requires a non-zero period");
    match self.0.as_periodic() {
      Some(native) => native.schedule_periodic(period, Box::new(action)),
      None => periodic::schedule_periodic_emulated(self.clone(), period, Box::new(action)),
    }
  }

  pub fn start_stopwatch(&self) -> Box<dyn Stopwatch> {
    match self.0.as_stopwatch_provider() {
      Some(provider) => provider.start_stopwatch(),
      None => Box::new(ClockStopwatch { scheduler: self.clone(), started: self.now() }),
    }
  }

  #[inline]
  pub fn as_long_running(&self) -> Option<&dyn LongRunning> { self.0.as_long_running() }

  #[inline]
  pub fn lifecycle(&self) -> Option<&HostLifecycle> { self.0.lifecycle() }
}

impl<S: Scheduler> From<S> for SchedulerRef {
  fn from(scheduler: S) -> Self { SchedulerRef::new(scheduler) }
}

impl std::fmt::Debug for SchedulerRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SchedulerRef").field("now", &self.now()).finish()
  }
}

fn trampoline<S: Send + 'static>(
  scheduler: SchedulerRef, mut task: Task<S>, due: Duration, handle: TaskHandle,
) {
  let c_handle = handle.clone();
  let c_scheduler = scheduler.clone();
  scheduler.0.enqueue(
    due,
    handle,
    Box::new(move || match task.step() {
      TaskState::Finished => c_handle.mark_finished(),
      TaskState::Yield => {
        let due = c_scheduler.now();
        trampoline(c_scheduler, task, due, c_handle);
      }
      TaskState::Sleeping(delay) => {
        let due = c_scheduler.now() + delay;
        trampoline(c_scheduler, task, due, c_handle);
      }
    }),
  );
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::subscription::Subscription;

  #[rxcore_macro::test]
  fn schedule_variants_order_by_due_time() {
    let scheduler = VirtualTimeScheduler::new();
    let sref = SchedulerRef::from(scheduler.clone());
    let log = Arc::new(Mutex::new(vec![]));

    let l = log.clone();
    sref.schedule_after("after", Duration::from_millis(20), move |s| l.lock().unwrap().push(s));
    let l = log.clone();
    sref.schedule_at("at", Duration::from_millis(10), move |s| l.lock().unwrap().push(s));
    let l = log.clone();
    sref.schedule("now", move |s| l.lock().unwrap().push(s));
    let l = log.clone();
    sref.schedule("now-second", move |s| l.lock().unwrap().push(s));

    scheduler.advance_by(Duration::from_millis(20));
    assert_eq!(*log.lock().unwrap(), vec!["now", "now-second", "at", "after"]);
  }

  #[rxcore_macro::test]
  fn cancelled_item_never_runs() {
    let scheduler = VirtualTimeScheduler::new();
    let sref = SchedulerRef::from(scheduler.clone());
    let ran = Arc::new(Mutex::new(false));
    let c_ran = ran.clone();
    let handle = sref.schedule_after((), Duration::from_millis(5), move |_| {
      *c_ran.lock().unwrap() = true;
    });
    handle.unsubscribe();
    scheduler.flush();
    assert!(!*ran.lock().unwrap());
  }

  #[rxcore_macro::test]
  fn task_steps_are_cancellable_between_steps() {
    let scheduler = VirtualTimeScheduler::new();
    let sref = SchedulerRef::from(scheduler.clone());
    let steps = Arc::new(Mutex::new(vec![]));
    let c_steps = steps.clone();
    let clock = scheduler.clone();
    let handle = sref.schedule_task(
      Task::new(0, move |n: &mut i32| {
        *n += 1;
        c_steps.lock().unwrap().push((*n, clock.now()));
        TaskState::Sleeping(Duration::from_millis(10))
      }),
      Duration::ZERO,
    );

    scheduler.advance_by(Duration::from_millis(25));
    handle.unsubscribe();
    scheduler.advance_by(Duration::from_millis(100));

    assert_eq!(
      *steps.lock().unwrap(),
      vec![
        (1, Duration::ZERO),
        (2, Duration::from_millis(10)),
        (3, Duration::from_millis(20)),
      ]
    );
    assert!(handle.is_closed());
  }

  #[rxcore_macro::test]
  fn task_finishes_handle() {
    let scheduler = VirtualTimeScheduler::new();
    let sref = SchedulerRef::from(scheduler.clone());
    let handle = sref.schedule_task(
      Task::new(3, |n: &mut i32| {
        *n -= 1;
        if *n == 0 { TaskState::Finished } else { TaskState::Yield }
      }),
      Duration::ZERO,
    );
    assert!(!handle.is_closed());
    scheduler.flush();
    assert!(handle.is_finished());
  }

  #[rxcore_macro::test]
  fn stopwatch_falls_back_to_clock() {
    let scheduler = VirtualTimeScheduler::new();
    let sref = SchedulerRef::from(scheduler.clone());
    scheduler.advance_by(Duration::from_millis(7));
    let sw = sref.start_stopwatch();
    scheduler.advance_by(Duration::from_millis(5));
    assert_eq!(sw.elapsed(), Duration::from_millis(5));
  }

  #[rxcore_macro::test]
  #[should_panic(expected = "non-zero period")]
  fn zero_period_is_rejected() {
    SchedulerRef::from(VirtualTimeScheduler::new()).schedule_periodic(Duration::ZERO, || {});
  }
}
