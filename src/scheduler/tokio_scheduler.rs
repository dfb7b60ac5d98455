use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

use futures::future::{select, Either};
use tokio::{runtime::Handle, time::MissedTickBehavior};

use super::{
  real_now, Duration, HostLifecycle, InstantStopwatch, PeriodicScheduler, Scheduler, Stopwatch,
  StopwatchProvider, TaskHandle, Work,
};
use crate::subscription::{BoxedSubscription, CancellationFlag, Subscription};

/// Scheduler spawning onto a tokio runtime, with native periodic execution
/// through `tokio::time::interval`.
#[derive(Clone)]
pub struct TokioScheduler {
  runtime: Handle,
  lifecycle: Option<HostLifecycle>,
}

impl TokioScheduler {
  pub fn new(runtime: Handle) -> Self { TokioScheduler { runtime, lifecycle: None } }

  /// Uses the runtime of the calling context.
  ///
  /// # Panics
  ///
  /// Panics when called outside of a tokio runtime.
  pub fn current() -> Self { Self::new(Handle::current()) }

  pub fn with_lifecycle(mut self, lifecycle: HostLifecycle) -> Self {
    self.lifecycle = Some(lifecycle);
    self
  }
}

impl Scheduler for TokioScheduler {
  fn now(&self) -> Duration { real_now() }

  fn enqueue(&self, due: Duration, handle: TaskHandle, work: Work) {
    let delay = due.saturating_sub(real_now());
    self.runtime.spawn(async move {
      if !delay.is_zero() {
        let sleep = Box::pin(tokio::time::sleep(delay));
        if let Either::Right(_) = select(sleep, handle.clone()).await {
          return;
        }
      }
      handle.run(work);
    });
  }

  fn as_stopwatch_provider(&self) -> Option<&dyn StopwatchProvider> { Some(self) }

  fn as_periodic(&self) -> Option<&dyn PeriodicScheduler> { Some(self) }

  fn lifecycle(&self) -> Option<&HostLifecycle> { self.lifecycle.as_ref() }
}

impl StopwatchProvider for TokioScheduler {
  fn start_stopwatch(&self) -> Box<dyn Stopwatch> { Box::new(InstantStopwatch::start()) }
}

impl PeriodicScheduler for TokioScheduler {
  fn schedule_periodic(
    &self, period: Duration, mut action: Box<dyn FnMut() + Send>,
  ) -> BoxedSubscription {
    let flag = CancellationFlag::new();
    let c_flag = flag.clone();
    self.runtime.spawn(async move {
      let start = tokio::time::Instant::now() + period;
      let mut ticks = tokio::time::interval_at(start, period);
      ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
      loop {
        ticks.tick().await;
        if c_flag.is_cancelled() {
          break;
        }
        if let Err(payload) = catch_unwind(AssertUnwindSafe(&mut action)) {
          tracing::warn!("periodic action panicked, cancelling the schedule");
          c_flag.unsubscribe();
          resume_unwind(payload);
        }
      }
    });
    BoxedSubscription::new(flag)
  }
}
