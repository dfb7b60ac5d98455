use std::{
  future::Future,
  io,
  pin::Pin,
  task::{Context, Poll},
  thread,
};

use futures::executor::ThreadPool;
use futures_time::task::{sleep, Sleep};
use once_cell::sync::Lazy;
use pin_project_lite::pin_project;

use super::{
  real_now, Duration, HostLifecycle, InstantStopwatch, LongRunning, Scheduler, Stopwatch,
  StopwatchProvider, TaskHandle, Work,
};
use crate::subscription::{BoxedSubscription, CancellationFlag, Subscription};

static DEFAULT_POOL: Lazy<PoolScheduler> = Lazy::new(|| {
  PoolScheduler::builder()
    .name_prefix("rxcore-pool-")
    .build()
    .expect("failed to create the default rxcore thread pool")
});

/// Concurrent scheduler backed by a `futures` thread pool.
///
/// Delayed work waits on a `futures-time` timer inside a pool task; cancelling
/// the handle wakes that task so it completes without waiting for the timer.
/// Long-running work gets a dedicated thread.
#[derive(Clone)]
pub struct PoolScheduler {
  pool: ThreadPool,
  name_prefix: String,
  lifecycle: Option<HostLifecycle>,
}

impl PoolScheduler {
  pub fn builder() -> PoolSchedulerBuilder { PoolSchedulerBuilder::default() }

  /// The process-wide default pool.
  pub fn shared() -> Self { DEFAULT_POOL.clone() }
}

impl Default for PoolScheduler {
  fn default() -> Self { Self::shared() }
}

#[derive(Default)]
pub struct PoolSchedulerBuilder {
  pool_size: Option<usize>,
  name_prefix: Option<String>,
  lifecycle: Option<HostLifecycle>,
}

impl PoolSchedulerBuilder {
  /// Number of worker threads. Defaults to the number of CPUs.
  pub fn pool_size(mut self, size: usize) -> Self {
    self.pool_size = Some(size);
    self
  }

  pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.name_prefix = Some(prefix.into());
    self
  }

  pub fn lifecycle(mut self, lifecycle: HostLifecycle) -> Self {
    self.lifecycle = Some(lifecycle);
    self
  }

  pub fn build(self) -> io::Result<PoolScheduler> {
    let name_prefix = self
      .name_prefix
      .unwrap_or_else(|| "rxcore-".to_string());
    let mut builder = ThreadPool::builder();
    builder.name_prefix(name_prefix.clone());
    if let Some(size) = self.pool_size {
      builder.pool_size(size);
    }
    let pool = builder.create()?;
    Ok(PoolScheduler { pool, name_prefix, lifecycle: self.lifecycle })
  }
}

pin_project! {
  struct ScheduledWork {
    #[pin]
    sleep: Sleep,
    handle: TaskHandle,
    work: Option<Work>,
  }
}

impl Future for ScheduledWork {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
    let this = self.project();
    if this.handle.is_closed() {
      return Poll::Ready(());
    }
    if this.sleep.poll(cx).is_pending() {
      this.handle.register_waker(cx.waker());
      return Poll::Pending;
    }
    if let Some(work) = this.work.take() {
      this.handle.run(work);
    }
    Poll::Ready(())
  }
}

impl Scheduler for PoolScheduler {
  fn now(&self) -> Duration { real_now() }

  fn enqueue(&self, due: Duration, handle: TaskHandle, work: Work) {
    let delay = due.saturating_sub(real_now());
    self
      .pool
      .spawn_ok(ScheduledWork { sleep: sleep(delay.into()), handle, work: Some(work) });
  }

  fn as_stopwatch_provider(&self) -> Option<&dyn StopwatchProvider> { Some(self) }

  fn as_long_running(&self) -> Option<&dyn LongRunning> { Some(self) }

  fn lifecycle(&self) -> Option<&HostLifecycle> { self.lifecycle.as_ref() }
}

impl StopwatchProvider for PoolScheduler {
  fn start_stopwatch(&self) -> Box<dyn Stopwatch> { Box::new(InstantStopwatch::start()) }
}

impl LongRunning for PoolScheduler {
  fn schedule_long_running(
    &self, work: Box<dyn FnOnce(&CancellationFlag) + Send>,
  ) -> BoxedSubscription {
    let flag = CancellationFlag::new();
    let c_flag = flag.clone();
    let spawned = thread::Builder::new()
      .name(format!("{}long-running", self.name_prefix))
      .spawn(move || work(&c_flag));
    if let Err(err) = spawned {
      tracing::error!(%err, "failed to spawn a long-running thread");
      flag.unsubscribe();
    }
    BoxedSubscription::new(flag)
  }
}
