use std::{
  future::Future,
  panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
  pin::Pin,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  task::{Context, Poll, Waker},
  time::Duration,
};

use super::Work;
use crate::{rc::MutArc, subscription::Subscription};

/// What a [`Task`] wants after one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
  Finished,
  /// Run the next step as soon as possible.
  Yield,
  /// Run the next step after the given delay.
  Sleeping(Duration),
}

/// A stateful, multi-step unit of work.
///
/// Instead of looping internally, the step function returns a [`TaskState`]
/// and the scheduler queues the next step as a fresh item.
pub struct Task<S> {
  state: S,
  handler: Box<dyn FnMut(&mut S) -> TaskState + Send>,
}

impl<S> Task<S> {
  pub fn new(state: S, handler: impl FnMut(&mut S) -> TaskState + Send + 'static) -> Self {
    Task { state, handler: Box::new(handler) }
  }

  #[inline]
  pub fn step(&mut self) -> TaskState { (self.handler)(&mut self.state) }

  pub fn into_state(self) -> S { self.state }
}

// ==================== TaskHandle ====================

struct TaskShared {
  cancelled: AtomicBool,
  finished: AtomicBool,
  waker: MutArc<Option<Waker>>,
}

/// A handle for any scheduled work.
///
/// Cancelling it prevents work that has not started yet from running; work
/// already running is never interrupted. The handle is also a future that
/// resolves once the work finished or was cancelled.
#[derive(Clone)]
pub struct TaskHandle(Arc<TaskShared>);

impl Default for TaskHandle {
  fn default() -> Self { Self::new() }
}

impl TaskHandle {
  pub fn new() -> Self {
    TaskHandle(Arc::new(TaskShared {
      cancelled: AtomicBool::new(false),
      finished: AtomicBool::new(false),
      waker: MutArc::own(None),
    }))
  }

  /// A handle for work that already completed.
  pub fn finished() -> Self {
    let handle = Self::new();
    handle.mark_finished();
    handle
  }

  #[inline]
  pub fn is_cancelled(&self) -> bool { self.0.cancelled.load(Ordering::Acquire) }

  #[inline]
  pub fn is_finished(&self) -> bool { self.0.finished.load(Ordering::Acquire) }

  pub fn mark_finished(&self) {
    self.0.finished.store(true, Ordering::Release);
    self.wake();
  }

  /// Run `work` on behalf of this handle.
  ///
  /// Does nothing when the handle was cancelled. A panic escaping `work`
  /// cancels the handle and then resumes unwinding on the calling context.
  pub fn run(&self, work: Work) {
    if self.is_cancelled() {
      return;
    }
    if let Err(payload) = catch_unwind(AssertUnwindSafe(work)) {
      tracing::error!("scheduled action panicked, cancelling its task");
      self.unsubscribe();
      resume_unwind(payload);
    }
  }

  pub(crate) fn register_waker(&self, waker: &Waker) {
    *self.0.waker.rc_deref_mut() = Some(waker.clone());
  }

  fn wake(&self) {
    let waker = self.0.waker.rc_deref_mut().take();
    if let Some(waker) = waker {
      waker.wake();
    }
  }
}

impl Subscription for TaskHandle {
  fn unsubscribe(&self) {
    if !self.0.cancelled.swap(true, Ordering::AcqRel) {
      self.wake();
    }
  }

  fn is_closed(&self) -> bool { self.is_finished() || self.is_cancelled() }
}

impl Future for TaskHandle {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    if self.is_closed() {
      return Poll::Ready(());
    }
    self.register_waker(cx.waker());
    // Re-check: the work may have closed between the first check and the
    // waker registration.
    if self.is_closed() { Poll::Ready(()) } else { Poll::Pending }
  }
}

impl std::fmt::Debug for TaskHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TaskHandle")
      .field("cancelled", &self.is_cancelled())
      .field("finished", &self.is_finished())
      .finish()
  }
}
