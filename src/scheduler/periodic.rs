//! Drift-corrected periodic execution for schedulers without a native
//! periodic capability.
//!
//! The emulation is a three-phase state machine coordinated by an atomic
//! pending-tick counter instead of a blocking loop:
//!
//! 1. **Tick due** schedules the next nominal tick *before* anything else, so
//!    the action's own cost never pushes later ticks back. Nominal tick `n`
//!    is due at `n * period + inactive` on the stopwatch, where `inactive` is
//!    the time spent suspended. When ticks fell so far behind that the next
//!    nominal tick is already in the past, the missed ticks are collapsed.
//!    The tick then increments the pending counter and, if nothing was
//!    pending, runs dispatch start directly.
//! 2. **Dispatch start** runs the action. A panic cancels the whole schedule
//!    and is re-raised. Otherwise dispatch end is queued.
//! 3. **Dispatch end** decrements the counter. If ticks arrived while the
//!    action was running it queues dispatch start again right away.
//!
//! Only the transition of the counter away from zero starts a dispatch, and
//! only dispatch end continues one, so invocations never overlap.

use std::{
  panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
};

use super::{Duration, LifecycleEvent, SchedulerRef, Stopwatch};
use crate::{
  rc::MutArc,
  subscription::{
    BoxedSubscription, CancellationFlag, SerialSubscription, SingleAssignmentSubscription,
    Subscription,
  },
};

type Action = Box<dyn FnMut() + Send>;

struct Timing {
  /// Nominal ticks issued so far.
  ticks: u32,
  inactive: Duration,
  suspended_at: Option<Duration>,
}

struct PeriodicState {
  scheduler: SchedulerRef,
  period: Duration,
  stopwatch: Box<dyn Stopwatch>,
  action: MutArc<Action>,
  pending: AtomicUsize,
  cancelled: CancellationFlag,
  next_tick: SerialSubscription,
  lifecycle_sub: SingleAssignmentSubscription,
  timing: MutArc<Timing>,
}

/// Handle to an emulated periodic schedule.
#[derive(Clone)]
pub struct PeriodicSubscription(Arc<PeriodicState>);

impl Subscription for PeriodicSubscription {
  fn unsubscribe(&self) { self.0.cancel() }

  fn is_closed(&self) -> bool { self.0.cancelled.is_cancelled() }
}

pub(crate) fn schedule_periodic_emulated(
  scheduler: SchedulerRef, period: Duration, action: Action,
) -> BoxedSubscription {
  BoxedSubscription::new(PeriodicSubscription::start(scheduler, period, action))
}

impl PeriodicSubscription {
  /// Start emulating periodic execution of `action` on `scheduler`.
  pub fn start(scheduler: SchedulerRef, period: Duration, action: Action) -> Self {
    let stopwatch = scheduler.start_stopwatch();
    let state = Arc::new(PeriodicState {
      scheduler: scheduler.clone(),
      period,
      stopwatch,
      action: MutArc::own(action),
      pending: AtomicUsize::new(0),
      cancelled: CancellationFlag::new(),
      next_tick: SerialSubscription::new(),
      lifecycle_sub: SingleAssignmentSubscription::new(),
      timing: MutArc::own(Timing { ticks: 0, inactive: Duration::ZERO, suspended_at: None }),
    });

    if let Some(lifecycle) = scheduler.lifecycle() {
      let weak = Arc::downgrade(&state);
      let sub = lifecycle.subscribe(move |event| {
        if let Some(state) = weak.upgrade() {
          match event {
            LifecycleEvent::Suspending => state.suspend(),
            LifecycleEvent::Resuming => state.resume(),
          }
        }
      });
      let _ = state.lifecycle_sub.assign(sub);
    }

    tracing::debug!(?period, "starting emulated periodic schedule");
    state.schedule_tick(period);
    PeriodicSubscription(state)
  }
}

impl PeriodicState {
  fn cancel(&self) {
    if self.cancelled.cancel() {
      tracing::debug!(period = ?self.period, "periodic schedule cancelled");
      self.next_tick.unsubscribe();
      self.lifecycle_sub.unsubscribe();
    }
  }

  fn schedule_tick(self: &Arc<Self>, delay: Duration) {
    let this = self.clone();
    let handle = self.scheduler.schedule_after((), delay, move |_| this.tick_due());
    self.next_tick.set(handle);
  }

  /// Stopwatch reading of nominal tick `n`.
  fn nominal(&self, timing: &Timing, n: u32) -> Duration { timing.inactive + self.period * n }

  // ==================== Tick due ====================

  fn tick_due(self: &Arc<Self>) {
    if self.cancelled.is_cancelled() {
      return;
    }
    let delay = {
      let mut timing = self.timing.rc_deref_mut();
      if timing.suspended_at.is_some() {
        // Resume reschedules.
        return;
      }
      timing.ticks += 1;
      let elapsed = self.stopwatch.elapsed();
      let mut next = self.nominal(&timing, timing.ticks + 1);
      if next <= elapsed {
        let active = elapsed.saturating_sub(timing.inactive);
        let caught_up = (active.as_nanos() / self.period.as_nanos()) as u32;
        tracing::trace!(missed = caught_up - timing.ticks, "collapsing missed periodic ticks");
        timing.ticks = caught_up;
        next = self.nominal(&timing, timing.ticks + 1);
      }
      next - elapsed
    };
    self.schedule_tick(delay);

    if self.pending.fetch_add(1, Ordering::AcqRel) == 0 {
      self.dispatch_start();
    }
  }

  // ==================== Dispatch ====================

  fn dispatch_start(self: &Arc<Self>) {
    if self.cancelled.is_cancelled() {
      return;
    }
    let result = catch_unwind(AssertUnwindSafe(|| (self.action.rc_deref_mut())()));
    if let Err(payload) = result {
      tracing::warn!("periodic action panicked, cancelling the schedule");
      self.cancel();
      resume_unwind(payload);
    }
    let this = self.clone();
    self.scheduler.schedule((), move |_| this.dispatch_end());
  }

  fn dispatch_end(self: &Arc<Self>) {
    if self.cancelled.is_cancelled() {
      return;
    }
    if self.pending.fetch_sub(1, Ordering::AcqRel) > 1 {
      let this = self.clone();
      self.scheduler.schedule((), move |_| this.dispatch_start());
    }
  }

  // ==================== Host lifecycle ====================

  fn suspend(&self) {
    let mut timing = self.timing.rc_deref_mut();
    if timing.suspended_at.is_none() {
      timing.suspended_at = Some(self.stopwatch.elapsed());
      tracing::debug!("periodic schedule suspended");
    }
  }

  fn resume(self: &Arc<Self>) {
    if self.cancelled.is_cancelled() {
      return;
    }
    let delay = {
      let mut timing = self.timing.rc_deref_mut();
      let Some(suspended_at) = timing.suspended_at.take() else {
        return;
      };
      let elapsed = self.stopwatch.elapsed();
      timing.inactive += elapsed.saturating_sub(suspended_at);
      tracing::debug!(inactive = ?timing.inactive, "periodic schedule resumed");
      self
        .nominal(&timing, timing.ticks + 1)
        .saturating_sub(elapsed)
    };
    self.schedule_tick(delay);
  }
}
