//! Virtual time scheduler for deterministic testing of time-based code.
//!
//! Time only advances when explicitly instructed, and due work runs
//! synchronously on the thread that advances the clock, in due-time order with
//! FIFO ordering for equal due times.
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let scheduler = VirtualTimeScheduler::new();
//! let sref = SchedulerRef::from(scheduler.clone());
//! let handle = sref.schedule_after((), Duration::from_millis(100), |_| println!("fired"));
//!
//! scheduler.advance_by(Duration::from_millis(99));
//! assert!(!handle.is_finished());
//! scheduler.advance_by(Duration::from_millis(1));
//! assert!(handle.is_finished());
//! ```
//!
//! The queue lock is never held while work runs, so work may schedule more
//! work or even advance the clock itself (a slow action is modelled by an
//! `advance_by` inside it).

use std::{cmp::Ordering, collections::BinaryHeap};

use super::{Duration, HostLifecycle, Scheduler, TaskHandle, Work};
use crate::{rc::MutArc, subscription::Subscription};

// ==================== Internal State ====================

#[derive(Default)]
struct VirtualState {
  clock: Duration,
  queue: BinaryHeap<ScheduledItem>,
  next_seq: usize,
}

struct ScheduledItem {
  due: Duration,
  seq: usize,
  handle: TaskHandle,
  work: Work,
}

impl PartialEq for ScheduledItem {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for ScheduledItem {}

impl PartialOrd for ScheduledItem {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledItem {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by sequence
    other
      .due
      .cmp(&self.due)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

// ==================== VirtualTimeScheduler ====================

/// A scheduler driven by a manually advanced logical clock.
///
/// Clones share the same clock and queue.
#[derive(Clone, Default)]
pub struct VirtualTimeScheduler {
  state: MutArc<VirtualState>,
  lifecycle: Option<HostLifecycle>,
}

impl VirtualTimeScheduler {
  pub fn new() -> Self { Self::default() }

  /// A scheduler whose periodic work observes suspend/resume events from
  /// `lifecycle`.
  pub fn with_lifecycle(lifecycle: HostLifecycle) -> Self {
    VirtualTimeScheduler { state: MutArc::default(), lifecycle: Some(lifecycle) }
  }

  pub fn now(&self) -> Duration { self.state.rc_deref().clock }

  /// Number of queued items that can still run.
  pub fn pending_count(&self) -> usize {
    self
      .state
      .rc_deref()
      .queue
      .iter()
      .filter(|item| !item.handle.is_closed())
      .count()
  }

  pub fn is_empty(&self) -> bool { self.pending_count() == 0 }

  /// Advance the clock by `duration`, running everything that becomes due.
  pub fn advance_by(&self, duration: Duration) {
    let target = self.now() + duration;
    self.advance_to(target);
  }

  /// Advance the clock to `target`, running everything due up to and
  /// including it. A target in the past only runs work that is already due.
  pub fn advance_to(&self, target: Duration) {
    self.execute_until(Some(target));
    let mut state = self.state.rc_deref_mut();
    state.clock = state.clock.max(target);
  }

  /// Run every queued item, moving the clock to each item's due time.
  ///
  /// Work that keeps rescheduling itself (periodic work, for instance) makes
  /// this loop forever; use `advance_by` for such work.
  pub fn flush(&self) { self.execute_until(None); }

  fn execute_until(&self, target: Option<Duration>) {
    loop {
      let item = {
        let mut state = self.state.rc_deref_mut();
        let should_stop = state
          .queue
          .peek()
          .is_none_or(|peek| target.is_some_and(|limit| peek.due > limit));
        if should_stop {
          return;
        }
        let Some(item) = state.queue.pop() else {
          return;
        };
        state.clock = state.clock.max(item.due);
        item
      };
      tracing::trace!(due = ?item.due, seq = item.seq, "virtual scheduler running item");
      item.handle.run(item.work);
    }
  }
}

impl Scheduler for VirtualTimeScheduler {
  fn now(&self) -> Duration { VirtualTimeScheduler::now(self) }

  fn enqueue(&self, due: Duration, handle: TaskHandle, work: Work) {
    let mut state = self.state.rc_deref_mut();
    let seq = state.next_seq;
    state.next_seq += 1;
    state.queue.push(ScheduledItem { due, seq, handle, work });
  }

  fn lifecycle(&self) -> Option<&HostLifecycle> { self.lifecycle.as_ref() }
}
