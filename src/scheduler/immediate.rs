use std::{cell::RefCell, collections::BinaryHeap, thread};

use super::{
  real_now, Duration, InstantStopwatch, Scheduler, Stopwatch, StopwatchProvider, TaskHandle, Work,
};
use crate::subscription::Subscription;

struct QueuedWork {
  due: Duration,
  seq: usize,
  handle: TaskHandle,
  work: Work,
}

impl PartialEq for QueuedWork {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for QueuedWork {}

impl PartialOrd for QueuedWork {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}

impl Ord for QueuedWork {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    other
      .due
      .cmp(&self.due)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct Trampoline {
  queue: BinaryHeap<QueuedWork>,
  next_seq: usize,
  draining: bool,
}

thread_local! {
  static TRAMPOLINE: RefCell<Trampoline> = RefCell::new(Trampoline::default());
}

/// Resets the draining mark even when a work item unwinds. On unwind the work
/// still queued belongs to the failed drain, so it is cancelled rather than
/// left for the next unrelated `enqueue` on this thread.
struct DrainGuard;

impl Drop for DrainGuard {
  fn drop(&mut self) {
    let orphans = TRAMPOLINE.with(|t| {
      let mut t = t.borrow_mut();
      t.draining = false;
      if thread::panicking() { std::mem::take(&mut t.queue) } else { BinaryHeap::new() }
    });
    if !orphans.is_empty() {
      tracing::warn!(count = orphans.len(), "cancelling work queued by a panicked action");
    }
    for item in orphans {
      item.handle.unsubscribe();
    }
  }
}

/// Runs work on the calling thread.
///
/// The first `enqueue` on a thread becomes the drain loop: it runs its own
/// work and everything scheduled from inside that work, in due-time order,
/// sleeping until items are due. Re-entrant scheduling from inside running
/// work only queues, so recursive scheduling never grows the call stack.
#[derive(Clone, Copy, Default, Debug)]
pub struct ImmediateScheduler;

impl ImmediateScheduler {
  fn drain() {
    let _guard = DrainGuard;
    loop {
      let next = TRAMPOLINE.with(|t| t.borrow_mut().queue.pop());
      let Some(item) = next else {
        break;
      };
      if item.handle.is_closed() {
        continue;
      }
      let now = real_now();
      if item.due > now {
        thread::sleep(item.due - now);
      }
      item.handle.run(item.work);
    }
  }
}

impl Scheduler for ImmediateScheduler {
  fn now(&self) -> Duration { real_now() }

  fn enqueue(&self, due: Duration, handle: TaskHandle, work: Work) {
    let owner = TRAMPOLINE.with(|t| {
      let mut t = t.borrow_mut();
      let seq = t.next_seq;
      t.next_seq += 1;
      t.queue.push(QueuedWork { due, seq, handle, work });
      !std::mem::replace(&mut t.draining, true)
    });
    if owner {
      Self::drain();
    }
  }

  fn as_stopwatch_provider(&self) -> Option<&dyn StopwatchProvider> { Some(self) }
}

impl StopwatchProvider for ImmediateScheduler {
  fn start_stopwatch(&self) -> Box<dyn Stopwatch> { Box::new(InstantStopwatch::start()) }
}
