use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use super::Subscription;

/// A one-way boolean set by `unsubscribe`.
///
/// Long-running loops that cannot otherwise be interrupted poll
/// [`is_cancelled`](CancellationFlag::is_cancelled) between iterations. Once
/// set, the flag is never observed unset again.
#[derive(Clone, Default, Debug)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
  pub fn new() -> Self { Self::default() }

  #[inline]
  pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Acquire) }

  /// Sets the flag and reports whether this call was the one that set it.
  #[inline]
  pub fn cancel(&self) -> bool { !self.0.swap(true, Ordering::AcqRel) }
}

impl Subscription for CancellationFlag {
  #[inline]
  fn unsubscribe(&self) { self.cancel(); }

  #[inline]
  fn is_closed(&self) -> bool { self.is_cancelled() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcore_macro::test]
  fn set_once() {
    let flag = CancellationFlag::new();
    let seen_by_loop = flag.clone();
    assert!(!seen_by_loop.is_cancelled());
    assert!(flag.cancel());
    assert!(!flag.cancel());
    flag.unsubscribe();
    assert!(seen_by_loop.is_cancelled());
    assert!(seen_by_loop.is_closed());
  }

  #[rxcore_macro::test]
  fn loop_stops_after_cancel_from_other_thread() {
    let flag = CancellationFlag::new();
    let c_flag = flag.clone();
    let worker = std::thread::spawn(move || {
      let mut spins = 0u64;
      while !c_flag.is_cancelled() {
        spins += 1;
        std::thread::yield_now();
      }
      spins
    });
    std::thread::sleep(std::time::Duration::from_millis(5));
    flag.unsubscribe();
    worker.join().unwrap();
    assert!(flag.is_cancelled());
  }
}
