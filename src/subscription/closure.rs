use super::Subscription;
use crate::rc::MutArc;

/// Runs a teardown closure exactly once, on the first `unsubscribe`.
pub struct ClosureSubscription<F>(MutArc<Option<F>>);

impl<F: FnOnce()> ClosureSubscription<F> {
  pub fn new(teardown: F) -> Self { Self(MutArc::own(Some(teardown))) }
}

impl<F> Clone for ClosureSubscription<F> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<F: FnOnce()> Subscription for ClosureSubscription<F> {
  fn unsubscribe(&self) {
    // Take under the lock, run outside of it.
    let teardown = self.0.rc_deref_mut().take();
    if let Some(teardown) = teardown {
      teardown();
    }
  }

  fn is_closed(&self) -> bool { self.0.rc_deref().is_none() }
}
