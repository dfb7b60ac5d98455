//! Shared mutable cell used for every private mutex in the runtime.
//!
//! Sinks, subjects and schedulers all keep their mutable state behind a
//! `MutArc`. A panic raised by user code while a guard is alive must not
//! turn every later access into a second panic, so poisoning is ignored: the
//! state protected here stays consistent between statements.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct MutArc<T>(Arc<Mutex<T>>);

impl<T> MutArc<T> {
  pub fn own(t: T) -> Self { Self(Arc::new(Mutex::new(t))) }

  #[inline]
  pub fn rc_deref(&self) -> MutexGuard<'_, T> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }

  #[inline]
  pub fn rc_deref_mut(&self) -> MutexGuard<'_, T> { self.rc_deref() }
}

impl<T: Default> Default for MutArc<T> {
  fn default() -> Self { Self::own(T::default()) }
}

impl<T> Clone for MutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcore_macro::test]
  fn poisoned_lock_is_still_usable() {
    let cell = MutArc::own(1);
    let c_cell = cell.clone();
    let _ = std::thread::spawn(move || {
      let _guard = c_cell.rc_deref_mut();
      panic!("poison");
    })
    .join();

    *cell.rc_deref_mut() += 1;
    assert_eq!(*cell.rc_deref(), 2);
  }
}
