use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use super::{BoxedSubscription, Subscription};
use crate::rc::MutArc;

struct RefState {
  // The primary handle counts as one.
  count: usize,
  underlying: Option<BoxedSubscription>,
}

struct RefCore {
  state: MutArc<RefState>,
  primary_released: AtomicBool,
}

impl RefCore {
  fn release(&self) {
    let underlying = {
      let mut state = self.state.rc_deref_mut();
      state.count = state.count.saturating_sub(1);
      if state.count == 0 { state.underlying.take() } else { None }
    };
    if let Some(underlying) = underlying {
      underlying.unsubscribe();
    }
  }

  fn is_released(&self) -> bool { self.state.rc_deref().underlying.is_none() }
}

/// Keeps an underlying resource alive until the primary handle and every
/// derived handle have been disposed, in any order.
///
/// `group_by` hands one derived handle to each group so the source stays
/// subscribed while any group is still being observed.
#[derive(Clone)]
pub struct RefCountSubscription(Arc<RefCore>);

impl RefCountSubscription {
  pub fn new(underlying: impl Subscription + Send + Sync + 'static) -> Self {
    RefCountSubscription(Arc::new(RefCore {
      state: MutArc::own(RefState { count: 1, underlying: Some(BoxedSubscription::new(underlying)) }),
      primary_released: AtomicBool::new(false),
    }))
  }

  /// Take a derived handle. Once the resource has been released this returns
  /// an inert, already closed handle.
  pub fn acquire(&self) -> RefCountHandle {
    let mut state = self.0.state.rc_deref_mut();
    if state.underlying.is_none() {
      return RefCountHandle { core: self.0.clone(), released: AtomicBool::new(true) };
    }
    state.count += 1;
    RefCountHandle { core: self.0.clone(), released: AtomicBool::new(false) }
  }

  pub fn is_primary_disposed(&self) -> bool { self.0.primary_released.load(Ordering::Acquire) }
}

impl Subscription for RefCountSubscription {
  fn unsubscribe(&self) {
    if !self.0.primary_released.swap(true, Ordering::AcqRel) {
      self.0.release();
    }
  }

  /// Closed once the underlying resource has been released.
  fn is_closed(&self) -> bool { self.0.is_released() }
}

/// A derived handle from [`RefCountSubscription::acquire`]. Disposing it
/// twice only counts once.
pub struct RefCountHandle {
  core: Arc<RefCore>,
  released: AtomicBool,
}

impl Subscription for RefCountHandle {
  fn unsubscribe(&self) {
    if !self.released.swap(true, Ordering::AcqRel) {
      self.core.release();
    }
  }

  fn is_closed(&self) -> bool { self.released.load(Ordering::Acquire) }
}
