use super::{BoxedSubscription, Subscription};
use crate::rc::MutArc;

#[derive(Default)]
struct SerialState {
  disposed: bool,
  current: Option<BoxedSubscription>,
}

/// A replaceable slot. Setting a new child disposes the previous one; once the
/// slot itself is disposed every later child is disposed on arrival.
#[derive(Clone, Default)]
pub struct SerialSubscription(MutArc<SerialState>);

impl SerialSubscription {
  pub fn new() -> Self { Self::default() }

  pub fn set(&self, subscription: impl Subscription + Send + Sync + 'static) {
    let subscription = BoxedSubscription::new(subscription);
    let retired = {
      let mut state = self.0.rc_deref_mut();
      if state.disposed {
        Some(subscription)
      } else {
        state.current.replace(subscription)
      }
    };
    if let Some(retired) = retired {
      retired.unsubscribe();
    }
  }
}

impl Subscription for SerialSubscription {
  fn unsubscribe(&self) {
    let current = {
      let mut state = self.0.rc_deref_mut();
      state.disposed = true;
      state.current.take()
    };
    if let Some(current) = current {
      current.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.0.rc_deref().disposed }
}
