use super::{BoxedSubscription, Subscription};
use crate::{
  error::{Result, RxError},
  rc::MutArc,
};

enum Slot {
  Empty,
  Holding(BoxedSubscription),
  Released { assigned: bool },
}

/// A slot that accepts exactly one child.
///
/// Sinks use it to hold their upstream subscription: the sink can be disposed
/// before `subscribe` on the upstream has even returned, and the late
/// assignment is then disposed immediately.
#[derive(Clone)]
pub struct SingleAssignmentSubscription(MutArc<Slot>);

impl Default for SingleAssignmentSubscription {
  fn default() -> Self { Self(MutArc::own(Slot::Empty)) }
}

impl SingleAssignmentSubscription {
  pub fn new() -> Self { Self::default() }

  /// Store the child. A second assignment is rejected with
  /// [`RxError::InvalidOperation`] and the rejected child is left untouched.
  pub fn assign(&self, subscription: impl Subscription + Send + Sync + 'static) -> Result<()> {
    let mut slot = self.0.rc_deref_mut();
    match *slot {
      Slot::Empty => {
        *slot = Slot::Holding(BoxedSubscription::new(subscription));
        Ok(())
      }
      Slot::Released { assigned: false } => {
        *slot = Slot::Released { assigned: true };
        drop(slot);
        subscription.unsubscribe();
        Ok(())
      }
      Slot::Holding(_) | Slot::Released { assigned: true } => {
        Err(RxError::InvalidOperation("single-assignment subscription is already assigned"))
      }
    }
  }

  pub fn is_assigned(&self) -> bool {
    matches!(&*self.0.rc_deref(), Slot::Holding(_) | Slot::Released { assigned: true })
  }
}

impl Subscription for SingleAssignmentSubscription {
  fn unsubscribe(&self) {
    let child = {
      let mut slot = self.0.rc_deref_mut();
      match std::mem::replace(&mut *slot, Slot::Released { assigned: false }) {
        Slot::Holding(child) => {
          *slot = Slot::Released { assigned: true };
          Some(child)
        }
        Slot::Empty => None,
        released @ Slot::Released { .. } => {
          *slot = released;
          None
        }
      }
    };
    if let Some(child) = child {
      child.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { matches!(&*self.0.rc_deref(), Slot::Released { .. }) }
}
