//! Disposable resource model.
//!
//! A [`Subscription`] is a handle to a cancelable unit of work or an active
//! stream subscription. `unsubscribe` is idempotent, safe to call from several
//! threads at once (exactly one caller performs the teardown) and releases the
//! resource before it returns, transitively for containers.
//!
//! | Primitive | Behavior |
//! |-----------|----------|
//! | [`ClosureSubscription`] | runs a teardown closure once |
//! | [`CancellationFlag`] | one-way boolean polled by tight loops |
//! | [`SingleAssignmentSubscription`] | slot assignable once; late assignment after disposal is disposed at once |
//! | [`SerialSubscription`] | replaceable slot; each replacement disposes the previous occupant |
//! | [`CompositeSubscription`] | dynamic group of children |
//! | [`RefCountSubscription`] | releases the underlying resource when the primary and every derived handle are gone |

use std::{
  any::Any,
  panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
  sync::Arc,
};

mod boxed;
mod closure;
mod composite;
mod dynamic;
mod flag;
mod ref_count;
mod serial;
mod single_assignment;

pub use boxed::*;
pub use closure::*;
pub use composite::*;
pub use dynamic::*;
pub use flag::*;
pub use ref_count::*;
pub use serial::*;
pub use single_assignment::*;

use crate::error::TeardownFailure;

/// Subscription returned from `Observable::actual_subscribe` to allow
/// cancelling.
pub trait Subscription {
  /// Release the resource. Only the first call has an effect.
  fn unsubscribe(&self);

  fn is_closed(&self) -> bool;
}

/// Unit subscription: nothing to release, always closed.
impl Subscription for () {
  #[inline]
  fn unsubscribe(&self) {}

  #[inline]
  fn is_closed(&self) -> bool { true }
}

impl<T: Subscription + ?Sized> Subscription for Box<T> {
  #[inline]
  fn unsubscribe(&self) { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

impl<T: Subscription + ?Sized> Subscription for Arc<T> {
  #[inline]
  fn unsubscribe(&self) { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

impl<T: Subscription> Subscription for Option<T> {
  fn unsubscribe(&self) {
    if let Some(inner) = self {
      inner.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.as_ref().is_none_or(Subscription::is_closed) }
}

impl<A: Subscription, B: Subscription> Subscription for (A, B) {
  fn unsubscribe(&self) {
    self.0.unsubscribe();
    self.1.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.0.is_closed() && self.1.is_closed() }
}

/// Dispose every subscription, even when some of them panic, then re-raise
/// one aggregated [`TeardownFailure`].
pub(crate) fn unsubscribe_all<I>(subscriptions: I)
where
  I: IntoIterator,
  I::Item: Subscription,
{
  let mut failures: Vec<Box<dyn Any + Send>> = Vec::new();
  for sub in subscriptions {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sub.unsubscribe())) {
      failures.push(payload);
    }
  }
  match failures.len() {
    0 => {}
    1 => resume_unwind(failures.remove(0)),
    _ => {
      let messages = failures
        .iter()
        .map(|p| TeardownFailure::describe(p.as_ref()))
        .collect::<Vec<_>>();
      tracing::error!(count = messages.len(), "teardown failed");
      resume_unwind(Box::new(TeardownFailure { messages }))
    }
  }
}

// ============================================================================
// RAII helpers
// ============================================================================

/// Wrapper around a subscription which provides the
/// `unsubscribe_when_dropped()` method.
pub struct SubscriptionWrapper<T: Subscription>(pub(crate) T);

impl<T: Subscription> SubscriptionWrapper<T> {
  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<T> { SubscriptionGuard(self.0) }

  /// Consumes this wrapper and returns the underlying subscription.
  pub fn into_inner(self) -> T { self.0 }
}

impl<T: Subscription> Subscription for SubscriptionWrapper<T> {
  #[inline]
  fn unsubscribe(&self) { self.0.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
#[must_use]
pub struct SubscriptionGuard<T: Subscription>(pub(crate) T);

impl<T: Subscription> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}
