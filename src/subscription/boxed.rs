use super::Subscription;

/// A type-erased subscription that may cross threads.
///
/// Subscriptions are control handles, not data views, so the erased type is
/// `'static`: it can be stored in a container and disposed at any later time
/// from any thread.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let subs = vec![BoxedSubscription::new(()), BoxedSubscription::new(CancellationFlag::new())];
/// for sub in &subs {
///   sub.unsubscribe();
/// }
/// assert!(subs.iter().all(|s| s.is_closed()));
/// ```
pub struct BoxedSubscription(Box<dyn Subscription + Send + Sync>);

impl BoxedSubscription {
  pub fn new(subscription: impl Subscription + Send + Sync + 'static) -> Self {
    BoxedSubscription(Box::new(subscription))
  }
}

impl Subscription for BoxedSubscription {
  #[inline]
  fn unsubscribe(&self) { self.0.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl std::fmt::Debug for BoxedSubscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BoxedSubscription")
      .field("closed", &self.is_closed())
      .finish()
  }
}
