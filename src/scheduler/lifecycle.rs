use std::sync::Arc;

use crate::{
  rc::MutArc,
  subscription::{ClosureSubscription, DynamicSubscriptions, Subscription},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
  Suspending,
  Resuming,
}

type Listener = Arc<dyn Fn(LifecycleEvent) + Send + Sync>;

/// Host suspend/resume event source.
///
/// Owned by whatever integrates with the host and passed to schedulers at
/// construction. Periodic work subscribes to it so time spent suspended is
/// excluded from drift accounting.
#[derive(Clone, Default)]
pub struct HostLifecycle(MutArc<DynamicSubscriptions<Listener>>);

impl HostLifecycle {
  pub fn new() -> Self { Self::default() }

  pub fn subscribe(
    &self, listener: impl Fn(LifecycleEvent) + Send + Sync + 'static,
  ) -> impl Subscription + Send + Sync + 'static {
    let id = self.0.rc_deref_mut().add(Arc::new(listener));
    let listeners = self.0.clone();
    ClosureSubscription::new(move || {
      listeners.rc_deref_mut().remove(id);
    })
  }

  pub fn notify_suspending(&self) { self.notify(LifecycleEvent::Suspending) }

  pub fn notify_resuming(&self) { self.notify(LifecycleEvent::Resuming) }

  pub fn listener_count(&self) -> usize { self.0.rc_deref().len() }

  fn notify(&self, event: LifecycleEvent) {
    tracing::debug!(?event, "host lifecycle event");
    let listeners: Vec<Listener> = self.0.rc_deref().iter().cloned().collect();
    for listener in listeners {
      listener(event);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  #[rxcore_macro::test]
  fn listeners_receive_events_until_unsubscribed() {
    let lifecycle = HostLifecycle::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let sub = lifecycle.subscribe(move |e| c_seen.lock().unwrap().push(e));
    assert_eq!(lifecycle.listener_count(), 1);

    lifecycle.notify_suspending();
    lifecycle.notify_resuming();
    sub.unsubscribe();
    lifecycle.notify_suspending();

    assert_eq!(
      *seen.lock().unwrap(),
      vec![LifecycleEvent::Suspending, LifecycleEvent::Resuming]
    );
    assert_eq!(lifecycle.listener_count(), 0);
  }
}
