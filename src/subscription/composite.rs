use super::{unsubscribe_all, BoxedSubscription, DynamicSubscriptions, Subscription};
use crate::rc::MutArc;

#[derive(Default)]
struct CompositeState {
  disposed: bool,
  children: DynamicSubscriptions<BoxedSubscription>,
}

/// A dynamic group of subscriptions disposed together.
///
/// Children added after the group was disposed are disposed immediately. A
/// panicking child does not stop the remaining children from being disposed;
/// the panics are collected and re-raised once as a
/// [`TeardownFailure`](crate::error::TeardownFailure).
#[derive(Clone, Default)]
pub struct CompositeSubscription(MutArc<CompositeState>);

impl CompositeSubscription {
  pub fn new() -> Self { Self::default() }

  /// Add a child and return the id for [`remove`](Self::remove).
  pub fn add(&self, subscription: impl Subscription + Send + Sync + 'static) -> usize {
    let subscription = BoxedSubscription::new(subscription);
    let mut state = self.0.rc_deref_mut();
    if state.disposed {
      let id = state.children.reserve_id();
      drop(state);
      subscription.unsubscribe();
      return id;
    }
    state.children.retain(|c| !c.is_closed());
    state.children.add(subscription)
  }

  /// Remove a child and dispose it. Returns false for an unknown id.
  pub fn remove(&self, id: usize) -> bool {
    let child = self.0.rc_deref_mut().children.remove(id);
    match child {
      Some(child) => {
        child.unsubscribe();
        true
      }
      None => false,
    }
  }

  pub fn len(&self) -> usize { self.0.rc_deref().children.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Subscription for CompositeSubscription {
  fn unsubscribe(&self) {
    let children = {
      let mut state = self.0.rc_deref_mut();
      state.disposed = true;
      state.children.take_all()
    };
    unsubscribe_all(children.into_iter().map(|(_, child)| child));
  }

  fn is_closed(&self) -> bool { self.0.rc_deref().disposed }
}

#[cfg(test)]
mod tests {
  use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
      atomic::{AtomicUsize, Ordering},
      Arc, Barrier,
    },
    thread,
  };

  use super::*;
  use crate::{
    error::TeardownFailure,
    subscription::{CancellationFlag, ClosureSubscription},
  };

  #[rxcore_macro::test]
  fn remove_disposes_only_that_child() {
    let group = CompositeSubscription::new();
    let a = CancellationFlag::new();
    let b = CancellationFlag::new();
    let id_a = group.add(a.clone());
    group.add(b.clone());
    assert!(group.remove(id_a));
    assert!(!group.remove(id_a));
    assert!(a.is_cancelled());
    assert!(!b.is_cancelled());
    assert_eq!(group.len(), 1);
  }

  #[rxcore_macro::test]
  fn add_after_dispose_disposes_immediately() {
    let group = CompositeSubscription::new();
    group.unsubscribe();
    let late = CancellationFlag::new();
    group.add(late.clone());
    assert!(late.is_cancelled());
    assert!(group.is_empty());
  }

  #[rxcore_macro::test]
  fn concurrent_dispose_releases_each_child_once() {
    let group = CompositeSubscription::new();
    let hits = Arc::new(AtomicUsize::new(0));
    for _ in 0..16 {
      let hits = hits.clone();
      group.add(ClosureSubscription::new(move || {
        hits.fetch_add(1, Ordering::SeqCst);
      }));
    }
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
      .map(|_| {
        let group = group.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
          barrier.wait();
          group.unsubscribe();
        })
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 16);
    assert!(group.is_closed());
  }

  #[rxcore_macro::test]
  fn failing_children_are_aggregated() {
    let group = CompositeSubscription::new();
    let survivor = CancellationFlag::new();
    group.add(ClosureSubscription::new(|| panic!("first")));
    group.add(survivor.clone());
    group.add(ClosureSubscription::new(|| panic!("second")));

    let payload = catch_unwind(AssertUnwindSafe(|| group.unsubscribe())).unwrap_err();
    assert!(survivor.is_cancelled());
    let failure = payload.downcast_ref::<TeardownFailure>().unwrap();
    assert_eq!(failure.messages, vec!["first", "second"]);
  }
}
