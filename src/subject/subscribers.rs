use crate::{
  observer::{BoxedObserver, Observer},
  subscription::{CancellationFlag, DynamicSubscriptions},
};

pub(crate) struct Entry<Item, Err> {
  flag: CancellationFlag,
  observer: BoxedObserver<Item, Err>,
}

/// The live observers of a subject, in subscription order.
///
/// Every entry carries the cancellation flag of its subscription, so an
/// observer disposed halfway through a broadcast is skipped right away even
/// though its removal is only applied afterwards.
pub(crate) struct Subscribers<Item, Err> {
  inner: DynamicSubscriptions<Entry<Item, Err>>,
}

impl<Item, Err> Default for Subscribers<Item, Err> {
  fn default() -> Self { Self { inner: DynamicSubscriptions::default() } }
}

impl<Item, Err> Subscribers<Item, Err> {
  #[inline]
  pub fn insert(&mut self, id: usize, flag: CancellationFlag, observer: BoxedObserver<Item, Err>) {
    self.inner.insert(id, Entry { flag, observer });
  }

  #[inline]
  pub fn remove(&mut self, id: usize) -> bool { self.inner.remove(id).is_some() }

  #[inline]
  pub fn len(&self) -> usize { self.inner.len() }

  pub fn broadcast_value(&mut self, value: Item)
  where
    Item: Clone,
  {
    for (_, entry) in self.inner.iter_mut() {
      if !entry.flag.is_cancelled() {
        entry.observer.next(value.clone());
      }
    }
    self.prune();
  }

  /// Send `err` to every observer and empty the set.
  pub fn broadcast_error(&mut self, err: Err)
  where
    Err: Clone,
  {
    for (_, mut entry) in self.inner.take_all() {
      if entry.flag.cancel() {
        entry.observer.error(err.clone());
      }
    }
  }

  /// Complete every observer and empty the set.
  pub fn broadcast_complete(&mut self) {
    for (_, mut entry) in self.inner.take_all() {
      if entry.flag.cancel() {
        entry.observer.complete();
      }
    }
  }

  /// Drop every observer without notifying it.
  pub fn clear(&mut self) {
    for (_, entry) in self.inner.take_all() {
      entry.flag.cancel();
    }
  }

  /// Forget observers that were disposed or that closed themselves.
  fn prune(&mut self) {
    self
      .inner
      .retain(|entry| !entry.flag.is_cancelled() && !entry.observer.is_closed());
  }
}
