use std::{collections::HashMap, hash::Hash};

use crate::{
  observable::Observable,
  observer::Observer,
  sink::Sink,
  subject::{Subject, SubjectSubscription},
  subscription::{RefCountHandle, RefCountSubscription, Subscription},
};

#[derive(Clone)]
pub struct GroupByOp<S, F> {
  pub(crate) source: S,
  pub(crate) key_selector: F,
}

impl<S, F, K> Observable for GroupByOp<S, F>
where
  S: Observable,
  S::Item: Clone,
  S::Err: Clone,
  F: FnMut(&S::Item) -> K + Send + 'static,
  K: Hash + Eq + Clone + Send + 'static,
{
  type Item = GroupedObservable<K, S::Item, S::Err>;
  type Err = S::Err;
  /// The source stays subscribed until this and every subscribed group are
  /// disposed.
  type Unsub = RefCountSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Self::Item, S::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let refs = RefCountSubscription::new(subscription.clone());
    let upstream = self.source.actual_subscribe(GroupByObserver {
      sink,
      key_selector: self.key_selector,
      groups: HashMap::new(),
      refs: refs.clone(),
    });
    subscription.assign_upstream(upstream);
    refs
  }
}

pub struct GroupByObserver<O, F, K, Item, Err> {
  sink: Sink<O, GroupedObservable<K, Item, Err>, Err>,
  key_selector: F,
  groups: HashMap<K, Subject<Item, Err>>,
  refs: RefCountSubscription,
}

impl<O, F, K, Item, Err> Observer<Item, Err> for GroupByObserver<O, F, K, Item, Err>
where
  O: Observer<GroupedObservable<K, Item, Err>, Err>,
  F: FnMut(&Item) -> K,
  K: Hash + Eq + Clone,
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) {
    let key = (self.key_selector)(&value);
    let group = match self.groups.get(&key) {
      Some(group) => group.clone(),
      None => {
        let group = Subject::new();
        self.groups.insert(key.clone(), group.clone());
        // After the outer subscriber left, new groups still route values
        // to nobody but are not announced.
        if !self.refs.is_primary_disposed() {
          tracing::trace!("opening a new group");
          self.sink.forward_next(GroupedObservable {
            key,
            subject: group.clone(),
            refs: self.refs.clone(),
          });
        }
        group
      }
    };
    if let Err(err) = group.try_next(value) {
      tracing::warn!(%err, "group rejected a value");
    }
  }

  fn error(&mut self, err: Err) {
    for (_, group) in self.groups.drain() {
      if let Err(reason) = group.try_error(err.clone()) {
        tracing::warn!(err = %reason, "group rejected the source error");
      }
    }
    self.sink.forward_error(err);
  }

  fn complete(&mut self) {
    for (_, group) in self.groups.drain() {
      if let Err(err) = group.try_complete() {
        tracing::warn!(%err, "group rejected completion");
      }
    }
    self.sink.forward_complete();
  }

  fn is_closed(&self) -> bool { self.sink.is_closed() && self.refs.is_closed() }
}

/// The values of one key.
///
/// A group is hot: it only sees values that arrive after it is subscribed.
/// Subscribing keeps the shared source subscription alive until the group's
/// subscription is disposed as well.
#[derive(Clone)]
pub struct GroupedObservable<K, Item, Err> {
  key: K,
  subject: Subject<Item, Err>,
  refs: RefCountSubscription,
}

impl<K, Item, Err> GroupedObservable<K, Item, Err> {
  pub fn key(&self) -> &K { &self.key }
}

impl<K, Item, Err> Observable for GroupedObservable<K, Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = (SubjectSubscription, RefCountHandle);

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let handle = self.refs.acquire();
    (self.subject.actual_subscribe(observer), handle)
  }
}
