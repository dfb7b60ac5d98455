//! Observable blueprints and the extension methods every stream gets.
//!
//! An [`Observable`] is a stateless recipe: each `actual_subscribe` call builds
//! a fresh chain of sinks down to the true source and returns the
//! subscription that tears it down. Nothing runs until something subscribes.

use std::convert::Infallible;

use crate::{
  error::RxError,
  observer::{FnMutObserver, Observer, ObserverAll, ObserverErr},
  ops::{
    catch_error::CatchErrorOp,
    delay::DelayOp,
    element_at::{ElementAtOp, ElementRule},
    filter::{FilterOp, TryFilterOp},
    group_by::GroupByOp,
    map::{MapOp, TryMapOp},
    observe_on::ObserveOnOp,
    sample::SampleOp,
    scan::{ScanOp, TryScanOp},
    subscribe_on::SubscribeOnOp,
    take::TakeOp,
    timeout::TimeoutOp,
  },
  scheduler::{Duration, SchedulerRef},
  subscription::{Subscription, SubscriptionWrapper},
};

mod blocking;
mod boxed;
mod create;
mod from_iter;
mod from_iter_on;
mod interval;
mod trivial;

pub use blocking::BlockingIter;
pub use boxed::{BoxedObservable, DynObservable};
pub use create::{create, Create, Emitter};
pub use from_iter::{from_iter, of, FromIter};
pub use from_iter_on::{from_iter_on, FromIterOn};
pub use interval::{interval, timer, Interval, Timer};
pub use trivial::{empty, never, throw_err, Never, ThrowErr};

/// A push-based sequence blueprint.
pub trait Observable: Sized {
  type Item: Send + 'static;
  type Err: Send + 'static;
  type Unsub: Subscription + Send + Sync + 'static;

  /// Wire `observer` to this stream. The observer sees zero or more values
  /// followed by at most one terminal notification.
  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static;
}

/// Subscribe helpers and operators available on every [`Observable`].
pub trait ObservableExt: Observable {
  // ==================== Subscribing ====================

  /// Subscribe with a `next` closure. Only for streams that cannot fail.
  fn subscribe<N>(self, next: N) -> SubscriptionWrapper<Self::Unsub>
  where
    Self: Observable<Err = Infallible>,
    N: FnMut(Self::Item) + Send + 'static,
  {
    SubscriptionWrapper(self.actual_subscribe(FnMutObserver(next)))
  }

  fn subscribe_err<N, E>(self, next: N, error: E) -> SubscriptionWrapper<Self::Unsub>
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(Self::Err) + Send + 'static,
  {
    SubscriptionWrapper(self.actual_subscribe(ObserverErr { next, error }))
  }

  fn subscribe_all<N, E, C>(
    self, next: N, error: E, complete: C,
  ) -> SubscriptionWrapper<Self::Unsub>
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(Self::Err) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    SubscriptionWrapper(self.actual_subscribe(ObserverAll { next, error, complete }))
  }

  fn subscribe_with<O>(self, observer: O) -> SubscriptionWrapper<Self::Unsub>
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    SubscriptionWrapper(self.actual_subscribe(observer))
  }

  /// Pull-style bridge: a single-pass iterator whose `next` blocks until the
  /// stream produces a value or terminates. The stream is subscribed on the
  /// first `next` and disposed when the iterator is dropped.
  fn into_blocking_iter(self) -> BlockingIter<Self> { BlockingIter::new(self) }

  fn box_it(self) -> BoxedObservable<Self::Item, Self::Err>
  where
    Self: Send + 'static,
  {
    BoxedObservable::new(self)
  }

  // ==================== Transforming ====================

  /// Creates a new stream which calls a closure on each element and uses its
  /// return as the value.
  fn map<B, F>(self, func: F) -> MapOp<Self, F>
  where
    F: FnMut(Self::Item) -> B,
  {
    MapOp { source: self, func }
  }

  /// Like `map`, but an `Err` from the selector terminates the stream with
  /// that error.
  fn try_map<B, F>(self, func: F) -> TryMapOp<Self, F>
  where
    F: FnMut(Self::Item) -> Result<B, Self::Err>,
  {
    TryMapOp { source: self, func }
  }

  fn filter<F>(self, predicate: F) -> FilterOp<Self, F>
  where
    F: FnMut(&Self::Item) -> bool,
  {
    FilterOp { source: self, predicate }
  }

  fn try_filter<F>(self, predicate: F) -> TryFilterOp<Self, F>
  where
    F: FnMut(&Self::Item) -> Result<bool, Self::Err>,
  {
    TryFilterOp { source: self, predicate }
  }

  /// Emit every intermediate accumulation, starting from `seed`.
  fn scan<B, F>(self, seed: B, func: F) -> ScanOp<Self, F, B>
  where
    F: FnMut(B, Self::Item) -> B,
  {
    ScanOp { source: self, func, seed }
  }

  fn try_scan<B, F>(self, seed: B, func: F) -> TryScanOp<Self, F, B>
  where
    F: FnMut(B, Self::Item) -> Result<B, Self::Err>,
  {
    TryScanOp { source: self, func, seed }
  }

  /// Emit the first `count` values, then complete.
  fn take(self, count: usize) -> TakeOp<Self> { TakeOp { source: self, count } }

  /// The first value; fails with [`RxError::NoElements`] on an empty stream.
  fn first(self) -> ElementAtOp<Self>
  where
    Self::Err: From<RxError>,
  {
    ElementAtOp { source: self, rule: ElementRule::First }
  }

  /// The only value; fails with [`RxError::NoElements`] or
  /// [`RxError::MoreThanOneElement`].
  fn single(self) -> ElementAtOp<Self>
  where
    Self::Err: From<RxError>,
  {
    ElementAtOp { source: self, rule: ElementRule::Single }
  }

  /// The value at `index`; fails with [`RxError::ArgumentOutOfRange`] when
  /// the stream is shorter.
  fn element_at(self, index: usize) -> ElementAtOp<Self>
  where
    Self::Err: From<RxError>,
  {
    ElementAtOp { source: self, rule: ElementRule::At(index) }
  }

  // ==================== Time and placement ====================

  /// Shift every notification later by `delay`. Errors are not delayed.
  fn delay(self, delay: Duration, scheduler: impl Into<SchedulerRef>) -> DelayOp<Self> {
    DelayOp { source: self, delay, scheduler: scheduler.into() }
  }

  /// Emit the most recent value, if any arrived, once per `period`.
  fn sample(self, period: Duration, scheduler: impl Into<SchedulerRef>) -> SampleOp<Self> {
    SampleOp { source: self, period, scheduler: scheduler.into() }
  }

  /// Fail with [`RxError::Timeout`] when no notification arrives within
  /// `due` of subscribing or of the previous value.
  fn timeout(self, due: Duration, scheduler: impl Into<SchedulerRef>) -> TimeoutOp<Self>
  where
    Self::Err: From<RxError>,
  {
    TimeoutOp { source: self, due, scheduler: scheduler.into() }
  }

  /// Deliver every notification from `scheduler`, in order.
  fn observe_on(self, scheduler: impl Into<SchedulerRef>) -> ObserveOnOp<Self> {
    ObserveOnOp { source: self, scheduler: scheduler.into() }
  }

  /// Subscribe to the source from `scheduler`.
  fn subscribe_on(self, scheduler: impl Into<SchedulerRef>) -> SubscribeOnOp<Self> {
    SubscribeOnOp { source: self, scheduler: scheduler.into() }
  }

  // ==================== Recovery and grouping ====================

  /// On error, continue with the stream returned by `handler`.
  fn catch_error<S2, F>(self, handler: F) -> CatchErrorOp<Self, F>
  where
    F: FnOnce(Self::Err) -> S2,
    S2: Observable<Item = Self::Item>,
  {
    CatchErrorOp { source: self, handler }
  }

  /// Split the stream into one sub-stream per key. The source stays
  /// subscribed while the outer subscription or any subscribed group is
  /// alive.
  fn group_by<K, F>(self, key_selector: F) -> GroupByOp<Self, F>
  where
    F: FnMut(&Self::Item) -> K,
  {
    GroupByOp { source: self, key_selector }
  }
}

impl<T: Observable> ObservableExt for T {}
