//! Subjects: an [`Observer`] and an [`Observable`] at once.
//!
//! Whatever is pushed into a subject is broadcast synchronously to every live
//! subscriber, in subscription order, before the pushing call returns. The
//! subject holds its lock for the whole broadcast, so concurrent producers
//! are serialized and every subscriber sees the same order.
//!
//! ```text
//!   Active ──error/complete──▶ Terminated
//!     │                            │
//!     └─────────dispose────────────┴──▶ Disposed
//! ```
//!
//! The buffer policy decides what late subscribers receive first:
//! [`Subject`] replays nothing, [`BehaviorSubject`] the latest value,
//! [`ReplaySubject`] a window bounded by count and/or age.
//!
//! Pushing into a subject from one of its own subscriber callbacks is
//! rejected. Subscribing, unsubscribing and disposing from a callback are
//! fine; they take effect once the current broadcast finishes.

use std::{
  sync::{
    atomic::{AtomicU8, AtomicUsize, Ordering},
    Arc, Weak,
  },
  thread::{self, ThreadId},
};

use crate::{
  error::{Result, RxError},
  observable::Observable,
  observer::{BoxedObserver, Observer},
  rc::MutArc,
  subscription::CancellationFlag,
};

mod buffer;
mod subject_subscription;
mod subscribers;

pub use buffer::{LatestValue, NoBuffer, ReplayBuffer, ReplayConfig, ReplayWindow};
pub use subject_subscription::SubjectSubscription;
use subject_subscription::Unregister;
use subscribers::Subscribers;

/// Multicasts live notifications only.
pub type Subject<Item, Err> = SubjectCore<Item, Err, NoBuffer>;

/// Replays its latest value, starting from a seed.
pub type BehaviorSubject<Item, Err> = SubjectCore<Item, Err, LatestValue<Item>>;

/// Replays a window of past values.
pub type ReplaySubject<Item, Err> = SubjectCore<Item, Err, ReplayWindow<Item>>;

const ACTIVE: u8 = 0;
const TERMINATED: u8 = 1;
const DISPOSED: u8 = 2;

enum Lifecycle<Err> {
  Active,
  Terminated(Option<Err>),
  Disposed,
}

struct State<Item, Err> {
  lifecycle: Lifecycle<Err>,
  subscribers: Subscribers<Item, Err>,
}

/// Operations requested from inside a broadcast, applied when it ends.
enum Deferred<Item, Err> {
  Subscribe { id: usize, flag: CancellationFlag, observer: BoxedObserver<Item, Err> },
  Unsubscribe(usize),
  Dispose,
}

struct Shared<Item, Err, B> {
  state: MutArc<State<Item, Err>>,
  buffer: MutArc<B>,
  // Mirror of `state.lifecycle`, readable without the state lock.
  tag: AtomicU8,
  live: AtomicUsize,
  next_id: AtomicUsize,
  dispatcher: MutArc<Option<ThreadId>>,
  deferred: MutArc<Vec<Deferred<Item, Err>>>,
}

/// Clears the dispatching-thread marker, also on unwind.
struct DispatchGuard<'a>(&'a MutArc<Option<ThreadId>>);

impl Drop for DispatchGuard<'_> {
  fn drop(&mut self) { *self.0.rc_deref_mut() = None; }
}

impl<Item, Err, B> Shared<Item, Err, B>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
  B: ReplayBuffer<Item>,
{
  fn is_dispatching(&self) -> bool { *self.dispatcher.rc_deref() == Some(thread::current().id()) }

  /// Run `f` under the state lock with this thread marked as the
  /// dispatcher, then apply whatever callbacks deferred meanwhile.
  fn dispatch<R>(&self, f: impl FnOnce(&mut State<Item, Err>) -> R) -> R {
    let mut state = self.state.rc_deref_mut();
    *self.dispatcher.rc_deref_mut() = Some(thread::current().id());
    let _guard = DispatchGuard(&self.dispatcher);
    let result = f(&mut state);
    self.apply_deferred(&mut state);
    self.live.store(state.subscribers.len(), Ordering::Release);
    result
  }

  fn apply_deferred(&self, state: &mut State<Item, Err>) {
    loop {
      let pending = std::mem::take(&mut *self.deferred.rc_deref_mut());
      if pending.is_empty() {
        return;
      }
      for op in pending {
        match op {
          Deferred::Subscribe { id, flag, observer } => {
            if !flag.is_cancelled() && self.attach(state, id, flag, observer).is_err() {
              tracing::warn!("subject disposed before a deferred subscribe was applied");
            }
          }
          Deferred::Unsubscribe(id) => {
            state.subscribers.remove(id);
          }
          Deferred::Dispose => self.dispose_locked(state),
        }
      }
    }
  }

  /// Replay the buffer to a new observer, then either add it to the live set
  /// or hand it the stored terminal notification.
  fn attach(
    &self, state: &mut State<Item, Err>, id: usize, flag: CancellationFlag,
    mut observer: BoxedObserver<Item, Err>,
  ) -> Result<()> {
    if matches!(state.lifecycle, Lifecycle::Disposed) {
      flag.cancel();
      return Err(RxError::Disposed);
    }
    let replay = self.buffer.rc_deref_mut().snapshot();
    for value in replay {
      if flag.is_cancelled() {
        return Ok(());
      }
      observer.next(value);
    }
    match &state.lifecycle {
      Lifecycle::Active => {
        if !flag.is_cancelled() {
          state.subscribers.insert(id, flag, observer);
        }
      }
      Lifecycle::Terminated(err) => {
        if flag.cancel() {
          match err {
            Some(err) => observer.error(err.clone()),
            None => observer.complete(),
          }
        }
      }
      Lifecycle::Disposed => {}
    }
    Ok(())
  }

  fn check_active(state: &State<Item, Err>) -> Result<()> {
    match state.lifecycle {
      Lifecycle::Active => Ok(()),
      Lifecycle::Terminated(_) => Err(RxError::Terminated),
      Lifecycle::Disposed => Err(RxError::Disposed),
    }
  }

  fn reject_reentrant(&self) -> Result<()> {
    if self.is_dispatching() {
      tracing::error!("subject received a notification from one of its own subscribers");
      return Err(RxError::InvalidOperation("re-entrant emission from a subscriber callback"));
    }
    Ok(())
  }

  fn terminate(&self, err: Option<Err>) -> Result<()> {
    self.reject_reentrant()?;
    self.dispatch(|state| {
      Self::check_active(state)?;
      state.lifecycle = Lifecycle::Terminated(err.clone());
      self.tag.store(TERMINATED, Ordering::Release);
      tracing::debug!(failed = err.is_some(), "subject terminated");
      match err {
        Some(err) => state.subscribers.broadcast_error(err),
        None => state.subscribers.broadcast_complete(),
      }
      Ok(())
    })
  }

  fn dispose_locked(&self, state: &mut State<Item, Err>) {
    if matches!(state.lifecycle, Lifecycle::Disposed) {
      return;
    }
    state.lifecycle = Lifecycle::Disposed;
    self.tag.store(DISPOSED, Ordering::Release);
    state.subscribers.clear();
    self.buffer.rc_deref_mut().clear();
    tracing::debug!("subject disposed");
  }
}

impl<Item, Err, B> Unregister for Shared<Item, Err, B>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
  B: ReplayBuffer<Item>,
{
  fn unregister(&self, id: usize) {
    if self.is_dispatching() {
      self.deferred.rc_deref_mut().push(Deferred::Unsubscribe(id));
    } else {
      self.dispatch(|state| {
        state.subscribers.remove(id);
      });
    }
  }
}

// ============================================================================
// SubjectCore
// ============================================================================

/// A subject with buffer policy `B`. Clones share the same subject.
///
/// Use the [`Subject`], [`BehaviorSubject`] and [`ReplaySubject`] aliases.
pub struct SubjectCore<Item, Err, B>(Arc<Shared<Item, Err, B>>);

impl<Item, Err, B> Clone for SubjectCore<Item, Err, B> {
  fn clone(&self) -> Self { SubjectCore(self.0.clone()) }
}

impl<Item, Err, B> SubjectCore<Item, Err, B>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
  B: ReplayBuffer<Item>,
{
  fn with_buffer(buffer: B) -> Self {
    SubjectCore(Arc::new(Shared {
      state: MutArc::own(State { lifecycle: Lifecycle::Active, subscribers: Subscribers::default() }),
      buffer: MutArc::own(buffer),
      tag: AtomicU8::new(ACTIVE),
      live: AtomicUsize::new(0),
      next_id: AtomicUsize::new(0),
      dispatcher: MutArc::own(None),
      deferred: MutArc::own(Vec::new()),
    }))
  }

  /// Record `value` in the buffer and broadcast it.
  ///
  /// Fails with [`RxError::Terminated`] after a terminal notification, with
  /// [`RxError::Disposed`] after disposal and with
  /// [`RxError::InvalidOperation`] when called from inside this subject's own
  /// broadcast.
  pub fn try_next(&self, value: Item) -> Result<()> {
    self.0.reject_reentrant()?;
    self.0.dispatch(|state| {
      Shared::<Item, Err, B>::check_active(state)?;
      self.0.buffer.rc_deref_mut().record(&value);
      state.subscribers.broadcast_value(value);
      Ok(())
    })
  }

  /// Store `err` as the terminal notification and broadcast it.
  pub fn try_error(&self, err: Err) -> Result<()> { self.0.terminate(Some(err)) }

  pub fn try_complete(&self) -> Result<()> { self.0.terminate(None) }

  /// Subscribe `observer`, replaying the buffer to it first.
  ///
  /// On a terminated subject the observer gets the replay and the terminal
  /// notification, and the returned subscription is already closed. Fails
  /// with [`RxError::Disposed`] on a disposed subject.
  pub fn try_subscribe<O>(&self, observer: O) -> Result<SubjectSubscription>
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    if self.is_disposed() {
      return Err(RxError::Disposed);
    }
    let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
    let flag = CancellationFlag::new();
    let weak = Arc::downgrade(&self.0);
    let shared: Weak<dyn Unregister> = weak;
    let subscription = SubjectSubscription::new(id, flag.clone(), shared);
    let observer: BoxedObserver<Item, Err> = Box::new(observer);

    if self.0.is_dispatching() {
      self.0.deferred.rc_deref_mut().push(Deferred::Subscribe { id, flag, observer });
    } else {
      self.0.dispatch(|state| self.0.attach(state, id, flag, observer))?;
    }
    Ok(subscription)
  }

  /// Drop every subscriber without notifying it and clear the buffer. Every
  /// later call fails with [`RxError::Disposed`]. Idempotent.
  pub fn dispose(&self) {
    if self.0.is_dispatching() {
      self.0.tag.store(DISPOSED, Ordering::Release);
      self.0.deferred.rc_deref_mut().push(Deferred::Dispose);
    } else {
      self.0.dispatch(|state| self.0.dispose_locked(state));
    }
  }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.0.tag.load(Ordering::Acquire) == DISPOSED }

  #[inline]
  pub fn has_terminated(&self) -> bool { self.0.tag.load(Ordering::Acquire) == TERMINATED }

  /// Live subscribers after the last completed broadcast.
  #[inline]
  pub fn subscriber_count(&self) -> usize { self.0.live.load(Ordering::Acquire) }
}

impl<Item, Err> Default for Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn default() -> Self { Self::with_buffer(NoBuffer) }
}

impl<Item, Err> Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new() -> Self { Self::default() }
}

impl<Item, Err> BehaviorSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new(seed: Item) -> Self { Self::with_buffer(LatestValue::new(seed)) }

  /// The latest value, or the seed if nothing was pushed yet.
  pub fn value(&self) -> Result<Item> {
    let buffer = self.0.buffer.rc_deref();
    buffer.latest().cloned().ok_or(RxError::Disposed)
  }
}

impl<Item, Err> ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new(config: ReplayConfig) -> Self { Self::with_buffer(ReplayWindow::new(config)) }
}

// ==================== Observer / Observable ====================

impl<Item, Err, B> Observer<Item, Err> for SubjectCore<Item, Err, B>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
  B: ReplayBuffer<Item>,
{
  /// # Panics
  ///
  /// When [`try_next`](SubjectCore::try_next) fails.
  fn next(&mut self, value: Item) {
    if let Err(err) = self.try_next(value) {
      panic!("subject rejected a value: {err}");
    }
  }

  fn error(&mut self, err: Err) {
    if let Err(err) = self.try_error(err) {
      panic!("subject rejected an error: {err}");
    }
  }

  fn complete(&mut self) {
    if let Err(err) = self.try_complete() {
      panic!("subject rejected completion: {err}");
    }
  }

  fn is_closed(&self) -> bool { self.0.tag.load(Ordering::Acquire) != ACTIVE }
}

impl<Item, Err, B> Observable for SubjectCore<Item, Err, B>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
  B: ReplayBuffer<Item>,
{
  type Item = Item;
  type Err = Err;
  type Unsub = SubjectSubscription;

  /// # Panics
  ///
  /// When the subject was disposed.
  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    match self.try_subscribe(observer) {
      Ok(subscription) => subscription,
      Err(err) => panic!("cannot subscribe: {err}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
    thread,
  };

  use crate::{
    observer::{Notification, ObserverAll},
    prelude::*,
  };

  type Log = Arc<Mutex<Vec<Notification<i32, &'static str>>>>;

  fn log_observer(log: &Log) -> impl Observer<i32, &'static str> + Send + 'static {
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    ObserverAll {
      next: move |v: i32| l1.lock().unwrap().push(Notification::Next(v)),
      error: move |e: &'static str| l2.lock().unwrap().push(Notification::Error(e)),
      complete: move || l3.lock().unwrap().push(Notification::Complete),
    }
  }

  fn record<S>(subject: &S, log: &Log) -> SubjectSubscription
  where
    S: Observable<Item = i32, Err = &'static str, Unsub = SubjectSubscription> + Clone,
  {
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    subject
      .clone()
      .subscribe_all(
        move |v| l1.lock().unwrap().push(Notification::Next(v)),
        move |e| l2.lock().unwrap().push(Notification::Error(e)),
        move || l3.lock().unwrap().push(Notification::Complete),
      )
      .into_inner()
  }

  #[rxcore_macro::test]
  fn multicast_to_live_subscribers() {
    let subject = Subject::<i32, &'static str>::new();
    let (a, b) = (Log::default(), Log::default());
    record(&subject, &a);
    subject.try_next(1).unwrap();
    record(&subject, &b);
    subject.try_next(2).unwrap();
    subject.try_complete().unwrap();

    use Notification::*;
    assert_eq!(*a.lock().unwrap(), vec![Next(1), Next(2), Complete]);
    assert_eq!(*b.lock().unwrap(), vec![Next(2), Complete]);
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[rxcore_macro::test]
  fn terminated_subject_rejects_and_replays_terminal() {
    let subject = Subject::<i32, &'static str>::new();
    subject.try_error("boom").unwrap();
    assert_eq!(subject.try_next(1), Err(RxError::Terminated));
    assert_eq!(subject.try_complete(), Err(RxError::Terminated));
    assert!(subject.has_terminated());

    let late = Log::default();
    let sub = record(&subject, &late);
    assert_eq!(*late.lock().unwrap(), vec![Notification::Error("boom")]);
    assert!(sub.is_closed());
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[rxcore_macro::test]
  fn disposed_subject_fails_everything() {
    let subject = Subject::<i32, &'static str>::new();
    let log = Log::default();
    record(&subject, &log);
    subject.dispose();
    subject.dispose();
    assert!(subject.is_disposed());
    assert_eq!(subject.subscriber_count(), 0);
    assert_eq!(subject.try_next(1), Err(RxError::Disposed));
    assert_eq!(subject.try_error("x"), Err(RxError::Disposed));
    assert_eq!(subject.try_subscribe(log_observer(&log)).err(), Some(RxError::Disposed));
    assert!(log.lock().unwrap().is_empty());
  }

  #[rxcore_macro::test]
  #[should_panic(expected = "cannot subscribe")]
  fn subscribing_to_a_disposed_subject_panics() {
    let subject = Subject::<i32, Infallible>::new();
    subject.dispose();
    subject.subscribe(|_| {});
  }

  #[rxcore_macro::test]
  fn unsubscribe_stops_delivery() {
    let subject = Subject::<i32, &'static str>::new();
    let log = Log::default();
    let sub = record(&subject, &log);
    subject.try_next(1).unwrap();
    sub.unsubscribe();
    sub.unsubscribe();
    subject.try_next(2).unwrap();
    assert_eq!(*log.lock().unwrap(), vec![Notification::Next(1)]);
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[rxcore_macro::test]
  fn reentrant_emission_is_rejected() {
    let subject = Subject::<i32, Infallible>::new();
    let c_subject = subject.clone();
    let rejected = Arc::new(Mutex::new(None));
    let c_rejected = rejected.clone();
    subject.clone().subscribe(move |v| {
      if v == 1 {
        *c_rejected.lock().unwrap() = Some(c_subject.try_next(2));
      }
    });
    subject.try_next(1).unwrap();
    assert!(matches!(*rejected.lock().unwrap(), Some(Err(RxError::InvalidOperation(_)))));
  }

  #[rxcore_macro::test]
  fn subscribe_and_unsubscribe_from_a_callback_are_deferred() {
    let subject = Subject::<i32, Infallible>::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let subs = Arc::new(Mutex::new(vec![]));

    let (c_subject, c_seen, c_subs) = (subject.clone(), seen.clone(), subs.clone());
    subject.clone().subscribe(move |v| {
      if v == 1 {
        let c_seen = c_seen.clone();
        let sub = c_subject.clone().subscribe(move |v| c_seen.lock().unwrap().push(v));
        c_subs.lock().unwrap().push(sub.into_inner());
      }
      if v == 3 {
        c_subs.lock().unwrap()[0].unsubscribe();
      }
    });

    subject.try_next(1).unwrap();
    assert_eq!(subject.subscriber_count(), 2);
    subject.try_next(2).unwrap();
    subject.try_next(3).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![2]);
    assert_eq!(subject.subscriber_count(), 1);
  }

  #[rxcore_macro::test]
  fn dispose_from_a_callback() {
    let subject = Subject::<i32, Infallible>::new();
    let c_subject = subject.clone();
    subject.clone().subscribe(move |_| c_subject.dispose());
    subject.try_next(1).unwrap();
    assert!(subject.is_disposed());
    assert_eq!(subject.subscriber_count(), 0);
    assert_eq!(subject.try_next(2), Err(RxError::Disposed));
  }

  #[rxcore_macro::test]
  fn concurrent_producers_are_serialized() {
    let subject = Subject::<usize, Infallible>::new();
    let total = Arc::new(Mutex::new(0));
    let busy = Arc::new(Mutex::new(false));
    let (c_total, c_busy) = (total.clone(), busy.clone());
    subject.clone().subscribe(move |v| {
      assert!(!std::mem::replace(&mut *c_busy.lock().unwrap(), true));
      *c_total.lock().unwrap() += v;
      *c_busy.lock().unwrap() = false;
    });
    let handles: Vec<_> = (0..4)
      .map(|_| {
        let subject = subject.clone();
        thread::spawn(move || (0..100).for_each(|v| subject.try_next(v).unwrap()))
      })
      .collect();
    handles.into_iter().for_each(|h| h.join().unwrap());
    assert_eq!(*total.lock().unwrap(), 4 * (0..100).sum::<usize>());
  }

  // ==================== Behavior ====================

  #[rxcore_macro::test]
  fn behavior_replays_seed_then_latest() {
    let subject = BehaviorSubject::<i32, &'static str>::new(0);
    let early = Log::default();
    record(&subject, &early);
    assert_eq!(subject.value(), Ok(0));
    subject.try_next(5).unwrap();
    assert_eq!(subject.value(), Ok(5));

    let late = Log::default();
    record(&subject, &late);
    use Notification::*;
    assert_eq!(*early.lock().unwrap(), vec![Next(0), Next(5)]);
    assert_eq!(*late.lock().unwrap(), vec![Next(5)]);

    subject.dispose();
    assert_eq!(subject.value(), Err(RxError::Disposed));
  }

  // ==================== Replay ====================

  #[rxcore_macro::test]
  fn replay_count_window() {
    let subject = ReplaySubject::<i32, &'static str>::new(ReplayConfig::new().max_count(2));
    (1..=3).for_each(|v| subject.try_next(v).unwrap());
    let a = Log::default();
    record(&subject, &a);
    subject.try_next(4).unwrap();
    use Notification::*;
    assert_eq!(*a.lock().unwrap(), vec![Next(2), Next(3), Next(4)]);
  }

  #[rxcore_macro::test]
  fn replay_after_termination() {
    let subject = ReplaySubject::<i32, &'static str>::new(ReplayConfig::new());
    subject.try_next(1).unwrap();
    subject.try_next(2).unwrap();
    subject.try_complete().unwrap();
    let late = Log::default();
    record(&subject, &late);
    use Notification::*;
    assert_eq!(*late.lock().unwrap(), vec![Next(1), Next(2), Complete]);
  }

  #[rxcore_macro::test]
  fn time_only_window_can_go_quiet() {
    // The subject never terminated; the late subscriber simply sees nothing
    // because every value aged out.
    let clock = VirtualTimeScheduler::new();
    let subject = ReplaySubject::<i32, &'static str>::new(
      ReplayConfig::new().max_age(Duration::from_millis(10)).scheduler(clock.clone()),
    );
    subject.try_next(1).unwrap();
    clock.advance_by(Duration::from_millis(100));
    let late = Log::default();
    record(&subject, &late);
    assert!(late.lock().unwrap().is_empty());
    assert!(!subject.has_terminated());
  }

  #[rxcore_macro::test]
  fn dispose_after_completion_reports_disposed() {
    let subject = ReplaySubject::<i32, &'static str>::new(ReplayConfig::new().max_count(4));
    subject.try_next(1).unwrap();
    subject.try_complete().unwrap();
    assert_eq!(subject.try_next(2), Err(RxError::Terminated));

    subject.dispose();
    assert_eq!(subject.try_next(2), Err(RxError::Disposed));
    assert_eq!(subject.try_complete(), Err(RxError::Disposed));
    let late = Log::default();
    assert_eq!(subject.try_subscribe(log_observer(&late)).err(), Some(RxError::Disposed));
    assert!(late.lock().unwrap().is_empty());

    let behavior = BehaviorSubject::<i32, &'static str>::new(7);
    behavior.try_complete().unwrap();
    behavior.dispose();
    assert_eq!(behavior.value(), Err(RxError::Disposed));
    assert_eq!(behavior.try_error("late"), Err(RxError::Disposed));
    assert_eq!(behavior.try_subscribe(log_observer(&late)).err(), Some(RxError::Disposed));
    assert!(late.lock().unwrap().is_empty());
  }
}
