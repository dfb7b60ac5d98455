//! The subscription protocol every stream stage follows.
//!
//! On subscribe a stage builds a [`Sink`] around the downstream observer,
//! subscribes itself to its upstream and hands the resulting upstream
//! subscription to the sink's latch. The latch is an atomic state tag:
//!
//! ```text
//!            forward_error / forward_complete
//!   Active ───────────────────────────────────▶ Terminal
//!      │
//!      └──────── SinkSubscription::unsubscribe ─▶ Disposed
//! ```
//!
//! Whichever transition wins the compare-and-exchange disposes the upstream
//! and any tracked resources, so that happens at most once. Once the latch
//! left `Active` the sink drops its downstream observer and every later
//! notification lands nowhere, without taking a lock on the hot path.
//!
//! Stages reached from more than one call path (a scheduler callback and the
//! upstream, for instance) put their sink behind a [`Serializer`].

use std::{
  collections::VecDeque,
  marker::PhantomData,
  sync::{
    atomic::{AtomicU8, AtomicUsize, Ordering},
    Arc,
  },
};

use once_cell::sync::OnceCell;

use crate::{
  observer::{Notification, Observer},
  rc::MutArc,
  subscription::{CompositeSubscription, SingleAssignmentSubscription, Subscription},
};

const ACTIVE: u8 = 0;
const TERMINAL: u8 = 1;
const DISPOSED: u8 = 2;

struct Latch {
  state: AtomicU8,
  upstream: SingleAssignmentSubscription,
  resources: OnceCell<CompositeSubscription>,
}

impl Latch {
  #[inline]
  fn is_active(&self) -> bool { self.state.load(Ordering::Acquire) == ACTIVE }

  fn transition(&self, to: u8) -> bool {
    self
      .state
      .compare_exchange(ACTIVE, to, Ordering::SeqCst, Ordering::SeqCst)
      .is_ok()
  }

  fn release(&self) {
    self.upstream.unsubscribe();
    if let Some(resources) = self.resources.get() {
      resources.unsubscribe();
    }
  }
}

// ============================================================================
// SinkSubscription
// ============================================================================

/// The subscription a stage returns downstream.
#[derive(Clone)]
pub struct SinkSubscription(Arc<Latch>);

impl SinkSubscription {
  /// Hand over the upstream subscription. If the sink was disposed while the
  /// upstream was still subscribing, the upstream is disposed right away.
  pub fn assign_upstream(&self, upstream: impl Subscription + Send + Sync + 'static) {
    let assigned = self.0.upstream.assign(upstream);
    debug_assert!(assigned.is_ok(), "a sink's upstream is assigned once");
  }

  /// Tie an extra resource (a timer, an inner subscription) to the sink's
  /// lifetime. Disposed immediately when the sink is already done.
  pub fn track(&self, resource: impl Subscription + Send + Sync + 'static) {
    let resources = self.0.resources.get_or_init(CompositeSubscription::new);
    resources.add(resource);
    if !self.0.is_active() {
      resources.unsubscribe();
    }
  }
}

impl Subscription for SinkSubscription {
  fn unsubscribe(&self) {
    if self.0.transition(DISPOSED) {
      self.0.release();
    }
  }

  fn is_closed(&self) -> bool { !self.0.is_active() }
}

// ============================================================================
// Sink
// ============================================================================

/// Per-subscription state shared by every operator: the downstream observer
/// and the latch guarding its upstream.
pub struct Sink<O, Item, Err> {
  downstream: Option<O>,
  latch: Arc<Latch>,
  _hint: PhantomData<fn(Item, Err)>,
}

impl<O, Item, Err> Sink<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  pub fn new(downstream: O) -> (Self, SinkSubscription) {
    let latch = Arc::new(Latch {
      state: AtomicU8::new(ACTIVE),
      upstream: SingleAssignmentSubscription::new(),
      resources: OnceCell::new(),
    });
    let sink = Sink { downstream: Some(downstream), latch: latch.clone(), _hint: PhantomData };
    (sink, SinkSubscription(latch))
  }

  pub fn subscription(&self) -> SinkSubscription { SinkSubscription(self.latch.clone()) }

  #[inline]
  pub fn track(&self, resource: impl Subscription + Send + Sync + 'static) {
    self.subscription().track(resource)
  }

  /// Dispose the sink from inside the stage, without a terminal notification.
  pub fn dispose(&mut self) {
    self.downstream = None;
    if self.latch.transition(DISPOSED) {
      self.latch.release();
    }
  }

  #[inline]
  pub fn is_active(&self) -> bool { self.latch.is_active() }

  /// Current downstream while the sink is active.
  fn live(&mut self) -> Option<&mut O> {
    if !self.latch.is_active() {
      if self.downstream.take().is_some() {
        tracing::trace!("sink disposed, dropping its downstream observer");
      }
      return None;
    }
    self.downstream.as_mut()
  }

  pub fn forward_next(&mut self, value: Item) {
    if let Some(downstream) = self.live() {
      downstream.next(value);
    }
  }

  pub fn forward_error(&mut self, err: Err) {
    if self.latch.transition(TERMINAL) {
      if let Some(mut downstream) = self.downstream.take() {
        downstream.error(err);
      }
      self.latch.release();
    } else {
      self.downstream = None;
    }
  }

  pub fn forward_complete(&mut self) {
    if self.latch.transition(TERMINAL) {
      if let Some(mut downstream) = self.downstream.take() {
        downstream.complete();
      }
      self.latch.release();
    } else {
      self.downstream = None;
    }
  }

  pub fn forward(&mut self, notification: Notification<Item, Err>) {
    match notification {
      Notification::Next(v) => self.forward_next(v),
      Notification::Error(e) => self.forward_error(e),
      Notification::Complete => self.forward_complete(),
    }
  }

  pub fn is_closed(&self) -> bool {
    !self.latch.is_active() || self.downstream.as_ref().is_none_or(|d| d.is_closed())
  }
}

// ============================================================================
// Serializer
// ============================================================================

/// Delivery gate for sinks reached from several call paths.
///
/// Callers enqueue notifications; whichever caller moves the work counter
/// away from zero drains the queue, one notification at a time, while the
/// others return immediately. The queue lock is only held to push or pop, and
/// the sink lock is only ever taken by the current drainer, so no contended
/// lock is held across a downstream call and notifications keep their
/// enqueue order.
pub struct Serializer<O, Item, Err> {
  queue: MutArc<VecDeque<Notification<Item, Err>>>,
  wip: AtomicUsize,
  sink: MutArc<Sink<O, Item, Err>>,
  subscription: SinkSubscription,
}

impl<O, Item, Err> Serializer<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  pub fn new(sink: Sink<O, Item, Err>) -> Arc<Self> {
    let subscription = sink.subscription();
    Arc::new(Serializer {
      queue: MutArc::own(VecDeque::new()),
      wip: AtomicUsize::new(0),
      sink: MutArc::own(sink),
      subscription,
    })
  }

  pub fn push(&self, notification: Notification<Item, Err>) {
    self.push_with(|| Some(notification))
  }

  /// Enqueue whatever `produce` yields. `produce` runs under the queue lock,
  /// so reading shared state and enqueueing the result is one step relative
  /// to every other push.
  pub fn push_with(&self, produce: impl FnOnce() -> Option<Notification<Item, Err>>) {
    if self.subscription.is_closed() {
      return;
    }
    {
      let mut queue = self.queue.rc_deref_mut();
      match produce() {
        Some(notification) => queue.push_back(notification),
        None => return,
      }
    }
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    loop {
      let next = self.queue.rc_deref_mut().pop_front();
      if let Some(notification) = next {
        self.sink.rc_deref_mut().forward(notification);
      }
      if self.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
        break;
      }
    }
  }

  #[inline]
  pub fn next(&self, value: Item) { self.push(Notification::Next(value)) }

  #[inline]
  pub fn error(&self, err: Err) { self.push(Notification::Error(err)) }

  #[inline]
  pub fn complete(&self) { self.push(Notification::Complete) }

  pub fn track(&self, resource: impl Subscription + Send + Sync + 'static) {
    self.subscription.track(resource)
  }

  pub fn subscription(&self) -> &SinkSubscription { &self.subscription }

  #[inline]
  pub fn is_closed(&self) -> bool { self.subscription.is_closed() }
}
