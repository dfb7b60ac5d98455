//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of data in the reactive pattern.
//! It provides three methods: next (for values), error (for errors), and
//! complete (for stream completion).
//!
//! An observer sees zero or more `next` calls followed by at most one terminal
//! call (`error` or `complete`, never both) and nothing after that. Sources
//! and sinks uphold this; observers may rely on it.

use std::convert::Infallible;

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: The consumer of data in reactive programming
///
/// All methods take `&mut self` so observers can live behind a
/// `Box<dyn Observer>`. An `Option<O>` is itself an observer that drops `O`
/// on the terminal call; sinks hold their downstream that way.
pub trait Observer<Item, Err> {
  /// Receive the next value from the observable
  fn next(&mut self, value: Item);

  /// Handle an error from the observable. Terminal.
  fn error(&mut self, err: Err);

  /// Handle completion of the observable. Terminal.
  fn complete(&mut self);

  /// Checks if the observer is closed.
  ///
  /// Synchronous sources poll this between values to stop early once the
  /// downstream has been disposed or has terminated.
  fn is_closed(&self) -> bool { false }
}

impl<Item, Err, O> Observer<Item, Err> for Box<O>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }

  #[inline]
  fn error(&mut self, err: Err) { (**self).error(err) }

  #[inline]
  fn complete(&mut self) { (**self).complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

/// Option observer - None ignores all events, Some delegates to inner
impl<O, Item, Err> Observer<Item, Err> for Option<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(inner) = self {
      inner.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if let Some(mut inner) = self.take() {
      inner.error(err);
    }
  }

  fn complete(&mut self) {
    if let Some(mut inner) = self.take() {
      inner.complete();
    }
  }

  fn is_closed(&self) -> bool { self.as_ref().is_none_or(Observer::is_closed) }
}

/// Boxed observer that may cross threads.
pub type BoxedObserver<Item, Err> = Box<dyn Observer<Item, Err> + Send>;

// ============================================================================
// Notification
// ============================================================================

/// A reified observer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification<Item, Err> {
  Next(Item),
  Error(Err),
  Complete,
}

impl<Item, Err> Notification<Item, Err> {
  /// Replay this notification onto `observer`.
  pub fn accept<O: Observer<Item, Err> + ?Sized>(self, observer: &mut O) {
    match self {
      Notification::Next(v) => observer.next(v),
      Notification::Error(e) => observer.error(e),
      Notification::Complete => observer.complete(),
    }
  }

  pub fn is_terminal(&self) -> bool { !matches!(self, Notification::Next(_)) }
}

// ============================================================================
// Closure adapters
// ============================================================================

/// `next`-only closure observer. Only usable on streams that cannot fail.
#[derive(Clone)]
pub struct FnMutObserver<F>(pub F);

impl<F, Item> Observer<Item, Infallible> for FnMutObserver<F>
where
  F: FnMut(Item),
{
  #[inline]
  fn next(&mut self, v: Item) { (self.0)(v); }

  fn error(&mut self, err: Infallible) { match err {} }

  fn complete(&mut self) {}
}

/// Closure observer handling values and errors.
#[derive(Clone)]
pub struct ObserverErr<N, E> {
  pub next: N,
  pub error: E,
}

impl<Item, Err, N, E> Observer<Item, Err> for ObserverErr<N, E>
where
  N: FnMut(Item),
  E: FnMut(Err),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  #[inline]
  fn error(&mut self, err: Err) { (self.error)(err) }

  fn complete(&mut self) {}
}

/// Closure observer handling every notification.
#[derive(Clone)]
pub struct ObserverAll<N, E, C> {
  pub next: N,
  pub error: E,
  pub complete: C,
}

impl<Item, Err, N, E, C> Observer<Item, Err> for ObserverAll<N, E, C>
where
  N: FnMut(Item),
  E: FnMut(Err),
  C: FnMut(),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  #[inline]
  fn error(&mut self, err: Err) { (self.error)(err) }

  #[inline]
  fn complete(&mut self) { (self.complete)() }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use super::*;

  struct TestObserver {
    values: Vec<i32>,
    done: bool,
  }

  impl Observer<i32, ()> for TestObserver {
    fn next(&mut self, value: i32) { self.values.push(value); }

    fn error(&mut self, _: ()) { self.done = true; }

    fn complete(&mut self) { self.done = true; }

    fn is_closed(&self) -> bool { self.done }
  }

  #[rxcore_macro::test]
  fn test_observer_trait() {
    let mut obs = TestObserver { values: vec![], done: false };
    obs.next(1);
    obs.next(2);
    assert_eq!(obs.values, vec![1, 2]);
    assert!(!obs.is_closed());
    obs.complete();
    assert!(obs.is_closed());
  }

  #[rxcore_macro::test]
  fn test_closure_as_observer() {
    let mut count = 0;
    let mut closure_obs = FnMutObserver(|v: i32| {
      count += v;
    });

    closure_obs.next(10);
    closure_obs.next(20);
    assert_eq!(count, 30);
  }

  #[rxcore_macro::test]
  fn option_observer_takes_itself_on_terminal() {
    let mut obs = Some(TestObserver { values: vec![], done: false });
    obs.next(1);
    obs.complete();
    assert!(obs.is_none());
    assert!(Observer::<i32, ()>::is_closed(&obs));
    // Dropped silently after the terminal call.
    obs.next(2);
  }

  #[rxcore_macro::test]
  fn notification_accept() {
    let mut obs = TestObserver { values: vec![], done: false };
    let boxed: &mut dyn Observer<i32, ()> = &mut obs;
    Notification::Next(7).accept(boxed);
    Notification::<i32, ()>::Complete.accept(boxed);
    assert_eq!(obs.values, vec![7]);
    assert!(obs.done);
    assert!(Notification::<i32, ()>::Error(()).is_terminal());
    assert!(!Notification::<i32, ()>::Next(1).is_terminal());
  }
}
