//! What a subject remembers for late subscribers.

use std::collections::VecDeque;

use crate::scheduler::{Duration, ImmediateScheduler, SchedulerRef};

/// Replay policy of a subject.
///
/// `record` runs for every value before it is broadcast; `snapshot` runs for
/// every new subscriber and yields the values it should see first, oldest
/// first. Both apply eviction before doing anything else.
pub trait ReplayBuffer<Item>: Send + 'static {
  fn record(&mut self, value: &Item);

  fn snapshot(&mut self) -> Vec<Item>;

  fn clear(&mut self);
}

/// Remembers nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBuffer;

impl<Item> ReplayBuffer<Item> for NoBuffer {
  fn record(&mut self, _: &Item) {}

  fn snapshot(&mut self) -> Vec<Item> { Vec::new() }

  fn clear(&mut self) {}
}

/// Remembers the most recent value, starting from a seed.
#[derive(Clone, Debug)]
pub struct LatestValue<Item>(Option<Item>);

impl<Item> LatestValue<Item> {
  pub fn new(seed: Item) -> Self { LatestValue(Some(seed)) }

  pub fn latest(&self) -> Option<&Item> { self.0.as_ref() }
}

impl<Item: Clone + Send + 'static> ReplayBuffer<Item> for LatestValue<Item> {
  fn record(&mut self, value: &Item) { self.0 = Some(value.clone()); }

  fn snapshot(&mut self) -> Vec<Item> { self.0.iter().cloned().collect() }

  fn clear(&mut self) { self.0 = None; }
}

/// Settings for a replay subject.
///
/// Without bounds the subject replays its whole history. The age bound is
/// measured on `scheduler`'s clock, the real clock by default.
#[derive(Clone, Debug, Default)]
pub struct ReplayConfig {
  max_count: Option<usize>,
  max_age: Option<Duration>,
  scheduler: Option<SchedulerRef>,
}

impl ReplayConfig {
  pub fn new() -> Self { Self::default() }

  /// Keep at most the last `count` values.
  pub fn max_count(mut self, count: usize) -> Self {
    self.max_count = Some(count);
    self
  }

  /// Drop values once they are `age` old.
  pub fn max_age(mut self, age: Duration) -> Self {
    self.max_age = Some(age);
    self
  }

  /// Clock used to timestamp values and age them.
  pub fn scheduler(mut self, scheduler: impl Into<SchedulerRef>) -> Self {
    self.scheduler = Some(scheduler.into());
    self
  }
}

/// Timestamped history bounded by count and/or age.
///
/// A subscriber sees exactly the values that are both among the last
/// `max_count` and younger than `max_age` at the moment it subscribes.
#[derive(Debug)]
pub struct ReplayWindow<Item> {
  entries: VecDeque<(Item, Duration)>,
  max_count: Option<usize>,
  max_age: Option<Duration>,
  clock: SchedulerRef,
}

impl<Item> ReplayWindow<Item> {
  pub fn new(config: ReplayConfig) -> Self {
    ReplayWindow {
      entries: VecDeque::new(),
      max_count: config.max_count,
      max_age: config.max_age,
      clock: config.scheduler.unwrap_or_else(|| ImmediateScheduler.into()),
    }
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  fn evict(&mut self) {
    if let Some(max) = self.max_count {
      while self.entries.len() > max {
        self.entries.pop_front();
      }
    }
    if let Some(age) = self.max_age {
      let now = self.clock.now();
      while self
        .entries
        .front()
        .is_some_and(|(_, at)| now.saturating_sub(*at) >= age)
      {
        self.entries.pop_front();
      }
    }
  }
}

impl<Item: Clone + Send + 'static> ReplayBuffer<Item> for ReplayWindow<Item> {
  fn record(&mut self, value: &Item) {
    let now = self.clock.now();
    self.entries.push_back((value.clone(), now));
    self.evict();
  }

  fn snapshot(&mut self) -> Vec<Item> {
    self.evict();
    self.entries.iter().map(|(value, _)| value.clone()).collect()
  }

  fn clear(&mut self) { self.entries.clear(); }
}
