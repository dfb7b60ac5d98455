//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Errors
pub use crate::error::{Result as RxResult, RxError, TeardownFailure};
// Core traits and sources
pub use crate::observable::{
  create, empty, from_iter, from_iter_on, interval, never, of, throw_err, timer, BlockingIter,
  BoxedObservable, Create, DynObservable, Emitter, FromIter, FromIterOn, Interval, Never,
  Observable, ObservableExt, ThrowErr, Timer,
};
// Observer trait
pub use crate::observer::{BoxedObserver, Notification, Observer};
// Operators
pub use crate::ops::{element_at::ElementRule, group_by::GroupedObservable};
// Schedulers
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::{PoolScheduler, PoolSchedulerBuilder};
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::scheduler::{
  Duration, HostLifecycle, ImmediateScheduler, LifecycleEvent, Scheduler, SchedulerRef, Task,
  TaskHandle, TaskState, VirtualTimeScheduler,
};
// Sinks
pub use crate::sink::{Serializer, Sink, SinkSubscription};
// Subject
pub use crate::subject::*;
// Subscription
pub use crate::subscription::*;
