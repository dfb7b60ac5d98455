//! # rxcore: a push-based reactive runtime
//!
//! The core of a Reactive Extensions implementation: disposable resources,
//! schedulers, the producer/sink subscription protocol and the subject
//! family, plus the handful of sources and operators built on them.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::convert::Infallible;
//!
//! use rxcore::prelude::*;
//!
//! from_iter::<_, Infallible>(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(|v| println!("Value: {}", v));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | Blueprint of a stream; subscribing builds a chain of sinks |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` events |
//! | [`Subscription`] | Idempotent handle that tears a subscription down |
//! | [`SchedulerRef`] | Where and when work runs, plus a clock |
//! | [`Subject`] | Observer and observable at once, multicasting to subscribers |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): [`PoolScheduler`] on a futures thread
//!   pool
//! - **`tokio-scheduler`**: `TokioScheduler` with native periodic timers
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subscription`]: subscription::Subscription
//! [`SchedulerRef`]: scheduler::SchedulerRef
//! [`Subject`]: subject::Subject
//! [`PoolScheduler`]: scheduler::PoolScheduler

pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod sink;
pub mod subject;
pub mod subscription;

pub use prelude::*;
