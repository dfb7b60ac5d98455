//! Stream operators.
//!
//! Every operator follows the same shape: `actual_subscribe` wraps the
//! downstream observer in a [`Sink`](crate::sink::Sink), subscribes a small
//! stage observer to the source and assigns the upstream subscription to the
//! sink. Stage observers report `is_closed` through their sink so that
//! synchronous sources stop as soon as the chain is done.

pub mod catch_error;
pub mod delay;
pub mod element_at;
pub mod filter;
pub mod group_by;
pub mod map;
pub mod observe_on;
pub mod sample;
pub mod scan;
pub mod subscribe_on;
pub mod take;
pub mod timeout;
