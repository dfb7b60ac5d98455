//! Error types shared by the runtime.
//!
//! Two kinds of failure flow through rxcore. Data-path failures travel as
//! `error` notifications inside a single subscription chain. Protocol
//! violations (assigning a single-assignment slot twice, talking to a disposed
//! subject) are raised synchronously to the caller as an [`RxError`].

use thiserror::Error;

/// Canonical result for fallible runtime calls.
pub type Result<T, E = RxError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RxError {
  /// The target resource was disposed before the call.
  #[error("cannot access a disposed object")]
  Disposed,

  #[error("invalid operation: {0}")]
  InvalidOperation(&'static str),

  /// Data or a second terminal notification after the stream terminated.
  #[error("the sequence has already terminated")]
  Terminated,

  #[error("sequence contains no elements")]
  NoElements,

  #[error("sequence contains more than one element")]
  MoreThanOneElement,

  #[error("index {0} is out of range for the sequence")]
  ArgumentOutOfRange(usize),

  #[error("the operation has timed out")]
  Timeout,
}

/// Panic payload raised after a container finished disposing its children and
/// one or more of them panicked during teardown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} teardown action(s) failed: {}", messages.len(), messages.join("; "))]
pub struct TeardownFailure {
  pub messages: Vec<String>,
}

impl TeardownFailure {
  /// Best-effort rendering of a panic payload.
  pub(crate) fn describe(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
      (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
      s.clone()
    } else if let Some(failure) = payload.downcast_ref::<TeardownFailure>() {
      failure.to_string()
    } else {
      "non-string panic payload".to_string()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcore_macro::test]
  fn display_messages() {
    assert_eq!(RxError::Disposed.to_string(), "cannot access a disposed object");
    assert_eq!(
      RxError::ArgumentOutOfRange(3).to_string(),
      "index 3 is out of range for the sequence"
    );
    let failure = TeardownFailure { messages: vec!["a".into(), "b".into()] };
    assert_eq!(failure.to_string(), "2 teardown action(s) failed: a; b");
  }

  #[rxcore_macro::test]
  fn describe_payloads() {
    let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
    assert_eq!(TeardownFailure::describe(payload.as_ref()), "boom");
    let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
    assert_eq!(TeardownFailure::describe(payload.as_ref()), "owned");
    let payload: Box<dyn std::any::Any + Send> = Box::new(42);
    assert_eq!(TeardownFailure::describe(payload.as_ref()), "non-string panic payload");
  }
}
