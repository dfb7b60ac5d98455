use std::sync::Weak;

use crate::subscription::{CancellationFlag, Subscription};

/// Removes one observer from whatever holds it.
pub(crate) trait Unregister: Send + Sync {
  fn unregister(&self, id: usize);
}

/// Subscription handle returned by a subject.
///
/// Disposing it stops delivery to its observer at once. The observer leaves
/// the subject's live set immediately, or right after the current broadcast
/// when disposed from inside a subscriber callback. The handle holds the
/// subject weakly.
pub struct SubjectSubscription {
  id: usize,
  flag: CancellationFlag,
  subject: Weak<dyn Unregister>,
}

impl SubjectSubscription {
  pub(crate) fn new(id: usize, flag: CancellationFlag, subject: Weak<dyn Unregister>) -> Self {
    SubjectSubscription { id, flag, subject }
  }
}

impl Subscription for SubjectSubscription {
  fn unsubscribe(&self) {
    if self.flag.cancel() {
      if let Some(subject) = self.subject.upgrade() {
        subject.unregister(self.id);
      }
    }
  }

  fn is_closed(&self) -> bool { self.flag.is_cancelled() }
}

impl std::fmt::Debug for SubjectSubscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SubjectSubscription")
      .field("id", &self.id)
      .field("closed", &self.is_closed())
      .finish()
  }
}
