use std::sync::mpsc::{channel, Receiver, Sender};

use crate::{
  observable::Observable,
  observer::{Notification, Observer},
  subscription::Subscription,
};

struct ChannelObserver<Item, Err>(Sender<Notification<Item, Err>>);

impl<Item, Err> Observer<Item, Err> for ChannelObserver<Item, Err> {
  fn next(&mut self, value: Item) { let _ = self.0.send(Notification::Next(value)); }

  fn error(&mut self, err: Err) { let _ = self.0.send(Notification::Error(err)); }

  fn complete(&mut self) { let _ = self.0.send(Notification::Complete); }
}

enum Phase<S: Observable> {
  Pending(S),
  Running { receiver: Receiver<Notification<S::Item, S::Err>>, subscription: S::Unsub },
  Done,
}

/// Blocking pull bridge over an observable.
///
/// Single pass and not restartable. Each `next` blocks the calling thread
/// until the stream delivers a value (`Some(Ok(v))`), fails
/// (`Some(Err(e))`, after which the iterator is exhausted) or completes
/// (`None`). The hand-off queue is unbounded, so a source that emits
/// synchronously on the consuming thread never deadlocks.
pub struct BlockingIter<S: Observable>(Phase<S>);

impl<S: Observable> BlockingIter<S> {
  pub(crate) fn new(source: S) -> Self { BlockingIter(Phase::Pending(source)) }

  fn finish(&mut self) {
    if let Phase::Running { subscription, .. } = std::mem::replace(&mut self.0, Phase::Done) {
      subscription.unsubscribe();
    }
  }
}

impl<S: Observable> Iterator for BlockingIter<S> {
  type Item = Result<S::Item, S::Err>;

  fn next(&mut self) -> Option<Self::Item> {
    if matches!(self.0, Phase::Pending(_)) {
      let Phase::Pending(source) = std::mem::replace(&mut self.0, Phase::Done) else {
        return None;
      };
      let (sender, receiver) = channel();
      let subscription = source.actual_subscribe(ChannelObserver(sender));
      self.0 = Phase::Running { receiver, subscription };
    }

    let received = match &self.0 {
      Phase::Running { receiver, .. } => receiver.recv(),
      _ => return None,
    };
    match received {
      Ok(Notification::Next(value)) => Some(Ok(value)),
      Ok(Notification::Error(err)) => {
        self.finish();
        Some(Err(err))
      }
      // A dropped sender without a terminal means the producer went away.
      Ok(Notification::Complete) | Err(_) => {
        self.finish();
        None
      }
    }
  }
}

impl<S: Observable> Drop for BlockingIter<S> {
  fn drop(&mut self) { self.finish(); }
}
