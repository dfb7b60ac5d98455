use crate::{
  error::RxError,
  observable::Observable,
  observer::Observer,
  sink::{Sink, SinkSubscription},
};

/// Which value an [`ElementAtOp`] picks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementRule {
  First,
  Single,
  At(usize),
}

#[derive(Clone)]
pub struct ElementAtOp<S> {
  pub(crate) source: S,
  pub(crate) rule: ElementRule,
}

impl<S> Observable for ElementAtOp<S>
where
  S: Observable,
  S::Err: From<RxError>,
{
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = SinkSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let (sink, subscription) = Sink::new(observer);
    let upstream = self.source.actual_subscribe(ElementAtObserver {
      sink,
      rule: self.rule,
      seen: 0,
      held: None,
    });
    subscription.assign_upstream(upstream);
    subscription
  }
}

pub struct ElementAtObserver<O, Item, Err> {
  sink: Sink<O, Item, Err>,
  rule: ElementRule,
  seen: usize,
  held: Option<Item>,
}

impl<O, Item, Err> Observer<Item, Err> for ElementAtObserver<O, Item, Err>
where
  O: Observer<Item, Err>,
  Err: From<RxError>,
{
  fn next(&mut self, value: Item) {
    let index = self.seen;
    self.seen += 1;
    match self.rule {
      ElementRule::First => {
        self.sink.forward_next(value);
        self.sink.forward_complete();
      }
      ElementRule::At(at) if at == index => {
        self.sink.forward_next(value);
        self.sink.forward_complete();
      }
      ElementRule::At(_) => {}
      ElementRule::Single if self.held.is_some() => {
        self.held = None;
        self.sink.forward_error(RxError::MoreThanOneElement.into());
      }
      ElementRule::Single => self.held = Some(value),
    }
  }

  fn error(&mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(&mut self) {
    match (self.rule, self.held.take()) {
      (ElementRule::Single, Some(value)) => {
        self.sink.forward_next(value);
        self.sink.forward_complete();
      }
      (ElementRule::At(index), _) => {
        self.sink.forward_error(RxError::ArgumentOutOfRange(index).into())
      }
      _ => self.sink.forward_error(RxError::NoElements.into()),
    }
  }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}
