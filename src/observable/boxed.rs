use crate::{
  observable::Observable,
  observer::{BoxedObserver, Observer},
  subscription::BoxedSubscription,
};

/// Object-safe face of [`Observable`].
pub trait DynObservable<Item, Err>: Send {
  fn box_subscribe(self: Box<Self>, observer: BoxedObserver<Item, Err>) -> BoxedSubscription;
}

impl<T> DynObservable<T::Item, T::Err> for T
where
  T: Observable + Send,
{
  fn box_subscribe(self: Box<Self>, observer: BoxedObserver<T::Item, T::Err>) -> BoxedSubscription {
    BoxedSubscription::new((*self).actual_subscribe(observer))
  }
}

/// A type-erased observable, for storing streams of different shapes behind
/// one type.
pub struct BoxedObservable<Item, Err>(Box<dyn DynObservable<Item, Err>>);

impl<Item, Err> BoxedObservable<Item, Err> {
  pub fn new(source: impl DynObservable<Item, Err> + 'static) -> Self {
    BoxedObservable(Box::new(source))
  }
}

impl<Item, Err> Observable for BoxedObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = BoxedSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    self.0.box_subscribe(Box::new(observer))
  }
}
