use std::marker::PhantomData;

use crate::{
  observable::{from_iter, FromIter, Observable},
  observer::Observer,
};

/// Creates an observable that completes immediately.
pub fn empty<Item, Err>() -> FromIter<std::iter::Empty<Item>, Err> { from_iter(std::iter::empty()) }

/// Creates an observable that never emits anything.
pub fn never<Item, Err>() -> Never<Item, Err> { Never(PhantomData) }

/// Creates an observable that fails immediately with `err`.
pub fn throw_err<Item, Err>(err: Err) -> ThrowErr<Item, Err> { ThrowErr(err, PhantomData) }

pub struct Never<Item, Err>(PhantomData<fn() -> (Item, Err)>);

impl<Item, Err> Clone for Never<Item, Err> {
  fn clone(&self) -> Self { Never(PhantomData) }
}

impl<Item, Err> Observable for Never<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = ();

  fn actual_subscribe<O>(self, _: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
  }
}

#[derive(Clone)]
pub struct ThrowErr<Item, Err>(Err, PhantomData<fn() -> Item>);

impl<Item, Err> Observable for ThrowErr<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = ();

  fn actual_subscribe<O>(self, mut observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    observer.error(self.0);
  }
}
