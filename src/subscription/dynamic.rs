use smallvec::SmallVec;

/// Id-tagged storage for a changing set of children.
///
/// Backs [`CompositeSubscription`](super::CompositeSubscription) and the
/// observer list of every subject. Ids are handed out in increasing order and
/// never reused, so iteration order is insertion order and a stale id can
/// never remove a newer entry.
///
/// ```rust
/// use rxcore::subscription::DynamicSubscriptions;
///
/// let mut subs: DynamicSubscriptions<&str> = DynamicSubscriptions::default();
/// let first = subs.add("first");
/// let second = subs.add("second");
/// assert_eq!(subs.remove(first), Some("first"));
/// assert!(subs.contains(second));
/// assert_eq!(subs.len(), 1);
/// ```
pub struct DynamicSubscriptions<U> {
  next_id: usize,
  items: SmallVec<[(usize, U); 2]>,
}

impl<U> Default for DynamicSubscriptions<U> {
  fn default() -> Self { Self { next_id: 0, items: SmallVec::new() } }
}

impl<U> DynamicSubscriptions<U> {
  #[inline]
  pub fn new() -> Self { Self::default() }

  /// Add an item and return its id.
  #[inline]
  pub fn add(&mut self, item: U) -> usize {
    let id = self.reserve_id();
    self.items.push((id, item));
    id
  }

  /// Hand out the next id without storing anything yet.
  #[inline]
  pub fn reserve_id(&mut self) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    id
  }

  /// Store an item under an id from [`reserve_id`](Self::reserve_id).
  #[inline]
  pub fn insert(&mut self, id: usize, item: U) { self.items.push((id, item)); }

  pub fn remove(&mut self, id: usize) -> Option<U> {
    self
      .items
      .iter()
      .position(|(i, _)| *i == id)
      .map(|pos| self.items.remove(pos).1)
  }

  #[inline]
  pub fn contains(&self, id: usize) -> bool { self.items.iter().any(|(i, _)| *i == id) }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  /// Move every item out, leaving the container empty.
  pub fn take_all(&mut self) -> SmallVec<[(usize, U); 2]> { std::mem::take(&mut self.items) }

  /// Keep only the entries for which `keep` returns true.
  pub fn retain(&mut self, mut keep: impl FnMut(&U) -> bool) { self.items.retain(|(_, u)| keep(u)); }

  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = &U> { self.items.iter().map(|(_, item)| item) }

  #[inline]
  pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut U)> {
    self.items.iter_mut().map(|(id, item)| (*id, item))
  }
}
