//! The owner side of the compositor.
//!
//! The compositor never holds item payloads. Items that are not backed by an
//! external list live in an internal store owned by whoever drives the
//! compositor, and the compositor tells that store what to do through the
//! [`InternalStore`] hooks. Offsets passed to the hooks are positions in the
//! internal store, i.e. counts of internal items in absolute order.

use rustc_hash::FxHashMap;

use crate::compositor::range::{ListId, ListItem};
use crate::error::StoreError;

/// Storage hooks implemented by the owner of a [`Compositor`](crate::Compositor).
pub trait InternalStore {
    /// Payload of one internal item.
    type Item;

    /// A range referencing `list` was spliced in.
    fn range_created(&mut self, _list: ListId) {}

    /// A range referencing `list` was spliced out.
    fn range_destroyed(&mut self, _list: ListId) {}

    /// Store `item` so that it ends up at `offset`.
    ///
    /// An error aborts the calling operation before anything else changes.
    fn insert_internal_data(&mut self, offset: usize, item: Self::Item) -> Result<(), StoreError>;

    /// Overwrite the item at `offset`.
    fn replace_internal_data(&mut self, offset: usize, item: Self::Item);

    /// Drop `count` items starting at `offset`.
    fn remove_internal_data(&mut self, offset: usize, count: usize);

    /// Take `count` items at `from` out and reinsert them so that they start
    /// at `to` in the resulting store.
    fn move_internal_data(&mut self, from: usize, to: usize, count: usize);

    /// The internal item at `offset` is being merged into `target` and will
    /// stand for the group from now on. It is relocated with
    /// [`move_internal_data`](Self::move_internal_data) afterwards.
    fn merge_internal_data(&mut self, _offset: usize, _target: ListItem) {}

    /// The list item `source` is being merged into `target`. Return `true`
    /// after storing an item representing the group at `offset`; `false`
    /// refuses the merge.
    fn merge_list_data(&mut self, _offset: usize, _target: ListItem, _source: ListItem) -> bool {
        false
    }
}

/// An [`InternalStore`] backed by a `Vec`.
///
/// Also counts the ranges referencing each external list, so an owner can
/// tell when a list is no longer part of the view.
#[derive(Clone, Debug)]
pub struct VecStore<T> {
    items: Vec<T>,
    list_refs: FxHashMap<ListId, usize>,
    capacity: Option<usize>,
}

impl<T> VecStore<T> {
    pub fn new() -> Self {
        VecStore {
            items: Vec::new(),
            list_refs: FxHashMap::default(),
            capacity: None,
        }
    }

    /// A store that refuses inserts once it holds `capacity` items.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        VecStore {
            items: Vec::with_capacity(capacity),
            list_refs: FxHashMap::default(),
            capacity: Some(capacity),
        }
    }

    /// A store seeded with items already present before any range exists.
    pub fn from_items(items: Vec<T>) -> Self {
        VecStore {
            items,
            list_refs: FxHashMap::default(),
            capacity: None,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, offset: usize) -> Option<&T> {
        self.items.get(offset)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of live ranges referencing `list`.
    pub fn list_refs(&self, list: ListId) -> usize {
        self.list_refs.get(&list).copied().unwrap_or(0)
    }

    /// Lists with at least one live range.
    pub fn referenced_lists(&self) -> impl Iterator<Item = ListId> + '_ {
        self.list_refs.keys().copied()
    }
}

impl<T> Default for VecStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InternalStore for VecStore<T> {
    type Item = T;

    fn range_created(&mut self, list: ListId) {
        *self.list_refs.entry(list).or_insert(0) += 1;
    }

    fn range_destroyed(&mut self, list: ListId) {
        if let Some(refs) = self.list_refs.get_mut(&list) {
            *refs -= 1;
            if *refs == 0 {
                self.list_refs.remove(&list);
            }
        }
    }

    fn insert_internal_data(&mut self, offset: usize, item: T) -> Result<(), StoreError> {
        if let Some(capacity) = self.capacity {
            if self.items.len() >= capacity {
                return Err(StoreError::Full { capacity });
            }
        }
        self.items.insert(offset, item);
        Ok(())
    }

    fn replace_internal_data(&mut self, offset: usize, item: T) {
        self.items[offset] = item;
    }

    fn remove_internal_data(&mut self, offset: usize, count: usize) {
        self.items.drain(offset..offset + count);
    }

    fn move_internal_data(&mut self, from: usize, to: usize, count: usize) {
        move_block(&mut self.items, from, to, count);
    }
}

/// Move `count` elements at `from` so that they start at `to` afterwards.
pub(crate) fn move_block<T>(items: &mut Vec<T>, from: usize, to: usize, count: usize) {
    if from == to || count == 0 {
        return;
    }
    let block: Vec<T> = items.drain(from..from + count).collect();
    let tail = items.split_off(to);
    items.extend(block);
    items.extend(tail);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_block_forward_and_back() {
        let mut v: Vec<u32> = (0..6).collect();
        move_block(&mut v, 1, 3, 2);
        assert_eq!(v, vec![0, 3, 4, 1, 2, 5]);
        move_block(&mut v, 3, 1, 2);
        assert_eq!(v, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn capacity_limit_rejects_insert() {
        let mut store = VecStore::with_capacity_limit(1);
        assert!(store.insert_internal_data(0, 'a').is_ok());
        assert_eq!(
            store.insert_internal_data(1, 'b'),
            Err(StoreError::Full { capacity: 1 })
        );
        assert_eq!(store.items(), &['a']);
    }

    #[test]
    fn list_refs_are_counted() {
        let mut store: VecStore<()> = VecStore::new();
        store.range_created(ListId(7));
        store.range_created(ListId(7));
        store.range_destroyed(ListId(7));
        assert_eq!(store.list_refs(ListId(7)), 1);
        store.range_destroyed(ListId(7));
        assert_eq!(store.list_refs(ListId(7)), 0);
        assert_eq!(store.referenced_lists().count(), 0);
    }
}
