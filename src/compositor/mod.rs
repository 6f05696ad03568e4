//! The list compositor.
//!
//! A [`Compositor`] presents several independently mutable lists, plus items
//! held by an internal store, as one contiguous sequence with stable absolute
//! indices. It is a piece table: the sequence is an ordered array of
//! [`Range`] records, each pointing either at a window of an external list or
//! at a run of internal items.
//!
//! Two kinds of callers drive it:
//!
//! - the owner, editing the merged sequence itself through the structural
//!   operations in `edit` (insert, remove, move, merge, replace);
//! - backing lists reporting their own edits through the translator entry
//!   points in `translate`, which remap a list's local index space into
//!   absolute [`ChangeRecord`](crate::ChangeRecord)s.
//!
//! Both paths mutate the same range array and call back into the owner's
//! [`InternalStore`].
//!
//! # Invariants
//!
//! After every public operation:
//! 1. the visible counts of all ranges sum to `count()`;
//! 2. the counts of all non-null internal ranges sum to `internal_count()`;
//! 3. no range is both null and internal with items;
//! 4. null ranges hold no items and every other range holds at least one.

mod edit;
mod integrity;
pub mod range;
mod translate;

use range::{ListItem, Range};

use crate::store::InternalStore;

/// What an absolute position resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// An item of an external list.
    List(ListItem),
    /// An item at this offset of the internal store.
    Internal(usize),
}

/// Result of [`Compositor::at`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    /// Position of the covering range in [`Compositor::ranges`].
    pub position: usize,
    /// Copy of the covering range.
    pub range: Range,
    /// Offset of the item within the range.
    pub offset: usize,
    /// Internal items strictly before the item. For an internal item this is
    /// its offset in the internal store.
    pub internal_index: usize,
}

impl Location {
    /// Index of the item within its list, for list items.
    pub fn list_index(&self) -> Option<usize> {
        if self.range.is_internal() {
            return None;
        }
        Some(self.range.index + self.offset)
    }

    pub fn slot(&self) -> Slot {
        match self.range.list {
            Some(list) if !self.range.is_internal() => Slot::List(ListItem {
                list,
                index: self.range.index + self.offset,
            }),
            _ => Slot::Internal(self.internal_index),
        }
    }
}

/// Merges external lists and internal items into one indexed sequence.
#[derive(Clone, Debug)]
pub struct Compositor<S> {
    ranges: Vec<Range>,
    absolute_count: usize,
    internal_count: usize,
    store: S,
}

impl<S: InternalStore> Compositor<S> {
    /// An empty compositor driving `store`.
    pub fn new(store: S) -> Self {
        Compositor {
            ranges: Vec::new(),
            absolute_count: 0,
            internal_count: 0,
            store,
        }
    }

    /// A compositor whose store already holds `count` internal items.
    ///
    /// The items are covered by a single internal range at the start of the
    /// sequence, so every absolute index below `count` resolves.
    pub fn with_internal_items(store: S, count: usize) -> Self {
        let mut compositor = Self::new(store);
        if count > 0 {
            compositor.ranges.push(Range::internal(count));
            compositor.absolute_count = count;
            compositor.internal_count = count;
        }
        compositor
    }

    /// Length of the merged sequence.
    #[inline]
    pub fn count(&self) -> usize {
        self.absolute_count
    }

    /// Number of items held by the internal store.
    #[inline]
    pub fn internal_count(&self) -> usize {
        self.internal_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.absolute_count == 0
    }

    /// The ranges, in sequence order, including null anchors.
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // --- Reading ---

    /// Locate the item at `index`, or `None` if no range covers it.
    pub fn get(&self, index: usize) -> Option<Location> {
        let mut absolute = 0;
        let mut internal = 0;
        for (position, range) in self.ranges.iter().enumerate() {
            if range.is_null() {
                continue;
            }
            if index < absolute + range.count {
                let offset = index - absolute;
                if range.is_internal() {
                    internal += offset;
                }
                return Some(Location {
                    position,
                    range: *range,
                    offset,
                    internal_index: internal,
                });
            }
            absolute += range.count;
            if range.is_internal() {
                internal += range.count;
            }
        }
        None
    }

    /// Locate the item at `index`.
    ///
    /// # Panics
    ///
    /// If `index >= count()`, or if no range covers `index`, which means the
    /// range store is corrupt.
    pub fn at(&self, index: usize) -> Location {
        assert!(
            index < self.absolute_count,
            "index {} out of bounds (count {})",
            index,
            self.absolute_count
        );
        match self.get(index) {
            Some(location) => location,
            None => panic!(
                "no range covers index {} of {}: range store is inconsistent",
                index, self.absolute_count
            ),
        }
    }

    /// What the item at `index` is.
    pub fn slot(&self, index: usize) -> Slot {
        self.at(index).slot()
    }

    /// Every item of the merged sequence, in order.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        let mut internal = 0;
        self.ranges
            .iter()
            .filter(|range| !range.is_null())
            .flat_map(move |range| {
                let base = internal;
                if range.is_internal() {
                    internal += range.count;
                }
                let range = *range;
                (0..range.count).map(move |offset| match range.list {
                    Some(list) if !range.is_internal() => Slot::List(ListItem {
                        list,
                        index: range.index + offset,
                    }),
                    _ => Slot::Internal(base + offset),
                })
            })
    }

    /// Absolute index of the internal item at `internal_index`.
    pub fn absolute_index_of(&self, internal_index: usize) -> Option<usize> {
        let mut absolute = 0;
        let mut internal = 0;
        for range in &self.ranges {
            if range.is_null() {
                continue;
            }
            if range.is_internal() {
                if internal_index < internal + range.count {
                    return Some(absolute + internal_index - internal);
                }
                internal += range.count;
            }
            absolute += range.count;
        }
        None
    }

    /// Absolute index of item `index` of `list`, considering only ranges
    /// that start at or after `from`.
    pub fn absolute_index_of_list(&self, list: range::ListId, index: usize, from: usize) -> Option<usize> {
        let mut absolute = 0;
        for range in &self.ranges {
            if range.is_null() {
                continue;
            }
            if absolute >= from && range.is_window_of(list) && range.index <= index && index < range.end() {
                return Some(absolute + index - range.index);
            }
            absolute += range.count;
        }
        None
    }

    // --- Range store primitives ---

    /// Splice `range` in before `position`. Returns the position of the
    /// element that was previously at `position`.
    fn insert_range(&mut self, position: usize, range: Range) -> usize {
        if let Some(list) = range.referenced_list() {
            self.store.range_created(list);
        }
        self.ranges.insert(position, range);
        position + 1
    }

    /// Remove the range at `position`. Returns the position of the next one.
    fn erase_range(&mut self, position: usize) -> usize {
        let range = self.ranges.remove(position);
        if let Some(list) = range.referenced_list() {
            self.store.range_destroyed(list);
        }
        position
    }

    /// Split the range at `position` after `offset` items. Returns the
    /// position of the right piece.
    fn split_range(&mut self, position: usize, offset: usize) -> usize {
        let (left, right) = self.ranges[position].split(offset);
        self.ranges[position] = right;
        self.insert_range(position, left)
    }

    /// Make `index` a range boundary. Returns the position of the first range
    /// starting at or after `index`, past any null anchors on that boundary,
    /// together with the number of internal items before `index`.
    fn split_at(&mut self, index: usize) -> (usize, usize) {
        let mut position = 0;
        let mut absolute = 0;
        let mut internal = 0;
        while position < self.ranges.len() {
            let range = self.ranges[position];
            let visible = range.visible();
            if absolute + visible > index {
                break;
            }
            absolute += visible;
            if range.is_internal() {
                internal += visible;
            }
            position += 1;
        }
        if absolute < index {
            assert!(
                position < self.ranges.len(),
                "index {} past the end of the range store",
                index
            );
            let offset = index - absolute;
            if self.ranges[position].is_internal() {
                internal += offset;
            }
            position = self.split_range(position, offset);
        }
        (position, internal)
    }

    /// Number of internal items before absolute `index`.
    fn internal_before(&self, index: usize) -> usize {
        let mut absolute = 0;
        let mut internal = 0;
        for range in &self.ranges {
            if absolute >= index {
                break;
            }
            let visible = range.visible();
            if range.is_internal() {
                internal += visible.min(index - absolute);
            }
            absolute += visible;
        }
        internal
    }

    /// Absolute start of the range at `position`.
    fn absolute_start(&self, position: usize) -> usize {
        self.ranges[..position].iter().map(Range::visible).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::range::{ListId, RangeFlags};
    use super::*;
    use crate::store::VecStore;

    const A: ListId = ListId(1);
    const B: ListId = ListId(2);

    fn compositor() -> Compositor<VecStore<char>> {
        Compositor::new(VecStore::new())
    }

    #[test]
    fn empty() {
        let c = compositor();
        assert_eq!(c.count(), 0);
        assert!(c.is_empty());
        assert!(c.get(0).is_none());
        assert_eq!(c.slots().count(), 0);
    }

    #[test]
    fn at_skips_null_anchors() {
        let mut c = compositor();
        c.append_list(A, 0, 0, true);
        c.append_list(B, 0, 2, false);
        assert!(c.ranges()[0].is_null());

        let location = c.at(0);
        assert_eq!(location.position, 1);
        assert_eq!(location.slot(), Slot::List(ListItem { list: B, index: 0 }));
    }

    #[test]
    fn internal_index_counts_preceding_internal_items() {
        let mut c = compositor();
        c.append_data('x').unwrap();
        c.append_list(A, 0, 2, false);
        c.append_data('y').unwrap();
        c.append_data('z').unwrap();

        let location = c.at(4);
        assert!(location.range.is_internal());
        assert_eq!(location.internal_index, 2);
        assert_eq!(location.list_index(), None);
        assert_eq!(c.at(2).internal_index, 1);
        assert_eq!(c.at(2).list_index(), Some(1));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn at_past_end_panics() {
        let mut c = compositor();
        c.append_list(A, 0, 2, false);
        c.at(2);
    }

    #[test]
    fn seeded_internal_items_resolve() {
        let c = Compositor::with_internal_items(VecStore::from_items(vec!['a', 'b']), 2);
        assert_eq!(c.count(), 2);
        assert_eq!(c.internal_count(), 2);
        assert_eq!(c.slot(1), Slot::Internal(1));
        assert_eq!(c.absolute_index_of(1), Some(1));
        assert!(c.check_integrity().is_ok());
    }

    #[test]
    fn absolute_index_of_list_respects_from() {
        let mut c = compositor();
        c.append_list(A, 0, 3, false);
        c.append_list(B, 0, 1, false);
        c.append_list(A, 0, 3, false);
        assert_eq!(c.absolute_index_of_list(A, 1, 0), Some(1));
        assert_eq!(c.absolute_index_of_list(A, 1, 1), Some(5));
        assert_eq!(c.absolute_index_of_list(A, 3, 0), None);
    }

    #[test]
    fn split_at_reports_internal_offset() {
        let mut c = compositor();
        c.append_data('a').unwrap();
        c.append_data('b').unwrap();
        c.append_list(A, 0, 4, true);
        let (position, internal) = c.split_at(1);
        assert_eq!((position, internal), (1, 1));
        let (position, internal) = c.split_at(4);
        assert_eq!((position, internal), (3, 2));
        assert_eq!(c.ranges()[2].flags, RangeFlags::PREPEND);
        assert_eq!(c.ranges()[3].flags, RangeFlags::APPEND);
        assert_eq!(c.absolute_start(3), 4);
    }
}
