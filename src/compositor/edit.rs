//! Structural edits of the merged sequence made by its owner.

use smallvec::SmallVec;

use super::range::{ListId, Range, RangeFlags};
use super::{Compositor, Slot};
use crate::change::{push_remove, ChangeRecord};
use crate::error::CompositorError;
use crate::store::InternalStore;

/// Ranges taken out of the sequence by a detach.
type Detached = SmallVec<[Range; 4]>;

impl<S: InternalStore> Compositor<S> {
    /// Append items `[start, start + count)` of `list` to the end.
    ///
    /// With `grow`, the new range absorbs list insertions landing on either of
    /// its boundaries. A non-growing window that continues the current tail
    /// window of the same list extends it instead of adding a range. An empty
    /// growing window leaves a null anchor to grow from later.
    pub fn append_list(&mut self, list: ListId, start: usize, count: usize, grow: bool) {
        tracing::trace!(list = list.0, start, count, grow, "append_list");
        if count == 0 {
            if grow {
                let end = self.ranges.len();
                self.insert_range(end, Range::anchor(list, start, RangeFlags::GROW));
            }
            return;
        }
        if !grow {
            if let Some(tail) = self.ranges.last_mut() {
                if tail.is_window_of(list) && !tail.grows() && tail.end() == start {
                    tail.count += count;
                    self.absolute_count += count;
                    self.check_invariants();
                    return;
                }
            }
        }
        let end = self.ranges.len();
        self.insert_range(end, Range::list(list, start, count, grow));
        self.absolute_count += count;
        self.check_invariants();
    }

    /// Insert items `[start, start + count)` of `list` at absolute `index`.
    pub fn insert_list(&mut self, index: usize, list: ListId, start: usize, count: usize, grow: bool) {
        assert!(
            index <= self.absolute_count,
            "index {} out of bounds (count {})",
            index,
            self.absolute_count
        );
        tracing::trace!(index, list = list.0, start, count, grow, "insert_list");
        if count == 0 && !grow {
            return;
        }
        let (position, _) = self.split_at(index);
        let range = if count == 0 {
            Range::anchor(list, start, RangeFlags::GROW)
        } else {
            Range::list(list, start, count, grow)
        };
        self.insert_range(position, range);
        self.absolute_count += count;
        self.check_invariants();
    }

    /// Append one internal item.
    pub fn append_data(&mut self, item: S::Item) -> Result<(), CompositorError> {
        self.insert_data(self.absolute_count, item)
    }

    /// Insert one internal item at absolute `index`.
    ///
    /// The item is handed to the store first; if the store refuses it the
    /// ranges are left untouched.
    pub fn insert_data(&mut self, index: usize, item: S::Item) -> Result<(), CompositorError> {
        assert!(
            index <= self.absolute_count,
            "index {} out of bounds (count {})",
            index,
            self.absolute_count
        );
        let offset = self.internal_before(index);
        tracing::trace!(index, offset, "insert_data");
        self.store
            .insert_internal_data(offset, item)
            .map_err(|source| CompositorError::Store { offset, source })?;

        match self.internal_landing(index) {
            Some(position) => self.ranges[position].count += 1,
            None => {
                let (position, _) = self.split_at(index);
                self.insert_range(position, Range::internal(1));
            }
        }
        self.internal_count += 1;
        self.absolute_count += 1;
        self.check_invariants();
        Ok(())
    }

    /// Turn the item at `index` into an internal item holding `item`.
    ///
    /// An item that is already internal is overwritten in place. A list item
    /// is cut out of its window; growth flags on the boundaries it touched
    /// are kept alive as null anchors around the new internal item.
    pub fn replace_at(&mut self, index: usize, item: S::Item) -> Result<(), CompositorError> {
        let location = self.at(index);
        tracing::trace!(index, internal = location.range.is_internal(), "replace_at");
        if location.range.is_internal() {
            self.store.replace_internal_data(location.internal_index, item);
            return Ok(());
        }

        let offset = location.internal_index;
        self.store
            .insert_internal_data(offset, item)
            .map_err(|source| CompositorError::Store { offset, source })?;

        let position = self.isolate(index);
        self.internalize(position);
        self.internal_count += 1;
        self.check_invariants();
        Ok(())
    }

    /// Remove `count` items starting at absolute `index`.
    ///
    /// List windows shrink or split; a window emptied this way leaves null
    /// anchors for its growth flags. Internal items in the window are
    /// dropped from the store with a single call.
    pub fn remove_at(&mut self, index: usize, count: usize) {
        assert!(
            index + count <= self.absolute_count,
            "removal {}..{} out of bounds (count {})",
            index,
            index + count,
            self.absolute_count
        );
        tracing::trace!(index, count, "remove_at");
        if count == 0 {
            return;
        }
        let offset = self.internal_before(index);
        let mut detached = Detached::new();
        let internal = self.detach(index, count, &mut detached);
        if internal > 0 {
            self.store.remove_internal_data(offset, internal);
            self.internal_count -= internal;
        }
        self.absolute_count -= count;
        self.check_invariants();
    }

    /// Remove every range referencing `list`, reporting each contiguous run
    /// of removed items as one `Remove` record.
    pub fn remove_list(&mut self, list: ListId, changes: &mut Vec<ChangeRecord>) {
        let floor = changes.len();
        let mut position = 0;
        let mut absolute = 0;
        let mut internal = 0;
        while position < self.ranges.len() {
            let range = self.ranges[position];
            let visible = range.visible();
            if range.list != Some(list) {
                absolute += visible;
                if range.is_internal() {
                    internal += visible;
                }
                position += 1;
                continue;
            }
            if range.is_internal() && visible > 0 {
                self.store.remove_internal_data(internal, visible);
                self.internal_count -= visible;
            }
            push_remove(changes, floor, absolute, absolute + visible);
            self.absolute_count -= visible;
            position = self.erase_range(position);
        }
        tracing::debug!(list = list.0, records = changes.len() - floor, "remove_list");
        self.check_invariants();
    }

    /// Move the `count` items at absolute `from` so that they start at `to`.
    ///
    /// `to` is the start of the block after the move. Boundaries the block
    /// is cut out of keep their growth flags as null anchors; the moved
    /// pieces carry none.
    pub fn move_items(&mut self, from: usize, to: usize, count: usize) {
        assert!(from != to, "move from {} to itself", from);
        assert!(
            from + count <= self.absolute_count && to + count <= self.absolute_count,
            "move of {} items from {} to {} out of bounds (count {})",
            count,
            from,
            to,
            self.absolute_count
        );
        tracing::trace!(from, to, count, "move_items");
        if count == 0 {
            return;
        }

        let internal_from = self.internal_before(from);
        let mut detached = Detached::new();
        let internal = self.detach(from, count, &mut detached);

        let (mut position, internal_to) = self.split_at(to);
        for mut piece in detached {
            piece.flags.remove(RangeFlags::GROW);
            position = self.insert_range(position, piece);
        }

        if internal > 0 && internal_from != internal_to {
            self.store.move_internal_data(internal_from, internal_to, internal);
        }
        self.check_invariants();
    }

    /// Group the item at `from` underneath the list item at `to`.
    ///
    /// The item at `from` leaves the sequence and the item at `to` becomes an
    /// internal item standing for the group. Fails, without changing
    /// anything, when `to` is not a list item or when the store declines to
    /// build a group out of a list item.
    pub fn merge(&mut self, from: usize, to: usize) -> Result<(), CompositorError> {
        assert!(from != to, "merge of {} into itself", from);
        let target_location = self.at(to);
        let source_location = self.at(from);
        let target = match target_location.slot() {
            Slot::List(item) => item,
            Slot::Internal(_) => {
                tracing::warn!(from, to, "merge target is not a list item");
                return Err(CompositorError::IneligibleMergeTarget { index: to });
            }
        };
        let group_index = if from < to { to - 1 } else { to };

        match source_location.slot() {
            Slot::Internal(offset) => {
                self.store.merge_internal_data(offset, target);
                let mut detached = Detached::new();
                self.detach(from, 1, &mut detached);
                self.absolute_count -= 1;
                let position = self.isolate(group_index);
                self.internalize(position);
                let group_offset = self.internal_before(group_index);
                if group_offset != offset {
                    self.store.move_internal_data(offset, group_offset, 1);
                }
            }
            Slot::List(source) => {
                let offset = target_location.internal_index;
                if !self.store.merge_list_data(offset, target, source) {
                    tracing::warn!(from, to, "store declined merge");
                    return Err(CompositorError::MergeDeclined { from, to });
                }
                let mut detached = Detached::new();
                self.detach(from, 1, &mut detached);
                self.absolute_count -= 1;
                let position = self.isolate(group_index);
                self.internalize(position);
                self.internal_count += 1;
            }
        }
        tracing::trace!(from, to, "merge");
        self.check_invariants();
        Ok(())
    }

    /// Remove every range and every internal item.
    pub fn clear(&mut self) {
        tracing::trace!(ranges = self.ranges.len(), "clear");
        while let Some(last) = self.ranges.len().checked_sub(1) {
            self.erase_range(last);
        }
        if self.internal_count > 0 {
            self.store.remove_internal_data(0, self.internal_count);
        }
        self.absolute_count = 0;
        self.internal_count = 0;
    }

    /// Coalesce neighbouring ranges that can be joined without changing the
    /// visible sequence or its growth boundaries.
    pub fn compress(&mut self) {
        let before = self.ranges.len();
        self.coalesce_ranges(|_| true);
        tracing::trace!(before, after = self.ranges.len(), "compress");
        self.check_invariants();
    }

    // --- Helpers shared by the edits ---

    /// Join neighbouring ranges accepted by `filter` where possible.
    pub(super) fn coalesce_ranges(&mut self, filter: impl Fn(&Range) -> bool) {
        let mut position = 0;
        while position + 1 < self.ranges.len() {
            let left = self.ranges[position];
            let right = self.ranges[position + 1];
            if filter(&left) && filter(&right) {
                if let Some(merged) = left.coalesce(&right) {
                    self.ranges[position] = merged;
                    self.erase_range(position + 1);
                    continue;
                }
            }
            position += 1;
        }
    }

    /// Take the `count` items at absolute `index` out of the range store,
    /// collecting the removed ranges in `detached`. Returns how many of them
    /// were internal items. Counters are left to the caller.
    fn detach(&mut self, index: usize, count: usize, detached: &mut Detached) -> usize {
        let (mut position, _) = self.split_at(index);
        let (mut end, _) = self.split_at(index + count);
        let mut internal = 0;
        while position < end {
            let range = self.ranges[position];
            if range.is_null() {
                position += 1;
                continue;
            }
            if range.is_internal() {
                internal += range.count;
            }
            position = self.erase_range(position);
            end -= 1;
            for anchor in range.anchors() {
                position = self.insert_range(position, anchor);
                end += 1;
            }
            detached.push(range);
        }
        internal
    }

    /// Cut the item at absolute `index` into a range of its own. Returns its
    /// position.
    fn isolate(&mut self, index: usize) -> usize {
        let (position, _) = self.split_at(index);
        if self.ranges[position].count > 1 {
            self.split_range(position, 1);
        }
        position
    }

    /// Replace the single-item list range at `position` with an internal
    /// range, keeping its growth flags as anchors on either side.
    fn internalize(&mut self, position: usize) {
        let range = self.ranges[position];
        debug_assert!(range.count == 1 && !range.is_internal() && !range.is_null());
        let mut position = self.erase_range(position);
        let list = range.list;
        if let (Some(list), true) = (list, range.prepends()) {
            position = self.insert_range(position, Range::anchor(list, range.index, RangeFlags::PREPEND));
        }
        position = self.insert_range(position, Range::internal(1));
        if let (Some(list), true) = (list, range.appends()) {
            self.insert_range(position, Range::anchor(list, range.end(), RangeFlags::APPEND));
        }
    }

    /// An internal range that can take one more item inserted at absolute
    /// `index`: one covering `index`, ending on it, or starting on it.
    fn internal_landing(&self, index: usize) -> Option<usize> {
        let mut absolute = 0;
        let mut before = None;
        for (position, range) in self.ranges.iter().enumerate() {
            if range.is_null() {
                continue;
            }
            let end = absolute + range.count;
            if absolute == index {
                return before.or(range.is_internal().then_some(position));
            }
            if index < end {
                return range.is_internal().then_some(position);
            }
            before = range.is_internal().then_some(position);
            absolute = end;
        }
        before
    }
}
