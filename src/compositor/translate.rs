//! Remapping edits reported by a backing list.
//!
//! A backing list describes its own edits in its local index space. The entry
//! points here update every range referencing that list and report what
//! happened to the merged sequence as absolute [`ChangeRecord`]s. They must
//! be called as soon as the list has changed, before any other compositor
//! call.

use smallvec::SmallVec;

use super::range::{ListId, Range, RangeFlags};
use super::Compositor;
use crate::change::{push_change, push_insert, push_move, push_remove, ChangeRecord};
use crate::store::InternalStore;

/// Growth flags of a range reshaped by a move, and the local bounds the
/// range's items occupy afterwards.
struct Reshaped {
    first: usize,
    last: usize,
    flags: RangeFlags,
}

/// Where a moved piece goes relative to an existing range.
#[derive(Clone, Copy)]
enum Destination {
    After(usize),
    Before(usize),
}

/// Index remapping for a forward move of `[start, end)` to `to`.
#[derive(Clone, Copy)]
struct ForwardMove {
    start: usize,
    end: usize,
    to: usize,
}

impl ForwardMove {
    fn count(&self) -> usize {
        self.end - self.start
    }

    /// One past the last item the moved block jumps over.
    fn past(&self) -> usize {
        self.to + self.count()
    }

    /// New index of the item at `index`.
    fn item(&self, index: usize) -> usize {
        if index < self.start || index >= self.past() {
            index
        } else if index < self.end {
            index + self.to - self.start
        } else {
            index - self.count()
        }
    }

    /// New position of the gap before the item at `index`.
    fn boundary(&self, index: usize) -> usize {
        if index <= self.start || index >= self.past() {
            index
        } else if index < self.end {
            index + self.to - self.start
        } else {
            index - self.count()
        }
    }
}

impl<S: InternalStore> Compositor<S> {
    /// `list` gained items `[start, end)`.
    ///
    /// The items become visible in every range of `list` covering the
    /// insertion point, and in at most one range whose growth boundary sits
    /// on it. Windows further along the list shift.
    pub fn list_items_inserted(&mut self, list: ListId, start: usize, end: usize, changes: &mut Vec<ChangeRecord>) {
        if start >= end {
            return;
        }
        let floor = changes.len();
        let count = end - start;
        let mut absolute = 0;
        let mut absorbed = false;
        for range in self.ranges.iter_mut() {
            if !range.tracks(list) {
                absolute += range.visible();
                continue;
            }
            let offset = if start == range.index && range.prepends() && !absorbed {
                Some(0)
            } else if start == range.end() && range.appends() && !absorbed {
                Some(range.count)
            } else if start > range.index && start < range.end() {
                Some(start - range.index)
            } else {
                None
            };
            match offset {
                Some(offset) => {
                    let at = absolute + offset;
                    range.count += count;
                    range.flags.remove(RangeFlags::NULL);
                    absorbed = true;
                    self.absolute_count += count;
                    push_insert(changes, floor, at, at + count);
                }
                None if start <= range.index => range.index += count,
                None => {}
            }
            absolute += range.visible();
        }
        tracing::debug!(list = list.0, start, end, records = changes.len() - floor, "list_items_inserted");
        self.check_invariants();
    }

    /// `list` lost items `[start, end)`.
    ///
    /// Windows shrink, shift, or collapse. An emptied window with growth
    /// flags stays as a null anchor; any other emptied window is erased.
    pub fn list_items_removed(&mut self, list: ListId, start: usize, end: usize, changes: &mut Vec<ChangeRecord>) {
        if start >= end {
            return;
        }
        let floor = changes.len();
        let count = end - start;
        let mut absolute = 0;
        let mut internal = 0;
        let mut position = 0;
        while position < self.ranges.len() {
            let range = self.ranges[position];
            if range.list != Some(list) || start >= range.end() {
                absolute += range.visible();
                if range.is_internal() {
                    internal += range.visible();
                }
                position += 1;
                continue;
            }
            if end <= range.index {
                self.ranges[position].index -= count;
                absolute += range.visible();
                if range.is_internal() {
                    internal += range.visible();
                }
                position += 1;
                continue;
            }

            let first = start.max(range.index);
            let last = end.min(range.end());
            let removed = last - first;
            let offset = first - range.index;
            if !range.is_null() {
                push_remove(changes, floor, absolute + offset, absolute + offset + removed);
                self.absolute_count -= removed;
            }
            if range.is_internal() && removed > 0 {
                self.store.remove_internal_data(internal + offset, removed);
                self.internal_count -= removed;
            }

            let mut updated = range;
            updated.index = range.index.min(start);
            updated.count -= removed;
            if updated.count == 0 && !range.is_null() {
                if range.grows() && !range.is_internal() {
                    self.ranges[position] = Range::anchor(list, updated.index, range.flags);
                } else {
                    position = self.erase_range(position);
                    continue;
                }
            } else {
                self.ranges[position] = updated;
            }
            absolute += updated.visible();
            if updated.is_internal() {
                internal += updated.visible();
            }
            position += 1;
        }
        tracing::debug!(list = list.0, start, end, records = changes.len() - floor, "list_items_removed");
        self.check_invariants();
    }

    /// Items `[start, end)` of `list` moved so that they now start at `to`.
    ///
    /// A backward move is the forward move of the block it jumps over, so
    /// only the forward direction is implemented; records produced for a
    /// backward move are turned back into moves of the caller's block.
    pub fn list_items_moved(&mut self, list: ListId, start: usize, end: usize, to: usize, changes: &mut Vec<ChangeRecord>) {
        if start >= end || start == to {
            return;
        }
        let floor = changes.len();
        if to < start {
            let count = end - start;
            let forward = ForwardMove { start: to, end: start, to: to + count };
            self.list_items_moved_forward(list, forward, changes);
            for record in &mut changes[floor..] {
                *record = record.complement();
            }
        } else {
            self.list_items_moved_forward(list, ForwardMove { start, end, to }, changes);
        }
        tracing::debug!(list = list.0, start, end, to, records = changes.len() - floor, "list_items_moved");
        self.check_invariants();
    }

    /// Items `[start, end)` of `list` changed in place.
    pub fn list_items_changed(&mut self, list: ListId, start: usize, end: usize, changes: &mut Vec<ChangeRecord>) {
        if start >= end {
            return;
        }
        let floor = changes.len();
        let mut absolute = 0;
        for range in &self.ranges {
            if range.is_window_of(list) && start < range.end() && end > range.index {
                let first = start.max(range.index) - range.index;
                let last = end.min(range.end()) - range.index;
                push_change(changes, floor, absolute + first, absolute + last);
            }
            absolute += range.visible();
        }
        tracing::debug!(list = list.0, start, end, records = changes.len() - floor, "list_items_changed");
    }

    fn list_items_moved_forward(&mut self, list: ListId, forward: ForwardMove, changes: &mut Vec<ChangeRecord>) {
        let floor = changes.len();
        let reshaped = self.reindex_for_move(list, forward);

        // Pieces of the moved block, in their new list order.
        let mut pieces: SmallVec<[usize; 4]> = self
            .ranges
            .iter()
            .filter(|r| r.is_window_of(list) && r.index >= forward.to && r.index < forward.past())
            .map(|r| r.index)
            .collect();
        pieces.sort_unstable();

        let mut previous: Option<usize> = None;
        for index in pieces {
            let Some((source, source_absolute)) = self.find_window(list, |r| r.index == index) else {
                continue;
            };
            let destination = match previous {
                Some(previous) => self
                    .find_window(list, |r| r.index == previous)
                    .map(|(p, _)| Destination::After(p)),
                None => self
                    .find_window(list, |r| r.index < forward.to && forward.to <= r.end())
                    .map(|(p, _)| Destination::After(p))
                    .or_else(|| {
                        self.find_window(list, |r| r.index == forward.past())
                            .map(|(p, _)| Destination::Before(p))
                    }),
            };
            previous = Some(index);
            let Some(destination) = destination else {
                continue;
            };

            let piece = self.ranges[source];
            self.erase_range(source);
            let shift = |p: usize| if p > source { p - 1 } else { p };
            let (position, absolute) = match destination {
                Destination::After(p) => {
                    let p = shift(p);
                    (p + 1, self.absolute_start(p) + self.ranges[p].visible())
                }
                Destination::Before(p) => {
                    let p = shift(p);
                    (p, self.absolute_start(p))
                }
            };
            self.insert_range(position, piece);
            push_move(changes, floor, source_absolute, source_absolute + piece.count, absolute);
        }

        self.coalesce_ranges(|r| r.list == Some(list));
        for shape in reshaped {
            for range in self.ranges.iter_mut().filter(|r| r.is_window_of(list)) {
                if shape.flags.contains(RangeFlags::PREPEND) && range.index == shape.first {
                    range.flags.insert(RangeFlags::PREPEND);
                }
                if shape.flags.contains(RangeFlags::APPEND) && range.end() == shape.last {
                    range.flags.insert(RangeFlags::APPEND);
                }
            }
        }
    }

    /// Cut the windows of `list` on the move's boundaries and give every
    /// piece its new local index. Growth flags of windows that get cut or
    /// moved are lifted off and returned, to be put back once the pieces
    /// have been rearranged.
    fn reindex_for_move(&mut self, list: ListId, forward: ForwardMove) -> SmallVec<[Reshaped; 2]> {
        let mut reshaped = SmallVec::new();
        let mut position = 0;
        while position < self.ranges.len() {
            let range = self.ranges[position];
            if !range.tracks(list) {
                position += 1;
                continue;
            }
            if range.is_null() {
                self.ranges[position].index = forward.boundary(range.index);
                position += 1;
                continue;
            }

            let cuts: SmallVec<[usize; 3]> = [forward.start, forward.end, forward.past()]
                .into_iter()
                .filter(|&cut| cut > range.index && cut < range.end())
                .collect();
            let moved = range.index < forward.end && range.end() > forward.start;
            if (moved || !cuts.is_empty()) && range.grows() {
                let mut first = usize::MAX;
                let mut last = 0;
                let mut piece_start = range.index;
                for piece_end in cuts.iter().copied().chain([range.end()]) {
                    let index = forward.item(piece_start);
                    first = first.min(index);
                    last = last.max(index + piece_end - piece_start);
                    piece_start = piece_end;
                }
                reshaped.push(Reshaped {
                    first,
                    last,
                    flags: range.flags & RangeFlags::GROW,
                });
                self.ranges[position].flags.remove(RangeFlags::GROW);
            }

            let mut piece_start = range.index;
            for cut in cuts {
                position = self.split_range(position, cut - piece_start);
                self.ranges[position - 1].index = forward.item(piece_start);
                piece_start = cut;
            }
            self.ranges[position].index = forward.item(piece_start);
            position += 1;
        }
        reshaped
    }

    /// Position and absolute start of the first window of `list` matching
    /// `predicate`.
    fn find_window(&self, list: ListId, predicate: impl Fn(&Range) -> bool) -> Option<(usize, usize)> {
        let mut absolute = 0;
        for (position, range) in self.ranges.iter().enumerate() {
            if range.is_window_of(list) && predicate(range) {
                return Some((position, absolute));
            }
            absolute += range.visible();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VecStore;

    const A: ListId = ListId(1);
    const B: ListId = ListId(2);

    fn compositor() -> Compositor<VecStore<char>> {
        Compositor::new(VecStore::new())
    }

    #[test]
    fn forward_move_index_mapping() {
        let forward = ForwardMove { start: 1, end: 3, to: 5 };
        let mapped: Vec<usize> = (0..9).map(|i| forward.item(i)).collect();
        assert_eq!(mapped, vec![0, 5, 6, 1, 2, 3, 4, 7, 8]);
        assert_eq!(forward.boundary(1), 1);
        assert_eq!(forward.boundary(2), 6);
        assert_eq!(forward.boundary(3), 1);
        assert_eq!(forward.boundary(7), 7);
    }

    #[test]
    fn insert_inside_window_grows_it() {
        let mut c = compositor();
        c.append_list(B, 0, 1, false);
        c.append_list(A, 0, 4, false);
        let mut changes = Vec::new();
        c.list_items_inserted(A, 2, 4, &mut changes);
        assert_eq!(changes, vec![ChangeRecord::Insert { start: 3, end: 5 }]);
        assert_eq!(c.ranges()[1], Range::list(A, 0, 6, false));
        assert_eq!(c.count(), 7);
    }

    #[test]
    fn insert_on_plain_boundary_shifts() {
        let mut c = compositor();
        c.append_list(A, 2, 3, false);
        let mut changes = Vec::new();
        c.list_items_inserted(A, 2, 3, &mut changes);
        assert!(changes.is_empty());
        assert_eq!(c.ranges(), &[Range::list(A, 3, 3, false)]);
        c.list_items_inserted(A, 6, 7, &mut changes);
        assert!(changes.is_empty());
        assert_eq!(c.count(), 3);
    }

    #[test]
    fn insert_into_anchor_revives_it() {
        let mut c = compositor();
        c.append_list(B, 0, 2, false);
        c.append_list(A, 0, 0, true);
        let mut changes = Vec::new();
        c.list_items_inserted(A, 0, 3, &mut changes);
        assert_eq!(changes, vec![ChangeRecord::Insert { start: 2, end: 5 }]);
        assert_eq!(c.ranges()[1], Range::list(A, 0, 3, true));
        assert_eq!(c.count(), 5);
    }

    #[test]
    fn only_one_range_absorbs() {
        let mut c = compositor();
        c.append_list(A, 0, 2, true);
        c.append_list(A, 2, 2, true);
        let mut changes = Vec::new();
        c.list_items_inserted(A, 2, 3, &mut changes);
        assert_eq!(changes, vec![ChangeRecord::Insert { start: 2, end: 3 }]);
        assert_eq!(c.ranges()[0], Range::list(A, 0, 3, true));
        assert_eq!(c.ranges()[1], Range::list(A, 3, 2, true));
    }

    #[test]
    fn insert_grows_every_covering_window() {
        let mut c = compositor();
        c.append_list(A, 0, 3, false);
        c.append_list(B, 0, 1, false);
        c.append_list(A, 0, 3, false);
        let mut changes = Vec::new();
        c.list_items_inserted(A, 1, 2, &mut changes);
        assert_eq!(
            changes,
            vec![ChangeRecord::Insert { start: 1, end: 2 }, ChangeRecord::Insert { start: 6, end: 7 }]
        );
        assert_eq!(c.count(), 9);
        assert_eq!(c.ranges()[0], Range::list(A, 0, 4, false));
        assert_eq!(c.ranges()[2], Range::list(A, 0, 4, false));
        assert_eq!(c.check_integrity(), Ok(()));
    }

    #[test]
    fn remove_across_windows() {
        let mut c = compositor();
        c.append_list(A, 0, 3, false);
        c.append_list(A, 3, 3, true);
        let mut changes = Vec::new();
        c.list_items_removed(A, 1, 5, &mut changes);
        assert_eq!(changes, vec![ChangeRecord::Remove { start: 1, end: 5 }]);
        assert_eq!(c.ranges()[0], Range::list(A, 0, 1, false));
        assert_eq!(
            c.ranges()[1],
            Range { list: Some(A), index: 1, count: 1, flags: RangeFlags::GROW }
        );
        assert_eq!(c.count(), 2);
    }

    #[test]
    fn remove_empties_plain_window_and_keeps_anchor() {
        let mut c = compositor();
        c.append_list(A, 0, 2, false);
        c.append_list(B, 0, 1, false);
        c.append_list(A, 4, 2, true);
        let mut changes = Vec::new();
        c.list_items_removed(A, 0, 6, &mut changes);
        assert_eq!(
            changes,
            vec![
                ChangeRecord::Remove { start: 0, end: 2 },
                ChangeRecord::Remove { start: 1, end: 3 },
            ]
        );
        assert_eq!(
            c.ranges(),
            &[Range::list(B, 0, 1, false), Range::anchor(A, 0, RangeFlags::GROW)]
        );
    }

    #[test]
    fn changed_reports_visible_overlap() {
        let mut c = compositor();
        c.append_list(A, 0, 2, false);
        c.append_list(B, 0, 2, false);
        c.append_list(A, 5, 3, false);
        let mut changes = Vec::new();
        c.list_items_changed(A, 1, 7, &mut changes);
        assert_eq!(
            changes,
            vec![
                ChangeRecord::Change { start: 1, end: 2 },
                ChangeRecord::Change { start: 4, end: 6 },
            ]
        );
    }

    #[test]
    fn backward_move_within_one_range_is_one_record() {
        let mut c = compositor();
        c.append_list(A, 0, 10, false);
        let mut changes = Vec::new();
        c.list_items_moved(A, 2, 5, 0, &mut changes);
        assert_eq!(changes, vec![ChangeRecord::Move { start: 2, end: 5, to: 0 }]);
        assert_eq!(c.ranges(), &[Range::list(A, 0, 10, false)]);
    }

    #[test]
    fn forward_move_keeps_growth_flags() {
        let mut c = compositor();
        c.append_list(A, 0, 6, true);
        let mut changes = Vec::new();
        c.list_items_moved(A, 1, 3, 4, &mut changes);
        assert_eq!(changes, vec![ChangeRecord::Move { start: 1, end: 3, to: 4 }]);
        assert_eq!(c.ranges(), &[Range::list(A, 0, 6, true)]);
    }

    #[test]
    fn move_across_foreign_range() {
        let mut c = compositor();
        c.append_list(A, 0, 5, false);
        c.append_list(B, 0, 2, false);
        c.append_list(A, 5, 5, false);
        let mut changes = Vec::new();
        c.list_items_moved(A, 1, 3, 6, &mut changes);
        assert_eq!(changes, vec![ChangeRecord::Move { start: 1, end: 3, to: 8 }]);
        assert_eq!(
            c.ranges(),
            &[
                Range::list(A, 0, 3, false),
                Range::list(B, 0, 2, false),
                Range::list(A, 3, 7, false),
            ]
        );
    }
}
