//! Change records describing edits to the merged sequence.
//!
//! All intervals are half-open and in absolute index space. A batch of
//! records is sequential: each record is expressed in the index space left
//! behind by the records before it, so replaying a batch in order onto a
//! mirror of the old sequence yields the new one.

use crate::store::move_block;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeRecord {
    /// Items `[start, end)` are new.
    Insert { start: usize, end: usize },
    /// Items `[start, end)` are gone.
    Remove { start: usize, end: usize },
    /// Items `[start, end)` moved so that they now start at `to`.
    Move { start: usize, end: usize, to: usize },
    /// Items `[start, end)` changed in place.
    Change { start: usize, end: usize },
}

impl ChangeRecord {
    /// Number of items the record covers.
    pub fn len(&self) -> usize {
        match *self {
            ChangeRecord::Insert { start, end }
            | ChangeRecord::Remove { start, end }
            | ChangeRecord::Move { start, end, .. }
            | ChangeRecord::Change { start, end } => end - start,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The same permutation expressed by moving the other block.
    ///
    /// Moving `[start, end)` forward past a block is the same as moving that
    /// block backward past `[start, end)`, and vice versa. Records other than
    /// moves are returned unchanged.
    pub fn complement(&self) -> ChangeRecord {
        match *self {
            ChangeRecord::Move { start, end, to } if to > start => {
                let count = end - start;
                ChangeRecord::Move { start: end, end: to + count, to: start }
            }
            ChangeRecord::Move { start, end, to } if to < start => {
                let count = end - start;
                ChangeRecord::Move { start: to, end: start, to: to + count }
            }
            other => other,
        }
    }

    /// Replay the record onto a mirror of the sequence.
    ///
    /// Inserted positions are filled with `fill(absolute_index)`. `Change`
    /// leaves the mirror untouched.
    pub fn apply<T>(&self, items: &mut Vec<T>, mut fill: impl FnMut(usize) -> T) {
        match *self {
            ChangeRecord::Insert { start, end } => {
                let tail = items.split_off(start);
                items.extend((start..end).map(&mut fill));
                items.extend(tail);
            }
            ChangeRecord::Remove { start, end } => {
                items.drain(start..end);
            }
            ChangeRecord::Move { start, end, to } => {
                move_block(items, start, to, end - start);
            }
            ChangeRecord::Change { .. } => {}
        }
    }
}

// Coalescing helpers used while a batch is being produced. `floor` is the
// sink length when the batch started; records below it are never touched.

fn last_of_batch(sink: &mut [ChangeRecord], floor: usize) -> Option<&mut ChangeRecord> {
    if sink.len() > floor {
        return sink.last_mut();
    }
    None
}

pub(crate) fn push_insert(sink: &mut Vec<ChangeRecord>, floor: usize, start: usize, end: usize) {
    if start == end {
        return;
    }
    if let Some(ChangeRecord::Insert { start: s0, end: e0 }) = last_of_batch(sink, floor) {
        if start == *e0 || start == *s0 {
            *e0 += end - start;
            return;
        }
    }
    sink.push(ChangeRecord::Insert { start, end });
}

pub(crate) fn push_remove(sink: &mut Vec<ChangeRecord>, floor: usize, start: usize, end: usize) {
    if start == end {
        return;
    }
    if let Some(ChangeRecord::Remove { start: s0, end: e0 }) = last_of_batch(sink, floor) {
        if start == *s0 {
            *e0 += end - start;
            return;
        }
        if end == *s0 {
            *e0 += end - start;
            *s0 = start;
            return;
        }
    }
    sink.push(ChangeRecord::Remove { start, end });
}

pub(crate) fn push_change(sink: &mut Vec<ChangeRecord>, floor: usize, start: usize, end: usize) {
    if start == end {
        return;
    }
    if let Some(ChangeRecord::Change { start: s0, end: e0 }) = last_of_batch(sink, floor) {
        if start == *e0 {
            *e0 = end;
            return;
        }
        if end == *s0 {
            *s0 = start;
            return;
        }
    }
    sink.push(ChangeRecord::Change { start, end });
}

pub(crate) fn push_move(sink: &mut Vec<ChangeRecord>, floor: usize, start: usize, end: usize, to: usize) {
    if start == end || start == to {
        return;
    }
    let count = end - start;
    if let Some(ChangeRecord::Move { start: s0, end: e0, to: t0 }) = last_of_batch(sink, floor) {
        let prev = *e0 - *s0;
        // Backward chain: the next block follows the previous one in place.
        if *t0 < *s0 && start == *e0 && to == *t0 + prev {
            *e0 += count;
            return;
        }
        // Forward chain: the next block slid into the previous one's slot.
        if *t0 > *s0 && start == *s0 && *t0 >= *s0 + count && to + count == *t0 + prev {
            *e0 += count;
            *t0 -= count;
            if *t0 == *s0 {
                sink.pop();
            }
            return;
        }
    }
    sink.push(ChangeRecord::Move { start, end, to });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(records: &[ChangeRecord], items: &mut Vec<i32>) {
        for record in records {
            record.apply(items, |_| -1);
        }
    }

    #[test]
    fn complement_is_equivalent() {
        let forward = ChangeRecord::Move { start: 0, end: 2, to: 3 };
        let backward = forward.complement();
        assert_eq!(backward, ChangeRecord::Move { start: 2, end: 5, to: 0 });
        assert_eq!(backward.complement(), forward);

        let mut a: Vec<i32> = (0..6).collect();
        let mut b = a.clone();
        forward.apply(&mut a, |_| -1);
        backward.apply(&mut b, |_| -1);
        assert_eq!(a, b);
    }

    #[test]
    fn apply_insert_fills_positions() {
        let mut items = vec![10, 11];
        ChangeRecord::Insert { start: 1, end: 3 }.apply(&mut items, |i| i as i32);
        assert_eq!(items, vec![10, 1, 2, 11]);
    }

    #[test]
    fn removes_coalesce_at_same_start() {
        let mut sink = Vec::new();
        push_remove(&mut sink, 0, 2, 4);
        push_remove(&mut sink, 0, 2, 5);
        assert_eq!(sink, vec![ChangeRecord::Remove { start: 2, end: 7 }]);
        push_remove(&mut sink, 0, 0, 2);
        assert_eq!(sink, vec![ChangeRecord::Remove { start: 0, end: 9 }]);
    }

    #[test]
    fn coalescing_respects_floor() {
        let mut sink = vec![ChangeRecord::Remove { start: 0, end: 1 }];
        push_remove(&mut sink, 1, 0, 1);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn backward_move_chain_coalesces() {
        let mut sink = Vec::new();
        push_move(&mut sink, 0, 4, 6, 1);
        push_move(&mut sink, 0, 6, 7, 3);
        assert_eq!(sink, vec![ChangeRecord::Move { start: 4, end: 7, to: 1 }]);

        let mut a: Vec<i32> = (0..8).collect();
        let mut b = a.clone();
        replay(&[ChangeRecord::Move { start: 4, end: 6, to: 1 }, ChangeRecord::Move { start: 6, end: 7, to: 3 }], &mut a);
        replay(&sink, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn forward_move_chain_coalesces() {
        let steps = [
            ChangeRecord::Move { start: 1, end: 3, to: 5 },
            ChangeRecord::Move { start: 1, end: 2, to: 6 },
        ];
        let mut sink = Vec::new();
        for step in steps {
            if let ChangeRecord::Move { start, end, to } = step {
                push_move(&mut sink, 0, start, end, to);
            }
        }
        assert_eq!(sink, vec![ChangeRecord::Move { start: 1, end: 4, to: 4 }]);

        let mut a: Vec<i32> = (0..8).collect();
        let mut b = a.clone();
        replay(&steps, &mut a);
        replay(&sink, &mut b);
        assert_eq!(a, b);
    }
}
