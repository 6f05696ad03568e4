//! AFL fuzz harness for the list compositor
//!
//! Drives a compositor over three backing lists with a random mix of owner
//! edits and list events. Checked after every step:
//! 1. Integrity: range counts agree with the compositor's counters
//! 2. Store agreement: the internal store holds exactly `internal_count()` items
//! 3. Change records: replaying the records of a list event onto the old view
//!    reproduces the new view

use afl::fuzz;
use list_compositor::{ChangeRecord, Compositor, ListId, Slot, VecStore};

const NUM_LISTS: usize = 3;
const INITIAL_LEN: u32 = 8;
/// Marks positions filled in by replayed `Insert` records.
const FRESH: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
enum FuzzOp {
    AppendList { list: u8, start_frac: u8, len: u8, grow: bool },
    InsertList { pos_frac: u8, list: u8, start_frac: u8, len: u8, grow: bool },
    InsertData { pos_frac: u8 },
    RemoveAt { pos_frac: u8, len: u8 },
    MoveItems { from_frac: u8, to_frac: u8, len: u8 },
    ReplaceAt { pos_frac: u8 },
    Merge { from_frac: u8, to_frac: u8 },
    ListInsert { list: u8, pos_frac: u8, len: u8 },
    ListRemove { list: u8, pos_frac: u8, len: u8 },
    ListMove { list: u8, start_frac: u8, len: u8, to_frac: u8 },
    ListChange { list: u8, pos_frac: u8, len: u8 },
    RemoveList { list: u8 },
    Compress,
}

impl FuzzOp {
    fn from_bytes(bytes: &[u8]) -> Option<(FuzzOp, &[u8])> {
        if bytes.is_empty() {
            return None;
        }

        let op_type = bytes[0] % 13;
        let rest = &bytes[1..];
        let list = |b: u8| b % NUM_LISTS as u8;

        match op_type {
            0 if rest.len() >= 3 => {
                let op = FuzzOp::AppendList {
                    list: list(rest[0]),
                    start_frac: rest[1],
                    len: rest[2] % 8,
                    grow: rest[2] & 0x80 != 0,
                };
                Some((op, &rest[3..]))
            }
            1 if rest.len() >= 4 => {
                let op = FuzzOp::InsertList {
                    pos_frac: rest[0],
                    list: list(rest[1]),
                    start_frac: rest[2],
                    len: rest[3] % 8,
                    grow: rest[3] & 0x80 != 0,
                };
                Some((op, &rest[4..]))
            }
            2 if !rest.is_empty() => Some((FuzzOp::InsertData { pos_frac: rest[0] }, &rest[1..])),
            3 if rest.len() >= 2 => {
                let op = FuzzOp::RemoveAt { pos_frac: rest[0], len: (rest[1] % 8).saturating_add(1) };
                Some((op, &rest[2..]))
            }
            4 if rest.len() >= 3 => {
                let op = FuzzOp::MoveItems {
                    from_frac: rest[0],
                    to_frac: rest[1],
                    len: (rest[2] % 8).saturating_add(1),
                };
                Some((op, &rest[3..]))
            }
            5 if !rest.is_empty() => Some((FuzzOp::ReplaceAt { pos_frac: rest[0] }, &rest[1..])),
            6 if rest.len() >= 2 => {
                let op = FuzzOp::Merge { from_frac: rest[0], to_frac: rest[1] };
                Some((op, &rest[2..]))
            }
            7 | 8 | 10 if rest.len() >= 3 => {
                let (list, pos_frac, len) = (list(rest[0]), rest[1], (rest[2] % 8).saturating_add(1));
                let op = match op_type {
                    7 => FuzzOp::ListInsert { list, pos_frac, len },
                    8 => FuzzOp::ListRemove { list, pos_frac, len },
                    _ => FuzzOp::ListChange { list, pos_frac, len },
                };
                Some((op, &rest[3..]))
            }
            9 if rest.len() >= 4 => {
                let op = FuzzOp::ListMove {
                    list: list(rest[0]),
                    start_frac: rest[1],
                    len: (rest[2] % 8).saturating_add(1),
                    to_frac: rest[3],
                };
                Some((op, &rest[4..]))
            }
            11 if !rest.is_empty() => Some((FuzzOp::RemoveList { list: list(rest[0]) }, &rest[1..])),
            12 => Some((FuzzOp::Compress, rest)),
            _ => None,
        }
    }
}

/// Scale a fuzz byte into `0..=max`.
fn scale(frac: u8, max: usize) -> usize {
    (frac as usize * (max + 1)) / 256
}

struct World {
    lists: Vec<Vec<u32>>,
    view: Compositor<VecStore<u32>>,
    next_value: u32,
}

impl World {
    fn new() -> Self {
        let lists = (0..NUM_LISTS as u32)
            .map(|l| (0..INITIAL_LEN).map(|i| l * INITIAL_LEN + i).collect())
            .collect();
        World {
            lists,
            view: Compositor::new(VecStore::new()),
            next_value: NUM_LISTS as u32 * INITIAL_LEN,
        }
    }

    fn fresh(&mut self) -> u32 {
        self.next_value += 1;
        self.next_value
    }

    fn materialize(&self) -> Vec<u32> {
        self.view
            .slots()
            .map(|slot| match slot {
                Slot::List(item) => self.lists[item.list.0][item.index],
                Slot::Internal(offset) => self.view.store().items()[offset],
            })
            .collect()
    }

    fn check(&self) {
        if let Err(violation) = self.view.check_integrity() {
            panic!("integrity violated: {}\nranges: {:?}", violation, self.view.ranges());
        }
        assert_eq!(
            self.view.store().len(),
            self.view.internal_count(),
            "store holds {} items, compositor counts {}",
            self.view.store().len(),
            self.view.internal_count()
        );
        assert_eq!(self.view.slots().count(), self.view.count(), "slot count mismatch");
    }

    /// Replaying `changes` onto `before` must give the current view.
    fn check_replay(&self, before: Vec<u32>, changes: &[ChangeRecord]) {
        let mut replayed = before;
        for record in changes {
            record.apply(&mut replayed, |_| FRESH);
        }
        let after = self.materialize();
        for record in changes {
            if let ChangeRecord::Change { start, end } = *record {
                replayed[start..end].copy_from_slice(&after[start..end]);
            }
        }
        assert_eq!(replayed.len(), after.len(), "replayed length differs: {:?}", changes);
        for (i, (r, a)) in replayed.iter().zip(&after).enumerate() {
            assert!(
                *r == FRESH || r == a,
                "replay diverges at {}: {} != {}\nrecords: {:?}\nranges: {:?}",
                i,
                r,
                a,
                changes,
                self.view.ranges()
            );
        }
    }

    fn step(&mut self, op: FuzzOp) {
        let count = self.view.count();
        match op {
            FuzzOp::AppendList { list, start_frac, len, grow } => {
                let list_len = self.lists[list as usize].len();
                let start = scale(start_frac, list_len);
                let len = (len as usize).min(list_len - start);
                self.view.append_list(ListId(list as usize), start, len, grow);
            }
            FuzzOp::InsertList { pos_frac, list, start_frac, len, grow } => {
                let list_len = self.lists[list as usize].len();
                let start = scale(start_frac, list_len);
                let len = (len as usize).min(list_len - start);
                self.view.insert_list(scale(pos_frac, count), ListId(list as usize), start, len, grow);
            }
            FuzzOp::InsertData { pos_frac } => {
                let value = self.fresh();
                self.view
                    .insert_data(scale(pos_frac, count), value)
                    .expect("unbounded store accepts every item");
            }
            FuzzOp::RemoveAt { pos_frac, len } => {
                if count > 0 {
                    let pos = scale(pos_frac, count - 1);
                    self.view.remove_at(pos, (len as usize).min(count - pos));
                }
            }
            FuzzOp::MoveItems { from_frac, to_frac, len } => {
                if count > 1 {
                    let len = (len as usize).min(count - 1);
                    let from = scale(from_frac, count - len);
                    let to = scale(to_frac, count - len);
                    if from != to {
                        self.view.move_items(from, to, len);
                    }
                }
            }
            FuzzOp::ReplaceAt { pos_frac } => {
                if count > 0 {
                    let value = self.fresh();
                    self.view
                        .replace_at(scale(pos_frac, count - 1), value)
                        .expect("unbounded store accepts every item");
                }
            }
            FuzzOp::Merge { from_frac, to_frac } => {
                if count > 1 {
                    let from = scale(from_frac, count - 1);
                    let to = scale(to_frac, count - 1);
                    if from != to {
                        // Internal targets and list sources are refused by
                        // `VecStore`; a refusal must leave the view untouched.
                        let before = self.materialize();
                        if self.view.merge(from, to).is_err() {
                            assert_eq!(before, self.materialize(), "failed merge changed the view");
                        }
                    }
                }
            }
            FuzzOp::ListInsert { list, pos_frac, len } => {
                let before = self.materialize();
                let pos = scale(pos_frac, self.lists[list as usize].len());
                let values: Vec<u32> = (0..len).map(|_| self.fresh()).collect();
                self.lists[list as usize].splice(pos..pos, values);
                let mut changes = Vec::new();
                self.view
                    .list_items_inserted(ListId(list as usize), pos, pos + len as usize, &mut changes);
                self.check_replay(before, &changes);
            }
            FuzzOp::ListRemove { list, pos_frac, len } => {
                let list_len = self.lists[list as usize].len();
                if list_len > 0 {
                    let before = self.materialize();
                    let pos = scale(pos_frac, list_len - 1);
                    let end = (pos + len as usize).min(list_len);
                    self.lists[list as usize].drain(pos..end);
                    let mut changes = Vec::new();
                    self.view.list_items_removed(ListId(list as usize), pos, end, &mut changes);
                    self.check_replay(before, &changes);
                }
            }
            FuzzOp::ListMove { list, start_frac, len, to_frac } => {
                let list_len = self.lists[list as usize].len();
                if list_len > 1 {
                    let len = (len as usize).min(list_len - 1);
                    let start = scale(start_frac, list_len - len);
                    let to = scale(to_frac, list_len - len);
                    if start != to {
                        let before = self.materialize();
                        let items = &mut self.lists[list as usize];
                        let block: Vec<u32> = items.drain(start..start + len).collect();
                        items.splice(to..to, block);
                        let mut changes = Vec::new();
                        self.view
                            .list_items_moved(ListId(list as usize), start, start + len, to, &mut changes);
                        self.check_replay(before, &changes);
                    }
                }
            }
            FuzzOp::ListChange { list, pos_frac, len } => {
                let list_len = self.lists[list as usize].len();
                if list_len > 0 {
                    let before = self.materialize();
                    let pos = scale(pos_frac, list_len - 1);
                    let end = (pos + len as usize).min(list_len);
                    for i in pos..end {
                        let value = self.fresh();
                        self.lists[list as usize][i] = value;
                    }
                    let mut changes = Vec::new();
                    self.view.list_items_changed(ListId(list as usize), pos, end, &mut changes);
                    self.check_replay(before, &changes);
                }
            }
            FuzzOp::RemoveList { list } => {
                let before = self.materialize();
                let mut changes = Vec::new();
                self.view.remove_list(ListId(list as usize), &mut changes);
                self.check_replay(before, &changes);
                assert!(
                    self.view.ranges().iter().all(|r| r.list != Some(ListId(list as usize))),
                    "ranges of list {} survived remove_list",
                    list
                );
            }
            FuzzOp::Compress => {
                let before = self.materialize();
                self.view.compress();
                assert_eq!(before, self.materialize(), "compress changed the view");
            }
        }
        self.check();
    }
}

fn main() {
    fuzz!(|data: &[u8]| {
        let mut world = World::new();
        let mut remaining = data;

        while let Some((op, rest)) = FuzzOp::from_bytes(remaining) {
            remaining = rest;
            world.step(op);
        }

        world.view.clear();
        world.check();
        assert!(world.view.ranges().is_empty(), "clear left ranges behind");
    });
}
