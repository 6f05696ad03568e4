//! Range records: the pieces the merged sequence is built from.
//!
//! A range is a contiguous run of the logical sequence. It either points at a
//! window `[index, index + count)` of an external list, or at `count` items of
//! the internal store. Zero-width Null ranges survive only as anchors that let
//! a later insertion on their boundary resume growth.

use bitflags::bitflags;

/// Opaque identity of an external backing list.
///
/// The compositor only compares handles and hands them back to the owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListId(pub usize);

bitflags! {
    /// Boundary and storage flags carried by a [`Range`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RangeFlags: u8 {
        /// Contributes nothing to the absolute count; a growth anchor.
        const NULL = 1 << 0;
        /// Absorbs list insertions landing exactly on the range's start.
        const PREPEND = 1 << 1;
        /// Absorbs list insertions landing exactly on the range's end.
        const APPEND = 1 << 2;
        /// Items live in the internal store rather than in `list`.
        const INTERNAL = 1 << 3;
    }
}

impl RangeFlags {
    /// Both growth flags.
    pub const GROW: RangeFlags = RangeFlags::PREPEND.union(RangeFlags::APPEND);
}

/// One item of an external list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListItem {
    pub list: ListId,
    pub index: usize,
}

/// A contiguous run of the merged sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    /// The backing list, or `None` for pure internal-store ranges.
    pub list: Option<ListId>,
    /// Start of the window within `list`. Unused for internal ranges.
    pub index: usize,
    /// Number of items this range contributes.
    pub count: usize,
    pub flags: RangeFlags,
}

impl Range {
    /// A window of an external list.
    pub fn list(list: ListId, index: usize, count: usize, grow: bool) -> Range {
        let flags = if grow { RangeFlags::GROW } else { RangeFlags::empty() };
        Range { list: Some(list), index, count, flags }
    }

    /// `count` items held by the internal store.
    pub fn internal(count: usize) -> Range {
        Range {
            list: None,
            index: 0,
            count,
            flags: RangeFlags::INTERNAL,
        }
    }

    /// A zero-width anchor at local position `index` of `list`.
    pub fn anchor(list: ListId, index: usize, growth: RangeFlags) -> Range {
        Range {
            list: Some(list),
            index,
            count: 0,
            flags: RangeFlags::NULL | (growth & RangeFlags::GROW),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.flags.contains(RangeFlags::NULL)
    }

    #[inline]
    pub fn is_internal(&self) -> bool {
        self.flags.contains(RangeFlags::INTERNAL)
    }

    #[inline]
    pub fn prepends(&self) -> bool {
        self.flags.contains(RangeFlags::PREPEND)
    }

    #[inline]
    pub fn appends(&self) -> bool {
        self.flags.contains(RangeFlags::APPEND)
    }

    /// Whether either boundary absorbs insertions.
    #[inline]
    pub fn grows(&self) -> bool {
        self.flags.intersects(RangeFlags::GROW)
    }

    /// One past the last local index of the window.
    #[inline]
    pub fn end(&self) -> usize {
        self.index + self.count
    }

    /// Items this range contributes to the absolute count.
    #[inline]
    pub fn visible(&self) -> usize {
        if self.is_null() {
            return 0;
        }
        self.count
    }

    /// Whether this is a list window (not internal, not an anchor) of `list`.
    #[inline]
    pub fn is_window_of(&self, list: ListId) -> bool {
        self.list == Some(list) && !self.is_internal() && !self.is_null()
    }

    /// Whether the range belongs to `list` and is not internal.
    #[inline]
    pub fn tracks(&self, list: ListId) -> bool {
        self.list == Some(list) && !self.is_internal()
    }

    /// The list this range keeps alive, if any. Internal ranges keep none.
    #[inline]
    pub(crate) fn referenced_list(&self) -> Option<ListId> {
        if self.is_internal() {
            return None;
        }
        self.list
    }

    /// Split at `offset` (`0 < offset < count`) into a left and right piece.
    ///
    /// The cut is not a growth boundary: the left piece loses `APPEND` and the
    /// right piece loses `PREPEND`.
    pub fn split(&self, offset: usize) -> (Range, Range) {
        debug_assert!(offset > 0 && offset < self.count);
        let mut left = *self;
        let mut right = *self;
        left.count = offset;
        left.flags.remove(RangeFlags::APPEND);
        right.count = self.count - offset;
        right.flags.remove(RangeFlags::PREPEND);
        if !self.is_internal() {
            right.index = self.index + offset;
        }
        (left, right)
    }

    /// The anchors left behind when this whole range is taken out of the view.
    ///
    /// Growth flags survive as Null anchors at the window's start and end; a
    /// range without growth flags leaves nothing.
    pub(crate) fn anchors(&self) -> smallvec::SmallVec<[Range; 2]> {
        let mut anchors = smallvec::SmallVec::new();
        let Some(list) = self.referenced_list() else {
            return anchors;
        };
        if self.prepends() {
            anchors.push(Range::anchor(list, self.index, RangeFlags::PREPEND));
        }
        if self.appends() {
            anchors.push(Range::anchor(list, self.end(), RangeFlags::APPEND));
        }
        anchors
    }

    /// Join `self` with the range directly after it, if that changes nothing
    /// about which items are visible or where growth is absorbed.
    pub(crate) fn coalesce(&self, next: &Range) -> Option<Range> {
        if self.list != next.list {
            return None;
        }
        if self.is_null() && next.is_null() {
            if self.index != next.index {
                return None;
            }
            let mut merged = *self;
            merged.flags |= next.flags;
            return Some(merged);
        }
        if self.is_null() || next.is_null() {
            return None;
        }
        if self.is_internal() && next.is_internal() {
            let mut merged = *self;
            merged.count += next.count;
            return Some(merged);
        }
        if self.is_internal() || next.is_internal() {
            return None;
        }
        if self.end() != next.index || self.appends() || next.prepends() {
            return None;
        }
        Some(Range {
            list: self.list,
            index: self.index,
            count: self.count + next.count,
            flags: (self.flags & RangeFlags::PREPEND) | (next.flags & RangeFlags::APPEND),
        })
    }
}
