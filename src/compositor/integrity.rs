//! Structural self-checks.

use super::Compositor;
use crate::error::IntegrityError;
use crate::store::InternalStore;

impl<S: InternalStore> Compositor<S> {
    /// Verify the range store against its counters.
    ///
    /// Returns the first violation found. A violation is a bug in the
    /// compositor, never caller misuse.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        let mut absolute = 0;
        let mut internal = 0;
        for (position, range) in self.ranges.iter().enumerate() {
            if range.is_null() {
                if range.is_internal() && range.count > 0 {
                    return Err(IntegrityError::NullInternal { position, count: range.count });
                }
                if range.count > 0 {
                    return Err(IntegrityError::NullWithItems { position, count: range.count });
                }
                continue;
            }
            if range.count == 0 {
                return Err(IntegrityError::Empty { position });
            }
            if range.list.is_none() && !range.is_internal() {
                return Err(IntegrityError::Unbacked { position });
            }
            absolute += range.count;
            if range.is_internal() {
                internal += range.count;
            }
        }
        if absolute != self.absolute_count {
            return Err(IntegrityError::AbsoluteCount {
                expected: self.absolute_count,
                actual: absolute,
            });
        }
        if internal != self.internal_count {
            return Err(IntegrityError::InternalCount {
                expected: self.internal_count,
                actual: internal,
            });
        }
        Ok(())
    }

    #[cfg(any(debug_assertions, feature = "integrity-checks"))]
    pub(super) fn check_invariants(&self) {
        if let Err(violation) = self.check_integrity() {
            panic!("INVARIANT VIOLATED: {}\nranges: {:?}", violation, self.ranges);
        }
    }

    #[cfg(not(any(debug_assertions, feature = "integrity-checks")))]
    #[inline(always)]
    pub(super) fn check_invariants(&self) {}
}

#[cfg(test)]
mod tests {
    use crate::compositor::range::{ListId, Range, RangeFlags};
    use crate::error::IntegrityError;
    use crate::store::VecStore;
    use crate::Compositor;

    fn corrupt(ranges: Vec<Range>, absolute: usize, internal: usize) -> Compositor<VecStore<()>> {
        let mut c = Compositor::new(VecStore::new());
        c.ranges = ranges;
        c.absolute_count = absolute;
        c.internal_count = internal;
        c
    }

    #[test]
    fn detects_count_mismatch() {
        let c = corrupt(vec![Range::list(ListId(0), 0, 3, false)], 2, 0);
        assert_eq!(
            c.check_integrity(),
            Err(IntegrityError::AbsoluteCount { expected: 2, actual: 3 })
        );
        let c = corrupt(vec![Range::internal(3)], 3, 1);
        assert_eq!(
            c.check_integrity(),
            Err(IntegrityError::InternalCount { expected: 1, actual: 3 })
        );
    }

    #[test]
    fn detects_null_internal_with_items() {
        let bad = Range {
            list: None,
            index: 0,
            count: 2,
            flags: RangeFlags::NULL | RangeFlags::INTERNAL,
        };
        let c = corrupt(vec![bad], 0, 0);
        assert_eq!(
            c.check_integrity(),
            Err(IntegrityError::NullInternal { position: 0, count: 2 })
        );
    }

    #[test]
    fn detects_empty_and_unbacked_ranges() {
        let c = corrupt(vec![Range::list(ListId(0), 0, 0, false)], 0, 0);
        assert_eq!(c.check_integrity(), Err(IntegrityError::Empty { position: 0 }));

        let unbacked = Range { list: None, index: 0, count: 1, flags: RangeFlags::empty() };
        let c = corrupt(vec![unbacked], 1, 0);
        assert_eq!(c.check_integrity(), Err(IntegrityError::Unbacked { position: 0 }));
    }
}
