//! List Compositor - merge several mutable lists into one indexed sequence.
//!
//! A [`Compositor`] stitches windows of external lists and items owned by an
//! [`InternalStore`] into a single sequence with absolute indices. Backing
//! lists report their own edits through the translator entry points, which
//! answer with [`ChangeRecord`]s describing the effect on the merged view.
//!
//! # Quick Start
//!
//! ```
//! use list_compositor::{ChangeRecord, Compositor, ListId, Slot, VecStore};
//!
//! let notes = ListId(0);
//! let mut view = Compositor::new(VecStore::new());
//!
//! // Show the first three notes, then a locally owned header.
//! view.append_list(notes, 0, 3, true);
//! view.insert_data(0, "header").unwrap();
//! assert_eq!(view.count(), 4);
//! assert_eq!(view.slot(0), Slot::Internal(0));
//!
//! // The notes list grew at its end; the growing window absorbs the item.
//! let mut changes = Vec::new();
//! view.list_items_inserted(notes, 3, 4, &mut changes);
//! assert_eq!(changes, vec![ChangeRecord::Insert { start: 4, end: 5 }]);
//! assert_eq!(view.count(), 5);
//! ```

pub mod change;
pub mod compositor;
pub mod error;
pub mod store;

pub use change::ChangeRecord;
pub use compositor::range::{ListId, ListItem, Range, RangeFlags};
pub use compositor::{Compositor, Location, Slot};
pub use error::{CompositorError, IntegrityError, StoreError};
pub use store::{InternalStore, VecStore};
