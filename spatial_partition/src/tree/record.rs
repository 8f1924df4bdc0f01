/// Per-object records and the intrusive lists that attach them to cells.
///
/// Records live in a generation-checked `SlotMap`; list links are record
/// keys rather than pointers, so a stale link can never reach a reused slot
/// silently.

use slotmap::{new_key_type, SlotMap};
use glam::Vec3;
use crate::math::Aabb;
use crate::morton::{MortonCode, OVERSIZED};

new_key_type! {
    /// Handle to a record, returned by `add_record` and passed back on
    /// update and removal. Goes stale once the record is removed.
    pub struct RecordKey;
}

/// One tracked object.
#[derive(Debug, Clone)]
pub struct SpatialRecord<T> {
    pub(crate) uid: u64,
    pub(crate) bounds: Aabb,
    /// Code of the owning node; `OVERSIZED` while in the oversized list
    pub(crate) node_morton_code: MortonCode,
    /// Arena slot of the owning node; `None` while in the oversized list
    pub(crate) node_index: Option<u32>,
    pub(crate) bounds_version: u32,
    pub(crate) prev: Option<RecordKey>,
    pub(crate) next: Option<RecordKey>,
    pub(crate) user_data: T,
}

impl<T> SpatialRecord<T> {
    /// Unique id, increasing in insertion order
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// World-space box as last passed to `add_record`/`update_record`
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn center(&self) -> Vec3 {
        self.bounds.center()
    }

    pub fn extent(&self) -> Vec3 {
        self.bounds.extent()
    }

    pub fn node_morton_code(&self) -> MortonCode {
        self.node_morton_code
    }

    pub fn node_index(&self) -> Option<u32> {
        self.node_index
    }

    /// Bumped on every bounds change; never 0 for a live record.
    pub fn bounds_version(&self) -> u32 {
        self.bounds_version
    }

    pub fn is_oversized(&self) -> bool {
        self.node_morton_code == OVERSIZED
    }

    pub fn user_data(&self) -> &T {
        &self.user_data
    }
}

/// Head of an intrusive doubly linked record list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellList {
    pub(crate) head: Option<RecordKey>,
    pub(crate) len: u32,
}

impl CellList {
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Push `key` at the front of `list`. The record must not be in any list.
pub(crate) fn link_front<T>(
    records: &mut SlotMap<RecordKey, SpatialRecord<T>>,
    list: &mut CellList,
    key: RecordKey,
) {
    let old_head = list.head;
    if let Some(record) = records.get_mut(key) {
        debug_assert!(record.prev.is_none() && record.next.is_none(), "record is already linked");
        record.prev = None;
        record.next = old_head;
    }
    if let Some(head) = old_head {
        if let Some(head) = records.get_mut(head) {
            head.prev = Some(key);
        }
    }
    list.head = Some(key);
    list.len += 1;
}

/// Detach `key` from `list` in O(1).
pub(crate) fn unlink<T>(
    records: &mut SlotMap<RecordKey, SpatialRecord<T>>,
    list: &mut CellList,
    key: RecordKey,
) {
    let Some(record) = records.get_mut(key) else {
        return;
    };
    let prev = record.prev.take();
    let next = record.next.take();

    match prev {
        Some(prev) => {
            if let Some(prev) = records.get_mut(prev) {
                prev.next = next;
            }
        }
        None => {
            debug_assert_eq!(list.head, Some(key), "record is not in this list");
            list.head = next;
        }
    }
    if let Some(next) = next {
        if let Some(next) = records.get_mut(next) {
            next.prev = prev;
        }
    }
    list.len -= 1;
}

/// Walks a cell list front to back.
pub(crate) struct CellIter<'a, T> {
    records: &'a SlotMap<RecordKey, SpatialRecord<T>>,
    next: Option<RecordKey>,
}

impl<'a, T> CellIter<'a, T> {
    pub(crate) fn new(records: &'a SlotMap<RecordKey, SpatialRecord<T>>, list: &CellList) -> Self {
        Self { records, next: list.head }
    }
}

impl<'a, T> Iterator for CellIter<'a, T> {
    type Item = (RecordKey, &'a SpatialRecord<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.next?;
        let record = self.records.get(key)?;
        self.next = record.next;
        Some((key, record))
    }
}
