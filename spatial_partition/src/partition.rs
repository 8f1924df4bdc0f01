/// SpatialPartition: persistent loose-octree index over object bounds.
///
/// Objects are registered once with `add_record`, moved with
/// `update_record` whenever their world box changes, and removed with
/// `remove_record`. Each record lives in exactly one container: the cell
/// list of the tree node matching its Morton code, or the oversized list
/// when it fits no cell.
///
/// Nodes are created lazily along the insertion path and pruned as soon as
/// their subtree holds no record, so an empty partition holds no node.
///
/// The partition is payload-agnostic: `T` is whatever handle the caller
/// uses to identify an object (a renderable key, a light key, an enum of
/// both). It is stored and handed back by queries, never inspected.
///
/// Ownership: the owning level/scene creates one partition and passes it
/// to whoever needs it. There is no global instance.

use std::collections::BTreeMap;
use slotmap::SlotMap;
use crate::config::SpatialConfig;
use crate::error::{Error, Result};
use crate::math::Aabb;
use crate::morton::{
    lowest_common_ancestor, parent_of, MortonCode, WorldGrid, OVERSIZED, TREE_DIMENSIONS,
};
use crate::tree::{link_front, unlink, CellIter, CellList, NodeArena, RecordKey, SpatialRecord, TreeNode};

/// Records are reserved in blocks of this many slots.
pub const RECORD_POOL_CHUNK: usize = 512;

const SOURCE: &str = "sps::SpatialPartition";

/// Spatial index over axis-aligned boxes of scene objects.
pub struct SpatialPartition<T> {
    pub(crate) config: SpatialConfig,
    pub(crate) grid: WorldGrid,
    pub(crate) nodes: NodeArena,
    pub(crate) records: SlotMap<RecordKey, SpatialRecord<T>>,
    /// Records that fit no cell
    pub(crate) oversized: CellList,
    /// UID → record, for enumeration in insertion order
    objects: BTreeMap<u64, RecordKey>,
    next_uid: u64,
}

impl<T> SpatialPartition<T> {
    /// Log errors before returning them
    fn log_and_return_error(error: Error) -> Error {
        crate::sps_error!(SOURCE, "{}", error);
        error
    }

    /// Create an empty partition for the given world.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the config does not validate.
    pub fn new(config: SpatialConfig) -> Result<Self> {
        config.validate().map_err(Self::log_and_return_error)?;

        let grid = WorldGrid::new(&config);
        crate::sps_info!(
            SOURCE,
            "World center {}, extent {}, max depth {}",
            grid.center(), grid.extent(), grid.max_depth()
        );

        Ok(Self {
            config,
            grid,
            nodes: NodeArena::new(),
            records: SlotMap::with_capacity_and_key(RECORD_POOL_CHUNK),
            oversized: CellList::default(),
            objects: BTreeMap::new(),
            next_uid: 0,
        })
    }

    /// Reconfigure the world.
    ///
    /// Every existing record is discarded and its handle goes stale; callers
    /// are expected to re-add their objects afterwards.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` (and leaves the partition untouched)
    /// if the config does not validate.
    pub fn init(&mut self, config: SpatialConfig) -> Result<()> {
        config.validate().map_err(Self::log_and_return_error)?;

        if !self.is_empty() {
            crate::sps_warn!(
                SOURCE,
                "Reconfiguring with {} live records; their handles are now stale",
                self.len()
            );
        }
        self.clear();

        self.config = config;
        self.grid = WorldGrid::new(&config);
        crate::sps_info!(
            SOURCE,
            "World center {}, extent {}, max depth {}",
            self.grid.center(), self.grid.extent(), self.grid.max_depth()
        );
        Ok(())
    }

    // ===== MUTATION =====

    /// Start tracking an object.
    ///
    /// The record goes to the deepest cell that fits `bounds`, or to the
    /// oversized list. Returns the handle to pass to `update_record` and
    /// `remove_record`.
    pub fn add_record(&mut self, bounds: &Aabb, user_data: T) -> RecordKey {
        if self.records.len() == self.records.capacity() {
            self.records.reserve(RECORD_POOL_CHUNK);
        }

        let code = self.grid.morton_code_for(bounds);
        let uid = self.next_uid;
        self.next_uid += 1;

        let key = self.records.insert(SpatialRecord {
            uid,
            bounds: *bounds,
            node_morton_code: code,
            node_index: None,
            bounds_version: 1,
            prev: None,
            next: None,
            user_data,
        });

        if code == OVERSIZED {
            crate::sps_trace!(
                SOURCE,
                "Record {} (center {}, extent {}) fits no cell, kept as oversized",
                uid, bounds.center(), bounds.extent()
            );
        }

        let node_index = self.add_to_node(code, OVERSIZED);
        if let Some(record) = self.records.get_mut(key) {
            record.node_index = node_index;
        }
        self.link(key, node_index);
        self.objects.insert(uid, key);
        key
    }

    /// Refresh an object's box.
    ///
    /// An identical box is a no-op. Otherwise the box is stored and its
    /// version bumped; the record only moves when its Morton code changes,
    /// and then only the nodes below the lowest common ancestor of the old
    /// and new cells are touched. Returns `true` if the record moved.
    ///
    /// `key` must be live; a stale key trips a debug assertion and is
    /// ignored in release builds.
    pub fn update_record(&mut self, key: RecordKey, bounds: &Aabb) -> bool {
        debug_assert!(self.records.contains_key(key), "update_record on a stale handle");
        let grid = self.grid;
        let Some(record) = self.records.get_mut(key) else {
            return false;
        };

        if record.bounds == *bounds {
            return false;
        }
        record.bounds = *bounds;
        record.bounds_version = record.bounds_version.wrapping_add(1).max(1);

        let old_code = record.node_morton_code;
        let old_index = record.node_index;
        let new_code = grid.morton_code_for(bounds);
        if new_code == old_code {
            return false;
        }

        self.unlink(key, old_index);
        let stop = lowest_common_ancestor(old_code, new_code);
        self.remove_from_node(old_index, old_code, stop);
        let new_index = self.add_to_node(new_code, stop);

        if let Some(record) = self.records.get_mut(key) {
            record.node_morton_code = new_code;
            record.node_index = new_index;
        }
        self.link(key, new_index);
        true
    }

    /// Stop tracking an object and hand its payload back.
    ///
    /// `key` must be live; a stale key trips a debug assertion and returns
    /// `None` in release builds.
    pub fn remove_record(&mut self, key: RecordKey) -> Option<T> {
        debug_assert!(self.records.contains_key(key), "remove_record on a stale handle");
        let record = self.records.get(key)?;
        let (code, node_index, uid) = (record.node_morton_code, record.node_index, record.uid);

        self.unlink(key, node_index);
        self.remove_from_node(node_index, code, OVERSIZED);
        self.objects.remove(&uid);
        self.records.remove(key).map(|record| record.user_data)
    }

    /// Drop every record and node. All handles go stale.
    pub fn clear(&mut self) {
        if !self.is_empty() {
            crate::sps_trace!(
                SOURCE,
                "Clearing {} records ({} oversized) and {} nodes",
                self.len(), self.oversized.len(), self.nodes.len()
            );
        }
        self.records.clear();
        self.nodes.clear();
        self.oversized = CellList::default();
        self.objects.clear();
    }

    // ===== TREE MAINTENANCE =====

    /// Account for one record in the node for `code` and its ancestors up to
    /// (excluding) `stop`, creating missing nodes on the way down.
    fn add_to_node(&mut self, code: MortonCode, stop: MortonCode) -> Option<u32> {
        if code == OVERSIZED {
            return None;
        }

        // Find the deepest existing ancestor-or-self
        let mut missing = 0u32;
        let mut curr = code;
        let existing = loop {
            if let Some(index) = self.nodes.find(curr) {
                break Some(index);
            }
            missing += 1;
            curr = parent_of(curr);
            if curr == OVERSIZED {
                break None;
            }
        };

        // Existing nodes on the path gain one record
        let mut index = existing;
        while curr != stop {
            let Some(node) = index.and_then(|i| self.nodes.get_mut(i)) else {
                break;
            };
            node.subtree_object_count += 1;
            index = node.parent;
            curr = parent_of(curr);
        }

        // Create the missing tail, parent first
        let mut parent = existing;
        for level in (0..missing).rev() {
            let node_code = code >> (TREE_DIMENSIONS * level);
            let hint = parent.and_then(|p| self.nodes.first_free_index_after(p));
            let bounds = self.grid.node_aabb(node_code, false);
            let created = self.nodes.create_node(hint, node_code, parent, bounds);
            if let Some(node) = self.nodes.get_mut(created) {
                node.subtree_object_count = 1;
            }
            parent = Some(created);
        }

        parent
    }

    /// Remove one record from the node at `index` (code `code`) and its
    /// ancestors up to (excluding) `stop`, releasing nodes that become empty.
    fn remove_from_node(&mut self, index: Option<u32>, code: MortonCode, stop: MortonCode) {
        let mut index = index;
        let mut code = code;
        while code != stop {
            let Some(i) = index else {
                break;
            };
            let Some(node) = self.nodes.get_mut(i) else {
                break;
            };
            let parent = node.parent;
            debug_assert!(node.subtree_object_count > 0, "subtree count underflow at node {}", i);
            node.subtree_object_count -= 1;
            if node.subtree_object_count == 0 {
                self.nodes.release_node(i);
            }
            index = parent;
            code = parent_of(code);
        }
    }

    fn link(&mut self, key: RecordKey, node_index: Option<u32>) {
        match node_index {
            Some(index) => {
                if let Some(node) = self.nodes.get_mut(index) {
                    link_front(&mut self.records, &mut node.cell, key);
                }
            }
            None => link_front(&mut self.records, &mut self.oversized, key),
        }
    }

    fn unlink(&mut self, key: RecordKey, node_index: Option<u32>) {
        match node_index {
            Some(index) => {
                if let Some(node) = self.nodes.get_mut(index) {
                    unlink(&mut self.records, &mut node.cell, key);
                }
            }
            None => unlink(&mut self.records, &mut self.oversized, key),
        }
    }

    // ===== ACCESSORS =====

    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    pub fn record(&self, key: RecordKey) -> Option<&SpatialRecord<T>> {
        self.records.get(key)
    }

    /// Like `record`, but reports a stale handle as an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::StaleHandle` if the record was removed.
    pub fn try_record(&self, key: RecordKey) -> Result<&SpatialRecord<T>> {
        self.records.get(key).ok_or(Error::StaleHandle)
    }

    pub fn user_data(&self, key: RecordKey) -> Option<&T> {
        self.records.get(key).map(|record| &record.user_data)
    }

    pub fn user_data_mut(&mut self, key: RecordKey) -> Option<&mut T> {
        self.records.get_mut(key).map(|record| &mut record.user_data)
    }

    pub fn contains(&self, key: RecordKey) -> bool {
        self.records.contains_key(key)
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record slots reserved so far. Grows in `RECORD_POOL_CHUNK` steps, never shrinks.
    pub fn record_capacity(&self) -> usize {
        self.records.capacity()
    }

    /// All records in insertion order, independent of tree shape
    pub fn records(&self) -> impl Iterator<Item = (RecordKey, &SpatialRecord<T>)> + '_ {
        self.objects
            .values()
            .filter_map(|&key| self.records.get(key).map(|record| (key, record)))
    }

    pub fn oversized_count(&self) -> usize {
        self.oversized.len() as usize
    }

    /// Payloads of the oversized records
    pub fn oversized(&self) -> impl Iterator<Item = &T> + '_ {
        CellIter::new(&self.records, &self.oversized).map(|(_, record)| &record.user_data)
    }

    /// Number of live tree nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Live nodes in slot order
    pub fn nodes(&self) -> impl Iterator<Item = (u32, &TreeNode)> + '_ {
        self.nodes.iter()
    }

    pub fn node(&self, index: u32) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    /// Node for a Morton code, if it currently exists
    pub fn node_for_code(&self, code: MortonCode) -> Option<&TreeNode> {
        self.nodes.find(code).and_then(|index| self.nodes.get(index))
    }

    /// Records attached directly to the node at `index`
    pub fn node_records(&self, index: u32) -> impl Iterator<Item = (RecordKey, &SpatialRecord<T>)> + '_ {
        let list = self.nodes.get(index).map(|node| node.cell).unwrap_or_default();
        CellIter::new(&self.records, &list)
    }

    /// Cell bounds for a code. `code` must not be `OVERSIZED`.
    pub fn node_aabb(&self, code: MortonCode, loose: bool) -> Aabb {
        self.grid.node_aabb(code, loose)
    }

    /// Code a box would get in this partition
    pub fn calculate_morton_code(&self, bounds: &Aabb) -> MortonCode {
        self.grid.morton_code_for(bounds)
    }

    /// Changes whenever node slots are recycled. `update_node_visibility`
    /// compares it to decide between a partial and a full pass.
    pub fn tree_version(&self) -> u32 {
        self.nodes.version()
    }

    // ===== CONSISTENCY =====

    /// Walk the whole structure and check every invariant.
    ///
    /// Meant for tests and debug tooling; cost is linear in nodes and records
    /// times tree depth.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvariantViolation` describing the first broken invariant.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::InvariantViolation(msg));
        let mut expected_counts: BTreeMap<u32, u32> = BTreeMap::new();
        let mut linked = 0usize;

        for (index, node) in self.nodes.iter() {
            if self.nodes.find(node.morton_code) != Some(index) {
                return fail(format!("node {} is not registered under code {:#x}", index, node.morton_code));
            }

            match node.parent {
                Some(parent_index) => {
                    let Some(parent) = self.nodes.get(parent_index) else {
                        return fail(format!("node {} has a dead parent {}", index, parent_index));
                    };
                    if parent.morton_code != parent_of(node.morton_code) {
                        return fail(format!("node {} is linked to the wrong parent", index));
                    }
                    if parent_index >= index {
                        return fail(format!("node {} sits before its parent {}", index, parent_index));
                    }
                }
                None => {
                    if parent_of(node.morton_code) != OVERSIZED {
                        return fail(format!("non-root node {} has no parent", index));
                    }
                }
            }

            let mut cell_len = 0u32;
            for (key, record) in CellIter::new(&self.records, &node.cell) {
                if record.node_index != Some(index) || record.node_morton_code != node.morton_code {
                    return fail(format!("record {:?} is listed in node {} but points elsewhere", key, index));
                }
                cell_len += 1;
            }
            if cell_len != node.cell.len() {
                return fail(format!("node {} lists {} records but counts {}", index, cell_len, node.cell.len()));
            }
            linked += cell_len as usize;

            // Credit this cell to the node and all its ancestors
            let mut walk = Some(index);
            while let Some(i) = walk {
                *expected_counts.entry(i).or_insert(0) += cell_len;
                walk = self.nodes.get(i).and_then(|n| n.parent);
            }
        }

        for (index, node) in self.nodes.iter() {
            let expected = expected_counts.get(&index).copied().unwrap_or(0);
            if expected == 0 {
                return fail(format!("node {} is empty but still allocated", index));
            }
            if node.subtree_object_count != expected {
                return fail(format!(
                    "node {} counts {} records in its subtree, found {}",
                    index, node.subtree_object_count, expected
                ));
            }
        }

        let mut oversized_len = 0u32;
        for (key, record) in CellIter::new(&self.records, &self.oversized) {
            if record.node_index.is_some() || record.node_morton_code != OVERSIZED {
                return fail(format!("record {:?} is in the oversized list but has a node", key));
            }
            oversized_len += 1;
        }
        if oversized_len != self.oversized.len() {
            return fail(format!("oversized list holds {} records but counts {}", oversized_len, self.oversized.len()));
        }
        linked += oversized_len as usize;

        if linked != self.records.len() {
            return fail(format!("{} records are live but {} are linked", self.records.len(), linked));
        }
        if self.objects.len() != self.records.len() {
            return fail(format!("{} records are live but {} are enumerable", self.records.len(), self.objects.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "partition_tests.rs"]
mod tests;
