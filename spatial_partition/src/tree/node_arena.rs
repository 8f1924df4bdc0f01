/// NodeArena: stable-index storage for lazily created tree nodes.
///
/// Nodes only exist for cells that hold at least one record in their
/// subtree. They are created on the insertion path and released by the
/// facade as soon as their subtree count drops to zero. Slot indices are
/// stable for a node's lifetime and recycled afterwards.
///
/// Every node's slot is greater than its parent's slot: new nodes are
/// placed in the first free slot after the parent, or in a fresh slot.
/// A single pass in slot order therefore always visits parents first.

use rustc_hash::FxHashMap;
use glam::Vec3;
use crate::math::Aabb;
use crate::morton::MortonCode;
use crate::utils::SlotAllocator;
use super::record::CellList;

/// One tree node.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub(crate) morton_code: MortonCode,
    pub(crate) parent: Option<u32>,
    /// Records attached to this node or any descendant
    pub(crate) subtree_object_count: u32,
    /// Records attached directly to this node
    pub(crate) cell: CellList,
    /// Tight cell bounds
    pub(crate) bounds: Aabb,
}

impl TreeNode {
    pub fn morton_code(&self) -> MortonCode {
        self.morton_code
    }

    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    pub fn subtree_object_count(&self) -> u32 {
        self.subtree_object_count
    }

    /// Number of records attached directly to this node
    pub fn record_count(&self) -> u32 {
        self.cell.len()
    }

    /// Exact cell bounds
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Cell bounds with the extent doubled around the cell center
    pub fn loose_bounds(&self) -> Aabb {
        Aabb::from_center_extent(self.bounds.center(), self.bounds.extent() * 2.0)
    }

    /// Cell center
    pub fn center(&self) -> Vec3 {
        self.bounds.center()
    }
}

/// Sparse node storage plus the Morton code → slot lookup.
pub struct NodeArena {
    nodes: Vec<Option<TreeNode>>,
    slots: SlotAllocator,
    morton_to_index: FxHashMap<MortonCode, u32>,
    /// Bumped whenever a recycled slot is reused
    version: u32,
}

impl NodeArena {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            slots: SlotAllocator::new(),
            morton_to_index: FxHashMap::default(),
            version: 0,
        }
    }

    /// Create the node for `morton_code`, or return the existing one.
    ///
    /// The new node starts with a subtree count of 0; the caller accounts
    /// for the record being inserted. `free_index_hint` selects a recycled
    /// slot; it is ignored unless it is on the free list and after the
    /// parent's slot. A child always lands after its parent.
    pub fn create_node(
        &mut self,
        free_index_hint: Option<u32>,
        morton_code: MortonCode,
        parent: Option<u32>,
        bounds: Aabb,
    ) -> u32 {
        if let Some(&index) = self.morton_to_index.get(&morton_code) {
            return index;
        }

        let fresh_slot = self.slots.high_water_mark();
        let index = match parent {
            // Children must land after their parent
            Some(parent) => {
                let hint = free_index_hint
                    .filter(|&hint| hint > parent && self.slots.is_free(hint))
                    .or_else(|| self.slots.first_free_after(parent));
                match hint {
                    Some(_) => self.slots.alloc_hint(hint),
                    None => self.slots.alloc_fresh(),
                }
            }
            None => self.slots.alloc_hint(free_index_hint),
        };
        if index < fresh_slot {
            // Per-slot caches built before this call no longer describe this slot
            self.version = self.version.wrapping_add(1).max(1);
        }

        let node = TreeNode {
            morton_code,
            parent,
            subtree_object_count: 0,
            cell: CellList::default(),
            bounds,
        };

        let slot = index as usize;
        if slot == self.nodes.len() {
            self.nodes.push(Some(node));
        } else {
            debug_assert!(self.nodes[slot].is_none(), "slot {} is still occupied", slot);
            self.nodes[slot] = Some(node);
        }

        self.morton_to_index.insert(morton_code, index);
        index
    }

    /// Remove a node and recycle its slot.
    pub fn release_node(&mut self, index: u32) -> Option<TreeNode> {
        let node = self.nodes.get_mut(index as usize)?.take()?;
        debug_assert_eq!(node.subtree_object_count, 0, "releasing a non-empty node");
        debug_assert!(node.cell.is_empty(), "releasing a node with attached records");

        self.morton_to_index.remove(&node.morton_code);
        self.slots.free(index);
        Some(node)
    }

    /// Slot of the node for `morton_code`, if it exists
    pub fn find(&self, morton_code: MortonCode) -> Option<u32> {
        self.morton_to_index.get(&morton_code).copied()
    }

    pub fn get(&self, index: u32) -> Option<&TreeNode> {
        self.nodes.get(index as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut TreeNode> {
        self.nodes.get_mut(index as usize)?.as_mut()
    }

    /// Smallest recycled slot after `index`, used as the creation hint for
    /// children of the node at `index`.
    pub fn first_free_index_after(&self, index: u32) -> Option<u32> {
        self.slots.first_free_after(index)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.morton_to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.morton_to_index.is_empty()
    }

    /// Number of slots, live or free. Per-slot caches must be this long.
    pub fn slot_capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Live nodes in slot order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &TreeNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| node.as_ref().map(|node| (index as u32, node)))
    }

    /// Drop every node and forget all slots
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.slots.clear();
        self.morton_to_index.clear();
        self.version = self.version.wrapping_add(1).max(1);
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "node_arena_tests.rs"]
mod tests;
