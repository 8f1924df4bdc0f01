/// Frustum queries over a `SpatialPartition`.
///
/// Hierarchical traversal with three-state culling:
/// - `Outside` → skip the node and its entire subtree
/// - `Inside` → emit every record below without further plane tests
/// - `Clipped` → test the node's own records individually, then recurse
///
/// Nodes are tested with their loose bounds (twice the cell size) since a
/// record only has its center inside the cell. Oversized records are never
/// culled.

use glam::Mat4;
use crate::math::{ClipStatus, Frustum};
use crate::morton::{child_of, depth_of, MortonCode, ROOT_CODE};
use crate::partition::SpatialPartition;
use crate::tree::CellIter;

/// Counters filled by a single query.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueryStats {
    /// Nodes whose cell was emitted or scanned
    pub nodes_visited: u32,
    /// Nodes rejected by a plane test (their subtree is skipped)
    pub nodes_culled: u32,
    /// Node AABB plane tests
    pub node_tests: u32,
    /// Record AABB plane tests
    pub object_tests: u32,
    /// Payloads appended to the output
    pub objects_emitted: u32,
}

impl<T: Clone> SpatialPartition<T> {
    /// Collect payloads of every record potentially visible through `view_proj`.
    ///
    /// Results are appended to `out` in no particular order. Oversized records
    /// are always included.
    pub fn query_visible(&self, view_proj: &Mat4, out: &mut Vec<T>) -> QueryStats {
        let frustum = Frustum::from_view_projection(view_proj);
        self.query_frustum(&frustum, out)
    }

    /// Same as `query_visible` with prebuilt planes.
    pub fn query_frustum(&self, frustum: &Frustum, out: &mut Vec<T>) -> QueryStats {
        let mut stats = QueryStats::default();
        let start = out.len();

        out.extend(
            CellIter::new(&self.records, &self.oversized).map(|(_, record)| record.user_data.clone()),
        );

        if let Some(root) = self.nodes.find(ROOT_CODE) {
            self.query_recursive(root, frustum, ClipStatus::Clipped, out, &mut stats);
        }

        stats.objects_emitted = (out.len() - start) as u32;
        stats
    }

    fn query_recursive(
        &self,
        node_idx: u32,
        frustum: &Frustum,
        parent_status: ClipStatus,
        out: &mut Vec<T>,
        stats: &mut QueryStats,
    ) {
        let Some(node) = self.nodes.get(node_idx) else {
            return;
        };

        let status = match parent_status {
            ClipStatus::Clipped => {
                stats.node_tests += 1;
                frustum.classify_aabb(&node.loose_bounds())
            }
            inherited => inherited,
        };

        match status {
            ClipStatus::Outside => {
                stats.nodes_culled += 1;
            }

            ClipStatus::Inside => {
                // Everything in this subtree is visible
                self.collect_all(node_idx, out, stats);
            }

            ClipStatus::Clipped => {
                stats.nodes_visited += 1;
                for (_, record) in CellIter::new(&self.records, &node.cell) {
                    stats.object_tests += 1;
                    if frustum.classify_aabb(&record.bounds) != ClipStatus::Outside {
                        out.push(record.user_data.clone());
                    }
                }

                self.for_each_child(node.morton_code, |child_idx| {
                    self.query_recursive(child_idx, frustum, ClipStatus::Clipped, out, stats);
                });
            }
        }
    }

    /// Emit a node's records and its whole subtree without plane tests.
    fn collect_all(&self, node_idx: u32, out: &mut Vec<T>, stats: &mut QueryStats) {
        let Some(node) = self.nodes.get(node_idx) else {
            return;
        };

        stats.nodes_visited += 1;
        out.extend(
            CellIter::new(&self.records, &node.cell).map(|(_, record)| record.user_data.clone()),
        );

        self.for_each_child(node.morton_code, |child_idx| {
            self.collect_all(child_idx, out, stats);
        });
    }
}

/// Per-slot node classification kept between frames.
///
/// Valid for one frustum and one `tree_version()`. Feed it back to
/// `update_node_visibility` every frame; call `invalidate` when the camera
/// moves.
#[derive(Debug, Default, Clone)]
pub struct NodeVisibility {
    statuses: Vec<ClipStatus>,
    tree_version: u32,
}

impl NodeVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// One status per node slot; free slots read `Outside`
    pub fn statuses(&self) -> &[ClipStatus] {
        &self.statuses
    }

    /// Status of a node slot, `Outside` for slots not covered
    pub fn status(&self, index: u32) -> ClipStatus {
        self.statuses
            .get(index as usize)
            .copied()
            .unwrap_or(ClipStatus::Outside)
    }

    /// Drop every cached status so the next update does a full pass
    pub fn invalidate(&mut self) {
        self.statuses.clear();
    }
}

impl<T> SpatialPartition<T> {
    /// Classify every node slot against `frustum` in one flat pass.
    ///
    /// `out` is resized to the arena's slot capacity; free slots read
    /// `Outside`. Children inherit `Inside`/`Outside` from their parent and
    /// are only tested when the parent is `Clipped`. Relies on every child
    /// sitting in a higher slot than its parent.
    pub fn classify_nodes(&self, frustum: &Frustum, out: &mut Vec<ClipStatus>) {
        out.clear();
        self.classify_slots(frustum, out, 0);
    }

    /// Bring a cached classification up to date with the tree.
    ///
    /// While `tree_version()` is unchanged, nodes are only ever added in fresh
    /// slots past the cached ones, so only those are classified; released
    /// slots are reset to `Outside`. Otherwise the whole arena is classified
    /// again. The frustum is assumed to be the one the cache was built with.
    ///
    /// Returns the number of slots classified in this call.
    pub fn update_node_visibility(&self, frustum: &Frustum, cache: &mut NodeVisibility) -> u32 {
        let version = self.nodes.version();
        if cache.tree_version != version || cache.statuses.len() > self.nodes.slot_capacity() {
            cache.statuses.clear();
            cache.tree_version = version;
        }

        let first_slot = cache.statuses.len();
        self.classify_slots(frustum, &mut cache.statuses, first_slot)
    }

    /// Flat classification of slots from `first_slot` on. Earlier entries are
    /// trusted, except that free slots are reset to `Outside`.
    fn classify_slots(&self, frustum: &Frustum, statuses: &mut Vec<ClipStatus>, first_slot: usize) -> u32 {
        statuses.resize(self.nodes.slot_capacity(), ClipStatus::Outside);

        let mut classified = 0;
        for slot in 0..statuses.len() {
            let Some(node) = self.nodes.get(slot as u32) else {
                statuses[slot] = ClipStatus::Outside;
                continue;
            };
            if slot < first_slot {
                continue;
            }

            let inherited = node
                .parent
                .and_then(|parent| statuses.get(parent as usize).copied());

            statuses[slot] = match inherited {
                Some(ClipStatus::Outside) => ClipStatus::Outside,
                Some(ClipStatus::Inside) => ClipStatus::Inside,
                _ => frustum.classify_aabb(&node.loose_bounds()),
            };
            classified += 1;
        }
        classified
    }

    /// Call `f` with the slot of every existing child of `code`.
    fn for_each_child(&self, code: MortonCode, mut f: impl FnMut(u32)) {
        if depth_of(code) >= self.grid.max_depth() {
            return;
        }
        for octant in 0..8u8 {
            if let Some(child_idx) = self.nodes.find(child_of(code, octant)) {
                f(child_idx);
            }
        }
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
