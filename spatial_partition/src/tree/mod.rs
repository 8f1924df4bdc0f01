//! Tree storage: node arena, per-object records and intrusive cell lists.

mod node_arena;
mod record;

pub use node_arena::{NodeArena, TreeNode};
pub use record::{CellList, RecordKey, SpatialRecord};
pub(crate) use record::{link_front, unlink, CellIter};
