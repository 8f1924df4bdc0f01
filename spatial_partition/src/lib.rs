/*!
# Spatial Partition

Loose-octree spatial index for scene objects, addressed by Morton codes.

Objects are tracked by their world-space AABB. Each one lives in the deepest
tree cell whose size fits it; cells are loose (their query bounds are twice
their size), so only an object's center has to fall inside its cell. Objects
too large for the world, or centered outside it, are kept in a separate
oversized list that every query returns.

## Architecture

- **WorldGrid**: maps boxes to Morton codes and codes back to cell bounds
- **NodeArena**: lazily created tree nodes in stable slots, found by code
- **SpatialPartition**: record pool, per-cell record lists, insert/move/remove
- **Frustum**: six planes with a three-state AABB test driving `query_visible`

The partition is generic over the payload stored with each record, so the
same index serves renderables, lights or anything else with a box.
*/

// Internal modules
mod config;
mod error;
pub mod log;
mod math;
mod morton;
mod partition;
mod query;
mod tree;
mod utils;

// Main sps namespace module
pub mod sps {
    // Error types
    pub use crate::error::{Error, Result};

    // World configuration
    pub use crate::config::SpatialConfig;

    // Partition facade and queries
    pub use crate::partition::{SpatialPartition, RECORD_POOL_CHUNK};
    pub use crate::query::{NodeVisibility, QueryStats};

    // Logging sub-module (types and dispatch, NOT macros)
    pub mod log {
        pub use crate::log::{
            Logger, LogEntry, LogSeverity, DefaultLogger, set_logger, reset_logger,
        };
    }

    // Math sub-module
    pub mod math {
        pub use crate::math::*;
    }

    // Morton code sub-module
    pub mod morton {
        pub use crate::morton::*;
    }

    // Tree storage sub-module
    pub mod tree {
        pub use crate::tree::{CellList, NodeArena, RecordKey, SpatialRecord, TreeNode};
    }

    // Allocation utilities
    pub mod utils {
        pub use crate::utils::*;
    }
}

// Re-export math library at crate root
pub use glam;
