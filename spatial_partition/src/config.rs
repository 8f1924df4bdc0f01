/// World configuration for a spatial partition.
///
/// Set once at level-load time by the owning level/scene. There is no
/// persisted format; callers build the struct directly.

use glam::Vec3;
use crate::error::{Error, Result};
use crate::morton::MAX_TREE_DEPTH;

/// World bounds, tree depth and loose-fit slack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialConfig {
    /// World center
    pub center: Vec3,
    /// World half-size (same on every axis; the root cell is a cube)
    pub extent: f32,
    /// Deepest tree level (root = 0). Clamped to `MAX_TREE_DEPTH`.
    pub max_depth: u8,
    /// Multiplier applied to an object's largest half-extent before choosing
    /// its depth. Values above 1 push objects to coarser cells, reducing
    /// re-insertions for objects that grow and shrink.
    pub loose_slack: f32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            extent: 512.0,
            max_depth: 6,
            loose_slack: 1.0,
        }
    }
}

impl SpatialConfig {
    /// Create a config with the default slack.
    pub fn new(center: Vec3, extent: f32, max_depth: u8) -> Self {
        Self {
            center,
            extent,
            max_depth,
            ..Self::default()
        }
    }

    pub fn with_center(mut self, center: Vec3) -> Self {
        self.center = center;
        self
    }

    pub fn with_extent(mut self, extent: f32) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_loose_slack(mut self, loose_slack: f32) -> Self {
        self.loose_slack = loose_slack;
        self
    }

    /// Depth actually used by the tree.
    pub fn effective_max_depth(&self) -> u8 {
        self.max_depth.min(MAX_TREE_DEPTH)
    }

    /// Check the config can drive a tree.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the center is not finite, the extent
    /// is not a finite positive number, or the slack is below 1.
    pub fn validate(&self) -> Result<()> {
        if !self.center.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "world center must be finite, got {}", self.center
            )));
        }
        if !self.extent.is_finite() || self.extent <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "world extent must be a finite positive number, got {}", self.extent
            )));
        }
        if !self.loose_slack.is_finite() || self.loose_slack < 1.0 {
            return Err(Error::InvalidConfig(format!(
                "loose slack must be finite and >= 1, got {}", self.loose_slack
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
