//! Math module: bounding boxes and view frustums.
//!
//! Passive value types shared by the Morton index, the tree and the
//! frustum query. Vector and matrix types come from `glam`.

mod aabb;
mod frustum;

pub use aabb::Aabb;
pub use frustum::{ClipStatus, Frustum};
