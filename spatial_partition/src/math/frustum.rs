/// View frustum as six inward-facing planes, and the three-state box test
/// that drives tree culling.
///
/// A plane `(n, w)` keeps the points with `n·p + w >= 0`. Normals are unit
/// length, so `w` is the signed distance of the plane from the origin.

use glam::{Mat4, Vec3, Vec4};
use super::Aabb;

/// Where a box sits relative to a frustum.
///
/// - `Outside` → the subtree can be skipped
/// - `Inside` → everything below is visible, no further tests needed
/// - `Clipped` → the box crosses a plane; look closer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipStatus {
    Outside,
    Inside,
    Clipped,
}

#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Planes of the clip volume of `view_proj` (Gribb & Hartmann).
    ///
    /// Assumes a [-1, 1] clip depth. With a [0, 1] projection the near plane
    /// ends up behind the real one, so culling only gets more conservative.
    pub fn from_view_projection(view_proj: &Mat4) -> Self {
        let x = view_proj.row(0);
        let y = view_proj.row(1);
        let z = view_proj.row(2);
        let w = view_proj.row(3);

        let planes = [w + x, w - x, w + y, w - y, w + z, w - z].map(|plane| {
            let len = plane.truncate().length();
            if len > 0.0 { plane / len } else { plane }
        });

        Self { planes }
    }

    /// Classify a min/max box.
    pub fn classify_aabb(&self, aabb: &Aabb) -> ClipStatus {
        self.classify_box(aabb.center(), aabb.extent())
    }

    /// Classify a box given by center and half-size.
    ///
    /// Per plane, the box projects onto the normal as an interval of radius
    /// `r = e·|n|` around the center distance `d`. `d < -r` on any plane means
    /// the box is fully behind it; `d >= r` on every plane means fully inside.
    pub fn classify_box(&self, center: Vec3, extent: Vec3) -> ClipStatus {
        let mut status = ClipStatus::Inside;

        for plane in &self.planes {
            let normal = plane.truncate();
            let distance = normal.dot(center) + plane.w;
            let radius = extent.dot(normal.abs());

            if distance < -radius {
                return ClipStatus::Outside;
            }
            if distance < radius {
                status = ClipStatus::Clipped;
            }
        }

        status
    }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
