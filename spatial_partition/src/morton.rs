//! Morton index: mapping between world-space boxes and tree cells.
//!
//! A cell at depth `d` is identified by a Morton (Z-order) code: the three
//! `d`-bit cell coordinates interleaved (x in bit 0, y in bit 1, z in bit 2)
//! and prefixed with a sentinel `1` bit at position `3 * d`. The sentinel
//! makes codes of different depths distinct and turns "parent of" into a
//! right shift by 3. Code `1` is the root; code `0` is reserved for objects
//! that fit no cell ("oversized").
//!
//! The tree is loose: an object lives in the cell containing its center,
//! at the deepest depth whose cell half-size is not smaller than the
//! object's largest half-extent. The cell's loose bounds (doubled extent)
//! then always contain the object.

use glam::Vec3;
use crate::config::SpatialConfig;
use crate::math::Aabb;

/// Morton code of a tree cell, with a leading sentinel bit.
pub type MortonCode = u64;

/// Code reserved for objects kept outside the tree.
pub const OVERSIZED: MortonCode = 0;

/// Code of the root cell.
pub const ROOT_CODE: MortonCode = 1;

/// Bits consumed per tree level.
pub const TREE_DIMENSIONS: u32 = 3;

/// Deepest supported level: 21 bits per axis plus the sentinel fill 64 bits.
pub const MAX_TREE_DEPTH: u8 = 21;

// ===== BIT INTERLEAVING =====

/// Spread the low 21 bits of `value` so that bit `i` lands at bit `3 * i`.
pub fn part_bits_1by2(value: u32) -> u64 {
    let mut x = (value & 0x1f_ffff) as u64;
    x = (x ^ (x << 32)) & 0x001f_0000_0000_ffff;
    x = (x ^ (x << 16)) & 0x001f_0000_ff00_00ff;
    x = (x ^ (x << 8)) & 0x100f_00f0_0f00_f00f;
    x = (x ^ (x << 4)) & 0x10c3_0c30_c30c_30c3;
    x = (x ^ (x << 2)) & 0x1249_2492_4924_9249;
    x
}

/// Inverse of `part_bits_1by2`: gather every third bit starting at bit 0.
pub fn compact_bits_1by2(value: u64) -> u32 {
    let mut x = value & 0x1249_2492_4924_9249;
    x = (x ^ (x >> 2)) & 0x10c3_0c30_c30c_30c3;
    x = (x ^ (x >> 4)) & 0x100f_00f0_0f00_f00f;
    x = (x ^ (x >> 8)) & 0x001f_0000_ff00_00ff;
    x = (x ^ (x >> 16)) & 0x001f_0000_0000_ffff;
    x = (x ^ (x >> 32)) & 0x1f_ffff;
    x as u32
}

// ===== CODE ARITHMETIC =====

/// Build the code of cell `(x, y, z)` at `depth`.
pub fn encode(x: u32, y: u32, z: u32, depth: u8) -> MortonCode {
    debug_assert!(depth <= MAX_TREE_DEPTH);
    (1u64 << (TREE_DIMENSIONS * depth as u32))
        | part_bits_1by2(x)
        | (part_bits_1by2(y) << 1)
        | (part_bits_1by2(z) << 2)
}

/// Split a code into cell coordinates and depth. `code` must not be `OVERSIZED`.
pub fn decode(code: MortonCode) -> (u32, u32, u32, u8) {
    debug_assert_ne!(code, OVERSIZED, "the oversized code has no cell");
    let depth = depth_of(code);
    let bits = code ^ (1u64 << (TREE_DIMENSIONS * depth as u32));
    (
        compact_bits_1by2(bits),
        compact_bits_1by2(bits >> 1),
        compact_bits_1by2(bits >> 2),
        depth,
    )
}

/// Depth encoded by the sentinel position. `code` must not be `OVERSIZED`.
pub fn depth_of(code: MortonCode) -> u8 {
    debug_assert_ne!(code, OVERSIZED);
    ((63 - code.leading_zeros()) / TREE_DIMENSIONS) as u8
}

/// Parent cell. The root's parent is `OVERSIZED` (0).
pub fn parent_of(code: MortonCode) -> MortonCode {
    code >> TREE_DIMENSIONS
}

/// Child cell for `octant` (bit0 = X, bit1 = Y, bit2 = Z; 1 = high half).
pub fn child_of(code: MortonCode, octant: u8) -> MortonCode {
    debug_assert!(octant < 8);
    (code << TREE_DIMENSIONS) | octant as MortonCode
}

/// Deepest cell that is an ancestor-or-self of both codes.
///
/// Returns `OVERSIZED` if either code is `OVERSIZED`: an object leaving or
/// entering the tree touches the whole path up to the root.
pub fn lowest_common_ancestor(a: MortonCode, b: MortonCode) -> MortonCode {
    if a == OVERSIZED || b == OVERSIZED {
        return OVERSIZED;
    }

    let depth_a = depth_of(a);
    let depth_b = depth_of(b);
    let mut a = a;
    let mut b = b;
    if depth_a > depth_b {
        a >>= TREE_DIMENSIONS * (depth_a - depth_b) as u32;
    } else {
        b >>= TREE_DIMENSIONS * (depth_b - depth_a) as u32;
    }

    while a != b {
        a >>= TREE_DIMENSIONS;
        b >>= TREE_DIMENSIONS;
    }
    a
}

// ===== WORLD GRID =====

/// World bounds and the cached factors used to compute codes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldGrid {
    center: Vec3,
    extent: f32,
    max_depth: u8,
    loose_slack: f32,
    /// 1 / (2 * extent)
    inv_world_size: f32,
    /// Half-size of a cell at `max_depth`
    smallest_extent: f32,
}

impl WorldGrid {
    /// Cache grid factors from a config. The config is expected to be valid.
    pub fn new(config: &SpatialConfig) -> Self {
        let max_depth = config.effective_max_depth();
        Self {
            center: config.center,
            extent: config.extent,
            max_depth,
            loose_slack: config.loose_slack,
            inv_world_size: 1.0 / (2.0 * config.extent),
            smallest_extent: config.extent / (1u32 << max_depth) as f32,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// World half-size.
    pub fn extent(&self) -> f32 {
        self.extent
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Tight world bounds (the root cell).
    pub fn world_aabb(&self) -> Aabb {
        Aabb::from_center_extent(self.center, Vec3::splat(self.extent))
    }

    /// Half-size of a cell at `depth`.
    pub fn cell_extent(&self, depth: u8) -> f32 {
        self.extent / (1u32 << depth) as f32
    }

    /// Depth for an object of the given half-extent, `None` if it fits no cell.
    ///
    /// Negative components are treated as zero; points and tiny objects
    /// sink to `max_depth`.
    pub fn depth_for_extent(&self, extent: Vec3) -> Option<u8> {
        if extent.is_nan() {
            return None;
        }

        let size = extent.max(Vec3::ZERO).max_element() * self.loose_slack;
        if size > self.extent {
            return None;
        }
        if size <= self.smallest_extent {
            return Some(self.max_depth);
        }

        // Deepest d with extent / 2^d >= size, i.e. 2^d <= floor(extent / size)
        let ratio = (self.extent / size) as u64;
        let depth = (63 - ratio.leading_zeros()) as u8;
        Some(depth.min(self.max_depth))
    }

    /// Morton code of the cell an object with this center and half-extent lives in.
    ///
    /// Returns `OVERSIZED` when the center is outside the world, the object
    /// is larger than the root cell, or the input is not a number. Coordinates
    /// are floor-quantized; a center exactly on a cell face belongs to the
    /// higher cell, except on the world's max faces where it is clamped into
    /// the last cell.
    pub fn calculate_morton_code(&self, center: Vec3, extent: Vec3) -> MortonCode {
        if !center.is_finite() {
            return OVERSIZED;
        }

        // Loose tree: only the center has to be inside the world
        if (center - self.center).abs().max_element() > self.extent {
            return OVERSIZED;
        }

        let Some(depth) = self.depth_for_extent(extent) else {
            return OVERSIZED;
        };

        let cells = 1u32 << depth;
        let cell_coeff = cells as f32 * self.inv_world_size;
        let world_min = self.center - Vec3::splat(self.extent);
        let cell = ((center - world_min) * cell_coeff)
            .floor()
            .clamp(Vec3::ZERO, Vec3::splat((cells - 1) as f32));

        encode(cell.x as u32, cell.y as u32, cell.z as u32, depth)
    }

    /// Morton code for a min/max box.
    pub fn morton_code_for(&self, bounds: &Aabb) -> MortonCode {
        self.calculate_morton_code(bounds.center(), bounds.extent())
    }

    /// World bounds of a cell. `loose` doubles the extent around the cell center.
    pub fn node_aabb(&self, code: MortonCode, loose: bool) -> Aabb {
        let (x, y, z, depth) = decode(code);
        let half = self.cell_extent(depth);
        let world_min = self.center - Vec3::splat(self.extent);
        let cell = Vec3::new(x as f32, y as f32, z as f32);
        let center = world_min + (cell * 2.0 + Vec3::ONE) * half;
        let extent = if loose { half * 2.0 } else { half };
        Aabb::from_center_extent(center, Vec3::splat(extent))
    }
}

#[cfg(test)]
#[path = "morton_tests.rs"]
mod tests;
