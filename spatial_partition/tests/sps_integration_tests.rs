//! Integration tests for SpatialPartition
//!
//! These tests drive the partition through its public API only:
//! insert/move/remove scenarios, culling correctness and leak checks.
//!
//! Run with: cargo test --test sps_integration_tests

use spatial_partition::glam::{Mat4, Vec3};
use spatial_partition::sps::math::{Aabb, ClipStatus, Frustum};
use spatial_partition::sps::morton::{self, encode, OVERSIZED, ROOT_CODE};
use spatial_partition::sps::{SpatialConfig, SpatialPartition};

// ============================================================================
// HELPERS
// ============================================================================

fn world() -> SpatialConfig {
    SpatialConfig::new(Vec3::ZERO, 512.0, 3)
}

fn cube(center: Vec3, half: f32) -> Aabb {
    Aabb::from_center_extent(center, Vec3::splat(half))
}

/// Orthographic view-projection whose frustum is exactly the box [min, max]
fn box_view_proj(min: Vec3, max: Vec3) -> Mat4 {
    Mat4::orthographic_rh_gl(min.x, max.x, min.y, max.y, -max.z, -min.z)
}

/// Deterministic pseudo-random scene inside the world, plus a few oversized objects
fn populate(sps: &mut SpatialPartition<u32>, count: u32) -> Vec<spatial_partition::sps::tree::RecordKey> {
    let mut seed = 0x9e37_79b9_7f4a_7c15u64;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        (seed >> 40) as f32 / (1u64 << 24) as f32
    };

    (0..count)
        .map(|i| {
            let center = Vec3::new(next(), next(), next()) * 1000.0 - Vec3::splat(500.0);
            let half = if i % 25 == 0 { 700.0 } else { 0.5 + next() * 40.0 };
            sps.add_record(&cube(center, half), i)
        })
        .collect()
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_integration_insert_move_release_scenario() {
    let mut sps = SpatialPartition::new(world()).unwrap();

    let a = sps.add_record(&cube(Vec3::ZERO, 1.0), "A");
    let leaf = sps.record(a).unwrap().node_morton_code();
    assert_eq!(morton::depth_of(leaf), 3);
    assert_eq!(leaf, encode(4, 4, 4, 3));

    let b = sps.add_record(&cube(Vec3::ZERO, 600.0), "B");
    assert_eq!(sps.record(b).unwrap().node_morton_code(), OVERSIZED);
    assert!(sps.record(b).unwrap().is_oversized());

    assert!(sps.update_record(a, &cube(Vec3::splat(500.0), 1.0)));
    let moved = sps.record(a).unwrap().node_morton_code();
    assert_ne!(moved, leaf);
    assert_eq!(moved, encode(7, 7, 7, 3));
    assert!(sps.node_for_code(leaf).is_none());
    assert!(sps.node_for_code(moved).is_some());
    sps.validate().unwrap();
}

#[test]
fn test_integration_root_inside_frustum_skips_object_tests() {
    let mut sps = SpatialPartition::new(world()).unwrap();
    populate(&mut sps, 200);

    let mut out = Vec::new();
    let stats = sps.query_visible(
        &box_view_proj(Vec3::splat(-4096.0), Vec3::splat(4096.0)),
        &mut out,
    );

    assert_eq!(out.len(), 200);
    assert_eq!(stats.object_tests, 0);
    assert_eq!(stats.objects_emitted, 200);
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[test]
fn test_integration_loose_bounds_contain_object() {
    let sps = SpatialPartition::<u32>::new(world()).unwrap();
    let grid = sps.grid();

    for i in 0..200 {
        let t = i as f32 * 0.37;
        let center = Vec3::new(t.sin(), (t * 1.3).cos(), (t * 0.7).sin()) * 480.0;
        let half = Vec3::new(1.0 + (t * 2.1).sin().abs() * 150.0, 0.5, 2.0 + i as f32 * 0.1);
        let bounds = Aabb::from_center_extent(center, half);

        let code = sps.calculate_morton_code(&bounds);
        assert_ne!(code, OVERSIZED);

        let loose = sps.node_aabb(code, true);
        assert!(loose.contains(&bounds), "loose cell must contain object {}", i);

        // One level deeper the cell would be too small for the object
        let depth = morton::depth_of(code);
        if depth < grid.max_depth() {
            let size = half.max_element();
            assert!(grid.cell_extent(depth + 1) < size);
        }
    }
}

#[test]
fn test_integration_repeated_update_is_noop() {
    let mut sps = SpatialPartition::new(world()).unwrap();
    let keys = populate(&mut sps, 50);
    let bounds = cube(Vec3::new(100.0, -50.0, 20.0), 3.0);

    sps.update_record(keys[7], &bounds);
    let nodes_before = sps.node_count();
    let capacity_before = sps.record_capacity();
    let version_before = sps.tree_version();
    let bounds_version = sps.record(keys[7]).unwrap().bounds_version();

    assert!(!sps.update_record(keys[7], &bounds));

    assert_eq!(sps.node_count(), nodes_before);
    assert_eq!(sps.record_capacity(), capacity_before);
    assert_eq!(sps.tree_version(), version_before);
    assert_eq!(sps.record(keys[7]).unwrap().bounds_version(), bounds_version);
}

#[test]
fn test_integration_counts_hold_after_mixed_operations() {
    let mut sps = SpatialPartition::new(world()).unwrap();
    let mut keys = populate(&mut sps, 300);

    for (i, key) in keys.iter().enumerate() {
        let angle = i as f32 * 0.1;
        let center = Vec3::new(angle.cos(), angle.sin(), (angle * 0.5).cos()) * 400.0;
        sps.update_record(*key, &cube(center, 1.0 + (i % 7) as f32 * 20.0));
    }
    sps.validate().unwrap();

    let removed: Vec<_> = keys.drain(..).step_by(3).collect();
    for key in removed {
        sps.remove_record(key);
    }
    sps.validate().unwrap();

    // Root count covers every record in the tree
    let in_tree = sps.len() - sps.oversized_count();
    let root_count = sps
        .node_for_code(ROOT_CODE)
        .map(|root| root.subtree_object_count() as usize)
        .unwrap_or(0);
    assert_eq!(root_count, in_tree);
}

#[test]
fn test_integration_no_leaks_after_removing_everything() {
    let mut sps = SpatialPartition::new(world()).unwrap();
    let keys = populate(&mut sps, 1100);
    assert!(sps.node_count() > 0);

    for key in keys {
        assert!(sps.remove_record(key).is_some());
    }

    assert_eq!(sps.node_count(), 0);
    assert_eq!(sps.len(), 0);
    assert_eq!(sps.oversized_count(), 0);
    assert_eq!(sps.records().count(), 0);
    sps.validate().unwrap();
}

#[test]
fn test_integration_everything_frustum_returns_all() {
    let mut sps = SpatialPartition::new(world()).unwrap();
    populate(&mut sps, 500);

    let mut out = Vec::new();
    sps.query_visible(&box_view_proj(Vec3::splat(-1.0e5), Vec3::splat(1.0e5)), &mut out);

    out.sort_unstable();
    assert_eq!(out, (0..500).collect::<Vec<_>>());
}

#[test]
fn test_integration_point_frustum_outside_world_returns_oversized() {
    let mut sps = SpatialPartition::new(world()).unwrap();
    populate(&mut sps, 500);
    let expected: Vec<u32> = (0..500).filter(|i| i % 25 == 0).collect();
    assert_eq!(sps.oversized_count(), expected.len());

    let mut out = Vec::new();
    sps.query_visible(
        &box_view_proj(Vec3::splat(2000.0), Vec3::splat(2000.01)),
        &mut out,
    );

    out.sort_unstable();
    assert_eq!(out, expected);
}

#[test]
fn test_integration_query_matches_brute_force() {
    let mut sps = SpatialPartition::new(world()).unwrap();
    populate(&mut sps, 400);

    let view_proj = box_view_proj(Vec3::new(-200.0, -100.0, -300.0), Vec3::new(150.0, 250.0, 50.0));
    let frustum = Frustum::from_view_projection(&view_proj);

    let mut out = Vec::new();
    sps.query_visible(&view_proj, &mut out);
    out.sort_unstable();

    let expected: Vec<u32> = sps
        .records()
        .filter(|(_, r)| r.is_oversized() || frustum.classify_aabb(r.bounds()) != ClipStatus::Outside)
        .map(|(_, r)| *r.user_data())
        .collect();
    assert_eq!(out, expected);
}
