// src/furnish/core.rs
//! Core ids, yaw and geometry helpers for room furnishing.
//! Keep this file dependency-light; everything else in `furnish` builds on it.

use std::f32::consts::FRAC_PI_2;

use bevy::math::primitives::InfinitePlane3d;
use bevy::prelude::*; // Vec2, Vec3, Quat, Ray3d, Dir3
use serde::{Deserialize, Serialize};

use crate::room::Room;

/// Fallback half-height for degenerate (zero-height) bounds.
pub const DEGENERATE_HALF_HEIGHT: f32 = 0.5;

// ---------- Ids ----------

/// Stable identity of a placed item for the lifetime of the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

/// Index of a kind in the catalog (stable during a session).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KindId(pub u32);

// ---------- Walls ----------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallSide {
    /// z = -depth/2
    Back,
    /// z = +depth/2
    Front,
    /// x = -width/2
    Left,
    /// x = +width/2
    Right,
}

impl WallSide {
    /// Yaw an item takes against this wall: back 0, right +90, front 180, left -90.
    /// Back and front items face the room centre; side items face along the wall's
    /// outward normal.
    pub fn facing(self) -> QuarterTurns {
        match self {
            WallSide::Back => QuarterTurns::new(0),
            WallSide::Right => QuarterTurns::new(1),
            WallSide::Front => QuarterTurns::new(2),
            WallSide::Left => QuarterTurns::new(-1),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            WallSide::Back => WallSide::Front,
            WallSide::Front => WallSide::Back,
            WallSide::Left => WallSide::Right,
            WallSide::Right => WallSide::Left,
        }
    }
}

// ---------- Yaw ----------

/// Rotation about +Y restricted to 0, 90, 180 or 270 degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuarterTurns(u8);

impl QuarterTurns {
    pub const ZERO: Self = Self(0);

    pub fn new(turns: i32) -> Self {
        Self(turns.rem_euclid(4) as u8)
    }

    pub fn turned(self, by: i32) -> Self {
        Self::new(self.0 as i32 + by)
    }

    #[inline]
    pub fn count(self) -> u8 { self.0 }

    pub fn radians(self) -> f32 {
        self.0 as f32 * FRAC_PI_2
    }

    pub fn degrees(self) -> f32 {
        self.0 as f32 * 90.0
    }

    pub fn to_quat(self) -> Quat {
        Quat::from_rotation_y(self.radians())
    }

    /// Exact (cos, sin) so footprints swap without float noise.
    pub fn cos_sin(self) -> (f32, f32) {
        match self.0 {
            0 => (1.0, 0.0),
            1 => (0.0, 1.0),
            2 => (-1.0, 0.0),
            _ => (0.0, -1.0),
        }
    }

    /// Rotates a vector about +Y, matching `Quat::from_rotation_y`.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let (c, s) = self.cos_sin();
        Vec3::new(v.x * c + v.z * s, v.y, -v.x * s + v.z * c)
    }

    /// Direction the item's front face points.
    pub fn forward(self) -> Vec3 {
        self.rotate(Vec3::Z)
    }

    /// The item's own right-hand side.
    pub fn right(self) -> Vec3 {
        self.rotate(Vec3::X)
    }
}

// ---------- Bounds ----------

/// World-space axis-aligned box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl WorldBox {
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self { min: center - half, max: center + half }
    }

    /// Slab test. Returns the entry distance along `ray` (0 when the origin is inside).
    pub fn ray_hit(&self, ray: Ray3d, max_distance: f32) -> Option<f32> {
        let origin = ray.origin.to_array();
        let dir = ray.direction.as_vec3().to_array();
        let min = self.min.to_array();
        let max = self.max.to_array();

        let mut t_near = 0.0_f32;
        let mut t_far = max_distance;
        for axis in 0..3 {
            if dir[axis].abs() < f32::EPSILON {
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir[axis];
            let mut t0 = (min[axis] - origin[axis]) * inv;
            let mut t1 = (max[axis] - origin[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }
        Some(t_near)
    }
}

/// World-space size of a centred local extent after uniform scale and a quarter-turn yaw.
pub fn rotated_extent(extent: Vec3, scale: f32, yaw: QuarterTurns) -> Vec3 {
    let s = extent * scale;
    let (c, n) = yaw.cos_sin();
    let (c, n) = (c.abs(), n.abs());
    Vec3::new(c * s.x + n * s.z, s.y, n * s.x + c * s.z)
}

/// Half of a vertical extent, guarding degenerate/unloaded meshes.
#[inline]
pub fn half_of_height(size_y: f32) -> f32 {
    let hh = size_y * 0.5;
    if hh > 0.0 { hh } else { DEGENERATE_HALF_HEIGHT }
}

// ---------- Room-space helpers ----------

/// Clamp XZ into the room, keeping `margin` meters away from every wall.
pub fn clamp_to_room_xz(room: &Room, x: f32, z: f32, margin: f32) -> Vec2 {
    let inner_x = (room.half_width() - margin).max(0.0);
    let inner_z = (room.half_depth() - margin).max(0.0);
    Vec2::new(x.clamp(-inner_x, inner_x), z.clamp(-inner_z, inner_z))
}

/// Where `ray` meets the horizontal plane at `height`, if it does.
pub fn intersect_horizontal(ray: Ray3d, height: f32) -> Option<Vec3> {
    let plane = InfinitePlane3d { normal: Dir3::Y };
    ray.intersect_plane(Vec3::new(0.0, height, 0.0), plane)
        .map(|t| ray.get_point(t))
}

/// Floor (y = 0) projection of a pointer/camera ray. `None` when the ray runs
/// parallel to the floor or points away from it.
pub fn project_to_floor(ray: Ray3d) -> Option<Vec2> {
    intersect_horizontal(ray, 0.0).map(|p| Vec2::new(p.x, p.z))
}

/// Closest wall to an XZ point. Exact ties resolve in the order
/// left, right, back, front; the order carries no meaning beyond determinism.
pub fn nearest_wall_side(room: &Room, x: f32, z: f32) -> WallSide {
    let candidates = [
        (WallSide::Left, (x + room.half_width()).abs()),
        (WallSide::Right, (x - room.half_width()).abs()),
        (WallSide::Back, (z + room.half_depth()).abs()),
        (WallSide::Front, (z - room.half_depth()).abs()),
    ];
    let mut best = candidates[0];
    for c in &candidates[1..] {
        if c.1 < best.1 {
            best = *c;
        }
    }
    best.0
}

#[cfg(test)]
pub(crate) mod test_support {
    pub const EPS: f32 = 1e-4;

    pub fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::approx;
    use super::*;

    fn ray(origin: Vec3, dir: Vec3) -> Ray3d {
        Ray3d::new(origin, Dir3::new(dir).unwrap())
    }

    #[test]
    fn quarter_turns_wrap_both_ways() {
        assert_eq!(QuarterTurns::new(-1).count(), 3);
        assert_eq!(QuarterTurns::new(5).count(), 1);
        assert_eq!(QuarterTurns::new(3).turned(1), QuarterTurns::ZERO);
        assert!(approx(QuarterTurns::new(1).radians(), FRAC_PI_2));
    }

    #[test]
    fn quarter_turn_rotation_matches_quat() {
        for n in 0..4 {
            let yaw = QuarterTurns::new(n);
            let v = Vec3::new(0.3, 1.0, -2.0);
            let expected = yaw.to_quat() * v;
            let got = yaw.rotate(v);
            assert!(got.abs_diff_eq(expected, 1e-5), "turn {n}: {got} vs {expected}");
        }
    }

    #[test]
    fn wall_facing_yaws() {
        assert!(WallSide::Back.facing().forward().abs_diff_eq(Vec3::Z, 1e-6));
        assert!(WallSide::Front.facing().forward().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(WallSide::Left.facing().forward().abs_diff_eq(Vec3::NEG_X, 1e-6));
        assert!(WallSide::Right.facing().forward().abs_diff_eq(Vec3::X, 1e-6));
        assert_eq!(WallSide::Right.facing().degrees(), 90.0);
        assert_eq!(WallSide::Left.facing().degrees(), 270.0);
    }

    #[test]
    fn rotated_extent_swaps_footprint_on_odd_turns() {
        let extent = Vec3::new(2.0, 1.0, 1.0);
        assert_eq!(rotated_extent(extent, 1.0, QuarterTurns::ZERO), Vec3::new(2.0, 1.0, 1.0));
        assert_eq!(rotated_extent(extent, 1.0, QuarterTurns::new(1)), Vec3::new(1.0, 1.0, 2.0));
        assert_eq!(rotated_extent(extent, 2.0, QuarterTurns::new(2)), Vec3::new(4.0, 2.0, 2.0));
    }

    #[test]
    fn half_height_guards_degenerate_bounds() {
        assert_eq!(half_of_height(3.0), 1.5);
        assert_eq!(half_of_height(0.0), DEGENERATE_HALF_HEIGHT);
    }

    #[test]
    fn clamp_is_idempotent() {
        let room = Room::default();
        for (x, z) in [(100.0, -100.0), (7.3, 0.0), (-2.0, 7.4), (0.0, 0.0)] {
            let once = clamp_to_room_xz(&room, x, z, 0.3);
            let twice = clamp_to_room_xz(&room, once.x, once.y, 0.3);
            assert_eq!(once, twice);
        }
        let p = clamp_to_room_xz(&room, 100.0, -100.0, 0.3);
        assert!(approx(p.x, 7.2) && approx(p.y, -7.2));
    }

    #[test]
    fn floor_projection_hits_and_misses() {
        let down = ray(Vec3::new(1.0, 5.0, 1.0), Vec3::new(0.0, -1.0, 1.0));
        let hit = project_to_floor(down).unwrap();
        assert!(approx(hit.x, 1.0) && approx(hit.y, 6.0));

        let level = ray(Vec3::new(0.0, 2.0, 0.0), Vec3::X);
        assert!(project_to_floor(level).is_none());

        let up = ray(Vec3::new(0.0, 2.0, 0.0), Vec3::Y);
        assert!(project_to_floor(up).is_none());
    }

    #[test]
    fn nearest_wall_prefers_closest_then_fixed_order() {
        let room = Room::default();
        assert_eq!(nearest_wall_side(&room, 0.0, -7.0), WallSide::Back);
        assert_eq!(nearest_wall_side(&room, 0.0, 6.0), WallSide::Front);
        assert_eq!(nearest_wall_side(&room, 7.0, 1.0), WallSide::Right);
        // dead centre is a four-way tie
        assert_eq!(nearest_wall_side(&room, 0.0, 0.0), WallSide::Left);
        // corner tie between right and front
        assert_eq!(nearest_wall_side(&room, 7.0, 7.0), WallSide::Right);
    }

    #[test]
    fn ray_hits_box_from_above_and_misses_beside_it() {
        let b = WorldBox::from_center_size(Vec3::new(0.0, 0.5, 0.0), Vec3::ONE);
        let probe = ray(Vec3::new(0.2, 3.0, -0.2), Vec3::NEG_Y);
        assert!(approx(b.ray_hit(probe, 15.0).unwrap(), 2.0));

        let beside = ray(Vec3::new(2.0, 3.0, 0.0), Vec3::NEG_Y);
        assert!(b.ray_hit(beside, 15.0).is_none());

        let too_short = ray(Vec3::new(0.0, 30.0, 0.0), Vec3::NEG_Y);
        assert!(b.ray_hit(too_short, 15.0).is_none());
    }
}
