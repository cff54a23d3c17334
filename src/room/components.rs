// src/room/components.rs
use std::ops::RangeInclusive;

use bevy::prelude::*;
use serde::Serialize;

/// Legal width/depth in meters.
pub const ROOM_SIZE_RANGE: RangeInclusive<f32> = 5.0..=50.0;
/// Legal wall height in meters.
pub const WALL_HEIGHT_RANGE: RangeInclusive<f32> = 3.0..=15.0;

/// The furnishable envelope: a rectangle centred on the origin with the floor at y = 0.
#[derive(Resource, Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Room {
    width: f32,
    depth: f32,
    wall_height: f32,
}

impl Default for Room {
    fn default() -> Self {
        Self { width: 15.0, depth: 15.0, wall_height: 6.0 }
    }
}

impl Room {
    /// Builds a room with every dimension clamped into its legal band.
    pub fn new(width: f32, depth: f32, wall_height: f32) -> Self {
        Self {
            width: clamp_range(width, &ROOM_SIZE_RANGE),
            depth: clamp_range(depth, &ROOM_SIZE_RANGE),
            wall_height: clamp_range(wall_height, &WALL_HEIGHT_RANGE),
        }
    }

    #[inline]
    pub fn width(&self) -> f32 { self.width }
    #[inline]
    pub fn depth(&self) -> f32 { self.depth }
    #[inline]
    pub fn wall_height(&self) -> f32 { self.wall_height }
    #[inline]
    pub fn half_width(&self) -> f32 { self.width * 0.5 }
    #[inline]
    pub fn half_depth(&self) -> f32 { self.depth * 0.5 }

    /// Only the resize coordinator changes the envelope.
    pub(crate) fn set_dimensions(&mut self, width: f32, depth: f32, wall_height: f32) {
        *self = Self::new(width, depth, wall_height);
    }
}

fn clamp_range(v: f32, range: &RangeInclusive<f32>) -> f32 {
    v.clamp(*range.start(), *range.end())
}

/// Marker for the generated floor, walls and ceiling.
#[derive(Component)]
pub struct RoomShell;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_room_is_fifteen_by_fifteen_by_six() {
        let room = Room::default();
        assert_eq!((room.width(), room.depth(), room.wall_height()), (15.0, 15.0, 6.0));
        assert_eq!(room.half_width(), 7.5);
    }

    #[test]
    fn dimensions_clamp_into_legal_bands() {
        let room = Room::new(2.0, 80.0, -1.0);
        assert_eq!(room.width(), 5.0);
        assert_eq!(room.depth(), 50.0);
        assert_eq!(room.wall_height(), 3.0);

        let tall = Room::new(10.0, 10.0, 40.0);
        assert_eq!(tall.wall_height(), 15.0);
    }
}
