// src/furnish/resize.rs
//! Room resizing and the re-layout that keeps every item valid afterwards.

use bevy::prelude::*;

use crate::furnish::core::clamp_to_room_xz;
use crate::furnish::placement::{restack_passengers, snap_to_wall};
use crate::furnish::plugin::FurnishSettings;
use crate::furnish::state::SceneState;
use crate::room::Room;

/// Host request: change the room's dimensions (meters). Out-of-range values
/// are clamped into the legal band.
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct ResizeRoom {
    pub width: f32,
    pub depth: f32,
    pub wall_height: f32,
}

impl ResizeRoom {
    /// Build a request from free-text fields.
    pub fn parse(width: &str, depth: &str, wall_height: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            width: parse_meters("width", width)?,
            depth: parse_meters("depth", depth)?,
            wall_height: parse_meters("wall_height", wall_height)?,
        })
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be a number, got '{input}'")]
    NotNumeric { field: &'static str, input: String },
}

fn parse_meters(field: &'static str, input: &str) -> Result<f32, ValidationError> {
    input
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::NotNumeric { field, input: input.to_string() })
}

fn check_finite(field: &'static str, v: f32) -> Result<f32, ValidationError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ValidationError::NotNumeric { field, input: v.to_string() })
    }
}

/// Apply new room dimensions, then pull every item back into a valid spot.
/// The room is untouched when any input is not a number.
pub fn resize_room(
    room: &mut Room,
    state: &mut SceneState,
    settings: &FurnishSettings,
    width: f32,
    depth: f32,
    wall_height: f32,
) -> Result<(), ValidationError> {
    let width = check_finite("width", width)?;
    let depth = check_finite("depth", depth)?;
    let wall_height = check_finite("wall_height", wall_height)?;

    room.set_dimensions(width, depth, wall_height);
    relayout(room, state, settings);
    Ok(())
}

/// Floor and wall items first, then everything stacked on them in base order.
pub fn relayout(room: &Room, state: &mut SceneState, settings: &FurnishSettings) {
    let margin = settings.clamp_margin;
    let roots: Vec<_> = state
        .iter()
        .filter(|(_, item)| item.stacked_on().is_none())
        .map(|(id, _)| id)
        .collect();

    for &id in &roots {
        let Some(item) = state.get_mut(id) else { continue };
        match item.wall_side {
            Some(side) => snap_to_wall(item, room, side, settings.wall_gap, margin),
            None => {
                let p = clamp_to_room_xz(room, item.position.x, item.position.z, margin);
                item.position = Vec3::new(p.x, item.half_height(), p.y);
            }
        }
    }
    for &id in &roots {
        restack_passengers(state, id, settings.stack_gap);
    }
}
