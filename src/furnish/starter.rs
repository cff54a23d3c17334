// src/furnish/starter.rs
//! The room opens furnished: a sofa on the back wall with a coffee table in
//! front of it, and on the opposite wall a sideboard carrying the TV next to
//! a console table with a vase.

use bevy::prelude::*;

use crate::furnish::core::{ItemId, KindId, WallSide};
use crate::furnish::placement::{
    attach_to_wall, place_beside_on_wall, place_in_front_of, spawn_item, stack_if_eligible,
    PlacementContext, BESIDE_GAP, BESIDE_WALL_GAP,
};
use crate::furnish::queue::SpawnError;
use crate::furnish::registry::Catalog;
use crate::furnish::state::StackError;
use crate::room::Room;

/// Catalog keys the starter room is built from, in placement order.
pub const STARTER_KEYS: [&str; 6] =
    ["sofa", "coffee_table", "sideboard", "television", "console_table", "flower_vase"];

const TABLE_GAP: f32 = 0.8;
const TV_GAP: f32 = 0.015;
const VASE_GAP: f32 = 0.01;

/// Progress of the starter room across frames.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StarterLayout {
    #[default]
    Pending,
    /// Models requested; waiting for every one of them.
    Loading,
    Done,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum StarterError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error(transparent)]
    Stack(#[from] StackError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StarterRoom {
    pub sofa: ItemId,
    pub coffee_table: ItemId,
    pub sideboard: ItemId,
    pub television: ItemId,
    pub console_table: ItemId,
    pub flower_vase: ItemId,
}

impl StarterRoom {
    pub fn ids(&self) -> [ItemId; 6] {
        [
            self.sofa,
            self.coffee_table,
            self.sideboard,
            self.television,
            self.console_table,
            self.flower_vase,
        ]
    }
}

/// Floor point in the middle of `side`.
fn wall_midpoint(room: &Room, side: WallSide) -> Vec2 {
    match side {
        WallSide::Back => Vec2::new(0.0, -room.half_depth()),
        WallSide::Front => Vec2::new(0.0, room.half_depth()),
        WallSide::Left => Vec2::new(-room.half_width(), 0.0),
        WallSide::Right => Vec2::new(room.half_width(), 0.0),
    }
}

fn floor_point(ctx: &PlacementContext, id: ItemId) -> Vec2 {
    ctx.state
        .get(id)
        .map(|i| Vec2::new(i.position.x, i.position.z))
        .unwrap_or(Vec2::ZERO)
}

fn resolve(
    catalog: &Catalog,
    key: &str,
    extent_of: &impl Fn(KindId) -> Option<Vec3>,
) -> Result<(KindId, Vec3), SpawnError> {
    let kind = catalog
        .index_of(key)
        .ok_or_else(|| SpawnError::UnknownKind(key.to_string()))?;
    let extent = extent_of(kind).ok_or_else(|| SpawnError::NotLoaded(key.to_string()))?;
    Ok((kind, extent))
}

/// Lay out the starter furniture. `extent_of` gives each kind's model extent;
/// nothing is placed unless every kind resolves.
pub fn furnish_starter_room(
    ctx: &mut PlacementContext,
    extent_of: impl Fn(KindId) -> Option<Vec3>,
) -> Result<StarterRoom, StarterError> {
    let [sofa, table, board, tv, console, vase] =
        STARTER_KEYS.map(|key| resolve(ctx.catalog, key, &extent_of));
    let (sofa, table, board, tv, console, vase) = (sofa?, table?, board?, tv?, console?, vase?);

    let at = wall_midpoint(ctx.room, WallSide::Back);
    let sofa = spawn_item(ctx, sofa.0, sofa.1, at)?;
    let coffee_table = spawn_item(ctx, table.0, table.1, Vec2::ZERO)?;
    place_in_front_of(ctx, coffee_table, sofa, TABLE_GAP);

    let side = ctx
        .state
        .get(sofa)
        .and_then(|s| s.wall_side)
        .unwrap_or(WallSide::Back)
        .opposite();
    let at = wall_midpoint(ctx.room, side);
    let sideboard = spawn_item(ctx, board.0, board.1, at)?;
    if let Some(item) = ctx.state.get_mut(sideboard) {
        attach_to_wall(item, ctx.room, side, BESIDE_WALL_GAP, ctx.settings.clamp_margin);
    }

    let at = floor_point(ctx, sideboard);
    let television = spawn_item(ctx, tv.0, tv.1, at)?;
    stack_if_eligible(ctx.state, ctx.catalog, television, sideboard, TV_GAP)?;

    let console_table = spawn_item(ctx, console.0, console.1, at)?;
    place_beside_on_wall(ctx, console_table, sideboard, 1.0, BESIDE_GAP);

    let at = floor_point(ctx, console_table);
    let flower_vase = spawn_item(ctx, vase.0, vase.1, at)?;
    stack_if_eligible(ctx.state, ctx.catalog, flower_vase, console_table, VASE_GAP)?;

    Ok(StarterRoom { sofa, coffee_table, sideboard, television, console_table, flower_vase })
}
