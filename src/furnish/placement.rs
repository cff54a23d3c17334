// src/furnish/placement.rs
//! Where items go: spawn points, wall attachment, stacking geometry and the
//! base search used while dragging.

use bevy::prelude::*;
use rand::Rng;

use crate::furnish::core::{
    clamp_to_room_xz, nearest_wall_side, project_to_floor, rotated_extent, ItemId, KindId,
    WallSide,
};
use crate::furnish::plugin::FurnishSettings;
use crate::furnish::queue::SpawnError;
use crate::furnish::registry::Catalog;
use crate::furnish::state::{PlacedItem, SceneState, StackError};
use crate::furnish::collab::HitTest;
use crate::room::Room;

/// Gap between two items sharing a wall.
pub const BESIDE_GAP: f32 = 0.12;
/// Wall gap used when an item is lined up beside another.
pub const BESIDE_WALL_GAP: f32 = 0.02;

/// Everything the engine reads or writes while applying a user action.
pub struct PlacementContext<'a> {
    pub state: &'a mut SceneState,
    pub catalog: &'a Catalog,
    pub room: &'a Room,
    pub settings: &'a FurnishSettings,
}

/// Where a new item should appear.
#[derive(Clone, Copy, Debug)]
pub enum SpawnAim {
    /// Follow the camera's view ray down to the floor.
    Camera(Ray3d),
    /// Explicit floor point.
    At(Vec2),
}

// ---------- Spawning ----------

/// Floor point for a new item. Camera aims that miss the floor fall back to
/// the room centre; camera aims get jitter so repeated spawns do not overlap.
pub fn spawn_point(room: &Room, settings: &FurnishSettings, aim: SpawnAim, rng: &mut impl Rng) -> Vec2 {
    let target = match aim {
        SpawnAim::Camera(ray) => {
            let j = settings.spawn_jitter;
            let p = project_to_floor(ray).unwrap_or(Vec2::ZERO);
            if j > 0.0 {
                p + Vec2::new(rng.random_range(-j..=j), rng.random_range(-j..=j))
            } else {
                p
            }
        }
        SpawnAim::At(p) => p,
    };
    clamp_to_room_xz(room, target.x, target.y, settings.clamp_margin)
}

/// Uniform scale that brings a model of height `model_height` to `target_height`.
pub fn normalized_scale(target_height: f32, model_height: f32) -> f32 {
    if model_height > 0.0 && target_height > 0.0 {
        target_height / model_height
    } else {
        1.0
    }
}

/// Create a placed item from a loaded prototype's extent.
pub fn spawn_item(ctx: &mut PlacementContext, kind: KindId, extent: Vec3, at: Vec2) -> Result<ItemId, SpawnError> {
    let def = ctx
        .catalog
        .get(kind)
        .ok_or_else(|| SpawnError::UnknownKind(format!("#{}", kind.0)))?;
    let margin = ctx.settings.clamp_margin;

    let mut item = PlacedItem::new(kind, extent, normalized_scale(def.target_height, extent.y));
    let p = clamp_to_room_xz(ctx.room, at.x, at.y, margin);
    item.position = Vec3::new(p.x, 0.0, p.y);

    if def.wall_snap {
        let side = nearest_wall_side(ctx.room, p.x, p.y);
        attach_to_wall(&mut item, ctx.room, side, ctx.settings.wall_gap, margin);
    } else {
        item.position.y = item.half_height();
    }
    Ok(ctx.state.insert(item))
}

// ---------- Walls ----------

/// Turn the item to face away from `side` and push it against that wall.
pub fn attach_to_wall(item: &mut PlacedItem, room: &Room, side: WallSide, gap: f32, margin: f32) {
    item.yaw = side.facing();
    snap_to_wall(item, room, side, gap, margin);
}

/// Keep the current yaw and re-seat the item against `side`: the wall's axis is
/// pinned so the outer face sits `gap` inside the wall, the other axis is clamped.
pub fn snap_to_wall(item: &mut PlacedItem, room: &Room, side: WallSide, gap: f32, margin: f32) {
    let size = item.world_size();
    let free = clamp_to_room_xz(room, item.position.x, item.position.z, margin);
    let (x, z) = match side {
        WallSide::Back => (free.x, -room.half_depth() + size.z * 0.5 + gap),
        WallSide::Front => (free.x, room.half_depth() - size.z * 0.5 - gap),
        WallSide::Left => (-room.half_width() + size.x * 0.5 + gap, free.y),
        WallSide::Right => (room.half_width() - size.x * 0.5 - gap, free.y),
    };
    item.position = Vec3::new(x, item.half_height(), z);
    item.wall_side = Some(side);
}

// ---------- Floor ----------

/// Rest the item on the floor where it stands.
pub fn settle_on_floor(state: &mut SceneState, id: ItemId) {
    state.unlink(id);
    if let Some(item) = state.get_mut(id) {
        item.position.y = item.half_height();
    }
}

// ---------- Stacking ----------

/// Where `item` would sit on `base`: centred over it, yaw matched, `gap` above its top.
pub fn stack_position(item: &PlacedItem, base: &PlacedItem, gap: f32) -> Vec3 {
    let size = rotated_extent(item.extent, item.scale, base.yaw);
    Vec3::new(
        base.position.x,
        base.world_box().max.y + size.y * 0.5 + gap,
        base.position.z,
    )
}

/// Record `item` as resting on `base` and move it there.
pub fn stack_on_top(state: &mut SceneState, item: ItemId, base: ItemId, gap: f32) -> Result<(), StackError> {
    state.link(item, base)?;
    align_on_base(state, item, gap);
    Ok(())
}

/// `stack_on_top`, refused when the catalog does not allow `item` on `base`.
pub fn stack_if_eligible(
    state: &mut SceneState,
    catalog: &Catalog,
    item: ItemId,
    base: ItemId,
    gap: f32,
) -> Result<(), StackError> {
    let child_kind = state.get(item).ok_or(StackError::UnknownItem(item))?.kind;
    let base_kind = state.get(base).ok_or(StackError::UnknownItem(base))?.kind;
    if !catalog.stack_eligible(child_kind, base_kind) {
        return Err(StackError::Ineligible { child: item, base });
    }
    stack_on_top(state, item, base, gap)
}

/// Re-derive a stacked item's yaw and position from its base.
fn align_on_base(state: &mut SceneState, id: ItemId, gap: f32) {
    let Some(base_id) = state.base_of(id) else { return };
    let Some(base) = state.get(base_id).cloned() else { return };
    let Some(item) = state.get_mut(id) else { return };
    item.yaw = base.yaw;
    item.wall_side = None;
    item.position = stack_position(item, &base, gap);
}

/// Re-seat everything resting on `id`, bases before the items on them.
pub fn restack_passengers(state: &mut SceneState, id: ItemId, gap: f32) {
    for child in state.descendants(id) {
        align_on_base(state, child, gap);
    }
}

/// Item ids that `dragged` may be dropped onto right now.
fn stack_candidates(state: &SceneState, catalog: &Catalog, dragged: ItemId) -> Vec<ItemId> {
    let Some(kind) = state.get(dragged).map(|i| i.kind) else {
        return Vec::new();
    };
    let carried = state.descendants(dragged);
    state
        .iter()
        .filter(|(id, other)| {
            *id != dragged && !carried.contains(id) && catalog.stack_eligible(kind, other.kind)
        })
        .map(|(id, _)| id)
        .collect()
}

/// Base under a dragged item: a downward probe from just above it, else the
/// nearest eligible item within the fallback radius.
pub fn find_stack_base(
    state: &SceneState,
    catalog: &Catalog,
    settings: &FurnishSettings,
    dragged: ItemId,
) -> Option<ItemId> {
    let origin = state.get(dragged)?.position;
    let candidates = stack_candidates(state, catalog, dragged);
    if candidates.is_empty() {
        return None;
    }

    let probe = Ray3d::new(origin + Vec3::Y * settings.probe_lift, Dir3::NEG_Y);
    if let Some(hit) = state
        .intersect_items(probe, settings.probe_max_distance, &candidates)
        .first()
    {
        return Some(hit.item);
    }

    candidates
        .iter()
        .filter_map(|&id| Some((id, state.get(id)?.position.distance(origin))))
        .filter(|(_, d)| *d <= settings.fallback_radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

// ---------- Arrangement helpers ----------

/// Stand `item` on the floor facing the same way as `target`, in front of it.
pub fn place_in_front_of(ctx: &mut PlacementContext, item: ItemId, target: ItemId, gap: f32) {
    let Some(t) = ctx.state.get(target).cloned() else { return };
    ctx.state.unlink(item);
    let Some(it) = ctx.state.get_mut(item) else { return };

    it.yaw = t.yaw;
    it.wall_side = None;
    let reach = t.extent.z * t.scale * 0.5 + it.extent.z * it.scale * 0.5 + gap;
    let p = t.position + t.yaw.forward() * reach;
    let p = clamp_to_room_xz(ctx.room, p.x, p.z, ctx.settings.clamp_margin);
    it.position = Vec3::new(p.x, it.half_height(), p.y);
    restack_passengers(ctx.state, item, ctx.settings.stack_gap);
}

/// Line `item` up next to `base` along base's right axis (`sign` < 0 for its
/// left), sharing the base's wall when it has one.
pub fn place_beside_on_wall(ctx: &mut PlacementContext, item: ItemId, base: ItemId, sign: f32, gap: f32) {
    let Some(b) = ctx.state.get(base).cloned() else { return };
    ctx.state.unlink(item);
    let margin = ctx.settings.clamp_margin;
    let Some(it) = ctx.state.get_mut(item) else { return };

    it.yaw = b.yaw;
    let reach = b.extent.x * b.scale * 0.5 + it.extent.x * it.scale * 0.5 + gap;
    let p = b.position + b.yaw.right() * reach * sign.signum();
    it.position = Vec3::new(p.x, it.position.y, p.z);
    match b.wall_side {
        Some(side) => attach_to_wall(it, ctx.room, side, BESIDE_WALL_GAP, margin),
        None => {
            it.wall_side = None;
            let c = clamp_to_room_xz(ctx.room, p.x, p.z, margin);
            it.position = Vec3::new(c.x, it.half_height(), c.y);
        }
    }
    restack_passengers(ctx.state, item, ctx.settings.stack_gap);
}

#[cfg(test)]
pub(crate) mod test_scene {
    use super::*;
    use crate::furnish::registry::test_catalog::kind;

    /// Insert a floor item of `key` with a unit-height prototype of `extent`.
    pub fn put(state: &mut SceneState, catalog: &Catalog, key: &str, extent: Vec3, at: Vec2) -> ItemId {
        let k = kind(catalog, key);
        let mut item = PlacedItem::new(k, extent, 1.0);
        item.position = Vec3::new(at.x, 0.0, at.y);
        item.position.y = item.half_height();
        state.insert(item)
    }
}
