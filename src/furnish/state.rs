// src/furnish/state.rs
use bevy::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::furnish::collab::{HitTest, ItemHit};
use crate::furnish::core::{
    half_of_height, rotated_extent, ItemId, KindId, QuarterTurns, WallSide, WorldBox,
};
use crate::furnish::registry::Catalog;
use crate::room::Room;

/// One spawned model in the room.
#[derive(Clone, Debug)]
pub struct PlacedItem {
    pub kind: KindId,
    /// Centre of the world bounds; y is the half-height above the support surface.
    pub position: Vec3,
    pub yaw: QuarterTurns,
    /// Uniform scale applied to `extent`.
    pub scale: f32,
    /// Size of the recentred prototype in model units.
    pub extent: Vec3,
    /// Set when hugging a wall; dragging then moves along that wall only.
    pub wall_side: Option<WallSide>,
    stacked_on: Option<ItemId>,
    stacked_items: Vec<ItemId>,
}

impl PlacedItem {
    pub fn new(kind: KindId, extent: Vec3, scale: f32) -> Self {
        Self {
            kind,
            position: Vec3::ZERO,
            yaw: QuarterTurns::ZERO,
            scale,
            extent,
            wall_side: None,
            stacked_on: None,
            stacked_items: Vec::new(),
        }
    }

    /// Bounding-box size after scale and yaw. Recomputed on every call.
    pub fn world_size(&self) -> Vec3 {
        rotated_extent(self.extent, self.scale, self.yaw)
    }

    pub fn half_height(&self) -> f32 {
        half_of_height(self.world_size().y)
    }

    pub fn world_box(&self) -> WorldBox {
        WorldBox::from_center_size(self.position, self.world_size())
    }

    #[inline]
    pub fn stacked_on(&self) -> Option<ItemId> { self.stacked_on }

    #[inline]
    pub fn stacked_items(&self) -> &[ItemId] { &self.stacked_items }

    pub fn transform(&self) -> Transform {
        Transform {
            translation: self.position,
            rotation: self.yaw.to_quat(),
            scale: Vec3::splat(self.scale),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StackError {
    #[error("no placed item {0:?}")]
    UnknownItem(ItemId),
    #[error("item {0:?} cannot rest on itself")]
    SelfStack(ItemId),
    #[error("stacking {child:?} on {base:?} would form a cycle")]
    Cycle { child: ItemId, base: ItemId },
    #[error("item {child:?} is not allowed on {base:?}")]
    Ineligible { child: ItemId, base: ItemId },
}

/// Every placed item plus the resting-on relation between them.
/// Ordered by id so scans (fallback base search, resize) are deterministic.
#[derive(Resource, Default, Debug)]
pub struct SceneState {
    items: BTreeMap<ItemId, PlacedItem>,
    next_id: u64,
}

impl SceneState {
    pub fn insert(&mut self, mut item: PlacedItem) -> ItemId {
        item.stacked_on = None;
        item.stacked_items.clear();
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.items.insert(id, item);
        id
    }

    pub fn get(&self, id: ItemId) -> Option<&PlacedItem> {
        self.items.get(&id)
    }

    /// Geometry access; the relation fields stay behind `link`/`unlink`.
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut PlacedItem> {
        self.items.get_mut(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &PlacedItem)> {
        self.items.iter().map(|(&id, item)| (id, item))
    }

    /// Remove an item, detaching it from its base and releasing its passengers.
    /// Returns the item and the ids that were resting on it.
    pub fn remove(&mut self, id: ItemId) -> Option<(PlacedItem, Vec<ItemId>)> {
        self.unlink(id);
        let mut item = self.items.remove(&id)?;
        let orphans = std::mem::take(&mut item.stacked_items);
        for child in &orphans {
            if let Some(c) = self.items.get_mut(child) {
                c.stacked_on = None;
            }
        }
        Some((item, orphans))
    }

    /// Record `child` as resting on `base`, detaching it from any previous base.
    pub fn link(&mut self, child: ItemId, base: ItemId) -> Result<(), StackError> {
        if child == base {
            return Err(StackError::SelfStack(child));
        }
        for id in [child, base] {
            if !self.contains(id) {
                return Err(StackError::UnknownItem(id));
            }
        }
        if self.chain_contains(base, child) {
            return Err(StackError::Cycle { child, base });
        }
        if self.base_of(child) == Some(base) {
            return Ok(());
        }
        self.unlink(child);
        if let Some(c) = self.items.get_mut(&child) {
            c.stacked_on = Some(base);
        }
        if let Some(b) = self.items.get_mut(&base) {
            b.stacked_items.push(child);
        }
        Ok(())
    }

    /// Clear `child`'s base, returning the former base.
    pub fn unlink(&mut self, child: ItemId) -> Option<ItemId> {
        let base = self.items.get_mut(&child)?.stacked_on.take()?;
        if let Some(b) = self.items.get_mut(&base) {
            b.stacked_items.retain(|&id| id != child);
        }
        Some(base)
    }

    pub fn base_of(&self, id: ItemId) -> Option<ItemId> {
        self.items.get(&id).and_then(|i| i.stacked_on)
    }

    pub fn passengers(&self, id: ItemId) -> Vec<ItemId> {
        self.items.get(&id).map(|i| i.stacked_items.clone()).unwrap_or_default()
    }

    /// Bottom of the stack `id` belongs to (itself when resting on the floor).
    pub fn root_of(&self, id: ItemId) -> ItemId {
        let mut cur = id;
        let mut guard = self.items.len();
        while let Some(base) = self.base_of(cur) {
            cur = base;
            guard = guard.saturating_sub(1);
            if guard == 0 {
                break;
            }
        }
        cur
    }

    /// Everything resting on `id`, directly or transitively, bases before dependents.
    pub fn descendants(&self, id: ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        let mut frontier = self.passengers(id);
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for child in frontier {
                if child == id || out.contains(&child) {
                    continue;
                }
                next.extend(self.passengers(child));
                out.push(child);
            }
            frontier = next;
        }
        out
    }

    /// Does walking down from `start` through its bases reach `target`?
    fn chain_contains(&self, start: ItemId, target: ItemId) -> bool {
        let mut cur = Some(start);
        let mut guard = self.items.len() + 1;
        while let Some(id) = cur {
            if id == target {
                return true;
            }
            guard = guard.saturating_sub(1);
            if guard == 0 {
                return true;
            }
            cur = self.base_of(id);
        }
        false
    }

    /// Nearest item under a pointer ray.
    pub fn pick(&self, ray: Ray3d, max_distance: f32) -> Option<ItemId> {
        let all = self.ids();
        self.intersect_items(ray, max_distance, &all).first().map(|h| h.item)
    }

    pub fn snapshot(&self, room: &Room, catalog: &Catalog) -> RoomSnapshot {
        let key_of = |id: ItemId| {
            self.get(id)
                .and_then(|i| catalog.get(i.kind))
                .map(|d| d.key.clone())
                .unwrap_or_else(|| "unknown".to_string())
        };
        let objects = self
            .iter()
            .map(|(id, item)| {
                let def = catalog.get(item.kind);
                ItemSnapshot {
                    id: id.0,
                    key: def.map(|d| d.key.clone()).unwrap_or_else(|| "unknown".to_string()),
                    label: def.map(|d| d.label.clone()).unwrap_or_default(),
                    position: [
                        round_cm(item.position.x),
                        round_cm(item.position.y),
                        round_cm(item.position.z),
                    ],
                    yaw_degrees: item.yaw.degrees(),
                    wall_side: item.wall_side,
                    placed_on: item.stacked_on.map(key_of),
                    placed_items: item.stacked_items.iter().map(|&c| key_of(c)).collect(),
                }
            })
            .collect();
        RoomSnapshot {
            width: room.width(),
            depth: room.depth(),
            wall_height: room.wall_height(),
            objects,
        }
    }
}

impl HitTest for SceneState {
    fn intersect_items(&self, ray: Ray3d, max_distance: f32, candidates: &[ItemId]) -> Vec<ItemHit> {
        let mut hits: Vec<ItemHit> = candidates
            .iter()
            .filter_map(|&id| {
                let item = self.get(id)?;
                let distance = item.world_box().ray_hit(ray, max_distance)?;
                Some(ItemHit { item: id, distance })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

fn round_cm(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

/// Loggable view of the room and everything in it.
#[derive(Clone, Debug, Serialize)]
pub struct RoomSnapshot {
    pub width: f32,
    pub depth: f32,
    pub wall_height: f32,
    pub objects: Vec<ItemSnapshot>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ItemSnapshot {
    pub id: u64,
    pub key: String,
    pub label: String,
    pub position: [f32; 3],
    pub yaw_degrees: f32,
    pub wall_side: Option<WallSide>,
    pub placed_on: Option<String>,
    pub placed_items: Vec<String>,
}
