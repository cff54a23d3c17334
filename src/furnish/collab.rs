// src/furnish/collab.rs
//! Seams to the rendering/asset side. The engine only talks to these traits,
//! so tests can stand in for the scene without an `App`.

use bevy::prelude::*;

use super::assets::{ModelLoadError, Prototype};
use super::core::ItemId;

/// One ray hit against a placed item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemHit {
    pub item: ItemId,
    pub distance: f32,
}

/// Ray picking against placed items.
pub trait HitTest {
    /// Hits among `candidates` within `max_distance`, nearest first.
    fn intersect_items(&self, ray: Ray3d, max_distance: f32, candidates: &[ItemId]) -> Vec<ItemHit>;
}

/// Result of polling an in-flight prototype load.
#[derive(Debug)]
pub enum LoadPoll {
    Pending,
    Ready(Prototype),
    Failed(ModelLoadError),
}

/// Fetches model prototypes by asset ref.
pub trait PrototypeLoader {
    type Handle: Clone;

    fn begin_load(&self, asset_ref: &str) -> Self::Handle;

    fn poll(&self, asset_ref: &str, handle: &Self::Handle) -> LoadPoll;
}
