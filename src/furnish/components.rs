use bevy::prelude::*;

use crate::furnish::core::ItemId;

/// Back-reference from a rendered item to its `PlacedItem`.
#[derive(Component, Clone, Copy, Debug)]
pub struct ItemTag(pub ItemId);

/// Translucent box showing where a dragged item would stack.
#[derive(Component)]
pub struct StackGhost {
    pub base: ItemId,
    /// World size the ghost mesh was built for.
    pub size: Vec3,
}
