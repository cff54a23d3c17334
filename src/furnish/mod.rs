pub mod assets;
pub mod collab;
pub mod components;
pub mod core;
pub mod interaction;
pub mod placement;
pub mod plugin;
pub mod queue;
pub mod registry;
pub mod resize;
pub mod starter;
pub mod state;
mod systems;

pub use plugin::FurnishPlugin;
pub use queue::SpawnItem;
pub use resize::ResizeRoom;
