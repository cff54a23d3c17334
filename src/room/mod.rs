mod components;
mod plugin;
mod systems;

pub use components::Room;
pub use plugin::RoomPlugin;
