use bevy::prelude::*;

use crate::room::components::Room;
use crate::room::systems::rebuild_room_shell;

pub struct RoomPlugin;

impl Plugin for RoomPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Room>()
            // first run sees the freshly inserted resource as changed, so this also builds the initial shell
            .add_systems(Update, rebuild_room_shell.run_if(resource_changed::<Room>));
    }
}
