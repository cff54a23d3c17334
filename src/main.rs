use bevy::prelude::*;

mod actions;
mod furnish;
mod input;
mod room;
mod setup;
mod ui;

// re-export the bits we actually need in main
use actions::ActionState;
use furnish::FurnishPlugin;
use input::{camera_controller, input_mapping_system, room_size_shortcuts};
use room::RoomPlugin;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Planterior".into(),
                ..default()
            }),
            ..default()
        }))
        // your domain plugins
        .add_plugins(RoomPlugin)      // room envelope + wall/floor shell
        .add_plugins(FurnishPlugin)   // catalog, placement, drag/stack/rotate/delete
        .init_resource::<ActionState>()
        // camera, lights
        .add_systems(Startup, (setup::setup, ui::spawn_hud))
        // input + camera each frame
        .add_systems(
            Update,
            (input_mapping_system, camera_controller, room_size_shortcuts).chain(),
        )
        .add_systems(
            Update,
            (
                ui::build_toolbar,
                ui::toolbar_clicks,
                ui::update_room_readout,
                ui::show_spawn_failures,
            ),
        )
        .run();
}
