use bevy::prelude::*;
use bevy::ui::BackgroundColor;

use crate::furnish::plugin::CatalogHandle;
use crate::furnish::queue::SpawnFailed;
use crate::furnish::registry::Catalog;
use crate::furnish::SpawnItem;
use crate::room::Room;

const BUTTON_IDLE: Color = Color::srgba(0.12, 0.14, 0.12, 0.85);
const BUTTON_HOVER: Color = Color::srgba(0.22, 0.36, 0.24, 0.95);
const BUTTON_PRESSED: Color = Color::srgba(0.30, 0.55, 0.32, 1.0);

const CONTROLS_HINT: &str = "LMB drag: move / stack    double-click: rotate 90\u{b0}    RMB: delete\n\
WASD / arrows: pan    MMB drag: orbit    wheel: zoom\n\
[ ]: room size    - =: wall height";

/// Row of spawn buttons along the bottom edge.
#[derive(Component)]
pub struct Toolbar;

/// Spawn button for one catalog kind.
#[derive(Component)]
pub struct ToolbarButton(pub String);

#[derive(Component)]
pub struct RoomReadout;

#[derive(Component)]
pub struct StatusLine;

fn label_font(size: f32) -> TextFont {
    TextFont { font_size: size, ..default() }
}

/// Startup: controls hint, room readout and an empty toolbar row.
pub fn spawn_hud(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(8.0),
                left: Val::Px(8.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(4.0),
                padding: UiRect::all(Val::Px(6.0)),
                ..default()
            },
            BackgroundColor(Color::linear_rgba(0.0, 0.0, 0.0, 0.45)),
        ))
        .with_children(|parent| {
            parent.spawn((Text::new(CONTROLS_HINT), label_font(14.0), TextColor(Color::WHITE)));
            parent.spawn((Text::new(""), label_font(14.0), TextColor(Color::srgb(0.8, 0.95, 0.8)), RoomReadout));
            parent.spawn((Text::new(""), label_font(14.0), TextColor(Color::srgb(1.0, 0.6, 0.5)), StatusLine));
        });

    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(8.0),
            left: Val::Px(8.0),
            right: Val::Px(8.0),
            flex_wrap: FlexWrap::Wrap,
            justify_content: JustifyContent::Center,
            column_gap: Val::Px(4.0),
            row_gap: Val::Px(4.0),
            ..default()
        },
        Toolbar,
    ));
}

/// Update: fill the toolbar once the catalog is loaded.
pub fn build_toolbar(
    mut commands: Commands,
    handle: Res<CatalogHandle>,
    catalogs: Res<Assets<Catalog>>,
    toolbar: Query<Entity, With<Toolbar>>,
    mut built: Local<bool>,
) {
    if *built { return; }
    let Some(catalog) = catalogs.get(&handle.0) else { return };
    let Ok(row) = toolbar.single() else { return };
    *built = true;

    commands.entity(row).with_children(|parent| {
        for (_, def) in catalog.toolbar() {
            parent
                .spawn((
                    Button,
                    Node {
                        padding: UiRect::axes(Val::Px(8.0), Val::Px(4.0)),
                        ..default()
                    },
                    BackgroundColor(BUTTON_IDLE),
                    ToolbarButton(def.key.clone()),
                ))
                .with_children(|b| {
                    b.spawn((Text::new(def.label.clone()), label_font(13.0), TextColor(Color::WHITE)));
                });
        }
    });
    info!("UI: toolbar built with {} buttons", catalog.toolbar().count());
}

/// Clicking a toolbar button spawns its kind at the camera's aim.
pub fn toolbar_clicks(
    mut buttons: Query<(&Interaction, &ToolbarButton, &mut BackgroundColor), Changed<Interaction>>,
    mut spawn: EventWriter<SpawnItem>,
) {
    for (interaction, button, mut color) in &mut buttons {
        match interaction {
            Interaction::Pressed => {
                color.0 = BUTTON_PRESSED;
                spawn.write(SpawnItem::at_camera(button.0.clone()));
            }
            Interaction::Hovered => color.0 = BUTTON_HOVER,
            Interaction::None => color.0 = BUTTON_IDLE,
        }
    }
}

pub fn update_room_readout(room: Res<Room>, mut readout: Query<&mut Text, With<RoomReadout>>) {
    if !room.is_changed() { return; }
    for mut text in &mut readout {
        text.0 = format!(
            "Room {:.1} m x {:.1} m, walls {:.1} m",
            room.width(), room.depth(), room.wall_height()
        );
    }
}

pub fn show_spawn_failures(
    mut failures: EventReader<SpawnFailed>,
    mut status: Query<&mut Text, With<StatusLine>>,
) {
    let Some(last) = failures.read().last() else { return };
    for mut text in &mut status {
        text.0 = format!("Could not add '{}': {}", last.key, last.error);
    }
}
