use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::input::{mouse::MouseMotion, keyboard::KeyCode, ButtonInput};

use crate::actions::{PlayerAction, ActionState};
use crate::furnish::ResizeRoom;
use crate::room::Room;
use crate::setup::MainCamera;

pub const MOVE_SPEED: f32 = 5.0;
pub const ROTATE_SPEED: f32 = 0.2;
pub const MAX_CAMERA_DT: f32 = 0.05; // never use a dt larger than 50ms
/// Camera and orbit focus stay this far from walls, floor and ceiling.
pub const CAMERA_MARGIN: f32 = 0.5;
pub const MIN_ZOOM: f32 = 1.0;

/// Width/depth change per key press (meters).
pub const ROOM_STEP: f32 = 1.0;
/// Wall height change per key press (meters).
pub const WALL_STEP: f32 = 0.5;

#[derive(Component)]
pub struct CameraOrbit {
    pub focus: Vec3,
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
}

pub fn input_mapping_system(
    keys: Res<ButtonInput<KeyCode>>,
    mut action_state: ResMut<ActionState>,
) {
    let any = |codes: &[KeyCode]| keys.any_pressed(codes.iter().copied());
    action_state.begin_frame();
    action_state.set(PlayerAction::MoveForward, any(&[KeyCode::KeyW, KeyCode::ArrowUp]));
    action_state.set(PlayerAction::MoveBackward, any(&[KeyCode::KeyS, KeyCode::ArrowDown]));
    action_state.set(PlayerAction::MoveLeft, any(&[KeyCode::KeyA, KeyCode::ArrowLeft]));
    action_state.set(PlayerAction::MoveRight, any(&[KeyCode::KeyD, KeyCode::ArrowRight]));

    for (key, action) in [
        (KeyCode::BracketLeft, PlayerAction::ShrinkRoom),
        (KeyCode::BracketRight, PlayerAction::GrowRoom),
        (KeyCode::Minus, PlayerAction::LowerWalls),
        (KeyCode::Equal, PlayerAction::RaiseWalls),
    ] {
        if keys.just_pressed(key) {
            action_state.trigger(action);
        }
    }
}

/// Resize request for a room-size shortcut, relative to the current room.
pub fn resize_for(action: PlayerAction, room: &Room) -> Option<ResizeRoom> {
    let (dw, dh) = match action {
        PlayerAction::ShrinkRoom => (-ROOM_STEP, 0.0),
        PlayerAction::GrowRoom => (ROOM_STEP, 0.0),
        PlayerAction::LowerWalls => (0.0, -WALL_STEP),
        PlayerAction::RaiseWalls => (0.0, WALL_STEP),
        _ => return None,
    };
    Some(ResizeRoom {
        width: room.width() + dw,
        depth: room.depth() + dw,
        wall_height: room.wall_height() + dh,
    })
}

pub fn room_size_shortcuts(
    action_state: Res<ActionState>,
    room: Res<Room>,
    mut resize: EventWriter<ResizeRoom>,
) {
    for action in [
        PlayerAction::ShrinkRoom,
        PlayerAction::GrowRoom,
        PlayerAction::LowerWalls,
        PlayerAction::RaiseWalls,
    ] {
        if !action_state.just_triggered(action) { continue; }
        if let Some(req) = resize_for(action, &room) {
            resize.write(req);
        }
    }
}

/// Keep a point inside the room box, `margin` away from every surface.
pub fn clamp_inside_room(p: Vec3, room: &Room, margin: f32) -> Vec3 {
    let hx = (room.half_width() - margin).max(0.0);
    let hz = (room.half_depth() - margin).max(0.0);
    let top = (room.wall_height() - margin).max(margin);
    Vec3::new(p.x.clamp(-hx, hx), p.y.clamp(margin, top), p.z.clamp(-hz, hz))
}

pub fn max_zoom(room: &Room) -> f32 {
    (1.5 * room.width().max(room.depth()).max(room.wall_height())).max(MIN_ZOOM)
}

pub fn camera_controller(
    time: Res<Time>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut motion_evr: EventReader<MouseMotion>,
    mut scroll_evr: EventReader<MouseWheel>,
    action_state: Res<ActionState>,
    room: Res<Room>,
    mut query: Query<(&mut Transform, &mut CameraOrbit), With<MainCamera>>,
) {
    // 0) Clamp delta
    let mut dt = time.delta_secs();
    if dt > MAX_CAMERA_DT {
        dt = MAX_CAMERA_DT;
    }

    let Ok((mut tf, mut orbit)) = query.single_mut() else { return; };

    // 1) Camera-relative movement
    let forward = Vec2::new(-orbit.yaw.cos(), -orbit.yaw.sin());
    let right = Vec2::new(-forward.y, forward.x);

    let mut dir = Vec2::ZERO;
    if action_state.pressed(PlayerAction::MoveForward) { dir += forward; }
    if action_state.pressed(PlayerAction::MoveBackward) { dir -= forward; }
    if action_state.pressed(PlayerAction::MoveLeft) { dir -= right; }
    if action_state.pressed(PlayerAction::MoveRight) { dir += right; }

    if dir != Vec2::ZERO {
        let delta = dir.normalize() * MOVE_SPEED * dt;
        orbit.focus.x += delta.x;
        orbit.focus.z += delta.y;
    }

    // 2) Keep the focus in the room
    orbit.focus = clamp_inside_room(orbit.focus, &room, CAMERA_MARGIN);

    // 3) Zoom
    for ev in scroll_evr.read() {
        let amount = match ev.unit {
            MouseScrollUnit::Line => ev.y * 0.5,
            MouseScrollUnit::Pixel => ev.y * 0.01,
        };
        orbit.radius = (orbit.radius - amount).clamp(MIN_ZOOM, max_zoom(&room));
    }

    // 4) Orbit
    if mouse_buttons.pressed(MouseButton::Middle) {
        for ev in motion_evr.read() {
            orbit.yaw += ev.delta.x * ROTATE_SPEED * dt;
            orbit.pitch += ev.delta.y * ROTATE_SPEED * dt;
        }
    } else {
        motion_evr.clear();
    }

    orbit.pitch = orbit.pitch.clamp(
        -std::f32::consts::FRAC_PI_2 + 0.01,
        std::f32::consts::FRAC_PI_2 - 0.01,
    );

    // 5) Position camera
    let xz_radius = orbit.radius * orbit.pitch.cos();
    let offset = Vec3::new(
        xz_radius * orbit.yaw.cos(),
        orbit.radius * orbit.pitch.sin(),
        xz_radius * orbit.yaw.sin(),
    );

    // 6) Never leave the room
    tf.translation = clamp_inside_room(orbit.focus + offset, &room, CAMERA_MARGIN);

    tf.look_at(orbit.focus, Vec3::Y);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcuts_step_the_room() {
        let room = Room::default();
        let grow = resize_for(PlayerAction::GrowRoom, &room).unwrap();
        assert_eq!((grow.width, grow.depth, grow.wall_height), (16.0, 16.0, 6.0));
        let lower = resize_for(PlayerAction::LowerWalls, &room).unwrap();
        assert_eq!(lower.wall_height, 5.5);
        assert!(resize_for(PlayerAction::MoveLeft, &room).is_none());
    }

    #[test]
    fn camera_stays_inside_walls() {
        let room = Room::default();
        let p = clamp_inside_room(Vec3::new(20.0, -3.0, -9.0), &room, CAMERA_MARGIN);
        assert_eq!(p, Vec3::new(7.0, 0.5, -7.0));
        assert_eq!(max_zoom(&room), 22.5);
    }
}
