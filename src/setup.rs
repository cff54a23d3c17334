use bevy::prelude::*;
use crate::input::CameraOrbit;
use crate::room::Room;

#[derive(Component)]
pub struct MainCamera;

/// Where the camera looks at startup: the room centre, a little above the floor.
const START_FOCUS: Vec3 = Vec3::new(0.0, 0.5, 0.0);

/// Starting camera position: a corner view from inside the walls.
pub fn start_eye(room: &Room) -> Vec3 {
    Vec3::new(
        (room.half_width() - 1.0).min(8.0),
        room.wall_height() * 0.6,
        (room.half_depth() - 1.0).min(8.0),
    )
}

/// Orbit parameters that reproduce `eye` around `focus`.
pub fn orbit_from(eye: Vec3, focus: Vec3) -> CameraOrbit {
    let offset = eye - focus;
    let radius = offset.length().max(f32::EPSILON);
    CameraOrbit {
        focus,
        radius,
        yaw: offset.z.atan2(offset.x),
        pitch: (offset.y / radius).clamp(-1.0, 1.0).asin(),
    }
}

pub fn setup(
    mut commands: Commands,
    room: Res<Room>,
) {
    // 1) Light
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 400.0,
        ..default()
    });
    commands.spawn((
        PointLight {
            shadows_enabled: true,
            intensity: 2_000_000.0,
            range: 40.0,
            ..default()
        },
        Transform::from_xyz(0.0, room.wall_height() - 0.5, 0.0),
    ));

    // 2) Camera
    let eye = start_eye(&room);
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(eye).looking_at(START_FOCUS, Vec3::Y),
        MainCamera,
        orbit_from(eye, START_FOCUS),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_reproduces_eye() {
        let eye = start_eye(&Room::default());
        assert!(eye.abs_diff_eq(Vec3::new(6.5, 3.6, 6.5), 1e-5));

        let o = orbit_from(eye, START_FOCUS);
        let xz = o.radius * o.pitch.cos();
        let back = o.focus + Vec3::new(xz * o.yaw.cos(), o.radius * o.pitch.sin(), xz * o.yaw.sin());
        assert!(back.abs_diff_eq(eye, 1e-4));
    }
}
