// src/room/systems.rs

use bevy::prelude::*;
use bevy::math::primitives::{Cuboid, Plane3d};

use crate::room::components::{Room, RoomShell};

const WALL_THICKNESS: f32 = 0.05;

/// Despawn and regenerate floor, four walls and ceiling for the current `Room`.
pub fn rebuild_room_shell(
    mut commands: Commands,
    room: Res<Room>,
    shell: Query<Entity, With<RoomShell>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for e in &shell {
        commands.entity(e).despawn();
    }

    let (w, d, h) = (room.width(), room.depth(), room.wall_height());

    let floor_mat = materials.add(StandardMaterial {
        base_color: Color::srgb_u8(156, 118, 82),
        perceptual_roughness: 0.85,
        ..Default::default()
    });
    let wall_mat = materials.add(StandardMaterial {
        base_color: Color::srgb_u8(244, 239, 231),
        perceptual_roughness: 1.0,
        double_sided: true,
        cull_mode: None,
        ..Default::default()
    });

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(w, d))),
        MeshMaterial3d(floor_mat),
        Transform::IDENTITY,
        RoomShell,
        Name::new("Floor"),
    ));

    // Back/front span the width, left/right span the depth.
    let back_front = meshes.add(Mesh::from(Cuboid::new(w, h, WALL_THICKNESS)));
    let left_right = meshes.add(Mesh::from(Cuboid::new(WALL_THICKNESS, h, d)));
    let walls = [
        ("Wall (back)", back_front.clone(), Vec3::new(0.0, h * 0.5, -d * 0.5)),
        ("Wall (front)", back_front, Vec3::new(0.0, h * 0.5, d * 0.5)),
        ("Wall (left)", left_right.clone(), Vec3::new(-w * 0.5, h * 0.5, 0.0)),
        ("Wall (right)", left_right, Vec3::new(w * 0.5, h * 0.5, 0.0)),
    ];
    for (name, mesh, at) in walls {
        commands.spawn((
            Mesh3d(mesh),
            MeshMaterial3d(wall_mat.clone()),
            Transform::from_translation(at),
            RoomShell,
            Name::new(name),
        ));
    }

    commands.spawn((
        Mesh3d(meshes.add(Mesh::from(Cuboid::new(w, WALL_THICKNESS, d)))),
        MeshMaterial3d(wall_mat),
        Transform::from_xyz(0.0, h, 0.0),
        RoomShell,
        Name::new("Ceiling"),
    ));

    info!("Room: rebuilt shell {w:.1}m x {d:.1}m x {h:.1}m");
}
