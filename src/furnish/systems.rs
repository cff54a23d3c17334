// src/furnish/systems.rs
//! Bevy adapters around the furnishing engine: they turn input and asset
//! events into engine calls and mirror `SceneState` into entities.

use std::collections::HashSet;

use bevy::asset::LoadState;
use bevy::gltf::{Gltf, GltfMesh, GltfNode};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use ron::ser::PrettyConfig;

use crate::furnish::assets::{GltfPrototypeLoader, PendingSpawn, Prototype, Requested};
use crate::furnish::components::{ItemTag, StackGhost};
use crate::furnish::interaction::{Committed, InteractionController, PointerButton};
use crate::furnish::placement::{spawn_item, spawn_point, PlacementContext, SpawnAim};
use crate::furnish::plugin::{CatalogHandle, FurnishSettings, ModelCache, SpawnRng};
use crate::furnish::queue::{CommitAction, SceneCommitted, SpawnError, SpawnFailed, SpawnItem};
use crate::furnish::registry::Catalog;
use crate::furnish::resize::{resize_room, ResizeRoom};
use crate::furnish::starter::{furnish_starter_room, StarterLayout, STARTER_KEYS};
use crate::furnish::state::SceneState;
use crate::room::Room;
use crate::setup::MainCamera;

type GltfAssets<'w> = (
    Res<'w, AssetServer>,
    Res<'w, Assets<Gltf>>,
    Res<'w, Assets<GltfNode>>,
    Res<'w, Assets<GltfMesh>>,
    Res<'w, Assets<Mesh>>,
);

fn gltf_loader<'a>(assets: &'a GltfAssets) -> GltfPrototypeLoader<'a> {
    let (server, gltfs, nodes, gltf_meshes, meshes) = assets;
    GltfPrototypeLoader { server, gltfs, nodes, gltf_meshes, meshes }
}

impl From<Committed> for SceneCommitted {
    fn from(c: Committed) -> Self {
        let (action, item) = match c {
            Committed::Moved(id) => (CommitAction::Moved, id),
            Committed::Rotated(id) => (CommitAction::Rotated, id),
            Committed::Deleted(id) => (CommitAction::Deleted, id),
        };
        SceneCommitted { action, item: Some(item) }
    }
}

/// Place one item whose prototype is ready, reporting the outcome.
fn commit_spawn(
    ctx: &mut PlacementContext,
    pending: PendingSpawn,
    proto: &Prototype,
    committed: &mut EventWriter<SceneCommitted>,
    failed: &mut EventWriter<SpawnFailed>,
) {
    match spawn_item(ctx, pending.kind, proto.extent, pending.at) {
        Ok(id) => {
            committed.write(SceneCommitted { action: CommitAction::Spawned, item: Some(id) });
        }
        Err(error) => {
            let key = ctx.catalog.get(pending.kind).map(|d| d.key.clone()).unwrap_or_default();
            error!("Furnish: spawn of '{key}' failed: {error}");
            failed.write(SpawnFailed { key, error });
        }
    }
}

/// Turn spawn requests into prototype requests; memoised prototypes spawn at once.
pub fn request_spawns(
    mut requests: EventReader<SpawnItem>,
    mut backlog: Local<Vec<SpawnItem>>,
    mut committed: EventWriter<SceneCommitted>,
    mut failed: EventWriter<SpawnFailed>,
    handle: Res<CatalogHandle>,
    catalogs: Res<Assets<Catalog>>,
    camera: Query<&GlobalTransform, With<MainCamera>>,
    settings: Res<FurnishSettings>,
    room: Res<Room>,
    mut rng: ResMut<SpawnRng>,
    mut cache: ResMut<ModelCache>,
    mut scene: ResMut<SceneState>,
    gltf_assets: GltfAssets,
) {
    backlog.extend(requests.read().cloned());
    if backlog.is_empty() { return; }
    // hold requests until the catalog is in, fail them if it never will be
    let Some(catalog) = catalogs.get(&handle.0) else {
        if let Some(LoadState::Failed(err)) = gltf_assets.0.get_load_state(handle.0.id()) {
            let error = SpawnError::CatalogUnavailable(err.to_string());
            error!("Furnish: dropping {} queued spawns: {error}", backlog.len());
            failed.write_batch(SpawnFailed::drain_all(&mut backlog, &error));
        }
        return;
    };
    let loader = gltf_loader(&gltf_assets);

    for req in backlog.drain(..) {
        let Some(kind) = catalog.index_of(&req.key) else {
            let error = SpawnError::UnknownKind(req.key.clone());
            error!("Furnish: {error}");
            failed.write(SpawnFailed { key: req.key, error });
            continue;
        };
        let Some(def) = catalog.get(kind) else { continue };

        let aim = match (req.at, camera.single()) {
            (Some(p), _) => SpawnAim::At(p),
            (None, Ok(tf)) => SpawnAim::Camera(Ray3d::new(tf.translation(), tf.forward())),
            (None, Err(_)) => SpawnAim::At(Vec2::ZERO),
        };
        let at = spawn_point(&room, &settings, aim, &mut rng.0);
        let pending = PendingSpawn { kind, at };

        match cache.request(&loader, &def.asset, pending) {
            Requested::Ready(proto, pending) => {
                let mut ctx = PlacementContext { state: &mut scene, catalog, room: &room, settings: &settings };
                commit_spawn(&mut ctx, pending, &proto, &mut committed, &mut failed);
            }
            Requested::Started => info!("Furnish: loading model '{}' for '{}'", def.asset, def.key),
            Requested::Joined => debug!("Furnish: '{}' joins in-flight load of '{}'", def.key, def.asset),
        }
    }
}

/// Finish spawns whose prototype load completed; failures reach every waiter.
pub fn poll_prototype_loads(
    mut committed: EventWriter<SceneCommitted>,
    mut failed: EventWriter<SpawnFailed>,
    handle: Res<CatalogHandle>,
    catalogs: Res<Assets<Catalog>>,
    settings: Res<FurnishSettings>,
    room: Res<Room>,
    mut cache: ResMut<ModelCache>,
    mut scene: ResMut<SceneState>,
    gltf_assets: GltfAssets,
) {
    if cache.in_flight_len() == 0 { return; }
    let Some(catalog) = catalogs.get(&handle.0) else { return };
    let loader = gltf_loader(&gltf_assets);

    for resolved in cache.poll(&loader) {
        match resolved.result {
            Ok(proto) => {
                info!(
                    "Furnish: model '{}' ready ({:.2} x {:.2} x {:.2}), {} waiting",
                    resolved.asset_ref, proto.extent.x, proto.extent.y, proto.extent.z,
                    resolved.waiters.len()
                );
                let mut ctx = PlacementContext { state: &mut scene, catalog, room: &room, settings: &settings };
                for pending in resolved.waiters {
                    commit_spawn(&mut ctx, pending, &proto, &mut committed, &mut failed);
                }
            }
            Err(err) => {
                for pending in resolved.waiters {
                    let key = catalog.get(pending.kind).map(|d| d.key.clone()).unwrap_or_default();
                    error!("Furnish: spawn of '{key}' failed: {err}");
                    failed.write(SpawnFailed { key, error: SpawnError::ModelLoad(err.clone()) });
                }
            }
        }
    }
}

/// Load the starter furniture's models, then lay the room out once they are all in.
/// A model that fails to load skips the layout.
pub fn lay_out_starter_room(
    mut layout: ResMut<StarterLayout>,
    mut committed: EventWriter<SceneCommitted>,
    handle: Res<CatalogHandle>,
    catalogs: Res<Assets<Catalog>>,
    settings: Res<FurnishSettings>,
    room: Res<Room>,
    mut cache: ResMut<ModelCache>,
    mut scene: ResMut<SceneState>,
    gltf_assets: GltfAssets,
) {
    if !settings.starter_room {
        *layout = StarterLayout::Done;
        return;
    }
    let Some(catalog) = catalogs.get(&handle.0) else { return };
    let refs: Vec<&str> = STARTER_KEYS
        .iter()
        .filter_map(|key| catalog.index_of(key).and_then(|kind| catalog.get(kind)))
        .map(|def| def.asset.as_str())
        .collect();
    if refs.len() != STARTER_KEYS.len() {
        warn!("Furnish: starter room skipped, catalog lacks one of {STARTER_KEYS:?}");
        *layout = StarterLayout::Done;
        return;
    }

    if *layout == StarterLayout::Pending {
        let loader = gltf_loader(&gltf_assets);
        for asset_ref in &refs {
            cache.preload(&loader, asset_ref);
        }
        *layout = StarterLayout::Loading;
        return;
    }
    if let Some(lost) = refs.iter().find(|r| !cache.is_ready(r) && !cache.is_loading(r)) {
        warn!("Furnish: starter room skipped, '{lost}' failed to load");
        *layout = StarterLayout::Done;
        return;
    }
    if !refs.iter().all(|r| cache.is_ready(r)) { return; }

    *layout = StarterLayout::Done;
    let mut ctx = PlacementContext { state: &mut scene, catalog, room: &room, settings: &settings };
    let laid = furnish_starter_room(&mut ctx, |kind| {
        catalog.get(kind).and_then(|def| cache.get(&def.asset)).map(|p| p.extent)
    });
    match laid {
        Ok(laid) => {
            info!("Furnish: starter room laid out");
            for id in laid.ids() {
                committed.write(SceneCommitted { action: CommitAction::Spawned, item: Some(id) });
            }
        }
        Err(err) => warn!("Furnish: starter room incomplete: {err}"),
    }
}

/// Pointer ray under the cursor, if the cursor is in the primary window.
fn pointer_ray(
    windows: &Query<&Window, With<PrimaryWindow>>,
    cameras: &Query<(&Camera, &GlobalTransform), With<MainCamera>>,
) -> Option<Ray3d> {
    let window = windows.single().ok()?;
    let cursor = window.cursor_position()?;
    let (camera, cam_tf) = cameras.single().ok()?;
    camera.viewport_to_world(cam_tf, cursor).ok()
}

/// Feed mouse presses, drags and releases to the interaction controller.
pub fn handle_pointer(
    time: Res<Time>,
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    ui_buttons: Query<&Interaction, With<Button>>,
    mut controller: ResMut<InteractionController>,
    mut scene: ResMut<SceneState>,
    handle: Res<CatalogHandle>,
    catalogs: Res<Assets<Catalog>>,
    room: Res<Room>,
    settings: Res<FurnishSettings>,
    mut committed: EventWriter<SceneCommitted>,
) {
    let now = time.elapsed_secs_f64();
    controller.tick(now);
    let Some(catalog) = catalogs.get(&handle.0) else { return };

    let over_ui = ui_buttons.iter().any(|i| *i != Interaction::None);
    let press_left = mouse.just_pressed(MouseButton::Left) && !over_ui;
    let press_right = mouse.just_pressed(MouseButton::Right) && !over_ui;
    let release = mouse.just_released(MouseButton::Left);
    let dragging = controller.dragging().is_some() && mouse.pressed(MouseButton::Left);
    if !(press_left || press_right || release || dragging) { return; }

    let ray = pointer_ray(&windows, &cameras);
    let mut ctx = PlacementContext { state: &mut scene, catalog, room: &room, settings: &settings };
    let mut done = Vec::new();

    if let Some(ray) = ray {
        if press_left {
            done.extend(controller.pointer_down(&mut ctx, PointerButton::Primary, ray, now));
        }
        if press_right {
            done.extend(controller.pointer_down(&mut ctx, PointerButton::Secondary, ray, now));
        }
        if dragging {
            controller.pointer_move(&mut ctx, ray);
        }
    }
    if release {
        done.extend(controller.pointer_up(&mut ctx));
    }
    for c in done {
        committed.write(c.into());
    }
}

/// Apply resize requests; non-numeric input is logged and ignored.
pub fn apply_resize_requests(
    mut requests: EventReader<ResizeRoom>,
    mut room: ResMut<Room>,
    mut scene: ResMut<SceneState>,
    settings: Res<FurnishSettings>,
    mut committed: EventWriter<SceneCommitted>,
) {
    for req in requests.read() {
        match resize_room(&mut room, &mut scene, &settings, req.width, req.depth, req.wall_height) {
            Ok(()) => {
                committed.write(SceneCommitted { action: CommitAction::Resized, item: None });
            }
            Err(err) => warn!("Furnish: resize rejected: {err}"),
        }
    }
}

/// Spawn, move and despawn item entities so they match `SceneState`.
pub fn sync_item_entities(
    mut commands: Commands,
    scene: Res<SceneState>,
    cache: Res<ModelCache>,
    handle: Res<CatalogHandle>,
    catalogs: Res<Assets<Catalog>>,
    mut items: Query<(Entity, &ItemTag, &mut Transform)>,
) {
    let mut present = HashSet::new();
    for (e, tag, mut tf) in &mut items {
        match scene.get(tag.0) {
            Some(item) => {
                let target = item.transform();
                if *tf != target {
                    *tf = target;
                }
                present.insert(tag.0);
            }
            None => commands.entity(e).despawn(),
        }
    }

    let Some(catalog) = catalogs.get(&handle.0) else { return };
    for (id, item) in scene.iter() {
        if present.contains(&id) { continue; }
        let Some(def) = catalog.get(item.kind) else { continue };
        let Some(proto) = cache.get(&def.asset) else { continue };

        commands
            .spawn((
                item.transform(),
                Visibility::default(),
                ItemTag(id),
                Name::new(format!("{} {:?}", def.label, id)),
            ))
            .with_children(|parent| {
                // recentre so the entity origin is the middle of the model's bounds
                parent.spawn((
                    SceneRoot(proto.scene.clone()),
                    Transform::from_translation(-proto.center),
                ));
            });
    }
}

/// Keep one translucent ghost where the dragged item would stack.
pub fn sync_stack_preview(
    mut commands: Commands,
    controller: Res<InteractionController>,
    mut ghosts: Query<(Entity, &StackGhost, &mut Transform)>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let preview = controller.preview();
    let mut kept = false;
    for (e, ghost, mut tf) in &mut ghosts {
        match preview {
            Some(p) if !kept && p.base == ghost.base && p.size == ghost.size => {
                if tf.translation != p.position {
                    tf.translation = p.position;
                }
                kept = true;
            }
            _ => commands.entity(e).despawn(),
        }
    }

    let Some(p) = preview else { return };
    if kept { return; }
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::from_size(p.size))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(0.35, 0.8, 0.45, 0.35),
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            ..Default::default()
        })),
        Transform::from_translation(p.position),
        StackGhost { base: p.base, size: p.size },
        Name::new("Stack preview"),
    ));
}

/// One line per committed action, plus the full room state at debug level.
pub fn log_scene_commits(
    mut events: EventReader<SceneCommitted>,
    scene: Res<SceneState>,
    room: Res<Room>,
    handle: Res<CatalogHandle>,
    catalogs: Res<Assets<Catalog>>,
) {
    let mut any = false;
    for ev in events.read() {
        any = true;
        match ev.item {
            Some(id) => info!("Furnish: {:?} {:?}; {} items in room", ev.action, id, scene.len()),
            None => info!(
                "Furnish: {:?} to {:.1} x {:.1} x {:.1}; {} items in room",
                ev.action, room.width(), room.depth(), room.wall_height(), scene.len()
            ),
        }
    }
    if !any { return; }
    let Some(catalog) = catalogs.get(&handle.0) else { return };
    match ron::ser::to_string_pretty(&scene.snapshot(&room, catalog), PrettyConfig::new()) {
        Ok(text) => debug!("Furnish: room state\n{text}"),
        Err(err) => warn!("Furnish: could not serialise room state: {err}"),
    }
}
