//! Furnish plugin wiring (glue).
//! - Catalog asset/loader
//! - Settings + seeded jitter RNG
//! - Spawn requests, prototype loading, starter room, pointer interaction, resize
//! - Mirroring `SceneState` into scene entities

use bevy::gltf::Gltf;
use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::assets::PrototypeCache;
use super::interaction::InteractionController;
use super::queue::{SceneCommitted, SpawnFailed, SpawnItem};
use super::registry::{Catalog, CatalogAssetPlugin};
use super::resize::ResizeRoom;
use super::starter::StarterLayout;
use super::state::SceneState;
use super::systems::{
    apply_resize_requests, handle_pointer, lay_out_starter_room, log_scene_commits,
    poll_prototype_loads, request_spawns, sync_item_entities, sync_stack_preview,
};

/// Where the catalog lives and the tuning of every placement rule.
#[derive(Resource, Clone, Debug)]
pub struct FurnishSettings {
    pub catalog_path: String,
    pub spawn_seed: u64,
    /// Max random offset (meters, per axis) added to camera-aimed spawns.
    pub spawn_jitter: f32,
    /// Distance items keep from every wall when clamped.
    pub clamp_margin: f32,
    pub wall_gap: f32,
    pub stack_gap: f32,
    /// Height above a dragged item the base probe starts from.
    pub probe_lift: f32,
    pub probe_max_distance: f32,
    /// Reach of the nearest-base fallback when the probe misses.
    pub fallback_radius: f32,
    /// Seconds.
    pub double_click_window: f64,
    /// Open with the sofa, coffee table, sideboard and console already placed.
    pub starter_room: bool,
}

impl Default for FurnishSettings {
    fn default() -> Self {
        Self {
            catalog_path: "furnish/planterior.catalog.ron".to_string(),
            spawn_seed: 1337,
            spawn_jitter: 0.3,
            clamp_margin: 0.3,
            wall_gap: 0.03,
            stack_gap: 0.02,
            probe_lift: 1.0,
            probe_max_distance: 15.0,
            fallback_radius: 3.0,
            double_click_window: 0.3,
            starter_room: true,
        }
    }
}

/// Handle to the loaded Catalog asset.
#[derive(Resource, Default)]
pub struct CatalogHandle(pub Handle<Catalog>);

/// Jitter source for spawn points.
#[derive(Resource)]
pub struct SpawnRng(pub ChaCha8Rng);

pub type ModelCache = PrototypeCache<Handle<Gltf>>;

pub struct FurnishPlugin;
impl Plugin for FurnishPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(CatalogAssetPlugin)
            .init_resource::<FurnishSettings>()
            .init_resource::<CatalogHandle>()
            .init_resource::<SceneState>()
            .init_resource::<ModelCache>()
            .init_resource::<StarterLayout>()
            .add_event::<SpawnItem>()
            .add_event::<SpawnFailed>()
            .add_event::<ResizeRoom>()
            .add_event::<SceneCommitted>()
            .add_systems(Startup, (init_from_settings, load_catalog))
            .add_systems(Update, monitor_catalog_ready)
            .add_systems(
                Update,
                (
                    request_spawns,
                    poll_prototype_loads,
                    lay_out_starter_room.run_if(not(resource_equals(StarterLayout::Done))),
                    handle_pointer,
                    apply_resize_requests,
                    sync_item_entities.run_if(resource_changed::<SceneState>),
                    sync_stack_preview,
                    log_scene_commits,
                )
                    .chain(),
            );
    }
}

/// Startup: seed the jitter RNG and size the double-click window from settings.
fn init_from_settings(mut commands: Commands, settings: Res<FurnishSettings>) {
    commands.insert_resource(SpawnRng(ChaCha8Rng::seed_from_u64(settings.spawn_seed)));
    commands.insert_resource(InteractionController::new(settings.double_click_window));
}

/// Startup: request loading the catalog, store handle.
fn load_catalog(
    mut handle_res: ResMut<CatalogHandle>,
    settings: Res<FurnishSettings>,
    assets: Res<AssetServer>,
) {
    if handle_res.0.is_strong() { return; }
    handle_res.0 = assets.load(settings.catalog_path.as_str());
    info!(
        "Furnish: loading catalog from '{}', spawn_seed={}",
        settings.catalog_path, settings.spawn_seed
    );
}

/// Update: log once when the catalog becomes available (or fails).
fn monitor_catalog_ready(
    handle_res: Res<CatalogHandle>,
    catalogs: Res<Assets<Catalog>>,
    assets: Res<AssetServer>,
    mut logged: Local<bool>,
) {
    if *logged { return; }
    if let Some(catalog) = catalogs.get(&handle_res.0) {
        *logged = true;
        info!("Furnish: catalog ready with {} kinds", catalog.len());
    } else if let Some(bevy::asset::LoadState::Failed(err)) = assets.get_load_state(handle_res.0.id()) {
        *logged = true;
        error!("Furnish: catalog failed to load: {err}");
    }
}
