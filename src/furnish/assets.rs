// src/furnish/assets.rs
//! Model prototypes: one glTF load per asset ref, shared by every spawn of it.

use std::collections::HashMap;

use bevy::asset::RecursiveDependencyLoadState;
use bevy::gltf::{Gltf, GltfMesh, GltfNode};
use bevy::prelude::*;
use bevy::render::mesh::MeshAabb;

use super::collab::{LoadPoll, PrototypeLoader};
use super::core::KindId;

/// Loaded model ready to be instanced.
#[derive(Clone, Debug)]
pub struct Prototype {
    pub scene: Handle<Scene>,
    /// Size of the model's bounds in its own units.
    pub extent: Vec3,
    /// Centre of those bounds; instances are offset by `-center` so the
    /// item position is the middle of its box.
    pub center: Vec3,
}

impl Prototype {
    pub fn from_bounds(scene: Handle<Scene>, min: Vec3, max: Vec3) -> Self {
        Self { scene, extent: max - min, center: (min + max) * 0.5 }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ModelLoadError {
    #[error("failed to load '{asset_ref}': {reason}")]
    Failed { asset_ref: String, reason: String },
    #[error("'{0}' has no scene to instance")]
    MissingScene(String),
    #[error("'{0}' contains no mesh bounds")]
    EmptyBounds(String),
}

/// A spawn parked until its prototype is ready.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingSpawn {
    pub kind: KindId,
    /// Floor point chosen when the request was made.
    pub at: Vec2,
}

/// What happened to a `request`.
#[derive(Debug)]
pub enum Requested {
    /// Memoised; spawn right away.
    Ready(Prototype, PendingSpawn),
    /// First request for this ref; a load was issued.
    Started,
    /// A load was already running; the spawn waits on it.
    Joined,
}

/// A finished load and everyone who was waiting on it.
#[derive(Debug)]
pub struct Resolved {
    pub asset_ref: String,
    pub result: Result<Prototype, ModelLoadError>,
    pub waiters: Vec<PendingSpawn>,
}

struct InFlight<H> {
    handle: H,
    waiters: Vec<PendingSpawn>,
}

/// Memoises prototypes by asset ref and coalesces concurrent requests.
/// Failures are reported to every waiter and forgotten, so a later spawn retries.
pub struct PrototypeCache<H> {
    ready: HashMap<String, Prototype>,
    in_flight: HashMap<String, InFlight<H>>,
}

impl<H> Default for PrototypeCache<H> {
    fn default() -> Self {
        Self { ready: HashMap::new(), in_flight: HashMap::new() }
    }
}

impl<H: Send + Sync + 'static> Resource for PrototypeCache<H> {}

impl<H: Clone> PrototypeCache<H> {
    pub fn request<L>(&mut self, loader: &L, asset_ref: &str, spawn: PendingSpawn) -> Requested
    where
        L: PrototypeLoader<Handle = H>,
    {
        if let Some(proto) = self.ready.get(asset_ref) {
            return Requested::Ready(proto.clone(), spawn);
        }
        if let Some(flight) = self.in_flight.get_mut(asset_ref) {
            flight.waiters.push(spawn);
            return Requested::Joined;
        }
        let handle = loader.begin_load(asset_ref);
        self.in_flight
            .insert(asset_ref.to_string(), InFlight { handle, waiters: vec![spawn] });
        Requested::Started
    }

    /// Check every in-flight load once; returns the ones that finished.
    pub fn poll<L>(&mut self, loader: &L) -> Vec<Resolved>
    where
        L: PrototypeLoader<Handle = H>,
    {
        let mut finished = Vec::new();
        for (asset_ref, flight) in &self.in_flight {
            match loader.poll(asset_ref, &flight.handle) {
                LoadPoll::Pending => {}
                LoadPoll::Ready(proto) => finished.push((asset_ref.clone(), Ok(proto))),
                LoadPoll::Failed(err) => finished.push((asset_ref.clone(), Err(err))),
            }
        }

        let mut out = Vec::with_capacity(finished.len());
        for (asset_ref, result) in finished {
            let waiters = self
                .in_flight
                .remove(&asset_ref)
                .map(|f| f.waiters)
                .unwrap_or_default();
            if let Ok(proto) = &result {
                self.ready.insert(asset_ref.clone(), proto.clone());
            }
            out.push(Resolved { asset_ref, result, waiters });
        }
        out
    }

    /// Start loading `asset_ref` with nobody waiting on it. No-op when it is
    /// already ready or loading.
    pub fn preload<L>(&mut self, loader: &L, asset_ref: &str)
    where
        L: PrototypeLoader<Handle = H>,
    {
        if self.ready.contains_key(asset_ref) || self.in_flight.contains_key(asset_ref) {
            return;
        }
        let handle = loader.begin_load(asset_ref);
        self.in_flight
            .insert(asset_ref.to_string(), InFlight { handle, waiters: Vec::new() });
    }

    pub fn get(&self, asset_ref: &str) -> Option<&Prototype> {
        self.ready.get(asset_ref)
    }

    pub fn is_ready(&self, asset_ref: &str) -> bool {
        self.ready.contains_key(asset_ref)
    }

    pub fn is_loading(&self, asset_ref: &str) -> bool {
        self.in_flight.contains_key(asset_ref)
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}

// ---------- Bevy glTF loader ----------

/// Borrowed view of the asset world used to fetch and measure glTF models.
pub struct GltfPrototypeLoader<'a> {
    pub server: &'a AssetServer,
    pub gltfs: &'a Assets<Gltf>,
    pub nodes: &'a Assets<GltfNode>,
    pub gltf_meshes: &'a Assets<GltfMesh>,
    pub meshes: &'a Assets<Mesh>,
}

impl PrototypeLoader for GltfPrototypeLoader<'_> {
    type Handle = Handle<Gltf>;

    fn begin_load(&self, asset_ref: &str) -> Handle<Gltf> {
        self.server.load(asset_ref.to_string())
    }

    fn poll(&self, asset_ref: &str, handle: &Handle<Gltf>) -> LoadPoll {
        match self.server.recursive_dependency_load_state(handle.id()) {
            RecursiveDependencyLoadState::Failed(err) => LoadPoll::Failed(ModelLoadError::Failed {
                asset_ref: asset_ref.to_string(),
                reason: err.to_string(),
            }),
            RecursiveDependencyLoadState::Loaded => match self.gltfs.get(handle) {
                Some(gltf) => match self.build(asset_ref, gltf) {
                    Ok(proto) => LoadPoll::Ready(proto),
                    Err(err) => LoadPoll::Failed(err),
                },
                None => LoadPoll::Pending,
            },
            _ => LoadPoll::Pending,
        }
    }
}

impl GltfPrototypeLoader<'_> {
    fn build(&self, asset_ref: &str, gltf: &Gltf) -> Result<Prototype, ModelLoadError> {
        let scene = gltf
            .default_scene
            .clone()
            .or_else(|| gltf.scenes.first().cloned())
            .ok_or_else(|| ModelLoadError::MissingScene(asset_ref.to_string()))?;

        let mut corners = Vec::new();
        for root in self.root_nodes(gltf) {
            self.collect_corners(root, Mat4::IDENTITY, &mut corners, 0);
        }
        let (min, max) = bounds_of(corners)
            .ok_or_else(|| ModelLoadError::EmptyBounds(asset_ref.to_string()))?;
        Ok(Prototype::from_bounds(scene, min, max))
    }

    /// Nodes that are nobody's child.
    fn root_nodes<'g>(&self, gltf: &'g Gltf) -> Vec<&'g Handle<GltfNode>> {
        let children: Vec<AssetId<GltfNode>> = gltf
            .nodes
            .iter()
            .filter_map(|h| self.nodes.get(h))
            .flat_map(|n| n.children.iter().map(|c| c.id()))
            .collect();
        gltf.nodes.iter().filter(|h| !children.contains(&h.id())).collect()
    }

    fn collect_corners(&self, node: &Handle<GltfNode>, parent: Mat4, out: &mut Vec<Vec3>, depth: usize) {
        // malformed files can reference a node from its own subtree
        if depth > 64 {
            return;
        }
        let Some(node) = self.nodes.get(node) else { return };
        let world = parent * node.transform.compute_matrix();

        if let Some(gm) = node.mesh.as_ref().and_then(|h| self.gltf_meshes.get(h)) {
            for prim in &gm.primitives {
                let Some(aabb) = self.meshes.get(&prim.mesh).and_then(|m| m.compute_aabb()) else {
                    continue;
                };
                let c = Vec3::from(aabb.center);
                let h = Vec3::from(aabb.half_extents);
                for sx in [-1.0, 1.0] {
                    for sy in [-1.0, 1.0] {
                        for sz in [-1.0, 1.0] {
                            out.push(world.transform_point3(c + h * Vec3::new(sx, sy, sz)));
                        }
                    }
                }
            }
        }
        for child in &node.children {
            self.collect_corners(child, world, out, depth + 1);
        }
    }
}

/// Axis-aligned bounds of a point cloud.
pub fn bounds_of(points: impl IntoIterator<Item = Vec3>) -> Option<(Vec3, Vec3)> {
    points.into_iter().fold(None, |acc, p| match acc {
        None => Some((p, p)),
        Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
    })
}
