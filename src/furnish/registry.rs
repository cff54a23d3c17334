// src/furnish/registry.rs
//! Data-driven catalog of placeable kinds + loader.

use bevy::asset::{io::Reader, AssetLoader, LoadContext};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::core::KindId;

// ---------- Public plugin to register asset+loader ----------

pub struct CatalogAssetPlugin;

impl Plugin for CatalogAssetPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<Catalog>()
            .register_asset_loader(CatalogLoader);
    }
}

// ---------- Kind definition (data form) ----------

/// Broad family of a kind. Plants may sit on plant stands; furniture always
/// rests on the floor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemClass {
    Plant,
    Furniture,
    #[default]
    Decor,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelKindDef {
    /// Unique key (used for lookup and stack restrictions).
    pub key: String,

    /// Toolbar / log label.
    pub label: String,

    /// Asset path of the model, relative to the asset root.
    pub asset: String,

    /// Height in meters the loaded model is normalised to.
    pub target_height: f32,

    #[serde(default)]
    pub class: ItemClass,

    /// Attach to the nearest wall on spawn.
    #[serde(default)]
    pub wall_snap: bool,

    /// Other items may rest on top.
    #[serde(default)]
    pub can_place_on: bool,

    /// Only this base key may carry the kind.
    #[serde(default)]
    pub stack_restriction: Option<String>,

    /// Nothing may ever rest on top (vases).
    #[serde(default)]
    pub terminal_surface: bool,

    /// Holds plants only and never rests on anything itself.
    #[serde(default)]
    pub stand_only: bool,

    #[serde(default = "default_show_in_toolbar")]
    pub show_in_toolbar: bool,
}

fn default_show_in_toolbar() -> bool {
    true
}

impl ModelKindDef {
    #[inline]
    pub fn is_plant_like(&self) -> bool {
        self.class == ItemClass::Plant
    }
}

// ---------- Runtime catalog asset ----------

#[derive(Asset, TypePath, Clone, Debug)]
pub struct Catalog {
    /// Ordered list; index in this vector is the `KindId.0`.
    kinds: Vec<ModelKindDef>,
    /// Key → index for quick lookups.
    key_to_index: HashMap<String, u32>,
}

impl Catalog {
    pub fn from_defs(defs: Vec<ModelKindDef>) -> Result<Self, CatalogLoadError> {
        let mut key_to_index = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            if let Some(prev) = key_to_index.insert(def.key.clone(), i as u32) {
                return Err(CatalogLoadError::DuplicateKey {
                    key: def.key.clone(),
                    first: prev,
                    second: i as u32,
                });
            }
        }
        for def in &defs {
            if let Some(base) = &def.stack_restriction {
                if !key_to_index.contains_key(base) {
                    return Err(CatalogLoadError::UnknownRestriction {
                        key: def.key.clone(),
                        base: base.clone(),
                    });
                }
            }
        }
        Ok(Self { kinds: defs, key_to_index })
    }

    pub fn from_ron_bytes(bytes: &[u8]) -> Result<Self, CatalogLoadError> {
        let defs: Vec<ModelKindDef> =
            ron::de::from_bytes(bytes).map_err(|e| CatalogLoadError::Ron(e.to_string()))?;
        Self::from_defs(defs)
    }

    pub fn index_of(&self, key: &str) -> Option<KindId> {
        self.key_to_index.get(key).map(|&i| KindId(i))
    }

    pub fn get(&self, id: KindId) -> Option<&ModelKindDef> {
        self.kinds.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (KindId, &ModelKindDef)> {
        self.kinds.iter().enumerate().map(|(i, def)| (KindId(i as u32), def))
    }

    pub fn toolbar(&self) -> impl Iterator<Item = (KindId, &ModelKindDef)> {
        self.iter().filter(|(_, def)| def.show_in_toolbar)
    }

    /// May this kind ever rest on top of something?
    pub fn is_stackable(&self, kind: KindId) -> bool {
        self.get(kind)
            .is_some_and(|def| def.class != ItemClass::Furniture && !def.stand_only)
    }

    /// May anything ever rest on top of this kind?
    pub fn can_act_as_base(&self, kind: KindId) -> bool {
        self.get(kind)
            .is_some_and(|def| def.can_place_on && !def.terminal_surface)
    }

    /// Can `candidate` rest on `base`? The checks run in a fixed order and the
    /// order matters: restrictions beat the generic surface flag, and stands
    /// take plants even though they reject everything else.
    pub fn stack_eligible(&self, candidate: KindId, base: KindId) -> bool {
        let (Some(cand), Some(base)) = (self.get(candidate), self.get(base)) else {
            return false;
        };
        if base.terminal_surface {
            return false;
        }
        if let Some(only) = &cand.stack_restriction {
            return base.key == *only;
        }
        if cand.stand_only {
            return false;
        }
        if base.stand_only {
            return cand.is_plant_like();
        }
        base.can_place_on
    }
}

// ---------- Asset loader for `.catalog.ron` ----------

#[derive(Default)]
pub struct CatalogLoader;

impl AssetLoader for CatalogLoader {
    type Asset = Catalog;
    type Settings = ();
    type Error = CatalogLoadError;

    fn extensions(&self) -> &[&str] {
        &["catalog.ron"]
    }

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &Self::Settings,
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        Catalog::from_ron_bytes(&bytes)
    }
}

// ---------- Loader errors ----------

#[derive(thiserror::Error, Debug)]
pub enum CatalogLoadError {
    #[error("I/O while reading catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(String),
    #[error("Duplicate kind key '{key}' (first idx {first}, second idx {second})")]
    DuplicateKey { key: String, first: u32, second: u32 },
    #[error("Kind '{key}' is restricted to unknown base '{base}'")]
    UnknownRestriction { key: String, base: String },
}

#[cfg(test)]
pub(crate) mod test_catalog {
    use super::*;

    pub const BUNDLED: &str = include_str!("../../assets/furnish/planterior.catalog.ron");

    pub fn bundled() -> Catalog {
        Catalog::from_ron_bytes(BUNDLED.as_bytes()).expect("bundled catalog parses")
    }

    pub fn kind(catalog: &Catalog, key: &str) -> KindId {
        catalog.index_of(key).unwrap_or_else(|| panic!("no kind '{key}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::test_catalog::{bundled, kind};
    use super::*;

    #[test]
    fn bundled_catalog_loads_in_order() {
        let c = bundled();
        assert_eq!(c.len(), 21);
        assert_eq!(c.index_of("euphorbia_trigona"), Some(KindId(0)));
        let tv = c.get(kind(&c, "television")).unwrap();
        assert_eq!(tv.stack_restriction.as_deref(), Some("sideboard"));
        assert!(c.get(kind(&c, "sofa")).unwrap().wall_snap);
        assert_eq!(c.toolbar().count(), 21);
    }

    #[test]
    fn terminal_surface_rejects_everything() {
        let c = bundled();
        let vase = kind(&c, "flower_vase");
        for (k, _) in c.iter() {
            assert!(!c.stack_eligible(k, vase));
        }
        assert!(!c.can_act_as_base(vase));
    }

    #[test]
    fn restriction_beats_generic_surface() {
        let c = bundled();
        let tv = kind(&c, "television");
        assert!(c.stack_eligible(tv, kind(&c, "sideboard")));
        assert!(!c.stack_eligible(tv, kind(&c, "coffee_table")));
        assert!(!c.stack_eligible(tv, kind(&c, "plant_table_small")));
    }

    #[test]
    fn stands_take_only_plants_and_never_stack() {
        let c = bundled();
        let stand = kind(&c, "plant_table_medium");
        assert!(c.stack_eligible(kind(&c, "monstera"), stand));
        assert!(!c.stack_eligible(kind(&c, "flower_vase"), stand));
        assert!(!c.stack_eligible(stand, kind(&c, "coffee_table")));
        assert!(!c.is_stackable(stand));
    }

    #[test]
    fn generic_surfaces_follow_can_place_on() {
        let c = bundled();
        let vase = kind(&c, "flower_vase");
        assert!(c.stack_eligible(vase, kind(&c, "console_table")));
        assert!(c.stack_eligible(kind(&c, "mini_cactus"), kind(&c, "coffee_table")));
        assert!(!c.stack_eligible(vase, kind(&c, "sofa")));
        assert!(!c.stack_eligible(vase, kind(&c, "monstera")));
        assert!(c.is_stackable(vase));
        assert!(!c.is_stackable(kind(&c, "sofa")));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let src = r#"[
            (key: "a", label: "A", asset: "a.glb", target_height: 1.0),
            (key: "a", label: "A2", asset: "a.glb", target_height: 1.0),
        ]"#;
        let err = Catalog::from_ron_bytes(src.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogLoadError::DuplicateKey { first: 0, second: 1, .. }));
    }

    #[test]
    fn dangling_restriction_is_rejected() {
        let src = r#"[
            (key: "tv", label: "TV", asset: "tv.glb", target_height: 1.0, stack_restriction: Some("shelf")),
        ]"#;
        let err = Catalog::from_ron_bytes(src.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogLoadError::UnknownRestriction { .. }));
    }
}
