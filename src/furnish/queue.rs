// src/furnish/queue.rs
use bevy::prelude::*;

use crate::furnish::assets::ModelLoadError;
use crate::furnish::core::ItemId;

/// Host request: spawn one item of a catalog kind.
#[derive(Event, Clone, Debug)]
pub struct SpawnItem {
    pub key: String,
    /// Floor point to spawn at; `None` aims at the camera's floor point.
    pub at: Option<Vec2>,
}

impl SpawnItem {
    pub fn at_camera(key: impl Into<String>) -> Self {
        Self { key: key.into(), at: None }
    }
}

/// A spawn request that could not be honoured. No item was created.
#[derive(Event, Clone, Debug)]
pub struct SpawnFailed {
    pub key: String,
    pub error: SpawnError,
}

impl SpawnFailed {
    /// Fail every queued request with the same error, leaving the queue empty.
    pub fn drain_all(queue: &mut Vec<SpawnItem>, error: &SpawnError) -> Vec<SpawnFailed> {
        queue
            .drain(..)
            .map(|req| SpawnFailed { key: req.key, error: error.clone() })
            .collect()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SpawnError {
    #[error("no catalog kind named '{0}'")]
    UnknownKind(String),
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("model for '{0}' is not loaded")]
    NotLoaded(String),
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
}

/// What a committed action did, for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitAction {
    Spawned,
    Moved,
    Rotated,
    Deleted,
    Resized,
}

/// Fired after the scene settles from a user action.
#[derive(Event, Clone, Copy, Debug)]
pub struct SceneCommitted {
    pub action: CommitAction,
    pub item: Option<ItemId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draining_fails_every_queued_request() {
        let mut queue = vec![SpawnItem::at_camera("sofa"), SpawnItem { key: "monstera".into(), at: Some(Vec2::ONE) }];
        let error = SpawnError::CatalogUnavailable("missing file".into());

        let failed = SpawnFailed::drain_all(&mut queue, &error);
        assert!(queue.is_empty());
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].key, "sofa");
        assert_eq!(failed[1].key, "monstera");
        assert!(failed.iter().all(|f| f.error == error));
        assert_eq!(error.to_string(), "catalog unavailable: missing file");
    }
}
