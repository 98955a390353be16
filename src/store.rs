//! Durable key-value persistence for binary image assets and serialized scene snapshots.
//!
//! The store is always dependency-injected: composition, rendering and checkout code never
//! reach for a global. Deletes are idempotent (at-least-once semantics) and, where an edit
//! operation triggers them, fire-and-forget.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{PadforgeError, PadforgeResult};

pub mod fs;

pub use fs::FsStore;

/// Opaque identifier for a stored blob or snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl AssetId {
    /// Fresh id for an uploaded image blob.
    pub fn new_image() -> Self {
        Self(format!("img_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Fresh id for a serialized scene snapshot.
    pub fn new_snapshot() -> Self {
        Self(format!("scene_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keyed store for image payloads and scene snapshots.
///
/// `delete_*` must be idempotent: deleting an absent entry is an `Ok` no-op.
pub trait AssetStore: Send + Sync {
    /// Persist an image payload, minting a fresh id unless one is supplied.
    fn save_blob(&self, payload: &[u8], id: Option<AssetId>) -> PadforgeResult<AssetId>;
    fn get_blob(&self, id: &AssetId) -> PadforgeResult<Option<Vec<u8>>>;
    fn delete_blob(&self, id: &AssetId) -> PadforgeResult<()>;

    fn save_snapshot(&self, id: &AssetId, payload: &[u8]) -> PadforgeResult<()>;
    fn get_snapshot(&self, id: &AssetId) -> PadforgeResult<Option<Vec<u8>>>;
    fn delete_snapshot(&self, id: &AssetId) -> PadforgeResult<()>;
}

/// Delete a blob on a detached thread. Failures are logged and swallowed; edit operations
/// must never block on (or fail because of) store cleanup.
pub fn spawn_delete_blob(store: &Arc<dyn AssetStore>, id: AssetId) {
    let store = Arc::clone(store);
    std::thread::spawn(move || {
        if let Err(e) = store.delete_blob(&id) {
            tracing::warn!(asset = %id, error = %e, "best-effort blob delete failed");
        }
    });
}

#[derive(Clone, Debug)]
struct Entry {
    payload: Vec<u8>,
    #[allow(dead_code)]
    created_at: SystemTime,
}

/// In-memory store used by tests and as the default wiring for a fresh session.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<AssetId, Entry>>,
    snapshots: Mutex<HashMap<AssetId, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().expect("store lock poisoned").len()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().expect("store lock poisoned").len()
    }
}

impl AssetStore for MemoryStore {
    fn save_blob(&self, payload: &[u8], id: Option<AssetId>) -> PadforgeResult<AssetId> {
        let id = id.unwrap_or_else(AssetId::new_image);
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| PadforgeError::store("blob map lock poisoned"))?;
        blobs.insert(
            id.clone(),
            Entry {
                payload: payload.to_vec(),
                created_at: SystemTime::now(),
            },
        );
        Ok(id)
    }

    fn get_blob(&self, id: &AssetId) -> PadforgeResult<Option<Vec<u8>>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| PadforgeError::store("blob map lock poisoned"))?;
        Ok(blobs.get(id).map(|e| e.payload.clone()))
    }

    fn delete_blob(&self, id: &AssetId) -> PadforgeResult<()> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| PadforgeError::store("blob map lock poisoned"))?;
        blobs.remove(id);
        Ok(())
    }

    fn save_snapshot(&self, id: &AssetId, payload: &[u8]) -> PadforgeResult<()> {
        let mut snaps = self
            .snapshots
            .lock()
            .map_err(|_| PadforgeError::store("snapshot map lock poisoned"))?;
        snaps.insert(
            id.clone(),
            Entry {
                payload: payload.to_vec(),
                created_at: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn get_snapshot(&self, id: &AssetId) -> PadforgeResult<Option<Vec<u8>>> {
        let snaps = self
            .snapshots
            .lock()
            .map_err(|_| PadforgeError::store("snapshot map lock poisoned"))?;
        Ok(snaps.get(id).map(|e| e.payload.clone()))
    }

    fn delete_snapshot(&self, id: &AssetId) -> PadforgeResult<()> {
        let mut snaps = self
            .snapshots
            .lock()
            .map_err(|_| PadforgeError::store("snapshot map lock poisoned"))?;
        snaps.remove(id);
        Ok(())
    }
}
