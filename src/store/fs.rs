use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{PadforgeError, PadforgeResult};
use crate::store::{AssetId, AssetStore};

/// Directory-backed store: `<root>/blobs/<id>` for image payloads and
/// `<root>/snapshots/<id>.json` for serialized scenes. Survives process restarts; used by
/// the CLI and by anything that needs designs to outlive one editing session.
pub struct FsStore {
    blobs: PathBuf,
    snapshots: PathBuf,
}

impl FsStore {
    pub fn open(root: impl AsRef<Path>) -> PadforgeResult<Self> {
        let root = root.as_ref();
        let blobs = root.join("blobs");
        let snapshots = root.join("snapshots");
        std::fs::create_dir_all(&blobs)
            .with_context(|| format!("create blob dir '{}'", blobs.display()))?;
        std::fs::create_dir_all(&snapshots)
            .with_context(|| format!("create snapshot dir '{}'", snapshots.display()))?;
        Ok(Self { blobs, snapshots })
    }

    fn blob_path(&self, id: &AssetId) -> PadforgeResult<PathBuf> {
        Ok(self.blobs.join(sanitized(id)?))
    }

    fn snapshot_path(&self, id: &AssetId) -> PadforgeResult<PathBuf> {
        Ok(self.snapshots.join(format!("{}.json", sanitized(id)?)))
    }
}

/// Ids become file names; reject anything that could escape the store root.
fn sanitized(id: &AssetId) -> PadforgeResult<&str> {
    let s = id.as_str();
    if s.is_empty()
        || !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(PadforgeError::store(format!("invalid asset id '{s}'")));
    }
    Ok(s)
}

fn read_optional(path: &Path) -> PadforgeResult<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("read '{}'", path.display()))
            .into()),
    }
}

fn delete_optional(path: &Path) -> PadforgeResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("delete '{}'", path.display()))
            .into()),
    }
}

impl AssetStore for FsStore {
    fn save_blob(&self, payload: &[u8], id: Option<AssetId>) -> PadforgeResult<AssetId> {
        let id = id.unwrap_or_else(AssetId::new_image);
        let path = self.blob_path(&id)?;
        std::fs::write(&path, payload)
            .with_context(|| format!("write blob '{}'", path.display()))?;
        Ok(id)
    }

    fn get_blob(&self, id: &AssetId) -> PadforgeResult<Option<Vec<u8>>> {
        read_optional(&self.blob_path(id)?)
    }

    fn delete_blob(&self, id: &AssetId) -> PadforgeResult<()> {
        delete_optional(&self.blob_path(id)?)
    }

    fn save_snapshot(&self, id: &AssetId, payload: &[u8]) -> PadforgeResult<()> {
        let path = self.snapshot_path(id)?;
        std::fs::write(&path, payload)
            .with_context(|| format!("write snapshot '{}'", path.display()))?;
        Ok(())
    }

    fn get_snapshot(&self, id: &AssetId) -> PadforgeResult<Option<Vec<u8>>> {
        read_optional(&self.snapshot_path(id)?)
    }

    fn delete_snapshot(&self, id: &AssetId) -> PadforgeResult<()> {
        delete_optional(&self.snapshot_path(id)?)
    }
}
