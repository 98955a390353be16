//! Shopping cart of frozen designs.
//!
//! Cart items own their design documents outright; the only shared state is the asset
//! store, where several items may reference the same image blob (duplicated designs).
//! Removal therefore reference-counts: a blob is only deleted once no remaining item
//! references it.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::design::document::DesignDocument;
use crate::foundation::error::{PadforgeError, PadforgeResult};
use crate::store::{AssetId, AssetStore, spawn_delete_blob};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub quantity: u32,
    pub document: DesignDocument,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of pads across all lines.
    pub fn count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Order total in minor currency units.
    pub fn total(&self) -> u64 {
        self.items
            .iter()
            .map(|i| u64::from(i.quantity) * i.document.pricing.total)
            .sum()
    }

    /// Add a frozen design as a new line with quantity 1. Returns the line id.
    pub fn add(&mut self, document: DesignDocument) -> PadforgeResult<String> {
        document.validate()?;
        let id = format!("item_{}", uuid::Uuid::new_v4().simple());
        self.items.push(CartItem {
            id: id.clone(),
            quantity: 1,
            document,
        });
        Ok(id)
    }

    pub fn update_quantity(&mut self, id: &str, quantity: u32) -> PadforgeResult<()> {
        if quantity == 0 {
            return Err(PadforgeError::validation(
                "quantity must be >= 1; remove the line instead",
            ));
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| PadforgeError::validation(format!("no cart line '{id}'")))?;
        item.quantity = quantity;
        Ok(())
    }

    /// Remove a line. Assets referenced by it and by no remaining line are deleted from
    /// the store on detached threads; the set of those orphaned ids is returned.
    pub fn remove(
        &mut self,
        id: &str,
        store: &Arc<dyn AssetStore>,
    ) -> PadforgeResult<BTreeSet<AssetId>> {
        let idx = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| PadforgeError::validation(format!("no cart line '{id}'")))?;
        let removed = self.items.remove(idx);

        let mut orphaned = removed.document.referenced_assets();
        for item in &self.items {
            for kept in item.document.referenced_assets() {
                orphaned.remove(&kept);
            }
        }
        for asset in &orphaned {
            spawn_delete_blob(store, asset.clone());
        }
        Ok(orphaned)
    }

    /// Empty the cart, deleting every asset the removed lines referenced.
    pub fn clear(&mut self, store: &Arc<dyn AssetStore>) -> BTreeSet<AssetId> {
        let mut orphaned = BTreeSet::new();
        for item in self.items.drain(..) {
            orphaned.extend(item.document.referenced_assets());
        }
        for asset in &orphaned {
            spawn_delete_blob(store, asset.clone());
        }
        orphaned
    }

    pub fn to_json(&self) -> PadforgeResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| PadforgeError::serde(format!("encode cart: {e}")))
    }

    pub fn from_json(bytes: &[u8]) -> PadforgeResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| PadforgeError::serde(format!("decode cart: {e}")))
    }
}

/// Persistence seam for the cart itself, so an abandoned session can be resumed.
pub trait CartRepository: Send + Sync {
    fn save(&self, cart: &Cart) -> PadforgeResult<()>;
    fn load(&self) -> PadforgeResult<Option<Cart>>;
}

/// Single-file JSON cart persistence.
pub struct FsCartRepository {
    path: std::path::PathBuf,
}

impl FsCartRepository {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CartRepository for FsCartRepository {
    fn save(&self, cart: &Cart) -> PadforgeResult<()> {
        use anyhow::Context as _;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create cart dir '{}'", parent.display()))?;
        }
        std::fs::write(&self.path, cart.to_json()?)
            .with_context(|| format!("write cart '{}'", self.path.display()))?;
        Ok(())
    }

    fn load(&self) -> PadforgeResult<Option<Cart>> {
        use anyhow::Context as _;
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(Cart::from_json(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("read cart '{}'", self.path.display()))
                .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::pricing::PriceBreakdown;
    use crate::catalog::size::PadSize;
    use crate::design::document::LogoState;
    use crate::design::snapshot::{ImageSource, LayerSnapshot, SceneSnapshot};
    use crate::design::transform::Transform;
    use crate::foundation::color::Color;
    use crate::store::MemoryStore;

    fn doc_with_assets(assets: &[&str], rgb: bool) -> DesignDocument {
        let layers = assets
            .iter()
            .map(|a| LayerSnapshot::Image {
                source: ImageSource::asset(AssetId(a.to_string())),
                transform: Transform::at(0.0, 0.0, 10.0, 10.0),
                clip: None,
            })
            .collect();
        DesignDocument {
            size: PadSize::W90H40,
            background: Color::BLACK,
            images: vec![],
            texts: vec![],
            logo: LogoState::default(),
            rgb,
            pricing: PriceBreakdown::compute(false, rgb),
            preview: None,
            scene: SceneSnapshot {
                width: 960,
                height: 426,
                background: Color::BLACK,
                layers,
            },
        }
    }

    fn store() -> Arc<dyn AssetStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn totals_multiply_quantity() {
        let mut cart = Cart::new();
        let id = cart.add(doc_with_assets(&[], true)).unwrap();
        cart.update_quantity(&id, 3).unwrap();
        assert_eq!(cart.count(), 3);
        assert_eq!(cart.total(), 3 * 250_000);
    }

    #[test]
    fn quantity_zero_is_rejected() {
        let mut cart = Cart::new();
        let id = cart.add(doc_with_assets(&[], false)).unwrap();
        assert!(cart.update_quantity(&id, 0).is_err());
        assert!(cart.update_quantity("item_nope", 2).is_err());
    }

    #[test]
    fn remove_orphans_only_unshared_assets() {
        let mut cart = Cart::new();
        let store = store();
        let a = cart.add(doc_with_assets(&["img_shared", "img_a"], false)).unwrap();
        let _b = cart.add(doc_with_assets(&["img_shared", "img_b"], false)).unwrap();

        let orphaned = cart.remove(&a, &store).unwrap();
        assert_eq!(
            orphaned,
            BTreeSet::from([AssetId("img_a".to_string())]),
            "shared asset must survive while another line references it"
        );

        let b_id = cart.items()[0].id.clone();
        let orphaned = cart.remove(&b_id, &store).unwrap();
        assert_eq!(
            orphaned,
            BTreeSet::from([
                AssetId("img_shared".to_string()),
                AssetId("img_b".to_string())
            ])
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn clear_orphans_everything() {
        let mut cart = Cart::new();
        let store = store();
        cart.add(doc_with_assets(&["img_x"], false)).unwrap();
        cart.add(doc_with_assets(&["img_x", "img_y"], false)).unwrap();

        let orphaned = cart.clear(&store);
        assert_eq!(orphaned.len(), 2);
        assert!(cart.is_empty());
        assert_eq!(cart.total(), 0);
    }

    #[test]
    fn json_roundtrip() {
        let mut cart = Cart::new();
        cart.add(doc_with_assets(&["img_a"], true)).unwrap();
        let bytes = cart.to_json().unwrap();
        let back = Cart::from_json(&bytes).unwrap();
        assert_eq!(back.items().len(), 1);
        assert_eq!(back.total(), cart.total());
    }

    #[test]
    fn fs_repository_roundtrip() {
        let dir = std::env::temp_dir().join(format!(
            "padforge_cart_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let repo = FsCartRepository::new(dir.join("cart.json"));
        assert!(repo.load().unwrap().is_none());

        let mut cart = Cart::new();
        cart.add(doc_with_assets(&["img_a"], false)).unwrap();
        repo.save(&cart).unwrap();

        let back = repo.load().unwrap().expect("cart persisted");
        assert_eq!(back.total(), cart.total());
        std::fs::remove_dir_all(&dir).ok();
    }
}
