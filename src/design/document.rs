use std::collections::BTreeSet;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::catalog::pricing::PriceBreakdown;
use crate::catalog::size::PadSize;
use crate::design::snapshot::{ImageSource, SceneSnapshot};
use crate::design::transform::Transform;
use crate::foundation::color::Color;
use crate::foundation::error::{PadforgeError, PadforgeResult};
use crate::store::AssetId;

/// Canvas corner the logo is pinned to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl LogoCorner {
    pub const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];
}

/// Logo configuration for one design. The logo itself is a singleton layer the user can
/// reposition but never delete; `removed` is the only way to hide it (and it carries a fee).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoState {
    pub corner: LogoCorner,
    pub removed: bool,
}

/// Normalized image line-item record: durable source reference plus the transform as
/// authored. Stale transforms here are a correctness bug; records are rebuilt from the live
/// scene at freeze time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub source: ImageSource,
    pub transform: Transform,
}

/// Normalized text line-item record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    pub id: String,
    pub content: String,
    pub font_family: String,
    pub fill: Color,
    pub font_size: f64,
    pub transform: Transform,
}

/// Low/medium resolution render of the design, regenerated whenever composition changes
/// materially; used for cart thumbnails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewRaster {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl Serialize for PreviewRaster {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("PreviewRaster", 3)?;
        s.serialize_field("width", &self.width)?;
        s.serialize_field("height", &self.height)?;
        s.serialize_field("png", &BASE64.encode(&self.png))?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for PreviewRaster {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Repr {
            width: u32,
            height: u32,
            png: String,
        }
        let repr = Repr::deserialize(deserializer)?;
        let png = BASE64
            .decode(&repr.png)
            .map_err(|e| serde::de::Error::custom(format!("preview png payload: {e}")))?;
        Ok(Self {
            width: repr.width,
            height: repr.height,
            png,
        })
    }
}

/// The canonical serializable description of one customized pad: everything the cart, the
/// order backend and the high-resolution renderer need. `images`/`texts` summarize the
/// scene for line-item records; `scene` is the lossless re-render source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    pub size: PadSize,
    pub background: Color,
    pub images: Vec<ImageRecord>,
    pub texts: Vec<TextRecord>,
    pub logo: LogoState,
    pub rgb: bool,
    pub pricing: PriceBreakdown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<PreviewRaster>,
    pub scene: SceneSnapshot,
}

impl DesignDocument {
    pub fn to_json(&self) -> PadforgeResult<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| PadforgeError::serde(format!("encode design document: {e}")))
    }

    pub fn from_json(bytes: &[u8]) -> PadforgeResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| PadforgeError::serde(format!("decode design document: {e}")))
    }

    /// Persist this document in the store's snapshot namespace under a fresh id.
    pub fn persist(&self, store: &dyn crate::store::AssetStore) -> PadforgeResult<AssetId> {
        let id = AssetId::new_snapshot();
        store.save_snapshot(&id, &self.to_json()?)?;
        Ok(id)
    }

    /// Load a previously persisted document, if present.
    pub fn load(
        id: &AssetId,
        store: &dyn crate::store::AssetStore,
    ) -> PadforgeResult<Option<Self>> {
        match store.get_snapshot(id)? {
            Some(bytes) => Ok(Some(Self::from_json(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every asset id this document keeps alive: image records, scene layers.
    pub fn referenced_assets(&self) -> BTreeSet<AssetId> {
        let mut ids: BTreeSet<AssetId> = self
            .images
            .iter()
            .filter_map(|rec| rec.source.asset_id().cloned())
            .collect();
        ids.extend(self.scene.referenced_assets());
        ids
    }

    pub fn validate(&self) -> PadforgeResult<()> {
        self.scene.validate()?;
        for rec in &self.images {
            rec.transform.validate()?;
        }
        for rec in &self.texts {
            if rec.content.trim().is_empty() {
                return Err(PadforgeError::validation(
                    "text record content must be non-empty",
                ));
            }
            rec.transform.validate()?;
        }
        let expected = PriceBreakdown::compute(self.logo.removed, self.rgb);
        if self.pricing != expected {
            return Err(PadforgeError::validation(format!(
                "cached pricing {} disagrees with recomputed total {}",
                self.pricing.total, expected.total
            )));
        }
        Ok(())
    }
}
