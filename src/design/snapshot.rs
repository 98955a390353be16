use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::design::document::LogoCorner;
use crate::design::transform::{ClipRect, Transform};
use crate::foundation::color::Color;
use crate::foundation::error::{PadforgeError, PadforgeResult};
use crate::store::AssetId;

/// Durable origin of an image layer's pixels.
///
/// There is deliberately no variant for a transient in-memory handle: binaries get a store
/// id (or are inlined) before they ever reach a snapshot, so a snapshot can always be
/// re-rendered after the authoring session is gone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    /// Reference into the asset store.
    Asset { id: AssetId },
    /// Image bytes carried inline, base64-encoded. Legacy snapshots and duplicated designs
    /// use this form.
    Inline { data: String },
}

impl ImageSource {
    pub fn asset(id: AssetId) -> Self {
        Self::Asset { id }
    }

    pub fn inline(bytes: &[u8]) -> Self {
        Self::Inline {
            data: BASE64.encode(bytes),
        }
    }

    pub fn asset_id(&self) -> Option<&AssetId> {
        match self {
            Self::Asset { id } => Some(id),
            Self::Inline { .. } => None,
        }
    }

    /// Decode inline payload bytes, if this source is inline.
    pub fn inline_bytes(&self) -> PadforgeResult<Option<Vec<u8>>> {
        match self {
            Self::Asset { .. } => Ok(None),
            Self::Inline { data } => BASE64
                .decode(data)
                .map(Some)
                .map_err(|e| PadforgeError::serde(format!("inline image payload: {e}"))),
        }
    }
}

/// One layer of a serialized scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSnapshot {
    Image {
        source: ImageSource,
        transform: Transform,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        clip: Option<ClipRect>,
    },
    Text {
        id: String,
        content: String,
        font_family: String,
        fill: Color,
        font_size: f64,
        transform: Transform,
    },
    /// Recorded for completeness; restore always re-derives the logo from the live
    /// branding asset instead of trusting a stored copy.
    Logo { corner: LogoCorner, visible: bool },
}

/// Lossless dump of the composition surface's layer graph, in stacking order
/// (first = backmost). This is the source for every later re-render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub layers: Vec<LayerSnapshot>,
}

impl SceneSnapshot {
    pub fn to_json(&self) -> PadforgeResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| PadforgeError::serde(format!("encode snapshot: {e}")))
    }

    pub fn from_json(bytes: &[u8]) -> PadforgeResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| PadforgeError::serde(format!("decode snapshot: {e}")))
    }

    /// Asset ids referenced by any image layer, in stacking order.
    pub fn referenced_assets(&self) -> Vec<AssetId> {
        self.layers
            .iter()
            .filter_map(|layer| match layer {
                LayerSnapshot::Image { source, .. } => source.asset_id().cloned(),
                _ => None,
            })
            .collect()
    }

    pub fn validate(&self) -> PadforgeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PadforgeError::validation(
                "snapshot dimensions must be > 0",
            ));
        }
        let mut logos = 0usize;
        for layer in &self.layers {
            match layer {
                LayerSnapshot::Image { transform, clip, .. } => {
                    transform.validate()?;
                    if let Some(clip) = clip {
                        clip.validate()?;
                    }
                }
                LayerSnapshot::Text {
                    content,
                    font_size,
                    transform,
                    ..
                } => {
                    if content.trim().is_empty() {
                        return Err(PadforgeError::validation(
                            "text layer content must be non-empty",
                        ));
                    }
                    if !font_size.is_finite() || *font_size <= 0.0 {
                        return Err(PadforgeError::validation("text font_size must be > 0"));
                    }
                    transform.validate()?;
                }
                LayerSnapshot::Logo { .. } => logos += 1,
            }
        }
        if logos > 1 {
            return Err(PadforgeError::validation(
                "snapshot must contain at most one logo layer",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SceneSnapshot {
        SceneSnapshot {
            width: 960,
            height: 426,
            background: Color::rgb(11, 15, 20),
            layers: vec![
                LayerSnapshot::Image {
                    source: ImageSource::asset(AssetId("img_a".to_string())),
                    transform: Transform::centered(480.0, 213.0, 400.0, 200.0, 0.5),
                    clip: None,
                },
                LayerSnapshot::Text {
                    id: "t0".to_string(),
                    content: "GG".to_string(),
                    font_family: "Orbitron".to_string(),
                    fill: Color::WHITE,
                    font_size: 28.0,
                    transform: Transform::at(40.0, 40.0, 80.0, 34.0),
                },
                LayerSnapshot::Logo {
                    corner: LogoCorner::BottomRight,
                    visible: true,
                },
            ],
        }
    }

    #[test]
    fn json_roundtrip() {
        let snap = sample();
        let bytes = snap.to_json().unwrap();
        let back = SceneSnapshot::from_json(&bytes).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn inline_source_roundtrip() {
        let src = ImageSource::inline(&[1, 2, 3, 255]);
        assert_eq!(src.inline_bytes().unwrap().unwrap(), vec![1, 2, 3, 255]);
        assert_eq!(src.asset_id(), None);
    }

    #[test]
    fn referenced_assets_skips_inline() {
        let mut snap = sample();
        snap.layers.push(LayerSnapshot::Image {
            source: ImageSource::inline(b"png"),
            transform: Transform::at(0.0, 0.0, 1.0, 1.0),
            clip: None,
        });
        assert_eq!(snap.referenced_assets(), vec![AssetId("img_a".to_string())]);
    }

    #[test]
    fn validate_rejects_empty_text() {
        let mut snap = sample();
        if let LayerSnapshot::Text { content, .. } = &mut snap.layers[1] {
            *content = "   ".to_string();
        }
        assert!(snap.validate().is_err());
    }

    #[test]
    fn validate_rejects_double_logo() {
        let mut snap = sample();
        snap.layers.push(LayerSnapshot::Logo {
            corner: LogoCorner::TopLeft,
            visible: true,
        });
        assert!(snap.validate().is_err());
    }

    #[test]
    fn decode_failure_is_serde_error() {
        let err = SceneSnapshot::from_json(b"not json").unwrap_err();
        assert!(err.to_string().contains("serialization error:"));
    }
}
