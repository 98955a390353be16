//! Interactive composition surface.
//!
//! A [`Surface`] is the live, mutable scene a customer edits: a stack of image and text
//! layers over a background, plus the branding logo pinned to a corner. It is the only
//! place layer mutation happens; everything downstream (snapshots, documents, renders)
//! is derived from it.
//!
//! Coordinates are logical canvas units: the canvas is always [`LOGICAL_WIDTH`] wide and
//! `size.logical_height()` tall regardless of the physical pad, so a design survives a
//! size change with its layout intact.

use std::sync::Arc;

use crate::catalog::pricing::PriceBreakdown;
use crate::catalog::size::{LOGICAL_WIDTH, PadSize};
use crate::design::document::{
    DesignDocument, ImageRecord, LogoCorner, LogoState, PreviewRaster, TextRecord,
};
use crate::design::snapshot::{ImageSource, LayerSnapshot, SceneSnapshot};
use crate::design::transform::{ClipRect, Transform};
use crate::foundation::color::Color;
use crate::foundation::error::{PadforgeError, PadforgeResult};
use crate::render::fonts::FontCatalog;
use crate::render::highres::{preview_multiplier, render_with_ladder};
use crate::render::raster::{PreparedImage, Raster, decode_image};
use crate::render::scene::SceneLayer;
use crate::store::{AssetStore, spawn_delete_blob};

pub mod logo;

use logo::{corner_position, fit_scale};

/// Default canvas background, a near-black navy.
pub const DEFAULT_BACKGROUND: Color = Color::rgb(11, 15, 20);

/// Defaults for freshly added text layers.
pub const DEFAULT_FONT_FAMILY: &str = "Orbitron";
pub const DEFAULT_FONT_SIZE: f64 = 28.0;
pub const DEFAULT_TEXT_POSITION: (f64, f64) = (40.0, 40.0);

/// Handle to one layer on a surface. Ids are unique per surface and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerId(u64);

/// How an image layer's pixels are backed.
#[derive(Clone, Debug)]
enum ImageBacking {
    /// Already persisted (or inlined); serializes as-is.
    Durable(ImageSource),
    /// Pixels only; persisted to the store on serialize.
    Transient { encoded: Vec<u8> },
}

#[derive(Clone, Debug)]
enum LayerKind {
    Image {
        backing: ImageBacking,
        pixels: PreparedImage,
        clip: Option<ClipRect>,
    },
    Text {
        text_id: String,
        content: String,
        font_family: String,
        fill: Color,
        font_size: f64,
    },
    Logo {
        pixels: PreparedImage,
    },
}

#[derive(Clone, Debug)]
struct Layer {
    id: LayerId,
    kind: LayerKind,
    transform: Transform,
}

impl Layer {
    fn is_logo(&self) -> bool {
        matches!(self.kind, LayerKind::Logo { .. })
    }
}

/// A straight line segment in canvas coordinates, used for on-canvas rotation guides.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GuideLine {
    pub from: (f64, f64),
    pub to: (f64, f64),
}

pub struct Surface {
    size: PadSize,
    background: Color,
    // Stacking order, first element backmost. The logo layer, when present, is kept last.
    layers: Vec<Layer>,
    next_id: u64,
    selected: Option<LayerId>,
    logo: LogoState,
    rgb: bool,
}

impl Surface {
    /// Fresh surface for the given pad size. `logo_bytes` is the branding image; when
    /// provided, the logo starts pinned bottom-right.
    pub fn new(size: PadSize, logo_bytes: Option<&[u8]>) -> PadforgeResult<Self> {
        let mut surface = Self {
            size,
            background: DEFAULT_BACKGROUND,
            layers: Vec::new(),
            next_id: 0,
            selected: None,
            logo: LogoState::default(),
            rgb: false,
        };
        if let Some(bytes) = logo_bytes {
            // An undecodable logo degrades to a logo-less scene; it must never block
            // the customer from designing.
            match decode_image(bytes) {
                Ok(pixels) => {
                    let transform = surface.logo_transform(&pixels, surface.logo.corner);
                    let id = surface.mint_id();
                    surface.layers.push(Layer {
                        id,
                        kind: LayerKind::Logo { pixels },
                        transform,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "logo image undecodable, continuing without logo layer");
                }
            }
        }
        Ok(surface)
    }

    pub fn size(&self) -> PadSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        LOGICAL_WIDTH
    }

    pub fn height(&self) -> u32 {
        self.size.logical_height()
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    pub fn rgb(&self) -> bool {
        self.rgb
    }

    pub fn set_rgb(&mut self, rgb: bool) {
        self.rgb = rgb;
    }

    pub fn logo_state(&self) -> LogoState {
        self.logo
    }

    pub fn pricing(&self) -> PriceBreakdown {
        PriceBreakdown::compute(self.logo.removed, self.rgb)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    fn mint_id(&mut self) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        id
    }

    fn logo_transform(&self, pixels: &PreparedImage, corner: LogoCorner) -> Transform {
        let scale = fit_scale(f64::from(pixels.width), f64::from(pixels.height));
        let w = f64::from(pixels.width) * scale;
        let h = f64::from(pixels.height) * scale;
        let (left, top) = corner_position(
            f64::from(self.width()),
            f64::from(self.height()),
            w,
            h,
            corner,
        );
        Transform {
            scale_x: scale,
            scale_y: scale,
            ..Transform::at(
                left,
                top,
                f64::from(pixels.width),
                f64::from(pixels.height),
            )
        }
    }

    fn layer(&self, id: LayerId) -> PadforgeResult<&Layer> {
        self.layers
            .iter()
            .find(|l| l.id == id)
            .ok_or_else(|| PadforgeError::validation(format!("no layer with id {}", id.0)))
    }

    fn layer_mut(&mut self, id: LayerId) -> PadforgeResult<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| PadforgeError::validation(format!("no layer with id {}", id.0)))
    }

    fn user_layer_mut(&mut self, id: LayerId) -> PadforgeResult<&mut Layer> {
        let layer = self.layer_mut(id)?;
        if layer.is_logo() {
            return Err(PadforgeError::validation(
                "the logo layer can only be repositioned by corner",
            ));
        }
        Ok(layer)
    }

    /// Change the physical pad size. Layer coordinates are deliberately left untouched
    /// (a 90x40 layout reinterpreted on a 60x30 canvas simply crops differently); only
    /// the logo is re-pinned to its corner for the new canvas dimensions.
    pub fn set_size(&mut self, size: PadSize) {
        self.size = size;
        self.reposition_logo();
    }

    fn reposition_logo(&mut self) {
        let corner = self.logo.corner;
        if let Some(i) = self.layers.iter().position(Layer::is_logo) {
            let transform = match &self.layers[i].kind {
                LayerKind::Logo { pixels } => self.logo_transform(pixels, corner),
                _ => unreachable!(),
            };
            self.layers[i].transform = transform;
        }
    }

    /// Decode, persist and place an image. The new layer is centered, downscaled to half
    /// the canvas fit, sent to the back of the user stack, and selected.
    pub fn add_image(
        &mut self,
        bytes: &[u8],
        store: &dyn AssetStore,
    ) -> PadforgeResult<LayerId> {
        let pixels = decode_image(bytes)?;
        let asset_id = store.save_blob(bytes, None)?;
        self.place_image(
            pixels,
            ImageBacking::Durable(ImageSource::asset(asset_id)),
        )
    }

    /// Place an image without persisting it yet. The payload is held in memory and
    /// written to the store when the surface is serialized.
    pub fn add_image_transient(&mut self, bytes: &[u8]) -> PadforgeResult<LayerId> {
        let pixels = decode_image(bytes)?;
        self.place_image(
            pixels,
            ImageBacking::Transient {
                encoded: bytes.to_vec(),
            },
        )
    }

    fn place_image(
        &mut self,
        pixels: PreparedImage,
        backing: ImageBacking,
    ) -> PadforgeResult<LayerId> {
        let (cw, ch) = (f64::from(self.width()), f64::from(self.height()));
        let (nw, nh) = (f64::from(pixels.width), f64::from(pixels.height));
        let fit = (cw / nw).min(ch / nh);
        let scale = (fit * 0.5).min(1.0);
        let transform = Transform::centered(cw / 2.0, ch / 2.0, nw, nh, scale);

        let id = self.mint_id();
        let layer = Layer {
            id,
            kind: LayerKind::Image {
                backing,
                pixels,
                clip: None,
            },
            transform,
        };
        // Backmost, behind existing imagery and text.
        self.layers.insert(0, layer);
        self.selected = Some(id);
        Ok(id)
    }

    /// Add a text layer at the default position. Empty or whitespace-only content is
    /// rejected.
    pub fn add_text(&mut self, content: &str) -> PadforgeResult<LayerId> {
        if content.trim().is_empty() {
            return Err(PadforgeError::validation("text content must be non-empty"));
        }
        let (w, h) = estimate_text_box(content, DEFAULT_FONT_SIZE);
        let id = self.mint_id();
        let layer = Layer {
            id,
            kind: LayerKind::Text {
                text_id: format!("txt_{}", uuid::Uuid::new_v4().simple()),
                content: content.to_string(),
                font_family: DEFAULT_FONT_FAMILY.to_string(),
                fill: Color::WHITE,
                font_size: DEFAULT_FONT_SIZE,
            },
            transform: Transform::at(DEFAULT_TEXT_POSITION.0, DEFAULT_TEXT_POSITION.1, w, h),
        };
        self.insert_top(layer);
        self.selected = Some(id);
        Ok(id)
    }

    // New user layers go above everything except the logo.
    fn insert_top(&mut self, layer: Layer) {
        match self.layers.iter().position(Layer::is_logo) {
            Some(i) => self.layers.insert(i, layer),
            None => self.layers.push(layer),
        }
    }

    pub fn select(&mut self, id: LayerId) -> PadforgeResult<()> {
        self.layer(id)?;
        self.selected = Some(id);
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<LayerId> {
        self.selected
    }

    pub fn translate(&mut self, id: LayerId, dx: f64, dy: f64) -> PadforgeResult<()> {
        let layer = self.user_layer_mut(id)?;
        layer.transform.left += dx;
        layer.transform.top += dy;
        layer.transform.validate()
    }

    pub fn set_position(&mut self, id: LayerId, left: f64, top: f64) -> PadforgeResult<()> {
        let layer = self.user_layer_mut(id)?;
        layer.transform.left = left;
        layer.transform.top = top;
        layer.transform.validate()
    }

    pub fn set_scale(&mut self, id: LayerId, scale_x: f64, scale_y: f64) -> PadforgeResult<()> {
        if !(scale_x.is_finite() && scale_y.is_finite()) || scale_x <= 0.0 || scale_y <= 0.0 {
            return Err(PadforgeError::validation("layer scale must be > 0"));
        }
        let layer = self.user_layer_mut(id)?;
        layer.transform.scale_x = scale_x;
        layer.transform.scale_y = scale_y;
        Ok(())
    }

    pub fn set_rotation(&mut self, id: LayerId, angle_deg: f64) -> PadforgeResult<()> {
        if !angle_deg.is_finite() {
            return Err(PadforgeError::validation("rotation angle must be finite"));
        }
        let layer = self.user_layer_mut(id)?;
        layer.transform.angle_deg = angle_deg;
        Ok(())
    }

    /// Guide lines shown while a layer is being rotated: two symmetric lines through the
    /// canvas center, one at the layer's angle and one mirrored, for aligning by eye.
    /// Purely visual; callers drop them when the gesture ends.
    pub fn rotation_guides(&self, id: LayerId) -> PadforgeResult<[GuideLine; 2]> {
        let angle = self.layer(id)?.transform.angle_deg;
        let (w, h) = (f64::from(self.width()), f64::from(self.height()));
        let (cx, cy) = (w / 2.0, h / 2.0);
        let half = (w * w + h * h).sqrt() / 2.0;
        let line = |deg: f64| {
            let (sin, cos) = deg.to_radians().sin_cos();
            GuideLine {
                from: (cx - cos * half, cy - sin * half),
                to: (cx + cos * half, cy + sin * half),
            }
        };
        Ok([line(angle), line(-angle)])
    }

    /// Crop an image layer. The rectangle is in layer-local coordinates.
    pub fn set_clip(&mut self, id: LayerId, clip: ClipRect) -> PadforgeResult<()> {
        clip.validate()?;
        let layer = self.user_layer_mut(id)?;
        match &mut layer.kind {
            LayerKind::Image { clip: slot, .. } => {
                *slot = Some(clip);
                Ok(())
            }
            _ => Err(PadforgeError::validation("only image layers can be cropped")),
        }
    }

    pub fn clear_clip(&mut self, id: LayerId) -> PadforgeResult<()> {
        let layer = self.user_layer_mut(id)?;
        match &mut layer.kind {
            LayerKind::Image { clip: slot, .. } => {
                *slot = None;
                Ok(())
            }
            _ => Err(PadforgeError::validation("only image layers can be cropped")),
        }
    }

    /// Remove a user layer. The logo cannot be deleted. If the layer referenced a stored
    /// blob no other layer still uses, the blob is deleted on a detached thread.
    pub fn delete_layer(
        &mut self,
        id: LayerId,
        store: &Arc<dyn AssetStore>,
    ) -> PadforgeResult<()> {
        let idx = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| PadforgeError::validation(format!("no layer with id {}", id.0)))?;
        if self.layers[idx].is_logo() {
            return Err(PadforgeError::validation("the logo layer cannot be deleted"));
        }
        let removed = self.layers.remove(idx);
        if self.selected == Some(id) {
            self.selected = None;
        }

        if let LayerKind::Image {
            backing: ImageBacking::Durable(ImageSource::Asset { id: asset_id }),
            ..
        } = removed.kind
        {
            let still_used = self.layers.iter().any(|l| {
                matches!(
                    &l.kind,
                    LayerKind::Image {
                        backing: ImageBacking::Durable(ImageSource::Asset { id }),
                        ..
                    } if *id == asset_id
                )
            });
            if !still_used {
                spawn_delete_blob(store, asset_id);
            }
        }
        Ok(())
    }

    /// Toggle paid logo removal. The layer stays in the stack; visibility is decided at
    /// render and serialize time.
    pub fn set_logo_removed(&mut self, removed: bool) {
        self.logo.removed = removed;
    }

    pub fn set_logo_corner(&mut self, corner: LogoCorner) {
        self.logo.corner = corner;
        self.reposition_logo();
        // Pinning also re-raises: the logo is always topmost.
        if let Some(i) = self.layers.iter().position(Layer::is_logo)
            && i != self.layers.len() - 1
        {
            let layer = self.layers.remove(i);
            self.layers.push(layer);
        }
    }

    fn visible_scene_layers(&self) -> Vec<SceneLayer> {
        self.layers
            .iter()
            .filter_map(|layer| match &layer.kind {
                LayerKind::Image { pixels, clip, .. } => Some(SceneLayer::Image {
                    pixels: pixels.clone(),
                    transform: layer.transform,
                    clip: *clip,
                }),
                LayerKind::Text {
                    content,
                    font_family,
                    fill,
                    font_size,
                    ..
                } => Some(SceneLayer::Text {
                    content: content.clone(),
                    font_family: font_family.clone(),
                    fill: *fill,
                    font_size: *font_size,
                    transform: layer.transform,
                }),
                LayerKind::Logo { pixels } => (!self.logo.removed).then(|| SceneLayer::Image {
                    pixels: pixels.clone(),
                    transform: layer.transform,
                    clip: None,
                }),
            })
            .collect()
    }

    fn max_user_image_width(&self) -> Option<u32> {
        self.layers
            .iter()
            .filter_map(|l| match &l.kind {
                LayerKind::Image { pixels, .. } => Some(pixels.width),
                _ => None,
            })
            .max()
    }

    /// Render the cart/share preview. The multiplier follows the largest source image
    /// (clamped to [2, 4]); failures step down to 2x and then 1x before giving up.
    pub fn export_preview(&self, fonts: &FontCatalog) -> PadforgeResult<Raster> {
        let layers = self.visible_scene_layers();
        let multiplier = preview_multiplier(self.max_user_image_width());
        render_with_ladder(
            self.width(),
            self.height(),
            self.background,
            &layers,
            fonts,
            &[multiplier, 2.0, 1.0],
        )
    }

    /// Serialize the live scene. Transient image payloads are persisted first so the
    /// snapshot only ever carries durable references.
    pub fn serialize(&mut self, store: &dyn AssetStore) -> PadforgeResult<SceneSnapshot> {
        for layer in &mut self.layers {
            if let LayerKind::Image { backing, .. } = &mut layer.kind
                && let ImageBacking::Transient { encoded } = backing
            {
                let id = store.save_blob(encoded, None)?;
                *backing = ImageBacking::Durable(ImageSource::asset(id));
            }
        }

        let mut layers = Vec::with_capacity(self.layers.len() + 1);
        for layer in &self.layers {
            match &layer.kind {
                LayerKind::Image { backing, clip, .. } => {
                    let ImageBacking::Durable(source) = backing else {
                        unreachable!("transients were just persisted");
                    };
                    layers.push(LayerSnapshot::Image {
                        source: source.clone(),
                        transform: layer.transform,
                        clip: *clip,
                    });
                }
                LayerKind::Text {
                    text_id,
                    content,
                    font_family,
                    fill,
                    font_size,
                } => layers.push(LayerSnapshot::Text {
                    id: text_id.clone(),
                    content: content.clone(),
                    font_family: font_family.clone(),
                    fill: *fill,
                    font_size: *font_size,
                    transform: layer.transform,
                }),
                LayerKind::Logo { .. } => layers.push(LayerSnapshot::Logo {
                    corner: self.logo.corner,
                    visible: !self.logo.removed,
                }),
            }
        }

        Ok(SceneSnapshot {
            width: self.width(),
            height: self.height(),
            background: self.background,
            layers,
        })
    }

    /// Rebuild a surface from a serialized scene. Logo layers in the snapshot are
    /// ignored; the logo is re-derived from `logo_bytes` and the document's logo state.
    /// Image layers whose assets are gone are logged and skipped.
    pub fn restore(
        size: PadSize,
        snapshot: &SceneSnapshot,
        logo: LogoState,
        logo_bytes: Option<&[u8]>,
        store: &dyn AssetStore,
    ) -> PadforgeResult<Self> {
        let mut surface = Self::new(size, logo_bytes)?;
        surface.background = snapshot.background;
        surface.logo = logo;
        surface.reposition_logo();

        for layer in &snapshot.layers {
            match layer {
                LayerSnapshot::Image {
                    source,
                    transform,
                    clip,
                } => {
                    let bytes = match source {
                        ImageSource::Asset { id } => match store.get_blob(id)? {
                            Some(bytes) => bytes,
                            None => {
                                tracing::warn!(asset = %id, "asset missing on restore, skipping layer");
                                continue;
                            }
                        },
                        ImageSource::Inline { .. } => match source.inline_bytes()? {
                            Some(bytes) => bytes,
                            None => continue,
                        },
                    };
                    let pixels = match decode_image(&bytes) {
                        Ok(p) => p,
                        Err(e) => {
                            tracing::warn!(error = %e, "undecodable image on restore, skipping layer");
                            continue;
                        }
                    };
                    let id = surface.mint_id();
                    surface.insert_top(Layer {
                        id,
                        kind: LayerKind::Image {
                            backing: ImageBacking::Durable(source.clone()),
                            pixels,
                            clip: *clip,
                        },
                        transform: *transform,
                    });
                }
                LayerSnapshot::Text {
                    id: text_id,
                    content,
                    font_family,
                    fill,
                    font_size,
                    transform,
                } => {
                    let id = surface.mint_id();
                    surface.insert_top(Layer {
                        id,
                        kind: LayerKind::Text {
                            text_id: text_id.clone(),
                            content: content.clone(),
                            font_family: font_family.clone(),
                            fill: *fill,
                            font_size: *font_size,
                        },
                        transform: *transform,
                    });
                }
                LayerSnapshot::Logo { .. } => {}
            }
        }
        Ok(surface)
    }

    /// Freeze the surface into a cart-ready document: durable snapshot, normalized
    /// line-item records, current pricing and a fresh preview raster.
    pub fn freeze(
        &mut self,
        store: &dyn AssetStore,
        fonts: &FontCatalog,
    ) -> PadforgeResult<DesignDocument> {
        let scene = self.serialize(store)?;

        let mut images = Vec::new();
        let mut texts = Vec::new();
        for layer in &scene.layers {
            match layer {
                LayerSnapshot::Image { source, transform, .. } => images.push(ImageRecord {
                    source: source.clone(),
                    transform: *transform,
                }),
                LayerSnapshot::Text {
                    id,
                    content,
                    font_family,
                    fill,
                    font_size,
                    transform,
                } => texts.push(TextRecord {
                    id: id.clone(),
                    content: content.clone(),
                    font_family: font_family.clone(),
                    fill: *fill,
                    font_size: *font_size,
                    transform: *transform,
                }),
                LayerSnapshot::Logo { .. } => {}
            }
        }

        let preview = match self.export_preview(fonts) {
            Ok(raster) => {
                let png = raster.encode_png()?;
                Some(PreviewRaster {
                    width: raster.width,
                    height: raster.height,
                    png,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "preview render failed, freezing without preview");
                None
            }
        };

        let doc = DesignDocument {
            size: self.size,
            background: self.background,
            images,
            texts,
            logo: self.logo,
            rgb: self.rgb,
            pricing: self.pricing(),
            preview,
            scene,
        };
        doc.validate()?;
        Ok(doc)
    }

    // Text editing.

    pub fn set_text_content(&mut self, id: LayerId, content: &str) -> PadforgeResult<()> {
        if content.trim().is_empty() {
            return Err(PadforgeError::validation("text content must be non-empty"));
        }
        let layer = self.user_layer_mut(id)?;
        match &mut layer.kind {
            LayerKind::Text {
                content: slot,
                font_size,
                ..
            } => {
                let (w, h) = estimate_text_box(content, *font_size);
                *slot = content.to_string();
                layer.transform.width = w;
                layer.transform.height = h;
                Ok(())
            }
            _ => Err(PadforgeError::validation("layer is not a text layer")),
        }
    }

    pub fn set_text_fill(&mut self, id: LayerId, fill: Color) -> PadforgeResult<()> {
        let layer = self.user_layer_mut(id)?;
        match &mut layer.kind {
            LayerKind::Text { fill: slot, .. } => {
                *slot = fill;
                Ok(())
            }
            _ => Err(PadforgeError::validation("layer is not a text layer")),
        }
    }

    pub fn set_text_font(&mut self, id: LayerId, family: &str, font_size: f64) -> PadforgeResult<()> {
        if !font_size.is_finite() || font_size <= 0.0 {
            return Err(PadforgeError::validation("font size must be > 0"));
        }
        let layer = self.user_layer_mut(id)?;
        match &mut layer.kind {
            LayerKind::Text {
                font_family,
                font_size: size_slot,
                content,
                ..
            } => {
                let (w, h) = estimate_text_box(content, font_size);
                *font_family = family.to_string();
                *size_slot = font_size;
                layer.transform.width = w;
                layer.transform.height = h;
                Ok(())
            }
            _ => Err(PadforgeError::validation("layer is not a text layer")),
        }
    }
}

// Rough intrinsic box for a text layer before any glyphs are measured. Render re-measures
// from actual glyph extents; this only drives hit areas and anchor math.
fn estimate_text_box(content: &str, font_size: f64) -> (f64, f64) {
    let lines: Vec<&str> = content.split('\n').collect();
    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    (
        (widest as f64 * font_size * 0.6).max(font_size * 0.6),
        lines.len() as f64 * font_size * 1.2,
    )
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::store::{AssetStore, MemoryStore};

    fn png(width: u32, height: u32, px: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(px));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn logo_png() -> Vec<u8> {
        png(360, 160, [255, 255, 255, 255])
    }

    #[test]
    fn new_surface_pins_logo_bottom_right() {
        let surface = Surface::new(PadSize::W90H40, Some(&logo_png())).unwrap();
        assert_eq!(surface.layer_count(), 1);
        let layer = &surface.layers[0];
        // 360x160 fits 180x80 at scale 0.5.
        assert_eq!(layer.transform.scale_x, 0.5);
        assert_eq!(layer.transform.left, 960.0 - 180.0 - 12.0);
        assert_eq!(layer.transform.top, 426.0 - 80.0 - 12.0);
    }

    #[test]
    fn garbage_logo_degrades_to_logoless_scene() {
        let surface = Surface::new(PadSize::W90H40, Some(b"not an image")).unwrap();
        assert_eq!(surface.layer_count(), 0);
    }

    #[test]
    fn add_image_persists_centers_and_selects() {
        let store = MemoryStore::new();
        let mut surface = Surface::new(PadSize::W90H40, None).unwrap();
        let id = surface.add_image(&png(400, 200, [0, 255, 0, 255]), &store).unwrap();

        assert_eq!(store.blob_count(), 1);
        assert_eq!(surface.selected(), Some(id));
        let layer = surface.layer(id).unwrap();
        assert_eq!((layer.transform.left, layer.transform.top), (480.0, 213.0));
        // Half the canvas fit: min(960/400, 426/200) * 0.5.
        assert!((layer.transform.scale_x - 1.065).abs() < 1e-9);
    }

    #[test]
    fn images_stack_behind_text_and_logo() {
        let store = MemoryStore::new();
        let mut surface = Surface::new(PadSize::W90H40, Some(&logo_png())).unwrap();
        let text = surface.add_text("GG").unwrap();
        let img = surface.add_image(&png(4, 4, [255, 0, 0, 255]), &store).unwrap();

        let ids = surface.layer_ids();
        assert_eq!(ids[0], img);
        assert_eq!(ids[1], text);
        assert!(surface.layers.last().unwrap().is_logo());
    }

    #[test]
    fn add_text_rejects_blank() {
        let mut surface = Surface::new(PadSize::W90H40, None).unwrap();
        assert!(surface.add_text("   ").is_err());
    }

    #[test]
    fn logo_is_not_user_mutable() {
        let mut surface = Surface::new(PadSize::W90H40, Some(&logo_png())).unwrap();
        let logo_id = surface.layer_ids()[0];
        let store: Arc<dyn AssetStore> = Arc::new(MemoryStore::new());

        assert!(surface.translate(logo_id, 5.0, 5.0).is_err());
        assert!(surface.set_rotation(logo_id, 45.0).is_err());
        assert!(surface.delete_layer(logo_id, &store).is_err());
        assert_eq!(surface.layer_count(), 1);
    }

    #[test]
    fn delete_layer_removes_and_deselects() {
        let store: Arc<dyn AssetStore> = Arc::new(MemoryStore::new());
        let mut surface = Surface::new(PadSize::W90H40, None).unwrap();
        let id = surface.add_image(&png(4, 4, [255, 0, 0, 255]), store.as_ref()).unwrap();

        surface.delete_layer(id, &store).unwrap();
        assert_eq!(surface.layer_count(), 0);
        assert_eq!(surface.selected(), None);
        assert!(surface.layer(id).is_err());
    }

    #[test]
    fn set_size_keeps_layout_but_repins_logo() {
        let store = MemoryStore::new();
        let mut surface = Surface::new(PadSize::W90H40, Some(&logo_png())).unwrap();
        let img = surface.add_image(&png(4, 4, [0, 0, 255, 255]), &store).unwrap();
        let before = surface.layer(img).unwrap().transform;

        surface.set_size(PadSize::W60H30);
        assert_eq!(surface.height(), 480);
        assert_eq!(surface.layer(img).unwrap().transform, before);
        let logo = surface.layers.iter().find(|l| l.is_logo()).unwrap();
        assert_eq!(logo.transform.top, 480.0 - 80.0 - 12.0);
    }

    #[test]
    fn set_logo_corner_repins_and_raises() {
        let store = MemoryStore::new();
        let mut surface = Surface::new(PadSize::W90H40, Some(&logo_png())).unwrap();
        surface.add_image(&png(4, 4, [0, 0, 255, 255]), &store).unwrap();

        surface.set_logo_corner(LogoCorner::TopLeft);
        let logo = surface.layers.last().unwrap();
        assert!(logo.is_logo());
        assert_eq!((logo.transform.left, logo.transform.top), (12.0, 12.0));
    }

    #[test]
    fn clip_only_applies_to_images() {
        let store = MemoryStore::new();
        let mut surface = Surface::new(PadSize::W90H40, None).unwrap();
        let img = surface.add_image(&png(8, 8, [1, 2, 3, 255]), &store).unwrap();
        let txt = surface.add_text("hi").unwrap();
        let clip = ClipRect {
            left: 1.0,
            top: 1.0,
            width: 4.0,
            height: 4.0,
        };

        surface.set_clip(img, clip).unwrap();
        assert!(surface.set_clip(txt, clip).is_err());
        surface.clear_clip(img).unwrap();
    }

    #[test]
    fn serialize_persists_transients_and_records_logo() {
        let store = MemoryStore::new();
        let mut surface = Surface::new(PadSize::W90H40, Some(&logo_png())).unwrap();
        surface.add_image_transient(&png(4, 4, [9, 9, 9, 255])).unwrap();
        assert_eq!(store.blob_count(), 0);

        let snapshot = surface.serialize(&store).unwrap();
        assert_eq!(store.blob_count(), 1);
        assert_eq!(snapshot.referenced_assets().len(), 1);
        assert!(matches!(
            snapshot.layers.last(),
            Some(LayerSnapshot::Logo { visible: true, .. })
        ));

        // Serializing again reuses the now-durable reference.
        let again = surface.serialize(&store).unwrap();
        assert_eq!(store.blob_count(), 1);
        assert_eq!(again.referenced_assets(), snapshot.referenced_assets());
    }

    #[test]
    fn restore_skips_missing_assets() {
        let store = MemoryStore::new();
        let mut surface = Surface::new(PadSize::W90H40, Some(&logo_png())).unwrap();
        surface.add_image(&png(4, 4, [7, 7, 7, 255]), &store).unwrap();
        surface.add_text("brand").unwrap();
        let snapshot = surface.serialize(&store).unwrap();

        // Wipe the blob behind the image layer.
        for id in snapshot.referenced_assets() {
            store.delete_blob(&id).unwrap();
        }

        let restored = Surface::restore(
            PadSize::W90H40,
            &snapshot,
            surface.logo_state(),
            Some(&logo_png()),
            &store,
        )
        .unwrap();
        // Text and logo survive; the dead image layer is dropped.
        assert_eq!(restored.layer_count(), 2);
    }

    #[test]
    fn restore_rederives_logo_from_state() {
        let store = MemoryStore::new();
        let mut surface = Surface::new(PadSize::W90H40, Some(&logo_png())).unwrap();
        surface.set_logo_corner(LogoCorner::TopRight);
        let snapshot = surface.serialize(&store).unwrap();

        let restored = Surface::restore(
            PadSize::W90H40,
            &snapshot,
            surface.logo_state(),
            Some(&logo_png()),
            &store,
        )
        .unwrap();
        let logo = restored.layers.iter().find(|l| l.is_logo()).unwrap();
        assert_eq!((logo.transform.left, logo.transform.top), (960.0 - 180.0 - 12.0, 12.0));
    }

    #[test]
    fn export_preview_uses_floor_without_images() {
        let surface = Surface::new(PadSize::W90H40, None).unwrap();
        let fonts = FontCatalog::new();
        let out = surface.export_preview(&fonts).unwrap();
        assert_eq!((out.width, out.height), (1920, 852));
    }

    #[test]
    fn freeze_produces_valid_document() {
        let store = MemoryStore::new();
        let fonts = FontCatalog::new();
        let mut surface = Surface::new(PadSize::W80H30, Some(&logo_png())).unwrap();
        surface.add_image(&png(16, 8, [3, 4, 5, 255]), &store).unwrap();
        surface.add_text("team").unwrap();
        surface.set_rgb(true);

        let doc = surface.freeze(&store, &fonts).unwrap();
        assert_eq!(doc.size, PadSize::W80H30);
        assert_eq!(doc.images.len(), 1);
        assert_eq!(doc.texts.len(), 1);
        assert_eq!(doc.pricing.total, 250_000);
        assert!(doc.preview.is_some());
        doc.validate().unwrap();
    }

    #[test]
    fn removed_logo_is_invisible_but_retained() {
        let store = MemoryStore::new();
        let mut surface = Surface::new(PadSize::W90H40, Some(&logo_png())).unwrap();
        surface.set_logo_removed(true);

        assert_eq!(surface.pricing().total, 230_000);
        assert!(surface.visible_scene_layers().is_empty());
        let snapshot = surface.serialize(&store).unwrap();
        assert!(matches!(
            snapshot.layers.last(),
            Some(LayerSnapshot::Logo { visible: false, .. })
        ));
    }

    #[test]
    fn text_edits_reestimate_box() {
        let mut surface = Surface::new(PadSize::W90H40, None).unwrap();
        let id = surface.add_text("ab").unwrap();
        let narrow = surface.layer(id).unwrap().transform.width;
        surface.set_text_content(id, "a much longer line").unwrap();
        assert!(surface.layer(id).unwrap().transform.width > narrow);
        assert!(surface.set_text_content(id, " ").is_err());
    }

    #[test]
    fn rotation_guides_mirror_the_layer_angle() {
        let mut surface = Surface::new(PadSize::W80H40, None).unwrap();
        let id = surface.add_text("tilt").unwrap();
        surface.set_rotation(id, 30.0).unwrap();

        let [own, mirrored] = surface.rotation_guides(id).unwrap();
        let (cx, cy) = (480.0, 240.0);
        // Both pass through the canvas center.
        assert!(((own.from.0 + own.to.0) / 2.0 - cx).abs() < 1e-9);
        assert!(((own.from.1 + own.to.1) / 2.0 - cy).abs() < 1e-9);
        // Mirrored line is the reflection across the horizontal center line.
        assert!((own.to.0 - mirrored.to.0).abs() < 1e-9);
        assert!(((own.to.1 - cy) + (mirrored.to.1 - cy)).abs() < 1e-9);
        assert!((own.to.1 - cy) > 0.0);
    }
}
