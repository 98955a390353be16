//! Print-resolution re-rendering of a frozen design document, plus the multiplier
//! policies shared with preview export.
//!
//! The print path never trusts a cached preview: it resolves every layer's pixels from
//! the store and rebuilds the scene at the logical dimensions of the document's current
//! size, so a size change after authoring still produces a correctly shaped output.

use crate::catalog::size::LOGICAL_WIDTH;
use crate::design::document::DesignDocument;
use crate::design::snapshot::{ImageSource, LayerSnapshot, SceneSnapshot};
use crate::design::transform::Transform;
use crate::foundation::color::Color;
use crate::foundation::error::{PadforgeError, PadforgeResult};
use crate::render::fonts::FontCatalog;
use crate::render::raster::{PreparedImage, Raster, decode_image};
use crate::render::scene::{SceneLayer, largest_image_pixels, render_scene};
use crate::store::AssetStore;
use crate::surface::logo::{corner_position, fit_scale};

/// Preview multiplier: ratio of the largest source image's native width to the logical
/// canvas width, clamped to [2, 4] and rounded to one decimal. Designs without image
/// layers get the floor.
pub fn preview_multiplier(max_native_width: Option<u32>) -> f64 {
    let ratio = match max_native_width {
        Some(w) => f64::from(w) / f64::from(LOGICAL_WIDTH),
        None => 0.0,
    };
    let clamped = ratio.clamp(2.0, 4.0);
    (clamped * 10.0).round() / 10.0
}

/// Print multiplier: square root of the ratio between the largest source image's native
/// pixel count and the logical canvas area, clamped to [5, 8]. Designs without image
/// layers get the floor, which already clears every print size's pixel table.
pub fn print_multiplier(largest_native_px: Option<u64>, logical_w: u32, logical_h: u32) -> f64 {
    let Some(px) = largest_native_px else {
        return 5.0;
    };
    let logical_area = f64::from(logical_w) * f64::from(logical_h);
    let natural = (px as f64 / logical_area).sqrt();
    natural.clamp(5.0, 8.0)
}

/// Resolve snapshot layers into render-ready form. Image layers whose pixels cannot be
/// fetched or decoded are logged and replaced with a transparent placeholder so one dead
/// reference never sinks a whole order. Logo layers are skipped; the caller re-derives
/// the logo from the live branding asset.
pub fn resolve_layers(
    snapshot: &SceneSnapshot,
    store: &dyn AssetStore,
) -> PadforgeResult<Vec<SceneLayer>> {
    let mut layers = Vec::with_capacity(snapshot.layers.len());
    for layer in &snapshot.layers {
        match layer {
            LayerSnapshot::Image {
                source,
                transform,
                clip,
            } => {
                let pixels = resolve_source(source, store)?;
                layers.push(SceneLayer::Image {
                    pixels,
                    transform: *transform,
                    clip: *clip,
                });
            }
            LayerSnapshot::Text {
                content,
                font_family,
                fill,
                font_size,
                transform,
                ..
            } => layers.push(SceneLayer::Text {
                content: content.clone(),
                font_family: font_family.clone(),
                fill: *fill,
                font_size: *font_size,
                transform: *transform,
            }),
            LayerSnapshot::Logo { .. } => {}
        }
    }
    Ok(layers)
}

fn resolve_source(source: &ImageSource, store: &dyn AssetStore) -> PadforgeResult<PreparedImage> {
    let bytes = match source {
        ImageSource::Asset { id } => match store.get_blob(id)? {
            Some(bytes) => bytes,
            None => {
                tracing::warn!(asset = %id, "image asset missing, substituting placeholder");
                return Ok(PreparedImage::placeholder());
            }
        },
        ImageSource::Inline { .. } => match source.inline_bytes()? {
            Some(bytes) => bytes,
            None => return Ok(PreparedImage::placeholder()),
        },
    };
    match decode_image(&bytes) {
        Ok(pixels) => Ok(pixels),
        Err(e) => {
            tracing::warn!(error = %e, "image payload undecodable, substituting placeholder");
            Ok(PreparedImage::placeholder())
        }
    }
}

/// Try each multiplier in turn, stepping down when a render fails. Consecutive
/// duplicates are collapsed; the last error propagates if every rung fails.
pub fn render_with_ladder(
    width: u32,
    height: u32,
    background: Color,
    layers: &[SceneLayer],
    fonts: &FontCatalog,
    candidates: &[f64],
) -> PadforgeResult<Raster> {
    let mut last_err: Option<PadforgeError> = None;
    let mut tried: Option<f64> = None;
    for &m in candidates {
        if tried == Some(m) {
            continue;
        }
        tried = Some(m);
        match render_scene(width, height, background, layers, fonts, m) {
            Ok(raster) => {
                if last_err.is_some() {
                    tracing::warn!(multiplier = m, "render succeeded on fallback multiplier");
                }
                return Ok(raster);
            }
            Err(e) => {
                tracing::warn!(multiplier = m, error = %e, "render attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| PadforgeError::render("no multiplier candidates")))
}

/// Render a frozen design at print resolution.
///
/// `branding` is the current logo image; it is re-composited from [`DesignDocument::logo`]
/// rather than replayed from any stored layer, and omitted entirely when the customer
/// paid for logo removal.
#[tracing::instrument(skip_all, fields(size = %doc.size))]
pub fn render_highres(
    doc: &DesignDocument,
    branding: Option<&PreparedImage>,
    fonts: &FontCatalog,
    store: &dyn AssetStore,
) -> PadforgeResult<Raster> {
    let width = LOGICAL_WIDTH;
    let height = doc.size.logical_height();

    let mut layers = resolve_layers(&doc.scene, store)?;
    let largest = largest_image_pixels(&layers);

    if !doc.logo.removed
        && let Some(branding) = branding
    {
        let scale = fit_scale(f64::from(branding.width), f64::from(branding.height));
        let w = f64::from(branding.width) * scale;
        let h = f64::from(branding.height) * scale;
        let (left, top) =
            corner_position(f64::from(width), f64::from(height), w, h, doc.logo.corner);
        let transform = Transform {
            scale_x: scale,
            scale_y: scale,
            ..Transform::at(
                left,
                top,
                f64::from(branding.width),
                f64::from(branding.height),
            )
        };
        layers.push(SceneLayer::Image {
            pixels: branding.clone(),
            transform,
            clip: None,
        });
    }

    let multiplier = print_multiplier(largest, width, height);
    tracing::debug!(multiplier, ?largest, "print multiplier selected");
    render_with_ladder(
        width,
        height,
        doc.background,
        &layers,
        fonts,
        &[multiplier, 5.0, 1.0],
    )
}
