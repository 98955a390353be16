//! Shared scene renderer. Preview export and print rendering both funnel through
//! [`render_scene`]; they differ only in the multiplier policy and in how layers were
//! resolved.

use crate::design::transform::{ClipRect, Transform};
use crate::foundation::color::Color;
use crate::render::fonts::{FontCatalog, rasterize_text};
use crate::render::raster::{PreparedImage, Raster, draw_image};

/// Render-ready layer: image pixels already resolved, text still symbolic (it is
/// rasterized per output multiplier).
#[derive(Clone, Debug)]
pub enum SceneLayer {
    Image {
        pixels: PreparedImage,
        transform: Transform,
        clip: Option<ClipRect>,
    },
    Text {
        content: String,
        font_family: String,
        fill: Color,
        font_size: f64,
        transform: Transform,
    },
}

impl SceneLayer {
    pub fn native_pixels(&self) -> Option<u64> {
        match self {
            Self::Image { pixels, .. } => Some(pixels.native_pixels()),
            Self::Text { .. } => None,
        }
    }
}

/// Largest native pixel count among image layers, if any.
pub fn largest_image_pixels(layers: &[SceneLayer]) -> Option<u64> {
    layers.iter().filter_map(SceneLayer::native_pixels).max()
}

/// Render `layers` over `background` at `multiplier` times the logical canvas size.
///
/// Scaling happens by pre-multiplying each layer transform, not by resampling a
/// logical-size raster afterwards, so native image resolution survives into the output.
/// Text layers with an unknown font family are logged and skipped.
pub fn render_scene(
    width: u32,
    height: u32,
    background: Color,
    layers: &[SceneLayer],
    fonts: &FontCatalog,
    multiplier: f64,
) -> crate::foundation::error::PadforgeResult<Raster> {
    let out_w = (f64::from(width) * multiplier).round().max(1.0) as u32;
    let out_h = (f64::from(height) * multiplier).round().max(1.0) as u32;
    let mut raster = Raster::new(out_w, out_h, background)?;

    for layer in layers {
        match layer {
            SceneLayer::Image {
                pixels,
                transform,
                clip,
            } => {
                let t = transform.scaled(multiplier);
                draw_image(&mut raster, pixels, &t, clip.as_ref());
            }
            SceneLayer::Text {
                content,
                font_family,
                fill,
                font_size,
                transform,
            } => {
                let Some(font) = fonts.resolve(font_family) else {
                    tracing::warn!(family = %font_family, "font not in catalog, skipping text layer");
                    continue;
                };
                let t = transform.scaled(multiplier);
                // Rasterize at the effective on-screen density so glyph edges stay crisp
                // at print multipliers.
                let supersample = t.scale_x.abs().max(t.scale_y.abs()).max(0.05);
                let px = (*font_size * supersample) as f32;
                let Some(bitmap) = rasterize_text(font, content, px, *fill) else {
                    continue;
                };
                // The intrinsic box is re-measured from the bitmap so anchors track the
                // actual glyph extents.
                let t = Transform {
                    width: f64::from(bitmap.width) / supersample,
                    height: f64::from(bitmap.height) / supersample,
                    ..t
                };
                draw_image(&mut raster, &bitmap, &t, None);
            }
        }
    }

    Ok(raster)
}
