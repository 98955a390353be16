//! Font loading and glyph rasterization.
//!
//! Text layers are rasterized into a local premultiplied bitmap (supersampled for the
//! output multiplier) and then drawn through the same transform path as image layers.

use std::collections::HashMap;
use std::path::Path;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use anyhow::Context as _;

use crate::foundation::color::Color;
use crate::foundation::error::PadforgeResult;
use crate::render::raster::PreparedImage;

/// Family-name keyed set of parsed fonts.
#[derive(Default)]
pub struct FontCatalog {
    fonts: HashMap<String, FontArc>,
}

impl FontCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, family: impl Into<String>, bytes: Vec<u8>) -> PadforgeResult<()> {
        let family = family.into();
        let font = FontArc::try_from_vec(bytes)
            .with_context(|| format!("parse font for family '{family}'"))?;
        self.fonts.insert(family, font);
        Ok(())
    }

    /// Load every `.ttf`/`.otf` in a directory, keyed by file stem. Unparseable files are
    /// logged and skipped. Returns the number of fonts loaded.
    pub fn load_dir(&mut self, dir: &Path) -> PadforgeResult<usize> {
        let mut loaded = 0usize;
        let entries =
            std::fs::read_dir(dir).with_context(|| format!("read font dir {}", dir.display()))?;
        for entry in entries {
            let path = entry.context("read font dir entry")?.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !ext.eq_ignore_ascii_case("ttf") && !ext.eq_ignore_ascii_case("otf") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let bytes = std::fs::read(&path)
                .with_context(|| format!("read font file {}", path.display()))?;
            match self.register(stem.to_string(), bytes) {
                Ok(()) => loaded += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unparseable font");
                }
            }
        }
        Ok(loaded)
    }

    pub fn resolve(&self, family: &str) -> Option<&FontArc> {
        self.fonts.get(family)
    }

    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.fonts.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// Rasterize a text run at `px` pixels per em into a tight premultiplied bitmap.
/// Newlines break lines; the baseline grid uses the font's own line height.
/// Returns `None` for content that produces no visible geometry.
pub fn rasterize_text(font: &FontArc, content: &str, px: f32, fill: Color) -> Option<PreparedImage> {
    if !px.is_finite() || px <= 0.0 {
        return None;
    }
    let scaled = font.as_scaled(PxScale::from(px));
    let ascent = scaled.ascent();
    let line_height = ascent - scaled.descent() + scaled.line_gap();

    let lines: Vec<&str> = content.split('\n').collect();
    let mut max_width = 0f32;
    for line in &lines {
        let mut w = 0f32;
        let mut prev = None;
        for ch in line.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = prev {
                w += scaled.kern(prev, id);
            }
            w += scaled.h_advance(id);
            prev = Some(id);
        }
        max_width = max_width.max(w);
    }

    let width = max_width.ceil() as u32;
    let height = (line_height * lines.len() as f32).ceil() as u32;
    if width == 0 || height == 0 {
        return None;
    }

    let mut buf = vec![0u8; width as usize * height as usize * 4];
    for (i, line) in lines.iter().enumerate() {
        let baseline = ascent + line_height * i as f32;
        let mut caret = 0f32;
        let mut prev = None;
        for ch in line.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = prev {
                caret += scaled.kern(prev, id);
            }
            let mut glyph = scaled.scaled_glyph(ch);
            glyph.position = point(caret, baseline);
            caret += scaled.h_advance(id);
            prev = Some(id);

            let Some(outline) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outline.px_bounds();
            outline.draw(|gx, gy, coverage| {
                let x = bounds.min.x as i64 + i64::from(gx);
                let y = bounds.min.y as i64 + i64::from(gy);
                if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
                    return;
                }
                let a = (coverage * f32::from(fill.a) / 255.0).clamp(0.0, 1.0);
                let src = [
                    (f32::from(fill.r) * a).round() as u8,
                    (f32::from(fill.g) * a).round() as u8,
                    (f32::from(fill.b) * a).round() as u8,
                    (a * 255.0).round() as u8,
                ];
                let idx = (y as usize * width as usize + x as usize) * 4;
                let dst = [buf[idx], buf[idx + 1], buf[idx + 2], buf[idx + 3]];
                let out = crate::render::raster::over(dst, src);
                buf[idx..idx + 4].copy_from_slice(&out);
            });
        }
    }

    Some(PreparedImage {
        width,
        height,
        rgba8_premul: std::sync::Arc::new(buf),
    })
}
