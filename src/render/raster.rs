//! CPU raster surface and image drawing.
//!
//! The crate-wide pixel contract is premultiplied RGBA8, row-major, tightly packed:
//! decoded images are premultiplied at ingest, compositing assumes premultiplied alpha,
//! and PNG export converts back to straight alpha at the very end.

use std::io::Cursor;
use std::sync::Arc;

use anyhow::Context as _;
use kurbo::Point;

use crate::design::transform::{ClipRect, Transform};
use crate::foundation::color::Color;
use crate::foundation::error::{PadforgeError, PadforgeResult};

/// Decoded raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// 1×1 fully transparent stand-in for an unresolvable image reference.
    pub fn placeholder() -> Self {
        Self {
            width: 1,
            height: 1,
            rgba8_premul: Arc::new(vec![0, 0, 0, 0]),
        }
    }

    pub fn native_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

pub fn decode_image(bytes: &[u8]) -> PadforgeResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

fn encode_premul_png(width: u32, height: u32, premul: &[u8]) -> PadforgeResult<Vec<u8>> {
    let mut straight = premul.to_vec();
    for px in straight.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((u16::from(px[0]) * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((u16::from(px[1]) * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((u16::from(px[2]) * 255 + a / 2) / a).min(255) as u8;
    }
    let img = image::RgbaImage::from_raw(width, height, straight)
        .ok_or_else(|| PadforgeError::render("pixel buffer does not match dimensions"))?;
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(out)
}

/// Hard ceiling on output allocation (pixels). The multiplier policies already bound
/// output size; this guard turns a runaway request into a recoverable render error so the
/// retry ladder can step down instead of aborting the process.
const MAX_SURFACE_PIXELS: u64 = 256 * 1024 * 1024;

/// Mutable render target, premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32, background: Color) -> PadforgeResult<Self> {
        if width == 0 || height == 0 {
            return Err(PadforgeError::render("raster dimensions must be > 0"));
        }
        if u64::from(width) * u64::from(height) > MAX_SURFACE_PIXELS {
            return Err(PadforgeError::render(format!(
                "raster {width}x{height} exceeds the surface pixel budget"
            )));
        }
        let px = background.to_premul();
        let mut data = vec![0u8; width as usize * height as usize * 4];
        for chunk in data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn encode_png(&self) -> PadforgeResult<Vec<u8>> {
        encode_premul_png(self.width, self.height, &self.data)
    }

    #[cfg(test)]
    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    fn blend_pixel(&mut self, x: u32, y: u32, src: [u8; 4]) {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let dst = [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ];
        let out = over(dst, src);
        self.data[i..i + 4].copy_from_slice(&out);
    }
}

/// Source-over blending on premultiplied RGBA8.
pub fn over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        let dc = ((u16::from(dst[i]) * inv + 127) / 255) as u8;
        out[i] = src[i].saturating_add(dc);
    }
    out
}

/// Draw a prepared image through a layer transform, inverse-mapping each covered output
/// pixel back into source space with bilinear sampling. An optional clip rectangle in
/// layer-local coordinates discards samples outside the crop.
pub fn draw_image(
    dst: &mut Raster,
    img: &PreparedImage,
    transform: &Transform,
    clip: Option<&ClipRect>,
) {
    let w = f64::from(img.width);
    let h = f64::from(img.height);
    if w <= 0.0 || h <= 0.0 {
        return;
    }

    // The transform maps the intrinsic layer box; the pixel grid may differ (text bitmaps
    // are rasterized supersampled), so map source pixels through the intrinsic box scale.
    let affine = transform.to_affine();
    let Some(inv) = invertible(affine) else {
        // Degenerate scale; nothing to draw.
        return;
    };

    let corners = [
        affine * Point::new(0.0, 0.0),
        affine * Point::new(transform.width, 0.0),
        affine * Point::new(0.0, transform.height),
        affine * Point::new(transform.width, transform.height),
    ];
    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    let x0 = min_x.floor().max(0.0) as u32;
    let y0 = min_y.floor().max(0.0) as u32;
    let x1 = (max_x.ceil().min(f64::from(dst.width))) as u32;
    let y1 = (max_y.ceil().min(f64::from(dst.height))) as u32;

    // Intrinsic box -> pixel grid scale (1.0 for plain images).
    let px_scale_x = w / transform.width.max(f64::EPSILON);
    let px_scale_y = h / transform.height.max(f64::EPSILON);

    for y in y0..y1 {
        for x in x0..x1 {
            let local = inv * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if local.x < 0.0 || local.x >= transform.width || local.y < 0.0 || local.y >= transform.height {
                continue;
            }
            if let Some(clip) = clip
                && !clip.contains(local.x, local.y)
            {
                continue;
            }
            let src = sample_bilinear(img, local.x * px_scale_x - 0.5, local.y * px_scale_y - 0.5);
            dst.blend_pixel(x, y, src);
        }
    }
}

fn invertible(affine: kurbo::Affine) -> Option<kurbo::Affine> {
    if affine.determinant().abs() < 1e-12 {
        None
    } else {
        Some(affine.inverse())
    }
}

fn sample_bilinear(img: &PreparedImage, x: f64, y: f64) -> [u8; 4] {
    let max_x = (img.width - 1) as f64;
    let max_y = (img.height - 1) as f64;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(img.width - 1);
    let y1 = (y0 + 1).min(img.height - 1);
    let fx = x - f64::from(x0);
    let fy = y - f64::from(y0);

    let at = |px: u32, py: u32| -> [u8; 4] {
        let i = (py as usize * img.width as usize + px as usize) * 4;
        let d = &img.rgba8_premul;
        [d[i], d[i + 1], d[i + 2], d[i + 3]]
    };

    let (p00, p10, p01, p11) = (at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1));
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
        let bot = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
        out[c] = (top * (1.0 - fy) + bot * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}
