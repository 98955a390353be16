//! Branding logo sizing and corner placement.

use crate::design::document::LogoCorner;

/// Maximum logo footprint in logical canvas units.
pub const LOGO_MAX_WIDTH: f64 = 180.0;
pub const LOGO_MAX_HEIGHT: f64 = 80.0;

/// Inset between the logo and its canvas corner, in logical units.
pub const CORNER_PAD: f64 = 12.0;

/// Uniform downscale that fits a logo of the given native size inside the
/// 180×80 footprint. Never upscales.
pub fn fit_scale(native_w: f64, native_h: f64) -> f64 {
    if native_w <= 0.0 || native_h <= 0.0 {
        return 1.0;
    }
    (LOGO_MAX_WIDTH / native_w)
        .min(LOGO_MAX_HEIGHT / native_h)
        .min(1.0)
}

/// Top-left position for a logo of scaled size `(w, h)` pinned to `corner` of a
/// `canvas_w`×`canvas_h` canvas, inset by [`CORNER_PAD`].
pub fn corner_position(
    canvas_w: f64,
    canvas_h: f64,
    w: f64,
    h: f64,
    corner: LogoCorner,
) -> (f64, f64) {
    let left = match corner {
        LogoCorner::TopLeft | LogoCorner::BottomLeft => CORNER_PAD,
        LogoCorner::TopRight | LogoCorner::BottomRight => canvas_w - w - CORNER_PAD,
    };
    let top = match corner {
        LogoCorner::TopLeft | LogoCorner::TopRight => CORNER_PAD,
        LogoCorner::BottomLeft | LogoCorner::BottomRight => canvas_h - h - CORNER_PAD,
    };
    (left, top)
}
