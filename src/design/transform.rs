use kurbo::Affine;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{PadforgeError, PadforgeResult};

/// Horizontal anchor the `left` coordinate refers to, as a fraction of layer width.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginX {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical anchor the `top` coordinate refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginY {
    #[default]
    Top,
    Center,
    Bottom,
}

impl OriginX {
    pub fn fraction(self) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

impl OriginY {
    pub fn fraction(self) -> f64 {
        match self {
            Self::Top => 0.0,
            Self::Center => 0.5,
            Self::Bottom => 1.0,
        }
    }
}

/// Placement of one layer in logical canvas coordinates.
///
/// `left`/`top` position the origin anchor; `width`/`height` are the layer's intrinsic
/// (unscaled) dimensions; rotation is in degrees about the anchor. The shape mirrors what
/// the interactive surface records at serialization time, so a snapshot transform applies
/// unmodified when the scene is rebuilt.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub left: f64,
    pub top: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub angle_deg: f64,
    #[serde(default)]
    pub origin_x: OriginX,
    #[serde(default)]
    pub origin_y: OriginY,
    pub width: f64,
    pub height: f64,
}

impl Transform {
    /// Unrotated, unscaled placement with a top-left anchor.
    pub fn at(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            scale_x: 1.0,
            scale_y: 1.0,
            angle_deg: 0.0,
            origin_x: OriginX::Left,
            origin_y: OriginY::Top,
            width,
            height,
        }
    }

    /// Center-anchored placement, the form `add_image` uses.
    pub fn centered(cx: f64, cy: f64, width: f64, height: f64, scale: f64) -> Self {
        Self {
            left: cx,
            top: cy,
            scale_x: scale,
            scale_y: scale,
            angle_deg: 0.0,
            origin_x: OriginX::Center,
            origin_y: OriginY::Center,
            width,
            height,
        }
    }

    pub fn scaled_width(&self) -> f64 {
        self.width * self.scale_x
    }

    pub fn scaled_height(&self) -> f64 {
        self.height * self.scale_y
    }

    /// Map layer-local coordinates `[0,width)×[0,height)` into canvas coordinates.
    pub fn to_affine(&self) -> Affine {
        let ox = self.origin_x.fraction() * self.width;
        let oy = self.origin_y.fraction() * self.height;
        Affine::translate((self.left, self.top))
            * Affine::rotate(self.angle_deg.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
            * Affine::translate((-ox, -oy))
    }

    /// Pre-scale for high-resolution output: positions and scale factors are multiplied,
    /// intrinsic dimensions stay untouched. Scaling position and scale directly (instead of
    /// a renderer-level output multiplier) keeps the exported raster aligned with the
    /// authored layout.
    pub fn scaled(&self, multiplier: f64) -> Self {
        Self {
            left: self.left * multiplier,
            top: self.top * multiplier,
            scale_x: self.scale_x * multiplier,
            scale_y: self.scale_y * multiplier,
            ..*self
        }
    }

    pub fn validate(&self) -> PadforgeResult<()> {
        for (name, v) in [
            ("left", self.left),
            ("top", self.top),
            ("scale_x", self.scale_x),
            ("scale_y", self.scale_y),
            ("angle_deg", self.angle_deg),
            ("width", self.width),
            ("height", self.height),
        ] {
            if !v.is_finite() {
                return Err(PadforgeError::validation(format!(
                    "transform {name} must be finite, got {v}"
                )));
            }
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(PadforgeError::validation(
                "transform width/height must be >= 0",
            ));
        }
        Ok(())
    }
}

/// Axis-aligned crop rectangle in layer-local (unscaled) coordinates. Samples outside the
/// rectangle are discarded at render time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ClipRect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.left + self.width && y >= self.top && y < self.top + self.height
    }

    pub fn validate(&self) -> PadforgeResult<()> {
        if !(self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite())
        {
            return Err(PadforgeError::validation("clip rect must be finite"));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(PadforgeError::validation("clip rect must have positive size"));
        }
        Ok(())
    }
}
