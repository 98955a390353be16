use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{PadforgeError, PadforgeResult};

/// Fixed authoring-canvas width in logical units. Logical height is derived from the
/// selected pad size's aspect ratio, decoupling authoring resolution from print resolution.
pub const LOGICAL_WIDTH: u32 = 960;

/// Physical pad size. The label set is closed; every size maps to a bit-exact print
/// pixel pair (~300 DPI) shared by the size selector and the high-resolution renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PadSize {
    /// 90×40 cm
    W90H40,
    /// 80×40 cm
    W80H40,
    /// 80×30 cm
    W80H30,
    /// 70×30 cm
    W70H30,
    /// 60×30 cm
    W60H30,
}

/// Print output dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrintPixels {
    pub width: u32,
    pub height: u32,
}

impl PadSize {
    pub const ALL: [Self; 5] = [
        Self::W90H40,
        Self::W80H40,
        Self::W80H30,
        Self::W70H30,
        Self::W60H30,
    ];

    pub const DEFAULT: Self = Self::W90H40;

    pub fn width_cm(self) -> u32 {
        match self {
            Self::W90H40 => 90,
            Self::W80H40 | Self::W80H30 => 80,
            Self::W70H30 => 70,
            Self::W60H30 => 60,
        }
    }

    pub fn height_cm(self) -> u32 {
        match self {
            Self::W90H40 | Self::W80H40 => 40,
            Self::W80H30 | Self::W70H30 | Self::W60H30 => 30,
        }
    }

    pub fn aspect_ratio(self) -> f64 {
        f64::from(self.width_cm()) / f64::from(self.height_cm())
    }

    /// Target production raster dimensions. This table is the single source of truth;
    /// do not derive these values from centimeters at other call sites.
    pub fn print_pixels(self) -> PrintPixels {
        let (width, height) = match self {
            Self::W90H40 => (10630, 4724),
            Self::W80H40 => (9449, 4724),
            Self::W80H30 => (9449, 3543),
            Self::W70H30 => (8268, 3543),
            Self::W60H30 => (7087, 3543),
        };
        PrintPixels { width, height }
    }

    /// Logical authoring height for this size, at the fixed 960-unit width.
    pub fn logical_height(self) -> u32 {
        (f64::from(LOGICAL_WIDTH) / self.aspect_ratio()).floor() as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::W90H40 => "90×40 cm",
            Self::W80H40 => "80×40 cm",
            Self::W80H30 => "80×30 cm",
            Self::W70H30 => "70×30 cm",
            Self::W60H30 => "60×30 cm",
        }
    }
}

impl fmt::Display for PadSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PadSize {
    type Err = PadforgeError;

    fn from_str(s: &str) -> PadforgeResult<Self> {
        PadSize::ALL
            .into_iter()
            .find(|size| size.label() == s)
            .ok_or_else(|| PadforgeError::validation(format!("unknown pad size '{s}'")))
    }
}

impl Serialize for PadSize {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for PadSize {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
