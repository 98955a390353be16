use serde::{Deserialize, Serialize};

/// Base price of a customized pad, in guaraníes.
pub const BASE_PRICE: u64 = 200_000;
/// Surcharge for removing the printed logo.
pub const EXTRA_LOGO_REMOVAL: u64 = 30_000;
/// Surcharge for the RGB edge lighting option.
pub const EXTRA_RGB: u64 = 50_000;

/// Deterministic price breakdown for one design. Recomputed on every toggle change;
/// a stored breakdown is a cache, never the source of truth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base: u64,
    pub logo_removal_fee: u64,
    pub rgb_fee: u64,
    pub total: u64,
}

impl PriceBreakdown {
    pub fn compute(logo_removed: bool, rgb: bool) -> Self {
        let logo_removal_fee = if logo_removed { EXTRA_LOGO_REMOVAL } else { 0 };
        let rgb_fee = if rgb { EXTRA_RGB } else { 0 };
        Self {
            base: BASE_PRICE,
            logo_removal_fee,
            rgb_fee,
            total: BASE_PRICE + logo_removal_fee + rgb_fee,
        }
    }
}

/// Total price as a pure function of the two toggles.
pub fn total(base: u64, logo_removed: bool, rgb: bool) -> u64 {
    base + if logo_removed { EXTRA_LOGO_REMOVAL } else { 0 } + if rgb { EXTRA_RGB } else { 0 }
}
