//! Padforge is a design-canvas customization and print-rendering engine for
//! made-to-order mousepads.
//!
//! The API is surface-oriented:
//!
//! - Open a [`Surface`] for a [`PadSize`] and compose image and text layers on it
//! - Freeze the surface into a [`DesignDocument`] and put it in a [`Cart`]
//! - Submit the cart; every line is re-rendered from its document at print resolution
//!
//! Authoring happens on a fixed-width logical canvas, so documents stay valid across pad
//! size changes and render at any multiplier without baked-in resolution.
#![forbid(unsafe_code)]

pub mod catalog;
pub mod checkout;
pub mod design;
pub mod foundation;
pub mod render;
pub mod store;
pub mod surface;

pub use crate::catalog::pricing::PriceBreakdown;
pub use crate::catalog::size::{LOGICAL_WIDTH, PadSize};
pub use crate::checkout::cart::{Cart, CartItem};
pub use crate::checkout::order::{
    CustomerInfo, LineOutcome, LineStatus, OrderBackend, OrderReceipt, submit_order,
};
pub use crate::design::document::{DesignDocument, LogoCorner, LogoState};
pub use crate::design::snapshot::SceneSnapshot;
pub use crate::design::transform::{ClipRect, Transform};
pub use crate::foundation::color::Color;
pub use crate::foundation::error::{PadforgeError, PadforgeResult};
pub use crate::render::fonts::FontCatalog;
pub use crate::render::highres::render_highres;
pub use crate::render::raster::Raster;
pub use crate::store::{AssetId, AssetStore, FsStore, MemoryStore};
pub use crate::surface::{LayerId, Surface};
