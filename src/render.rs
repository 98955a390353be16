pub mod fonts;
pub mod highres;
pub mod raster;
pub mod scene;

pub use fonts::FontCatalog;
pub use highres::{preview_multiplier, print_multiplier, render_highres};
pub use raster::{PreparedImage, Raster, decode_image};
pub use scene::{SceneLayer, render_scene};
