pub mod pricing;
pub mod size;
