//! Rendering module: surface tree, layout, display list and rasterizer

pub mod color;
pub mod dom;
pub mod layout;
pub mod paint;
pub mod raster;

pub use dom::{Element, ElementContent, Node, Surface};
pub use raster::{Raster, RasterOptions, Rasterizer, SurfaceRasterizer};
