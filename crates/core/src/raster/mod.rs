//! Raster data structures, grid checks and region sampling

mod element;
mod geotransform;
mod grid;
mod region;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use region::{Region, Sample, SamplingGrid};
