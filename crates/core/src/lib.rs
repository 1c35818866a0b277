//! # postfire core
//!
//! Core types and I/O shared by the post-fire assessment engine.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid with a no-data validity convention
//! - `GeoTransform` and `CRS`: georeferencing and grid-identity checks
//! - `Region` / `SamplingGrid`: areas of interest sampled at any resolution
//! - `Error` / `ErrorKind`: domain, configuration and precondition failures
//! - Native single-band GeoTIFF reading and writing

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, ErrorKind, Result, StageContext};
pub use raster::{GeoTransform, Raster, RasterElement, Region, SamplingGrid};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, ErrorKind, Result, StageContext};
    pub use crate::raster::{GeoTransform, Raster, RasterElement, Region, SamplingGrid};
    pub use crate::Algorithm;
}

/// Core trait for analysis operations.
///
/// Operations are pure functions that transform input data according to
/// parameters; inputs are never mutated.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
