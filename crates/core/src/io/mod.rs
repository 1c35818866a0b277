//! Reading and writing single-band GeoTIFF layers
//!
//! The analysis engine never touches storage; this module exists for the
//! command-line front end and for tests that round-trip layers.

mod geotiff;

pub use geotiff::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer};
