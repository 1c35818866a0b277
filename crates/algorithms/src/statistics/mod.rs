//! Zonal reporting over a region at a sampling resolution
//!
//! - **zonal**: per-class pixel counts, areas and percentages; min/max and
//!   the `[0, 100]` rescale of continuous results
//! - **ranges**: true ground area inside arbitrary open value ranges
//! - **cell_area**: planar or spheroidal area of one sample

mod cell_area;
mod ranges;
mod zonal;

pub use cell_area::{cell_area, CellAreaModel};
pub use ranges::{area_in_ranges, total_valid_area, AreaRange, RangeArea};
pub use zonal::{
    class_statistics, min_max, min_max_normalize, percentage, rescale_percent, ClassRecord, ClassStatistics,
};
