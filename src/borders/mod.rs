//! Country boundary geometry.
//!
//! Turns administrative-boundary relations into one outer-perimeter shape per
//! country and keeps them in a name-ordered, R-tree backed collection that
//! the later stages share read-only.

mod boundary;
mod index;
mod rings;

pub use boundary::{build_country_borders, build_geometry, BuildOptions, CountryBoundary};
pub use index::CountryBorders;
pub use rings::stitch_rings;
