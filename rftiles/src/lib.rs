//! rftiles - Slippy-map tile pyramids from radio coverage rasters
//!
//! This library turns georeferenced coverage rasters produced by an external
//! RF propagation calculator into `<root>/<zoom>/<x>/<y>.png` tile pyramids,
//! merges pyramids from several transmitter sites with a signal-priority
//! compositing rule, and synthesizes coarser zoom levels from a populated
//! base zoom.
//!
//! # Pipeline
//!
//! ```text
//!  site.qth ──► calculator ──► site.ppm + site.geo
//!                                   │
//!                                   ▼
//!                              split (per site)
//!                                   │
//!                                   ▼
//!                    merge (all sites, priority table)
//!                                   │
//!                                   ▼
//!                     downsample (coarser zoom levels)
//! ```

pub mod composite;
pub mod config;
pub mod coord;
pub mod downsample;
pub mod executor;
pub mod georef;
pub mod logging;
pub mod merge;
pub mod priority;
pub mod site;
pub mod split;
pub mod tile;
pub mod zoom;

/// Crate version, as reported by the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
