//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`calculate`] - Run the coverage calculator per site
//! - [`split`] - Raster to tile pyramid
//! - [`merge`] - Priority merge of several pyramids
//! - [`downsample`] - Coarser zoom levels from a base zoom
//! - [`config`] - Print the effective configuration

pub mod calculate;
pub mod common;
pub mod config;
pub mod downsample;
pub mod merge;
pub mod split;
