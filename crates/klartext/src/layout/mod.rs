//! Spatial layout reconstruction.
//!
//! Recognition engines return a flat bag of positioned words; this module
//! rebuilds structure from geometry alone. [`lines`] clusters words into
//! reading lines, [`tables`] finds runs of lines with consistent word
//! counts and promotes them to tables.

pub mod lines;
pub mod tables;

pub use lines::{Line, group_into_lines};
pub use tables::detect_tables;
