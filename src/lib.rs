//! BRC (Banner Render Compiler): headless leaderboard banner compositor.
//!
//! The [`banner::Banner`] type stamps text, a progress bar, and icon rows
//! onto a (possibly animated) base raster, chaining placement through a
//! shared cursor so callers never supply absolute coordinates twice.

pub mod banner;
pub mod builtin_font;
pub mod config;
pub mod error;
pub mod font;
pub mod frames;
pub mod geom;
pub mod icons;
