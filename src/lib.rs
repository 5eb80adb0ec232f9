//! Vitrine - adaptive 3D product viewer for configurable watches

pub mod capability;
pub mod config;
pub mod core;
pub mod orchestrator;
pub mod prerender;
pub mod raster;
pub mod render;
