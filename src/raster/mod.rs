//! Software rendering tier
//!
//! A from-scratch rasterizer used when no GPU context can be obtained: a
//! fixed low-polygon watch, flat-shaded onto an RGBA8 pixel buffer with
//! back-face culling and perspective projection. The host presents the
//! buffer however it likes; this module never touches the GPU.

pub mod mesh;
pub mod renderer;
pub mod surface;

pub use renderer::SoftwareRenderer;
pub use surface::PixelSurface;
