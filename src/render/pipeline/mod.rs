//! wgpu pipelines for the GPU tier

pub mod composite;
pub mod pbr;

pub use composite::CompositePipeline;
pub use pbr::{PartUniform, PbrPipeline};
