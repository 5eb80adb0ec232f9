//! GPU rendering tier
//!
//! Owns the wgpu context, the signature-keyed resource cache, the watch
//! model, and the forward PBR + composite pipelines. [`session`] ties them
//! together into a render loop the orchestrator can start and tear down.

pub mod cache;
pub mod camera;
pub mod context;
pub mod environment;
pub mod geometry;
pub mod material;
pub mod model;
pub mod pipeline;
pub mod post;
pub mod session;
pub mod update;

pub use cache::{ResourceCache, SignatureCache};
pub use context::{GpuContext, OffscreenContext};
pub use session::RenderSession;
