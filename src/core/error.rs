//! Error types for the Vitrine engine

use thiserror::Error;

/// Main error type for the engine
///
/// Every variant is caught at a tier boundary and converted into an
/// orchestrator event; none of them escape to the embedding host.
#[derive(Debug, Error)]
pub enum Error {
    #[error("GPU initialization error: {0}")]
    GpuInit(String),

    #[error("resource load error: {0}")]
    ResourceLoad(String),

    #[error("render loop error: {0}")]
    RenderLoop(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
