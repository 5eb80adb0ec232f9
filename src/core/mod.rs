//! Core utilities: errors, logging, input tracking, frame timing

pub mod error;
pub mod input;
pub mod logging;
pub mod time;

pub use error::Error;
