//! Device capability detection and render-strategy selection

pub mod probe;

pub use probe::{
    CapabilityProbe, DeviceCapabilities, ProbeSignals, Strategy, Tier, capabilities,
};
