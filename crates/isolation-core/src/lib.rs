//! Register drivers for SoC/FPGA hardware isolation IP blocks.
//!
//! Each handler owns a [`RegisterBus`] and a base offset and drives one IP
//! instance: control, memory or network interface isolation, or the
//! clock/reset decoupler.

/// Register access capability and closure adapter.
pub mod bus;
pub use bus::{BusError, CallbackBus, RegisterBus};

/// Error taxonomy for handler operations.
pub mod error;
pub use error::IsolationError;

/// Per-variant register layout descriptors.
pub mod layout;
pub use layout::{
    FaultClearPolicy, FieldSpec, IsolationKind, IsolationLayout, ThrottleChannel, CONTROL_LAYOUT,
    MEMORY_LAYOUT, NETWORK_LAYOUT,
};

/// Fixed-point bandwidth fraction codec.
pub mod fixed_point;
pub use fixed_point::FixedPointFormat;

/// Construction parameters.
pub mod config;
pub use config::{IsolationConfig, ThrottleSetting, ThrottledIsolationConfig};

/// Shared decouple/recouple handshake engine.
pub mod protocol;
pub use protocol::{DecoupleProtocol, FaultFlags};

/// Token-bucket throttle channel access.
pub mod throttle;
pub use throttle::Throttle;

/// Handlers for the four isolation IPs.
pub mod handlers;
pub use handlers::{ClockResetDecoupler, ControlIsolation, MemoryIsolation, NetworkIsolation};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
