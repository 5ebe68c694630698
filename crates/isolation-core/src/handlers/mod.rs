//! Per-IP isolation handlers.

/// Clock and reset decoupler pokes.
pub mod clock_reset;
/// Control-plane interface isolation.
pub mod control;
/// Memory interface isolation with split or unified throttling.
pub mod memory;
/// Network interface isolation with oversize detection.
pub mod network;

pub use clock_reset::{ClockResetDecoupler, CLOCK_DECOUPLE_REG, RESET_REG};
pub use control::ControlIsolation;
pub use memory::MemoryIsolation;
pub use network::NetworkIsolation;
