//! Behavioral register models of the isolation IP blocks.
//!
//! The models decode the same byte offsets as the hardware and implement
//! [`isolation_core::RegisterBus`], so the real handlers can be driven against
//! them without a board.

/// Control, memory and network isolation block model.
pub mod block;
pub use block::{IsolationBlockModel, IsolationBlockState};

/// Clock/reset decoupler model.
pub mod clock_reset;
pub use clock_reset::{ClockResetEvent, ClockResetModel};

/// Composite platform bus.
pub mod platform;
pub use platform::{BusAccess, SimDevice, SimError, SimPlatform};

#[cfg(test)]
use env_logger as _;
#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
