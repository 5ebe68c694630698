//! Reprograms memory and network throttles on a simulated platform while the
//! application is isolated.
//!
//! Run with `RUST_LOG=debug` to see the handshake.

use std::error::Error;

use isolation_core::{
    ClockResetDecoupler, FixedPointFormat, IsolationKind, MemoryIsolation, NetworkIsolation,
    ThrottleChannel, ThrottleSetting,
};
use isolation_sim::{ClockResetModel, IsolationBlockModel, SimPlatform};
use log as _;
use proptest as _;
use rstest as _;
use thiserror as _;

const MEM_BASE: u32 = 0x1000;
const NET_BASE: u32 = 0x2000;
const CRD_BASE: u32 = 0x3000;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut platform = SimPlatform::new()
        .with_isolation(
            IsolationBlockModel::new(IsolationKind::Memory, MEM_BASE).with_decouple_latency(12),
        )?
        .with_isolation(
            IsolationBlockModel::new(IsolationKind::Network, NET_BASE).with_decouple_latency(3),
        )?
        .with_clock_reset(ClockResetModel::new(CRD_BASE))?;
    let format = FixedPointFormat::new(8, 8)?;

    MemoryIsolation::new(&mut platform, MEM_BASE, format).decouple()?;
    NetworkIsolation::new(&mut platform, NET_BASE, format).decouple()?;
    ClockResetDecoupler::new(&mut platform, CRD_BASE).isolate_and_hold_reset()?;

    let mut mem = MemoryIsolation::new(&mut platform, MEM_BASE, format);
    mem.configure_throttle(
        ThrottleChannel::AddressWrite,
        ThrottleSetting {
            initial_tokens: 64,
            bandwidth_fraction: 0.5,
        },
    )?;
    mem.configure_throttle(
        ThrottleChannel::AddressRead,
        ThrottleSetting {
            initial_tokens: 128,
            bandwidth_fraction: 0.3,
        },
    )?;
    for channel in ThrottleChannel::ALL {
        let setting = mem.throttle(channel).setting()?;
        println!(
            "memory {channel:?}: {} tokens, {:.4} of bandwidth",
            setting.initial_tokens, setting.bandwidth_fraction
        );
    }

    let mut net = NetworkIsolation::new(&mut platform, NET_BASE, format);
    net.configure_throttle(ThrottleSetting {
        initial_tokens: 256,
        bandwidth_fraction: 0.75,
    })?;
    let setting = net.throttle_setting()?;
    println!(
        "network: {} tokens, {:.4} of bandwidth",
        setting.initial_tokens, setting.bandwidth_fraction
    );

    ClockResetDecoupler::new(&mut platform, CRD_BASE).release_and_recouple()?;
    NetworkIsolation::new(&mut platform, NET_BASE, format).recouple()?;
    MemoryIsolation::new(&mut platform, MEM_BASE, format).recouple()?;

    println!(
        "{} register writes, {} memory status polls",
        platform.writes().len(),
        platform.reads_at(MEM_BASE)
    );
    Ok(())
}
