//! Handler register-level contract coverage through the closure callback bus.

#![allow(clippy::pedantic, clippy::nursery, clippy::float_cmp)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use isolation_core::{
    CallbackBus, ControlIsolation, FixedPointFormat, MemoryIsolation, NetworkIsolation,
    RegisterBus, ThrottleChannel, ThrottleSetting, ThrottledIsolationConfig,
};
use log as _;
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const BASE: u32 = 0x4000_0000;

/// Shared view of a fake register window recorded by callback closures.
#[derive(Default)]
struct Probe {
    status_script: RefCell<Vec<u32>>,
    fault: Cell<u32>,
    words: RefCell<Vec<(u32, u32)>>,
    reads: RefCell<Vec<u32>>,
    writes: RefCell<Vec<(u32, u32)>>,
}

impl Probe {
    fn read(&self, offset: u32) -> u32 {
        self.reads.borrow_mut().push(offset);
        match offset - BASE {
            0x0 => {
                let mut script = self.status_script.borrow_mut();
                if script.is_empty() {
                    0x2
                } else {
                    script.remove(0)
                }
            }
            0x4 => self.fault.get(),
            _ => self
                .words
                .borrow()
                .iter()
                .rev()
                .find(|(at, _)| *at == offset)
                .map_or(0, |(_, value)| *value),
        }
    }

    fn write(&self, offset: u32, value: u32) {
        self.writes.borrow_mut().push((offset, value));
        if offset - BASE >= 0x8 {
            self.words.borrow_mut().push((offset, value));
        }
    }

    fn status_reads(&self) -> usize {
        self.reads.borrow().iter().filter(|at| **at == BASE).count()
    }
}

fn bus(probe: &Rc<Probe>) -> impl RegisterBus {
    let reader = Rc::clone(probe);
    let writer = Rc::clone(probe);
    CallbackBus::new(
        move |offset: u32| reader.read(offset),
        move |offset: u32, value: u32| writer.write(offset, value),
    )
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(7)]
#[case(250)]
fn decouple_waits_for_done_bit(#[case] not_ready_polls: usize) {
    let probe = Rc::new(Probe::default());
    *probe.status_script.borrow_mut() = vec![0x1; not_ready_polls]
        .into_iter()
        .chain([0x3])
        .collect();

    let mut ctrl = ControlIsolation::new(bus(&probe), BASE);
    ctrl.decouple().expect("decouple");

    assert!(probe.status_reads() >= not_ready_polls);
    assert_eq!(probe.status_reads(), not_ready_polls + 1);
    assert_eq!(*probe.writes.borrow(), vec![(BASE, 0x1)]);
}

#[test]
fn recouple_writes_zero_once_for_every_variant() {
    let format = FixedPointFormat::default();

    let probe = Rc::new(Probe::default());
    ControlIsolation::new(bus(&probe), BASE)
        .recouple()
        .expect("control");
    MemoryIsolation::new(bus(&probe), BASE, format)
        .recouple()
        .expect("memory");
    NetworkIsolation::new(bus(&probe), BASE, format)
        .recouple()
        .expect("network");

    assert_eq!(*probe.writes.borrow(), vec![(BASE, 0); 3]);
    assert!(probe.reads.borrow().is_empty());
}

#[test]
fn network_timeout_clear_preserves_oversize() {
    let probe = Rc::new(Probe::default());
    probe.fault.set(0x8 | 0x4);

    NetworkIsolation::new(bus(&probe), BASE, FixedPointFormat::default())
        .reset_timeout()
        .expect("reset");

    let writes = probe.writes.borrow();
    let (offset, value) = writes[0];
    assert_eq!(offset, BASE + 4);
    assert_ne!(value & 0x4, 0, "oversize must stay latched");
    assert_eq!(value & 0x8, 0, "timeout must be cleared");
}

#[rstest]
#[case::control(true)]
#[case::memory(false)]
fn whole_register_timeout_clear_writes_zero(#[case] control: bool) {
    let probe = Rc::new(Probe::default());
    probe.fault.set(0xFFFF_FFFF);

    if control {
        ControlIsolation::new(bus(&probe), BASE)
            .reset_timeout()
            .expect("reset");
    } else {
        MemoryIsolation::new(bus(&probe), BASE, FixedPointFormat::default())
            .reset_timeout()
            .expect("reset");
    }

    assert_eq!(*probe.writes.borrow(), vec![(BASE + 4, 0)]);
}

#[rstest]
#[case(0.0)]
#[case(0.25)]
#[case(0.5)]
#[case(0.75)]
#[case(1.0)]
fn bandwidth_fraction_round_trips_at_eight_fraction_bits(#[case] fraction: f32) {
    let format = FixedPointFormat::new(8, 8).expect("format");
    let probe = Rc::new(Probe::default());

    let mut net = NetworkIsolation::new(bus(&probe), BASE, format);
    net.set_bandwidth_fraction(fraction).expect("set");
    let read_back = net.bandwidth_fraction().expect("get");
    assert!((read_back - fraction).abs() <= 1.0 / 256.0);

    let mut mem = MemoryIsolation::new(bus(&probe), BASE, format);
    for channel in ThrottleChannel::ALL {
        mem.set_bandwidth_fraction(channel, fraction).expect("set");
        let read_back = mem.bandwidth_fraction(channel).expect("get");
        assert!((read_back - fraction).abs() <= 1.0 / 256.0);
    }
}

#[test]
fn throttle_setting_lands_in_expected_registers() {
    let probe = Rc::new(Probe::default());
    let config = ThrottledIsolationConfig {
        base_offset: BASE,
        token_integer_bits: 4,
        token_fraction_bits: 12,
    };
    let mut mem = MemoryIsolation::from_config(bus(&probe), &config).expect("config");
    mem.configure_throttle(
        ThrottleChannel::AddressRead,
        ThrottleSetting {
            initial_tokens: 512,
            bandwidth_fraction: 0.125,
        },
    )
    .expect("configure");

    assert_eq!(
        *probe.writes.borrow(),
        vec![(BASE + 0x10, 512), (BASE + 0x14, 0x200)]
    );
}

proptest! {
    #[test]
    fn flag_reads_normalize_to_their_bit(fault in any::<u32>()) {
        let probe = Rc::new(Probe::default());
        probe.fault.set(fault);

        let mut net = NetworkIsolation::new(bus(&probe), BASE, FixedPointFormat::default());
        prop_assert_eq!(net.is_oversized().expect("oversize"), fault & 0x4 != 0);
        prop_assert_eq!(net.is_timed_out().expect("timeout"), fault & 0x8 != 0);

        let mut ctrl = ControlIsolation::new(bus(&probe), BASE);
        prop_assert_eq!(ctrl.is_timed_out().expect("timeout"), fault & 0x2 != 0);

        let mut mem = MemoryIsolation::new(bus(&probe), BASE, FixedPointFormat::default());
        prop_assert!(!mem.is_timed_out().expect("timeout"));
    }

    #[test]
    fn initial_tokens_are_written_verbatim(tokens in any::<u32>()) {
        let probe = Rc::new(Probe::default());
        let mut net = NetworkIsolation::new(bus(&probe), BASE, FixedPointFormat::default());
        net.set_initial_tokens(tokens).expect("set");
        prop_assert_eq!(net.initial_tokens().expect("get"), tokens);
        let writes = probe.writes.borrow().clone();
        prop_assert_eq!(writes, vec![(BASE + 8, tokens)]);
    }
}
