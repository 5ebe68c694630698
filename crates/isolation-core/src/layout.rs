//! Register layout descriptors for the isolation IP variants.
//!
//! The control, memory and network isolation blocks share one decouple
//! protocol but place their flags differently. Each variant is captured as a
//! constant [`IsolationLayout`] so the protocol engine is written once and the
//! per-IP differences stay visible as data.

/// Byte delta of the status register (decouple request and done bits).
pub const STATUS_REG: u32 = 0x0;
/// Byte delta of the fault register (timeout and oversize flags).
pub const FAULT_REG: u32 = 0x4;
/// Byte delta of the unified/address-write initial token register.
pub const INIT_TOKENS_REG: u32 = 0x8;
/// Byte delta of the unified/address-write bandwidth fraction register.
pub const BANDWIDTH_REG: u32 = 0xC;
/// Byte delta of the address-read initial token register.
pub const AR_INIT_TOKENS_REG: u32 = 0x10;
/// Byte delta of the address-read bandwidth fraction register.
pub const AR_BANDWIDTH_REG: u32 = 0x14;

/// Value written to the status register to request decoupling.
pub const DECOUPLE_REQUEST: u32 = 0x1;
/// Value written to the status register to release decoupling.
pub const RECOUPLE_REQUEST: u32 = 0x0;

/// A single-bit (or narrow) flag inside a register word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    /// Bits selected from the raw word.
    pub mask: u32,
    /// Right shift applied after masking.
    pub shift: u32,
}

impl FieldSpec {
    /// Creates a field descriptor.
    #[must_use]
    pub const fn new(mask: u32, shift: u32) -> Self {
        Self { mask, shift }
    }

    /// Returns `(word & mask) >> shift`.
    #[must_use]
    pub const fn extract(self, word: u32) -> u32 {
        (word & self.mask) >> self.shift
    }

    /// Returns `true` when the extracted field is non-zero.
    #[must_use]
    pub const fn is_set(self, word: u32) -> bool {
        self.extract(word) != 0
    }

    /// Returns `word` with the masked bits cleared.
    #[must_use]
    pub const fn clear(self, word: u32) -> u32 {
        word & !self.mask
    }
}

/// How a fault flag is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClearPolicy {
    /// Write `0` to the whole fault register. Clears every latched fault bit.
    WholeRegister,
    /// Read the fault register, clear only the target bit, write it back.
    ReadModifyWrite,
}

/// Which isolation IP a layout describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IsolationKind {
    /// Control-plane interface isolation.
    Control,
    /// Memory interface isolation with bandwidth throttling.
    Memory,
    /// Network interface isolation with oversize detection and throttling.
    Network,
}

/// Register layout of one isolation IP variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IsolationLayout {
    /// Variant described by this layout.
    pub kind: IsolationKind,
    /// Done bit polled in the status register after a decouple request.
    pub decouple_done: FieldSpec,
    /// Timeout flag in the fault register.
    pub timeout: FieldSpec,
    /// Oversize flag in the fault register, when the IP has one.
    pub oversize: Option<FieldSpec>,
    /// How `reset_timeout` clears the timeout flag.
    pub timeout_clear: FaultClearPolicy,
}

/// Control isolation: timeout at bit 1, whole-register clear.
pub const CONTROL_LAYOUT: IsolationLayout = IsolationLayout {
    kind: IsolationKind::Control,
    decouple_done: FieldSpec::new(0x2, 1),
    timeout: FieldSpec::new(0x2, 1),
    oversize: None,
    timeout_clear: FaultClearPolicy::WholeRegister,
};

/// Memory isolation: timeout masked at bit 1 but shifted by 3.
///
/// The mask and shift disagree, so the extracted flag always reads `0`. This
/// mirrors the shipped register accessor and is kept until the IP datasheet
/// settles which bit carries the timeout.
pub const MEMORY_LAYOUT: IsolationLayout = IsolationLayout {
    kind: IsolationKind::Memory,
    decouple_done: FieldSpec::new(0x2, 1),
    timeout: FieldSpec::new(0x2, 3),
    oversize: None,
    timeout_clear: FaultClearPolicy::WholeRegister,
};

/// Oversized-frame flag of the network isolation fault register.
pub const NETWORK_OVERSIZE: FieldSpec = FieldSpec::new(0x4, 2);

/// Network isolation: oversize at bit 2, timeout at bit 3, bitwise clears.
pub const NETWORK_LAYOUT: IsolationLayout = IsolationLayout {
    kind: IsolationKind::Network,
    decouple_done: FieldSpec::new(0x2, 1),
    timeout: FieldSpec::new(0x8, 3),
    oversize: Some(NETWORK_OVERSIZE),
    timeout_clear: FaultClearPolicy::ReadModifyWrite,
};

impl IsolationLayout {
    /// Returns the canonical layout for `kind`.
    #[must_use]
    pub const fn for_kind(kind: IsolationKind) -> &'static Self {
        match kind {
            IsolationKind::Control => &CONTROL_LAYOUT,
            IsolationKind::Memory => &MEMORY_LAYOUT,
            IsolationKind::Network => &NETWORK_LAYOUT,
        }
    }
}

/// Bandwidth throttle channel of a token-bucket equipped isolation IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ThrottleChannel {
    /// Single throttle shared by reads and writes.
    Unified,
    /// Address-write channel of a split throttle.
    AddressWrite,
    /// Address-read channel of a split throttle.
    AddressRead,
}

impl ThrottleChannel {
    /// All channels, in register order.
    pub const ALL: [Self; 3] = [Self::Unified, Self::AddressWrite, Self::AddressRead];

    /// Byte delta of this channel's initial token register.
    ///
    /// An IP is built with either a unified or a split throttle, so the
    /// address-write channel reuses the unified register slot.
    #[must_use]
    pub const fn initial_tokens_reg(self) -> u32 {
        match self {
            Self::Unified | Self::AddressWrite => INIT_TOKENS_REG,
            Self::AddressRead => AR_INIT_TOKENS_REG,
        }
    }

    /// Byte delta of this channel's bandwidth fraction register.
    #[must_use]
    pub const fn bandwidth_reg(self) -> u32 {
        match self {
            Self::Unified | Self::AddressWrite => BANDWIDTH_REG,
            Self::AddressRead => AR_BANDWIDTH_REG,
        }
    }
}

const _: () = assert_layouts();

const fn assert_layouts() {
    assert!(
        CONTROL_LAYOUT.decouple_done.mask == 0x2
            && MEMORY_LAYOUT.decouple_done.mask == 0x2
            && NETWORK_LAYOUT.decouple_done.mask == 0x2,
        "decouple done is bit 1 on every variant"
    );
    assert!(
        CONTROL_LAYOUT.oversize.is_none() && MEMORY_LAYOUT.oversize.is_none(),
        "only network isolation has an oversize flag"
    );
}
