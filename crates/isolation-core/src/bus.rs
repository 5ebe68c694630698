//! Register access capability injected into every isolation handler.
//!
//! Handlers never touch hardware except through a [`RegisterBus`]. Offsets are
//! byte addresses and every access moves one 32-bit word.

use thiserror::Error;

/// Transport failure reported by a register bus adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum BusError {
    /// The adapter could not complete a word read.
    #[error("register read failed at offset {offset:#010x}")]
    ReadFailed {
        /// Byte offset of the failed read.
        offset: u32,
    },
    /// The adapter could not complete a word write.
    #[error("register write failed at offset {offset:#010x}")]
    WriteFailed {
        /// Byte offset of the failed write.
        offset: u32,
    },
    /// No device decodes the requested offset.
    #[error("no register mapped at offset {offset:#010x}")]
    Unmapped {
        /// Byte offset that did not decode.
        offset: u32,
    },
}

/// Word-addressed register read/write contract consumed by the handlers.
pub trait RegisterBus {
    /// Reads the 32-bit word at byte offset `offset`.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the adapter cannot complete the read.
    fn read32(&mut self, offset: u32) -> Result<u32, BusError>;

    /// Writes a 32-bit word at byte offset `offset`.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the adapter cannot complete the write.
    fn write32(&mut self, offset: u32, value: u32) -> Result<(), BusError>;
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read32(&mut self, offset: u32) -> Result<u32, BusError> {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: u32, value: u32) -> Result<(), BusError> {
        (**self).write32(offset, value)
    }
}

/// Adapts an infallible read/write closure pair into a [`RegisterBus`].
///
/// This is the shape of a typical MMIO or debug-probe transport: one
/// function returning the word at an offset and one storing a word.
pub struct CallbackBus<R, W> {
    read: R,
    write: W,
}

impl<R, W> CallbackBus<R, W>
where
    R: FnMut(u32) -> u32,
    W: FnMut(u32, u32),
{
    /// Binds the read and write callbacks.
    #[must_use]
    pub const fn new(read: R, write: W) -> Self {
        Self { read, write }
    }

    /// Releases the callbacks.
    #[must_use]
    pub fn into_parts(self) -> (R, W) {
        (self.read, self.write)
    }
}

impl<R, W> RegisterBus for CallbackBus<R, W>
where
    R: FnMut(u32) -> u32,
    W: FnMut(u32, u32),
{
    fn read32(&mut self, offset: u32) -> Result<u32, BusError> {
        Ok((self.read)(offset))
    }

    fn write32(&mut self, offset: u32, value: u32) -> Result<(), BusError> {
        (self.write)(offset, value);
        Ok(())
    }
}

impl<R, W> core::fmt::Debug for CallbackBus<R, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallbackBus").finish_non_exhaustive()
    }
}
