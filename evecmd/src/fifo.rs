//! The two disciplines for appending to the coprocessor's command FIFO.
//!
//! Every EVE generation has the same 4096-byte command ring in `RAM_CMD`,
//! but they differ in who keeps track of where the next command goes:
//!
//! - [`Direct`](Direct): the FT81x generation and later accept commands
//!   through `REG_CMDB_WRITE`, advancing the write pointer on the device as
//!   bytes arrive and reporting the free space in `REG_CMDB_SPACE`.
//! - [`Tracked`](Tracked): on the FT80x the host keeps a shadow of the write
//!   offset, addresses each write at `RAM_CMD + offset`, and publishes the
//!   offset through `REG_CMD_WRITE` to have the coprocessor execute it.
//!
//! [`Model::Fifo`](crate::models::Model::Fifo) selects the discipline for
//! each generation.

use crate::error::{interface_result, Error};
use crate::low_level::LowLevel;
use crate::memory::MemoryRegion;
use crate::models::Model;
use crate::registers::Register;
use crate::transport::Transport;

/// The size of the command ring in bytes.
pub const FIFO_SIZE: u32 = 4096;

/// Mask for offsets into the command ring.
pub const FIFO_MASK: u32 = FIFO_SIZE - 1;

/// The free space reported for an empty ring. The coprocessor always keeps
/// one word free so that a full ring can be told apart from an empty one.
pub const FIFO_EMPTY_SPACE: u32 = FIFO_SIZE - 4;

/// What a single look at the command FIFO status registers revealed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoStatus {
    /// The coprocessor has executed everything it was given.
    Idle,
    /// Commands are still pending; `free` bytes can be appended right now.
    Busy { free: u32 },
    /// The status registers show the coprocessor fault pattern.
    Fault,
}

/// The interface shared by the command FIFO disciplines.
///
/// Implementations only deal with addressing and pointer bookkeeping; the
/// chip-select windows that carry the command bytes are opened and closed
/// by [`Coprocessor`](crate::commands::Coprocessor).
pub trait CommandFifo<M: Model>: Sized + Default + core::fmt::Debug {
    /// Returns the absolute address the next command byte must be written
    /// to, or `None` if the model lacks the registers this discipline needs.
    fn write_addr(&self) -> Option<u32>;

    /// The number of bytes that can be written at `write_addr` before the
    /// destination must be re-addressed.
    fn contiguous(&self) -> u32;

    /// Records that `n` bytes were written at `write_addr`.
    fn advance(&mut self, n: u32);

    /// Makes everything written so far eligible for execution.
    fn submit<T: Transport>(&mut self, ll: &mut LowLevel<M, T>) -> Result<(), Error<T::Error>>;

    /// Reads the status registers.
    fn status<T: Transport>(&mut self, ll: &mut LowLevel<M, T>)
        -> Result<FifoStatus, Error<T::Error>>;

    /// Returns the current write offset into the command ring.
    fn write_offset<T: Transport>(&self, ll: &mut LowLevel<M, T>) -> Result<u32, Error<T::Error>>;

    /// Re-reads any host-side state from the device.
    fn synchronize<T: Transport>(&mut self, ll: &mut LowLevel<M, T>)
        -> Result<(), Error<T::Error>>;

    /// Forgets all host-side state, after the device pointers were zeroed.
    fn reset(&mut self);
}

fn reg<M: Model, E>(reg: Register) -> Result<u32, Error<E>> {
    M::register(reg).ok_or(Error::Unsupported)
}

/// The device-tracked discipline used by FT81x and later.
///
/// All writes target `REG_CMDB_WRITE`, which never needs re-addressing, and
/// the coprocessor starts executing each command as soon as it arrives.
#[derive(Clone, Copy, Default, Debug)]
pub struct Direct;

impl<M: Model> CommandFifo<M> for Direct {
    fn write_addr(&self) -> Option<u32> {
        M::register(Register::CMDB_WRITE)
    }

    fn contiguous(&self) -> u32 {
        u32::MAX
    }

    fn advance(&mut self, _n: u32) {}

    fn submit<T: Transport>(&mut self, _ll: &mut LowLevel<M, T>) -> Result<(), Error<T::Error>> {
        Ok(())
    }

    fn status<T: Transport>(
        &mut self,
        ll: &mut LowLevel<M, T>,
    ) -> Result<FifoStatus, Error<T::Error>> {
        let space = interface_result(ll.rd16(reg::<M, T::Error>(Register::CMDB_SPACE)?))? as u32;
        Ok(if space & 0b11 != 0 {
            // An unaligned amount of space indicates a coprocessor fault.
            FifoStatus::Fault
        } else if space == FIFO_EMPTY_SPACE {
            FifoStatus::Idle
        } else {
            FifoStatus::Busy { free: space }
        })
    }

    fn write_offset<T: Transport>(&self, ll: &mut LowLevel<M, T>) -> Result<u32, Error<T::Error>> {
        let wp = interface_result(ll.rd16(reg::<M, T::Error>(Register::CMD_WRITE)?))?;
        Ok(wp as u32 & FIFO_MASK)
    }

    fn synchronize<T: Transport>(
        &mut self,
        _ll: &mut LowLevel<M, T>,
    ) -> Result<(), Error<T::Error>> {
        Ok(())
    }

    fn reset(&mut self) {}
}

/// The host-tracked discipline used by the FT80x.
///
/// The host owns the write offset. Writes land at `RAM_CMD + offset` and the
/// offset advances by the bytes written, masked to the ring size; a write
/// that would run past the end of the ring has to be split and re-addressed
/// at offset zero. Nothing executes until `submit` publishes the offset to
/// `REG_CMD_WRITE`.
#[derive(Clone, Copy, Default, Debug)]
pub struct Tracked {
    offset: u32,
}

impl Tracked {
    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl<M: Model> CommandFifo<M> for Tracked {
    fn write_addr(&self) -> Option<u32> {
        Some(<M::CommandMem as MemoryRegion>::BASE_ADDR + self.offset)
    }

    fn contiguous(&self) -> u32 {
        FIFO_SIZE - self.offset
    }

    fn advance(&mut self, n: u32) {
        self.offset = (self.offset + n) & FIFO_MASK;
    }

    fn submit<T: Transport>(&mut self, ll: &mut LowLevel<M, T>) -> Result<(), Error<T::Error>> {
        interface_result(ll.wr16(reg::<M, T::Error>(Register::CMD_WRITE)?, self.offset as u16))
    }

    fn status<T: Transport>(
        &mut self,
        ll: &mut LowLevel<M, T>,
    ) -> Result<FifoStatus, Error<T::Error>> {
        let rp = interface_result(ll.rd16(reg::<M, T::Error>(Register::CMD_READ)?))? as u32;
        Ok(if rp == 0xfff {
            FifoStatus::Fault
        } else if rp == self.offset {
            FifoStatus::Idle
        } else {
            let used = self.offset.wrapping_sub(rp) & FIFO_MASK;
            FifoStatus::Busy {
                free: FIFO_EMPTY_SPACE - used,
            }
        })
    }

    fn write_offset<T: Transport>(&self, _ll: &mut LowLevel<M, T>) -> Result<u32, Error<T::Error>> {
        Ok(self.offset)
    }

    fn synchronize<T: Transport>(
        &mut self,
        ll: &mut LowLevel<M, T>,
    ) -> Result<(), Error<T::Error>> {
        let wp = interface_result(ll.rd16(reg::<M, T::Error>(Register::CMD_WRITE)?))?;
        self.offset = wp as u32 & FIFO_MASK;
        Ok(())
    }

    fn reset(&mut self) {
        self.offset = 0;
    }
}
