//! The coprocessor command channel.
//!
//! [`Coprocessor`](Coprocessor) owns the bus while commands are being
//! appended to the coprocessor's command FIFO. It hides the differences
//! between the FIFO disciplines of the chip generations, keeps track of how
//! much space the FIFO has, repairs coprocessor faults, and batches records
//! into bursts.
//!
//! This crate doesn't carry a catalog of every coprocessor command. Commands
//! are appended by opcode, using the constants in [`opcode`](opcode), and
//! only the commands the channel itself depends on have dedicated methods.

mod command_word;
mod coprocessor;
pub mod waiter;

pub use command_word::CommandWord;
pub use coprocessor::{Coprocessor, Result};

use crate::error::ResultCode;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Coprocessor command opcodes.
pub mod opcode {
    pub const DLSTART: u32 = 0xffffff00;
    pub const SWAP: u32 = 0xffffff01;
    pub const TEXT: u32 = 0xffffff0c;
    pub const MEMCRC: u32 = 0xffffff18;
    pub const REGREAD: u32 = 0xffffff19;
    pub const MEMWRITE: u32 = 0xffffff1a;
    pub const INFLATE: u32 = 0xffffff22;
    pub const LOADIMAGE: u32 = 0xffffff24;
    pub const FLASHWRITE: u32 = 0xffffff45;
    pub const FLASHATTACH: u32 = 0xffffff49;
    pub const FLASHFAST: u32 = 0xffffff4a;
}

/// Option bits for commands that take an `options` argument.
pub mod options {
    /// `CMD_LOADIMAGE`: don't emit display list commands for the image.
    pub const NODL: u32 = 2;
    /// `CMD_LOADIMAGE`: read the image from the media FIFO rather than
    /// from data following the command.
    pub const MEDIAFIFO: u32 = 16;
    /// `CMD_LOADIMAGE`: read the image from external flash.
    pub const FLASH: u32 = 64;
    /// Text widgets: treat the string as a format string followed by
    /// argument words.
    pub const FORMAT: u32 = 4096;
}

/// The coarse state of the coprocessor, as reported by
/// [`Coprocessor::is_busy`](Coprocessor::is_busy).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoState {
    /// Everything appended so far has been executed.
    Idle,
    /// Commands are still queued, or a burst transfer still owns the bus.
    Busy,
}

impl FifoState {
    pub fn code(self) -> ResultCode {
        match self {
            Self::Idle => ResultCode::Ok,
            Self::Busy => ResultCode::Busy,
        }
    }
}

/// The values of `REG_FLASH_STATUS`.
#[derive(TryFromPrimitive, IntoPrimitive, Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FlashStatus {
    Init = 0,
    Detached = 1,
    Basic = 2,
    Full = 3,
}
