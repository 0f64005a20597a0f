//! Error and result-code types returned by different components in this
//! crate.

use num_enum::{FromPrimitive, IntoPrimitive};

/// The general error type for everything above the
/// [`Transport`](crate::transport::Transport) layer.
///
/// Coprocessor faults are deliberately absent: they are repaired inside
/// [`Coprocessor::is_busy`](crate::commands::Coprocessor::is_busy), and the
/// only trace they leave is the loss of whatever was queued at the time.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error<E> {
    /// Errors encountered when sending or receiving data from the EVE chip.
    ///
    /// The wrapped error type for this variant is the error type for whichever
    /// [`Transport`](crate::transport::Transport) implementation you are using.
    #[error("transport error")]
    Transport(E),

    /// The chip never reported its identification value during bring-up.
    #[error("timed out waiting for the chip ID")]
    ChipIdTimeout,

    /// The chip's engines never left reset during bring-up.
    #[error("timed out waiting for reset to complete")]
    ResetTimeout,

    /// The external flash stayed in its initial state.
    #[error("flash is still initializing")]
    FlashStatusInit,

    /// The external flash could not be attached.
    #[error("flash is detached")]
    FlashStatusDetached,

    /// `CMD_FLASHFAST` failed to put the flash in full-speed mode.
    #[error("flash could not enter full mode: {0}")]
    FlashFast(FlashFastError),

    /// A bounded [`Waiter`](crate::commands::waiter::Waiter) gave up.
    #[error("timed out waiting for the coprocessor")]
    Timeout,

    /// The operation would touch the bus while a burst is recording.
    #[error("a burst is already active")]
    BurstActive,

    /// `end_burst` was called without a matching `begin_burst`.
    #[error("no burst is active")]
    BurstInactive,

    /// The burst buffer, or the command FIFO space known at the start of
    /// the burst, is too small for what was appended.
    #[error("burst buffer overflow")]
    BurstOverflow,

    /// A format message carried more arguments than its builder can hold.
    #[error("too many format arguments")]
    TooManyArguments,

    /// Indicates that the requested operation isn't supported for the
    /// current model or burst mode.
    ///
    /// The crate API is designed to handle certain model differences at
    /// compile time within the type system, but for reasons of pragmatism
    /// some differences are handled only dynamically.
    #[error("operation not supported")]
    Unsupported,
}

/// Failure codes returned by `CMD_FLASHFAST`.
#[derive(FromPrimitive, IntoPrimitive, Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum FlashFastError {
    NotSupported = 0xe001,
    NoHeader = 0xe002,
    SectorZero = 0xe003,
    BlobMismatch = 0xe004,
    SpeedTest = 0xe005,
    /// Any other nonzero code.
    #[num_enum(default)]
    Unknown = 0xffff,
}

impl core::fmt::Display for FlashFastError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::NotSupported => "not supported",
            Self::NoHeader => "no header",
            Self::SectorZero => "sector 0 failure",
            Self::BlobMismatch => "blob mismatch",
            Self::SpeedTest => "speed test failure",
            Self::Unknown => "unrecognized result",
        })
    }
}

/// The numeric result codes used by C-style EVE driver APIs, for callers
/// that need to report outcomes across such a boundary.
#[derive(IntoPrimitive, Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ResultCode {
    Ok = 0,
    Fail = 1,
    Busy = 2,
    ChipIdTimeout = 3,
    ResetTimeout = 4,
    FlashStatusInit = 5,
    FlashStatusDetached = 6,
    FlashNotSupported = 7,
    FlashNoHeader = 8,
    FlashSectorZero = 9,
    FlashBlobMismatch = 10,
    FlashSpeedTest = 11,
}

impl<E> Error<E> {
    /// Maps the error onto the closest [`ResultCode`](ResultCode).
    pub fn code(&self) -> ResultCode {
        match self {
            Self::ChipIdTimeout => ResultCode::ChipIdTimeout,
            Self::ResetTimeout => ResultCode::ResetTimeout,
            Self::FlashStatusInit => ResultCode::FlashStatusInit,
            Self::FlashStatusDetached => ResultCode::FlashStatusDetached,
            Self::FlashFast(err) => match err {
                FlashFastError::NotSupported => ResultCode::FlashNotSupported,
                FlashFastError::NoHeader => ResultCode::FlashNoHeader,
                FlashFastError::SectorZero => ResultCode::FlashSectorZero,
                FlashFastError::BlobMismatch => ResultCode::FlashBlobMismatch,
                FlashFastError::SpeedTest => ResultCode::FlashSpeedTest,
                FlashFastError::Unknown => ResultCode::Fail,
            },
            _ => ResultCode::Fail,
        }
    }
}

pub(crate) fn interface_result<T, E>(result: Result<T, E>) -> Result<T, Error<E>> {
    result.map_err(Error::Transport)
}
