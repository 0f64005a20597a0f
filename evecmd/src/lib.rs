//! A driver for the command channel of FTDI/Bridgetek EVE display
//! controllers.
//!
//! The crate covers the part of talking to an EVE chip that has real
//! protocol rules: framing memory accesses on the bus, appending records to
//! the coprocessor's command FIFO under each chip generation's discipline,
//! noticing and repairing coprocessor faults, batching records into bursts
//! (optionally handed to a DMA engine), and pushing large payloads through
//! the FIFO in chunks.
//!
//! Start with an [`EVE`](EVE) object wrapping your
//! [`Transport`](transport::Transport), bring the chip up with
//! [`start_system_clock`](EVE::start_system_clock) and
//! [`poll_for_boot`](EVE::poll_for_boot), and then turn it into a
//! [`Coprocessor`](commands::Coprocessor).

#![no_std]

extern crate self as evecmd;

pub mod bulk;
pub mod burst;
pub mod commands;
pub mod config;
pub mod error;
pub mod fifo;
pub mod host_commands;
pub mod init;
pub mod low_level;
pub mod memory;
pub mod models;
pub mod registers;
pub mod strfmt;
pub mod transport;

pub use burst::TransferMailbox;
pub use commands::Coprocessor;
pub use config::{BootConfig, ClockFrequency, ClockSource, Config};
pub use error::Error;
pub use transport::{AsyncTransport, Transport};

/// Prepare a format string and associated arguments for use with an EVE
/// coprocessor widget which supports the `OPT_FORMAT` option.
///
/// The verbs in the format string are checked against the number of
/// arguments at compile time, and each argument is wrapped in the
/// [`Argument`](strfmt::Argument) variant its verb calls for.
pub use evecmd_macros::eve_format;

use burst::{BurstMode, Dma, Immediate};
use commands::waiter::{PollingWaiter, Waiter};
use low_level::LowLevel;
use models::Model;

/// The main type for this crate, which wraps a transport and represents a
/// chip of model `M` before its coprocessor is in use.
///
/// This type has the bring-up steps. Once the chip is running, use
/// [`coprocessor`](Self::coprocessor) or one of its variants to get the
/// command channel.
pub struct EVE<M: Model, T: Transport> {
    pub(crate) ll: LowLevel<M, T>,
}

impl<M: Model, T: Transport> EVE<M, T> {
    pub fn new(t: T) -> Self {
        Self {
            ll: LowLevel::new(t),
        }
    }

    /// Sends the host commands that configure and then activate the system
    /// clock.
    ///
    /// If this function succeeds then the system clock will be activated and
    /// the device will have begun (but not necessarily completed) its boot
    /// process. Use [`poll_for_boot`](Self::poll_for_boot) to wait for it to
    /// become ready.
    pub fn start_system_clock(
        &mut self,
        source: ClockSource,
        freq: ClockFrequency,
    ) -> Result<(), Error<T::Error>> {
        init::activate_system_clock(self, source, freq)
    }

    /// Polls until the chip reports its ID and then until all of its engines
    /// are out of reset, within the bounds set by `config`.
    ///
    /// If the connected device isn't an EVE, or if the chip isn't connected
    /// correctly, then this returns
    /// [`Error::ChipIdTimeout`](Error::ChipIdTimeout) or
    /// [`Error::ResetTimeout`](Error::ResetTimeout). It doesn't retry.
    pub fn poll_for_boot(&mut self, config: &BootConfig) -> Result<(), Error<T::Error>> {
        init::poll_for_boot(self, config)
    }

    /// Gives direct access to the memory and host command operations.
    pub fn borrow_low_level<'a>(&'a mut self) -> &'a mut LowLevel<M, T> {
        &mut self.ll
    }

    pub fn into_transport(self) -> T {
        self.ll.into_transport()
    }

    /// Consumes the `EVE` object and returns its coprocessor, using the
    /// immediate burst mode and busy-polling while waiting.
    ///
    /// The coprocessor captures `REG_PCLK` and the patch pointer here, and
    /// writes them back after repairing a fault. Program the panel timing
    /// first, or do it through
    /// [`Coprocessor::with_transport`](Coprocessor::with_transport), which
    /// captures them again. The same goes for the other constructors.
    pub fn coprocessor(self, config: Config) -> commands::Result<Coprocessor<M, T>, T> {
        self.coprocessor_with(Immediate, PollingWaiter, config)
    }

    /// Consumes the `EVE` object and returns its coprocessor with the given
    /// burst mode and waiter.
    pub fn coprocessor_with<B, W>(
        self,
        burst: B,
        wait: W,
        config: Config,
    ) -> commands::Result<Coprocessor<M, T, B, W>, T>
    where
        B: BurstMode<T>,
        W: Waiter,
    {
        Coprocessor::from_low_level(self.ll, burst, wait, config)
    }
}

impl<M: Model, T: AsyncTransport> EVE<M, T> {
    /// Consumes the `EVE` object and returns its coprocessor with bursts
    /// recorded into `buf` and sent by DMA, using `mailbox` to learn when
    /// each transfer is complete.
    pub fn coprocessor_dma<'b>(
        self,
        config: Config,
        buf: &'b mut [u8],
        mailbox: &'b TransferMailbox,
    ) -> commands::Result<Coprocessor<M, T, Dma<'b>>, T> {
        self.coprocessor_with(Dma::new(buf, mailbox), PollingWaiter, config)
    }
}

impl<M: Model, T: Transport> core::fmt::Debug for EVE<M, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EVE").field("model", &M::DEBUG_NAME).finish()
    }
}
