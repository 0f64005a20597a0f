//! Burst recording for the command FIFO.
//!
//! Outside of a burst every command record is its own bus transaction,
//! paying for chip-select and three address bytes each time. Between
//! [`Coprocessor::begin_burst`](crate::commands::Coprocessor::begin_burst) and
//! [`Coprocessor::end_burst`](crate::commands::Coprocessor::end_burst) the
//! destination is addressed once and every record is streamed after it.
//!
//! A [`BurstMode`](BurstMode) decides where that stream goes:
//! [`Immediate`](Immediate) clocks it straight out over the bus, while
//! [`Dma`](Dma) collects it in a caller-provided buffer and hands the whole
//! buffer to an [`AsyncTransport`](crate::transport::AsyncTransport) at the
//! end of the burst.

use crate::error::{interface_result, Error};
use crate::memory::ptr::write_header;
use crate::transport::{AsyncTransport, Transport};
use core::sync::atomic::{AtomicU8, Ordering};

/// Where the bytes of a burst go.
pub trait BurstMode<T: Transport> {
    /// Whether the stream can be closed and re-addressed partway through a
    /// burst, which is needed to wait for FIFO space or to wrap around the
    /// end of a host-tracked ring.
    const CAN_REOPEN: bool;

    /// Starts a stream of bytes to the given device address.
    fn open(&mut self, t: &mut T, addr: u32) -> Result<(), Error<T::Error>>;

    fn push(&mut self, t: &mut T, data: &[u8]) -> Result<(), Error<T::Error>>;

    /// Ends the stream started by `open`.
    fn close(&mut self, t: &mut T) -> Result<(), Error<T::Error>>;

    /// Returns `true` while a transfer started by an earlier `close` still
    /// owns the bus. Observing completion consumes it.
    fn in_flight(&mut self) -> bool;
}

/// The synchronous burst mode: chip-select stays asserted for the whole
/// burst and records are sent as they are appended.
#[derive(Clone, Copy, Default, Debug)]
pub struct Immediate;

impl<T: Transport> BurstMode<T> for Immediate {
    const CAN_REOPEN: bool = true;

    fn open(&mut self, t: &mut T, addr: u32) -> Result<(), Error<T::Error>> {
        interface_result(t.select())?;
        interface_result(t.send_bytes(&write_header(addr)))
    }

    fn push(&mut self, t: &mut T, data: &[u8]) -> Result<(), Error<T::Error>> {
        interface_result(t.send_bytes(data))
    }

    fn close(&mut self, t: &mut T) -> Result<(), Error<T::Error>> {
        interface_result(t.deselect())
    }

    fn in_flight(&mut self) -> bool {
        false
    }
}

/// The asynchronous burst mode.
///
/// The burst is assembled in `buf`, address bytes first, and handed to
/// [`AsyncTransport::start_transfer`](AsyncTransport::start_transfer) when
/// the burst ends. The bus then belongs to the transfer until the
/// completion interrupt posts to `mailbox`.
///
/// Appending more than the buffer holds fails with
/// [`Error::BurstOverflow`](Error::BurstOverflow).
pub struct Dma<'b> {
    buf: &'b mut [u8],
    fill: usize,
    mailbox: &'b TransferMailbox,
}

impl<'b> Dma<'b> {
    pub fn new(buf: &'b mut [u8], mailbox: &'b TransferMailbox) -> Self {
        Self {
            buf,
            fill: 0,
            mailbox,
        }
    }

    /// The number of bytes recorded so far, including the address.
    pub fn len(&self) -> usize {
        self.fill
    }

    pub fn is_empty(&self) -> bool {
        self.fill == 0
    }
}

impl<'b, T: AsyncTransport> BurstMode<T> for Dma<'b> {
    const CAN_REOPEN: bool = false;

    fn open(&mut self, _t: &mut T, addr: u32) -> Result<(), Error<T::Error>> {
        let header = write_header(addr);
        if self.buf.len() < header.len() {
            return Err(Error::BurstOverflow);
        }
        self.buf[..header.len()].copy_from_slice(&header);
        self.fill = header.len();
        Ok(())
    }

    fn push(&mut self, _t: &mut T, data: &[u8]) -> Result<(), Error<T::Error>> {
        let end = self.fill + data.len();
        if end > self.buf.len() {
            tracing::debug!(
                capacity = self.buf.len(),
                needed = end,
                "burst buffer overflow"
            );
            return Err(Error::BurstOverflow);
        }
        self.buf[self.fill..end].copy_from_slice(data);
        self.fill = end;
        Ok(())
    }

    fn close(&mut self, t: &mut T) -> Result<(), Error<T::Error>> {
        if self.fill <= 3 {
            // Only the address was recorded.
            self.fill = 0;
            return Ok(());
        }
        // The completion interrupt may fire before start_transfer returns,
        // so the mailbox must be armed first.
        self.mailbox.mark_in_flight();
        if let Err(err) = t.select() {
            self.mailbox.cancel();
            return Err(Error::Transport(err));
        }
        if let Err(err) = t.start_transfer(&self.buf[..self.fill]) {
            self.mailbox.cancel();
            let _ = t.deselect();
            return Err(Error::Transport(err));
        }
        self.fill = 0;
        Ok(())
    }

    fn in_flight(&mut self) -> bool {
        self.mailbox.in_flight()
    }
}

const IDLE: u8 = 0;
const IN_FLIGHT: u8 = 1;
const COMPLETE: u8 = 2;

/// A single-slot mailbox through which a DMA completion interrupt tells the
/// main flow that a burst transfer has finished.
///
/// The main flow arms the mailbox before starting a transfer. The interrupt
/// handler releases chip-select and then calls
/// [`post_complete`](TransferMailbox::post_complete). The main flow
/// observes the completion the next time it checks whether the bus is free.
///
/// Only atomic loads and stores are used, so this works on cores without
/// compare-and-swap. That is sound because each state has exactly one
/// writer: only the main flow moves the mailbox out of the idle or
/// complete states, and only the interrupt handler moves it out of the
/// in-flight state.
#[derive(Debug)]
pub struct TransferMailbox {
    state: AtomicU8,
}

impl TransferMailbox {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    /// Called from the completion interrupt, after chip-select has been
    /// released.
    pub fn post_complete(&self) {
        self.state.store(COMPLETE, Ordering::Release);
    }

    /// Returns `true` if a transfer is still running.
    pub fn in_flight(&self) -> bool {
        match self.state.load(Ordering::Acquire) {
            IN_FLIGHT => true,
            COMPLETE => {
                self.state.store(IDLE, Ordering::Relaxed);
                false
            }
            _ => false,
        }
    }

    pub(crate) fn mark_in_flight(&self) {
        self.state.store(IN_FLIGHT, Ordering::Release);
    }

    pub(crate) fn cancel(&self) {
        self.state.store(IDLE, Ordering::Release);
    }
}

impl Default for TransferMailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::models::BT81x;
    use crate::transport::testing::{FakeDevice, Op};
    use std::vec;

    #[test]
    fn test_mailbox_states() {
        let mb = TransferMailbox::new();
        assert!(!mb.in_flight());
        mb.mark_in_flight();
        assert!(mb.in_flight());
        assert!(mb.in_flight());
        mb.post_complete();
        assert!(!mb.in_flight());
        assert!(!mb.in_flight());
    }

    #[test]
    fn test_immediate_stream() {
        let mut dev = FakeDevice::new::<BT81x>();
        let spy = dev.clone();
        let mut b = Immediate;
        BurstMode::<FakeDevice>::open(&mut b, &mut dev, 0x1000).unwrap();
        b.push(&mut dev, &[1, 2, 3, 4]).unwrap();
        b.push(&mut dev, &[5, 6, 7, 8]).unwrap();
        b.close(&mut dev).unwrap();
        assert_eq!(spy.writes(), vec![(0x1000, vec![1, 2, 3, 4, 5, 6, 7, 8])]);
    }

    #[test]
    fn test_dma_buffer() {
        let mut dev = FakeDevice::new::<BT81x>();
        let spy = dev.clone();
        let mailbox = TransferMailbox::new();
        let mut buf = [0u8; 11];
        let mut b = Dma::new(&mut buf, &mailbox);

        BurstMode::<FakeDevice>::open(&mut b, &mut dev, 0x302578).unwrap();
        b.push(&mut dev, &[1, 2, 3, 4]).unwrap();
        assert_eq!(b.len(), 7);
        assert!(matches!(
            b.push(&mut dev, &[0; 8]),
            Err(Error::BurstOverflow)
        ));
        b.push(&mut dev, &[5, 6, 7, 8]).unwrap();
        b.close(&mut dev).unwrap();

        assert!(BurstMode::<FakeDevice>::in_flight(&mut b));
        assert!(spy.transfer_pending());
        spy.complete_transfer(&mailbox);
        assert!(!BurstMode::<FakeDevice>::in_flight(&mut b));

        assert_eq!(
            spy.ops(),
            vec![
                Op::Transfer { len: 11 },
                Op::Write {
                    addr: 0x302578,
                    data: vec![1, 2, 3, 4, 5, 6, 7, 8]
                },
            ]
        );
    }

    #[test]
    fn test_dma_empty_burst_starts_nothing() {
        let mut dev = FakeDevice::new::<BT81x>();
        let mailbox = TransferMailbox::new();
        let mut buf = [0u8; 16];
        let mut b = Dma::new(&mut buf, &mailbox);
        BurstMode::<FakeDevice>::open(&mut b, &mut dev, 0x302578).unwrap();
        b.close(&mut dev).unwrap();
        assert!(!mailbox.in_flight());
        assert!(dev.ops().is_empty());
    }
}
