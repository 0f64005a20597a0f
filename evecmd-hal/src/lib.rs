//! A [`Transport`] for `evecmd` in terms of the `embedded-hal` blocking SPI,
//! GPIO and delay traits.

#![no_std]

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::spi::{Transfer, Write};
use embedded_hal::digital::v2::OutputPin;
use evecmd::transport::Transport;

/// `EVEHALSPITransport` is an implementation of `evecmd::Transport` that
/// communicates over SPI using the `embedded-hal` SPI and GPIO (for
/// "chip select") traits, and blocks using an `embedded-hal` delay.
pub struct EVEHALSPITransport<SPI, CS, D>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    D: DelayMs<u32>,
{
    spi: SPI,
    cs: CS,
    delay: D,
}

impl<SPI, CS, D> EVEHALSPITransport<SPI, CS, D>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    D: DelayMs<u32>,
{
    /// Create a new EVE transport in terms of the given SPI bus, CS signal
    /// and delay implementations.
    ///
    /// The given CS implementation must be a digital output pin which will be
    /// set to low to assert chip select, or high to unassert it, reflecting
    /// the physical characteristics of the CS pin on EVE IC packages.
    pub fn new(spi: SPI, cs: CS, delay: D) -> Self {
        Self { spi, cs, delay }
    }

    /// Returns the wrapped peripherals.
    pub fn release(self) -> (SPI, CS, D) {
        (self.spi, self.cs, self.delay)
    }
}

impl<SPI, CS, D> Transport for EVEHALSPITransport<SPI, CS, D>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    D: DelayMs<u32>,
{
    type Error = EVEHALSPIError<<SPI as Write<u8>>::Error, <SPI as Transfer<u8>>::Error, CS::Error>;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(EVEHALSPIError::CS)
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        self.cs.set_high().map_err(EVEHALSPIError::CS)
    }

    fn send_byte(&mut self, v: u8) -> Result<(), Self::Error> {
        self.send_bytes(&[v])
    }

    fn receive_byte(&mut self) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        self.receive_bytes(&mut buf)?;
        Ok(buf[0])
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms)
    }

    fn send_bytes(&mut self, v: &[u8]) -> Result<(), Self::Error> {
        self.spi.write(v).map_err(EVEHALSPIError::SPIWrite)
    }

    fn receive_bytes(&mut self, into: &mut [u8]) -> Result<(), Self::Error> {
        // The chip ignores what we clock out while it's answering a read.
        for b in into.iter_mut() {
            *b = 0;
        }
        self.spi
            .transfer(into)
            .map_err(EVEHALSPIError::SPITransfer)?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum EVEHALSPIError<SPIWriteError, SPITransferError, CSError> {
    SPIWrite(SPIWriteError),
    SPITransfer(SPITransferError),
    CS(CSError),
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use evecmd::low_level::LowLevel;
    use evecmd::models::BT81x;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec;
    use std::vec::Vec;

    #[derive(Debug, PartialEq, Eq, Clone)]
    enum Event {
        Select,
        Deselect,
        Write(Vec<u8>),
        Transfer(usize),
        Delay(u32),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct MockSPI {
        log: Log,
        answer: u8,
        fail_writes: bool,
    }

    impl Write<u8> for MockSPI {
        type Error = &'static str;

        fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
            if self.fail_writes {
                return Err("write failed");
            }
            self.log.borrow_mut().push(Event::Write(words.to_vec()));
            Ok(())
        }
    }

    impl Transfer<u8> for MockSPI {
        type Error = &'static str;

        fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
            self.log.borrow_mut().push(Event::Transfer(words.len()));
            for b in words.iter_mut() {
                *b = self.answer;
            }
            Ok(words)
        }
    }

    struct MockPin(Log);

    impl OutputPin for MockPin {
        type Error = ();

        fn set_low(&mut self) -> Result<(), ()> {
            self.0.borrow_mut().push(Event::Select);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), ()> {
            self.0.borrow_mut().push(Event::Deselect);
            Ok(())
        }
    }

    struct MockDelay(Log);

    impl DelayMs<u32> for MockDelay {
        fn delay_ms(&mut self, ms: u32) {
            self.0.borrow_mut().push(Event::Delay(ms));
        }
    }

    fn transport(
        answer: u8,
        fail_writes: bool,
    ) -> (EVEHALSPITransport<MockSPI, MockPin, MockDelay>, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let spi = MockSPI {
            log: log.clone(),
            answer,
            fail_writes,
        };
        let t = EVEHALSPITransport::new(spi, MockPin(log.clone()), MockDelay(log.clone()));
        (t, log)
    }

    #[test]
    fn test_write_frame() {
        let (t, log) = transport(0, false);
        let mut ll: LowLevel<BT81x, _> = LowLevel::new(t);
        ll.wr16(0x302000u32, 0xbeef).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                Event::Select,
                Event::Write(vec![0xb0, 0x20, 0x00]),
                Event::Write(vec![0xef, 0xbe]),
                Event::Deselect,
            ]
        );
    }

    #[test]
    fn test_read_frame() {
        let (t, log) = transport(0x7c, false);
        let mut ll: LowLevel<BT81x, _> = LowLevel::new(t);
        assert_eq!(ll.rd8(0x302000u32).unwrap(), 0x7c);
        let events = log.borrow();
        assert_eq!(events.first(), Some(&Event::Select));
        assert_eq!(events.last(), Some(&Event::Deselect));
        let written: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                Event::Write(data) => Some(data.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(written, vec![0x30, 0x20, 0x00, 0x00]);
        assert!(events.contains(&Event::Transfer(1)));
    }

    #[test]
    fn test_delay() {
        let (mut t, log) = transport(0, false);
        t.delay_ms(5);
        assert_eq!(*log.borrow(), vec![Event::Delay(5)]);
    }

    #[test]
    fn test_write_error() {
        let (mut t, _log) = transport(0, true);
        assert!(matches!(
            t.send_bytes(&[1, 2, 3]),
            Err(EVEHALSPIError::SPIWrite("write failed"))
        ));
    }
}
