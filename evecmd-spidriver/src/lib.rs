#![no_std]

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::serial::{Read, Write};
use evecmd::transport::Transport;
use spidriver::SPIDriver;

/// A [`Transport`] that reaches the EVE chip through an Excamera SPIDriver
/// attached to a serial port.
pub struct EVESPIDriverTransport<TX, RX, D>
where
    TX: Write<u8>,
    RX: Read<u8>,
    D: DelayMs<u32>,
{
    sd: SPIDriver<TX, RX>,
    delay: D,
}

impl<TX, RX, D> EVESPIDriverTransport<TX, RX, D>
where
    TX: Write<u8>,
    RX: Read<u8>,
    D: DelayMs<u32>,
{
    pub fn new(sd: SPIDriver<TX, RX>, delay: D) -> Self {
        Self { sd, delay }
    }
}

impl<TX, RX, D> Transport for EVESPIDriverTransport<TX, RX, D>
where
    TX: Write<u8>,
    RX: Read<u8>,
    D: DelayMs<u32>,
{
    type Error = spidriver::Error<TX::Error, RX::Error>;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.sd.select()
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        self.sd.unselect()
    }

    fn send_byte(&mut self, v: u8) -> Result<(), Self::Error> {
        self.sd.write(&[v])
    }

    fn receive_byte(&mut self) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        self.sd.transfer(&mut buf)?;
        Ok(buf[0])
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms)
    }

    fn send_bytes(&mut self, v: &[u8]) -> Result<(), Self::Error> {
        self.sd.write(v)
    }

    fn receive_bytes(&mut self, into: &mut [u8]) -> Result<(), Self::Error> {
        for b in into.iter_mut() {
            *b = 0;
        }
        self.sd.transfer(into)?;
        Ok(())
    }
}
