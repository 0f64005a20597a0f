//! The byte-level capability that binds this crate to a physical bus.

/// Implementations of `Transport` serve as adapters between the protocol
/// engine in this crate and a specific physical link to the EVE chip,
/// such as a SPI bus with a chip-select GPIO pin.
///
/// The main library contains no implementations of this trait, in order to
/// make the library portable across systems big and small. Other crates,
/// including some with the name prefix `evecmd`, take on additional
/// dependencies in order to bind this library to specific systems/hardware.
///
/// Implementers usually implement only the required methods and take the
/// default implementations of the others, which build everything from
/// single bytes.
pub trait Transport {
    type Error;

    /// Asserts the chip-select signal, starting a new transaction.
    fn select(&mut self) -> Result<(), Self::Error>;

    /// Releases the chip-select signal, ending the current transaction.
    fn deselect(&mut self) -> Result<(), Self::Error>;

    fn send_byte(&mut self, v: u8) -> Result<(), Self::Error>;

    fn receive_byte(&mut self) -> Result<u8, Self::Error>;

    /// Blocks for at least the given number of milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Sends a 32-bit value least significant byte first.
    fn send_word(&mut self, v: u32) -> Result<(), Self::Error> {
        self.send_bytes(&v.to_le_bytes())
    }

    fn send_bytes(&mut self, v: &[u8]) -> Result<(), Self::Error> {
        for b in v {
            self.send_byte(*b)?;
        }
        Ok(())
    }

    fn receive_bytes(&mut self, into: &mut [u8]) -> Result<(), Self::Error> {
        for b in into.iter_mut() {
            *b = self.receive_byte()?;
        }
        Ok(())
    }

    /// Hard-resets the chip, typically by pulsing its power-down pin.
    ///
    /// The default implementation does nothing, for boards where that pin
    /// isn't wired to the host.
    fn reset(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Implemented by transports that can hand a prepared buffer to a DMA
/// engine instead of clocking it out byte by byte.
///
/// Chip-select is already asserted when `start_transfer` is called. The
/// platform's completion interrupt is responsible for releasing chip-select
/// and then calling
/// [`TransferMailbox::post_complete`](crate::burst::TransferMailbox::post_complete),
/// in that order.
pub trait AsyncTransport: Transport {
    fn start_transfer(&mut self, buf: &[u8]) -> Result<(), Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn select(&mut self) -> Result<(), Self::Error> {
        (**self).select()
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        (**self).deselect()
    }

    fn send_byte(&mut self, v: u8) -> Result<(), Self::Error> {
        (**self).send_byte(v)
    }

    fn receive_byte(&mut self) -> Result<u8, Self::Error> {
        (**self).receive_byte()
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn send_word(&mut self, v: u32) -> Result<(), Self::Error> {
        (**self).send_word(v)
    }

    fn send_bytes(&mut self, v: &[u8]) -> Result<(), Self::Error> {
        (**self).send_bytes(v)
    }

    fn receive_bytes(&mut self, into: &mut [u8]) -> Result<(), Self::Error> {
        (**self).receive_bytes(into)
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        (**self).reset()
    }
}

impl<T: AsyncTransport + ?Sized> AsyncTransport for &mut T {
    fn start_transfer(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        (**self).start_transfer(buf)
    }
}

#[cfg(test)]
pub(crate) mod testing;
