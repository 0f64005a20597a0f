use crate::host_commands::HostCmd;
use crate::memory::ptr::{read_header, write_header};
use crate::models::Model;
use crate::registers::Register;
use crate::transport::Transport;

/// `LowLevel` is a low-level interface to EVE controllers which matches
/// the primitive memory operations used in the Programmers Guides for the
/// various EVE controllers.
///
/// This is slightly higher-level than the `Transport` trait, turning a
/// device address into the bus framing and providing size-specific memory
/// accesses, but it doesn't know anything about the command FIFO. Every
/// operation other than the `begin_write`/`end_write` pair brackets its bus
/// activity with chip-select, and multi-byte values are little-endian on
/// the wire.
///
/// Transport errors are returned unchanged; this layer adds none of its own.
pub struct LowLevel<M: Model, T: Transport> {
    t: T,
    _model: core::marker::PhantomData<M>,
}

impl<M: Model, T: Transport> LowLevel<M, T> {
    pub fn new(t: T) -> Self {
        Self {
            t,
            _model: core::marker::PhantomData,
        }
    }

    pub fn borrow_transport<'a>(&'a mut self) -> &'a mut T {
        &mut self.t
    }

    pub fn into_transport(self) -> T {
        self.t
    }

    /// Returns the address of the given register on model `M`, if it has
    /// that register.
    #[inline]
    pub fn reg(&self, reg: Register) -> Option<u32> {
        M::register(reg)
    }

    /// Asserts chip-select and sends the write framing for `addr`, leaving
    /// the transaction open for `continue_write` calls.
    pub fn begin_write(&mut self, addr: impl Into<u32>) -> Result<(), T::Error> {
        self.t.select()?;
        self.t.send_bytes(&write_header(addr.into()))
    }

    pub fn continue_write(&mut self, v: &[u8]) -> Result<(), T::Error> {
        self.t.send_bytes(v)
    }

    pub fn end_write(&mut self) -> Result<(), T::Error> {
        self.t.deselect()
    }

    pub fn wr8(&mut self, addr: impl Into<u32>, v: u8) -> Result<(), T::Error> {
        self.wr8s(addr, &[v])
    }

    pub fn wr16(&mut self, addr: impl Into<u32>, v: u16) -> Result<(), T::Error> {
        self.wr8s(addr, &v.to_le_bytes())
    }

    pub fn wr32(&mut self, addr: impl Into<u32>, v: u32) -> Result<(), T::Error> {
        self.wr8s(addr, &v.to_le_bytes())
    }

    pub fn wr8s(&mut self, addr: impl Into<u32>, v: &[u8]) -> Result<(), T::Error> {
        let header = write_header(addr.into());
        self.with_select(|t| {
            t.send_bytes(&header)?;
            t.send_bytes(v)
        })
    }

    pub fn rd8(&mut self, addr: impl Into<u32>) -> Result<u8, T::Error> {
        let mut data = [0u8; 1];
        self.rd8s(addr, &mut data)?;
        Ok(data[0])
    }

    pub fn rd16(&mut self, addr: impl Into<u32>) -> Result<u16, T::Error> {
        let mut data = [0u8; 2];
        self.rd8s(addr, &mut data)?;
        Ok(u16::from_le_bytes(data))
    }

    pub fn rd32(&mut self, addr: impl Into<u32>) -> Result<u32, T::Error> {
        let mut data = [0u8; 4];
        self.rd8s(addr, &mut data)?;
        Ok(u32::from_le_bytes(data))
    }

    pub fn rd8s(&mut self, addr: impl Into<u32>, into: &mut [u8]) -> Result<(), T::Error> {
        let header = read_header(addr.into());
        self.with_select(|t| {
            t.send_bytes(&header)?;
            t.receive_bytes(into)
        })
    }

    /// Sends a host command: the command byte, its parameter and a zero
    /// padding byte.
    pub fn host_command(&mut self, cmd: HostCmd, param: u8) -> Result<(), T::Error> {
        self.with_select(|t| t.send_bytes(&[cmd.to_raw(), param, 0]))
    }

    pub fn delay_ms(&mut self, ms: u32) {
        self.t.delay_ms(ms)
    }

    // Runs `f` inside one chip-select window, releasing chip-select even
    // if `f` fails.
    fn with_select<R>(
        &mut self,
        f: impl FnOnce(&mut T) -> Result<R, T::Error>,
    ) -> Result<R, T::Error> {
        self.t.select()?;
        let result = f(&mut self.t);
        let released = self.t.deselect();
        let v = result?;
        released?;
        Ok(v)
    }
}

impl<M: Model, T: Transport> core::fmt::Debug for LowLevel<M, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LowLevel").field("model", &M::DEBUG_NAME).finish()
    }
}
