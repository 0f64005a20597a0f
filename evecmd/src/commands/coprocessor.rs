use super::opcode;
use super::options;
use super::waiter::{Backoff, PollingWaiter, Waiter};
use super::{CommandWord, FifoState, FlashStatus};
use crate::burst::{BurstMode, Immediate};
use crate::config::Config;
use crate::error::{interface_result, Error, FlashFastError};
use crate::fifo::{CommandFifo, FifoStatus, FIFO_EMPTY_SPACE};
use crate::low_level::LowLevel;
use crate::memory::{MemoryRegion, Ptr};
use crate::models::{Model, WithExtFlashMem};
use crate::registers::Register;
use crate::strfmt::{padded_string_len, Message};
use crate::transport::Transport;
use num_enum::FromPrimitive;

pub type Result<R, T> = core::result::Result<R, Error<<T as Transport>::Error>>;

/// An interface to the command FIFO of the EVE chip's coprocessor
/// component.
///
/// The coprocessor context owns the bus: every command record is written by
/// this object, using whichever FIFO discipline the model `M` calls for, and
/// the object keeps the bookkeeping that goes with it. `B` selects what
/// happens to records appended inside a burst (see
/// [`begin_burst`](Self::begin_burst)) and `W` decides how to back off while
/// waiting for the coprocessor.
pub struct Coprocessor<M, T, B = Immediate, W = PollingWaiter>
where
    M: Model,
    T: Transport,
    B: BurstMode<T>,
    W: Waiter,
{
    ll: LowLevel<M, T>,
    fifo: M::Fifo,
    burst: B,
    wait: W,
    config: Config,

    // `known_space` tracks the amount of available FIFO space (in bytes) that
    // we most recently knew about. The coprocessor asynchronously consumes
    // command words from the ring buffer, so there might actually be _more_
    // space than reported here, but there should always be at least this much
    // space because we keep decreasing this as we write more data into the
    // buffer.
    //
    // Once this value gets too low to append another record, we'll poll
    // the status registers, via the waiter, until there is enough.
    known_space: u32,

    burst_active: bool,

    // Set when the last byte written landed at the very end of the command
    // ring, so the next byte must be addressed at offset zero.
    readdress: bool,

    // Register values that fault recovery must put back.
    saved_patch_ptr: u16,
    saved_pclk: u8,
}

/// A witness that no burst stream currently holds chip-select, so that it's
/// safe to use the bus for other reads and writes.
struct StoppedStream(());

impl<M: Model, T: Transport> Coprocessor<M, T, Immediate, PollingWaiter> {
    /// Consumes the given transport and returns a coprocessor context that
    /// busy-polls when it must wait and uses the default
    /// [`Config`](Config).
    pub fn new_polling(t: T) -> Result<Self, T> {
        Self::new(t, Immediate, PollingWaiter, Config::default())
    }
}

impl<M, T, B, W> Coprocessor<M, T, B, W>
where
    M: Model,
    T: Transport,
    B: BurstMode<T>,
    W: Waiter,
{
    /// Consumes the given transport, burst mode and waiter and returns an
    /// interface to the coprocessor via the given transport.
    ///
    /// This function consumes the transport because it will be constantly
    /// writing into the command FIFO of the associated EVE chip and so it
    /// isn't safe to do any other concurrent access. You can get the
    /// underlying transport back again if you need it using
    /// [`take_transport`](Self::take_transport) or
    /// [`with_transport`](Self::with_transport).
    ///
    /// Creating the context reads the command FIFO pointers, and on models
    /// with a coprocessor patch it also captures the registers that fault
    /// recovery has to restore.
    pub fn new(t: T, burst: B, wait: W, config: Config) -> Result<Self, T> {
        Self::from_low_level(LowLevel::new(t), burst, wait, config)
    }

    pub(crate) fn from_low_level(
        ll: LowLevel<M, T>,
        burst: B,
        wait: W,
        config: Config,
    ) -> Result<Self, T> {
        let mut ret = Self {
            ll,
            fifo: Default::default(),
            burst,
            wait,
            config,
            known_space: 0,
            burst_active: false,
            readdress: false,
            saved_patch_ptr: 0,
            saved_pclk: 0,
        };
        let stopped = ret.require_stopped()?;
        ret.synchronize(&stopped)?;
        Ok(ret)
    }

    /// Consumes the coprocessor object and returns a new one that has the
    /// same transport and burst mode but a different waiter.
    ///
    /// The given function receives the old waiter and returns the new one.
    /// Use this to wrap the waiter in a new implementation that does
    /// additional logging or tracking of waiting.
    pub fn with_new_waiter<W2, F>(self, f: F) -> Coprocessor<M, T, B, W2>
    where
        W2: Waiter,
        F: FnOnce(W) -> W2,
    {
        let Self {
            ll,
            fifo,
            burst,
            wait,
            config,
            known_space,
            burst_active,
            readdress,
            saved_patch_ptr,
            saved_pclk,
        } = self;
        Coprocessor {
            ll,
            fifo,
            burst,
            wait: f(wait),
            config,
            known_space,
            burst_active,
            readdress,
            saved_patch_ptr,
            saved_pclk,
        }
    }

    /// Consumes the coprocessor object and returns its transport.
    ///
    /// Fails with [`Error::BurstActive`](Error::BurstActive) during a burst,
    /// and waits for any asynchronous burst transfer to finish first.
    pub fn take_transport(mut self) -> Result<T, T> {
        let stopped = self.require_stopped()?;
        self.settle_transfer(&stopped)?;
        Ok(self.ll.into_transport())
    }

    /// Lends the transport to the given function.
    ///
    /// The function may do anything with the bus, including touching the
    /// command FIFO registers: afterwards the context re-reads everything it
    /// caches from the device.
    pub fn with_transport<R, F>(&mut self, f: F) -> Result<R, T>
    where
        F: FnOnce(&mut T) -> Result<R, T>,
    {
        let stopped = self.require_stopped()?;
        self.settle_transfer(&stopped)?;
        let result = f(self.ll.borrow_transport());
        self.synchronize(&stopped)?;
        result
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns `true` between [`begin_burst`](Self::begin_burst) and
    /// [`end_burst`](Self::end_burst).
    pub fn in_burst(&self) -> bool {
        self.burst_active
    }

    fn synchronize(&mut self, _stopped: &StoppedStream) -> Result<(), T> {
        self.fifo.synchronize(&mut self.ll)?;
        if M::HAS_COPRO_PATCH {
            let ll = &mut self.ll;
            self.saved_patch_ptr =
                interface_result(ll.rd16(Self::reg(Register::COPRO_PATCH_PTR)?))?;
            self.saved_pclk = interface_result(ll.rd8(Self::reg(Register::PCLK)?))?;
        }
        self.known_space = 0;
        self.readdress = false;
        Ok(())
    }

    fn reg(reg: Register) -> Result<u32, T> {
        M::register(reg).ok_or(Error::Unsupported)
    }

    fn write_addr(&self) -> Result<u32, T> {
        self.fifo.write_addr().ok_or(Error::Unsupported)
    }

    fn require_stopped(&self) -> Result<StoppedStream, T> {
        if self.burst_active {
            Err(Error::BurstActive)
        } else {
            Ok(StoppedStream(()))
        }
    }

    fn stop_stream(&mut self) -> Result<StoppedStream, T> {
        self.burst.close(self.ll.borrow_transport())?;
        Ok(StoppedStream(()))
    }

    fn start_stream(&mut self, _stopped: StoppedStream) -> Result<(), T> {
        let addr = self.write_addr()?;
        self.burst.open(self.ll.borrow_transport(), addr)?;
        self.readdress = false;
        Ok(())
    }

    /// Writes one command record of exactly `len` bytes, produced by `f`.
    ///
    /// Outside of a burst the record gets its own bus transaction, addressed
    /// at the current FIFO write address. Inside a burst it joins the open
    /// stream.
    pub(crate) fn write_stream<F>(&mut self, len: u32, f: F) -> Result<(), T>
    where
        F: FnOnce(&mut Self) -> Result<(), T>,
    {
        if len > FIFO_EMPTY_SPACE {
            return Err(Error::Unsupported);
        }
        if self.burst_active {
            // A DMA buffer holds a single address frame, so it can't follow
            // the tracked ring around its end.
            if !B::CAN_REOPEN && (self.readdress || len > self.fifo.contiguous()) {
                return Err(Error::Unsupported);
            }
            self.ensure_space(len)?;
            f(self)?;
        } else {
            let stopped = self.require_stopped()?;
            self.settle_transfer(&stopped)?;
            self.ensure_space(len)?;
            let addr = self.write_addr()?;
            interface_result(self.ll.begin_write(addr))?;
            self.readdress = false;
            let result = f(self);
            let released = interface_result(self.ll.end_write());
            result?;
            released?;
        }
        self.known_space -= len;
        Ok(())
    }

    fn ensure_space(&mut self, need: u32) -> Result<(), T> {
        if self.known_space >= need {
            return Ok(());
        }
        if !self.burst_active {
            let stopped = self.require_stopped()?;
            return self.ensure_space_stopped(&stopped, need);
        }
        if !B::CAN_REOPEN {
            tracing::debug!(
                need,
                known_space = self.known_space,
                "burst outgrew the command FIFO space"
            );
            return Err(Error::BurstOverflow);
        }
        // Pause the burst while we wait, then pick it up again wherever the
        // write address is now.
        let stopped = self.stop_stream()?;
        let waited = self.ensure_space_stopped(&stopped, need);
        self.start_stream(stopped)?;
        waited
    }

    fn ensure_space_stopped(&mut self, stopped: &StoppedStream, need: u32) -> Result<(), T> {
        self.fifo.submit(&mut self.ll)?;
        let mut attempt = 0;
        loop {
            self.poll_state(stopped)?;
            if self.known_space >= need {
                return Ok(());
            }
            attempt += 1;
            self.back_off(attempt)?;
        }
    }

    pub(crate) fn write_to_buffer<V: Into<CommandWord>>(&mut self, v: V) -> Result<(), T> {
        let word: CommandWord = v.into();
        self.write_bytes(&word.to_raw().to_le_bytes())
    }

    /// Writes a string, its NUL terminator and padding up to the next word
    /// boundary.
    pub(crate) fn write_string(&mut self, s: &[u8]) -> Result<(), T> {
        const ZEROS: [u8; 4] = [0; 4];
        self.write_bytes(s)?;
        let pad = padded_string_len(s.len()) as usize - s.len();
        self.write_bytes(&ZEROS[..pad])
    }

    /// Writes raw bytes as part of the current record, splitting them where
    /// the destination must be re-addressed.
    pub(crate) fn write_bytes(&mut self, mut data: &[u8]) -> Result<(), T> {
        while !data.is_empty() {
            if self.readdress {
                self.readdress_stream()?;
            }
            let room = self.fifo.contiguous();
            let n = (data.len() as u32).min(room);
            let (now, rest) = data.split_at(n as usize);
            if self.burst_active {
                self.burst.push(self.ll.borrow_transport(), now)?;
            } else {
                interface_result(self.ll.continue_write(now))?;
            }
            self.fifo.advance(n);
            if n == room {
                self.readdress = true;
            }
            data = rest;
        }
        Ok(())
    }

    fn readdress_stream(&mut self) -> Result<(), T> {
        let addr = self.write_addr()?;
        if self.burst_active {
            if !B::CAN_REOPEN {
                return Err(Error::Unsupported);
            }
            self.burst.close(self.ll.borrow_transport())?;
            self.burst.open(self.ll.borrow_transport(), addr)?;
        } else {
            interface_result(self.ll.end_write())?;
            interface_result(self.ll.begin_write(addr))?;
        }
        self.readdress = false;
        Ok(())
    }

    fn back_off(&mut self, attempt: u32) -> Result<(), T> {
        match self.wait.next_poll(attempt) {
            Backoff::Immediately => Ok(()),
            Backoff::AfterMs(ms) => {
                self.ll.delay_ms(ms);
                Ok(())
            }
            Backoff::GiveUp => {
                tracing::warn!(attempt, "gave up waiting for the coprocessor");
                Err(Error::Timeout)
            }
        }
    }

    // Waits for an asynchronous burst transfer to release the bus.
    fn settle_transfer(&mut self, _stopped: &StoppedStream) -> Result<(), T> {
        let mut attempt = 0;
        while self.burst.in_flight() {
            attempt += 1;
            self.back_off(attempt)?;
        }
        Ok(())
    }

    fn poll_state(&mut self, stopped: &StoppedStream) -> Result<FifoState, T> {
        Ok(match self.fifo.status(&mut self.ll)? {
            FifoStatus::Idle => {
                self.known_space = FIFO_EMPTY_SPACE;
                FifoState::Idle
            }
            FifoStatus::Busy { free } => {
                self.known_space = free;
                FifoState::Busy
            }
            FifoStatus::Fault => {
                self.recover(stopped)?;
                FifoState::Idle
            }
        })
    }

    fn recover(&mut self, _stopped: &StoppedStream) -> Result<(), T> {
        tracing::warn!(model = M::DEBUG_NAME, "coprocessor fault, resetting the command FIFO");
        let cpureset = Self::reg(Register::CPURESET)?;
        let ll = &mut self.ll;
        interface_result(ll.wr8(cpureset, 1))?;
        interface_result(ll.wr16(Self::reg(Register::CMD_READ)?, 0))?;
        interface_result(ll.wr16(Self::reg(Register::CMD_WRITE)?, 0))?;
        interface_result(ll.wr16(Self::reg(Register::CMD_DL)?, 0))?;
        interface_result(ll.wr8(cpureset, 0))?;
        self.fifo.reset();

        if M::HAS_COPRO_PATCH {
            interface_result(ll.wr16(Self::reg(Register::COPRO_PATCH_PTR)?, self.saved_patch_ptr))?;
            ll.delay_ms(self.config.get_recovery_delay_ms());
            // The reset also dropped the flash out of full-speed mode. These
            // two go straight to the FIFO, outside of the space accounting,
            // and nothing waits for their results.
            let mut raw = [0u8; 8];
            raw[..4].copy_from_slice(&opcode::FLASHATTACH.to_le_bytes());
            raw[4..].copy_from_slice(&opcode::FLASHFAST.to_le_bytes());
            interface_result(ll.wr8s(Self::reg(Register::CMDB_WRITE)?, &raw))?;
            interface_result(ll.wr8(Self::reg(Register::PCLK)?, self.saved_pclk))?;
        }

        self.known_space = 0;
        self.readdress = false;
        Ok(())
    }
}

/// The methods which submit new commands into the command FIFO. Outside of
/// a burst each record is written in its own bus transaction. These methods
/// block only when the FIFO is too full to take the record.
impl<M, T, B, W> Coprocessor<M, T, B, W>
where
    M: Model,
    T: Transport,
    B: BurstMode<T>,
    W: Waiter,
{
    /// Appends one command record: the opcode followed by its argument
    /// words.
    pub fn append(&mut self, opcode: u32, args: &[u32]) -> Result<(), T> {
        let len = 4 * (1 + args.len() as u32);
        self.write_stream(len, |cp| {
            cp.write_to_buffer(opcode)?;
            for arg in args {
                cp.write_to_buffer(*arg)?;
            }
            Ok(())
        })
    }

    /// Appends a command whose argument words are followed by a byte
    /// string. The string is sent as given, then NUL-terminated and padded
    /// with zeros to the next word boundary.
    pub fn append_with_string(&mut self, opcode: u32, args: &[u32], s: &[u8]) -> Result<(), T> {
        let len = 4 * (1 + args.len() as u32) + padded_string_len(s.len());
        self.write_stream(len, |cp| {
            cp.write_to_buffer(opcode)?;
            for arg in args {
                cp.write_to_buffer(*arg)?;
            }
            cp.write_string(s)
        })
    }

    /// Appends a command whose argument words are followed by a format
    /// string and then the message's arguments, one word each.
    ///
    /// This doesn't set `OPT_FORMAT`, since where the options word sits
    /// depends on the command. See [`draw_text`](Self::draw_text).
    pub fn append_message(&mut self, opcode: u32, args: &[u32], msg: &Message) -> Result<(), T> {
        let len = 4 * (1 + args.len() as u32) + msg.encoded_len();
        self.write_stream(len, |cp| {
            cp.write_to_buffer(opcode)?;
            for arg in args {
                cp.write_to_buffer(*arg)?;
            }
            cp.write_string(msg.text())?;
            for arg in msg.args() {
                cp.write_to_buffer(arg.to_word())?;
            }
            Ok(())
        })
    }

    /// Appends a single word as its own record.
    pub fn append_raw_word(&mut self, word: u32) -> Result<(), T> {
        self.write_stream(4, |cp| cp.write_to_buffer(word))
    }

    pub fn start_display_list(&mut self) -> Result<(), T> {
        self.append(opcode::DLSTART, &[])
    }

    pub fn display_list_swap(&mut self) -> Result<(), T> {
        self.append(opcode::SWAP, &[])
    }

    /// Runs `f` between `CMD_DLSTART` and `CMD_SWAP`, so that whatever it
    /// appends builds a new display list.
    pub fn new_display_list<F>(&mut self, f: F) -> Result<(), T>
    where
        F: FnOnce(&mut Self) -> Result<(), T>,
    {
        self.start_display_list()?;
        f(self)?;
        self.display_list_swap()
    }

    /// Appends `CMD_TEXT`, adding `OPT_FORMAT` to the options if the message
    /// has arguments.
    pub fn draw_text(
        &mut self,
        x: i16,
        y: i16,
        font: u16,
        opts: u16,
        msg: Message,
    ) -> Result<(), T> {
        let opts = if msg.needs_format() {
            opts | options::FORMAT as u16
        } else {
            opts
        };
        let args = [
            CommandWord::from((x, y)).to_raw(),
            CommandWord::from((font, opts)).to_raw(),
        ];
        self.append_message(opcode::TEXT, &args, &msg)
    }

    /// Makes everything appended so far eligible for execution. Only the
    /// tracked FIFO discipline needs this; for the others it only waits for
    /// any asynchronous burst transfer to finish.
    pub fn submit(&mut self) -> Result<(), T> {
        let stopped = self.require_stopped()?;
        self.settle_transfer(&stopped)?;
        self.fifo.submit(&mut self.ll)
    }

    /// Submits everything appended so far and waits for the coprocessor to
    /// execute it.
    pub fn execute(&mut self) -> Result<(), T> {
        self.submit()?;
        self.wait_until_idle()
    }
}

/// The methods which deal with the coprocessor's progress and with bursts.
impl<M, T, B, W> Coprocessor<M, T, B, W>
where
    M: Model,
    T: Transport,
    B: BurstMode<T>,
    W: Waiter,
{
    /// Takes one look at the coprocessor.
    ///
    /// While an asynchronous burst transfer is still running this reports
    /// [`FifoState::Busy`](FifoState::Busy) without touching the bus. If the
    /// status registers show a coprocessor fault, the fault is repaired
    /// before returning [`FifoState::Idle`](FifoState::Idle); whatever was
    /// queued at the time is lost.
    pub fn is_busy(&mut self) -> Result<FifoState, T> {
        let stopped = self.require_stopped()?;
        if self.burst.in_flight() {
            return Ok(FifoState::Busy);
        }
        self.poll_state(&stopped)
    }

    /// Submits anything pending and blocks until the coprocessor has
    /// executed everything in the FIFO.
    pub fn wait_until_idle(&mut self) -> Result<(), T> {
        let stopped = self.require_stopped()?;
        self.settle_transfer(&stopped)?;
        self.fifo.submit(&mut self.ll)?;
        let mut attempt = 0;
        while self.poll_state(&stopped)? == FifoState::Busy {
            attempt += 1;
            self.back_off(attempt)?;
        }
        Ok(())
    }

    /// Resets the coprocessor and its command FIFO, as is done automatically
    /// when a fault is detected.
    ///
    /// On models with a coprocessor patch this also restores the patch
    /// pointer and pixel clock captured when the context was created (or at
    /// the end of the last [`with_transport`](Self::with_transport) call),
    /// and re-attaches the external flash. Running it twice has the same effect
    /// as running it once.
    pub fn recover_fault(&mut self) -> Result<(), T> {
        let stopped = self.require_stopped()?;
        self.settle_transfer(&stopped)?;
        self.recover(&stopped)
    }

    /// Starts a burst, during which appended records share one address frame
    /// instead of each having their own bus transaction.
    ///
    /// In the immediate burst mode chip-select stays asserted until
    /// [`end_burst`](Self::end_burst), so nothing else may use the bus in the
    /// meantime. In the DMA burst mode records collect in the burst buffer,
    /// and the whole burst must fit in the FIFO space known when it starts.
    ///
    /// Bursts don't nest: calling this during a burst fails with
    /// [`Error::BurstActive`](Error::BurstActive). If an earlier DMA burst is
    /// still being transferred, this waits for it first.
    pub fn begin_burst(&mut self) -> Result<(), T> {
        let stopped = self.require_stopped()?;
        self.settle_transfer(&stopped)?;
        self.fifo.submit(&mut self.ll)?;
        self.poll_state(&stopped)?;
        if self.known_space == 0 {
            // A fault was just repaired.
            self.poll_state(&stopped)?;
        }
        self.start_stream(stopped)?;
        self.burst_active = true;
        Ok(())
    }

    /// Ends the current burst.
    ///
    /// In the immediate burst mode this releases chip-select. In the DMA
    /// burst mode it starts the transfer of the burst buffer, which then
    /// owns the bus until the completion is posted to the mailbox.
    ///
    /// The records are not submitted for execution; follow up with
    /// [`execute`](Self::execute) or [`submit`](Self::submit) when the model
    /// uses the tracked FIFO discipline.
    pub fn end_burst(&mut self) -> Result<(), T> {
        if !self.burst_active {
            return Err(Error::BurstInactive);
        }
        self.burst_active = false;
        self.stop_stream()?;
        Ok(())
    }
}

/// The methods which block until the coprocessor has "caught up" with
/// everything in the FIFO, and then read back a result the coprocessor
/// wrote into the FIFO. These all have the prefix `block_` to indicate that
/// they block.
///
/// None of them can run during a burst. They fail with
/// [`Error::BurstActive`](Error::BurstActive) before anything is appended.
impl<M, T, B, W> Coprocessor<M, T, B, W>
where
    M: Model,
    T: Transport,
    B: BurstMode<T>,
    W: Waiter,
{
    /// Waits for the FIFO to drain and then reads the word `bytes_back`
    /// bytes before the current write offset.
    ///
    /// Commands with results have the coprocessor overwrite placeholder
    /// words at the end of their own record, so a command whose last
    /// argument is the result is read back with `bytes_back` of 4.
    pub fn read_result(&mut self, bytes_back: u32) -> Result<u32, T> {
        self.wait_until_idle()?;
        let wp = self.fifo.write_offset(&mut self.ll)?;
        let ptr = <M::CommandMem as MemoryRegion>::ptr(wp) - bytes_back;
        interface_result(self.ll.rd32(ptr))
    }

    /// Has the coprocessor read a register and report its value.
    pub fn block_read_register(&mut self, reg: Register) -> Result<u32, T> {
        self.require_stopped()?;
        let addr = Self::reg(reg)?;
        self.append(opcode::REGREAD, &[addr, 0])?;
        self.read_result(4)
    }

    /// Has the coprocessor compute the CRC-32 of `len` bytes of main memory
    /// starting at `ptr`.
    pub fn block_mem_crc(&mut self, ptr: Ptr<M::MainMem>, len: u32) -> Result<u32, T> {
        self.require_stopped()?;
        self.append(opcode::MEMCRC, &[ptr.to_raw(), len, 0])?;
        self.read_result(4)
    }

    /// Switches the external flash to full-speed mode.
    pub fn block_flash_fast(&mut self) -> Result<(), T>
    where
        M: WithExtFlashMem,
    {
        self.require_stopped()?;
        self.append(opcode::FLASHFAST, &[0])?;
        match self.read_result(4)? {
            0 => Ok(()),
            code => {
                let err = FlashFastError::from_primitive(code);
                tracing::warn!(code, "CMD_FLASHFAST failed");
                Err(Error::FlashFast(err))
            }
        }
    }

    pub fn flash_status(&mut self) -> Result<FlashStatus, T>
    where
        M: WithExtFlashMem,
    {
        let stopped = self.require_stopped()?;
        self.settle_transfer(&stopped)?;
        let raw = interface_result(self.ll.rd8(Self::reg(Register::FLASH_STATUS)?))?;
        FlashStatus::try_from(raw).map_err(|_| Error::Unsupported)
    }

    /// Brings the external flash into full-speed mode, whatever state it is
    /// in.
    ///
    /// Waits (a bounded number of polls, see
    /// [`Config::flash_init_polls`](Config::flash_init_polls)) for the flash
    /// to leave its initial state, attaches it if it's detached, and then
    /// runs `CMD_FLASHFAST` if it's only in basic mode.
    pub fn init_flash(&mut self) -> Result<(), T>
    where
        M: WithExtFlashMem,
    {
        let (polls, delay_ms) = self.config.get_flash_init_polls();
        let mut status = self.flash_status()?;
        let mut attempt = 0;
        while status == FlashStatus::Init {
            if attempt >= polls {
                tracing::warn!(polls, "flash never left its initial state");
                return Err(Error::FlashStatusInit);
            }
            attempt += 1;
            self.ll.delay_ms(delay_ms);
            status = self.flash_status()?;
        }

        if status == FlashStatus::Detached {
            self.append(opcode::FLASHATTACH, &[])?;
            self.execute()?;
            status = self.flash_status()?;
            if status == FlashStatus::Detached {
                tracing::warn!("flash did not attach");
                return Err(Error::FlashStatusDetached);
            }
        }

        if status == FlashStatus::Basic {
            self.block_flash_fast()?;
        }
        tracing::debug!("flash is in full-speed mode");
        Ok(())
    }
}

impl<M, T, B, W> core::fmt::Debug for Coprocessor<M, T, B, W>
where
    M: Model,
    T: Transport,
    B: BurstMode<T>,
    W: Waiter,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Coprocessor")
            .field("model", &M::DEBUG_NAME)
            .field("fifo", &self.fifo)
            .field("known_space", &self.known_space)
            .field("burst_active", &self.burst_active)
            .finish()
    }
}
