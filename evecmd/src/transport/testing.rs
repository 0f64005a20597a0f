//! A simulated EVE chip behind the [`Transport`](super::Transport) traits.
//!
//! `FakeDevice` decodes the address framing of each chip-select window the
//! same way the real chip does, keeps a sparse byte-addressed memory, and
//! models just enough of the coprocessor for the command FIFO protocol to
//! be exercised: `REG_CMDB_WRITE` streaming, the read/write pointers, the
//! free-space register, draining after a configurable number of status
//! polls, result words written back into the ring, and the fault state.
//!
//! The device is a cheap-to-clone handle, so a test can hand one clone to
//! the code under test and keep another for inspection.

extern crate std;

use super::{AsyncTransport, Transport};
use crate::burst::TransferMailbox;
use crate::memory::MemoryRegion;
use crate::models::Model;
use crate::registers::Register;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::vec::Vec;

const RING_MASK: u32 = 0xfff;

/// One completed bus transaction, or one out-of-band event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    Write { addr: u32, data: Vec<u8> },
    Read { addr: u32, len: usize },
    HostCmd { cmd: u8, param: u8 },
    Transfer { len: usize },
    Delay(u32),
    Reset,
}

/// What the simulated coprocessor does when it executes a particular
/// opcode.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Effect {
    /// Writes `value` into the ring, `word` words after the opcode.
    Result { word: u32, value: u32 },
    /// Writes `value` to an arbitrary address.
    Poke { addr: u32, value: u32 },
}

#[derive(Debug, Clone, Copy)]
struct Map {
    ram_cmd: u32,
    id: u32,
    cpureset: u32,
    cmd_read: u32,
    cmd_write: u32,
    cmdb_write: Option<u32>,
    cmdb_space: Option<u32>,
}

struct State {
    map: Map,
    mem: HashMap<u32, u8>,

    selected: bool,
    header: Vec<u8>,
    data: Vec<u8>,
    read_len: usize,

    rp: u32,
    wp: u32,
    busy_polls: u32,
    polls_left: u32,
    fault: bool,
    in_reset: bool,
    id_polls: u32,
    reset_polls: u32,
    effects: Vec<(u32, Effect)>,

    transfer_pending: bool,
    auto_complete: Option<&'static TransferMailbox>,
    log: Vec<Op>,
}

#[derive(Clone)]
pub(crate) struct FakeDevice(Rc<RefCell<State>>);

impl FakeDevice {
    pub(crate) fn new<M: Model>() -> Self {
        let reg = |r: Register| M::register(r).unwrap_or(u32::MAX);
        let map = Map {
            ram_cmd: <M::CommandMem as MemoryRegion>::BASE_ADDR,
            id: reg(Register::ID),
            cpureset: reg(Register::CPURESET),
            cmd_read: reg(Register::CMD_READ),
            cmd_write: reg(Register::CMD_WRITE),
            cmdb_write: M::register(Register::CMDB_WRITE),
            cmdb_space: M::register(Register::CMDB_SPACE),
        };
        Self(Rc::new(RefCell::new(State {
            map,
            mem: HashMap::new(),
            selected: false,
            header: Vec::new(),
            data: Vec::new(),
            read_len: 0,
            rp: 0,
            wp: 0,
            busy_polls: 0,
            polls_left: 0,
            fault: false,
            in_reset: false,
            id_polls: 0,
            reset_polls: 0,
            effects: Vec::new(),
            transfer_pending: false,
            auto_complete: None,
            log: Vec::new(),
        })))
    }

    /// Sets how many status polls report "busy" after new commands arrive
    /// before the simulated coprocessor drains the FIFO.
    pub(crate) fn with_busy_polls(self, n: u32) -> Self {
        self.0.borrow_mut().busy_polls = n;
        self
    }

    /// Sets how many reads of `REG_ID` and `REG_CPURESET` report "not ready"
    /// before the chip appears booted.
    pub(crate) fn with_boot_delay(self, id_polls: u32, reset_polls: u32) -> Self {
        {
            let mut s = self.0.borrow_mut();
            s.id_polls = id_polls;
            s.reset_polls = reset_polls;
        }
        self
    }

    pub(crate) fn on_command(&self, opcode: u32, effect: Effect) {
        self.0.borrow_mut().effects.push((opcode, effect));
    }

    pub(crate) fn inject_fault(&self) {
        self.0.borrow_mut().fault = true;
    }

    pub(crate) fn is_faulted(&self) -> bool {
        self.0.borrow().fault
    }

    /// Returns the coprocessor's read and write offsets.
    pub(crate) fn pointers(&self) -> (u32, u32) {
        let s = self.0.borrow();
        (s.rp, s.wp)
    }

    pub(crate) fn ops(&self) -> Vec<Op> {
        self.0.borrow().log.clone()
    }

    pub(crate) fn clear_log(&self) {
        self.0.borrow_mut().log.clear();
    }

    /// Returns only the write transactions, in order.
    pub(crate) fn writes(&self) -> Vec<(u32, Vec<u8>)> {
        self.0
            .borrow()
            .log
            .iter()
            .filter_map(|op| match op {
                Op::Write { addr, data } => Some((*addr, data.clone())),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn poke8(&self, addr: u32, v: u8) {
        self.0.borrow_mut().mem.insert(addr, v);
    }

    pub(crate) fn poke32(&self, addr: u32, v: u32) {
        self.0.borrow_mut().store(addr, &v.to_le_bytes());
    }

    pub(crate) fn peek32(&self, addr: u32) -> u32 {
        let s = self.0.borrow();
        let mut raw = [0u8; 4];
        for (i, b) in raw.iter_mut().enumerate() {
            *b = s.load(addr + i as u32);
        }
        u32::from_le_bytes(raw)
    }

    /// Reads `len` bytes of the command ring starting at `offset`.
    pub(crate) fn ring_bytes(&self, offset: u32, len: usize) -> Vec<u8> {
        let s = self.0.borrow();
        (0..len as u32)
            .map(|i| s.load(s.map.ram_cmd + ((offset + i) & RING_MASK)))
            .collect()
    }

    pub(crate) fn transfer_pending(&self) -> bool {
        self.0.borrow().transfer_pending
    }

    /// Plays the part of the DMA completion interrupt: releases
    /// chip-select and then posts to the mailbox.
    pub(crate) fn complete_transfer(&self, mailbox: &TransferMailbox) {
        let mut s = self.0.borrow_mut();
        assert!(s.transfer_pending, "no transfer in flight");
        s.transfer_pending = false;
        s.end_window();
        mailbox.post_complete();
    }

    /// Makes any in-flight transfer complete at the next delay.
    pub(crate) fn auto_complete(&self, mailbox: &'static TransferMailbox) {
        self.0.borrow_mut().auto_complete = Some(mailbox);
    }
}

impl State {
    fn load(&self, addr: u32) -> u8 {
        self.mem.get(&addr).copied().unwrap_or(0)
    }

    fn store(&mut self, addr: u32, v: &[u8]) {
        for (i, b) in v.iter().enumerate() {
            self.mem.insert(addr + i as u32, *b);
        }
    }

    fn load32(&self, addr: u32) -> u32 {
        let mut raw = [0u8; 4];
        for (i, b) in raw.iter_mut().enumerate() {
            *b = self.load(addr + i as u32);
        }
        u32::from_le_bytes(raw)
    }

    fn header_addr(&self) -> u32 {
        ((self.header[0] as u32 & 0x3f) << 16) | (self.header[1] as u32) << 8 | self.header[2] as u32
    }

    fn is_write(&self) -> bool {
        self.header.len() >= 3 && self.header[0] & 0x80 != 0
    }

    fn send(&mut self, b: u8) {
        assert!(self.selected, "byte sent without chip-select");
        if self.header.len() < 3 {
            self.header.push(b);
            return;
        }
        if self.is_write() {
            let addr = self.header_addr();
            if Some(addr) == self.map.cmdb_write {
                let at = self.map.ram_cmd + self.wp;
                self.mem.insert(at, b);
                self.wp = (self.wp + 1) & RING_MASK;
                self.polls_left = self.busy_polls;
            } else {
                let at = addr + self.data.len() as u32;
                self.mem.insert(at, b);
            }
            self.data.push(b);
        } else {
            assert_eq!(self.header.len(), 3, "extra bytes sent in a read");
            self.header.push(b);
            let addr = self.header_addr();
            self.materialize(addr);
        }
    }

    fn receive(&mut self) -> u8 {
        assert!(self.selected, "byte received without chip-select");
        assert_eq!(self.header.len(), 4, "read before address and dummy byte");
        let v = self.load(self.header_addr() + self.read_len as u32);
        self.read_len += 1;
        v
    }

    // Refreshes the memory behind the dynamic registers before a read.
    fn materialize(&mut self, addr: u32) {
        if Some(addr) == self.map.cmdb_space {
            self.status_poll();
            let v = if self.fault {
                0xfff
            } else {
                4092 - ((self.wp.wrapping_sub(self.rp)) & RING_MASK)
            };
            self.store(addr, &v.to_le_bytes());
        } else if addr == self.map.cmd_read {
            self.status_poll();
            let v = if self.fault { 0xfff } else { self.rp };
            self.store(addr, &v.to_le_bytes());
        } else if addr == self.map.cmd_write {
            let wp = self.wp;
            self.store(addr, &wp.to_le_bytes());
        } else if addr == self.map.id {
            let v = if self.id_polls > 0 {
                self.id_polls -= 1;
                0
            } else {
                0x7c
            };
            self.mem.insert(addr, v);
        } else if addr == self.map.cpureset {
            let v = if self.reset_polls > 0 {
                self.reset_polls -= 1;
                7
            } else {
                self.in_reset as u8
            };
            self.mem.insert(addr, v);
        }
    }

    fn status_poll(&mut self) {
        if self.fault || self.rp == self.wp {
            return;
        }
        if self.polls_left > 0 {
            self.polls_left -= 1;
        } else {
            self.drain();
        }
    }

    // Executes everything between the read and write offsets.
    fn drain(&mut self) {
        let mut p = self.rp;
        while p != self.wp {
            let word = self.load32(self.map.ram_cmd + p);
            let hits: Vec<Effect> = self
                .effects
                .iter()
                .filter(|(op, _)| *op == word)
                .map(|(_, e)| *e)
                .collect();
            for effect in hits {
                match effect {
                    Effect::Result { word, value } => {
                        let at = self.map.ram_cmd + ((p + word * 4) & RING_MASK);
                        self.store(at, &value.to_le_bytes());
                    }
                    Effect::Poke { addr, value } => self.store(addr, &value.to_le_bytes()),
                }
            }
            p = (p + 4) & RING_MASK;
        }
        self.rp = self.wp;
    }

    fn end_window(&mut self) {
        let op = if self.header.len() == 3 && !self.is_write() {
            Some(Op::HostCmd {
                cmd: self.header[0],
                param: self.header[1],
            })
        } else if self.is_write() {
            let addr = self.header_addr();
            self.register_written(addr);
            Some(Op::Write {
                addr,
                data: core::mem::take(&mut self.data),
            })
        } else if self.header.len() == 4 {
            Some(Op::Read {
                addr: self.header_addr(),
                len: self.read_len,
            })
        } else {
            None
        };
        if let Some(op) = op {
            self.log.push(op);
        }
        self.selected = false;
        self.header.clear();
        self.data.clear();
        self.read_len = 0;
    }

    fn register_written(&mut self, addr: u32) {
        if addr == self.map.cpureset {
            let v = self.load(addr);
            if v & 1 != 0 {
                self.in_reset = true;
            } else if self.in_reset {
                self.in_reset = false;
                self.fault = false;
            }
        } else if addr == self.map.cmd_read {
            self.rp = self.load32(addr) & RING_MASK;
        } else if addr == self.map.cmd_write {
            self.wp = self.load32(addr) & RING_MASK;
            self.polls_left = self.busy_polls;
        }
    }
}

impl Transport for FakeDevice {
    type Error = core::convert::Infallible;

    fn select(&mut self) -> Result<(), Self::Error> {
        let mut s = self.0.borrow_mut();
        assert!(!s.selected, "chip-select asserted twice");
        assert!(!s.transfer_pending, "bus used during a transfer");
        s.selected = true;
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        let mut s = self.0.borrow_mut();
        assert!(s.selected, "chip-select released twice");
        assert!(!s.transfer_pending, "bus used during a transfer");
        s.end_window();
        Ok(())
    }

    fn send_byte(&mut self, v: u8) -> Result<(), Self::Error> {
        let mut s = self.0.borrow_mut();
        assert!(!s.transfer_pending, "bus used during a transfer");
        s.send(v);
        Ok(())
    }

    fn receive_byte(&mut self) -> Result<u8, Self::Error> {
        let mut s = self.0.borrow_mut();
        assert!(!s.transfer_pending, "bus used during a transfer");
        Ok(s.receive())
    }

    fn delay_ms(&mut self, ms: u32) {
        let mut s = self.0.borrow_mut();
        s.log.push(Op::Delay(ms));
        if s.transfer_pending {
            if let Some(mailbox) = s.auto_complete {
                s.transfer_pending = false;
                s.end_window();
                mailbox.post_complete();
            }
        }
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().log.push(Op::Reset);
        Ok(())
    }
}

impl AsyncTransport for FakeDevice {
    fn start_transfer(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        let mut s = self.0.borrow_mut();
        assert!(s.selected, "transfer started without chip-select");
        assert!(!s.transfer_pending, "overlapping transfers");
        s.log.push(Op::Transfer { len: buf.len() });
        for b in buf {
            s.send(*b);
        }
        s.transfer_pending = true;
        Ok(())
    }
}
