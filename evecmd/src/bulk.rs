//! Pushing large payloads through the command FIFO.
//!
//! Commands such as `CMD_MEMWRITE`, `CMD_INFLATE` and `CMD_FLASHWRITE` are
//! followed by their payload inline in the command FIFO, which is far
//! smaller than a typical image or flash blob. The payload is therefore sent
//! in chunks: each chunk is its own record, and outside of a burst the
//! coprocessor must consume one chunk before the next is sent.

use crate::burst::BurstMode;
use crate::commands::waiter::Waiter;
use crate::commands::{opcode, Coprocessor, Result};
use crate::config::Config;
use crate::error::Error;
use crate::memory::Ptr;
use crate::models::{Model, WithExtFlashMem};
use crate::transport::Transport;

/// Splits a payload length into chunk lengths.
///
/// The chunk maximum is rounded down to a multiple of the alignment (but is
/// never less than one alignment unit). Every chunk but the last is exactly
/// that maximum, and the last carries the remainder.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ChunkPlan {
    remaining: u32,
    max: u32,
}

impl ChunkPlan {
    pub fn new(len: u32, max: u32, align: u32) -> Self {
        let align = align.max(1);
        let max = (max / align * align).max(align);
        Self {
            remaining: len,
            max,
        }
    }

    /// The effective chunk maximum.
    pub fn chunk_max(&self) -> u32 {
        self.max
    }

    /// The number of chunks still to come.
    pub fn remaining_chunks(&self) -> u32 {
        self.remaining / self.max + (self.remaining % self.max != 0) as u32
    }
}

impl Iterator for ChunkPlan {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let n = self.remaining.min(self.max);
        self.remaining -= n;
        Some(n)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining_chunks() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChunkPlan {}

/// What the payload of a bulk transfer is destined for, which decides how
/// the chunks must be aligned.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferTarget {
    /// Main memory, or anything else that takes whole words.
    Memory,
    /// Flash programming, which works in blocks of
    /// [`Config::flash_align`](Config::flash_align) bytes.
    Flash,
}

impl TransferTarget {
    pub fn align(self, config: &Config) -> u32 {
        match self {
            Self::Memory => 4,
            Self::Flash => config.get_flash_align(),
        }
    }
}

/// Bulk transfers. These block between chunks unless called during a burst.
impl<M, T, B, W> Coprocessor<M, T, B, W>
where
    M: Model,
    T: Transport,
    B: BurstMode<T>,
    W: Waiter,
{
    /// Sends the payload of a command that was just appended.
    ///
    /// Each chunk is written behind its own address frame, padded with zeros
    /// to a word boundary. Outside of a burst the coprocessor then has to
    /// execute everything before the next chunk is sent; during a burst the
    /// chunks are streamed one after another.
    ///
    /// A `None` payload sends nothing, for commands whose data comes from
    /// elsewhere (such as the media FIFO or flash).
    pub fn transfer(&mut self, payload: Option<&[u8]>, target: TransferTarget) -> Result<(), T> {
        const ZEROS: [u8; 4] = [0; 4];
        let data = match payload {
            Some(data) => data,
            None => return Ok(()),
        };
        let align = target.align(self.config());
        let plan = ChunkPlan::new(data.len() as u32, self.config().get_chunk_max(), align);
        tracing::debug!(len = data.len(), chunks = plan.remaining_chunks(), "bulk transfer");

        let mut rest = data;
        for n in plan {
            let (chunk, tail) = rest.split_at(n as usize);
            rest = tail;
            let padded = (n + 3) & !3;
            self.write_stream(padded, |cp| {
                cp.write_bytes(chunk)?;
                cp.write_bytes(&ZEROS[..(padded - n) as usize])
            })?;
            if !self.in_burst() {
                self.execute()?;
            }
        }
        Ok(())
    }

    /// Copies `data` into main memory at `ptr` using `CMD_MEMWRITE`.
    pub fn mem_write(&mut self, ptr: Ptr<M::MainMem>, data: &[u8]) -> Result<(), T> {
        self.append(opcode::MEMWRITE, &[ptr.to_raw(), data.len() as u32])?;
        self.transfer(Some(data), TransferTarget::Memory)
    }

    /// Decompresses a zlib stream into main memory at `ptr` using
    /// `CMD_INFLATE`.
    pub fn inflate(&mut self, ptr: Ptr<M::MainMem>, data: &[u8]) -> Result<(), T> {
        self.append(opcode::INFLATE, &[ptr.to_raw()])?;
        self.transfer(Some(data), TransferTarget::Memory)
    }

    /// Decodes a JPEG or PNG image into main memory at `ptr` using
    /// `CMD_LOADIMAGE`.
    ///
    /// Pass `None` as the data along with
    /// [`options::MEDIAFIFO`](crate::commands::options::MEDIAFIFO) or
    /// [`options::FLASH`](crate::commands::options::FLASH) when the image
    /// comes from somewhere else.
    pub fn load_image(
        &mut self,
        ptr: Ptr<M::MainMem>,
        options: u32,
        data: Option<&[u8]>,
    ) -> Result<(), T> {
        self.append(opcode::LOADIMAGE, &[ptr.to_raw(), options])?;
        self.transfer(data, TransferTarget::Memory)
    }

    /// Programs `data` into erased external flash at `ptr` using
    /// `CMD_FLASHWRITE`.
    ///
    /// Both the address and the length must be multiples of the flash
    /// alignment, otherwise this returns
    /// [`Error::Unsupported`](Error::Unsupported) without sending anything.
    pub fn flash_write(&mut self, ptr: Ptr<M::ExtFlashMem>, data: &[u8]) -> Result<(), T>
    where
        M: WithExtFlashMem,
    {
        let align = TransferTarget::Flash.align(self.config());
        let addr = ptr.to_raw_offset();
        if addr % align != 0 || data.len() as u32 % align != 0 {
            return Err(Error::Unsupported);
        }
        self.append(opcode::FLASHWRITE, &[addr, data.len() as u32])?;
        self.transfer(Some(data), TransferTarget::Flash)
    }
}
