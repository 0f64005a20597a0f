use super::{memory_region, Model};
use crate::fifo::Direct;
use crate::memory;
use crate::registers::Register;

/// Device type representing the FT810, FT811, FT812 and FT813 models.
///
/// This type is used only at compile time as a type parameter. The FT81x
/// generation introduced the `REG_CMDB_WRITE` register, so commands are
/// appended with the [`Direct`](Direct) discipline.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FT81x;

impl Model for FT81x {
    type MainMem = MainMem;
    type RomMem = RomMem;
    type DisplayListMem = DisplayListMem;
    type RegisterMem = RegisterMem;
    type CommandMem = CommandMem;
    type Fifo = Direct;

    const DEBUG_NAME: &'static str = "FT81x";

    fn register(reg: Register) -> Option<u32> {
        match reg {
            Register::COPRO_PATCH_PTR | Register::FLASH_STATUS => None,
            _ => Some(0x302000 + reg.offset()),
        }
    }
}

memory_region!(MainMem, FT81x, 0x000000, 1024 * 1024, [memory::HostAccessible, memory::MainMem]);
memory_region!(RomMem, FT81x, 0x200000, 1024 * 1024, [memory::HostAccessible, memory::RomMem]);
memory_region!(DisplayListMem, FT81x, 0x300000, 8 * 1024, [memory::HostAccessible, memory::DisplayListMem]);
memory_region!(RegisterMem, FT81x, 0x302000, 4 * 1024, [memory::HostAccessible, memory::RegisterMem]);
memory_region!(CommandMem, FT81x, 0x308000, 4 * 1024, [memory::HostAccessible, memory::CommandMem]);
