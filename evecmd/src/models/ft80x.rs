use super::{memory_region, Model};
use crate::fifo::Tracked;
use crate::memory;
use crate::registers::Register;

/// Device type representing the FT800 and FT801 models.
///
/// These predate `REG_CMDB_WRITE`, so the host has to track the command
/// FIFO write offset itself and address each write into `RAM_CMD`
/// directly. See [`Tracked`](Tracked).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FT80x;

impl Model for FT80x {
    type MainMem = MainMem;
    type RomMem = RomMem;
    type DisplayListMem = DisplayListMem;
    type RegisterMem = RegisterMem;
    type CommandMem = CommandMem;
    type Fifo = Tracked;

    const DEBUG_NAME: &'static str = "FT80x";

    fn register(reg: Register) -> Option<u32> {
        let offset = match reg {
            Register::ID => 0x00,
            Register::FREQUENCY => 0x0c,
            Register::CPURESET => 0x1c,
            Register::PCLK => 0x6c,
            Register::CMD_READ => 0xe4,
            Register::CMD_WRITE => 0xe8,
            Register::CMD_DL => 0xec,
            _ => return None,
        };
        Some(0x102400 + offset)
    }
}

memory_region!(MainMem, FT80x, 0x000000, 256 * 1024, [memory::HostAccessible, memory::MainMem]);
memory_region!(RomMem, FT80x, 0x0bb23c, 0x044dc4, [memory::HostAccessible, memory::RomMem]);
memory_region!(DisplayListMem, FT80x, 0x100000, 8 * 1024, [memory::HostAccessible, memory::DisplayListMem]);
memory_region!(RegisterMem, FT80x, 0x102400, 380, [memory::HostAccessible, memory::RegisterMem]);
memory_region!(CommandMem, FT80x, 0x108000, 4 * 1024, [memory::HostAccessible, memory::CommandMem]);
