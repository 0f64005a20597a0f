use super::{memory_region, Model, WithExtFlashMem};
use crate::fifo::Direct;
use crate::memory;
use crate::registers::Register;

/// Device type representing the BT815, BT816, BT817 and BT818 models.
///
/// This type is used only at compile time as a type parameter. It shares
/// the FT81x memory map, and adds an external flash memory space plus a
/// coprocessor patch that has to be reinstated after a fault.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BT81x;

impl Model for BT81x {
    type MainMem = MainMem;
    type RomMem = RomMem;
    type DisplayListMem = DisplayListMem;
    type RegisterMem = RegisterMem;
    type CommandMem = CommandMem;
    type Fifo = Direct;

    const HAS_COPRO_PATCH: bool = true;
    const DEBUG_NAME: &'static str = "BT81x";

    fn register(reg: Register) -> Option<u32> {
        // REG_COPRO_PATCH_PTR lies beyond the 4kiB register file, so this
        // is a plain offset rather than a RegisterMem pointer.
        Some(0x302000 + reg.offset())
    }
}

impl WithExtFlashMem for BT81x {
    type ExtFlashMem = ExtFlashMem;
}

memory_region!(MainMem, BT81x, 0x000000, 1024 * 1024, [memory::HostAccessible, memory::MainMem]);
memory_region!(RomMem, BT81x, 0x200000, 1024 * 1024, [memory::HostAccessible, memory::RomMem]);
memory_region!(DisplayListMem, BT81x, 0x300000, 8 * 1024, [memory::HostAccessible, memory::DisplayListMem]);
memory_region!(RegisterMem, BT81x, 0x302000, 4 * 1024, [memory::HostAccessible, memory::RegisterMem]);
memory_region!(CommandMem, BT81x, 0x308000, 4 * 1024, [memory::HostAccessible, memory::CommandMem]);
memory_region!(ExtFlashMem, BT81x, 0x800000, 256 * 1024 * 1024, [memory::ExtFlashMem]);
