//! Compile-time descriptions of the EVE chip generations.

mod bt81x;
mod ft80x;
mod ft81x;

pub use bt81x::BT81x;
pub use ft80x::FT80x;
pub use ft81x::FT81x;

use crate::fifo::CommandFifo;
use crate::memory;
use crate::registers::Register;

/// The BT815 and BT816 share their memory map with the rest of the BT81x
/// generation.
pub type BT815 = BT81x;

/// Implemented by types that represent the characteristics of different
/// specific models of EVE.
///
/// Although the Rust compiler would allow implementations of this elsewhere,
/// this trait is intended only for implementation inside this crate and its
/// requirements are subject to change in future, even in minor releases.
///
/// This type is typically implemented on empty types to represent that
/// models are a compile-time-only construct used to represent the
/// differences between models through monomorphization, and they have no
/// presence at runtime.
pub trait Model: Sized + 'static {
    type MainMem: memory::MainMem;
    type RomMem: memory::RomMem;
    type DisplayListMem: memory::DisplayListMem;
    type RegisterMem: memory::RegisterMem;
    type CommandMem: memory::CommandMem;

    /// The discipline this generation uses to append to the command FIFO.
    type Fifo: CommandFifo<Self>;

    /// Whether the coprocessor runs a patch from ROM that must be restored,
    /// along with the external flash attachment, after a fault.
    const HAS_COPRO_PATCH: bool = false;

    const DEBUG_NAME: &'static str;

    /// Returns the absolute address of the given register on this model,
    /// or `None` if this generation doesn't have it.
    fn register(reg: Register) -> Option<u32>;
}

/// Implemented by model types that have an external flash memory space.
pub trait WithExtFlashMem: Model {
    type ExtFlashMem: memory::ExtFlashMem;
}

/// Declares an uninhabited memory region type for a model.
macro_rules! memory_region {
    ($name:ident, $model:ty, $base:expr, $len:expr, [$($kind:path),*]) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        pub enum $name {}
        impl crate::memory::MemoryRegion for $name {
            type Model = $model;
            const BASE_ADDR: u32 = $base;
            const LENGTH: u32 = $len;
            const DEBUG_NAME: &'static str = stringify!($name);
        }
        $(impl $kind for $name {})*
    };
}
pub(crate) use memory_region;
