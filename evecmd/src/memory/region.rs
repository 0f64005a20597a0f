use super::ptr::Ptr;
use crate::models::Model;
use core::marker::PhantomData;

/// A fixed span of the EVE address space, named by an uninhabited type.
///
/// Only the model types in this crate implement it. The regions of one
/// model never overlap.
pub trait MemoryRegion: Sized + Copy + core::fmt::Debug + 'static {
    type Model: Model;

    const BASE_ADDR: u32;
    const LENGTH: u32;
    const DEBUG_NAME: &'static str;

    /// Returns the pointer `raw` bytes into the region, wrapping at its end.
    #[inline]
    fn ptr(raw: u32) -> Ptr<Self> {
        Ptr {
            addr: Self::BASE_ADDR + (raw % Self::LENGTH),
            _region: PhantomData,
        }
    }
}

/// Graphics RAM.
pub trait MainMem: MemoryRegion + HostAccessible {}

pub trait RomMem: MemoryRegion + HostAccessible {}

pub trait DisplayListMem: MemoryRegion + HostAccessible {}

pub trait RegisterMem: MemoryRegion + HostAccessible {}

/// The command ring.
pub trait CommandMem: MemoryRegion + HostAccessible {}

/// External flash, which the host reaches only through coprocessor
/// commands.
pub trait ExtFlashMem: MemoryRegion {}

/// Regions the host can address directly in a bus transaction, which means
/// they fit in the 22-bit address frame.
pub trait HostAccessible: MemoryRegion {}
