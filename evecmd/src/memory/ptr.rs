use super::region::{HostAccessible, MemoryRegion};
use core::marker::PhantomData;

/// An absolute address that is known, at compile time, to lie in region `R`.
///
/// Commands that take an address argument accept only pointers into the
/// regions that make sense for them, so a display list address can't be
/// passed where graphics RAM is expected.
#[derive(Copy, Clone)]
pub struct Ptr<R: MemoryRegion> {
    pub(crate) addr: u32,
    pub(crate) _region: PhantomData<R>,
}

impl<R: MemoryRegion> Ptr<R> {
    /// Same as [`MemoryRegion::ptr`](MemoryRegion::ptr), with the region
    /// chosen by inference.
    #[inline]
    pub fn new(offset: u32) -> Self {
        R::ptr(offset)
    }

    #[inline]
    pub fn to_raw(self) -> u32 {
        self.addr
    }

    /// The distance from the start of the region.
    #[inline]
    pub fn to_raw_offset(self) -> u32 {
        self.addr - R::BASE_ADDR
    }
}

/// The three bytes that open a memory write on the bus: the top six address
/// bits with bit 7 set, then the middle and low address bytes.
#[inline]
pub(crate) fn write_header(addr: u32) -> [u8; 3] {
    [
        (((addr >> 16) & 0x3f) | 0x80) as u8,
        (addr >> 8) as u8,
        addr as u8,
    ]
}

/// The bytes that open a memory read: the address with bit 7 clear, and then
/// the dummy byte clocked out before the chip starts answering.
#[inline]
pub(crate) fn read_header(addr: u32) -> [u8; 4] {
    [((addr >> 16) & 0x3f) as u8, (addr >> 8) as u8, addr as u8, 0]
}

// Pointer arithmetic stays inside the region, so stepping back from the
// command ring write offset wraps at 4096.
impl<R: MemoryRegion> core::ops::Add<u32> for Ptr<R> {
    type Output = Self;

    fn add(self, offset: u32) -> Self {
        R::ptr(self.to_raw_offset().wrapping_add(offset % R::LENGTH))
    }
}

impl<R: MemoryRegion> core::ops::Sub<u32> for Ptr<R> {
    type Output = Self;

    fn sub(self, offset: u32) -> Self {
        R::ptr(self.to_raw_offset() + R::LENGTH - offset % R::LENGTH)
    }
}

impl<R: MemoryRegion> PartialEq for Ptr<R> {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl<R: MemoryRegion> Eq for Ptr<R> {}

impl<R: MemoryRegion> PartialOrd for Ptr<R> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<R: MemoryRegion> Ord for Ptr<R> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.addr.cmp(&other.addr)
    }
}

impl<R: MemoryRegion> core::fmt::Debug for Ptr<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}+{:#x}", R::DEBUG_NAME, self.to_raw_offset())
    }
}

impl<R: MemoryRegion + HostAccessible> From<Ptr<R>> for u32 {
    #[inline]
    fn from(ptr: Ptr<R>) -> u32 {
        ptr.addr
    }
}
