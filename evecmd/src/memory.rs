//! Typed addresses in the EVE memory space.

pub mod region;

pub(crate) mod ptr;

#[doc(inline)]
pub use ptr::Ptr;

pub use region::*;
