//! # Physical, Bus and Virtual Address Types
//!
//! Strongly typed wrappers for the three address spaces a userspace mapping of
//! Raspberry Pi memory has to juggle.
//!
//! ## Overview
//!
//! | Type | Seen by | Description |
//! |------|---------|-------------|
//! | [`PhysicalAddress`] | ARM CPU | What `/dev/mem` expects as mapping offset. |
//! | [`BusAddress`] | VideoCore / DMA | Physical address plus a cache alias in bits 31–30. |
//! | [`VirtualAddress`] | this process | Result of `mmap`; opaque, never used for arithmetic. |
//!
//! Physical and bus addresses share the principal [`MemoryAddress`] type, a
//! 32-bit value, because the VideoCore mailbox only speaks 32-bit words.
//!
//! ## Translation
//!
//! ```rust
//! # use pimem_addresses::*;
//! let bus = BusAddress::new(0x5A00_0010);
//! assert_eq!(bus.to_physical(), PhysicalAddress::new(0x1A00_0010));
//!
//! let page = PageSize::new(4096).unwrap();
//! assert_eq!(page.round_up(10), Some(4096));
//! ```
//!
//! ## Page Size
//!
//! Unlike a kernel, userspace cannot assume 4 KiB pages: the size is a runtime
//! property of the host and is read via [`PageSize::host`].

#![cfg_attr(not(any(test, doctest)), no_std)]

mod bus_address;
mod page_size;
mod physical_address;
mod virtual_address;

pub use crate::bus_address::BusAddress;
pub use crate::page_size::PageSize;
pub use crate::physical_address::PhysicalAddress;
pub use crate::virtual_address::VirtualAddress;

use core::fmt;

/// Principal raw 32-bit address ([bus](BusAddress) or [physical](PhysicalAddress)).
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemoryAddress(u32);

impl MemoryAddress {
    #[inline]
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Whether the address sits on a `page` boundary.
    #[inline]
    #[must_use]
    pub const fn is_aligned(self, page: PageSize) -> bool {
        self.0 & (page.bytes() - 1) == 0
    }

    /// Align down to the enclosing `page` boundary.
    #[inline]
    #[must_use]
    pub const fn align_down(self, page: PageSize) -> Self {
        Self(self.0 & !(page.bytes() - 1))
    }

    /// The offset within the enclosing page.
    #[inline]
    #[must_use]
    pub const fn page_offset(self, page: PageSize) -> u32 {
        self.0 & (page.bytes() - 1)
    }
}

impl fmt::Debug for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryAddress(0x{:08X})", self.0)
    }
}

impl fmt::Display for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for MemoryAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

impl From<MemoryAddress> for u32 {
    #[inline]
    fn from(a: MemoryAddress) -> Self {
        a.as_u32()
    }
}
