use crate::{MemoryAddress, PhysicalAddress};
use core::fmt;
use pimem_info::bus::BUS_ALIAS_MASK;

/// VideoCore bus address.
///
/// The address a DMA engine or the GPU uses to reach memory. Bits 31–30 select
/// the cache alias:
///
/// | Alias | Bits 31–30 | Caching |
/// |-------|-----------|---------|
/// | `0x0` | `00` | L1 and L2 cached |
/// | `0x4` | `01` | L2 cache coherent |
/// | `0x8` | `10` | L2 cached only |
/// | `0xC` | `11` | direct, uncached |
///
/// ### Examples
/// ```rust
/// # use pimem_addresses::*;
/// let bus = BusAddress::new(0xC000_1000);
/// assert_eq!(bus.alias(), 0b11);
/// assert_eq!(bus.to_physical().as_u32(), 0x1000);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BusAddress(pub(crate) MemoryAddress);

impl BusAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(MemoryAddress::new(v))
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0.as_u32()
    }

    /// The two alias bits (31–30), shifted down.
    #[inline]
    #[must_use]
    pub const fn alias(self) -> u32 {
        (self.as_u32() & BUS_ALIAS_MASK) >> BUS_ALIAS_MASK.trailing_zeros()
    }

    /// Strip the alias bits, yielding the ARM physical address.
    #[inline]
    #[must_use]
    pub const fn to_physical(self) -> PhysicalAddress {
        PhysicalAddress::new(self.as_u32() & !BUS_ALIAS_MASK)
    }
}

impl fmt::Debug for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BA(0x{:08X})", self.as_u32())
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u32> for BusAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}
