use crate::{BusAddress, MemoryAddress, PageSize};
use core::fmt;

/// ARM physical address.
///
/// A thin wrapper around [`MemoryAddress`] for addresses as the CPU sees them,
/// i.e. the offset handed to `mmap` on `/dev/mem`. Keeps physical and
/// [bus](BusAddress) values from being mixed up.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(pub(crate) MemoryAddress);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

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

    /// Widen for use as an `mmap` file offset.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u32() as u64
    }

    #[inline]
    #[must_use]
    pub const fn is_aligned(self, page: PageSize) -> bool {
        self.0.is_aligned(page)
    }

    /// The bus address of a peripheral register at this physical address.
    ///
    /// Adds `register_base` with wrapping semantics; the VideoCore bus is
    /// 32 bits wide.
    #[inline]
    #[must_use]
    pub const fn to_peripheral_bus(self, register_base: u32) -> BusAddress {
        BusAddress::new(self.as_u32().wrapping_add(register_base))
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:08X})", self.as_u32())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u32> for PhysicalAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}
