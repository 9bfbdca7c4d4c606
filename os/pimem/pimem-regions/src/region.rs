use crate::mapping::MappedRegion;
use crate::register::Reg;
use crate::{AccessError, RegionError};
use pimem_addresses::{BusAddress, PhysicalAddress, VirtualAddress};
use std::fmt;

/// Capabilities shared by every kind of mapped memory region.
///
/// Addresses are only reported while the region is mapped. Register accessors
/// are provided on top of [`mapping`](Self::mapping) and behave the same for
/// every implementation.
pub trait Region {
    /// What [`map`](Self::map) needs to know.
    type Mapping;

    /// Map the region into this process.
    ///
    /// # Errors
    /// Implementation specific; a failed `map` always leaves the region in a
    /// state [`unmap`](Self::unmap) can clean up.
    fn map(&mut self, request: Self::Mapping) -> Result<(), RegionError>;

    /// Undo [`map`](Self::map). A no-op on a region that is not mapped.
    ///
    /// # Errors
    /// Only if a teardown step that was attempted failed.
    fn unmap(&mut self) -> Result<(), RegionError>;

    fn physical_address(&self) -> Option<PhysicalAddress>;

    fn bus_address(&self) -> Option<BusAddress>;

    /// Size in bytes, rounded up to whole pages at construction.
    fn size(&self) -> u32;

    /// The live mapping, if any.
    fn mapping(&self) -> Option<&MappedRegion>;

    fn virtual_address(&self) -> Option<VirtualAddress> {
        self.mapping().map(MappedRegion::base)
    }

    fn is_mapped(&self) -> bool {
        self.mapping().is_some()
    }

    /// 32-bit register at `offset` bytes into the region.
    ///
    /// # Errors
    /// [`AccessError::NotMapped`], [`AccessError::OutOfRange`] or
    /// [`AccessError::Misaligned`].
    fn reg32(&self, offset: usize) -> Result<Reg<'_, u32>, AccessError> {
        self.mapping().ok_or(AccessError::NotMapped)?.reg32(offset)
    }

    /// Byte at `offset` bytes into the region.
    ///
    /// # Errors
    /// [`AccessError::NotMapped`] or [`AccessError::OutOfRange`].
    fn reg8(&self, offset: usize) -> Result<Reg<'_, u8>, AccessError> {
        self.mapping().ok_or(AccessError::NotMapped)?.reg8(offset)
    }
}

/// Shared `Display` body: kind, size and the three addresses.
pub(crate) fn describe<R: Region + ?Sized>(
    region: &R,
    kind: &str,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    struct Opt<T>(Option<T>);
    impl<T: fmt::Display> fmt::Display for Opt<T> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match &self.0 {
                Some(v) => fmt::Display::fmt(v, f),
                None => f.write_str("-"),
            }
        }
    }

    write!(
        f,
        "{kind}: {} bytes, phys {}, bus {}, virt {}",
        region.size(),
        Opt(region.physical_address()),
        Opt(region.bus_address()),
        Opt(region.virtual_address()),
    )
}
