//! # Peripheral Regions
//!
//! A window onto a fixed physical range, typically a peripheral register
//! block, mapped through `/dev/mem` or `/dev/gpiomem`. There is no firmware
//! involvement: mapping is one `mmap`, unmapping one `munmap`.

use crate::mapping::{DevMem, MappedRegion, MemDevice, MemoryDevice};
use crate::region::{Region, describe};
use crate::RegionError;
use log::{info, warn};
use pimem_addresses::{BusAddress, PageSize, PhysicalAddress};
use pimem_info::bus::BUS_REGISTER_BASE;
use std::fmt;

/// Where to map a [`PeripheralRegion`] from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PeripheralMapping {
    pub physical: PhysicalAddress,
    pub device: MemDevice,
}

impl PeripheralMapping {
    #[must_use]
    pub const fn new(physical: PhysicalAddress, device: MemDevice) -> Self {
        Self { physical, device }
    }

    /// Through `/dev/mem`.
    #[must_use]
    pub const fn full(physical: PhysicalAddress) -> Self {
        Self::new(physical, MemDevice::Full)
    }

    /// Through `/dev/gpiomem`.
    #[must_use]
    pub const fn gpio(physical: PhysicalAddress) -> Self {
        Self::new(physical, MemDevice::Gpio)
    }
}

#[derive(Debug)]
struct Mapped {
    physical: PhysicalAddress,
    bus: BusAddress,
    mapping: MappedRegion,
}

/// Physical memory window.
#[derive(Debug)]
pub struct PeripheralRegion<M: MemoryDevice = DevMem> {
    size: u32,
    mapper: M,
    state: Option<Mapped>,
}

impl PeripheralRegion {
    /// A region of `size` bytes, rounded up to the host page size.
    ///
    /// # Errors
    /// [`RegionError::SizeOverflow`] if rounding does not fit 32 bits.
    pub fn new(size: u32) -> Result<Self, RegionError> {
        Self::with_mapper(size, PageSize::host(), DevMem)
    }
}

impl<M: MemoryDevice> PeripheralRegion<M> {
    /// A region mapped through `mapper`, with an explicit page size.
    ///
    /// # Errors
    /// [`RegionError::SizeOverflow`] if rounding does not fit 32 bits.
    pub fn with_mapper(size: u32, page: PageSize, mapper: M) -> Result<Self, RegionError> {
        let rounded = page
            .round_up(size)
            .ok_or(RegionError::SizeOverflow {
                requested: size,
                page,
            })?;
        Ok(Self {
            size: rounded,
            mapper,
            state: None,
        })
    }

    #[must_use]
    pub const fn mapper(&self) -> &M {
        &self.mapper
    }
}

impl<M: MemoryDevice> Region for PeripheralRegion<M> {
    type Mapping = PeripheralMapping;

    /// Map `size` bytes at `request.physical` from `request.device`.
    ///
    /// # Errors
    /// [`RegionError::AlreadyMapped`], [`RegionError::Open`] or
    /// [`RegionError::Map`]. The region stays unmapped on error.
    fn map(&mut self, request: PeripheralMapping) -> Result<(), RegionError> {
        if self.state.is_some() {
            return Err(RegionError::AlreadyMapped);
        }

        let PeripheralMapping { physical, device } = request;
        let mapping =
            MappedRegion::map(&self.mapper, device.path(), physical, self.size as usize)?;
        let bus = physical.to_peripheral_bus(BUS_REGISTER_BASE);

        info!(
            "peripheral {physical} (bus {bus}) mapped to {}",
            mapping.base()
        );
        self.state = Some(Mapped {
            physical,
            bus,
            mapping,
        });
        Ok(())
    }

    fn unmap(&mut self) -> Result<(), RegionError> {
        let Some(Mapped { physical, mapping, .. }) = self.state.take() else {
            return Ok(());
        };
        mapping.release(&self.mapper)?;
        info!("peripheral {physical} unmapped");
        Ok(())
    }

    fn physical_address(&self) -> Option<PhysicalAddress> {
        self.state.as_ref().map(|s| s.physical)
    }

    fn bus_address(&self) -> Option<BusAddress> {
        self.state.as_ref().map(|s| s.bus)
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn mapping(&self) -> Option<&MappedRegion> {
        self.state.as_ref().map(|s| &s.mapping)
    }
}

impl<M: MemoryDevice> Drop for PeripheralRegion<M> {
    fn drop(&mut self) {
        if let Err(e) = self.unmap() {
            warn!("failed to unmap peripheral region on drop: {e}");
        }
    }
}

impl<M: MemoryDevice> fmt::Display for PeripheralRegion<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        describe(self, "peripheral", f)
    }
}
