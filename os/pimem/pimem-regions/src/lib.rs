//! # Mapped Memory Regions
//!
//! Process-visible windows onto Raspberry Pi physical memory.
//!
//! Two kinds of region share the [`Region`] trait:
//!
//! - [`PeripheralRegion`] maps a fixed physical range, usually a peripheral
//!   register block, through `/dev/mem` or `/dev/gpiomem`.
//! - [`UncachedRegion`] borrows memory from the VideoCore over the mailbox and
//!   maps it through `/dev/mem`. Such memory bypasses the ARM caches and is
//!   what DMA control blocks and buffers live in.
//!
//! Once mapped, both hand out bounds-checked volatile cells via
//! [`Region::reg32`] and [`Region::reg8`].
//!
//! ```no_run
//! use pimem_addresses::PhysicalAddress;
//! use pimem_regions::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut gpio = PeripheralRegion::new(0xB4)?;
//! gpio.map(PeripheralMapping::gpio(PhysicalAddress::new(0x3F20_0000)))?;
//! let level = gpio.reg32(0x34)?.read();
//! # let _ = level;
//!
//! let hardware = HardwareContext::detect();
//! let mut buffer = UncachedRegion::new(&hardware, 10)?;
//! buffer.map(UncachedFlags::DIRECT | UncachedFlags::ZERO)?;
//! buffer.reg32(0)?.write(0xDEAD_BEEF);
//! buffer.unmap()?;
//! # Ok(())
//! # }
//! ```
//!
//! Regions release everything they hold when dropped. Call
//! [`Region::unmap`] explicitly to observe teardown errors.

mod capability;
mod error;
mod flags;
mod mapping;
mod peripheral;
mod region;
mod register;
mod uncached;

pub use crate::capability::{
    Board, CapabilityError, CapabilityProbe, DeviceTreeProbe, HardwareContext,
};
pub use crate::error::{AccessError, RegionError};
pub use crate::flags::UncachedFlags;
pub use crate::mapping::{DevMem, MappedRegion, MemDevice, MemoryDevice};
pub use crate::peripheral::{PeripheralMapping, PeripheralRegion};
pub use crate::region::Region;
pub use crate::register::{Reg, RegisterCell};
pub use crate::uncached::{MemoryHandle, UncachedRegion};
