//! # Device Memory Mappings
//!
//! The lowest layer: turn a physical range behind a memory device file into a
//! pointer in this process, and give it back.
//!
//! [`MemoryDevice`] is the seam between regions and the OS. [`DevMem`] does
//! the real `open` + `mmap(MAP_SHARED)` + `close`; tests substitute a device
//! backed by heap memory.
//!
//! A [`MappedRegion`] owns exactly one mapping. It has no `Drop`: releasing
//! needs the device that created it, so the owning region calls
//! [`MappedRegion::release`] on every exit path.

use crate::register::{Reg, RegisterCell};
use crate::{AccessError, RegionError};
use log::debug;
use pimem_addresses::{PhysicalAddress, VirtualAddress};
use pimem_info::devices::{MEM_DEV_DEFAULT, MEM_DEV_GPIO};
use std::fs::OpenOptions;
use std::io;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

/// Maps physical ranges of a device file into the process.
pub trait MemoryDevice {
    /// Map `len` bytes of `device` starting at `physical`.
    ///
    /// # Errors
    /// [`RegionError::Open`] if the device cannot be opened,
    /// [`RegionError::Map`] if the mapping call fails.
    fn map(
        &self,
        device: &Path,
        physical: PhysicalAddress,
        len: usize,
    ) -> Result<NonNull<u8>, RegionError>;

    /// Release a mapping.
    ///
    /// # Errors
    /// Any OS-level failure of the release call.
    ///
    /// # Safety
    /// `base` and `len` must come from one earlier [`map`](Self::map) call on
    /// this device that was not released yet. No reference into the range may
    /// outlive this call.
    unsafe fn unmap(&self, base: NonNull<u8>, len: usize) -> io::Result<()>;
}

/// `mmap` on a memory device file.
#[derive(Copy, Clone, Debug, Default)]
pub struct DevMem;

impl MemoryDevice for DevMem {
    fn map(
        &self,
        device: &Path,
        physical: PhysicalAddress,
        len: usize,
    ) -> Result<NonNull<u8>, RegionError> {
        let map_error = |source: io::Error| RegionError::Map {
            device: device.to_path_buf(),
            physical,
            len,
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(device)
            .map_err(|source| RegionError::Open {
                device: device.to_path_buf(),
                source,
            })?;

        let offset = libc::off_t::try_from(physical.as_u64())
            .map_err(|_| map_error(io::Error::from(io::ErrorKind::InvalidInput)))?;

        // SAFETY: a fresh shared mapping; the kernel picks the address.
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                offset,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(map_error(io::Error::last_os_error()));
        }

        // The mapping keeps the memory reachable; the descriptor is not needed.
        drop(file);

        NonNull::new(base.cast::<u8>())
            .ok_or_else(|| map_error(io::Error::from(io::ErrorKind::AddrNotAvailable)))
    }

    unsafe fn unmap(&self, base: NonNull<u8>, len: usize) -> io::Result<()> {
        // SAFETY: caller guarantees `base`/`len` describe a live mapping of ours.
        if unsafe { libc::munmap(base.as_ptr().cast(), len) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Which device file a peripheral is mapped through.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MemDevice {
    /// `/dev/mem`: any physical address, requires root.
    Full,
    /// `/dev/gpiomem`: the GPIO block only, no root needed.
    Gpio,
    /// Any other device file.
    Path(PathBuf),
}

impl MemDevice {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Full => Path::new(MEM_DEV_DEFAULT),
            Self::Gpio => Path::new(MEM_DEV_GPIO),
            Self::Path(path) => path,
        }
    }
}

/// One live mapping.
#[derive(Debug)]
pub struct MappedRegion {
    base: NonNull<u8>,
    len: usize,
}

impl MappedRegion {
    /// Map `len` bytes at `physical` through `device`.
    ///
    /// # Errors
    /// See [`MemoryDevice::map`].
    pub fn map<M>(
        mapper: &M,
        device: &Path,
        physical: PhysicalAddress,
        len: usize,
    ) -> Result<Self, RegionError>
    where
        M: MemoryDevice + ?Sized,
    {
        let base = mapper.map(device, physical, len)?;
        debug!(
            "mapped {len:#x} bytes at {physical} from {} to {base:p}",
            device.display()
        );
        Ok(Self { base, len })
    }

    /// Give the mapping back.
    ///
    /// The mapping is gone from this side even when the OS reports an error;
    /// it is never released twice.
    ///
    /// # Errors
    /// [`RegionError::Unmap`] if the OS refused.
    pub fn release<M>(self, mapper: &M) -> Result<(), RegionError>
    where
        M: MemoryDevice + ?Sized,
    {
        debug!("unmapping {:#x} bytes at {:p}", self.len, self.base);
        // SAFETY: `self` is consumed; the pair came from `mapper.map`.
        unsafe { mapper.unmap(self.base, self.len) }.map_err(RegionError::Unmap)
    }

    #[must_use]
    pub const fn base(&self) -> VirtualAddress {
        VirtualAddress::from_nonnull(self.base)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 32-bit register at `offset` bytes from the base.
    ///
    /// # Errors
    /// [`AccessError::OutOfRange`] or [`AccessError::Misaligned`].
    pub fn reg32(&self, offset: usize) -> Result<Reg<'_, u32>, AccessError> {
        self.reg(offset)
    }

    /// Single byte at `offset` bytes from the base.
    ///
    /// # Errors
    /// [`AccessError::OutOfRange`].
    pub fn reg8(&self, offset: usize) -> Result<Reg<'_, u8>, AccessError> {
        self.reg(offset)
    }

    fn reg<T: RegisterCell>(&self, offset: usize) -> Result<Reg<'_, T>, AccessError> {
        let width = size_of::<T>();
        if offset.checked_add(width).is_none_or(|end| end > self.len) {
            return Err(AccessError::OutOfRange {
                offset,
                width,
                size: self.len,
            });
        }
        if !(self.base.as_ptr().addr() + offset).is_multiple_of(align_of::<T>()) {
            return Err(AccessError::Misaligned { offset, width });
        }

        // SAFETY: `offset + width <= len`, so the cell lies inside the mapping.
        let cell = unsafe { self.base.add(offset) }.cast::<T>();
        Ok(Reg::new(cell))
    }
}
