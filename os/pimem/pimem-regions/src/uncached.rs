//! # Uncached VideoCore Memory
//!
//! Memory owned by the VideoCore, handed to this process in four steps over
//! the mailbox:
//!
//! ```text
//!   allocate ──▶ lock ──▶ mmap          (map)
//!   unlock + munmap ──▶ free ──▶ close  (unmap)
//! ```
//!
//! `map` stops at the first failing step and keeps whatever it acquired;
//! `unmap` releases exactly what is held, in reverse order, so it is safe after
//! any partial `map`. A failing teardown step leaves the remaining resources in
//! place for a later `unmap` to retry.

use crate::capability::HardwareContext;
use crate::flags::UncachedFlags;
use crate::mapping::{DevMem, MappedRegion, MemDevice, MemoryDevice};
use crate::region::{Region, describe};
use crate::RegionError;
use log::{debug, info, warn};
use pimem_addresses::{BusAddress, PhysicalAddress};
use pimem_mailbox::{MailboxChannel, MailboxOpener, Tag, Vcio};
use std::fmt;
use std::num::NonZeroU32;

/// Opaque VideoCore memory handle.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct MemoryHandle(NonZeroU32);

impl MemoryHandle {
    /// `None` for the zero handle the firmware returns on refusal.
    #[must_use]
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for MemoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryHandle({:#x})", self.get())
    }
}

impl fmt::Display for MemoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.get())
    }
}

#[derive(Debug)]
struct Locked {
    bus: BusAddress,
    physical: PhysicalAddress,
    mapping: Option<MappedRegion>,
}

/// Uncached memory borrowed from the VideoCore.
pub struct UncachedRegion<'ctx, M = DevMem, O = Vcio>
where
    M: MemoryDevice,
    O: MailboxOpener,
{
    hardware: &'ctx HardwareContext,
    size: u32,
    mapper: M,
    opener: O,
    channel: MailboxChannel<O::Device>,
    handle: Option<MemoryHandle>,
    locked: Option<Locked>,
}

impl<'ctx> UncachedRegion<'ctx> {
    /// A region of `size` bytes, rounded up to the context's page size.
    ///
    /// Nothing is acquired until [`map`](Region::map).
    ///
    /// # Errors
    /// [`RegionError::SizeOverflow`] if rounding does not fit 32 bits.
    pub fn new(hardware: &'ctx HardwareContext, size: u32) -> Result<Self, RegionError> {
        Self::with_devices(hardware, size, DevMem, Vcio::new())
    }
}

impl<'ctx, M, O> UncachedRegion<'ctx, M, O>
where
    M: MemoryDevice,
    O: MailboxOpener,
{
    /// # Errors
    /// [`RegionError::SizeOverflow`] if rounding does not fit 32 bits.
    pub fn with_devices(
        hardware: &'ctx HardwareContext,
        size: u32,
        mapper: M,
        opener: O,
    ) -> Result<Self, RegionError> {
        let page = hardware.page_size();
        let rounded = page.round_up(size).ok_or(RegionError::SizeOverflow {
            requested: size,
            page,
        })?;
        Ok(Self {
            hardware,
            size: rounded,
            mapper,
            opener,
            channel: MailboxChannel::closed(),
            handle: None,
            locked: None,
        })
    }

    /// The VideoCore handle, while allocated.
    #[must_use]
    pub const fn handle(&self) -> Option<MemoryHandle> {
        self.handle
    }

    #[must_use]
    pub const fn is_channel_open(&self) -> bool {
        self.channel.is_open()
    }

    /// Whether any resource is held that [`unmap`](Region::unmap) would release.
    #[must_use]
    pub const fn holds_resources(&self) -> bool {
        self.handle.is_some() || self.locked.is_some() || self.channel.is_open()
    }

    fn allocate(&mut self, flags: UncachedFlags) -> Result<MemoryHandle, RegionError> {
        if self.handle.is_some() {
            return Err(RegionError::AlreadyAllocated);
        }

        let align = self.hardware.page_size().bytes();
        let reply = self
            .channel
            .transact(Tag::AllocateMemory, &[self.size, align, flags.bits()])
            .map_err(RegionError::Allocate)?;

        let handle = MemoryHandle::new(reply.word(0))
            .ok_or(RegionError::AllocationRefused { size: self.size })?;
        debug!("allocated {:#x} bytes as handle {handle} ({flags:?})", self.size);
        self.handle = Some(handle);
        Ok(handle)
    }

    fn lock(&mut self, handle: MemoryHandle) -> Result<(), RegionError> {
        if self.locked.is_some() {
            return Err(RegionError::AlreadyLocked);
        }

        let reply = self
            .channel
            .transact(Tag::LockMemory, &[handle.get()])
            .map_err(RegionError::Lock)?;

        let bus = match reply.word(0) {
            0 => return Err(RegionError::LockRefused { handle }),
            raw => BusAddress::new(raw),
        };
        let physical = bus.to_physical();
        debug!("locked handle {handle} at bus {bus}, phys {physical}");

        let locked = self.locked.insert(Locked {
            bus,
            physical,
            mapping: None,
        });
        locked.mapping = Some(MappedRegion::map(
            &self.mapper,
            MemDevice::Full.path(),
            physical,
            self.size as usize,
        )?);
        Ok(())
    }

    fn unlock(&mut self, handle: MemoryHandle) -> Result<(), RegionError> {
        let reply = self
            .channel
            .transact(Tag::UnlockMemory, &[handle.get()])
            .map_err(RegionError::Unlock)?;
        expect_zero(Tag::UnlockMemory, reply.word(0))?;

        if let Some(Locked { mapping, .. }) = self.locked.take()
            && let Some(mapping) = mapping
        {
            mapping.release(&self.mapper)?;
        }
        debug!("unlocked handle {handle}");
        Ok(())
    }

    fn free(&mut self, handle: MemoryHandle) -> Result<(), RegionError> {
        let reply = self
            .channel
            .transact(Tag::ReleaseMemory, &[handle.get()])
            .map_err(RegionError::Free)?;
        expect_zero(Tag::ReleaseMemory, reply.word(0))?;

        self.handle = None;
        debug!("freed handle {handle}");
        Ok(())
    }
}

fn expect_zero(tag: Tag, word: u32) -> Result<(), RegionError> {
    if word == 0 {
        Ok(())
    } else {
        Err(RegionError::FreeMailboxMismatch { tag, word })
    }
}

impl<M, O> Region for UncachedRegion<'_, M, O>
where
    M: MemoryDevice,
    O: MailboxOpener,
{
    type Mapping = UncachedFlags;

    /// Open the mailbox, allocate, lock and map.
    ///
    /// # Errors
    /// - [`RegionError::Capability`] if the board does not support uncached memory.
    /// - [`RegionError::ChannelOpen`] if the mailbox cannot be opened.
    /// - [`RegionError::AlreadyAllocated`], [`RegionError::Allocate`] or
    ///   [`RegionError::AllocationRefused`] from the allocate step.
    /// - [`RegionError::AlreadyLocked`], [`RegionError::Lock`] or
    ///   [`RegionError::LockRefused`] from the lock step.
    /// - [`RegionError::Open`] or [`RegionError::Map`] from the final mapping.
    fn map(&mut self, flags: UncachedFlags) -> Result<(), RegionError> {
        self.hardware.board()?;

        self.channel
            .open(&self.opener)
            .map_err(RegionError::ChannelOpen)?;

        let handle = self.allocate(flags)?;
        self.lock(handle)?;

        info!("{self}");
        Ok(())
    }

    /// Unlock, free and close, skipping whatever was never acquired.
    ///
    /// # Errors
    /// The first failing step; later steps are not attempted.
    fn unmap(&mut self) -> Result<(), RegionError> {
        if let Some(handle) = self.handle {
            if self.locked.is_some() {
                self.unlock(handle)?;
            }
            self.free(handle)?;
        } else if let Some(Locked {
            mapping: Some(mapping),
            ..
        }) = self.locked.take()
        {
            mapping.release(&self.mapper)?;
        }

        self.channel.close().map_err(RegionError::ChannelClose)
    }

    fn physical_address(&self) -> Option<PhysicalAddress> {
        self.locked.as_ref().map(|l| l.physical)
    }

    fn bus_address(&self) -> Option<BusAddress> {
        self.locked.as_ref().map(|l| l.bus)
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn mapping(&self) -> Option<&MappedRegion> {
        self.locked.as_ref().and_then(|l| l.mapping.as_ref())
    }
}

impl<M, O> Drop for UncachedRegion<'_, M, O>
where
    M: MemoryDevice,
    O: MailboxOpener,
{
    fn drop(&mut self) {
        if !self.holds_resources() {
            return;
        }
        if let Err(e) = self.unmap() {
            warn!("failed to release uncached region on drop: {e}");
        }
    }
}

impl<M, O> fmt::Display for UncachedRegion<'_, M, O>
where
    M: MemoryDevice,
    O: MailboxOpener,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        describe(self, "uncached", f)?;
        if let Some(handle) = self.handle {
            write!(f, ", handle {handle}")?;
        }
        Ok(())
    }
}

impl<M, O> fmt::Debug for UncachedRegion<'_, M, O>
where
    M: MemoryDevice,
    O: MailboxOpener,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UncachedRegion")
            .field("size", &self.size)
            .field("handle", &self.handle)
            .field("locked", &self.locked)
            .field("channel_open", &self.channel.is_open())
            .finish_non_exhaustive()
    }
}
