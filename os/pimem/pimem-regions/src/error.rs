use crate::capability::CapabilityError;
use crate::uncached::MemoryHandle;
use pimem_addresses::{PageSize, PhysicalAddress};
use pimem_mailbox::{MailboxError, Tag};
use std::io;
use std::path::PathBuf;

/// Failures of region lifecycle operations, named after the phase that failed.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("hardware capability check failed")]
    Capability(#[from] CapabilityError),
    #[error("failed to open mailbox channel")]
    ChannelOpen(#[source] MailboxError),
    #[error("failed to close mailbox channel")]
    ChannelClose(#[source] MailboxError),
    #[error("failed to allocate uncached memory")]
    Allocate(#[source] MailboxError),
    #[error("uncached memory is already allocated")]
    AlreadyAllocated,
    #[error("co-processor refused to allocate {size} bytes")]
    AllocationRefused { size: u32 },
    #[error("failed to lock uncached memory")]
    Lock(#[source] MailboxError),
    #[error("uncached memory is already locked")]
    AlreadyLocked,
    #[error("co-processor returned no bus address for handle {handle}")]
    LockRefused { handle: MemoryHandle },
    #[error("failed to unlock uncached memory")]
    Unlock(#[source] MailboxError),
    #[error("failed to free uncached memory")]
    Free(#[source] MailboxError),
    #[error("{tag} answered {word:#x} instead of 0")]
    FreeMailboxMismatch { tag: Tag, word: u32 },
    #[error("region is already mapped")]
    AlreadyMapped,
    #[error("{requested} bytes cannot be rounded up to {page} pages")]
    SizeOverflow { requested: u32, page: PageSize },
    #[error("failed to open {}", .device.display())]
    Open {
        device: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to map {len:#x} bytes at {physical} from {}", .device.display())]
    Map {
        device: PathBuf,
        physical: PhysicalAddress,
        len: usize,
        #[source]
        source: io::Error,
    },
    #[error("failed to unmap region")]
    Unmap(#[source] io::Error),
}

/// Why a register accessor could not hand out a cell.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum AccessError {
    #[error("region is not mapped")]
    NotMapped,
    #[error("{width}-byte access at offset {offset:#x} exceeds region of {size:#x} bytes")]
    OutOfRange {
        offset: usize,
        width: usize,
        size: usize,
    },
    #[error("{width}-byte access at offset {offset:#x} is misaligned")]
    Misaligned { offset: usize, width: usize },
}
