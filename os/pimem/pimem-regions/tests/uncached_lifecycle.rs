mod common;

use common::{FakeMemory, PAGE, Reply, ScriptedMailbox, not_a_pi, raspberry_pi};
use pimem_addresses::{BusAddress, PhysicalAddress};
use pimem_mailbox::{MailboxError, Tag};
use pimem_regions::{
    AccessError, HardwareContext, MemoryHandle, Region, RegionError, UncachedFlags, UncachedRegion,
};
use std::path::Path;

const ALLOCATE: u32 = 0x3000c;
const LOCK: u32 = 0x3000d;
const UNLOCK: u32 = 0x3000e;
const FREE: u32 = 0x3000f;

fn region<'a>(
    hw: &'a HardwareContext,
    memory: &FakeMemory,
    mailbox: &ScriptedMailbox,
) -> UncachedRegion<'a, FakeMemory, ScriptedMailbox> {
    UncachedRegion::with_devices(hw, 10, memory.clone(), mailbox.clone()).unwrap()
}

fn is_sentinel(err: &MailboxError) -> bool {
    matches!(err, MailboxError::Protocol { status: 0x8000_0001, .. })
}

#[test]
fn ten_bytes_on_4k_pages() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::happy(0x1234, 0x5A00_0010);
    let mut region = region(&hw, &memory, &mailbox);
    assert_eq!(region.size(), PAGE);

    region
        .map(UncachedFlags::DIRECT | UncachedFlags::ZERO)
        .unwrap();

    assert_eq!(region.handle().map(MemoryHandle::get), Some(0x1234));
    assert_eq!(region.bus_address(), Some(BusAddress::new(0x5A00_0010)));
    assert_eq!(
        region.physical_address(),
        Some(PhysicalAddress::new(0x1A00_0010))
    );
    assert!(region.virtual_address().is_some());

    {
        let cell = region.reg32(0).unwrap();
        for value in [0xDEAD_BEEF, 0, 0x0123_4567, u32::MAX] {
            cell.write(value);
            assert_eq!(cell.read(), value);
        }
    }

    {
        let log = memory.log.borrow();
        assert_eq!(log.maps.len(), 1);
        let (device, physical, len) = &log.maps[0];
        assert_eq!(device, Path::new("/dev/mem"));
        assert_eq!(*physical, PhysicalAddress::new(0x1A00_0010));
        assert_eq!(*len, PAGE as usize);
    }

    {
        let script = mailbox.script.borrow();
        assert_eq!(script.tags(), [ALLOCATE, LOCK]);
        assert_eq!(&script.requests[0].payload()[..3], &[PAGE, PAGE, 0x14]);
        assert_eq!(script.requests[0].overall_len(), 72);
        assert_eq!(script.requests[1].word(0), 0x1234);
    }

    region.unmap().unwrap();

    let script = mailbox.script.borrow();
    assert_eq!(script.tags(), [ALLOCATE, LOCK, UNLOCK, FREE]);
    assert_eq!(script.requests[2].word(0), 0x1234);
    assert_eq!(script.requests[3].word(0), 0x1234);
    assert_eq!((script.opens, script.closes), (1, 1));
    assert_eq!(memory.log.borrow().live, 0);

    assert!(region.handle().is_none());
    assert!(region.physical_address().is_none());
    assert!(region.bus_address().is_none());
    assert!(region.virtual_address().is_none());
    assert!(!region.is_channel_open());
}

#[test]
fn allocate_sentinel_stops_before_lock() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::with_replies([Reply::Sentinel]);
    let mut region = region(&hw, &memory, &mailbox);

    let err = region.map(UncachedFlags::DIRECT).unwrap_err();
    assert!(matches!(&err, RegionError::Allocate(e) if is_sentinel(e)));
    assert_eq!(mailbox.script.borrow().tags(), [ALLOCATE]);
    assert!(region.handle().is_none());
    assert!(memory.log.borrow().maps.is_empty());

    region.unmap().unwrap();
    assert_eq!(mailbox.script.borrow().tags(), [ALLOCATE]);
    assert_eq!(mailbox.script.borrow().closes, 1);
}

#[test]
fn lock_sentinel_stops_before_mapping_and_unmap_frees() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox =
        ScriptedMailbox::with_replies([Reply::Word(0x1234), Reply::Sentinel, Reply::Word(0)]);
    let mut region = region(&hw, &memory, &mailbox);

    let err = region.map(UncachedFlags::DIRECT).unwrap_err();
    assert!(matches!(&err, RegionError::Lock(e) if is_sentinel(e)));
    assert_eq!(mailbox.script.borrow().tags(), [ALLOCATE, LOCK]);
    assert!(region.handle().is_some());
    assert!(region.bus_address().is_none());
    assert!(memory.log.borrow().maps.is_empty());

    // No lock is held, so only free runs.
    region.unmap().unwrap();
    assert_eq!(mailbox.script.borrow().tags(), [ALLOCATE, LOCK, FREE]);
    assert!(region.handle().is_none());
}

#[test]
fn unlock_sentinel_skips_free_and_keeps_state() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::with_replies([
        Reply::Word(0x1234),
        Reply::Word(0x5A00_0010),
        Reply::Sentinel,
    ]);
    let mut region = region(&hw, &memory, &mailbox);
    region.map(UncachedFlags::DIRECT).unwrap();

    let err = region.unmap().unwrap_err();
    assert!(matches!(&err, RegionError::Unlock(e) if is_sentinel(e)));
    assert_eq!(mailbox.script.borrow().tags(), [ALLOCATE, LOCK, UNLOCK]);
    assert!(region.is_mapped());
    assert!(region.handle().is_some());
    assert!(region.is_channel_open());
    assert_eq!(memory.log.borrow().live, 1);

    // A later attempt picks up where the first one stopped.
    mailbox
        .script
        .borrow_mut()
        .replies
        .extend([Reply::Word(0), Reply::Word(0)]);
    region.unmap().unwrap();
    assert_eq!(
        mailbox.script.borrow().tags(),
        [ALLOCATE, LOCK, UNLOCK, UNLOCK, FREE]
    );
    assert_eq!(memory.log.borrow().live, 0);
}

#[test]
fn free_sentinel_keeps_handle() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::with_replies([
        Reply::Word(0x1234),
        Reply::Word(0x5A00_0010),
        Reply::Word(0),
        Reply::Sentinel,
    ]);
    let mut region = region(&hw, &memory, &mailbox);
    region.map(UncachedFlags::DIRECT).unwrap();

    let err = region.unmap().unwrap_err();
    assert!(matches!(&err, RegionError::Free(e) if is_sentinel(e)));
    assert_eq!(mailbox.script.borrow().tags(), [ALLOCATE, LOCK, UNLOCK, FREE]);
    assert!(!region.is_mapped());
    assert_eq!(region.handle().map(MemoryHandle::get), Some(0x1234));
    assert!(region.is_channel_open());
    assert_eq!(memory.log.borrow().live, 0);

    mailbox.script.borrow_mut().replies.push_back(Reply::Word(0));
}

#[test]
fn nonzero_unlock_reply_is_a_mismatch() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::with_replies([
        Reply::Word(0x1234),
        Reply::Word(0x5A00_0010),
        Reply::Word(1),
        Reply::Word(0),
        Reply::Word(0),
    ]);
    let mut region = region(&hw, &memory, &mailbox);
    region.map(UncachedFlags::DIRECT).unwrap();

    let err = region.unmap().unwrap_err();
    assert!(matches!(
        err,
        RegionError::FreeMailboxMismatch {
            tag: Tag::UnlockMemory,
            word: 1
        }
    ));
    assert!(region.is_mapped());

    region.unmap().unwrap();
    assert!(!region.is_mapped());
    assert!(region.handle().is_none());
}

#[test]
fn transport_failure_is_reported_with_phase() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::with_replies([Reply::Transport]);
    let mut region = region(&hw, &memory, &mailbox);

    let err = region.map(UncachedFlags::DIRECT).unwrap_err();
    assert!(matches!(
        err,
        RegionError::Allocate(MailboxError::Transport {
            tag: Tag::AllocateMemory,
            ..
        })
    ));
}

#[test]
fn refused_allocation_and_lock() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();

    let mailbox = ScriptedMailbox::with_replies([Reply::Word(0)]);
    let mut refused = region(&hw, &memory, &mailbox);
    let err = refused.map(UncachedFlags::DIRECT).unwrap_err();
    assert!(matches!(err, RegionError::AllocationRefused { size: PAGE }));
    assert!(refused.handle().is_none());

    let mailbox =
        ScriptedMailbox::with_replies([Reply::Word(0x99), Reply::Word(0), Reply::Word(0)]);
    let mut unlocked = region(&hw, &memory, &mailbox);
    let err = unlocked.map(UncachedFlags::DIRECT).unwrap_err();
    assert!(matches!(err, RegionError::LockRefused { handle } if handle.get() == 0x99));
    unlocked.unmap().unwrap();
    assert_eq!(mailbox.script.borrow().tags(), [ALLOCATE, LOCK, FREE]);
}

#[test]
fn failed_mapping_after_lock_is_still_released() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    memory.log.borrow_mut().fail_open = true;
    let mailbox = ScriptedMailbox::happy(0x1234, 0x5A00_0010);
    let mut region = region(&hw, &memory, &mailbox);

    let err = region.map(UncachedFlags::DIRECT).unwrap_err();
    assert!(matches!(err, RegionError::Open { .. }));
    assert_eq!(region.bus_address(), Some(BusAddress::new(0x5A00_0010)));
    assert!(region.virtual_address().is_none());
    assert!(matches!(region.reg32(0), Err(AccessError::NotMapped)));

    region.unmap().unwrap();
    assert_eq!(mailbox.script.borrow().tags(), [ALLOCATE, LOCK, UNLOCK, FREE]);
    assert!(region.bus_address().is_none());
}

#[test]
fn unmapping_a_fresh_region_does_nothing() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::default();
    let mut region = region(&hw, &memory, &mailbox);

    region.unmap().unwrap();
    region.unmap().unwrap();

    let script = mailbox.script.borrow();
    assert!(script.requests.is_empty());
    assert_eq!((script.opens, script.closes), (0, 0));
    assert!(memory.log.borrow().unmaps.is_empty());
}

#[test]
fn accessors_before_map() {
    let hw = raspberry_pi();
    let region = region(&hw, &FakeMemory::default(), &ScriptedMailbox::default());

    assert!(!region.is_mapped());
    assert!(region.physical_address().is_none());
    assert!(region.bus_address().is_none());
    assert!(region.virtual_address().is_none());
    assert!(matches!(region.reg32(0), Err(AccessError::NotMapped)));
    assert!(matches!(region.reg8(0), Err(AccessError::NotMapped)));
    assert_eq!(region.size(), PAGE);
}

#[test]
fn second_map_is_rejected_without_traffic() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::happy(0x1234, 0x5A00_0010);
    let mut region = region(&hw, &memory, &mailbox);
    region.map(UncachedFlags::DIRECT).unwrap();

    let err = region.map(UncachedFlags::DIRECT).unwrap_err();
    assert!(matches!(err, RegionError::AlreadyAllocated));
    assert_eq!(mailbox.script.borrow().tags(), [ALLOCATE, LOCK]);
    assert_eq!(mailbox.script.borrow().opens, 1);
    assert!(region.is_mapped());
}

#[test]
fn region_can_be_mapped_again_after_unmap() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::happy(0x1234, 0x5A00_0010);
    let mut region = region(&hw, &memory, &mailbox);
    region.map(UncachedFlags::COHERENT).unwrap();
    region.unmap().unwrap();

    mailbox.script.borrow_mut().replies.extend([
        Reply::Word(0x77),
        Reply::Word(0xC000_2000),
        Reply::Word(0),
        Reply::Word(0),
    ]);
    region.map(UncachedFlags::DIRECT).unwrap();
    assert_eq!(region.handle().map(MemoryHandle::get), Some(0x77));
    assert_eq!(
        region.physical_address(),
        Some(PhysicalAddress::new(0x0000_2000))
    );
    assert_eq!(mailbox.script.borrow().opens, 2);
}

#[test]
fn unsupported_board_blocks_allocation() {
    let hw = not_a_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::happy(0x1234, 0x5A00_0010);
    let mut region = region(&hw, &memory, &mailbox);

    let err = region.map(UncachedFlags::DIRECT).unwrap_err();
    assert!(matches!(err, RegionError::Capability(_)));
    let script = mailbox.script.borrow();
    assert_eq!(script.opens, 0);
    assert!(script.requests.is_empty());
}

#[test]
fn unopenable_mailbox() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::happy(0x1234, 0x5A00_0010);
    mailbox.script.borrow_mut().fail_open = true;
    let mut region = region(&hw, &memory, &mailbox);

    let err = region.map(UncachedFlags::DIRECT).unwrap_err();
    assert!(matches!(err, RegionError::ChannelOpen(MailboxError::Open(_))));
    assert!(!region.is_channel_open());
    assert!(mailbox.script.borrow().requests.is_empty());
}

#[test]
fn register_bounds() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::happy(0x1234, 0x5A00_0010);
    let mut region = region(&hw, &memory, &mailbox);
    region.map(UncachedFlags::DIRECT).unwrap();

    assert!(region.reg32(PAGE as usize - 4).is_ok());
    assert!(region.reg8(PAGE as usize - 1).is_ok());
    assert_eq!(
        region.reg32(PAGE as usize).unwrap_err(),
        AccessError::OutOfRange {
            offset: PAGE as usize,
            width: 4,
            size: PAGE as usize
        }
    );
    assert!(matches!(
        region.reg8(PAGE as usize),
        Err(AccessError::OutOfRange { .. })
    ));
    assert_eq!(
        region.reg32(2).unwrap_err(),
        AccessError::Misaligned {
            offset: 2,
            width: 4
        }
    );
    assert!(matches!(
        region.reg32(usize::MAX - 1),
        Err(AccessError::OutOfRange { .. })
    ));

    region.reg8(5).unwrap().write(0xA5);
    assert_eq!(region.reg8(5).unwrap().read(), 0xA5);
    region.reg32(8).unwrap().modify(|v| v | 0x10);
    assert_eq!(region.reg32(8).unwrap().read(), 0x10);
}

#[test]
fn drop_releases_everything() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::happy(0x1234, 0x5A00_0010);
    {
        let mut region = region(&hw, &memory, &mailbox);
        region.map(UncachedFlags::DIRECT).unwrap();
    }

    let script = mailbox.script.borrow();
    assert_eq!(script.tags(), [ALLOCATE, LOCK, UNLOCK, FREE]);
    assert_eq!(script.closes, 1);
    assert_eq!(memory.log.borrow().live, 0);
}

#[test]
fn oversized_request_is_rejected_up_front() {
    let hw = raspberry_pi();
    let err = UncachedRegion::with_devices(
        &hw,
        u32::MAX,
        FakeMemory::default(),
        ScriptedMailbox::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RegionError::SizeOverflow {
            requested: u32::MAX,
            ..
        }
    ));
}

#[test]
fn display_lists_addresses() {
    let hw = raspberry_pi();
    let memory = FakeMemory::default();
    let mailbox = ScriptedMailbox::happy(0x1234, 0x5A00_0010);
    let mut region = region(&hw, &memory, &mailbox);
    assert_eq!(
        region.to_string(),
        "uncached: 4096 bytes, phys -, bus -, virt -"
    );

    region.map(UncachedFlags::DIRECT).unwrap();
    let shown = region.to_string();
    assert!(shown.starts_with("uncached: 4096 bytes, phys 0x1A000010, bus 0x5A000010, virt "));
    assert!(shown.ends_with(", handle 0x1234"));
}
