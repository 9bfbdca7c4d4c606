#![allow(dead_code)]

use pimem_addresses::{PageSize, PhysicalAddress};
use pimem_mailbox::{HEADER_WORDS, MailboxDevice, MailboxMessage, MailboxOpener, MessageBuffer};
use pimem_regions::{Board, CapabilityError, CapabilityProbe, HardwareContext, MemoryDevice, RegionError};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::rc::Rc;

pub const PAGE: u32 = 4096;

pub fn page() -> PageSize {
    PageSize::new(PAGE).unwrap()
}

pub struct FixedProbe(pub Result<Board, CapabilityError>);

impl CapabilityProbe for FixedProbe {
    fn probe(&self) -> Result<Board, CapabilityError> {
        self.0.clone()
    }
}

pub fn raspberry_pi() -> HardwareContext {
    HardwareContext::new(
        FixedProbe(Ok(Board::new("Raspberry Pi 3 Model B Plus Rev 1.3"))),
        page(),
    )
}

pub fn not_a_pi() -> HardwareContext {
    HardwareContext::new(
        FixedProbe(Err(CapabilityError::Unsupported {
            model: "QEMU Virtual Machine".into(),
        })),
        page(),
    )
}

#[derive(Default)]
pub struct MemoryLog {
    pub maps: Vec<(PathBuf, PhysicalAddress, usize)>,
    pub unmaps: Vec<usize>,
    pub live: usize,
    pub fail_open: bool,
    pub fail_map: bool,
    pub fail_unmap: bool,
}

/// Hands out zeroed heap memory instead of device mappings.
#[derive(Clone, Default)]
pub struct FakeMemory {
    pub log: Rc<RefCell<MemoryLog>>,
}

fn words(len: usize) -> usize {
    len.div_ceil(size_of::<u64>()).max(1)
}

impl MemoryDevice for FakeMemory {
    fn map(
        &self,
        device: &Path,
        physical: PhysicalAddress,
        len: usize,
    ) -> Result<NonNull<u8>, RegionError> {
        let mut log = self.log.borrow_mut();
        if log.fail_open {
            return Err(RegionError::Open {
                device: device.to_path_buf(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }
        if log.fail_map {
            return Err(RegionError::Map {
                device: device.to_path_buf(),
                physical,
                len,
                source: io::Error::from(io::ErrorKind::InvalidInput),
            });
        }

        log.maps.push((device.to_path_buf(), physical, len));
        log.live += 1;
        let backing = vec![0u64; words(len)].into_boxed_slice();
        Ok(NonNull::new(Box::into_raw(backing).cast::<u8>()).unwrap())
    }

    unsafe fn unmap(&self, base: NonNull<u8>, len: usize) -> io::Result<()> {
        let mut log = self.log.borrow_mut();
        log.unmaps.push(len);
        if log.fail_unmap {
            return Err(io::Error::other("munmap refused"));
        }
        log.live -= 1;
        let slice = ptr::slice_from_raw_parts_mut(base.as_ptr().cast::<u64>(), words(len));
        drop(unsafe { Box::from_raw(slice) });
        Ok(())
    }
}

/// How the fake firmware answers one request.
#[derive(Copy, Clone, Debug)]
pub enum Reply {
    /// Success with `word` as the first payload word.
    Word(u32),
    /// The `0x8000_0001` error status.
    Sentinel,
    /// The ioctl itself fails.
    Transport,
}

#[derive(Default)]
pub struct Script {
    pub replies: VecDeque<Reply>,
    pub requests: Vec<MailboxMessage>,
    pub opens: usize,
    pub closes: usize,
    pub fail_open: bool,
}

impl Script {
    pub fn tags(&self) -> Vec<u32> {
        self.requests.iter().map(MailboxMessage::tag).collect()
    }
}

/// A mailbox whose answers are queued up front.
#[derive(Clone, Default)]
pub struct ScriptedMailbox {
    pub script: Rc<RefCell<Script>>,
}

impl ScriptedMailbox {
    pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
        let mailbox = Self::default();
        mailbox.script.borrow_mut().replies.extend(replies);
        mailbox
    }

    /// allocate → handle, lock → bus, unlock → 0, free → 0.
    pub fn happy(handle: u32, bus: u32) -> Self {
        Self::with_replies([
            Reply::Word(handle),
            Reply::Word(bus),
            Reply::Word(0),
            Reply::Word(0),
        ])
    }
}

pub struct ScriptedDevice {
    script: Rc<RefCell<Script>>,
}

impl MailboxDevice for ScriptedDevice {
    fn exchange(&mut self, buffer: &mut MessageBuffer) -> io::Result<()> {
        let mut script = self.script.borrow_mut();
        script.requests.push(MailboxMessage::decode(buffer));

        let (status, word) = match script.replies.pop_front() {
            Some(Reply::Word(word)) => (0x8000_0000u32, word),
            Some(Reply::Sentinel) => (0x8000_0001, 0),
            Some(Reply::Transport) => return Err(io::Error::from_raw_os_error(5)),
            None => return Err(io::Error::other("no scripted reply left")),
        };

        let bytes = buffer.as_bytes_mut();
        bytes[4..8].copy_from_slice(&status.to_le_bytes());
        let at = HEADER_WORDS * 4;
        bytes[at..at + 4].copy_from_slice(&word.to_le_bytes());
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        self.script.borrow_mut().closes += 1;
        Ok(())
    }
}

impl MailboxOpener for ScriptedMailbox {
    type Device = ScriptedDevice;

    fn open(&self) -> io::Result<ScriptedDevice> {
        let mut script = self.script.borrow_mut();
        if script.fail_open {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        script.opens += 1;
        Ok(ScriptedDevice {
            script: Rc::clone(&self.script),
        })
    }
}
