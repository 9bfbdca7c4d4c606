//! `/dev/vcio` transport.

use crate::{MailboxDevice, MailboxOpener, MessageBuffer};
use pimem_info::devices::MAILBOX_DEV;
use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd};
use std::path::{Path, PathBuf};

/// `_IOWR(100, 0, char *)`, the property request of the `vcio` driver.
const IOCTL_MBOX_PROPERTY: u32 = iowr(100, 0, size_of::<*mut u8>());

/// Linux generic `_IOWR` encoding: `dir << 30 | size << 16 | type << 8 | nr`.
#[allow(clippy::cast_possible_truncation)]
const fn iowr(ty: u32, nr: u32, size: usize) -> u32 {
    const IOC_READ_WRITE: u32 = 0b11;
    (IOC_READ_WRITE << 30) | ((size as u32) << 16) | (ty << 8) | nr
}

/// Opens the VideoCore mailbox character device.
#[derive(Clone, Debug)]
pub struct Vcio {
    path: PathBuf,
}

impl Vcio {
    #[must_use]
    pub fn new() -> Self {
        Self::with_path(MAILBOX_DEV)
    }

    #[must_use]
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for Vcio {
    fn default() -> Self {
        Self::new()
    }
}

impl MailboxOpener for Vcio {
    type Device = VcioDevice;

    fn open(&self) -> io::Result<Self::Device> {
        let file = OpenOptions::new().read(true).open(&self.path)?;
        log::debug!("opened mailbox {}", self.path.display());
        Ok(VcioDevice {
            fd: OwnedFd::from(file),
        })
    }
}

/// An open `/dev/vcio` descriptor.
#[derive(Debug)]
pub struct VcioDevice {
    fd: OwnedFd,
}

impl MailboxDevice for VcioDevice {
    fn exchange(&mut self, buffer: &mut MessageBuffer) -> io::Result<()> {
        // SAFETY: the buffer is word aligned and large enough for any overall
        // length a sealed message declares; the driver rewrites it in place.
        let rc = unsafe {
            libc::ioctl(
                self.fd.as_raw_fd(),
                IOCTL_MBOX_PROPERTY as _,
                buffer.as_mut_ptr(),
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        let raw = self.fd.into_raw_fd();
        // SAFETY: `raw` was owned by us and is not used afterwards.
        if unsafe { libc::close(raw) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
