use crate::{MailboxError, MailboxMessage, MessageBuffer, Tag};
use log::{debug, trace};
use std::io;

/// An open mailbox transport.
///
/// Implementations hand the buffer to the firmware and return once it has
/// been rewritten with the response. The call blocks; there is no timeout.
pub trait MailboxDevice {
    /// Exchange one message in place.
    ///
    /// # Errors
    /// Any OS-level failure of the underlying call.
    fn exchange(&mut self, buffer: &mut MessageBuffer) -> io::Result<()>;

    /// Release the device, reporting errors the implicit drop would swallow.
    ///
    /// # Errors
    /// Any OS-level failure while closing.
    fn close(self) -> io::Result<()>
    where
        Self: Sized,
    {
        drop(self);
        Ok(())
    }
}

/// Opens [`MailboxDevice`]s.
pub trait MailboxOpener {
    type Device: MailboxDevice;

    /// # Errors
    /// The device is missing or not accessible.
    fn open(&self) -> io::Result<Self::Device>;
}

/// Mailbox conversation with the co-processor.
///
/// ```text
///   Closed ──open()──▶ Open ──close()──▶ Closed
/// ```
///
/// While closed, [`transact`](Self::transact) does nothing and answers with a
/// zeroed message. This keeps teardown paths that run before the channel was
/// ever opened free of special cases.
#[derive(Debug)]
pub struct MailboxChannel<D> {
    device: Option<D>,
}

impl<D> Default for MailboxChannel<D> {
    fn default() -> Self {
        Self::closed()
    }
}

impl<D> MailboxChannel<D> {
    #[must_use]
    pub const fn closed() -> Self {
        Self { device: None }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.device.is_some()
    }
}

impl<D: MailboxDevice> MailboxChannel<D> {
    /// Open the channel through `opener`. Does nothing if already open.
    ///
    /// # Errors
    /// [`MailboxError::Open`] if the device cannot be opened; the channel stays closed.
    pub fn open<O>(&mut self, opener: &O) -> Result<(), MailboxError>
    where
        O: MailboxOpener<Device = D>,
    {
        if self.device.is_none() {
            self.device = Some(opener.open().map_err(MailboxError::Open)?);
        }
        Ok(())
    }

    /// Close the channel. The channel is closed afterwards even on error.
    ///
    /// # Errors
    /// [`MailboxError::Close`] if the device reported a failure while closing.
    pub fn close(&mut self) -> Result<(), MailboxError> {
        match self.device.take() {
            Some(device) => device.close().map_err(MailboxError::Close),
            None => Ok(()),
        }
    }

    /// Send one request and wait for the validated response.
    ///
    /// # Errors
    /// - [`MailboxError::PayloadTooLarge`] if `request` exceeds the payload.
    /// - [`MailboxError::Transport`] if the device call fails.
    /// - [`MailboxError::Protocol`] if the firmware did not answer with a
    ///   successful status.
    pub fn transact(&mut self, tag: Tag, request: &[u32]) -> Result<MailboxMessage, MailboxError> {
        let Some(device) = self.device.as_mut() else {
            trace!("mailbox closed, skipping {tag}");
            return Ok(MailboxMessage::zeroed());
        };

        let message = MailboxMessage::request(tag, request)?;
        debug!("mailbox {tag}: request {request:#x?}");

        let mut buffer = message.encode();
        device
            .exchange(&mut buffer)
            .map_err(|source| MailboxError::Transport { tag, source })?;

        let reply = MailboxMessage::decode(&buffer);
        if !reply.status().is_success() {
            return Err(MailboxError::Protocol {
                tag,
                status: reply.status().into_bits(),
            });
        }

        debug!("mailbox {tag}: response word0={:#x}", reply.word(0));
        Ok(reply)
    }
}
