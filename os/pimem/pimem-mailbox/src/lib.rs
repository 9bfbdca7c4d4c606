//! # VideoCore Mailbox Property Channel
//!
//! A client for the one request/response protocol the VideoCore firmware
//! exposes through `/dev/vcio`: a fixed-layout message of 32-bit words that is
//! handed to the driver with a single blocking `ioctl` and rewritten in place
//! with the response.
//!
//! ## Message Layout
//!
//! ```text
//! word   0            1         2     3            4          5 .. 31
//!      ┌────────────┬─────────┬─────┬────────────┬──────────┬─────────────────┐
//!      │ overall len│ status  │ tag │ buffer len │ data len │ payload (27 w)  │
//!      └────────────┴─────────┴─────┴────────────┴──────────┴─────────────────┘
//! ```
//!
//! Words are little-endian. `status` is `0` on request; the firmware sets
//! bit 31 on response and answers `0x8000_0001` on error (see
//! [`MailboxStatus`]).
//!
//! ## Core Components
//!
//! * [`MailboxMessage`] / [`MessageBuffer`]: explicit binary codec
//! * [`MailboxChannel`]: Closed → Open → Closed state machine around a device
//! * [`MailboxDevice`] / [`MailboxOpener`]: the transport seam; [`Vcio`] is the
//!   real one, tests plug in scripted devices
//!
//! ## Usage
//! ```rust,no_run
//! use pimem_mailbox::{MailboxChannel, Tag, Vcio};
//!
//! let mut channel = MailboxChannel::closed();
//! channel.open(&Vcio::new())?;
//! let reply = channel.transact(Tag::AllocateMemory, &[4096, 4096, 0x0c])?;
//! let handle = reply.word(0);
//! # let _ = handle;
//! channel.close()?;
//! # Ok::<(), pimem_mailbox::MailboxError>(())
//! ```

mod channel;
mod error;
mod message;
mod status;
mod vcio;

pub use crate::channel::{MailboxChannel, MailboxDevice, MailboxOpener};
pub use crate::error::MailboxError;
pub use crate::message::{
    HEADER_WORDS, MESSAGE_BUFFER_BYTES, MailboxMessage, MessageBuffer, PAYLOAD_WORDS, Tag,
};
pub use crate::status::MailboxStatus;
pub use crate::vcio::{Vcio, VcioDevice};
