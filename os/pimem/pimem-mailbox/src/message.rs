use crate::{MailboxError, MailboxStatus};
use core::fmt;

/// Number of header words before the payload.
pub const HEADER_WORDS: usize = 5;

/// Payload capacity in words (108 bytes).
pub const PAYLOAD_WORDS: usize = 27;

const WORD: usize = size_of::<u32>();
const ENCODED_BYTES: usize = (HEADER_WORDS + PAYLOAD_WORDS) * WORD;
const MAX_BUFFER_LEN: u32 = (PAYLOAD_WORDS * WORD) as u32;

/// Size of a [`MessageBuffer`].
///
/// The driver copies `overall_len` bytes in and out of the buffer, and
/// `overall_len` for a full payload is `(108 + 6) * 4`. The buffer is sized for
/// that worst case even though only the first 128 bytes carry the message.
pub const MESSAGE_BUFFER_BYTES: usize = overall_len(MAX_BUFFER_LEN) as usize;

const _: () = assert!(MESSAGE_BUFFER_BYTES >= ENCODED_BYTES);

/// Overall message length in bytes as declared in word 0.
const fn overall_len(buffer_len: u32) -> u32 {
    (buffer_len + 6) * WORD as u32
}

/// Property tags understood by this crate.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Tag {
    /// Allocate contiguous GPU memory. Request `[size, align, flags]`, response `[handle]`.
    AllocateMemory = 0x0003_000c,
    /// Lock a handle in place. Request `[handle]`, response `[bus address]`.
    LockMemory = 0x0003_000d,
    /// Unlock a handle. Request `[handle]`, response `[0]` on success.
    UnlockMemory = 0x0003_000e,
    /// Free a handle. Request `[handle]`, response `[0]` on success.
    ReleaseMemory = 0x0003_000f,
}

impl Tag {
    #[inline]
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllocateMemory => "allocate",
            Self::LockMemory => "lock",
            Self::UnlockMemory => "unlock",
            Self::ReleaseMemory => "release",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#07x})", self.as_str(), self.code())
    }
}

/// Word-aligned byte buffer handed to the mailbox driver.
#[repr(C, align(4))]
#[derive(Clone)]
pub struct MessageBuffer([u8; MESSAGE_BUFFER_BYTES]);

impl MessageBuffer {
    #[must_use]
    pub const fn zeroed() -> Self {
        Self([0; MESSAGE_BUFFER_BYTES])
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; MESSAGE_BUFFER_BYTES] {
        &self.0
    }

    pub const fn as_bytes_mut(&mut self) -> &mut [u8; MESSAGE_BUFFER_BYTES] {
        &mut self.0
    }

    /// Pointer passed as the `ioctl` argument.
    pub const fn as_mut_ptr(&mut self) -> *mut u8 {
        self.0.as_mut_ptr()
    }

    fn word(&self, index: usize) -> u32 {
        let at = index * WORD;
        u32::from_le_bytes([self.0[at], self.0[at + 1], self.0[at + 2], self.0[at + 3]])
    }

    fn set_word(&mut self, index: usize, value: u32) {
        let at = index * WORD;
        self.0[at..at + WORD].copy_from_slice(&value.to_le_bytes());
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl fmt::Debug for MessageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries((0..HEADER_WORDS + PAYLOAD_WORDS).map(|i| self.word(i)))
            .finish()
    }
}

/// One mailbox message, request or response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MailboxMessage {
    overall_len: u32,
    status: MailboxStatus,
    tag: u32,
    buffer_len: u32,
    data_len: u32,
    payload: [u32; PAYLOAD_WORDS],
}

impl MailboxMessage {
    /// An all-zero message; what a closed channel answers with.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            overall_len: 0,
            status: MailboxStatus::REQUEST,
            tag: 0,
            buffer_len: 0,
            data_len: 0,
            payload: [0; PAYLOAD_WORDS],
        }
    }

    /// Build a sealed request for `tag` carrying `words`.
    ///
    /// Buffer and data length are both `4 * words.len()`.
    ///
    /// # Errors
    /// [`MailboxError::PayloadTooLarge`] if more than [`PAYLOAD_WORDS`] words are given.
    pub fn request(tag: Tag, words: &[u32]) -> Result<Self, MailboxError> {
        if words.len() > PAYLOAD_WORDS {
            return Err(MailboxError::PayloadTooLarge {
                tag,
                words: words.len(),
                max: PAYLOAD_WORDS,
            });
        }

        let len = u32::try_from(words.len() * WORD).unwrap_or(MAX_BUFFER_LEN);
        let mut message = Self {
            tag: tag.code(),
            buffer_len: len,
            data_len: len,
            ..Self::zeroed()
        };
        message.payload[..words.len()].copy_from_slice(words);
        message.seal();
        Ok(message)
    }

    /// Prepare for transmission: clear the payload between the data length and
    /// the buffer length (inclusive of the word right after the value buffer),
    /// recompute the overall length and mark as request.
    fn seal(&mut self) {
        let first = self.data_len as usize / WORD;
        let last = (self.buffer_len as usize / WORD).min(PAYLOAD_WORDS - 1);
        if first <= last {
            self.payload[first..=last].fill(0);
        }
        self.overall_len = overall_len(self.buffer_len.min(MAX_BUFFER_LEN));
        self.status = MailboxStatus::REQUEST;
    }

    #[must_use]
    pub const fn overall_len(&self) -> u32 {
        self.overall_len
    }

    #[must_use]
    pub const fn status(&self) -> MailboxStatus {
        self.status
    }

    #[must_use]
    pub const fn tag(&self) -> u32 {
        self.tag
    }

    #[must_use]
    pub const fn buffer_len(&self) -> u32 {
        self.buffer_len
    }

    #[must_use]
    pub const fn data_len(&self) -> u32 {
        self.data_len
    }

    #[must_use]
    pub const fn payload(&self) -> &[u32; PAYLOAD_WORDS] {
        &self.payload
    }

    /// Payload word `index`, `0` past the end.
    #[must_use]
    pub fn word(&self, index: usize) -> u32 {
        self.payload.get(index).copied().unwrap_or(0)
    }

    /// Serialize into little-endian words.
    #[must_use]
    pub fn encode(&self) -> MessageBuffer {
        let mut buffer = MessageBuffer::zeroed();
        buffer.set_word(0, self.overall_len);
        buffer.set_word(1, self.status.into_bits());
        buffer.set_word(2, self.tag);
        buffer.set_word(3, self.buffer_len);
        buffer.set_word(4, self.data_len);
        for (i, word) in self.payload.iter().enumerate() {
            buffer.set_word(HEADER_WORDS + i, *word);
        }
        buffer
    }

    /// Parse a buffer written back by the driver.
    #[must_use]
    pub fn decode(buffer: &MessageBuffer) -> Self {
        let mut payload = [0; PAYLOAD_WORDS];
        for (i, word) in payload.iter_mut().enumerate() {
            *word = buffer.word(HEADER_WORDS + i);
        }
        Self {
            overall_len: buffer.word(0),
            status: MailboxStatus::from_bits(buffer.word(1)),
            tag: buffer.word(2),
            buffer_len: buffer.word(3),
            data_len: buffer.word(4),
            payload,
        }
    }
}

impl Default for MailboxMessage {
    fn default() -> Self {
        Self::zeroed()
    }
}
