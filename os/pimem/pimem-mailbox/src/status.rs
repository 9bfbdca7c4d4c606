use bitfield_struct::bitfield;

/// Request/response status word (word 1 of a mailbox message).
///
/// Written as `0` by the requester. The firmware overwrites it with
/// `0x8000_0000` on success and `0x8000_0001` when it could not parse the
/// request.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct MailboxStatus {
    /// Bit 0: set together with [`response`](Self::response) on a parse error.
    pub error: bool,

    /// Bits 1–30: Reserved.
    #[bits(30)]
    pub reserved: u32,

    /// Bit 31: the firmware has processed the buffer.
    pub response: bool,
}

impl MailboxStatus {
    /// Status of an outgoing request.
    pub const REQUEST: Self = Self::new();

    /// Raw value the firmware answers with when it rejects a request.
    pub const RESPONSE_ERROR: u32 = 0x8000_0001;

    /// A response counts as successful only if bit 31 is set and the word is
    /// not the error sentinel.
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.response() && self.into_bits() != Self::RESPONSE_ERROR
    }
}
