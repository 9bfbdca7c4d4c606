use core::fmt;

/// Host page size in bytes (non-zero power of two).
///
/// Mappings through `/dev/mem` and VideoCore allocations are both made in
/// whole pages, so every region size is rounded with [`PageSize::round_up`].
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageSize(u32);

impl PageSize {
    /// Used when `sysconf` cannot report a usable value.
    pub const FALLBACK: Self = Self(4096);

    /// Create from a byte count; `None` unless `bytes` is a non-zero power of two.
    #[inline]
    #[must_use]
    pub const fn new(bytes: u32) -> Option<Self> {
        if bytes.is_power_of_two() {
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// The page size of the running host, as reported by `sysconf(_SC_PAGESIZE)`.
    #[must_use]
    pub fn host() -> Self {
        // SAFETY: sysconf has no preconditions.
        let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        u32::try_from(raw)
            .ok()
            .and_then(Self::new)
            .unwrap_or(Self::FALLBACK)
    }

    #[inline]
    #[must_use]
    pub const fn bytes(self) -> u32 {
        self.0
    }

    /// Round `size` up to the next multiple of this page size.
    ///
    /// Sizes that already are a multiple are returned unchanged. Returns `None`
    /// if the rounded value does not fit into `u32`.
    #[inline]
    #[must_use]
    pub const fn round_up(self, size: u32) -> Option<u32> {
        size.checked_next_multiple_of(self.0)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_multiple_of(1024) {
            write!(f, "{}K", self.0 / 1024)
        } else {
            write!(f, "{}B", self.0)
        }
    }
}

impl fmt::Debug for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageSize({self})")
    }
}
