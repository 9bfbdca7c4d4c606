use core::fmt;
use core::ptr::NonNull;

/// Process-virtual address of a mapping.
///
/// Produced by `mmap` and only meaningful inside this process. The value is
/// opaque: register access goes through the bounds-checked accessors of the
/// owning region, not through arithmetic on this type.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct VirtualAddress(NonNull<u8>);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn from_nonnull<T>(ptr: NonNull<T>) -> Self {
        Self(ptr.cast())
    }

    #[inline]
    #[must_use]
    pub const fn as_nonnull(self) -> NonNull<u8> {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr()
    }

    /// Numeric value, for display only.
    #[inline]
    #[must_use]
    pub fn addr(self) -> usize {
        self.0.as_ptr().addr()
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA({:#X})", self.addr())
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#X}", self.addr())
    }
}
