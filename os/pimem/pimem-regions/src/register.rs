//! # Register Cells
//!
//! Bounds-checked handles to single 8- or 32-bit cells of a mapped region.
//! All accesses are volatile.
//!
//! A 32-bit access reads or writes the host's native word. Peripherals are
//! little-endian like the ARM cores of the Pi, but code that needs a byte-exact
//! view of memory should compose it from four [`Reg<u8>`] accesses.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u32 {}
}

/// Widths a [`Reg`] can be created for.
pub trait RegisterCell: sealed::Sealed + Copy + fmt::LowerHex {}
impl RegisterCell for u8 {}
impl RegisterCell for u32 {}

/// A single register cell, borrowed from the mapping it points into.
pub struct Reg<'a, T: RegisterCell> {
    cell: NonNull<T>,
    _mapping: PhantomData<&'a T>,
}

impl<T: RegisterCell> Reg<'_, T> {
    /// `cell` must be aligned and lie inside a mapping that outlives `'a`.
    pub(crate) const fn new(cell: NonNull<T>) -> Self {
        Self {
            cell,
            _mapping: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub fn read(&self) -> T {
        // SAFETY: aligned, in bounds and mapped for the lifetime of `self`.
        unsafe { self.cell.as_ptr().read_volatile() }
    }

    #[inline]
    pub fn write(&self, value: T) {
        // SAFETY: aligned, in bounds and mapped for the lifetime of `self`.
        unsafe { self.cell.as_ptr().write_volatile(value) }
    }

    /// Read, transform and write back.
    #[inline]
    pub fn modify(&self, f: impl FnOnce(T) -> T) {
        self.write(f(self.read()));
    }
}

impl<T: RegisterCell> fmt::Debug for Reg<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reg@{:p}({:#x})", self.cell, self.read())
    }
}
