bitflags::bitflags! {
    /// Allocation flags for uncached VideoCore memory.
    ///
    /// Passed verbatim as the third word of the allocate request. Bits 2–3
    /// choose the bus alias the memory is handed out through.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub struct UncachedFlags: u32 {
        /// Can be resized to 0 at any time. Use for cached data.
        const DISCARDABLE = 1 << 0;

        /// Normal allocating alias. Don't use from the ARM side.
        const NORMAL = 0 << 2;

        /// `0xC` alias, uncached.
        const DIRECT = 1 << 2;

        /// `0x8` alias, non-allocating in L2 but coherent.
        const COHERENT = 2 << 2;

        /// Initialise the buffer to all zeros.
        const ZERO = 1 << 4;

        /// Don't initialise (default is all ones).
        const NO_INIT = 1 << 5;

        /// Likely to stay locked for long periods of time.
        const HINT_PERMALOCK = 1 << 6;

        /// Allocating in L2 only.
        const L1_NONALLOCATING = Self::DIRECT.bits() | Self::COHERENT.bits();
    }
}
