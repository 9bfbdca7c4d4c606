//! # Bus Layout

/// Base of the peripheral window as seen from the VideoCore bus.
///
/// Peripheral regions report `physical + BUS_REGISTER_BASE` as their bus address.
pub const BUS_REGISTER_BASE: u32 = 0x7e00_0000;

/// Bits 31–30 of a bus address select the cache alias (`0x0`, `0x4`, `0x8`, `0xC`).
///
/// Clearing them yields the ARM physical address.
pub const BUS_ALIAS_MASK: u32 = 0xc000_0000;

const _: () = {
    assert!(BUS_ALIAS_MASK.count_ones() == 2);
    assert!(BUS_ALIAS_MASK.leading_ones() == 2);
    assert!(BUS_REGISTER_BASE & BUS_ALIAS_MASK == 0x4000_0000);
};
