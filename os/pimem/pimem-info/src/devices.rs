//! # Device Files

/// Full physical memory. Maps any physical address; requires root.
pub const MEM_DEV_DEFAULT: &str = "/dev/mem";

/// GPIO-only window. Offsets are relative to the GPIO block; no root needed.
pub const MEM_DEV_GPIO: &str = "/dev/gpiomem";

/// VideoCore mailbox property channel, opened read-only.
pub const MAILBOX_DEV: &str = "/dev/vcio";

/// Device-tree node holding the board model string.
pub const BOARD_MODEL: &str = "/proc/device-tree/model";
