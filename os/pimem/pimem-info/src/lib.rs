//! # Platform Constants
//!
//! Device paths and bus layout shared by the mailbox and region crates.
//!
//! ### Devices ([`devices`])
//! * **Full memory**: `/dev/mem`, maps any physical address, requires root
//! * **GPIO memory**: `/dev/gpiomem`, GPIO block only, no elevated privilege
//! * **Mailbox**: `/dev/vcio`, the VideoCore property channel
//!
//! ### Bus Layout ([`bus`])
//! * **Peripheral base**: where the VideoCore sees the peripheral window
//! * **Alias mask**: the two high bits selecting the cache alias of a bus address

#![cfg_attr(not(test), no_std)]

pub mod bus;
pub mod devices;
