//! # Hardware Capability Gate
//!
//! Uncached VideoCore memory only exists on a Raspberry Pi. Before the first
//! allocation the board is identified once through a [`CapabilityProbe`];
//! the outcome is cached in a [`HardwareContext`] and reused by every region
//! that borrows the context.
//!
//! The context is passed explicitly instead of living in a global, so tests
//! can inject a probe with a fixed answer and a fixed page size.

use log::{info, warn};
use pimem_addresses::PageSize;
use pimem_info::devices::BOARD_MODEL;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Identified board.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Board {
    model: String,
}

impl Board {
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum CapabilityError {
    #[error("cannot read board model from {path}: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("unsupported board {model:?}")]
    Unsupported { model: String },
}

/// Identifies the board the process runs on.
pub trait CapabilityProbe {
    /// # Errors
    /// The board cannot be identified or does not support uncached memory.
    fn probe(&self) -> Result<Board, CapabilityError>;
}

/// Reads the device-tree model string and accepts Raspberry Pi boards.
#[derive(Clone, Debug)]
pub struct DeviceTreeProbe {
    path: PathBuf,
}

impl DeviceTreeProbe {
    const REQUIRED: &'static str = "Raspberry Pi";

    #[must_use]
    pub fn new() -> Self {
        Self::with_path(BOARD_MODEL)
    }

    #[must_use]
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Default for DeviceTreeProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityProbe for DeviceTreeProbe {
    fn probe(&self) -> Result<Board, CapabilityError> {
        let raw = fs::read(&self.path).map_err(|e| CapabilityError::Unreadable {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        // The device-tree property is NUL terminated.
        let model = String::from_utf8_lossy(&raw)
            .trim_end_matches('\0')
            .trim()
            .to_owned();

        if model.contains(Self::REQUIRED) {
            Ok(Board { model })
        } else {
            Err(CapabilityError::Unsupported { model })
        }
    }
}

/// Process context consulted by uncached regions.
pub struct HardwareContext {
    probe: Box<dyn CapabilityProbe + Send + Sync>,
    page_size: PageSize,
    board: OnceLock<Result<Board, CapabilityError>>,
}

impl HardwareContext {
    /// Probe the device tree and use the host page size.
    #[must_use]
    pub fn detect() -> Self {
        Self::new(DeviceTreeProbe::new(), PageSize::host())
    }

    #[must_use]
    pub fn new(probe: impl CapabilityProbe + Send + Sync + 'static, page_size: PageSize) -> Self {
        Self {
            probe: Box::new(probe),
            page_size,
            board: OnceLock::new(),
        }
    }

    #[must_use]
    pub const fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// The identified board. The probe runs on first call only.
    ///
    /// # Errors
    /// The cached probe failure.
    pub fn board(&self) -> Result<&Board, CapabilityError> {
        self.board
            .get_or_init(|| {
                let outcome = self.probe.probe();
                match &outcome {
                    Ok(board) => info!("detected {}", board.model()),
                    Err(e) => warn!("hardware check failed: {e}"),
                }
                outcome
            })
            .as_ref()
            .map_err(CapabilityError::clone)
    }
}

impl fmt::Debug for HardwareContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardwareContext")
            .field("page_size", &self.page_size)
            .field("board", &self.board.get())
            .finish_non_exhaustive()
    }
}
