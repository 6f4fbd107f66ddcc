//! Setup-time error type for `strata`.
//!
//! Running out of space inside an allocator is reported with the lightweight
//! [`AllocError`]; everything that can go wrong while reserving memory or
//! reading configuration is funnelled through [`Error`].

use thiserror::Error;

use crate::alloc::AllocError;

/// Result type local to `strata`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up backing memory.
#[derive(Debug, Error)]
pub enum Error {
    /// The upstream reservation could not be made.
    #[error("failed to reserve {bytes} bytes of backing memory")]
    ReserveFailed {
        /// Size of the rejected request.
        bytes: usize,
    },

    /// A configuration value is out of range.
    #[error("invalid memory configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("failed to read memory configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The configuration file is not valid JSON for [`MemoryConfig`](crate::config::MemoryConfig).
    #[error("failed to parse memory configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// An allocator ran out of space.
    #[error(transparent)]
    Alloc(#[from] AllocError),
}
