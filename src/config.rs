//! Configuration for the single upstream memory reservation.
//!
//! The file format is JSON; every field is optional.
//!
//! ```json
//! { "reserve_bytes": 16777216, "backing": "global", "alignment": 4096 }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::syscall::PAGE_SIZE;

/// Default size for the upstream reservation (64 MB).
pub const DEFAULT_RESERVE_BYTES: usize = 64 * 1024 * 1024;

/// Where the backing reservation comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackingSource {
    /// Map pages directly from the OS (`mmap` / `VirtualAlloc`).
    #[default]
    Syscall,
    /// Ask the global Rust allocator for one large block.
    Global,
}

/// Settings for [`BackingRegion::reserve`](crate::backing::BackingRegion::reserve).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryConfig {
    /// Total bytes reserved once at startup.
    pub reserve_bytes: usize,
    /// Source of the reservation.
    pub backing: BackingSource,
    /// Alignment of the reservation's first byte.
    ///
    /// Syscall reservations are always page-aligned, so values up to
    /// `PAGE_SIZE` are free there; `Global` honours any power of two.
    pub alignment: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            reserve_bytes: DEFAULT_RESERVE_BYTES,
            backing: BackingSource::default(),
            alignment: PAGE_SIZE,
        }
    }
}

impl MemoryConfig {
    /// A default configuration reserving `reserve_bytes`.
    pub fn with_reserve(reserve_bytes: usize) -> Self {
        Self {
            reserve_bytes,
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    /// `Error::ConfigParse` for malformed JSON or unknown fields, and
    /// `Error::InvalidConfig` if the values do not validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    /// `Error::ConfigIo` if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Checks that the configuration describes a reservation that can exist.
    ///
    /// # Errors
    /// `Error::InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.reserve_bytes == 0 {
            return Err(Error::InvalidConfig("reserve_bytes must be greater than zero".into()));
        }
        if !self.alignment.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "alignment {} is not a power of two",
                self.alignment
            )));
        }
        if self.backing == BackingSource::Syscall && self.alignment > PAGE_SIZE {
            return Err(Error::InvalidConfig(format!(
                "syscall reservations are page-aligned; alignment {} exceeds {PAGE_SIZE}",
                self.alignment
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = MemoryConfig::from_json_str(r#"{ "reserve_bytes": 4096 }"#).unwrap();
        assert_eq!(config.reserve_bytes, 4096);
        assert_eq!(config.backing, BackingSource::Syscall);
        assert_eq!(config.alignment, PAGE_SIZE);
    }

    #[test]
    fn parses_backing_source() {
        let config =
            MemoryConfig::from_json_str(r#"{ "backing": "global", "alignment": 64 }"#).unwrap();
        assert_eq!(config.backing, BackingSource::Global);
        assert_eq!(config.alignment, 64);
        assert_eq!(config.reserve_bytes, DEFAULT_RESERVE_BYTES);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            MemoryConfig::from_json_str(r#"{ "reserve_bytes": 0 }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            MemoryConfig::from_json_str(r#"{ "alignment": 48 }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            MemoryConfig::from_json_str(r#"{ "alignment": 65536 }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            MemoryConfig::from_json_str(r#"{ "reserve": 1 }"#),
            Err(Error::ConfigParse(_))
        ));
    }
}
