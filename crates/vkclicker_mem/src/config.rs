//! # Registry Configuration
//!
//! Sizes of the arena classes, loaded once at startup.
//!
//! ```toml
//! scratch_size = 33554432
//! frame_size = 1048576
//! long_lived_count = 2
//! long_lived_default_size = 33554432
//! long_lived_sizes = [4194304]
//! ```
//!
//! Missing keys fall back to [`RegistryConfig::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MemError, MemResult};
use crate::memory::arena::{LINK_BYTES, META_BYTES};

/// Default scratch arena size (32 MiB).
pub const DEFAULT_SCRATCH_SIZE: u32 = 4096 * 256 * 32;

/// Default frame arena size (1 MiB).
pub const DEFAULT_FRAME_SIZE: u32 = 4096 * 256;

/// Default long-lived arena size (32 MiB).
pub const DEFAULT_LONG_LIVED_SIZE: u32 = 4096 * 256 * 32;

/// Highest number of long-lived classes a registry can hold.
pub const MAX_LONG_LIVED: u32 = u8::MAX as u32 + 1;

/// Configuration for [`ArenaRegistry::init`](crate::ArenaRegistry::init).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// First slab size of the scratch arena in bytes.
    pub scratch_size: u32,
    /// First slab size of the frame arena in bytes.
    pub frame_size: u32,
    /// Number of long-lived arenas. Zero is treated as one.
    pub long_lived_count: u32,
    /// Size of every long-lived arena without an entry in `long_lived_sizes`.
    pub long_lived_default_size: u32,
    /// Per-class sizes, indexed by long-lived class number.
    pub long_lived_sizes: Vec<u32>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            scratch_size: DEFAULT_SCRATCH_SIZE,
            frame_size: DEFAULT_FRAME_SIZE,
            long_lived_count: 1,
            long_lived_default_size: DEFAULT_LONG_LIVED_SIZE,
            long_lived_sizes: Vec::new(),
        }
    }
}

impl RegistryConfig {
    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the document is malformed or fails [`Self::validate`].
    pub fn from_toml_str(source: &str) -> MemResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or its contents are invalid.
    pub fn load(path: impl AsRef<Path>) -> MemResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Sets the scratch arena size.
    #[must_use]
    pub const fn with_scratch_size(mut self, size: u32) -> Self {
        self.scratch_size = size;
        self
    }

    /// Sets the frame arena size.
    #[must_use]
    pub const fn with_frame_size(mut self, size: u32) -> Self {
        self.frame_size = size;
        self
    }

    /// Sets the number of long-lived arenas and their default size.
    #[must_use]
    pub const fn with_long_lived(mut self, count: u32, default_size: u32) -> Self {
        self.long_lived_count = count;
        self.long_lived_default_size = default_size;
        self
    }

    /// Number of long-lived arenas actually created.
    #[must_use]
    pub fn effective_long_lived_count(&self) -> u32 {
        self.long_lived_count.max(1)
    }

    /// Total number of arenas: scratch, frame and the long-lived classes.
    #[must_use]
    pub fn arena_count(&self) -> usize {
        2 + self.effective_long_lived_count() as usize
    }

    /// Size of long-lived arena `n`.
    #[must_use]
    pub fn long_lived_size(&self, n: usize) -> u32 {
        self.long_lived_sizes
            .get(n)
            .copied()
            .unwrap_or(self.long_lived_default_size)
    }

    /// Checks every arena size and the class count.
    ///
    /// # Errors
    ///
    /// Returns [`MemError::InvalidConfig`] if a size cannot hold a single
    /// allocation or is not a multiple of 4, or if there are more
    /// long-lived classes than [`MAX_LONG_LIVED`].
    pub fn validate(&self) -> MemResult<()> {
        if self.effective_long_lived_count() > MAX_LONG_LIVED {
            return Err(MemError::InvalidConfig(format!(
                "long_lived_count {} exceeds the maximum of {MAX_LONG_LIVED}",
                self.long_lived_count
            )));
        }
        if self.long_lived_sizes.len() > self.effective_long_lived_count() as usize {
            return Err(MemError::InvalidConfig(format!(
                "{} long_lived_sizes given for {} long-lived arenas",
                self.long_lived_sizes.len(),
                self.effective_long_lived_count()
            )));
        }

        check_size("scratch_size", self.scratch_size)?;
        check_size("frame_size", self.frame_size)?;
        for n in 0..self.effective_long_lived_count() as usize {
            check_size("long-lived size", self.long_lived_size(n))?;
        }
        Ok(())
    }
}

fn check_size(name: &str, size: u32) -> MemResult<()> {
    if size <= META_BYTES + LINK_BYTES {
        return Err(MemError::InvalidConfig(format!(
            "{name} {size} cannot hold a single allocation"
        )));
    }
    if size % 4 != 0 {
        return Err(MemError::InvalidConfig(format!(
            "{name} {size} is not a multiple of 4"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_sizes() {
        let config = RegistryConfig::default();
        assert_eq!(config.scratch_size, 32 * 1024 * 1024);
        assert_eq!(config.frame_size, 1024 * 1024);
        assert_eq!(config.arena_count(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_long_lived_still_creates_one() {
        let config = RegistryConfig::default().with_long_lived(0, 1024);
        assert_eq!(config.arena_count(), 3);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = RegistryConfig::from_toml_str(
            r"
            frame_size = 4096
            long_lived_count = 3
            long_lived_sizes = [1024]
            ",
        )
        .unwrap();
        assert_eq!(config.frame_size, 4096);
        assert_eq!(config.scratch_size, DEFAULT_SCRATCH_SIZE);
        assert_eq!(config.long_lived_size(0), 1024);
        assert_eq!(config.long_lived_size(2), DEFAULT_LONG_LIVED_SIZE);
        assert_eq!(config.arena_count(), 5);
    }

    #[test]
    fn test_rejects_unaligned_size() {
        let err = RegistryConfig::from_toml_str("scratch_size = 1023").unwrap_err();
        assert!(matches!(err, MemError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_tiny_size() {
        let config = RegistryConfig::default().with_frame_size(8);
        assert!(matches!(config.validate(), Err(MemError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_too_many_sizes() {
        let mut config = RegistryConfig::default();
        config.long_lived_sizes = vec![1024, 1024];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = RegistryConfig::from_toml_str("frame_size = \"big\"").unwrap_err();
        assert!(matches!(err, MemError::ConfigParse(_)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = RegistryConfig::load("/nonexistent/vkclicker.toml").unwrap_err();
        assert!(matches!(err, MemError::Io(_)));
    }
}
