//! Configuration for stream readers.
//!
//! [`ReaderConfig`] controls how much input a [`crate::reader::FramedReader`]
//! pulls from its source per chunk and how per-record decode failures are
//! handled.
//!
//! # Examples
//!
//! ```
//! use marcshift::{ReaderConfig, RecoveryMode};
//!
//! let config = ReaderConfig::default()
//!     .with_buffer_size(4096)
//!     .with_recovery_mode(RecoveryMode::Strict);
//! assert_eq!(config.buffer_size, 4096);
//! ```

use crate::recovery::RecoveryMode;

/// Default number of bytes read from the source per chunk.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for framed readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Bytes requested from the underlying source per read (minimum 1)
    pub buffer_size: usize,
    /// What to do when a record fails to decode
    pub recovery_mode: RecoveryMode,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            recovery_mode: RecoveryMode::default(),
        }
    }
}

impl ReaderConfig {
    /// Set the chunk size; zero is raised to one.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Set the recovery mode.
    #[must_use]
    pub fn with_recovery_mode(mut self, recovery_mode: RecoveryMode) -> Self {
        self.recovery_mode = recovery_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.recovery_mode, RecoveryMode::Lenient);
    }

    #[test]
    fn test_zero_buffer_size_is_clamped() {
        assert_eq!(ReaderConfig::default().with_buffer_size(0).buffer_size, 1);
    }
}
