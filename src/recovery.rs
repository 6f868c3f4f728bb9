//! Per-record error policy for streaming frame readers.
//!
//! A frame reader that fails to decode one record can either report the
//! failure and carry on with the next record, or report it and stop. Every
//! frame reader in [`crate::framing`] applies the same [`RecoveryMode`].

/// Strategy for handling a record that fails to decode mid-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryMode {
    /// Halt: report the first decode error, then yield nothing further
    Strict,
    /// Skip and continue: report the error and keep framing (default)
    #[default]
    Lenient,
}

impl RecoveryMode {
    /// Returns true if a decode error should stop the stream.
    #[must_use]
    pub const fn halts_on_error(self) -> bool {
        matches!(self, RecoveryMode::Strict)
    }
}
