//! Recovery strategies for malformed binary MARC records.
//!
//! A binary record that cannot be framed at all (bad leader, missing terminator) is
//! always reported as a failed record. Inside a readable record, the recovery mode
//! decides whether a bad directory entry or field fails the whole record or is
//! skipped so the remaining fields survive.

use crate::error::{MarcError, Result};

/// Strategy for handling malformed fields inside a binary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryMode {
    /// Strict mode: any malformed entry fails the record (default)
    #[default]
    Strict,
    /// Lenient mode: skip malformed entries and keep the rest of the record
    Lenient,
    /// Permissive mode: like lenient, and salvage fields that overrun the record
    Permissive,
}

/// Recovery context for one record being decoded.
#[derive(Debug)]
pub struct RecoveryContext {
    /// Current recovery mode
    pub mode: RecoveryMode,
    /// List of recovery messages
    pub recovery_messages: Vec<String>,
}

impl RecoveryContext {
    /// Create a new recovery context with the given mode
    #[must_use]
    pub fn new(mode: RecoveryMode) -> Self {
        RecoveryContext {
            mode,
            recovery_messages: Vec::new(),
        }
    }

    /// Whether any recovery was needed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.recovery_messages.is_empty()
    }

    /// Whether truncated field data should be salvaged.
    #[must_use]
    pub fn salvages_truncated(&self) -> bool {
        self.mode == RecoveryMode::Permissive
    }

    /// Try to recover from an error based on the recovery mode
    ///
    /// # Errors
    ///
    /// Returns the error unchanged in strict mode; otherwise logs it, records it and
    /// returns `Ok(None)` so the caller can skip the offending element.
    pub fn recover<T>(&mut self, error: MarcError, context: &str) -> Result<Option<T>> {
        match self.mode {
            RecoveryMode::Strict => Err(error),
            RecoveryMode::Lenient | RecoveryMode::Permissive => {
                tracing::warn!(mode = ?self.mode, "{context}: {error}");
                self.recovery_messages.push(format!("{context}: {error}"));
                Ok(None)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_mode_default_is_strict() {
        assert_eq!(RecoveryMode::default(), RecoveryMode::Strict);
    }

    #[test]
    fn test_recovery_mode_lenient() {
        let mut ctx = RecoveryContext::new(RecoveryMode::Lenient);
        let error = MarcError::InvalidField("test".to_string());
        let result: Result<Option<()>> = ctx.recover(error, "test context");
        assert!(result.unwrap().is_none());
        assert!(ctx.has_errors());
        assert!(ctx.recovery_messages[0].starts_with("test context"));
        assert!(!ctx.salvages_truncated());
    }

    #[test]
    fn test_recovery_mode_strict() {
        let mut ctx = RecoveryContext::new(RecoveryMode::Strict);
        let error = MarcError::InvalidField("test".to_string());
        let result: Result<Option<()>> = ctx.recover(error, "test context");
        assert!(result.is_err());
        assert!(!ctx.has_errors());
    }

    #[test]
    fn test_permissive_salvages() {
        let ctx = RecoveryContext::new(RecoveryMode::Permissive);
        assert!(ctx.salvages_truncated());
    }
}
