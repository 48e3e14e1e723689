//! Configuration for a debugging session.
//!
//! [`SessionConfig`] carries the request-string separators, the bounded wait used by
//! channel reads and the policies that shape one synchronization cycle.

use std::time::Duration;

use crate::{Error, Result};

/// Configuration for a [`crate::breakpoint::BreakpointCollection`].
///
/// # Examples
///
/// ```rust
/// use dotbreak::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig::new()
///     .with_separators("|", "\n")
///     .with_read_timeout(Duration::from_millis(5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Separator between file, line and id inside one request (default: `:`).
    pub split: String,

    /// Separator between two requests (default: `;`).
    pub delimiter: String,

    /// Bounded wait for a single channel read before reporting "no data" (default: 20ms).
    pub read_timeout: Duration,

    /// Maximum number of records drained by one `sync_breakpoints` call (default: 256).
    pub max_records_per_sync: usize,

    /// Retry unresolved breakpoints against all loaded images after each drain (default: true).
    pub retry_pending_on_sync: bool,

    /// Write every state change made during a sync back to the channel (default: true).
    pub report_state_changes: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            split: ":".to_string(),
            delimiter: ";".to_string(),
            read_timeout: Duration::from_millis(20),
            max_records_per_sync: 256,
            retry_pending_on_sync: true,
            report_state_changes: true,
        }
    }
}

impl SessionConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field separator and the request delimiter.
    #[must_use]
    pub fn with_separators(mut self, split: impl Into<String>, delimiter: impl Into<String>) -> Self {
        self.split = split.into();
        self.delimiter = delimiter.into();
        self
    }

    /// Sets the bounded wait of a single channel read.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the maximum number of records drained per synchronization call.
    #[must_use]
    pub fn with_max_records_per_sync(mut self, max: usize) -> Self {
        self.max_records_per_sync = max;
        self
    }

    /// Enables or disables retrying unresolved breakpoints during synchronization.
    #[must_use]
    pub fn with_retry_pending_on_sync(mut self, enabled: bool) -> Self {
        self.retry_pending_on_sync = enabled;
        self
    }

    /// Enables or disables writing state changes back to the channel.
    #[must_use]
    pub fn with_report_state_changes(mut self, enabled: bool) -> Self {
        self.report_state_changes = enabled;
        self
    }

    /// Checks that the separators can unambiguously split a request string.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if a separator is empty, if both separators are
    /// equal, or if one contains the other.
    pub fn validate(&self) -> Result<()> {
        if self.split.is_empty() || self.delimiter.is_empty() {
            return Err(Error::InvalidArgument(
                "request separators must not be empty".to_string(),
            ));
        }

        if self.split.contains(&self.delimiter) || self.delimiter.contains(&self.split) {
            return Err(Error::InvalidArgument(format!(
                "request separators overlap - '{}' and '{}'",
                self.split, self.delimiter
            )));
        }

        Ok(())
    }
}
