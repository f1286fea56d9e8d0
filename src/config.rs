//! Reader configuration

use crate::decoder::DecodeOptions;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the directory that holds `mmv/` segments
pub const TMP_DIR_ENV: &str = "PCP_TMP_DIR";

/// Default initial backoff between snapshot attempts (50us)
const DEFAULT_BACKOFF: Duration = Duration::from_micros(50);

/// Default cap on the backoff between snapshot attempts (10ms)
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_millis(10);

/// Bounded retry for torn generations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total decode attempts, at least one
    pub max_attempts: u32,
    /// Wait before the second attempt; doubles per attempt
    pub backoff: Duration,
    /// Upper bound on a single wait
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Decode once and report a torn segment as an error
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Wait before attempt `attempt + 1`, where `attempt` counts from 1
    pub fn delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.backoff
            .saturating_mul(1 << shift)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            backoff: DEFAULT_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

/// Segment reader configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderConfig {
    pub retry: RetryPolicy,
    pub decode: DecodeOptions,
}

/// Well-known location of the default segment: `$PCP_TMP_DIR/mmv/test`,
/// or under the system temporary directory when the variable is unset.
pub fn default_segment_path() -> PathBuf {
    let base = std::env::var_os(TMP_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    base.join("mmv").join("test")
}
