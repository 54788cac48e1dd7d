//! # Channel Configuration
//!
//! A plain configuration struct for one channel, in the shape of the
//! reference codebase's `BenchmarkConfig`/`TransportConfig`: a single struct
//! with a `Default` impl carrying the chosen defaults, constructed directly
//! by library users. There is no CLI parsing here — building a config from
//! command-line arguments is a named Non-goal; only the cleanup binary
//! parses arguments, and it does not construct a `ChannelConfig`.

use std::time::Duration;

/// Default buffer size for a channel's two mapped regions, in bytes.
///
/// Chosen for small-message channels rather than the reference codebase's
/// larger benchmark defaults (which exist to stress throughput, not to
/// minimize idle footprint); raise it explicitly for channels expecting
/// large payloads.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default bounded wait applied uniformly to every send/receive.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The two parameters that must agree between a channel's creator and
/// opener: `buffer_size` and `timeout`.
///
/// `timeout: None` means unbounded waits and must be requested explicitly;
/// the `Default` impl always carries `Some(DEFAULT_TIMEOUT)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelConfig {
    pub buffer_size: usize,
    pub timeout: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl ChannelConfig {
    /// A config carrying an explicit buffer size and the default timeout.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            ..Self::default()
        }
    }

    /// A config carrying an explicit timeout and the default buffer size.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_bounded_timeout() {
        let config = ChannelConfig::default();
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.timeout, Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn with_buffer_size_keeps_default_timeout() {
        let config = ChannelConfig::with_buffer_size(256);
        assert_eq!(config.buffer_size, 256);
        assert_eq!(config.timeout, Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn with_timeout_keeps_default_buffer_size() {
        let config = ChannelConfig::with_timeout(None);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.timeout, None);
    }
}
