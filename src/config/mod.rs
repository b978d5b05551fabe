//! Session configuration
//!
//! Values an operator supplies through whatever configuration source wraps
//! this crate (an INI file in the reference tooling). Loading and parsing
//! that source is the caller's concern; the engine only consumes the struct.

use std::time::Duration;

/// Default per-wait timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay after answering a pager prompt.
pub const DEFAULT_PAGINATION_DELAY: Duration = Duration::from_millis(100);

/// Operator-supplied session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Baud rate, carried for transport implementors; the engine itself
    /// never reads it.
    pub baud_rate: u32,
    /// Default timeout for wait steps without their own override.
    pub timeout: Duration,
    /// Fallback prompt symbol when auto-detection finds nothing.
    pub prompt_symbol: String,
    /// Whether pager prompts are answered automatically.
    pub pagination_enabled: bool,
    /// Settle delay after a pagination response.
    pub pagination_delay: Duration,
    /// Extra pager-prompt regex patterns beyond the built-in set.
    pub custom_pagination_patterns: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            timeout: DEFAULT_TIMEOUT,
            prompt_symbol: ">".to_string(),
            pagination_enabled: true,
            pagination_delay: DEFAULT_PAGINATION_DELAY,
            custom_pagination_patterns: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Start from defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set the default wait timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the fallback prompt symbol.
    pub fn prompt_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.prompt_symbol = symbol.into();
        self
    }

    /// Enable or disable pager auto-response.
    pub fn pagination_enabled(mut self, enabled: bool) -> Self {
        self.pagination_enabled = enabled;
        self
    }

    /// Set the settle delay after a pagination response.
    pub fn pagination_delay(mut self, delay: Duration) -> Self {
        self.pagination_delay = delay;
        self
    }

    /// Add a custom pager-prompt pattern.
    pub fn custom_pagination_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.custom_pagination_patterns.push(pattern.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SessionConfig::default();
        assert_eq!(c.timeout, Duration::from_secs(30));
        assert_eq!(c.prompt_symbol, ">");
        assert!(c.pagination_enabled);
        assert_eq!(c.pagination_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_builder_chain() {
        let c = SessionConfig::new()
            .baud_rate(9600)
            .timeout(Duration::from_secs(5))
            .prompt_symbol("#")
            .pagination_enabled(false)
            .custom_pagination_pattern(r"-- paused --");
        assert_eq!(c.baud_rate, 9600);
        assert_eq!(c.prompt_symbol, "#");
        assert!(!c.pagination_enabled);
        assert_eq!(c.custom_pagination_patterns.len(), 1);
    }
}
