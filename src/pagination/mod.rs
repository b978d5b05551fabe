//! Automatic responses to device pager prompts
//!
//! Network consoles interrupt long output with prompts like `--More--` or
//! `Press any key to continue`. The responder scans the tail of the session
//! buffer for them while the engine polls and answers with the keystroke the
//! device expects, so a wait never stalls on a pager.

use regex::RegexBuilder;
use std::io;
use std::time::Duration;
use tracing::{debug, warn};

use crate::transport::Transport;

/// Only this many bytes at the buffer tail are scanned per poll. Pager
/// prompts always sit near the end of the received stream.
pub const SCAN_WINDOW: usize = 200;

/// Pager prompts recognized out of the box, ordered roughly by how often
/// they show up across vendors.
const DEFAULT_PATTERNS: &[&str] = &[
    r"--More--",
    r"--- MORE ---",
    r"Press any key to continue",
    r"\(q\)uit.*more",
    r"Continue\? \[y/n\]",
    r"Next page\?",
    r"--\s*Press\s+SPACE\s+to\s+continue",
    r"\(Press q to quit\)",
    r"Type <space> for more",
    r"More \(.*\)",
    r"--More-- \(.*\)",
    r"\[Press space to continue\]",
    r"Press SPACE to continue or Q to quit",
];

/// Detects pager prompts in recent output and writes the auto-response.
pub struct PaginationResponder {
    enabled: bool,
    delay: Duration,
    pattern: Option<regex::Regex>,
}

impl PaginationResponder {
    /// Build a responder from the default pattern set plus operator-supplied
    /// custom patterns. An invalid custom pattern disables the responder
    /// rather than failing session setup.
    pub fn new(enabled: bool, delay: Duration, custom_patterns: &[String]) -> Self {
        let combined = DEFAULT_PATTERNS
            .iter()
            .map(|s| (*s).to_string())
            .chain(custom_patterns.iter().cloned())
            .collect::<Vec<_>>()
            .join("|");

        match RegexBuilder::new(&combined)
            .case_insensitive(true)
            .multi_line(true)
            .build()
        {
            Ok(re) => Self {
                enabled,
                delay,
                pattern: Some(re),
            },
            Err(e) => {
                warn!("invalid pagination pattern, auto-response disabled: {e}");
                Self {
                    enabled: false,
                    delay,
                    pattern: None,
                }
            }
        }
    }

    /// Whether pager auto-response is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.pattern.is_some()
    }

    /// Check the buffer tail for a pager prompt and answer it.
    ///
    /// Returns `true` if a response was sent; the caller then resumes
    /// polling without testing for its expected text yet, since a pager
    /// keystroke is not the awaited output. No match is the normal case on
    /// every poll, never an error.
    pub async fn check_and_respond<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        buffer_tail: &str,
    ) -> io::Result<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }
        let Some(pattern) = &self.pattern else {
            return Ok(false);
        };
        let Some(m) = pattern.find(buffer_tail) else {
            return Ok(false);
        };

        let prompt = m.as_str();
        debug!("pagination prompt detected: '{prompt}'");
        transport.write(response_for(prompt))?;

        // Let the device flush the next page before the caller polls again.
        tokio::time::sleep(self.delay).await;
        Ok(true)
    }
}

/// Pick the keystroke a pager prompt expects.
///
/// The yes/no check runs before the generic "continue" keyword: a prompt
/// like `Continue? [y/n]` contains both, and must be answered with `y`, not
/// a space.
fn response_for(prompt: &str) -> &'static [u8] {
    let lower = prompt.to_lowercase();
    if lower.contains("[y/n]") || lower.contains("continue?") {
        b"y\n"
    } else if lower.contains("any key") {
        b"\n"
    } else if lower.contains("space")
        || lower.contains("continue")
        || lower.contains("--more--")
        || lower.contains("--- more ---")
    {
        b" "
    } else {
        b" "
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn responder() -> PaginationResponder {
        PaginationResponder::new(true, Duration::from_millis(1), &[])
    }

    #[tokio::test]
    async fn test_more_prompt_gets_space() {
        let mut t = MockTransport::new();
        let fired = responder()
            .check_and_respond(&mut t, "line one\n--More--")
            .await
            .unwrap();
        assert!(fired);
        assert_eq!(t.written(), " ");
    }

    #[tokio::test]
    async fn test_any_key_prompt_gets_newline() {
        let mut t = MockTransport::new();
        let fired = responder()
            .check_and_respond(&mut t, "Press any key to continue")
            .await
            .unwrap();
        assert!(fired);
        assert_eq!(t.written(), "\n");
    }

    #[tokio::test]
    async fn test_yes_no_prompt_gets_y() {
        let mut t = MockTransport::new();
        let fired = responder()
            .check_and_respond(&mut t, "Continue? [y/n]")
            .await
            .unwrap();
        assert!(fired);
        assert_eq!(t.written(), "y\n");
    }

    #[tokio::test]
    async fn test_case_insensitive_match() {
        let mut t = MockTransport::new();
        let fired = responder()
            .check_and_respond(&mut t, "--MORE--")
            .await
            .unwrap();
        assert!(fired);
    }

    #[tokio::test]
    async fn test_no_match_is_normal() {
        let mut t = MockTransport::new();
        let fired = responder()
            .check_and_respond(&mut t, "plain command output")
            .await
            .unwrap();
        assert!(!fired);
        assert!(t.written().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_never_fires() {
        let r = PaginationResponder::new(false, Duration::from_millis(1), &[]);
        let mut t = MockTransport::new();
        assert!(!r.check_and_respond(&mut t, "--More--").await.unwrap());
    }

    #[tokio::test]
    async fn test_custom_pattern() {
        let r = PaginationResponder::new(
            true,
            Duration::from_millis(1),
            &[r"-- paused --".to_string()],
        );
        let mut t = MockTransport::new();
        let fired = r.check_and_respond(&mut t, "output\n-- paused --").await.unwrap();
        assert!(fired);
        assert_eq!(t.written(), " ");
    }

    #[test]
    fn test_invalid_custom_pattern_disables() {
        let r = PaginationResponder::new(true, Duration::from_millis(1), &["(((".to_string()]);
        assert!(!r.is_enabled());
    }
}
