//! The buffered expect-match loop
//!
//! `ExpectEngine` owns the transport and the session buffer and implements
//! `wait_for_text`: a wall-clock-bounded poll loop that accumulates device
//! output, answers pager prompts along the way, and decides when a wait has
//! succeeded. Waiting never blocks without a timeout; between polls the task
//! yields through an adaptive sleep.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::buffer::{find_in, CaseMode, Occurrence, SessionBuffer};
use crate::config::SessionConfig;
use crate::pagination::{PaginationResponder, SCAN_WINDOW};
use crate::playbook::PROMPT_SENTINEL;
use crate::prompt;
use crate::result::{EngineError, WaitOutcome};
use crate::transport::Transport;

/// Sleep while polling normally.
const POLL_SLEEP: Duration = Duration::from_millis(10);

/// Sleep once the link has gone quiet for a while.
const IDLE_SLEEP: Duration = Duration::from_millis(100);

/// Empty polls before switching to the idle cadence.
const IDLE_THRESHOLD: u32 = 20;

/// Options for a single wait.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitOptions {
    /// Search the pre-existing unconsumed buffer before polling. Used for
    /// the first executed step and for login-style prompts that may already
    /// be on screen.
    pub check_existing_buffer: bool,
    /// Answer pager prompts while polling.
    pub handle_pagination: bool,
}

/// Drives one interactive session over a transport.
///
/// The session buffer is owned exclusively by the engine; heuristics like
/// prompt detection only ever receive copies of buffer-derived strings.
pub struct ExpectEngine<T: Transport> {
    transport: T,
    buffer: SessionBuffer,
    pagination: PaginationResponder,
    detected_prompt: Option<String>,
    prompt_symbol: String,
    default_timeout: Duration,
}

impl<T: Transport> ExpectEngine<T> {
    /// Create an engine over a transport with the given settings.
    pub fn new(transport: T, config: &SessionConfig) -> Self {
        Self {
            transport,
            buffer: SessionBuffer::new(),
            pagination: PaginationResponder::new(
                config.pagination_enabled,
                config.pagination_delay,
                &config.custom_pagination_patterns,
            ),
            detected_prompt: None,
            prompt_symbol: config.prompt_symbol.clone(),
            default_timeout: config.timeout,
        }
    }

    /// The prompt inferred from device output, if detection has succeeded.
    pub fn detected_prompt(&self) -> Option<&str> {
        self.detected_prompt.as_deref()
    }

    /// The operator-configured fallback prompt symbol.
    pub fn prompt_symbol(&self) -> &str {
        &self.prompt_symbol
    }

    /// Default timeout applied to waits without a per-step override.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// A copy of the current unconsumed buffer, for heuristics and logging.
    pub fn buffer_snapshot(&self) -> String {
        self.buffer.as_str().to_string()
    }

    /// Write a payload plus newline to the device.
    pub fn send_line(&mut self, payload: &str) -> Result<(), EngineError> {
        let mut data = payload.as_bytes().to_vec();
        data.push(b'\n');
        self.transport.write(&data)?;
        Ok(())
    }

    /// Wake the console: newline, Ctrl-C, newline, with short settles.
    pub async fn send_break_sequence(&mut self) -> Result<(), EngineError> {
        self.transport.write(b"\n")?;
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.transport.write(b"\x03")?;
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.transport.write(b"\n")?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(())
    }

    /// Drain the transport into the buffer for a fixed window, e.g. to
    /// collect the banner and any login prompt right after connecting.
    pub async fn read_for(&mut self, duration: Duration) -> Result<(), EngineError> {
        let start = Instant::now();
        while start.elapsed() < duration {
            let chunk = self.transport.poll_available()?;
            if !chunk.is_empty() {
                self.buffer.push_bytes(&chunk);
            }
            tokio::time::sleep(IDLE_SLEEP).await;
        }
        Ok(())
    }

    /// Run prompt detection over the buffered output.
    ///
    /// The detected prompt is set at most once per session; later calls
    /// return the stored value without re-scanning.
    pub fn detect_prompt(&mut self) -> Option<&str> {
        if self.detected_prompt.is_none() {
            self.detected_prompt = prompt::detect_prompt(self.buffer.as_str());
        }
        self.detected_prompt.as_deref()
    }

    /// Whether buffered output suggests the device is already past login.
    pub fn appears_logged_in(&self) -> bool {
        prompt::looks_logged_in(
            self.buffer.as_str(),
            self.detected_prompt.as_deref(),
            &self.prompt_symbol,
        )
    }

    /// Release the transport.
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Block until `expected` appears in device output or `timeout` elapses.
    ///
    /// `expected` equal to the sentinel `PROMPT` (case-insensitive) resolves
    /// to the detected prompt, or the fallback symbol if detection never
    /// succeeded. On success the captured output runs up to and including
    /// the match and the buffer is advanced past it, preserving trailing
    /// bytes for the next wait. On timeout the buffer is cleared entirely so
    /// a stale partial match cannot corrupt the next wait.
    pub async fn wait_for_text(
        &mut self,
        expected: &str,
        timeout: Option<Duration>,
        options: WaitOptions,
    ) -> Result<WaitOutcome, EngineError> {
        let resolved = self.resolve_expected(expected);
        let timeout = timeout.unwrap_or(self.default_timeout);

        // Prompt targets match on the LAST occurrence so that multi-page
        // output preceding the final prompt is captured in full.
        let occurrence = if self.is_prompt_target(&resolved) {
            Occurrence::Last
        } else {
            Occurrence::First
        };
        let case = if is_login_style(&resolved) {
            CaseMode::Insensitive
        } else {
            CaseMode::Sensitive
        };

        if options.check_existing_buffer {
            if let Some(m) = self.buffer.find(&resolved, occurrence, case) {
                debug!("found '{resolved}' in pre-existing buffer");
                let captured = self.buffer.consume_through(m.end);
                return Ok(WaitOutcome {
                    found: true,
                    captured,
                });
            }
        }

        let start = Instant::now();
        let mut new_output = String::new();
        let mut consecutive_empty_reads: u32 = 0;

        while start.elapsed() < timeout {
            let chunk = self.transport.poll_available()?;
            if chunk.is_empty() {
                consecutive_empty_reads += 1;
                if consecutive_empty_reads > IDLE_THRESHOLD {
                    tokio::time::sleep(IDLE_SLEEP).await;
                } else {
                    tokio::time::sleep(POLL_SLEEP).await;
                }
                continue;
            }

            consecutive_empty_reads = 0;
            new_output.push_str(&String::from_utf8_lossy(&chunk));
            self.buffer.push_bytes(&chunk);

            if options.handle_pagination {
                let fired = self
                    .pagination
                    .check_and_respond(&mut self.transport, self.buffer.tail(SCAN_WINDOW))
                    .await?;
                if fired {
                    // A pager keystroke is not the awaited text; keep
                    // reading before testing for the target.
                    continue;
                }
            }

            let search_in: &str = if options.check_existing_buffer {
                self.buffer.as_str()
            } else {
                &new_output
            };
            if let Some(m) = find_in(search_in, &resolved, occurrence, case) {
                debug!("found expected text '{resolved}'");
                if options.check_existing_buffer {
                    let captured = self.buffer.consume_through(m.end);
                    return Ok(WaitOutcome {
                        found: true,
                        captured,
                    });
                }
                let captured = new_output[..m.end].to_string();
                if let Some(bm) = self.buffer.find(&resolved, occurrence, case) {
                    self.buffer.consume_through(bm.end);
                }
                return Ok(WaitOutcome {
                    found: true,
                    captured,
                });
            }
            // More data may be pending; poll again without sleeping.
        }

        warn!("timeout: '{resolved}' not seen within {timeout:?}");
        // Fail-safe: drop unconsumed bytes so a stale partial match cannot
        // satisfy the next wait.
        let captured = if new_output.is_empty() {
            self.buffer.take_all()
        } else {
            new_output
        };
        self.buffer.clear();
        Ok(WaitOutcome {
            found: false,
            captured,
        })
    }

    /// Substitute the sentinel with the detected or fallback prompt.
    fn resolve_expected(&self, expected: &str) -> String {
        if expected.eq_ignore_ascii_case(PROMPT_SENTINEL) {
            self.detected_prompt
                .clone()
                .unwrap_or_else(|| self.prompt_symbol.clone())
        } else {
            expected.to_string()
        }
    }

    fn is_prompt_target(&self, resolved: &str) -> bool {
        resolved == self.prompt_symbol || self.detected_prompt.as_deref() == Some(resolved)
    }

    /// Direct access to the underlying transport, e.g. to adjust serial
    /// line settings mid-session or to inspect a mock in tests.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    #[cfg(test)]
    pub(crate) fn push_test_input(&mut self, text: &str) {
        self.buffer.push_bytes(text.as_bytes());
    }
}

/// Login-style prompts are matched case-insensitively: devices disagree
/// about `login:` vs `Login:` vs `Password:`.
fn is_login_style(resolved: &str) -> bool {
    let lower = resolved.to_lowercase();
    lower == "login:" || lower == "username:" || lower == "password:"
}
