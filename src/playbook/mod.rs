//! Playbook commands and the line-oriented playbook format
//!
//! A playbook is an ordered list of send/wait/conditional steps describing
//! one automation run. The text format is deliberately trivial: one
//! `ACTION [value]` per line, `#` comments, optional surrounding quotes on
//! the value. A sentinel `WAIT PROMPT` directly after a `SEND` folds into it,
//! making one combined send-then-wait command; literal wait targets stay
//! standalone. Everything interesting happens at execution time, not parse
//! time; in particular the sentinel `PROMPT` is resolved when the wait runs.

mod blocks;
mod login;

pub use blocks::{annotate_blocks, BlockSpan};
pub use login::filter_login_steps;

use std::time::Duration;

use crate::conditional::CondKind;
use crate::result::PlaybookError;

/// The sentinel wait target meaning "whatever prompt was detected or
/// configured", resolved at wait time.
pub const PROMPT_SENTINEL: &str = "PROMPT";

/// What a single playbook step does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Write the payload (plus newline) to the device.
    Send,
    /// Optionally send the payload, then block until the expected text
    /// appears or the timeout elapses.
    WaitForText,
    /// Sleep for the step's delay.
    Pause,
    /// Open a conditional block.
    If(CondKind),
    /// Re-arm the innermost open block with a new condition.
    Elif(CondKind),
    /// Switch the innermost open block to its fallback arm.
    Else,
    /// Close the innermost open block.
    EndIf,
}

/// One immutable playbook step.
#[derive(Debug, Clone)]
pub struct Command {
    /// Step kind.
    pub kind: CommandKind,
    /// Text to send, or the condition needle for If/Elif.
    pub payload: String,
    /// Wait target; `PROMPT` unless the playbook gave literal text.
    pub expected_text: Option<String>,
    /// Per-step wait timeout override; the session default applies if unset.
    pub timeout: Option<Duration>,
    /// Sleep after a send, or the pause length.
    pub delay: Duration,
}

impl Command {
    /// A plain send step.
    pub fn send(payload: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Send,
            payload: payload.into(),
            expected_text: None,
            timeout: None,
            delay: Duration::ZERO,
        }
    }

    /// A wait step with no command attached.
    pub fn wait(expected: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::WaitForText,
            payload: String::new(),
            expected_text: Some(expected.into()),
            timeout: None,
            delay: Duration::ZERO,
        }
    }

    /// A pause step.
    pub fn pause(duration: Duration) -> Self {
        Self {
            kind: CommandKind::Pause,
            payload: String::new(),
            expected_text: None,
            timeout: None,
            delay: duration,
        }
    }

    fn control(kind: CommandKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
            expected_text: None,
            timeout: None,
            delay: Duration::ZERO,
        }
    }

    /// Whether this step is conditional flow control (never skipped, never
    /// dropped by the login filter).
    pub fn is_control(&self) -> bool {
        matches!(
            self.kind,
            CommandKind::If(_) | CommandKind::Elif(_) | CommandKind::Else | CommandKind::EndIf
        )
    }

    /// One-line human description for step observers.
    pub fn description(&self) -> String {
        match &self.kind {
            CommandKind::Send => format!("Sending: {}", ellipsize(&self.payload, 30)),
            CommandKind::WaitForText => {
                if !self.payload.is_empty() {
                    return format!("Sending: {}", ellipsize(&self.payload, 30));
                }
                let expected = self.expected_text.as_deref().unwrap_or(PROMPT_SENTINEL);
                if expected.eq_ignore_ascii_case(PROMPT_SENTINEL) {
                    "Waiting for prompt".to_string()
                } else {
                    format!("Waiting for: {}", ellipsize(expected, 20))
                }
            }
            CommandKind::Pause => format!("Pausing {:.1}s", self.delay.as_secs_f64()),
            CommandKind::If(kind) => format!("Evaluating IF {kind:?} '{}'", self.payload),
            CommandKind::Elif(kind) => format!("Evaluating ELIF {kind:?} '{}'", self.payload),
            CommandKind::Else => "ELSE".to_string(),
            CommandKind::EndIf => "ENDIF".to_string(),
        }
    }
}

fn ellipsize(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

/// A parsed playbook: the command list plus the optional SUCCESS message.
#[derive(Debug, Clone, Default)]
pub struct Playbook {
    /// Steps in execution order.
    pub commands: Vec<Command>,
    /// Custom message reported on a fully successful run.
    pub success_message: Option<String>,
}

impl Playbook {
    /// Parse playbook text.
    ///
    /// Empty lines and `#` comments are skipped. `SUCCESS <message>` is
    /// captured but never becomes an executable step.
    pub fn parse(input: &str) -> Result<Self, PlaybookError> {
        let mut commands = Vec::new();
        let mut success_message = None;

        for (idx, raw_line) in input.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (action, value) = match line.split_once(' ') {
                Some((a, v)) => (a.to_uppercase(), strip_quotes(v.trim())),
                None => (line.to_uppercase(), String::new()),
            };

            match action.as_str() {
                "SEND" => commands.push(Command::send(value)),
                "WAIT" => {
                    let sentinel =
                        value.is_empty() || value.eq_ignore_ascii_case(PROMPT_SENTINEL);
                    if sentinel {
                        // A prompt wait right after a send is one logical
                        // step: run the command, then wait for the prompt.
                        if let Some(prev) = commands.last_mut() {
                            if prev.kind == CommandKind::Send {
                                prev.kind = CommandKind::WaitForText;
                                prev.expected_text = Some(PROMPT_SENTINEL.to_string());
                                continue;
                            }
                        }
                        commands.push(Command::wait(PROMPT_SENTINEL));
                    } else {
                        commands.push(Command::wait(value));
                    }
                }
                "PAUSE" => {
                    let secs: f64 = value.parse().map_err(|_| PlaybookError::InvalidPause {
                        line: line_no,
                        value: value.clone(),
                    })?;
                    if !secs.is_finite() || secs < 0.0 {
                        return Err(PlaybookError::InvalidPause {
                            line: line_no,
                            value,
                        });
                    }
                    commands.push(Command::pause(Duration::from_secs_f64(secs)));
                }
                "ELSE" => commands.push(Command::control(CommandKind::Else, "")),
                "ENDIF" => commands.push(Command::control(CommandKind::EndIf, "")),
                "SUCCESS" => success_message = Some(value),
                _ => {
                    if let Some(kind) = parse_condition_action(&action) {
                        if value.is_empty() {
                            return Err(PlaybookError::MalformedLine {
                                line: line_no,
                                text: line.to_string(),
                            });
                        }
                        commands.push(Command::control(kind, value));
                    } else {
                        return Err(PlaybookError::UnknownAction {
                            line: line_no,
                            action,
                        });
                    }
                }
            }
        }

        if commands.is_empty() && success_message.is_none() {
            return Err(PlaybookError::Empty);
        }

        Ok(Self {
            commands,
            success_message,
        })
    }
}

fn parse_condition_action(action: &str) -> Option<CommandKind> {
    let (constructor, cond): (fn(CondKind) -> CommandKind, &str) =
        if let Some(rest) = action.strip_prefix("IF_") {
            (CommandKind::If, rest)
        } else if let Some(rest) = action.strip_prefix("ELIF_") {
            (CommandKind::Elif, rest)
        } else {
            return None;
        };

    let kind = match cond {
        "CONTAINS" => CondKind::Contains,
        "CONTAINS_I" => CondKind::ContainsI,
        "NOT_CONTAINS" => CondKind::NotContains,
        "NOT_CONTAINS_I" => CondKind::NotContainsI,
        "REGEX" => CondKind::Regex,
        "NOT_REGEX" => CondKind::NotRegex,
        _ => return None,
    };
    Some(constructor(kind))
}

fn strip_quotes(value: &str) -> String {
    let bytes = value.as_bytes();
    if value.len() >= 2 {
        let (first, last) = (bytes[0], bytes[value.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}
