//! Read-only grouping of steps into named display blocks
//!
//! Purely cosmetic: progress UIs can show "Logging in" or "Executing: show
//! diag" instead of raw step indices. The annotation never feeds back into
//! control flow and execution semantics ignore it entirely.

use std::ops::Range;

use super::{login, Command, CommandKind, PROMPT_SENTINEL};

/// A contiguous run of steps with a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan {
    /// Display name, e.g. `Executing: show diag`.
    pub name: String,
    /// Half-open index range into the command list.
    pub range: Range<usize>,
}

/// Group a command list into named blocks.
///
/// Leading wait/send steps before the first operational send become a
/// "Logging in" block; each later send opens an "Executing: …" block that
/// absorbs its trailing waits and pauses; conditional control gets its own
/// "Conditional logic" block.
pub fn annotate_blocks(commands: &[Command]) -> Vec<BlockSpan> {
    let mut spans: Vec<BlockSpan> = Vec::new();
    let mut current: Option<(String, usize)> = None;
    let mut seen_command = false;

    let mut close = |current: &mut Option<(String, usize)>, end: usize, spans: &mut Vec<BlockSpan>| {
        if let Some((name, start)) = current.take() {
            spans.push(BlockSpan {
                name,
                range: start..end,
            });
        }
    };

    for (idx, command) in commands.iter().enumerate() {
        // Plain sends and combined send-then-wait commands both carry a
        // payload that could open an "Executing" block.
        let executes = matches!(command.kind, CommandKind::Send)
            || (command.kind == CommandKind::WaitForText && !command.payload.is_empty());

        // The first operational payload ends the login prefix; credential
        // sends before it stay grouped under "Logging in".
        if executes && !seen_command && login::has_operational_marker(&command.payload) {
            seen_command = true;
        }

        if executes && seen_command {
            close(&mut current, idx, &mut spans);
            let label = if command.payload.is_empty() {
                "Executing".to_string()
            } else {
                format!("Executing: {}", command.payload)
            };
            current = Some((label, idx));
            continue;
        }

        match &command.kind {
            CommandKind::If(_) | CommandKind::Elif(_) | CommandKind::Else | CommandKind::EndIf => {
                let in_conditional = matches!(&current, Some((name, _)) if name == "Conditional logic");
                if !in_conditional {
                    close(&mut current, idx, &mut spans);
                    current = Some(("Conditional logic".to_string(), idx));
                }
            }
            _ => {
                if current.is_none() {
                    let name = if seen_command {
                        describe_leading(command)
                    } else {
                        "Logging in".to_string()
                    };
                    current = Some((name, idx));
                }
            }
        }
    }
    close(&mut current, commands.len(), &mut spans);
    spans
}

fn describe_leading(command: &Command) -> String {
    match &command.kind {
        CommandKind::Pause => "Pausing".to_string(),
        CommandKind::WaitForText => {
            let expected = command.expected_text.as_deref().unwrap_or(PROMPT_SENTINEL);
            format!("Waiting for: {expected}")
        }
        _ => "Running".to_string(),
    }
}
