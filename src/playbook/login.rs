//! Login-skip heuristic
//!
//! When the transport-level check says the device is already authenticated,
//! the presumed login prefix of the playbook is stripped so credentials are
//! not typed at a command prompt. The classification is a best-effort guess:
//! notably, any short send payload without an operational verb is treated as
//! a credential, which can misclassify legitimate short commands. That
//! hazard is documented and characterized by tests rather than "fixed".

use tracing::debug;

use super::{Command, CommandKind};

const LOGIN_KEYWORDS: &[&str] = &["login:", "username:", "user:", "password:", "admin", "enable"];
const PROMPT_TOKENS: &[&str] = &["prompt", ">", "#", "$"];
const COMMON_LOGIN_CMDS: &[&str] = &["admin", "enable", "login", "su"];
const OPERATIONAL_MARKERS: &[&str] = &["show", "config", "display", "get", "set"];

/// Whether a send payload contains an operational-command marker, ending
/// the presumed login phase.
pub(crate) fn has_operational_marker(payload: &str) -> bool {
    let lower = payload.to_lowercase();
    OPERATIONAL_MARKERS.iter().any(|m| lower.contains(m))
}

/// Strip the presumed login prefix from a command list.
///
/// Walks the list carrying a single `in_login_sequence` flag, initialized
/// true. Steps classified as login steps while the flag holds are dropped;
/// the first operational-command marker in a send payload permanently flips
/// the flag (a one-way transition), after which everything is kept.
/// Conditional control steps are never dropped. Pure function; run at most
/// once, before any transport I/O for the run itself.
pub fn filter_login_steps(commands: Vec<Command>) -> Vec<Command> {
    let mut kept = Vec::with_capacity(commands.len());
    let mut in_login_sequence = true;

    for command in commands {
        if command.is_control() {
            kept.push(command);
            continue;
        }

        let mut is_login_step = false;
        if in_login_sequence {
            match command.kind {
                // A combined send-then-wait is classified by what it sends,
                // not by the prompt wait folded into it.
                CommandKind::Send | CommandKind::WaitForText if !command.payload.is_empty() => {
                    let payload = command.payload.trim().to_lowercase();
                    if LOGIN_KEYWORDS.iter().any(|k| payload.contains(k))
                        || COMMON_LOGIN_CMDS.contains(&payload.as_str())
                    {
                        is_login_step = true;
                    } else if command.payload.trim().len() < 20
                        && !has_operational_marker(&payload)
                    {
                        // Short non-command strings are presumed credentials.
                        is_login_step = true;
                    }
                    if has_operational_marker(&payload) {
                        in_login_sequence = false;
                    }
                }
                CommandKind::WaitForText => {
                    let expected = command
                        .expected_text
                        .as_deref()
                        .unwrap_or_default()
                        .trim()
                        .to_lowercase();
                    if LOGIN_KEYWORDS.iter().any(|k| expected.contains(k))
                        || PROMPT_TOKENS.contains(&expected.as_str())
                    {
                        is_login_step = true;
                    }
                }
                _ => {}
            }
        }

        if is_login_step {
            debug!("skipping login step: {:?} '{}'", command.kind, command.payload);
        } else {
            kept.push(command);
        }
    }

    kept
}
