//! Shell-prompt detection heuristics
//!
//! Network devices end their output with a prompt whose exact shape varies
//! by vendor and mode: `switch01>`, `admin@switch01#`, `switch01(config)#`,
//! `user@host:~/path$`. The detector infers the prompt string from recent
//! output so playbooks can wait on the sentinel `PROMPT` instead of
//! hard-coding it. Being a heuristic, a miss is never an error; callers fall
//! back to the operator-configured prompt symbol.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// How many trailing non-empty lines are scanned, newest first.
const SCAN_LINES: usize = 15;

/// Lines containing these are never prompts (banners, auth chatter).
const NOISE_MARKERS: &[&str] = &["password", "login", "welcome", "last login"];

/// Prompt shapes, most specific first. The first pattern to match any
/// scanned line wins.
const PROMPT_PATTERNS: &[&str] = &[
    r"[\w\-\.@]+\([^)]+\)[>#]\s*$",       // hostname(config)# or user@host(config)>
    r"[\w\-\.@]+[:#]\~?[\w/]*[\$>#]\s*$", // user@host:~/path$ or user@host#
    r"[\w\-\.]+[>#]\s*$",                 // hostname> or hostname#
    r"[>#]\s*$",                          // bare > or #
    r"[\w\-\.]+:\s*$",                    // hostname:
];

fn compiled_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        PROMPT_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("prompt pattern is valid"))
            .collect()
    })
}

/// Infer the device's shell prompt from buffered output.
///
/// Scans the last 15 non-empty lines from most recent to oldest, skipping
/// obvious non-prompt noise, and returns the trimmed match of the first
/// (most specific) pattern that hits. Returns `None` when nothing in the
/// window looks like a prompt.
pub fn detect_prompt(buffer_text: &str) -> Option<String> {
    if buffer_text.trim().is_empty() {
        return None;
    }

    let lines: Vec<&str> = buffer_text
        .trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    for line in lines.iter().rev().take(SCAN_LINES) {
        let lower = line.to_lowercase();
        if NOISE_MARKERS.iter().any(|m| lower.contains(m)) {
            continue;
        }
        for pattern in compiled_patterns() {
            if let Some(m) = pattern.find(line) {
                let detected = m.as_str().trim().to_string();
                debug!("auto-detected prompt: '{detected}'");
                return Some(detected);
            }
        }
    }

    debug!("no prompt pattern matched in buffer");
    None
}

/// Best-effort check whether the device is already past authentication.
///
/// Login indicators anywhere in the buffer mean we are definitely not logged
/// in; a visible prompt suggests we are. A near-empty or ambiguous buffer
/// defaults to "needs login". Wrong answers here only cost an extra login
/// exchange, so this stays a silent heuristic.
pub fn looks_logged_in(buffer: &str, detected_prompt: Option<&str>, prompt_symbol: &str) -> bool {
    let lower = buffer.to_lowercase();
    if ["login:", "username:", "password:", "user name:"]
        .iter()
        .any(|m| lower.contains(m))
    {
        debug!("login prompts present in buffer, not logged in");
        return false;
    }

    if let Some(prompt) = detected_prompt {
        if buffer.contains(prompt) {
            debug!("detected prompt '{prompt}' present, appears logged in");
            return true;
        }
    }
    if buffer.contains(prompt_symbol) || ['#', '>', '$'].iter().any(|c| buffer.contains(*c)) {
        debug!("prompt characters present, appears logged in");
        return true;
    }

    if buffer.trim().len() < 10 {
        debug!("buffer too short to judge, assuming login needed");
        return false;
    }

    false
}
