//! Session buffer: received-but-unconsumed console output

use std::ops::Range;

/// Which occurrence of the expected text wins when it appears several times.
///
/// Prompt targets use `Last` so that multi-line or paged command output
/// preceding the final prompt is captured in full; any other literal text
/// uses `First`. Changing this silently truncates paged output, so the
/// policy is fixed at the call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    /// Earliest match in the search target.
    First,
    /// Latest match in the search target.
    Last,
}

/// Case handling for a buffer search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    /// Exact byte comparison.
    Sensitive,
    /// ASCII case-insensitive comparison (login-style prompts).
    Insensitive,
}

/// The accumulated-but-unconsumed input buffer.
///
/// Owned exclusively by the expect engine: it grows on every transport read,
/// shrinks (prefix removed) on a successful match, and is cleared entirely on
/// timeout. No other component ever holds a reference to it; heuristics get
/// copies of buffer-derived strings.
#[derive(Debug, Default)]
pub struct SessionBuffer {
    text: String,
}

impl SessionBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw transport bytes, decoding lossily.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.text.push_str(&String::from_utf8_lossy(data));
    }

    /// The buffered text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Buffered length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Drop everything. Used as the timeout fail-safe.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Take the whole buffer, leaving it empty.
    pub fn take_all(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    /// The last `max_bytes` of the buffer, aligned to a char boundary.
    /// Pagination prompts always sit near the tail, so scans stay bounded.
    pub fn tail(&self, max_bytes: usize) -> &str {
        if self.text.len() <= max_bytes {
            return &self.text;
        }
        let mut start = self.text.len() - max_bytes;
        while !self.text.is_char_boundary(start) {
            start += 1;
        }
        &self.text[start..]
    }

    /// Search the buffer for `needle` under the given occurrence policy.
    pub fn find(&self, needle: &str, occurrence: Occurrence, case: CaseMode) -> Option<Range<usize>> {
        find_in(&self.text, needle, occurrence, case)
    }

    /// Remove and return the prefix up to `end` (exclusive). Trailing bytes
    /// received after the match stay buffered for the next wait.
    pub fn consume_through(&mut self, end: usize) -> String {
        let end = end.min(self.text.len());
        let rest = self.text.split_off(end);
        std::mem::replace(&mut self.text, rest)
    }
}

/// Substring search with occurrence and case policy, shared between the
/// buffer and the engine's newly-read accumulator.
pub fn find_in(
    haystack: &str,
    needle: &str,
    occurrence: Occurrence,
    case: CaseMode,
) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    match case {
        CaseMode::Sensitive => {
            let start = match occurrence {
                Occurrence::First => haystack.find(needle)?,
                Occurrence::Last => haystack.rfind(needle)?,
            };
            Some(start..start + needle.len())
        }
        CaseMode::Insensitive => {
            let hay = haystack.as_bytes();
            let pat = needle.as_bytes();
            if pat.len() > hay.len() {
                return None;
            }
            let positions = (0..=hay.len() - pat.len())
                .filter(|&i| haystack.is_char_boundary(i))
                .filter(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat));
            let start = match occurrence {
                Occurrence::First => positions.clone().next()?,
                Occurrence::Last => positions.last()?,
            };
            Some(start..start + pat.len())
        }
    }
}
