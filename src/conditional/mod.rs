//! IF/ELIF/ELSE/ENDIF evaluation over captured command output
//!
//! Conditions only ever see the output captured by the immediately preceding
//! wait step; there is no other data channel into evaluation. Blocks nest via
//! a LIFO frame stack, and branch selection is first-true-wins: once one arm
//! of a block has run, later ELIF conditions are forced false without being
//! evaluated.

use regex::RegexBuilder;
use tracing::{debug, warn};

use crate::result::ConditionalError;

/// How a condition compares its needle against the last captured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondKind {
    /// Case-sensitive substring test.
    Contains,
    /// Case-insensitive substring test.
    ContainsI,
    /// Negated case-sensitive substring test.
    NotContains,
    /// Negated case-insensitive substring test.
    NotContainsI,
    /// Unanchored case-insensitive regex search.
    Regex,
    /// Negated unanchored regex search.
    NotRegex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    If,
    Elif,
    Else,
}

/// One open conditional block. Pushed by IF, mutated in place by ELIF/ELSE,
/// popped by ENDIF.
#[derive(Debug, Clone)]
struct Frame {
    kind: FrameKind,
    condition_met: bool,
    branch_already_taken: bool,
}

/// Stack machine deciding whether ordinary steps execute.
///
/// An empty stack means unconditional execution. Frames are single-owner
/// state: nothing outside this processor sees or mutates them.
#[derive(Debug, Default)]
pub struct ConditionalProcessor {
    last_output: String,
    stack: Vec<Frame>,
}

impl ConditionalProcessor {
    /// Create a processor with no open blocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all state for a fresh playbook run.
    pub fn reset(&mut self) {
        self.last_output.clear();
        self.stack.clear();
    }

    /// Record the output captured by the latest wait step. This is the only
    /// way data enters condition evaluation.
    pub fn update_last_output(&mut self, output: &str) {
        self.last_output = output.to_string();
    }

    /// Whether an ordinary (non-control) step should run right now.
    pub fn should_execute(&self) -> bool {
        match self.stack.last() {
            None => true,
            Some(frame) => frame.condition_met,
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Open a block whose condition is evaluated against the last output.
    pub fn process_if(&mut self, kind: CondKind, needle: &str) {
        let met = evaluate(kind, needle, &self.last_output);
        debug!("IF {kind:?} '{needle}' -> {met}");
        self.stack.push(Frame {
            kind: FrameKind::If,
            condition_met: met,
            branch_already_taken: met,
        });
    }

    /// Open a block that can never execute, including its ELIF/ELSE arms.
    ///
    /// Used for an IF nested inside a branch that is itself being skipped:
    /// the frame keeps the nesting balanced while keeping every arm inert.
    pub fn push_inert(&mut self) {
        self.stack.push(Frame {
            kind: FrameKind::If,
            condition_met: false,
            branch_already_taken: true,
        });
    }

    /// Re-arm the open block with a new condition, unless a branch already
    /// ran (first-true-wins: no needless evaluation in that case).
    pub fn process_elif(&mut self, kind: CondKind, needle: &str) -> Result<(), ConditionalError> {
        let frame = self.stack.last_mut().ok_or(ConditionalError::ElifWithoutIf)?;
        if frame.kind == FrameKind::Else {
            return Err(ConditionalError::ElifAfterElse);
        }
        frame.kind = FrameKind::Elif;
        if frame.branch_already_taken {
            frame.condition_met = false;
            debug!("ELIF {kind:?} '{needle}' short-circuited, branch already taken");
        } else {
            let met = evaluate(kind, needle, &self.last_output);
            debug!("ELIF {kind:?} '{needle}' -> {met}");
            frame.condition_met = met;
            frame.branch_already_taken = met;
        }
        Ok(())
    }

    /// Switch the open block to its ELSE arm.
    pub fn process_else(&mut self) -> Result<(), ConditionalError> {
        let frame = self.stack.last_mut().ok_or(ConditionalError::ElseWithoutIf)?;
        if frame.kind == FrameKind::Else {
            return Err(ConditionalError::ElseAfterElse);
        }
        frame.kind = FrameKind::Else;
        frame.condition_met = !frame.branch_already_taken;
        frame.branch_already_taken = true;
        Ok(())
    }

    /// Close the innermost open block.
    pub fn process_endif(&mut self) -> Result<(), ConditionalError> {
        self.stack
            .pop()
            .map(|_| ())
            .ok_or(ConditionalError::EndifWithoutIf)
    }
}

/// Evaluate one condition against the captured output.
///
/// An invalid regex is reported and evaluates to false, for the negated kind
/// too: a broken pattern never throws out of the engine and never enables a
/// branch.
fn evaluate(kind: CondKind, needle: &str, output: &str) -> bool {
    match kind {
        CondKind::Contains => output.contains(needle),
        CondKind::NotContains => !output.contains(needle),
        CondKind::ContainsI => output.to_lowercase().contains(&needle.to_lowercase()),
        CondKind::NotContainsI => !output.to_lowercase().contains(&needle.to_lowercase()),
        CondKind::Regex | CondKind::NotRegex => {
            let matched = match RegexBuilder::new(needle).case_insensitive(true).build() {
                Ok(re) => re.is_match(output),
                Err(e) => {
                    warn!("invalid regex pattern '{needle}': {e}");
                    return false;
                }
            };
            if kind == CondKind::Regex {
                matched
            } else {
                !matched
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_output(output: &str) -> ConditionalProcessor {
        let mut p = ConditionalProcessor::new();
        p.update_last_output(output);
        p
    }

    #[test]
    fn test_empty_stack_always_executes() {
        let p = ConditionalProcessor::new();
        assert!(p.should_execute());
    }

    #[test]
    fn test_if_contains_true() {
        let mut p = with_output("xyz");
        p.process_if(CondKind::Contains, "x");
        assert!(p.should_execute());
    }

    #[test]
    fn test_if_contains_false() {
        let mut p = with_output("xyz");
        p.process_if(CondKind::Contains, "q");
        assert!(!p.should_execute());
    }

    #[test]
    fn test_first_true_wins_over_elif() {
        let mut p = with_output("xyz");
        p.process_if(CondKind::Contains, "x");
        assert!(p.should_execute());

        // A later true ELIF never flips the branch back on.
        p.process_elif(CondKind::Contains, "y").unwrap();
        assert!(!p.should_execute());
    }

    #[test]
    fn test_elif_taken_after_false_if() {
        let mut p = with_output("xyz");
        p.process_if(CondKind::Contains, "q");
        assert!(!p.should_execute());

        p.process_elif(CondKind::Contains, "y").unwrap();
        assert!(p.should_execute());
    }

    #[test]
    fn test_else_runs_when_nothing_matched() {
        let mut p = with_output("xyz");
        p.process_if(CondKind::Contains, "q");
        p.process_elif(CondKind::Contains, "r").unwrap();
        p.process_else().unwrap();
        assert!(p.should_execute());
    }

    #[test]
    fn test_else_skipped_when_branch_taken() {
        let mut p = with_output("xyz");
        p.process_if(CondKind::Contains, "x");
        p.process_else().unwrap();
        assert!(!p.should_execute());
    }

    #[test]
    fn test_endif_restores_outer_context() {
        let mut p = with_output("xyz");
        p.process_if(CondKind::Contains, "q");
        assert!(!p.should_execute());
        p.process_endif().unwrap();
        assert!(p.should_execute());
        assert_eq!(p.depth(), 0);
    }

    #[test]
    fn test_structural_errors() {
        let mut p = ConditionalProcessor::new();
        assert_eq!(
            p.process_elif(CondKind::Contains, "x").unwrap_err(),
            ConditionalError::ElifWithoutIf
        );
        assert_eq!(p.process_else().unwrap_err(), ConditionalError::ElseWithoutIf);
        assert_eq!(p.process_endif().unwrap_err(), ConditionalError::EndifWithoutIf);

        p.process_if(CondKind::Contains, "x");
        p.process_else().unwrap();
        assert_eq!(
            p.process_elif(CondKind::Contains, "x").unwrap_err(),
            ConditionalError::ElifAfterElse
        );
        assert_eq!(p.process_else().unwrap_err(), ConditionalError::ElseAfterElse);
    }

    #[test]
    fn test_inert_frame_suppresses_all_arms() {
        let mut p = with_output("xyz");
        p.push_inert();
        assert!(!p.should_execute());

        p.process_elif(CondKind::Contains, "x").unwrap();
        assert!(!p.should_execute());

        p.process_else().unwrap();
        assert!(!p.should_execute());

        p.process_endif().unwrap();
        assert!(p.should_execute());
    }

    #[test]
    fn test_case_insensitive_kinds() {
        let mut p = with_output("ERROR: link down");
        p.process_if(CondKind::ContainsI, "error");
        assert!(p.should_execute());
        p.process_endif().unwrap();

        p.process_if(CondKind::NotContainsI, "ERROR");
        assert!(!p.should_execute());
    }

    #[test]
    fn test_regex_kinds() {
        let mut p = with_output("version 3.6.8100");
        p.process_if(CondKind::Regex, r"version \d+\.\d+");
        assert!(p.should_execute());
        p.process_endif().unwrap();

        p.process_if(CondKind::NotRegex, r"version \d+\.\d+");
        assert!(!p.should_execute());
    }

    #[test]
    fn test_invalid_regex_is_false_even_negated() {
        let mut p = with_output("anything");
        p.process_if(CondKind::Regex, "(((");
        assert!(!p.should_execute());
        p.process_endif().unwrap();

        p.process_if(CondKind::NotRegex, "(((");
        assert!(!p.should_execute());
    }

    #[test]
    fn test_empty_output_semantics() {
        let mut p = ConditionalProcessor::new();
        p.process_if(CondKind::Contains, "x");
        assert!(!p.should_execute());
        p.process_endif().unwrap();

        p.process_if(CondKind::NotContains, "x");
        assert!(p.should_execute());
    }

    #[test]
    fn test_conditions_see_only_latest_output() {
        let mut p = with_output("first output");
        p.update_last_output("second output");
        p.process_if(CondKind::Contains, "first");
        assert!(!p.should_execute());
    }
}
