//! Error types for serialplay

use thiserror::Error;

/// Errors that can occur while driving a session.
///
/// A wait timing out is *not* an error: `wait_for_text` reports it as a
/// normal outcome (`WaitOutcome::found == false`). Only conditions that make
/// the current step unrecoverable surface here.
#[derive(Error, Debug)]
pub enum EngineError {
    /// I/O error on the underlying transport, including writes or polls
    /// against a closed transport.
    ///
    /// Fatal to the current step. The caller decides whether to abort the
    /// whole run (the default executor does).
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while parsing a playbook text file.
#[derive(Error, Debug)]
pub enum PlaybookError {
    /// A line did not have the `ACTION [value]` shape.
    #[error("malformed playbook line #{line}: '{text}'")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// The offending line text.
        text: String,
    },

    /// An unrecognized action keyword.
    #[error("unknown action '{action}' on playbook line #{line}")]
    UnknownAction {
        /// 1-based line number.
        line: usize,
        /// The action keyword as written.
        action: String,
    },

    /// PAUSE with a missing, non-numeric, or negative duration.
    #[error("invalid pause value '{value}' on playbook line #{line}")]
    InvalidPause {
        /// 1-based line number.
        line: usize,
        /// The value as written.
        value: String,
    },

    /// The playbook contained no commands at all.
    #[error("playbook is empty")]
    Empty,
}

/// Structural errors in conditional blocks.
///
/// These are reported to the observer and then locally absorbed: the
/// affected branch evaluates false and the run continues.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConditionalError {
    /// ELIF with no open IF block.
    #[error("ELIF without matching IF")]
    ElifWithoutIf,

    /// ELSE with no open IF block.
    #[error("ELSE without matching IF")]
    ElseWithoutIf,

    /// ENDIF with no open IF block.
    #[error("ENDIF without matching IF")]
    EndifWithoutIf,

    /// ELIF after the block already switched to ELSE.
    #[error("ELIF after ELSE")]
    ElifAfterElse,

    /// A second ELSE in the same block.
    #[error("duplicate ELSE")]
    ElseAfterElse,
}
