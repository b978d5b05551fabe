//! serialplay: scripted automation of serial-console CLIs
//!
//! serialplay drives interactive command-line devices (network switches,
//! embedded boards, anything behind a serial console) from line-oriented
//! playbooks, in the spirit of the Unix `expect` utility. It provides an
//! async engine for sending input and waiting on expected output, plus an
//! executor that runs whole playbooks with conditional branching.
//!
//! # Features
//!
//! - **Playbooks**: trivial `ACTION value` text files with send, wait,
//!   pause, and IF/ELIF/ELSE/ENDIF steps
//! - **Async/await**: built on tokio, with adaptive polling and timeouts
//!   on every wait
//! - **Prompt detection**: infers the device's shell prompt so playbooks
//!   can wait on the `PROMPT` sentinel instead of hard-coding it
//! - **Pagination handling**: answers `--More--` style pager prompts
//!   automatically while waiting
//! - **Login awareness**: skips a playbook's login prefix when the device
//!   is already authenticated
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use serialplay::{
//!     ExpectEngine, MockTransport, NullObserver, Playbook, PlaybookExecutor, SessionConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Any Transport works; MockTransport scripts a fake device.
//!     let mut device = MockTransport::new();
//!     device.push_incoming("switch01 login: ");
//!     device.reply_on("show version", "SwitchOS 3.6.8\nswitch01> ");
//!
//!     let playbook = Playbook::parse(
//!         "WAIT login:\n\
//!          SEND admin\n\
//!          WAIT Password:\n\
//!          SEND secret\n\
//!          WAIT PROMPT\n\
//!          SEND show version\n\
//!          WAIT PROMPT\n\
//!          SUCCESS upgrade check complete\n",
//!     )?;
//!
//!     let config = SessionConfig::new().prompt_symbol(">");
//!     let mut engine = ExpectEngine::new(device, &config);
//!     let mut executor = PlaybookExecutor::new();
//!
//!     let report = executor
//!         .execute(&mut engine, &playbook, &mut NullObserver)
//!         .await?;
//!     println!("{}/{} steps, success: {}", report.completed, report.total, report.success);
//!     Ok(())
//! }
//! ```
//!
//! # Conditional playbooks
//!
//! Wait steps capture the output leading up to their match; conditional
//! steps branch on that captured output:
//!
//! ```text
//! SEND show interfaces
//! WAIT PROMPT
//! IF_CONTAINS_I link down
//! SEND reset interface 1
//! WAIT PROMPT
//! ELSE
//! SEND show clock
//! WAIT PROMPT
//! ENDIF
//! ```

#![warn(missing_docs)]

pub mod buffer;
pub mod conditional;
pub mod config;
pub mod engine;
pub mod executor;
pub mod pagination;
pub mod playbook;
pub mod prompt;
pub mod result;
pub mod transport;

// Public API exports
pub use conditional::{CondKind, ConditionalProcessor};
pub use config::SessionConfig;
pub use engine::{ExpectEngine, WaitOptions};
pub use executor::{ExecutorState, NullObserver, PlaybookExecutor, StepObserver};
pub use playbook::{Command, CommandKind, Playbook};
pub use result::{ConditionalError, EngineError, ExecutionReport, PlaybookError, WaitOutcome};
pub use transport::{MockTransport, Transport};
