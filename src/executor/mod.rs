//! Step-by-step playbook execution
//!
//! The executor walks a parsed playbook against an `ExpectEngine`, threading
//! captured output into the conditional processor and reporting progress
//! through a `StepObserver`. A failed step aborts the run; structural
//! conditional errors do not, they only disable the broken branch.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::conditional::ConditionalProcessor;
use crate::engine::{ExpectEngine, WaitOptions};
use crate::playbook::{filter_login_steps, Command, CommandKind, Playbook, PROMPT_SENTINEL};
use crate::result::{EngineError, ExecutionReport};
use crate::transport::Transport;

/// Timeout for each credential prompt during an explicit login sequence.
const LOGIN_PROMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the command prompt after credentials are sent.
const POST_LOGIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Receives progress callbacks during a run.
///
/// All methods default to no-ops so observers implement only what they
/// display. Callbacks are invoked inline on the executing task; keep them
/// cheap.
pub trait StepObserver {
    /// A step is about to run (or be skipped).
    fn on_step_start(&mut self, _index: usize, _command: &Command, _description: &str) {}

    /// Output captured by a wait step, delivered whether or not the wait
    /// succeeded.
    fn on_output(&mut self, _output: &str) {}

    /// A non-fatal problem, e.g. a malformed conditional.
    fn on_error(&mut self, _message: &str) {}

    /// A step finished; `success` is false only for the aborting step.
    fn on_step_complete(&mut self, _index: usize, _success: bool, _elapsed: Duration) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl StepObserver for NullObserver {}

/// Lifecycle of one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorState {
    /// No run has started yet.
    #[default]
    Idle,
    /// A run is in progress.
    Running,
    /// The last run finished with every step passing.
    Completed,
    /// The last run stopped at a failed step.
    Aborted,
}

/// Runs playbooks over an engine.
#[derive(Debug, Default)]
pub struct PlaybookExecutor {
    conditionals: ConditionalProcessor,
    state: ExecutorState,
}

impl PlaybookExecutor {
    /// Create an executor with no run history.
    pub fn new() -> Self {
        Self::default()
    }

    /// State after the most recent run (or `Idle` before the first).
    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Execute every step of a playbook in order.
    ///
    /// When the engine's buffered output shows the device is already past
    /// login, the presumed login prefix is stripped first so credentials are
    /// never typed at a command prompt. Skipped conditional branches still
    /// count toward progress. The first failing step aborts the run; I/O
    /// errors from the transport surface as `Err`.
    pub async fn execute<T: Transport>(
        &mut self,
        engine: &mut ExpectEngine<T>,
        playbook: &Playbook,
        observer: &mut dyn StepObserver,
    ) -> Result<ExecutionReport, EngineError> {
        self.conditionals.reset();
        self.state = ExecutorState::Running;

        let commands: Vec<Command> = if engine.appears_logged_in() {
            info!("device appears logged in, stripping login steps");
            filter_login_steps(playbook.commands.clone())
        } else {
            playbook.commands.clone()
        };

        let total = commands.len();
        let mut step_times = Vec::with_capacity(total);
        let mut first_io_step = true;

        for (index, command) in commands.iter().enumerate() {
            let started = Instant::now();
            observer.on_step_start(index, command, &command.description());

            let ok = if command.is_control() {
                self.process_control(command, observer);
                true
            } else if !self.conditionals.should_execute() {
                debug!("skipping step {index}: branch not taken");
                true
            } else {
                match &command.kind {
                    CommandKind::Pause => {
                        tokio::time::sleep(command.delay).await;
                        true
                    }
                    CommandKind::Send => {
                        let ok = self.run_send(engine, command, observer);
                        if ok && !command.delay.is_zero() {
                            tokio::time::sleep(command.delay).await;
                        }
                        first_io_step = false;
                        ok
                    }
                    CommandKind::WaitForText => {
                        match self.run_wait(engine, command, first_io_step, observer).await {
                            Ok(ok) => {
                                first_io_step = false;
                                ok
                            }
                            // A transport error still ends the run in a
                            // terminal state before it surfaces.
                            Err(e) => {
                                let elapsed = started.elapsed();
                                step_times.push(elapsed);
                                observer.on_step_complete(index, false, elapsed);
                                self.state = ExecutorState::Aborted;
                                return Err(e);
                            }
                        }
                    }
                    _ => true,
                }
            };

            let elapsed = started.elapsed();
            step_times.push(elapsed);
            observer.on_step_complete(index, ok, elapsed);

            if !ok {
                warn!("step {} failed, aborting run", index + 1);
                self.state = ExecutorState::Aborted;
                return Ok(ExecutionReport {
                    success: false,
                    completed: index,
                    total,
                    step_times,
                    success_message: None,
                });
            }
        }

        self.state = ExecutorState::Completed;
        Ok(ExecutionReport {
            success: true,
            completed: total,
            total,
            step_times,
            success_message: playbook.success_message.clone(),
        })
    }

    /// Drive the conditional stack for one control step.
    ///
    /// An IF inside a branch being skipped opens an inert frame: nesting
    /// stays balanced but none of its arms can run. Structural errors are
    /// reported and absorbed; the run itself continues.
    fn process_control(&mut self, command: &Command, observer: &mut dyn StepObserver) {
        let result = match &command.kind {
            CommandKind::If(kind) => {
                if self.conditionals.should_execute() {
                    self.conditionals.process_if(*kind, &command.payload);
                } else {
                    self.conditionals.push_inert();
                }
                Ok(())
            }
            CommandKind::Elif(kind) => self.conditionals.process_elif(*kind, &command.payload),
            CommandKind::Else => self.conditionals.process_else(),
            CommandKind::EndIf => self.conditionals.process_endif(),
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!("conditional structure error: {e}");
            observer.on_error(&format!("conditional structure error: {e}"));
        }
    }

    fn run_send<T: Transport>(
        &mut self,
        engine: &mut ExpectEngine<T>,
        command: &Command,
        observer: &mut dyn StepObserver,
    ) -> bool {
        if let Err(e) = engine.send_line(&command.payload) {
            observer.on_error(&format!("send failed: {e}"));
            return false;
        }
        true
    }

    async fn run_wait<T: Transport>(
        &mut self,
        engine: &mut ExpectEngine<T>,
        command: &Command,
        first_io_step: bool,
        observer: &mut dyn StepObserver,
    ) -> Result<bool, EngineError> {
        if !command.payload.is_empty() {
            if let Err(e) = engine.send_line(&command.payload) {
                observer.on_error(&format!("send failed: {e}"));
                return Ok(false);
            }
        }
        if !command.delay.is_zero() {
            tokio::time::sleep(command.delay).await;
        }

        let expected = command.expected_text.as_deref().unwrap_or(PROMPT_SENTINEL);
        let options = WaitOptions {
            // Login prompts may already be sitting in the buffer from the
            // banner, and on the very first step nothing has consumed the
            // backlog yet.
            check_existing_buffer: first_io_step || is_login_target(expected),
            handle_pagination: true,
        };
        let outcome = engine.wait_for_text(expected, command.timeout, options).await?;

        observer.on_output(&outcome.captured);
        // Timeout output still feeds conditions; a playbook may branch on
        // what the device managed to print.
        self.conditionals.update_last_output(&outcome.captured);

        if !outcome.found {
            observer.on_error(&format!("timed out waiting for '{expected}'"));
        }
        Ok(outcome.found)
    }

    /// Interactive login: answer the username and password prompts, then
    /// wait for a command prompt. A failed round aborts the exchange;
    /// credentials are never typed blind.
    pub async fn handle_login_sequence<T: Transport>(
        &mut self,
        engine: &mut ExpectEngine<T>,
        username: &str,
        password: &str,
        observer: &mut dyn StepObserver,
    ) -> Result<bool, EngineError> {
        let existing = WaitOptions {
            check_existing_buffer: true,
            handle_pagination: false,
        };

        let user_prompt = engine
            .wait_for_text("username:", Some(LOGIN_PROMPT_TIMEOUT), existing)
            .await?;
        if !user_prompt.found {
            observer.on_error("no username prompt seen");
            return Ok(false);
        }
        engine.send_line(username)?;

        let pass_prompt = engine
            .wait_for_text("password:", Some(LOGIN_PROMPT_TIMEOUT), existing)
            .await?;
        if !pass_prompt.found {
            observer.on_error("no password prompt seen");
            return Ok(false);
        }
        engine.send_line(password)?;

        let prompt = engine
            .wait_for_text(PROMPT_SENTINEL, Some(POST_LOGIN_TIMEOUT), existing)
            .await?;
        observer.on_output(&prompt.captured);
        if !prompt.found {
            observer.on_error("no command prompt after login");
        }
        Ok(prompt.found)
    }
}

fn is_login_target(expected: &str) -> bool {
    let lower = expected.trim().to_lowercase();
    lower == "login:" || lower == "username:"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::transport::MockTransport;

    fn engine_with(transport: MockTransport) -> ExpectEngine<MockTransport> {
        let config = SessionConfig::new()
            .timeout(Duration::from_millis(200))
            .pagination_delay(Duration::from_millis(1));
        ExpectEngine::new(transport, &config)
    }

    #[derive(Default)]
    struct Recording {
        starts: Vec<String>,
        outputs: Vec<String>,
        errors: Vec<String>,
        completions: Vec<(usize, bool)>,
    }

    impl StepObserver for Recording {
        fn on_step_start(&mut self, _index: usize, _command: &Command, description: &str) {
            self.starts.push(description.to_string());
        }
        fn on_output(&mut self, output: &str) {
            self.outputs.push(output.to_string());
        }
        fn on_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
        fn on_step_complete(&mut self, index: usize, success: bool, _elapsed: Duration) {
            self.completions.push((index, success));
        }
    }

    #[tokio::test]
    async fn test_send_and_wait_run() {
        let mut transport = MockTransport::new();
        transport.reply_on("show version\n", "SW v1.2\n> ");
        let mut engine = engine_with(transport);

        // The prompt wait folds into the send, so this is one command.
        let playbook = Playbook::parse("SEND show version\nWAIT PROMPT\n").unwrap();
        let mut exec = PlaybookExecutor::new();
        let report = exec
            .execute(&mut engine, &playbook, &mut NullObserver)
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.completed, 1);
        assert_eq!(report.total, 1);
        assert_eq!(exec.state(), ExecutorState::Completed);
        assert_eq!(engine.transport_mut().written(), "show version\n");
    }

    #[tokio::test]
    async fn test_wait_with_payload_sends_first() {
        let mut transport = MockTransport::new();
        transport.reply_on("show clock\n", "12:00:00\n> ");
        let mut engine = engine_with(transport);

        // WAIT steps never carry payloads from the parser, but the command
        // model allows a combined send-then-wait step.
        let mut cmd = Command::wait("PROMPT");
        cmd.payload = "show clock".to_string();
        let playbook = Playbook {
            commands: vec![cmd],
            success_message: None,
        };
        let report = PlaybookExecutor::new()
            .execute(&mut engine, &playbook, &mut NullObserver)
            .await
            .unwrap();
        assert!(report.success);
    }

    #[tokio::test]
    async fn test_timeout_aborts_run() {
        let mut engine = engine_with(MockTransport::new());
        let playbook =
            Playbook::parse("SEND ping\nWAIT never-appears\nSEND unreachable\n").unwrap();

        let mut observer = Recording::default();
        let mut exec = PlaybookExecutor::new();
        let report = exec
            .execute(&mut engine, &playbook, &mut observer)
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.completed, 1);
        assert_eq!(report.total, 3);
        assert_eq!(exec.state(), ExecutorState::Aborted);
        assert!(!engine.transport_mut().written().contains("unreachable"));
        assert!(observer.errors.iter().any(|e| e.contains("timed out")));
        assert_eq!(observer.completions.last(), Some(&(1, false)));
    }

    #[tokio::test]
    async fn test_io_error_surfaces_and_marks_run_aborted() {
        let mut transport = MockTransport::new();
        transport.close();
        let mut engine = engine_with(transport);
        let playbook = Playbook::parse("WAIT never-appears\n").unwrap();

        let mut observer = Recording::default();
        let mut exec = PlaybookExecutor::new();
        let result = exec.execute(&mut engine, &playbook, &mut observer).await;

        assert!(matches!(result, Err(EngineError::Io(_))));
        assert_eq!(exec.state(), ExecutorState::Aborted);
        assert_eq!(observer.completions, vec![(0, false)]);
    }

    #[tokio::test]
    async fn test_conditional_branch_taken() {
        let mut transport = MockTransport::new();
        transport.reply_on("show status\n", "link is DOWN\n> ");
        transport.reply_on("reset link\n", "resetting\n> ");
        let mut engine = engine_with(transport);

        let playbook = Playbook::parse(
            "SEND show status\nWAIT PROMPT\nIF_CONTAINS DOWN\nSEND reset link\nWAIT PROMPT\nELSE\nSEND noop\nENDIF\n",
        )
        .unwrap();
        let report = PlaybookExecutor::new()
            .execute(&mut engine, &playbook, &mut NullObserver)
            .await
            .unwrap();

        assert!(report.success);
        let written = engine.transport_mut().written();
        assert!(written.contains("reset link"));
        assert!(!written.contains("noop"));
    }

    #[tokio::test]
    async fn test_skipped_branch_counts_toward_progress() {
        let mut transport = MockTransport::new();
        transport.reply_on("show status\n", "all good\n> ");
        let mut engine = engine_with(transport);

        let playbook = Playbook::parse(
            "SEND show status\nWAIT PROMPT\nIF_CONTAINS DOWN\nSEND reset link\nENDIF\n",
        )
        .unwrap();
        let report = PlaybookExecutor::new()
            .execute(&mut engine, &playbook, &mut NullObserver)
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.completed, 4);
        assert!(!engine.transport_mut().written().contains("reset link"));
    }

    #[tokio::test]
    async fn test_nested_if_in_skipped_branch_stays_inert() {
        let mut transport = MockTransport::new();
        transport.reply_on("show status\n", "all good\n> ");
        let mut engine = engine_with(transport);

        // The inner IF's condition is true against the output, but its
        // enclosing branch is skipped, so nothing inside may run.
        let playbook = Playbook::parse(
            "SEND show status\nWAIT PROMPT\n\
             IF_CONTAINS DOWN\nIF_CONTAINS good\nSEND inner\nELSE\nSEND inner-else\nENDIF\nENDIF\n\
             SEND after\n",
        )
        .unwrap();
        let report = PlaybookExecutor::new()
            .execute(&mut engine, &playbook, &mut NullObserver)
            .await
            .unwrap();

        assert!(report.success);
        let written = engine.transport_mut().written();
        assert!(!written.contains("inner"));
        assert!(written.contains("after"));
    }

    #[tokio::test]
    async fn test_structural_error_absorbed() {
        let mut transport = MockTransport::new();
        transport.reply_on("show x\n", "x output\n> ");
        let mut engine = engine_with(transport);

        let playbook = Playbook::parse("ENDIF\nSEND show x\nWAIT PROMPT\n").unwrap();
        let mut observer = Recording::default();
        let report = PlaybookExecutor::new()
            .execute(&mut engine, &playbook, &mut observer)
            .await
            .unwrap();

        assert!(report.success);
        assert!(observer
            .errors
            .iter()
            .any(|e| e.contains("conditional structure error")));
    }

    #[tokio::test]
    async fn test_success_message_in_report() {
        let mut transport = MockTransport::new();
        transport.reply_on("show x\n", "x\n> ");
        let mut engine = engine_with(transport);

        let playbook = Playbook::parse("SEND show x\nWAIT PROMPT\nSUCCESS maintenance done\n").unwrap();
        let report = PlaybookExecutor::new()
            .execute(&mut engine, &playbook, &mut NullObserver)
            .await
            .unwrap();
        assert_eq!(report.success_message.as_deref(), Some("maintenance done"));
    }

    #[tokio::test]
    async fn test_login_prefix_stripped_when_logged_in() {
        let mut transport = MockTransport::new();
        transport.reply_on("show version\n", "SW v1.2\nswitch01> ");
        let mut engine = engine_with(transport);
        engine.push_test_input("switch01> \n");

        let playbook = Playbook::parse(
            "WAIT login:\nSEND admin\nWAIT Password:\nSEND secret\nWAIT PROMPT\nSEND show version\nWAIT PROMPT\n",
        )
        .unwrap();
        let report = PlaybookExecutor::new()
            .execute(&mut engine, &playbook, &mut NullObserver)
            .await
            .unwrap();

        assert!(report.success);
        let written = engine.transport_mut().written();
        assert!(!written.contains("admin"));
        assert!(!written.contains("secret"));
        assert!(written.contains("show version"));
    }

    #[tokio::test]
    async fn test_conditions_see_timeout_output() {
        let mut transport = MockTransport::new();
        transport.push_incoming("partial boot log");
        let mut engine = engine_with(transport);

        // The wait times out but its captured output still drives the
        // conditional; the run itself aborts at the failed wait.
        let playbook = Playbook::parse("WAIT never\nIF_CONTAINS boot\nSEND x\nENDIF\n").unwrap();
        let mut observer = Recording::default();
        let report = PlaybookExecutor::new()
            .execute(&mut engine, &playbook, &mut observer)
            .await
            .unwrap();

        assert!(!report.success);
        assert!(observer.outputs.iter().any(|o| o.contains("partial boot log")));
    }

    #[tokio::test]
    async fn test_handle_login_sequence() {
        let mut transport = MockTransport::new();
        transport.push_incoming("switch01 Username: ");
        transport.reply_on("admin\n", "Password: ");
        transport.reply_on("secret\n", "\nswitch01> ");
        let mut engine = engine_with(transport);

        let mut exec = PlaybookExecutor::new();
        let logged_in = exec
            .handle_login_sequence(&mut engine, "admin", "secret", &mut NullObserver)
            .await
            .unwrap();

        assert!(logged_in);
        let written = engine.transport_mut().written();
        assert_eq!(written, "admin\nsecret\n");
    }

    #[tokio::test]
    async fn test_observer_sees_descriptions() {
        let mut transport = MockTransport::new();
        transport.reply_on("show x\n", "x\n> ");
        let mut engine = engine_with(transport);

        let playbook = Playbook::parse("SEND show x\nWAIT PROMPT\n").unwrap();
        let mut observer = Recording::default();
        PlaybookExecutor::new()
            .execute(&mut engine, &playbook, &mut observer)
            .await
            .unwrap();

        assert_eq!(observer.starts, vec!["Sending: show x"]);
        assert_eq!(observer.completions, vec![(0, true)]);
    }
}
