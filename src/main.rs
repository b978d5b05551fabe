use std::time::Duration;

use anyhow::Result;
use tracing::info;

use serialplay::{
    Command, ExpectEngine, MockTransport, Playbook, PlaybookExecutor, SessionConfig, StepObserver,
};

/// Demo run against a scripted fake switch. Swap `MockTransport` for a real
/// serial transport to drive hardware.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("serialplay - playbook demo against a scripted device");
    println!("{}", "=".repeat(50));

    let mut device = MockTransport::new();
    device.push_incoming("SwitchOS 3.6\nswitch01 login: ");
    device.reply_on("admin\n", "Password: ");
    device.reply_on("secret\n", "\nswitch01> ");
    device.reply_on(
        "show version\n",
        "SwitchOS 3.6.8100\nuptime 41 days\nswitch01> ",
    );
    device.reply_on("show interfaces\n", "eth0 up\neth1 link down\nswitch01> ");
    device.reply_on("reset interface eth1\n", "resetting eth1... done\nswitch01> ");

    let playbook = Playbook::parse(
        "# nightly health check\n\
         WAIT login:\n\
         SEND admin\n\
         WAIT Password:\n\
         SEND secret\n\
         WAIT PROMPT\n\
         SEND show version\n\
         WAIT PROMPT\n\
         SEND show interfaces\n\
         WAIT PROMPT\n\
         IF_CONTAINS_I link down\n\
         SEND reset interface eth1\n\
         WAIT PROMPT\n\
         ENDIF\n\
         SUCCESS health check complete\n",
    )?;

    let config = SessionConfig::new()
        .prompt_symbol(">")
        .timeout(Duration::from_secs(5));
    let mut engine = ExpectEngine::new(device, &config);
    let mut executor = PlaybookExecutor::new();
    let mut observer = ConsoleObserver;

    let report = tokio::select! {
        r = executor.execute(&mut engine, &playbook, &mut observer) => r?,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("interrupted"),
    };

    println!("{}", "=".repeat(50));
    if report.success {
        let message = report
            .success_message
            .as_deref()
            .unwrap_or("playbook completed");
        println!("OK: {message} ({}/{} steps)", report.completed, report.total);
    } else {
        println!("FAILED at step {}/{}", report.completed + 1, report.total);
    }
    info!(total_time = ?report.total_time(), "run finished");

    engine.close();
    Ok(())
}

struct ConsoleObserver;

impl StepObserver for ConsoleObserver {
    fn on_step_start(&mut self, index: usize, _command: &Command, description: &str) {
        println!("[{:>2}] {description}", index + 1);
    }

    fn on_error(&mut self, message: &str) {
        eprintln!("     ! {message}");
    }

    fn on_step_complete(&mut self, _index: usize, success: bool, elapsed: Duration) {
        if success {
            println!("     done in {elapsed:.1?}");
        }
    }
}
