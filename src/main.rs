use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use umoda_onboarding::cli::{self, Terminal};
use umoda_onboarding::config::OnboardingConfig;
use umoda_onboarding::flow::{Clock, TokioClock};
use umoda_onboarding::store::{JsonFileBackend, OnboardingBackend, SimulatedBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OnboardingConfig::from_env()?;

    // Keep the guard alive so buffered log lines are flushed on exit.
    let _log_guard = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "umoda.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            // The chat shares the terminal, so only warnings by default.
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(TokioClock::new());
    let mut simulated = SimulatedBackend::new(Arc::clone(&clock), config.latency);
    if config.failure_rate > 0.0 {
        simulated = simulated.with_failure_rate(config.failure_rate, rand::random());
    }
    let simulated: Arc<dyn OnboardingBackend> = Arc::new(simulated);

    let backend: Arc<dyn OnboardingBackend> = match &config.data_dir {
        Some(dir) => Arc::new(JsonFileBackend::new(simulated, dir).await?),
        None => simulated,
    };

    eprintln!("🚗 uMODA onboarding v{}", env!("CARGO_PKG_VERSION"));
    match &config.data_dir {
        Some(dir) => eprintln!("   Records: {}", dir.display()),
        None => eprintln!("   Records: in memory"),
    }
    if let Some(dir) = &config.log_dir {
        eprintln!("   Logs: {}", dir.display());
    }
    if config.failure_rate > 0.0 {
        eprintln!("   Simulated failure rate: {:.0}%", config.failure_rate * 100.0);
    }

    let mut terminal = Terminal::new(config, clock, backend);
    terminal.run(cli::stdin_lines()).await?;

    eprintln!("Goodbye!");
    Ok(())
}
