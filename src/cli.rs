//! Terminal front-end: runs the whole journey on stdin/stdout.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt, stream};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, error, warn};

use crate::config::OnboardingConfig;
use crate::error::{FlowError, Result};
use crate::flow::{ChoiceOption, Clock, FlowEvent, Sender};
use crate::journey::{Journey, Notice, NoticeLevel, Screen};
use crate::onboarding::{Awaiting, FlowSession};
use crate::store::{OnboardingBackend, Provider};

/// Lines typed by the user, trimmed and non-empty.
pub type InputStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Read stdin line by line on a background task.
pub fn stdin_lines() -> InputStream {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        let reader = BufReader::new(tokio::io::stdin());
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        eprint!("> ");
                        continue;
                    }
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|line| (line, rx))
    }))
}

/// What happened to the flow on the current screen.
enum FlowExit {
    /// The journey moved to another screen.
    Moved,
    Quit,
}

pub struct Terminal {
    config: OnboardingConfig,
    clock: Arc<dyn Clock>,
    backend: Arc<dyn OnboardingBackend>,
    journey: Journey,
}

impl Terminal {
    pub fn new(
        config: OnboardingConfig,
        clock: Arc<dyn Clock>,
        backend: Arc<dyn OnboardingBackend>,
    ) -> Self {
        Self {
            config,
            clock,
            backend,
            journey: Journey::new(),
        }
    }

    pub fn journey(&self) -> &Journey {
        &self.journey
    }

    /// Run until `/quit` or end of input.
    pub async fn run(&mut self, mut input: InputStream) -> Result<()> {
        eprintln!("   Commands: /skip, /google, /apple, /quit\n");
        loop {
            let keep_going = match self.journey.screen() {
                Screen::Welcome => self.welcome(&mut input).await?,
                Screen::Dashboard => self.dashboard(&mut input).await?,
                _ => matches!(self.run_flow(&mut input).await?, FlowExit::Moved),
            };
            if !keep_going {
                return Ok(());
            }
        }
    }

    async fn welcome(&mut self, input: &mut InputStream) -> Result<bool> {
        println!("\n{}", self.journey.render_welcome());
        println!("Type anything to Get Started.");
        eprint!("> ");
        match input.next().await {
            Some(line) if line == "/quit" => Ok(false),
            Some(_) => {
                self.journey.get_started()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn dashboard(&mut self, input: &mut InputStream) -> Result<bool> {
        println!("\n{}", self.journey.render_dashboard());
        let actions = self.journey.dashboard_actions();
        for (i, action) in actions.iter().enumerate() {
            println!("  {}. {}", i + 1, action.label());
        }
        loop {
            eprint!("> ");
            let Some(line) = input.next().await else {
                return Ok(false);
            };
            if line == "/quit" {
                return Ok(false);
            }
            let picked = line
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| actions.get(i).copied())
                .or_else(|| {
                    actions
                        .iter()
                        .copied()
                        .find(|a| a.label().eq_ignore_ascii_case(&line))
                });
            match picked {
                Some(action) => {
                    self.journey.act(action)?;
                    return Ok(true);
                }
                None => eprintln!("Pick one of the numbers above."),
            }
        }
    }

    async fn run_flow(&mut self, input: &mut InputStream) -> Result<FlowExit> {
        let Some(definition) = self.journey.flow(&self.config)? else {
            return Ok(FlowExit::Moved);
        };
        let session = Arc::new(FlowSession::new(
            definition,
            Arc::clone(&self.clock),
            Arc::clone(&self.backend),
        ));
        let mut events = BroadcastStream::new(session.subscribe());
        session.start().await?;
        debug!(screen = %self.journey.screen(), flow = %session.name(), "Flow screen opened");

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(Ok(event)) => {
                        if self.on_event(&session, &event).await? {
                            return Ok(FlowExit::Moved);
                        }
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(n))) => {
                        warn!(skipped = n, "Terminal fell behind on flow events");
                    }
                    None => return Ok(FlowExit::Quit),
                },
                line = input.next() => match line {
                    Some(line) if line == "/quit" => return Ok(FlowExit::Quit),
                    Some(line) if line == "/skip" && self.journey.screen() == Screen::Auth => {
                        eprintln!("An account is needed to continue. Use /google or /apple for a quick sign-up.");
                        eprint!("> ");
                    }
                    Some(line) => handle_line(&session, &line).await,
                    None => return Ok(FlowExit::Quit),
                },
            }
        }
    }

    /// Print an event and hand results to the journey. Returns whether the
    /// journey left the current screen.
    async fn on_event(&mut self, session: &FlowSession, event: &FlowEvent) -> Result<bool> {
        if let FlowEvent::Message(message) = event {
            if message.sender == Sender::Assistant {
                println!("uMELI: {}", message.text);
                show_input(&session.awaiting().await);
            }
            return Ok(false);
        }

        let before = self.journey.screen();
        if let Some(notice) = self.journey.apply(event)? {
            print_notice(&notice);
        }
        Ok(self.journey.screen() != before)
    }
}

async fn handle_line(session: &Arc<FlowSession>, line: &str) {
    let result = match line {
        "/skip" => session.skip().await,
        "/google" => {
            spawn_sign_in(session, Provider::Google);
            Ok(())
        }
        "/apple" => {
            spawn_sign_in(session, Provider::Apple);
            Ok(())
        }
        _ => answer(session, line).await,
    };
    if let Err(e) = result {
        eprintln!("⚠️  {e}");
        eprint!("> ");
    }
}

async fn answer(session: &Arc<FlowSession>, line: &str) -> std::result::Result<(), FlowError> {
    match session.awaiting().await {
        Awaiting::Nothing => {
            eprintln!("uMELI is still typing...");
            Ok(())
        }
        Awaiting::Text { .. } => session.submit_text(line).await.map(|_| ()),
        Awaiting::Choice(options) => match pick(&options, line) {
            Some(option) => session.choose(&option.value).await.map(|_| ()),
            None => {
                show_input(&Awaiting::Choice(options));
                Ok(())
            }
        },
        Awaiting::Choices(options) => {
            if line.eq_ignore_ascii_case("done") {
                return session.confirm_choices().await.map(|_| ());
            }
            let plain: Vec<ChoiceOption> = options.into_iter().map(|(o, _)| o).collect();
            if let Some(option) = pick(&plain, line) {
                session.toggle(&option.value).await?;
            }
            show_input(&session.awaiting().await);
            Ok(())
        }
        Awaiting::Confirmation => {
            if matches!(line.to_lowercase().as_str(), "yes" | "y") {
                spawn_complete(session);
            } else {
                show_input(&Awaiting::Confirmation);
            }
            Ok(())
        }
    }
}

/// Match a typed line to an option by 1-based number, value or label.
fn pick<'a>(options: &'a [ChoiceOption], line: &str) -> Option<&'a ChoiceOption> {
    if let Some(i) = line.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
        return options.get(i);
    }
    options
        .iter()
        .find(|o| o.value.eq_ignore_ascii_case(line) || o.label.eq_ignore_ascii_case(line))
}

fn spawn_complete(session: &Arc<FlowSession>) {
    let session = Arc::clone(session);
    tokio::spawn(async move {
        if let Err(e) = session.complete().await {
            warn!(flow = %session.name(), error = %e, "Complete failed");
        }
    });
}

fn spawn_sign_in(session: &Arc<FlowSession>, provider: Provider) {
    let session = Arc::clone(session);
    tokio::spawn(async move {
        if let Err(e) = session.sign_in(provider).await {
            eprintln!("⚠️  {e}");
        }
    });
}

fn show_input(awaiting: &Awaiting) {
    match awaiting {
        Awaiting::Nothing => return,
        Awaiting::Text { .. } => {}
        Awaiting::Choice(options) => {
            for (i, option) in options.iter().enumerate() {
                match &option.description {
                    Some(d) => println!("  {}. {} ({d})", i + 1, option.label),
                    None => println!("  {}. {}", i + 1, option.label),
                }
            }
        }
        Awaiting::Choices(options) => {
            for (i, (option, selected)) in options.iter().enumerate() {
                let mark = if *selected { "x" } else { " " };
                println!("  [{mark}] {}. {}", i + 1, option.label);
            }
            println!("  Type a number to toggle, `done` to continue.");
        }
        Awaiting::Confirmation => println!("  Type `yes` to confirm."),
    }
    eprint!("> ");
}

fn print_notice(notice: &Notice) {
    let icon = match notice.level {
        NoticeLevel::Success => "✅",
        NoticeLevel::Info => "ℹ️ ",
        NoticeLevel::Error => "❌",
    };
    println!("\n{icon} {}\n", notice.text);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<ChoiceOption> {
        vec![
            ChoiceOption::new("formal", "Professional & Formal"),
            ChoiceOption::new("casual", "Casual & Relaxed"),
        ]
    }

    #[test]
    fn pick_by_number_value_or_label() {
        let options = options();
        assert_eq!(pick(&options, "2").map(|o| o.value.as_str()), Some("casual"));
        assert_eq!(pick(&options, "FORMAL").map(|o| o.value.as_str()), Some("formal"));
        assert_eq!(
            pick(&options, "casual & relaxed").map(|o| o.value.as_str()),
            Some("casual")
        );
        assert!(pick(&options, "0").is_none());
        assert!(pick(&options, "3").is_none());
        assert!(pick(&options, "grumpy").is_none());
    }
}
