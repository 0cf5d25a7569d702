//! `FlowSession`: one running flow instance on a real async runtime.
//!
//! The session wraps a [`FlowEngine`] behind a mutex, drives its emission
//! queue from a background task on the injected [`Clock`], and performs the
//! backend calls for saves and third-party sign-in. Every engine event is
//! broadcast to subscribers.
//!
//! A session counts resets in a generation number. A save that was started
//! before a reset finishes against a newer generation and is discarded, so a
//! stale result can never touch the fresh flow.

use std::sync::Arc;

use tokio::sync::{Mutex, Notify, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::FlowError;
use crate::flow::{
    ChoiceOption, Clock, CollectedData, FlowDefinition, FlowEngine, FlowEvent, FlowSnapshot,
    Message, StepId, StepKind, Submission,
};
use crate::store::{OnboardingBackend, Provider, Record};

/// Broadcast channel capacity.
const EVENT_CAPACITY: usize = 256;

/// What the current step is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Awaiting {
    /// Nothing: the assistant is still typing, a call is in flight, or the
    /// flow is over.
    Nothing,
    Text { secret: bool },
    Choice(Vec<ChoiceOption>),
    /// Options with their current selection state.
    Choices(Vec<(ChoiceOption, bool)>),
    Confirmation,
}

struct Inner {
    generation: u64,
    engine: FlowEngine,
}

pub struct FlowSession {
    id: Uuid,
    definition: Arc<FlowDefinition>,
    inner: Arc<Mutex<Inner>>,
    tx: broadcast::Sender<FlowEvent>,
    wake: Arc<Notify>,
    clock: Arc<dyn Clock>,
    backend: Arc<dyn OnboardingBackend>,
    driver: JoinHandle<()>,
}

impl FlowSession {
    /// Create a session and its driver task. Must be called inside a tokio
    /// runtime. The flow does not run until [`Self::start`].
    pub fn new(
        definition: FlowDefinition,
        clock: Arc<dyn Clock>,
        backend: Arc<dyn OnboardingBackend>,
    ) -> Self {
        let definition = Arc::new(definition);
        let inner = Arc::new(Mutex::new(Inner {
            generation: 0,
            engine: FlowEngine::new(Arc::clone(&definition)),
        }));
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        let wake = Arc::new(Notify::new());
        let driver = spawn_driver(
            Arc::clone(&inner),
            tx.clone(),
            Arc::clone(&wake),
            Arc::clone(&clock),
        );

        Self {
            id: Uuid::new_v4(),
            definition,
            inner,
            tx,
            wake,
            clock,
            backend,
            driver,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Subscribe to engine events. Each front-end calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.tx.subscribe()
    }

    pub async fn start(&self) -> Result<(), FlowError> {
        let mut inner = self.inner.lock().await;
        inner.engine.start(self.clock.now())?;
        info!(session = %self.id, flow = %self.name(), "Session started");
        self.flush(&mut inner);
        Ok(())
    }

    pub async fn submit_text(&self, text: &str) -> Result<Submission, FlowError> {
        let mut inner = self.inner.lock().await;
        let result = inner.engine.submit_free_text(text, self.clock.now());
        self.flush(&mut inner);
        result
    }

    pub async fn choose(&self, value: &str) -> Result<Option<StepId>, FlowError> {
        let mut inner = self.inner.lock().await;
        let result = inner.engine.submit_choice(value, self.clock.now());
        self.flush(&mut inner);
        result
    }

    pub async fn toggle(&self, value: &str) -> Result<bool, FlowError> {
        self.inner.lock().await.engine.toggle_choice(value)
    }

    pub async fn confirm_choices(&self) -> Result<Option<StepId>, FlowError> {
        let mut inner = self.inner.lock().await;
        let result = inner.engine.confirm_choices(self.clock.now());
        self.flush(&mut inner);
        result
    }

    pub async fn skip(&self) -> Result<(), FlowError> {
        let mut inner = self.inner.lock().await;
        let result = inner.engine.skip(self.clock.now());
        self.flush(&mut inner);
        result
    }

    /// Save at the confirmation step.
    ///
    /// Returns `Ok(false)` without saving when the flow is not at its
    /// confirmation step or the summary is still being typed, when a save is
    /// already running, or when the session was reset while the save was in
    /// flight.
    pub async fn complete(&self) -> Result<bool, FlowError> {
        let (generation, candidate) = {
            let mut inner = self.inner.lock().await;
            let candidate = inner.engine.begin_submit(self.clock.now())?;
            self.flush(&mut inner);
            (inner.generation, candidate)
        };
        let Some(candidate) = candidate else {
            return Ok(false);
        };

        let outcome = self
            .backend
            .save(candidate)
            .await
            .map_err(|e| e.to_string());

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(session = %self.id, flow = %self.name(), "Stale save result discarded");
            return Ok(false);
        }
        inner.engine.finish_submit(outcome, self.clock.now())?;
        self.flush(&mut inner);
        Ok(true)
    }

    /// Sign up through a third-party provider instead of typing details.
    pub async fn sign_in(&self, provider: Provider) -> Result<bool, FlowError> {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.engine.begin_sign_in(provider, self.clock.now())?;
            self.flush(&mut inner);
            inner.generation
        };

        let outcome = self
            .backend
            .sign_in_with(provider)
            .await
            .map(Record::User)
            .map_err(|e| e.to_string());

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(session = %self.id, %provider, "Stale sign-in result discarded");
            return Ok(false);
        }
        inner.engine.finish_sign_in(outcome, self.clock.now())?;
        self.flush(&mut inner);
        Ok(true)
    }

    /// Throw away all progress and start the flow again from the top.
    pub async fn reset(&self) -> Result<(), FlowError> {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        inner.engine = FlowEngine::new(Arc::clone(&self.definition));
        inner.engine.start(self.clock.now())?;
        warn!(
            session = %self.id,
            flow = %self.name(),
            generation = inner.generation,
            "Session reset"
        );
        self.flush(&mut inner);
        Ok(())
    }

    /// Release anything due now. The driver does this on its own; manual
    /// callers use it to settle without waiting for a wakeup.
    pub async fn tick(&self) -> Vec<FlowEvent> {
        let mut inner = self.inner.lock().await;
        let events = inner.engine.tick(self.clock.now());
        for event in &events {
            let _ = self.tx.send(event.clone());
        }
        events
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        self.inner.lock().await.engine.snapshot()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner.lock().await.engine.messages().messages().to_vec()
    }

    pub async fn data(&self) -> CollectedData {
        self.inner.lock().await.engine.data().clone()
    }

    pub async fn next_deadline(&self) -> Option<std::time::Duration> {
        self.inner.lock().await.engine.next_deadline()
    }

    pub async fn awaiting(&self) -> Awaiting {
        let inner = self.inner.lock().await;
        let engine = &inner.engine;
        if engine.is_waiting_for_assistant() || engine.state().ensure_active().is_err() {
            return Awaiting::Nothing;
        }
        match engine.current_step().map(|s| &s.kind) {
            Some(StepKind::FreeText { secret, .. }) => Awaiting::Text { secret: *secret },
            Some(StepKind::SingleChoice { options }) => Awaiting::Choice(options.clone()),
            Some(StepKind::MultiChoice { options, .. }) => Awaiting::Choices(
                options
                    .iter()
                    .map(|o| (o.clone(), engine.is_selected(&o.value)))
                    .collect(),
            ),
            Some(StepKind::Confirm) => Awaiting::Confirmation,
            Some(StepKind::Say) | None => Awaiting::Nothing,
        }
    }

    /// Publish what the last operation produced and let the driver re-arm.
    fn flush(&self, inner: &mut Inner) {
        for event in inner.engine.tick(self.clock.now()) {
            let _ = self.tx.send(event);
        }
        self.wake.notify_one();
    }
}

impl Drop for FlowSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Sleep until the engine's next deadline, tick, repeat. Any operation on the
/// session wakes the loop so it can re-read the deadline.
fn spawn_driver(
    inner: Arc<Mutex<Inner>>,
    tx: broadcast::Sender<FlowEvent>,
    wake: Arc<Notify>,
    clock: Arc<dyn Clock>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let deadline = {
                let mut inner = inner.lock().await;
                for event in inner.engine.tick(clock.now()) {
                    let _ = tx.send(event);
                }
                inner.engine.next_deadline()
            };
            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = clock.sleep_until(deadline) => {}
                        _ = wake.notified() => {}
                    }
                }
                None => wake.notified().await,
            }
        }
    })
}
