//! Flow engine: drives one instance of a step table.
//!
//! The engine is synchronous and owns everything about its instance: status,
//! step pointer, collected data, transcript and pending emissions. Time is
//! passed in by the caller. Assistant lines are queued with their due times
//! and only land in the transcript when [`FlowEngine::tick`] reaches them, so
//! the transcript depends on the inputs and the clock, never on how often the
//! engine is polled.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{FlowError, ValidationError};
use crate::store::{Candidate, Provider, Record};

use super::completion::{InFlight, Outcome, SignIn};
use super::data::{CollectedData, FieldValue};
use super::message::{Message, MessageLog, Sender};
use super::schedule::{Emission, EmissionQueue};
use super::state::{FlowSnapshot, FlowState, FlowStatus};
use super::step::{ChoiceOption, FlowDefinition, MASK, Step, StepId, StepKind};

/// Echo for a multi-choice confirmation with nothing selected.
pub const NOTHING_SELECTED: &str = "None";

/// What a flow tells its parent.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    /// A transcript line appeared.
    Message(Message),
    /// The flow saved its result and is done.
    Completed(Record),
    /// The user opted out.
    Skipped,
    /// Something failed that the user should hear about. The flow continues.
    Error(String),
}

/// Result of a free-text answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Stored; the flow moved on to `next` (`None` only for a terminal step).
    Accepted { next: Option<StepId> },
    /// Not stored; the assistant asks again.
    Rejected(ValidationError),
}

pub struct FlowEngine {
    definition: Arc<FlowDefinition>,
    state: FlowState,
    data: CollectedData,
    log: MessageLog,
    queue: EmissionQueue,
    /// Pending multi-choice selection for the current step.
    selection: BTreeSet<String>,
    in_flight: Option<InFlight>,
    /// Saved record waiting for its handoff.
    pending_result: Option<Record>,
    outbox: Vec<FlowEvent>,
}

impl std::fmt::Debug for FlowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEngine")
            .field("flow", &self.definition.name())
            .field("state", &self.state)
            .field("fields", &self.data.len())
            .field("messages", &self.log.len())
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl FlowEngine {
    pub fn new(definition: Arc<FlowDefinition>) -> Self {
        let queue = EmissionQueue::new(definition.timing());
        Self {
            definition,
            state: FlowState::default(),
            data: CollectedData::new(),
            log: MessageLog::new(),
            queue,
            selection: BTreeSet::new(),
            in_flight: None,
            pending_result: None,
            outbox: Vec::new(),
        }
    }

    pub fn definition(&self) -> &Arc<FlowDefinition> {
        &self.definition
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn status(&self) -> FlowStatus {
        self.state.status
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn current_step_id(&self) -> Option<StepId> {
        self.state.current_step
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.state
            .current_step
            .and_then(|id| self.definition.step(id))
    }

    pub fn data(&self) -> &CollectedData {
        &self.data
    }

    pub fn messages(&self) -> &MessageLog {
        &self.log
    }

    /// True while an assistant line is still waiting to appear.
    pub fn is_waiting_for_assistant(&self) -> bool {
        self.queue.has_pending_messages()
    }

    pub fn is_submitting(&self) -> bool {
        self.state.status == FlowStatus::Submitting
    }

    /// When the next queued emission is due.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.next_deadline()
    }

    /// Whether `value` is in the pending multi-choice selection.
    pub fn is_selected(&self, value: &str) -> bool {
        self.selection.contains(value)
    }

    /// Pending multi-choice selection in option order.
    pub fn selection(&self) -> Vec<&ChoiceOption> {
        self.current_step()
            .map(|step| {
                step.kind
                    .options()
                    .iter()
                    .filter(|o| self.selection.contains(&o.value))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            flow: self.definition.name().to_string(),
            status: self.state.status,
            current_step: self.state.current_step.map(str::to_string),
            waiting_for_assistant: self.is_waiting_for_assistant(),
            submitting: self.is_submitting(),
            message_count: self.log.len(),
        }
    }

    /// Enter the initial step and queue its lines.
    pub fn start(&mut self, now: Duration) -> Result<(), FlowError> {
        self.state.transition(FlowStatus::Active)?;
        info!(flow = %self.definition.name(), "Flow started");
        self.enter(self.definition.initial(), now)?;
        Ok(())
    }

    /// Release every emission due at `now` and drain pending events.
    pub fn tick(&mut self, now: Duration) -> Vec<FlowEvent> {
        while let Some(item) = self.queue.pop_due(now) {
            match item.emission {
                Emission::Say(text) => {
                    let message = self.log.append(Sender::Assistant, text, item.due);
                    self.outbox.push(FlowEvent::Message(message));
                }
                Emission::Handoff => {
                    if let Some(record) = self.pending_result.take() {
                        info!(
                            flow = %self.definition.name(),
                            record = record.kind(),
                            "Flow result handed off"
                        );
                        self.outbox.push(FlowEvent::Completed(record));
                    }
                }
            }
        }
        std::mem::take(&mut self.outbox)
    }

    /// Answer the current free-text step.
    pub fn submit_free_text(&mut self, text: &str, now: Duration) -> Result<Submission, FlowError> {
        let step = self.input_step()?;
        let StepKind::FreeText {
            parser,
            retry,
            secret,
        } = &step.kind
        else {
            return Err(wrong_kind(&step, "free text"));
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(FlowError::EmptyInput);
        }

        match parser(text, &self.data) {
            Err(rejection) => {
                debug!(
                    flow = %self.definition.name(),
                    step = step.id,
                    reason = %rejection,
                    "Answer rejected"
                );
                let lines = retry(&self.data);
                self.say_all(now, lines);
                Ok(Submission::Rejected(rejection))
            }
            Ok(value) => {
                let echo = if *secret { MASK } else { trimmed };
                self.commit_answer(&step, value)?;
                self.push_user(echo, now);
                let next = self.advance(&step, now)?;
                Ok(Submission::Accepted { next })
            }
        }
    }

    /// Answer the current single-choice step. Moves on immediately.
    pub fn submit_choice(&mut self, value: &str, now: Duration) -> Result<Option<StepId>, FlowError> {
        let step = self.input_step()?;
        let StepKind::SingleChoice { options } = &step.kind else {
            return Err(wrong_kind(&step, "a single choice"));
        };
        let option = find_option(&step, options, value)?;

        self.commit_answer(&step, FieldValue::Choice(option.value.clone()))?;
        self.push_user(&option.label, now);
        self.advance(&step, now)
    }

    /// Flip one option of the current multi-choice step. Returns whether it
    /// is now selected.
    pub fn toggle_choice(&mut self, value: &str) -> Result<bool, FlowError> {
        let step = self.input_step()?;
        let StepKind::MultiChoice { options, .. } = &step.kind else {
            return Err(wrong_kind(&step, "a toggle"));
        };
        let option = find_option(&step, options, value)?;

        if self.selection.remove(&option.value) {
            Ok(false)
        } else {
            self.selection.insert(option.value.clone());
            Ok(true)
        }
    }

    /// Commit the pending selection of the current multi-choice step.
    pub fn confirm_choices(&mut self, now: Duration) -> Result<Option<StepId>, FlowError> {
        let step = self.input_step()?;
        let StepKind::MultiChoice { options, .. } = &step.kind else {
            return Err(wrong_kind(&step, "a confirmation of choices"));
        };

        let chosen: Vec<&ChoiceOption> = options
            .iter()
            .filter(|o| self.selection.contains(&o.value))
            .collect();
        let values = chosen.iter().map(|o| o.value.clone()).collect();
        let echo = if chosen.is_empty() {
            NOTHING_SELECTED.to_string()
        } else {
            chosen
                .iter()
                .map(|o| o.label.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        self.commit_answer(&step, FieldValue::Choices(values))?;
        self.selection.clear();
        self.push_user(echo, now);
        self.advance(&step, now)
    }

    /// Abandon the flow. Nothing is saved.
    pub fn skip(&mut self, now: Duration) -> Result<(), FlowError> {
        self.state.transition(FlowStatus::Skipped)?;
        self.queue.clear(now);
        self.selection.clear();
        info!(
            flow = %self.definition.name(),
            step = self.state.current_step.unwrap_or("-"),
            "Flow skipped"
        );
        self.outbox.push(FlowEvent::Skipped);
        Ok(())
    }

    /// Start the save at the confirmation step.
    ///
    /// Returns the candidate to hand to the backend, or `None` when the flow
    /// is not sitting at its confirmation step (including while a save is
    /// already in flight).
    pub fn begin_submit(&mut self, now: Duration) -> Result<Option<Candidate>, FlowError> {
        if self.state.status != FlowStatus::Active {
            debug!(flow = %self.definition.name(), status = %self.state.status, "Complete ignored");
            return Ok(None);
        }
        if !self.current_step().is_some_and(Step::is_terminal) {
            debug!(
                flow = %self.definition.name(),
                step = self.state.current_step.unwrap_or("-"),
                "Complete ignored off the confirmation step"
            );
            return Ok(None);
        }
        if self.queue.has_pending_messages() {
            debug!(
                flow = %self.definition.name(),
                "Complete ignored while the summary is still being typed"
            );
            return Ok(None);
        }

        let definition = Arc::clone(&self.definition);
        let completion = definition.completion();
        let candidate = (completion.assemble)(&self.data)?;

        self.state.transition(FlowStatus::Submitting)?;
        self.in_flight = Some(InFlight::Save);
        let lines = (completion.saving)(&self.data);
        self.say_all(now, lines);
        info!(flow = %definition.name(), candidate = candidate.kind(), "Saving");
        Ok(Some(candidate))
    }

    /// Apply the backend's answer to a save started by [`Self::begin_submit`].
    pub fn finish_submit(&mut self, outcome: Outcome, now: Duration) -> Result<(), FlowError> {
        if self.in_flight != Some(InFlight::Save) {
            return Err(FlowError::InvalidTransition {
                from: self.state.status.to_string(),
                to: FlowStatus::Completed.to_string(),
            });
        }
        self.in_flight = None;

        let definition = Arc::clone(&self.definition);
        let completion = definition.completion();
        match outcome {
            Ok(record) => {
                self.state.transition(FlowStatus::Completed)?;
                let lines = (completion.saved)(&self.data);
                self.say_all(now, lines);
                self.queue.handoff(now);
                self.pending_result = Some(record);
                info!(flow = %definition.name(), "Saved");
            }
            Err(reason) => {
                self.state.transition(FlowStatus::Active)?;
                warn!(flow = %definition.name(), reason = %reason, "Save failed, back at confirmation");
                let lines = (completion.failed)(&self.data);
                self.say_all(now, lines);
                self.outbox
                    .push(FlowEvent::Error(completion.failure_notice.clone()));
            }
        }
        Ok(())
    }

    /// Start a third-party sign-in. Allowed at any step while active.
    pub fn begin_sign_in(&mut self, provider: Provider, now: Duration) -> Result<(), FlowError> {
        let definition = Arc::clone(&self.definition);
        let sign_in = sign_in_of(&definition)?;
        self.state.ensure_active()?;

        self.state.transition(FlowStatus::Submitting)?;
        self.in_flight = Some(InFlight::SignIn(provider));
        self.say_all(now, (sign_in.connecting)(provider));
        info!(flow = %definition.name(), provider = %provider, "Third-party sign-in started");
        Ok(())
    }

    /// Apply the provider's answer. On failure the collected data is
    /// dropped and manual entry restarts at the fallback step.
    pub fn finish_sign_in(&mut self, outcome: Outcome, now: Duration) -> Result<(), FlowError> {
        let Some(InFlight::SignIn(provider)) = self.in_flight else {
            return Err(FlowError::InvalidTransition {
                from: self.state.status.to_string(),
                to: FlowStatus::Completed.to_string(),
            });
        };
        self.in_flight = None;

        let definition = Arc::clone(&self.definition);
        let sign_in = sign_in_of(&definition)?;
        match outcome {
            Ok(record) => {
                self.state.transition(FlowStatus::Completed)?;
                self.say_all(now, (sign_in.succeeded)(provider));
                self.queue.handoff(now);
                self.pending_result = Some(record);
                info!(flow = %definition.name(), provider = %provider, "Signed in");
            }
            Err(reason) => {
                self.state.transition(FlowStatus::Active)?;
                warn!(
                    flow = %definition.name(),
                    provider = %provider,
                    reason = %reason,
                    "Sign-in failed, falling back to manual entry"
                );
                self.say_all(now, (sign_in.failed)(provider));
                self.outbox
                    .push(FlowEvent::Error(SignIn::failure_notice(provider)));
                self.data.clear();
                self.selection.clear();
                self.enter(sign_in.fallback, now)?;
            }
        }
        Ok(())
    }

    // ── internals ───────────────────────────────────────────────────

    /// The current step, if it is ready to take an answer.
    fn input_step(&self) -> Result<Step, FlowError> {
        self.state.ensure_active()?;
        let step = self.current_step().ok_or_else(|| FlowError::NotActive {
            status: self.state.status.to_string(),
        })?;
        if self.queue.has_pending_messages() {
            return Err(FlowError::AwaitingAssistant {
                step: step.id.to_string(),
            });
        }
        Ok(step.clone())
    }

    /// Store an answer for `step` once its successor is known to exist.
    /// Nothing changes on error.
    fn commit_answer(&mut self, step: &Step, value: FieldValue) -> Result<(), FlowError> {
        let mut data = self.data.clone();
        data.commit(step.id, value)?;
        if let Some(next) = step.next.resolve(&data) {
            if self.definition.step(next).is_none() {
                return Err(FlowError::UnknownStep {
                    step: next.to_string(),
                });
            }
        }
        self.data = data;
        Ok(())
    }

    /// Say the step's reply and move to its successor.
    fn advance(&mut self, step: &Step, now: Duration) -> Result<Option<StepId>, FlowError> {
        let lines = (step.reply)(&self.data);
        self.say_all(now, lines);
        match step.next.resolve(&self.data) {
            Some(next) => self.enter(next, now).map(Some),
            None => Ok(None),
        }
    }

    /// Point at `id`, queue its prompt, and run through any say-only steps.
    /// Returns the step that ends up current.
    fn enter(&mut self, id: StepId, now: Duration) -> Result<StepId, FlowError> {
        let definition = Arc::clone(&self.definition);
        let mut id = id;
        for _ in 0..=definition.steps().len() {
            let step = definition.step(id).ok_or_else(|| FlowError::UnknownStep {
                step: id.to_string(),
            })?;
            self.state.current_step = Some(step.id);
            debug!(flow = %definition.name(), step = step.id, kind = step.kind.name(), "Entered step");

            let lines = (step.prompt)(&self.data);
            self.say_all(now, lines);

            match &step.kind {
                StepKind::Say => {
                    id = step.next.resolve(&self.data).ok_or_else(|| {
                        FlowError::InvalidDefinition {
                            flow: definition.name().to_string(),
                            reason: format!("say step {} has no next step", step.id),
                        }
                    })?;
                }
                StepKind::MultiChoice { preselected, .. } => {
                    self.selection = preselected.iter().cloned().collect();
                    return Ok(step.id);
                }
                _ => return Ok(step.id),
            }
        }
        Err(FlowError::InvalidDefinition {
            flow: definition.name().to_string(),
            reason: "say steps loop without reaching an input".to_string(),
        })
    }

    fn say_all(&mut self, now: Duration, lines: Vec<String>) {
        for line in lines {
            self.queue.say(now, line);
        }
    }

    fn push_user(&mut self, text: impl Into<String>, now: Duration) {
        let message = self.log.append(Sender::User, text, now);
        self.outbox.push(FlowEvent::Message(message));
    }
}

fn wrong_kind(step: &Step, operation: &'static str) -> FlowError {
    FlowError::WrongStepKind {
        step: step.id.to_string(),
        operation,
    }
}

fn find_option<'a>(
    step: &Step,
    options: &'a [ChoiceOption],
    value: &str,
) -> Result<&'a ChoiceOption, FlowError> {
    options
        .iter()
        .find(|o| o.value == value)
        .ok_or_else(|| FlowError::UnknownChoice {
            step: step.id.to_string(),
            value: value.to_string(),
        })
}

fn sign_in_of(definition: &FlowDefinition) -> Result<&SignIn, FlowError> {
    definition
        .sign_in()
        .ok_or_else(|| FlowError::SignInUnsupported {
            flow: definition.name().to_string(),
        })
}
