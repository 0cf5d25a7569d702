//! Declarative step table.
//!
//! A flow is a list of [`Step`]s. Each step says what the assistant shows on
//! entry, what kind of answer it takes, what the assistant says once the
//! answer is accepted, and where to go next.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::TimingConfig;
use crate::error::{FlowError, ValidationError};
use super::completion::{Completion, SignIn};
use super::data::{CollectedData, FieldValue};

pub type StepId = &'static str;

/// Produces assistant lines from what has been collected so far.
pub type Script = Arc<dyn Fn(&CollectedData) -> Vec<String> + Send + Sync>;

/// Turns raw user text into a field value, or explains why it can't.
pub type Parser =
    Arc<dyn Fn(&str, &CollectedData) -> Result<FieldValue, ValidationError> + Send + Sync>;

/// Picks the next step from collected data.
pub type Branch = Arc<dyn Fn(&CollectedData) -> StepId + Send + Sync>;

/// Placeholder echoed instead of a secret answer.
pub const MASK: &str = "••••••••••••";

/// A script with no output.
pub fn silent() -> Script {
    Arc::new(|_: &CollectedData| Vec::new())
}

/// A script that always says the same lines.
pub fn lines<I, S>(lines: I) -> Script
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
    Arc::new(move |_: &CollectedData| lines.clone())
}

/// A script of one line computed from collected data.
pub fn line<F>(f: F) -> Script
where
    F: Fn(&CollectedData) -> String + Send + Sync + 'static,
{
    Arc::new(move |data: &CollectedData| vec![f(data)])
}

/// Where a step goes once it is answered.
#[derive(Clone)]
pub enum Next {
    /// Terminal.
    End,
    Goto(StepId),
    Branch(Branch),
}

impl Next {
    pub fn resolve(&self, data: &CollectedData) -> Option<StepId> {
        match self {
            Self::End => None,
            Self::Goto(id) => Some(*id),
            Self::Branch(pick) => Some(pick(data)),
        }
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::End => write!(f, "End"),
            Self::Goto(id) => write!(f, "Goto({id})"),
            Self::Branch(_) => write!(f, "Branch(..)"),
        }
    }
}

/// One selectable option of a choice step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    /// Stored in collected data.
    pub value: String,
    /// Shown to the user and echoed into the transcript.
    pub label: String,
    pub description: Option<String>,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            description: None,
        }
    }

    /// An option whose value and label are the same text.
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(text.clone(), text)
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Clone)]
pub enum StepKind {
    /// Assistant lines only; moves on as soon as they are queued.
    Say,
    FreeText {
        parser: Parser,
        /// Said when the parser rejects an answer.
        retry: Script,
        /// Echo a mask instead of the answer.
        secret: bool,
    },
    SingleChoice {
        options: Vec<ChoiceOption>,
    },
    MultiChoice {
        options: Vec<ChoiceOption>,
        /// Values selected when the step is entered.
        preselected: Vec<String>,
    },
    /// Terminal confirmation; answered by `complete()`.
    Confirm,
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Say => "say",
            Self::FreeText { .. } => "free_text",
            Self::SingleChoice { .. } => "single_choice",
            Self::MultiChoice { .. } => "multi_choice",
            Self::Confirm => "confirm",
        }
    }

    pub fn options(&self) -> &[ChoiceOption] {
        match self {
            Self::SingleChoice { options } | Self::MultiChoice { options, .. } => options.as_slice(),
            _ => &[],
        }
    }
}

#[derive(Clone)]
pub struct Step {
    pub id: StepId,
    pub kind: StepKind,
    /// Said on entry.
    pub prompt: Script,
    /// Said after the answer is committed. Reads the new value.
    pub reply: Script,
    pub next: Next,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("kind", &self.kind.name())
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

impl Step {
    fn new(id: StepId, kind: StepKind) -> Self {
        Self {
            id,
            kind,
            prompt: silent(),
            reply: silent(),
            next: Next::End,
        }
    }

    pub fn say(id: StepId, script: Script) -> Self {
        Self::new(id, StepKind::Say).prompt(script)
    }

    pub fn free_text<F>(id: StepId, parser: F) -> Self
    where
        F: Fn(&str, &CollectedData) -> Result<FieldValue, ValidationError> + Send + Sync + 'static,
    {
        Self::new(
            id,
            StepKind::FreeText {
                parser: Arc::new(parser),
                retry: silent(),
                secret: false,
            },
        )
    }

    pub fn single_choice(id: StepId, options: Vec<ChoiceOption>) -> Self {
        Self::new(id, StepKind::SingleChoice { options })
    }

    pub fn multi_choice(id: StepId, options: Vec<ChoiceOption>) -> Self {
        Self::new(
            id,
            StepKind::MultiChoice {
                options,
                preselected: Vec::new(),
            },
        )
    }

    pub fn confirm(id: StepId) -> Self {
        Self::new(id, StepKind::Confirm)
    }

    pub fn prompt(mut self, script: Script) -> Self {
        self.prompt = script;
        self
    }

    pub fn reply(mut self, script: Script) -> Self {
        self.reply = script;
        self
    }

    pub fn retry(mut self, script: Script) -> Self {
        if let StepKind::FreeText { retry, .. } = &mut self.kind {
            *retry = script;
        }
        self
    }

    /// Echo a mask instead of the typed answer.
    pub fn secret(mut self) -> Self {
        if let StepKind::FreeText { secret, .. } = &mut self.kind {
            *secret = true;
        }
        self
    }

    pub fn preselect<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let StepKind::MultiChoice { preselected, .. } = &mut self.kind {
            *preselected = values.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn then(mut self, next: StepId) -> Self {
        self.next = Next::Goto(next);
        self
    }

    pub fn branch<F>(mut self, pick: F) -> Self
    where
        F: Fn(&CollectedData) -> StepId + Send + Sync + 'static,
    {
        self.next = Next::Branch(Arc::new(pick));
        self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, StepKind::Confirm)
    }
}

/// A complete, validated step table plus everything needed to run it.
#[derive(Clone)]
pub struct FlowDefinition {
    name: String,
    steps: Vec<Step>,
    initial: StepId,
    timing: TimingConfig,
    completion: Completion,
    sign_in: Option<SignIn>,
}

impl std::fmt::Debug for FlowDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowDefinition")
            .field("name", &self.name)
            .field("initial", &self.initial)
            .field("steps", &self.steps)
            .field("sign_in", &self.sign_in.is_some())
            .finish_non_exhaustive()
    }
}

impl FlowDefinition {
    /// Build and validate a step table. The first step is the initial one.
    pub fn new(
        name: impl Into<String>,
        steps: Vec<Step>,
        timing: TimingConfig,
        completion: Completion,
    ) -> Result<Self, FlowError> {
        let name = name.into();
        let invalid = |reason: String| FlowError::InvalidDefinition {
            flow: name.clone(),
            reason,
        };

        let initial = steps
            .first()
            .map(|s| s.id)
            .ok_or_else(|| invalid("no steps".to_string()))?;

        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.id) {
                return Err(invalid(format!("duplicate step id {}", step.id)));
            }
        }

        for step in &steps {
            match (&step.kind, &step.next) {
                (StepKind::Confirm, Next::End) => {}
                (StepKind::Confirm, _) => {
                    return Err(invalid(format!("confirm step {} must be terminal", step.id)));
                }
                (_, Next::End) => {
                    return Err(invalid(format!("step {} has no next step", step.id)));
                }
                (_, Next::Goto(target)) if !seen.contains(target) => {
                    return Err(invalid(format!(
                        "step {} points at unknown step {target}",
                        step.id
                    )));
                }
                _ => {}
            }
            if let StepKind::SingleChoice { options } | StepKind::MultiChoice { options, .. } =
                &step.kind
            {
                if options.is_empty() {
                    return Err(invalid(format!("choice step {} has no options", step.id)));
                }
            }
        }

        if !steps.iter().any(Step::is_terminal) {
            return Err(invalid("no terminal step".to_string()));
        }

        Ok(Self {
            name,
            steps,
            initial,
            timing,
            completion,
            sign_in: None,
        })
    }

    /// Enable third-party sign-in. The fallback must be a known step.
    pub fn with_sign_in(mut self, sign_in: SignIn) -> Result<Self, FlowError> {
        if self.step(sign_in.fallback).is_none() {
            return Err(FlowError::InvalidDefinition {
                flow: self.name.clone(),
                reason: format!("unknown sign-in fallback step {}", sign_in.fallback),
            });
        }
        self.sign_in = Some(sign_in);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> StepId {
        self.initial
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn timing(&self) -> TimingConfig {
        self.timing
    }

    pub fn completion(&self) -> &Completion {
        &self.completion
    }

    pub fn sign_in(&self) -> Option<&SignIn> {
        self.sign_in.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use crate::flow::completion::test_support::completion;

    use super::*;

    fn text_step(id: StepId) -> Step {
        Step::free_text(id, |s, _| Ok(FieldValue::Text(s.trim().to_string())))
    }

    #[test]
    fn first_step_is_initial() {
        let def = FlowDefinition::new(
            "demo",
            vec![text_step("name").then("done"), Step::confirm("done")],
            TimingConfig::instant(),
            completion(),
        )
        .unwrap();
        assert_eq!(def.initial(), "name");
        assert!(def.step("done").unwrap().is_terminal());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = FlowDefinition::new(
            "demo",
            vec![text_step("a").then("a"), Step::confirm("a")],
            TimingConfig::instant(),
            completion(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate step id a"));
    }

    #[test]
    fn rejects_dangling_goto_and_missing_next() {
        let err = FlowDefinition::new(
            "demo",
            vec![text_step("a").then("nowhere"), Step::confirm("done")],
            TimingConfig::instant(),
            completion(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown step nowhere"));

        let err = FlowDefinition::new(
            "demo",
            vec![text_step("a"), Step::confirm("done")],
            TimingConfig::instant(),
            completion(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("has no next step"));
    }

    #[test]
    fn requires_a_terminal_step() {
        let err = FlowDefinition::new(
            "demo",
            vec![text_step("a").then("b"), text_step("b").then("a")],
            TimingConfig::instant(),
            completion(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no terminal step"));
    }

    #[test]
    fn rejects_empty_choice_steps() {
        let err = FlowDefinition::new(
            "demo",
            vec![Step::single_choice("pick", vec![]).then("done"), Step::confirm("done")],
            TimingConfig::instant(),
            completion(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("has no options"));
    }

    #[test]
    fn branch_resolves_from_data() {
        let next = Next::Branch(Arc::new(|data: &CollectedData| {
            if data.text("review") == Some("edit") {
                "first_name"
            } else {
                "confirmation"
            }
        }));
        let mut data = CollectedData::new();
        assert_eq!(next.resolve(&data), Some("confirmation"));
        data.commit("review", FieldValue::Choice("edit".into())).unwrap();
        assert_eq!(next.resolve(&data), Some("first_name"));
        assert_eq!(Next::End.resolve(&data), None);
    }

    #[test]
    fn builders_only_touch_matching_kinds() {
        let step = Step::confirm("done").secret().preselect(["x"]);
        assert!(matches!(step.kind, StepKind::Confirm));
        let step = Step::multi_choice("n", vec![ChoiceOption::plain("a")]).preselect(["a"]);
        match step.kind {
            StepKind::MultiChoice { preselected, .. } => assert_eq!(preselected, vec!["a"]),
            _ => panic!("expected multi choice"),
        }
    }
}
