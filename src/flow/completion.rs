//! Completion handler: turns collected data into a record to save, and the
//! optional third-party sign-in path that skips manual entry.

use std::sync::Arc;

use crate::error::FlowError;
use crate::store::{Candidate, Provider, Record};

use super::data::CollectedData;
use super::step::{Script, StepId};

pub type Assemble = Arc<dyn Fn(&CollectedData) -> Result<Candidate, FlowError> + Send + Sync>;

pub type ProviderScript = Arc<dyn Fn(Provider) -> Vec<String> + Send + Sync>;

/// What happens around the save at the confirmation step.
#[derive(Clone)]
pub struct Completion {
    pub assemble: Assemble,
    /// Said when the save starts.
    pub saving: Script,
    /// Said once the save succeeds, before the result is handed off.
    pub saved: Script,
    /// Said when the save fails. The user is back at the confirmation step.
    pub failed: Script,
    /// Error text handed to the parent when the save fails.
    pub failure_notice: String,
}

impl Completion {
    pub fn new<F>(assemble: F) -> Self
    where
        F: Fn(&CollectedData) -> Result<Candidate, FlowError> + Send + Sync + 'static,
    {
        Self {
            assemble: Arc::new(assemble),
            saving: super::step::silent(),
            saved: super::step::silent(),
            failed: super::step::silent(),
            failure_notice: "Saving failed. Please try again.".to_string(),
        }
    }

    pub fn saving(mut self, script: Script) -> Self {
        self.saving = script;
        self
    }

    pub fn saved(mut self, script: Script) -> Self {
        self.saved = script;
        self
    }

    pub fn failed(mut self, script: Script, notice: impl Into<String>) -> Self {
        self.failed = script;
        self.failure_notice = notice.into();
        self
    }
}

/// Optional third-party sign-in path.
#[derive(Clone)]
pub struct SignIn {
    pub connecting: ProviderScript,
    pub succeeded: ProviderScript,
    pub failed: ProviderScript,
    /// Where manual entry resumes after a failed sign-in.
    pub fallback: StepId,
}

impl SignIn {
    /// Error text handed to the parent when a provider fails.
    pub fn failure_notice(provider: Provider) -> String {
        format!("{provider} authentication failed. Please try again.")
    }
}

/// The external call a flow is waiting on while it is submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InFlight {
    Save,
    SignIn(Provider),
}

/// Result of an external call, as the engine sees it.
pub type Outcome = Result<Record, String>;

#[cfg(test)]
pub(crate) mod test_support {
    use secrecy::SecretString;

    use super::*;
    use crate::flow::step::lines;
    use crate::store::NewAccount;

    /// Saves `name` and `email` as an account.
    pub fn completion() -> Completion {
        Completion::new(|data: &CollectedData| {
            Ok(Candidate::Account(NewAccount {
                first_name: data.require_text("name")?.to_string(),
                last_name: None,
                email: data.require_text("email")?.to_string(),
                password: SecretString::from("password123".to_string()),
            }))
        })
        .saving(lines(["Saving..."]))
        .saved(lines(["Saved!"]))
        .failed(lines(["Save failed."]), "Save failed. Please try again.")
    }
}
