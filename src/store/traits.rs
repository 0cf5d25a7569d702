//! `OnboardingBackend` trait: the single async interface flows save through.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::onboarding::model::{AIPreferences, Transmission, User, Vehicle};

/// Third-party identity providers offered at sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Google,
    Apple,
}

impl Provider {
    /// Display name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Apple => "Apple",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::Apple => write!(f, "apple"),
        }
    }
}

/// Account details collected at sign-up.
#[derive(Debug)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub password: SecretString,
}

/// Vehicle details before the backend assigns ids.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVehicle {
    pub user_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: Option<String>,
    pub color: Option<String>,
    pub trim: Option<String>,
    pub engine: Option<String>,
    pub transmission: Option<Transmission>,
    pub mileage: Option<u32>,
    pub nickname: Option<String>,
}

/// The reviewed profile: the user as edited plus whatever was set up.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub user: User,
    pub vehicle: Option<Vehicle>,
    pub ai_preferences: Option<AIPreferences>,
}

/// What a flow asks the backend to save.
#[derive(Debug)]
pub enum Candidate {
    Account(NewAccount),
    Vehicle(NewVehicle),
    Preferences(AIPreferences),
    Profile(ProfileUpdate),
}

impl Candidate {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Account(_) => "account",
            Self::Vehicle(_) => "vehicle",
            Self::Preferences(_) => "preferences",
            Self::Profile(_) => "profile",
        }
    }
}

/// What the backend hands back once a candidate is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    User(User),
    Vehicle(Vehicle),
    Preferences(AIPreferences),
    Profile {
        user: User,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vehicle: Option<Vehicle>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ai_preferences: Option<AIPreferences>,
    },
}

impl Record {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Vehicle(_) => "vehicle",
            Self::Preferences(_) => "preferences",
            Self::Profile { .. } => "profile",
        }
    }
}

/// Backend-agnostic persistence and sign-in.
#[async_trait]
pub trait OnboardingBackend: Send + Sync {
    /// Persist a candidate and return the stored record.
    async fn save(&self, candidate: Candidate) -> Result<Record, StoreError>;

    /// Sign a user up through a third-party provider.
    async fn sign_in_with(&self, provider: Provider) -> Result<User, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_tagged_by_kind() {
        let record = Record::Preferences(AIPreferences::default());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "preferences");
        assert_eq!(json["communication_style"], "friendly");

        let parsed: Record = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn account_debug_hides_password() {
        let account = NewAccount {
            first_name: "Jane".into(),
            last_name: None,
            email: "jane@example.com".into(),
            password: SecretString::from("hunter2hunter2".to_string()),
        };
        let rendered = format!("{:?}", Candidate::Account(account));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn provider_names() {
        assert_eq!(Provider::Google.label(), "Google");
        assert_eq!(Provider::Apple.to_string(), "apple");
    }
}
