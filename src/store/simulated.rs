//! In-process backend that behaves like a slow remote API.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::LatencyConfig;
use crate::error::StoreError;
use crate::flow::Clock;
use crate::onboarding::model::{User, Vehicle};

use super::traits::{Candidate, OnboardingBackend, Provider, Record};

/// Fixed latency on the injected clock, sequential ids, and optional
/// failure injection.
pub struct SimulatedBackend {
    clock: Arc<dyn Clock>,
    latency: LatencyConfig,
    next_id: AtomicU64,
    forced_failures: AtomicU32,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedBackend {
    pub fn new(clock: Arc<dyn Clock>, latency: LatencyConfig) -> Self {
        Self {
            clock,
            latency,
            next_id: AtomicU64::new(1),
            forced_failures: AtomicU32::new(0),
            failure_rate: 0.0,
            rng: Mutex::new(StdRng::seed_from_u64(0)),
        }
    }

    /// Fail each call with probability `rate`, drawn from a seeded RNG.
    pub fn with_failure_rate(mut self, rate: f64, seed: u64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Fail the next `n` calls, saves and sign-ins alike.
    pub fn fail_next(&self, n: u32) {
        self.forced_failures.store(n, Ordering::SeqCst);
    }

    fn latency_for(&self, candidate: &Candidate) -> Duration {
        match candidate {
            Candidate::Account(_) => self.latency.account,
            Candidate::Vehicle(_) => self.latency.vehicle,
            Candidate::Preferences(_) => self.latency.preferences,
            Candidate::Profile(_) => self.latency.profile,
        }
    }

    fn next_id(&self) -> Uuid {
        Uuid::from_u128(u128::from(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    /// Record timestamp for the current logical time.
    fn timestamp(&self) -> DateTime<Utc> {
        let offset = chrono::Duration::from_std(self.clock.now()).unwrap_or(chrono::Duration::zero());
        DateTime::<Utc>::UNIX_EPOCH + offset
    }

    async fn wait(&self, latency: Duration) {
        let deadline = self.clock.now() + latency;
        self.clock.sleep_until(deadline).await;
    }

    /// Whether this call should fail.
    async fn injected_failure(&self) -> bool {
        let forced = self
            .forced_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            return true;
        }
        if self.failure_rate > 0.0 {
            return self.rng.lock().await.gen_bool(self.failure_rate);
        }
        false
    }
}

#[async_trait]
impl OnboardingBackend for SimulatedBackend {
    async fn save(&self, candidate: Candidate) -> Result<Record, StoreError> {
        let kind = candidate.kind();
        self.wait(self.latency_for(&candidate)).await;

        if self.injected_failure().await {
            warn!(kind, "Simulated save failure");
            return Err(StoreError::Rejected(format!("{kind} could not be saved")));
        }

        let now = self.timestamp();
        let record = match candidate {
            Candidate::Account(account) => {
                let mut user = User::new(
                    self.next_id(),
                    account.email,
                    Some(account.first_name),
                    account.last_name,
                );
                user.created_at = now;
                user.updated_at = now;
                Record::User(user)
            }
            Candidate::Vehicle(new) => Record::Vehicle(Vehicle {
                id: self.next_id(),
                user_id: new.user_id,
                make: new.make,
                model: new.model,
                year: new.year,
                vin: new.vin,
                color: new.color,
                trim: new.trim,
                engine: new.engine,
                transmission: new.transmission,
                mileage: new.mileage,
                nickname: new.nickname,
                is_default: true,
                created_at: now,
                updated_at: now,
            }),
            Candidate::Preferences(prefs) => Record::Preferences(prefs),
            Candidate::Profile(update) => {
                let mut user = update.user;
                user.updated_at = now;
                user.ai_preferences = update.ai_preferences.clone();
                Record::Profile {
                    user,
                    vehicle: update.vehicle,
                    ai_preferences: update.ai_preferences,
                }
            }
        };

        info!(kind = record.kind(), "Record saved");
        Ok(record)
    }

    async fn sign_in_with(&self, provider: Provider) -> Result<User, StoreError> {
        self.wait(self.latency.sign_in).await;

        if self.injected_failure().await {
            warn!(%provider, "Simulated sign-in failure");
            return Err(StoreError::SignIn {
                provider: provider.to_string(),
                reason: "provider unavailable".to_string(),
            });
        }

        let now = self.timestamp();
        let mut user = User::new(
            self.next_id(),
            format!("user@{provider}.com"),
            Some("User".to_string()),
            Some("Name".to_string()),
        );
        user.created_at = now;
        user.updated_at = now;
        info!(%provider, user_id = %user.id, "Signed in through provider");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::flow::ManualClock;
    use crate::onboarding::model::AIPreferences;
    use crate::store::NewAccount;

    fn account() -> Candidate {
        Candidate::Account(NewAccount {
            first_name: "Jane".into(),
            last_name: Some("Doe".into()),
            email: "jane@example.com".into(),
            password: SecretString::from("password123".to_string()),
        })
    }

    fn instant() -> SimulatedBackend {
        SimulatedBackend::new(Arc::new(ManualClock::new()), LatencyConfig::zero())
    }

    #[tokio::test]
    async fn ids_are_sequential() {
        let backend = instant();
        let Record::User(first) = backend.save(account()).await.unwrap() else {
            panic!("expected user");
        };
        let Record::User(second) = backend.save(account()).await.unwrap() else {
            panic!("expected user");
        };
        assert_eq!(first.id, Uuid::from_u128(1));
        assert_eq!(second.id, Uuid::from_u128(2));
        assert_eq!(first.full_name(), "Jane Doe");
    }

    #[tokio::test]
    async fn save_waits_for_latency() {
        let clock = Arc::new(ManualClock::new());
        let backend = Arc::new(SimulatedBackend::new(clock.clone(), LatencyConfig::default()));
        let task = {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move {
                backend
                    .save(Candidate::Preferences(AIPreferences::default()))
                    .await
            })
        };
        tokio::task::yield_now().await;

        clock.advance(Duration::from_millis(1999));
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        clock.advance(Duration::from_millis(1));
        let record = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("save should finish")
            .unwrap()
            .unwrap();
        assert_eq!(record.kind(), "preferences");
    }

    #[tokio::test]
    async fn forced_failures_run_out() {
        let backend = instant();
        backend.fail_next(1);
        assert!(backend.save(account()).await.is_err());
        assert!(backend.save(account()).await.is_ok());
    }

    #[tokio::test]
    async fn failure_rate_is_reproducible() {
        let run = || async {
            let backend = instant().with_failure_rate(0.5, 42);
            let mut outcomes = Vec::new();
            for _ in 0..16 {
                outcomes.push(backend.save(account()).await.is_ok());
            }
            outcomes
        };
        assert_eq!(run().await, run().await);
    }

    #[tokio::test]
    async fn provider_sign_in_fabricates_user() {
        let backend = instant();
        let user = backend.sign_in_with(Provider::Apple).await.unwrap();
        assert_eq!(user.email, "user@apple.com");
        assert_eq!(user.full_name(), "User Name");

        backend.fail_next(1);
        let err = backend.sign_in_with(Provider::Google).await.unwrap_err();
        assert!(matches!(err, StoreError::SignIn { .. }));
    }
}
