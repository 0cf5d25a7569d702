//! End-to-end: a new user goes from sign-up to the dashboard, one flow
//! session per screen, with the journey consuming each session's events.

use std::sync::Arc;

use tokio::sync::broadcast;

use umoda_onboarding::config::{LatencyConfig, OnboardingConfig, TimingConfig};
use umoda_onboarding::flow::{FlowEvent, ManualClock};
use umoda_onboarding::journey::{DashboardAction, Journey, Notice, NoticeLevel, Screen};
use umoda_onboarding::onboarding::profile::LOOKS_GOOD;
use umoda_onboarding::onboarding::{CommunicationStyle, FlowSession, ResponseLength};
use umoda_onboarding::store::{OnboardingBackend, SimulatedBackend};

struct Harness {
    config: OnboardingConfig,
    clock: Arc<ManualClock>,
    backend: Arc<dyn OnboardingBackend>,
    journey: Journey,
}

impl Harness {
    fn new() -> Self {
        let config = OnboardingConfig {
            timing: TimingConfig::instant(),
            account_typing_per_char: std::time::Duration::ZERO,
            latency: LatencyConfig::zero(),
            ..OnboardingConfig::default()
        };
        let clock = Arc::new(ManualClock::new());
        let backend = Arc::new(SimulatedBackend::new(clock.clone(), config.latency));
        Self {
            config,
            clock,
            backend,
            journey: Journey::new(),
        }
    }

    /// Open the current screen's flow and start it.
    async fn open(&self) -> (FlowSession, broadcast::Receiver<FlowEvent>) {
        let definition = self
            .journey
            .flow(&self.config)
            .unwrap()
            .expect("screen should have a flow");
        let session = FlowSession::new(definition, self.clock.clone(), self.backend.clone());
        let rx = session.subscribe();
        session.start().await.unwrap();
        (session, rx)
    }

    /// Hand every pending event to the journey and collect the notices.
    fn apply(&mut self, rx: &mut broadcast::Receiver<FlowEvent>) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let Some(notice) = self.journey.apply(&event).unwrap() {
                notices.push(notice);
            }
        }
        notices
    }
}

#[tokio::test]
async fn new_user_reaches_the_dashboard() {
    let mut h = Harness::new();
    assert_eq!(h.journey.screen(), Screen::Auth);

    // Account
    let (session, mut rx) = h.open().await;
    session.submit_text("Jane Doe").await.unwrap();
    session.submit_text("jane@example.com").await.unwrap();
    session.submit_text("password123").await.unwrap();
    assert!(session.complete().await.unwrap());
    let notices = h.apply(&mut rx);
    assert_eq!(h.journey.screen(), Screen::Welcome);
    assert_eq!(
        notices.last().map(|n| n.text.as_str()),
        Some("Welcome, Jane! Your account has been created successfully.")
    );
    assert!(h.journey.render_welcome().contains("Jane"));

    h.journey.get_started().unwrap();
    assert_eq!(h.journey.screen(), Screen::VehicleSetup);

    // Vehicle
    let (session, mut rx) = h.open().await;
    for answer in ["toyota", "Camry", "2020", "Blue", "skip", "45000"] {
        session.submit_text(answer).await.unwrap();
    }
    assert!(session.complete().await.unwrap());
    h.apply(&mut rx);
    assert_eq!(h.journey.screen(), Screen::AiPersonalization);
    let vehicle = h.journey.vehicle().unwrap();
    assert_eq!(vehicle.make, "Toyota");
    assert_eq!(vehicle.year, 2020);
    assert_eq!(vehicle.mileage, Some(45000));
    assert_eq!(vehicle.nickname, None);
    assert_eq!(vehicle.user_id, h.journey.user().unwrap().id);

    // Personalization
    let (session, mut rx) = h.open().await;
    session.submit_text("keep").await.unwrap();
    session.choose("casual").await.unwrap();
    session.choose("brief").await.unwrap();
    session.toggle("Helpful").await.unwrap();
    session.confirm_choices().await.unwrap();
    session.confirm_choices().await.unwrap();
    session.confirm_choices().await.unwrap();
    assert!(session.complete().await.unwrap());
    h.apply(&mut rx);
    assert_eq!(h.journey.screen(), Screen::Profile);
    let prefs = h.journey.ai_preferences().unwrap();
    assert_eq!(prefs.communication_style, CommunicationStyle::Casual);
    assert_eq!(prefs.response_length, ResponseLength::Brief);
    assert_eq!(prefs.personality_traits, vec!["Helpful".to_string()]);
    assert!(prefs.focus_areas.is_empty());
    assert_eq!(prefs.notification_preferences.enabled_count(), 3);

    // Profile
    let (session, mut rx) = h.open().await;
    session.choose(LOOKS_GOOD).await.unwrap();
    assert!(session.complete().await.unwrap());
    let notices = h.apply(&mut rx);
    assert_eq!(h.journey.screen(), Screen::Dashboard);
    assert_eq!(notices.last().map(|n| n.level), Some(NoticeLevel::Success));

    assert_eq!(
        h.journey.dashboard_actions(),
        vec![DashboardAction::EditProfile, DashboardAction::SignOut]
    );
    let dashboard = h.journey.render_dashboard();
    assert!(dashboard.contains("Jane"));
    assert!(dashboard.contains("Toyota"));
}

#[tokio::test]
async fn skipping_everything_still_lands_on_the_dashboard() {
    let mut h = Harness::new();

    let (session, mut rx) = h.open().await;
    session.submit_text("Sam").await.unwrap();
    session.submit_text("sam@example.com").await.unwrap();
    session.submit_text("longenough").await.unwrap();
    session.complete().await.unwrap();
    h.apply(&mut rx);
    h.journey.get_started().unwrap();

    let mut notices = Vec::new();
    for expected in [Screen::AiPersonalization, Screen::Profile, Screen::Dashboard] {
        let (session, mut rx) = h.open().await;
        session.skip().await.unwrap();
        notices.extend(h.apply(&mut rx));
        assert_eq!(h.journey.screen(), expected);
    }
    assert!(notices.iter().all(|n| n.level == NoticeLevel::Info));
    assert!(h.journey.vehicle().is_none());
    assert!(h.journey.ai_preferences().is_none());
    assert_eq!(
        h.journey.dashboard_actions(),
        vec![
            DashboardAction::AddVehicle,
            DashboardAction::Personalize,
            DashboardAction::EditProfile,
            DashboardAction::SignOut,
        ]
    );

    h.journey.act(DashboardAction::SignOut).unwrap();
    assert_eq!(h.journey.screen(), Screen::Auth);
    assert!(h.journey.user().is_none());
}

#[tokio::test]
async fn account_flow_cannot_be_skipped_past() {
    let mut h = Harness::new();
    let (session, mut rx) = h.open().await;
    session.skip().await.unwrap();

    let events: Vec<FlowEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(events.last(), Some(&FlowEvent::Skipped));
    assert!(h.journey.apply(&FlowEvent::Skipped).is_err());
    assert_eq!(h.journey.screen(), Screen::Auth);
}
