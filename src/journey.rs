//! Journey: the app-level screen machine that strings the flows together.
//!
//! Auth → Welcome → VehicleSetup → AiPersonalization → Profile → Dashboard.
//! Each conversational screen runs one flow; its result (or skip) moves the
//! journey on and produces a short notice for the user.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::OnboardingConfig;
use crate::error::{Error, JourneyError};
use crate::flow::{FlowDefinition, FlowEvent};
use crate::onboarding::model::{AIPreferences, User, Vehicle, capitalize, format_thousands};
use crate::onboarding::{account, personalization, profile, vehicle};
use crate::store::Record;

/// The app's screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Auth,
    Welcome,
    VehicleSetup,
    AiPersonalization,
    Profile,
    Dashboard,
}

impl Screen {
    pub fn can_transition_to(&self, target: Screen) -> bool {
        use Screen::*;
        matches!(
            (self, target),
            (Auth, Welcome)
                | (Welcome, VehicleSetup)
                | (VehicleSetup, AiPersonalization)
                | (AiPersonalization, Profile)
                | (Profile, Dashboard)
                | (Dashboard, VehicleSetup)
                | (Dashboard, AiPersonalization)
                | (Dashboard, Profile)
                | (Dashboard, Auth)
        )
    }

    /// Whether this screen runs a conversational flow.
    pub fn has_flow(&self) -> bool {
        !matches!(self, Self::Welcome | Self::Dashboard)
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Auth => "auth",
            Self::Welcome => "welcome",
            Self::VehicleSetup => "vehicle_setup",
            Self::AiPersonalization => "ai_personalization",
            Self::Profile => "profile",
            Self::Dashboard => "dashboard",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A one-line toast shown after a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Buttons on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardAction {
    AddVehicle,
    Personalize,
    EditProfile,
    SignOut,
}

impl DashboardAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddVehicle => "Add Vehicle",
            Self::Personalize => "Personalize uMELI",
            Self::EditProfile => "Edit Profile",
            Self::SignOut => "Sign out",
        }
    }
}

/// Where the user is and what onboarding has produced so far.
#[derive(Debug, Clone, Default)]
pub struct Journey {
    screen: Screen,
    user: Option<User>,
    vehicle: Option<Vehicle>,
    ai_preferences: Option<AIPreferences>,
}

impl Journey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn vehicle(&self) -> Option<&Vehicle> {
        self.vehicle.as_ref()
    }

    pub fn ai_preferences(&self) -> Option<&AIPreferences> {
        self.ai_preferences.as_ref()
    }

    /// The flow for the current screen, if it has one.
    pub fn flow(&self, config: &OnboardingConfig) -> Result<Option<FlowDefinition>, Error> {
        let definition = match self.screen {
            Screen::Welcome | Screen::Dashboard => return Ok(None),
            Screen::Auth => account::flow(config.account_timing())?,
            Screen::VehicleSetup => vehicle::flow(self.require_user()?, config.timing)?,
            Screen::AiPersonalization => {
                personalization::flow(self.require_user()?, config.timing)?
            }
            Screen::Profile => profile::flow(
                self.require_user()?,
                self.vehicle.as_ref(),
                self.ai_preferences.as_ref(),
                config.timing,
            )?,
        };
        Ok(Some(definition))
    }

    /// Feed a flow event from the current screen's flow. Returns the notice
    /// to show, if the event moved the journey or reported a failure.
    pub fn apply(&mut self, event: &FlowEvent) -> Result<Option<Notice>, JourneyError> {
        match event {
            FlowEvent::Message(_) => Ok(None),
            FlowEvent::Error(message) => Ok(Some(Notice::error(message.clone()))),
            FlowEvent::Completed(record) => self.completed(record.clone()).map(Some),
            FlowEvent::Skipped => self.skipped().map(Some),
        }
    }

    fn completed(&mut self, record: Record) -> Result<Notice, JourneyError> {
        match (self.screen, record) {
            (Screen::Auth, Record::User(user)) => {
                self.go(Screen::Welcome)?;
                let greeting = user
                    .first_name
                    .as_deref()
                    .map(|f| format!(", {f}"))
                    .unwrap_or_default();
                self.user = Some(user);
                Ok(Notice::success(format!(
                    "Welcome{greeting}! Your account has been created successfully."
                )))
            }
            (Screen::VehicleSetup, Record::Vehicle(vehicle)) => {
                self.go(Screen::AiPersonalization)?;
                let notice = format!("{} has been added to your profile!", vehicle.display_name());
                self.vehicle = Some(vehicle);
                Ok(Notice::success(notice))
            }
            (Screen::AiPersonalization, Record::Preferences(prefs)) => {
                self.go(Screen::Profile)?;
                self.ai_preferences = Some(prefs);
                Ok(Notice::success("Your uMELI experience has been personalized!"))
            }
            (
                Screen::Profile,
                Record::Profile {
                    user,
                    vehicle,
                    ai_preferences,
                },
            ) => {
                self.go(Screen::Dashboard)?;
                self.user = Some(user);
                if vehicle.is_some() {
                    self.vehicle = vehicle;
                }
                if ai_preferences.is_some() {
                    self.ai_preferences = ai_preferences;
                }
                Ok(Notice::success(
                    "Welcome to your personalized uMODA dashboard! Ready to help with all your vehicle needs.",
                ))
            }
            (screen, record) => Err(JourneyError::InvalidAction {
                screen: screen.to_string(),
                action: format!("accept a {} record", record.kind()),
            }),
        }
    }

    fn skipped(&mut self) -> Result<Notice, JourneyError> {
        match self.screen {
            Screen::VehicleSetup => {
                self.go(Screen::AiPersonalization)?;
                Ok(Notice::info(
                    "You can add your vehicle information later from your profile.",
                ))
            }
            Screen::AiPersonalization => {
                self.go(Screen::Profile)?;
                Ok(Notice::info(
                    "Default AI settings applied. You can customize your experience later in settings.",
                ))
            }
            Screen::Profile => {
                self.go(Screen::Dashboard)?;
                Ok(Notice::info(
                    "Profile review skipped. You can always update your information later.",
                ))
            }
            screen => Err(JourneyError::InvalidAction {
                screen: screen.to_string(),
                action: "skip".to_string(),
            }),
        }
    }

    /// "Get Started" on the welcome screen.
    pub fn get_started(&mut self) -> Result<(), JourneyError> {
        if self.screen != Screen::Welcome {
            return Err(JourneyError::InvalidAction {
                screen: self.screen.to_string(),
                action: "get started".to_string(),
            });
        }
        self.go(Screen::VehicleSetup)
    }

    /// Dashboard buttons on offer right now.
    pub fn dashboard_actions(&self) -> Vec<DashboardAction> {
        if self.screen != Screen::Dashboard {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if self.vehicle.is_none() {
            actions.push(DashboardAction::AddVehicle);
        }
        if self.ai_preferences.is_none() {
            actions.push(DashboardAction::Personalize);
        }
        actions.push(DashboardAction::EditProfile);
        actions.push(DashboardAction::SignOut);
        actions
    }

    pub fn act(&mut self, action: DashboardAction) -> Result<(), JourneyError> {
        if !self.dashboard_actions().contains(&action) {
            return Err(JourneyError::InvalidAction {
                screen: self.screen.to_string(),
                action: action.label().to_lowercase(),
            });
        }
        match action {
            DashboardAction::AddVehicle => self.go(Screen::VehicleSetup),
            DashboardAction::Personalize => self.go(Screen::AiPersonalization),
            DashboardAction::EditProfile => self.go(Screen::Profile),
            DashboardAction::SignOut => {
                self.go(Screen::Auth)?;
                self.user = None;
                self.vehicle = None;
                self.ai_preferences = None;
                info!("Signed out, journey data cleared");
                Ok(())
            }
        }
    }

    fn go(&mut self, target: Screen) -> Result<(), JourneyError> {
        if !self.screen.can_transition_to(target) {
            return Err(JourneyError::InvalidAction {
                screen: self.screen.to_string(),
                action: format!("go to {target}"),
            });
        }
        info!(from = %self.screen, to = %target, "Screen changed");
        self.screen = target;
        Ok(())
    }

    fn require_user(&self) -> Result<&User, JourneyError> {
        self.user.as_ref().ok_or(JourneyError::NotSignedIn)
    }

    /// Text rendering of the welcome screen.
    pub fn render_welcome(&self) -> String {
        let mut out = String::new();
        let first = self.user.as_ref().and_then(|u| u.first_name.as_deref());
        match first {
            Some(first) => out.push_str(&format!("Welcome, {first}!\n")),
            None => out.push_str("Welcome!\n"),
        }
        out.push_str(
            "Your account has been successfully created. Let's get you started with our platform.\n\nWhat you can do:\n",
        );
        for (title, description) in FEATURES {
            out.push_str(&format!("• {title}: {description}\n"));
        }
        if let Some(user) = &self.user {
            out.push_str(&format!("\nAccount Information\nEmail: {}\n", user.email));
            if let (Some(first), Some(last)) = (&user.first_name, &user.last_name) {
                out.push_str(&format!("Name: {first} {last}\n"));
            }
        }
        out
    }

    /// Text rendering of the dashboard cards.
    pub fn render_dashboard(&self) -> String {
        let mut out = String::new();
        let first = self.user.as_ref().and_then(|u| u.first_name.as_deref());
        match first {
            Some(first) => out.push_str(&format!("Welcome, {first}!\n")),
            None => out.push_str("Welcome to uMODA\n"),
        }
        match &self.ai_preferences {
            Some(prefs) => {
                let nickname = prefs
                    .preferred_name
                    .as_deref()
                    .filter(|name| Some(*name) != first)
                    .map(|name| format!(", {name}"))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "Your personalized uMELI assistant is ready to help{nickname}!\n"
                ));
            }
            None => out.push_str("Your vehicle AI assistant is ready to help.\n"),
        }

        if let Some(vehicle) = &self.vehicle {
            out.push_str(&format!("\nYour Vehicle\nVehicle: {}", vehicle.title()));
            if let Some(trim) = &vehicle.trim {
                out.push_str(&format!(" {trim}"));
            }
            out.push('\n');
            if let Some(color) = &vehicle.color {
                out.push_str(&format!("Color: {color}\n"));
            }
            if let Some(nickname) = &vehicle.nickname {
                out.push_str(&format!("Nickname: {nickname}\n"));
            }
            if let Some(mileage) = vehicle.mileage.filter(|m| *m > 0) {
                out.push_str(&format!("Mileage: {} miles\n", format_thousands(mileage)));
            }
        }

        if let Some(prefs) = &self.ai_preferences {
            out.push_str(&format!(
                "\nuMELI AI Preferences\nStyle: {}\nResponse Detail: {}\n",
                capitalize(prefs.communication_style.value()),
                capitalize(prefs.response_length.value())
            ));
            let traits = &prefs.personality_traits;
            if !traits.is_empty() {
                let shown: Vec<&str> = traits.iter().take(3).map(String::as_str).collect();
                out.push_str(&format!("Personality: {}", shown.join(", ")));
                if traits.len() > 3 {
                    out.push_str(&format!(" +{} more", traits.len() - 3));
                }
                out.push('\n');
            }
        }

        let (kind, car) = (
            if self.ai_preferences.is_some() { "personalized" } else { "AI" },
            if self.vehicle.is_some() { "vehicle" } else { "car" },
        );
        out.push_str(&format!(
            "\nDashboard coming soon! You'll be able to:\n• Ask {kind} questions about your {car}\n• Get maintenance reminders and schedules\n• Track service history\n• Receive personalized recommendations\n• Edit your profile and preferences\n"
        ));
        out
    }
}

const FEATURES: [(&str, &str); 3] = [
    (
        "Vehicle Management",
        "Add and manage your vehicle information for personalized assistance",
    ),
    (
        "AI-Powered Help",
        "Get instant answers to your vehicle questions using our uMELI AI",
    ),
    (
        "Secure & Private",
        "Your data is protected with enterprise-level security",
    ),
];
