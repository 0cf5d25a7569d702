//! Profile review: show what onboarding collected, optionally edit the
//! account details, then save the composite profile.

use crate::config::TimingConfig;
use crate::error::{FlowError, ValidationError};
use crate::flow::step::{line, lines};
use crate::flow::validate;
use crate::flow::{ChoiceOption, CollectedData, Completion, FieldValue, FlowDefinition, Step};
use crate::store::{Candidate, ProfileUpdate};

use super::model::{AIPreferences, User, Vehicle};

pub const FLOW_NAME: &str = "profile";

pub const LOOKS_GOOD: &str = "looks_good";
pub const EDIT: &str = "edit";

/// Answers that leave the last name blank.
const LAST_NAME_SKIP_WORDS: &[&str] = &["skip", "none"];

pub fn flow(
    user: &User,
    vehicle: Option<&Vehicle>,
    ai_preferences: Option<&AIPreferences>,
    timing: TimingConfig,
) -> Result<FlowDefinition, FlowError> {
    let first = user.first_name_or_empty().to_string();
    let overview = overview(user, vehicle, ai_preferences);

    let original = user.clone();
    let summary_user = user.clone();
    let saved_user = user.clone();
    let vehicle = vehicle.cloned();
    let ai_preferences = ai_preferences.cloned();

    let steps = vec![
        Step::say(
            "overview",
            lines([
                format!("You're all set up, {first}! Here's a quick look at your profile:"),
                overview,
            ]),
        )
        .then("review"),
        Step::single_choice(
            "review",
            vec![
                ChoiceOption::new(LOOKS_GOOD, "Looks good")
                    .describe("Continue to your dashboard"),
                ChoiceOption::new(EDIT, "Edit details")
                    .describe("Update your name or email"),
            ],
        )
        .prompt(lines(["Does everything look right?"]))
        .branch(|data| {
            if data.text("review") == Some(EDIT) {
                "first_name"
            } else {
                "confirmation"
            }
        }),
        Step::free_text("first_name", |input, _| {
            let first = input.trim();
            if first.is_empty() {
                return Err(ValidationError::Empty { field: "first_name" });
            }
            Ok(FieldValue::Text(first.to_string()))
        })
        .prompt(lines(["Sure! What's your first name?"]))
        .retry(lines(["I'll need at least a first name. What should I call you?"]))
        .reply(line(|data| {
            format!("Thanks, {}!", data.text("first_name").unwrap_or_default())
        }))
        .then("last_name"),
        Step::free_text("last_name", |input, _| {
            Ok(FieldValue::Text(validate::optional_text(input, LAST_NAME_SKIP_WORDS)))
        })
        .prompt(lines([
            "And your last name? You can type 'skip' to leave it blank.",
        ]))
        .then("email"),
        Step::free_text("email", |input, _| Ok(FieldValue::Text(validate::email(input)?)))
            .prompt(lines(["Finally, which email should we use?"]))
            .retry(lines([
                "Hmm, that doesn't look like a valid email address. Could you double-check and try again?",
            ]))
            .then("confirmation"),
        Step::confirm("confirmation").prompt(line(move |data| {
            let user = edited(&summary_user, data);
            format!(
                "Here's what I'll save:\n\n👤 Name: {}\n📧 Email: {}\n\nShall I save your profile?",
                user.full_name(),
                user.email
            )
        })),
    ];

    let completion = Completion::new(move |data: &CollectedData| {
        Ok(Candidate::Profile(ProfileUpdate {
            user: edited(&original, data),
            vehicle: vehicle.clone(),
            ai_preferences: ai_preferences.clone(),
        }))
    })
    .saving(lines(["Saving your profile..."]))
    .saved(line(move |data| {
        format!(
            "🎉 Your profile is all set, {}! Taking you to your dashboard.",
            edited(&saved_user, data).first_name_or_empty()
        )
    }))
    .failed(
        lines([
            "Oops! Something went wrong while saving your profile. Let's try that again.",
        ]),
        "Profile could not be saved. Please try again.",
    );

    FlowDefinition::new(FLOW_NAME, steps, timing, completion)
}

/// `user` with any edited fields applied.
fn edited(user: &User, data: &CollectedData) -> User {
    let mut user = user.clone();
    if let Some(first) = data.text("first_name") {
        user.first_name = Some(first.to_string());
        user.last_name = data.text("last_name").map(str::to_string);
    }
    if let Some(email) = data.text("email") {
        user.email = email.to_string();
    }
    user
}

fn overview(user: &User, vehicle: Option<&Vehicle>, prefs: Option<&AIPreferences>) -> String {
    let mut out = format!("👤 Name: {}\n📧 Email: {}", user.full_name(), user.email);
    match vehicle {
        Some(vehicle) => out.push_str(&format!("\n🚗 Vehicle: {}", vehicle.display_name())),
        None => out.push_str("\n🚗 Vehicle: Not added yet"),
    }
    match prefs {
        Some(prefs) => out.push_str(&format!(
            "\n🧠 Assistant: {}, {}",
            prefs.communication_style.label(),
            prefs.response_length.label()
        )),
        None => out.push_str("\n🧠 Assistant: Default settings"),
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::flow::FlowEngine;

    fn settle(engine: &mut FlowEngine, mut now: Duration) -> Duration {
        engine.tick(now);
        while let Some(due) = engine.next_deadline() {
            now = now.max(due);
            engine.tick(now);
        }
        now
    }

    fn user() -> User {
        User::new(
            Uuid::from_u128(1),
            "jane@example.com",
            Some("Jane".into()),
            Some("Doe".into()),
        )
    }

    fn engine(prefs: Option<&AIPreferences>) -> (FlowEngine, Duration) {
        let def = flow(&user(), None, prefs, TimingConfig::instant()).unwrap();
        let mut engine = FlowEngine::new(Arc::new(def));
        engine.start(Duration::ZERO).unwrap();
        let now = settle(&mut engine, Duration::ZERO);
        (engine, now)
    }

    #[test]
    fn overview_lists_what_is_missing() {
        let (engine, _) = engine(None);
        let texts = engine.messages().assistant_texts();
        assert_eq!(
            texts[1],
            "👤 Name: Jane Doe\n📧 Email: jane@example.com\n🚗 Vehicle: Not added yet\n🧠 Assistant: Default settings"
        );
        assert_eq!(engine.current_step_id(), Some("review"));
    }

    #[test]
    fn looks_good_goes_straight_to_confirmation() {
        let prefs = AIPreferences::default();
        let (mut engine, now) = engine(Some(&prefs));
        let next = engine.submit_choice(LOOKS_GOOD, now).unwrap();
        assert_eq!(next, Some("confirmation"));
        let now = settle(&mut engine, now);

        match engine.begin_submit(now).unwrap() {
            Some(Candidate::Profile(update)) => {
                assert_eq!(update.user, user());
                assert!(update.vehicle.is_none());
                assert_eq!(update.ai_preferences, Some(prefs));
            }
            other => panic!("expected profile candidate, got {other:?}"),
        }
    }

    #[test]
    fn edit_path_recollects_account_details() {
        let (mut engine, now) = engine(None);
        assert_eq!(engine.submit_choice(EDIT, now).unwrap(), Some("first_name"));
        let mut now = settle(&mut engine, now);
        for answer in ["Janet", "skip", "janet@example.com"] {
            engine.submit_free_text(answer, now).unwrap();
            now = settle(&mut engine, now);
        }
        assert_eq!(engine.current_step_id(), Some("confirmation"));
        let summary = engine.messages().assistant_texts().last().copied().unwrap();
        assert!(summary.contains("👤 Name: Janet\n📧 Email: janet@example.com"));

        match engine.begin_submit(now).unwrap() {
            Some(Candidate::Profile(update)) => {
                assert_eq!(update.user.first_name.as_deref(), Some("Janet"));
                assert!(update.user.last_name.is_none());
                assert_eq!(update.user.email, "janet@example.com");
                assert_eq!(update.user.id, Uuid::from_u128(1));
            }
            other => panic!("expected profile candidate, got {other:?}"),
        }
    }
}
