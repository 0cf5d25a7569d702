//! Account creation: name, email and password, or a third-party provider.

use secrecy::{ExposeSecret, SecretString};

use crate::config::TimingConfig;
use crate::error::FlowError;
use crate::flow::completion::SignIn;
use crate::flow::step::{line, lines};
use crate::flow::validate::{self, PersonName};
use crate::flow::{CollectedData, Completion, FieldValue, FlowDefinition, Step};
use crate::store::{Candidate, NewAccount, Provider};

pub const FLOW_NAME: &str = "account";

/// The name answer split into first and last.
pub fn person(data: &CollectedData) -> Option<PersonName> {
    data.text("name").and_then(|n| validate::name(n).ok())
}

fn first_name(data: &CollectedData) -> String {
    person(data).map(|p| p.first).unwrap_or_default()
}

pub fn flow(timing: TimingConfig) -> Result<FlowDefinition, FlowError> {
    let steps = vec![
        Step::say(
            "greeting",
            lines([
                "Hello there! 👋 I'm uMELI, your personal vehicle AI assistant. I'm excited to meet you!",
                "I'm here to help you with everything related to your vehicle - from maintenance reminders to troubleshooting questions. But first, let's get you set up with an account!",
            ]),
        )
        .then("name"),
        Step::free_text("name", |input, _| {
            let name = validate::name(input)?;
            Ok(FieldValue::Text(name.full()))
        })
        .prompt(lines([
            "What should I call you? Could you share your first and last name?",
        ]))
        .retry(lines([
            "I didn't catch that. Could you please share your name?",
        ]))
        .reply(line(|data| match person(data) {
            Some(PersonName {
                first,
                last: Some(last),
            }) => format!("Nice to meet you, {first}! {first} {last} - I'll remember that."),
            Some(PersonName { first, last: None }) => {
                format!("Nice to meet you, {first}! Just {first} works perfectly!")
            }
            None => "Nice to meet you!".to_string(),
        }))
        .then("email"),
        Step::free_text("email", |input, _| Ok(FieldValue::Text(validate::email(input)?)))
            .prompt(lines([
                "Now, I'll need your email address to create your account. What email would you like to use?",
            ]))
            .retry(lines([
                "Hmm, that doesn't look like a valid email address. Could you double-check and try again?",
            ]))
            .reply(line(|data| {
                format!(
                    "Perfect! I've got your email as {}.",
                    data.text("email").unwrap_or_default()
                )
            }))
            .then("password"),
        Step::free_text("password", |input, _| {
            validate::password(input)?;
            Ok(FieldValue::secret(input))
        })
        .secret()
        .prompt(lines([
            "Last step - I need you to create a secure password. Make sure it's at least 8 characters long to keep your account safe! 🔒",
        ]))
        .retry(lines([
            "That password is a bit too short. Let's make sure it's at least 8 characters for better security!",
        ]))
        .reply(lines([
            "Excellent! Your password is secure. Let me just review what we have:",
        ]))
        .then("confirmation"),
        Step::confirm("confirmation").prompt(line(|data| {
            let name = person(data).map(|p| p.full()).unwrap_or_default();
            format!(
                "✓ Name: {name}\n✓ Email: {}\n✓ Password: Set securely\n\nEverything look good? I'll create your account now!",
                data.text("email").unwrap_or_default()
            )
        })),
    ];

    let completion = Completion::new(assemble)
        .saving(lines([
            "Creating your account now... This will just take a moment! ⚡",
        ]))
        .saved(line(|data| {
            format!(
                "🎉 Welcome to uMODA, {}! Your account has been created successfully. I'm so excited to start helping you with your vehicle needs!",
                first_name(data)
            )
        }))
        .failed(
            lines([
                "Oops! Something went wrong while creating your account. Let's try that again.",
            ]),
            "Account creation failed. Please try again.",
        );

    FlowDefinition::new(FLOW_NAME, steps, timing, completion)?.with_sign_in(sign_in())
}

fn sign_in() -> SignIn {
    SignIn {
        connecting: std::sync::Arc::new(|provider: Provider| {
            vec![format!(
                "Great choice! Let me connect you with {} to get you signed up quickly...",
                provider.label()
            )]
        }),
        succeeded: std::sync::Arc::new(|provider: Provider| {
            vec![format!(
                "Perfect! You're all signed up through {}. Welcome to uMODA! 🎉",
                provider.label()
            )]
        }),
        failed: std::sync::Arc::new(|provider: Provider| {
            vec![format!(
                "Hmm, there was an issue with {} sign-up. Would you like to try the manual setup instead?",
                provider.label()
            )]
        }),
        fallback: "name",
    }
}

fn assemble(data: &CollectedData) -> Result<Candidate, FlowError> {
    let name = person(data).ok_or_else(|| FlowError::MissingField {
        field: "name".to_string(),
    })?;
    let password = data
        .secret("password")
        .ok_or_else(|| FlowError::MissingField {
            field: "password".to_string(),
        })?;
    Ok(Candidate::Account(NewAccount {
        first_name: name.first,
        last_name: name.last,
        email: data.require_text("email")?.to_string(),
        password: SecretString::from(password.expose_secret().to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::flow::{FlowEngine, FlowEvent, Submission};

    fn settle(engine: &mut FlowEngine, mut now: Duration) -> Duration {
        engine.tick(now);
        while let Some(due) = engine.next_deadline() {
            now = now.max(due);
            engine.tick(now);
        }
        now
    }

    fn engine() -> (FlowEngine, Duration) {
        let mut engine = FlowEngine::new(Arc::new(flow(TimingConfig::instant()).unwrap()));
        engine.start(Duration::ZERO).unwrap();
        let now = settle(&mut engine, Duration::ZERO);
        (engine, now)
    }

    #[test]
    fn greets_then_asks_for_a_name() {
        let (engine, _) = engine();
        let texts = engine.messages().assistant_texts();
        assert_eq!(texts.len(), 3);
        assert!(texts[0].starts_with("Hello there! 👋 I'm uMELI"));
        assert_eq!(
            texts[2],
            "What should I call you? Could you share your first and last name?"
        );
        assert_eq!(engine.current_step_id(), Some("name"));
    }

    #[test]
    fn email_scenario() {
        let (mut engine, now) = engine();
        engine.submit_free_text("Jane Doe", now).unwrap();
        let now = settle(&mut engine, now);
        assert!(
            engine
                .messages()
                .assistant_texts()
                .contains(&"Nice to meet you, Jane! Jane Doe - I'll remember that.")
        );

        let before = engine.messages().assistant_texts().len();
        let result = engine.submit_free_text("not-an-email", now).unwrap();
        assert!(matches!(result, Submission::Rejected(_)));
        let now = settle(&mut engine, now);
        assert!(!engine.data().contains("email"));
        assert_eq!(engine.messages().assistant_texts().len(), before + 1);
        assert_eq!(
            engine.messages().assistant_texts().last().copied(),
            Some("Hmm, that doesn't look like a valid email address. Could you double-check and try again?")
        );

        let result = engine.submit_free_text("user@example.com", now).unwrap();
        assert_eq!(result, Submission::Accepted { next: Some("password") });
        assert_eq!(engine.data().text("email"), Some("user@example.com"));
    }

    #[test]
    fn summary_and_candidate() {
        let (mut engine, mut now) = engine();
        for answer in ["Jane", "jane@example.com", "password123"] {
            engine.submit_free_text(answer, now).unwrap();
            now = settle(&mut engine, now);
        }
        assert_eq!(engine.current_step_id(), Some("confirmation"));
        let summary = engine.messages().assistant_texts().last().copied().unwrap();
        assert!(summary.starts_with("✓ Name: Jane\n✓ Email: jane@example.com"));
        assert!(!summary.contains("password123"));

        match engine.begin_submit(now).unwrap() {
            Some(Candidate::Account(account)) => {
                assert_eq!(account.first_name, "Jane");
                assert!(account.last_name.is_none());
                assert_eq!(account.password.expose_secret(), "password123");
            }
            other => panic!("expected account candidate, got {other:?}"),
        }
    }

    #[test]
    fn failed_provider_falls_back_to_manual_entry() {
        let (mut engine, now) = engine();
        engine.begin_sign_in(Provider::Google, now).unwrap();
        engine.finish_sign_in(Err("denied".into()), now).unwrap();
        let events = engine.tick(now + Duration::from_secs(1));
        assert!(events.contains(&FlowEvent::Error(
            "google authentication failed. Please try again.".into()
        )));
        let texts = engine.messages().assistant_texts();
        assert!(texts.contains(
            &"Hmm, there was an issue with Google sign-up. Would you like to try the manual setup instead?"
        ));
        assert_eq!(engine.current_step_id(), Some("name"));
    }
}
