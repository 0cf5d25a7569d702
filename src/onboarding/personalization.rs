//! Assistant personalization: preferred name, tone, detail, traits, focus
//! and notifications.

use crate::config::TimingConfig;
use crate::error::{FlowError, ValidationError};
use crate::flow::step::{line, lines};
use crate::flow::validate::contains_any;
use crate::flow::{ChoiceOption, CollectedData, Completion, FieldValue, FlowDefinition, Step};
use crate::store::Candidate;

use super::model::{
    AIPreferences, CommunicationStyle, FOCUS_AREAS, NotificationPreferences, PERSONALITY_TRAITS,
    ResponseLength, User,
};

pub const FLOW_NAME: &str = "personalization";

/// Notification option values, in display order.
pub const MAINTENANCE: &str = "maintenance";
pub const TIPS: &str = "tips";
pub const RECALLS: &str = "recalls";

pub fn flow(user: &User, timing: TimingConfig) -> Result<FlowDefinition, FlowError> {
    let first = user.first_name_or_empty().to_string();

    let mut keep_words = vec![
        "same".to_string(),
        "keep".to_string(),
        "no change".to_string(),
        "that's fine".to_string(),
    ];
    if !first.is_empty() {
        keep_words.push(first.to_lowercase());
    }

    let preferred_name = {
        let first = first.clone();
        move |input: &str, _: &CollectedData| -> Result<FieldValue, ValidationError> {
            let words: Vec<&str> = keep_words.iter().map(String::as_str).collect();
            let name = input.trim();
            let chosen = if contains_any(name, &words) {
                first.clone()
            } else {
                name.to_string()
            };
            Ok(FieldValue::Text(chosen))
        }
    };

    let kept = first.clone();
    let steps = vec![
        Step::say(
            "greeting",
            lines([
                format!("Perfect, {first}! Now let's personalize how I communicate with you. 🧠✨"),
                "I want to make sure I'm helpful in exactly the way you prefer. Think of this as teaching me your communication style!".to_string(),
            ]),
        )
        .then("preferred_name"),
        Step::free_text("preferred_name", preferred_name)
            .prompt(lines([format!(
                "What would you like me to call you? I can stick with {first}, or if you prefer something else like a nickname, just let me know!"
            )]))
            .reply(line(move |data| {
                let name = data.text("preferred_name").unwrap_or_default();
                if name == kept {
                    format!("Got it! I'll keep calling you {kept}. 👍")
                } else {
                    format!("Perfect! I'll call you {name} from now on. Nice to meet you properly! 😊")
                }
            }))
            .then("style"),
        Step::single_choice(
            "style",
            CommunicationStyle::ALL
                .iter()
                .map(|s| ChoiceOption::new(s.value(), s.label()).describe(s.description()))
                .collect(),
        )
        .prompt(lines([
            "Now, how would you like me to communicate with you? I can adapt my style to match what works best for you!",
        ]))
        .reply(line(|data| {
            format!(
                "Excellent choice! I'll be {}.",
                style(data).description().to_lowercase()
            )
        }))
        .then("detail"),
        Step::single_choice(
            "detail",
            ResponseLength::ALL
                .iter()
                .map(|l| ChoiceOption::new(l.value(), l.label()).describe(l.description()))
                .collect(),
        )
        .prompt(lines([
            "How detailed would you like my responses to be? Some people prefer quick answers, others like comprehensive explanations.",
        ]))
        .reply(line(|data| {
            format!(
                "Perfect! I'll provide {}.",
                detail(data).description().to_lowercase()
            )
        }))
        .then("personality"),
        Step::multi_choice(
            "personality",
            PERSONALITY_TRAITS.iter().copied().map(ChoiceOption::plain).collect(),
        )
        .prompt(lines([
            "What personality traits would you like me to have? Pick any that appeal to you - I can be helpful and patient, or maybe more direct and analytical. Choose as many as you like!",
        ]))
        .reply(line(|data| {
            let traits = data.choices("personality");
            if traits.is_empty() {
                return "No specific traits? That's okay! I'll use my default balanced personality. 😊".to_string();
            }
            let more = if traits.len() > 3 {
                format!(" and {} more traits", traits.len() - 3)
            } else {
                String::new()
            };
            format!(
                "Awesome! I'll be {}{more}. I think we'll work great together!",
                first_n(traits, 3, ", ")
            )
        }))
        .then("focus"),
        Step::multi_choice(
            "focus",
            FOCUS_AREAS.iter().copied().map(ChoiceOption::plain).collect(),
        )
        .prompt(lines([
            "What areas should I focus on when helping you? This helps me prioritize the most relevant information for your needs.",
        ]))
        .reply(line(|data| {
            let areas = data.choices("focus");
            if areas.is_empty() {
                return "I'll help with everything equally! General vehicle assistance it is. 🚗".to_string();
            }
            let more = if areas.len() > 2 {
                format!(" plus {} other areas", areas.len() - 2)
            } else {
                String::new()
            };
            format!(
                "Great choices! I'll focus on {}{more}. This will help me give you the most relevant advice!",
                first_n(areas, 2, " and ")
            )
        }))
        .then("notifications"),
        Step::multi_choice(
            "notifications",
            vec![
                ChoiceOption::new(MAINTENANCE, "Maintenance Reminders")
                    .describe("Get notified about upcoming maintenance"),
                ChoiceOption::new(TIPS, "Tips & Recommendations")
                    .describe("Receive helpful tips and suggestions"),
                ChoiceOption::new(RECALLS, "Safety Alerts & Recalls")
                    .describe("Important safety information and recalls"),
            ],
        )
        .preselect([MAINTENANCE, TIPS, RECALLS])
        .prompt(lines([
            "Last thing - what kind of notifications would you like? I can remind you about maintenance, share helpful tips, and alert you to important safety information.",
        ]))
        .reply(line(|data| match notifications(data).enabled_count() {
            0 => "No notifications - I'll only help when you ask! Sometimes less is more. 👌".to_string(),
            3 => "All notifications enabled! I'll keep you fully informed about your vehicle. 📱".to_string(),
            n => format!(
                "Perfect! I'll send you {n} types of notifications to keep you updated without overwhelming you."
            ),
        }))
        .then("confirmation"),
        Step::confirm("confirmation").prompt(line(|data| {
            let traits = data.choices("personality");
            let areas = data.choices("focus");
            let personality = if traits.is_empty() {
                "Balanced".to_string()
            } else {
                first_n(traits, 3, ", ")
            };
            let focus = if areas.is_empty() {
                "General assistance".to_string()
            } else {
                first_n(areas, 2, ", ")
            };
            format!(
                "Excellent! Here's how I'll be helping you:\n\n👤 I'll call you: {}\n💬 Communication: {}\n📝 Response detail: {}\n✨ Personality: {personality}\n🎯 Focus areas: {focus}\n\nReady to save these preferences?",
                data.text("preferred_name").unwrap_or_default(),
                style(data).label(),
                detail(data).label(),
            )
        })),
    ];

    let completion = Completion::new(assemble)
        .saving(lines(["Saving your preferences... This is exciting! 🎉"]))
        .saved(line(|data| {
            format!(
                "🎊 Perfect! Your personalized uMELI experience is ready, {}! I'm so excited to start helping you with your vehicle needs in exactly the way you prefer.",
                data.text("preferred_name").unwrap_or_default()
            )
        }))
        .failed(
            lines([
                "Oops! Something went wrong while saving your preferences. Let's try that again.",
            ]),
            "Preferences could not be saved. Please try again.",
        );

    FlowDefinition::new(FLOW_NAME, steps, timing, completion)
}

fn style(data: &CollectedData) -> CommunicationStyle {
    data.text("style")
        .and_then(CommunicationStyle::from_value)
        .unwrap_or_default()
}

fn detail(data: &CollectedData) -> ResponseLength {
    data.text("detail")
        .and_then(ResponseLength::from_value)
        .unwrap_or_default()
}

fn notifications(data: &CollectedData) -> NotificationPreferences {
    let chosen = data.choices("notifications");
    let on = |value: &str| chosen.iter().any(|c| c == value);
    NotificationPreferences {
        maintenance: on(MAINTENANCE),
        tips: on(TIPS),
        recalls: on(RECALLS),
    }
}

fn first_n(values: &[String], n: usize, separator: &str) -> String {
    values
        .iter()
        .take(n)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(separator)
}

fn assemble(data: &CollectedData) -> Result<Candidate, FlowError> {
    Ok(Candidate::Preferences(AIPreferences {
        communication_style: style(data),
        response_length: detail(data),
        personality_traits: data.choices("personality").to_vec(),
        focus_areas: data.choices("focus").to_vec(),
        notification_preferences: notifications(data),
        preferred_name: data.text("preferred_name").map(str::to_string),
    }))
}
