//! Vehicle setup: make, model, year, color, nickname, mileage.

use chrono::Datelike;

use crate::config::TimingConfig;
use crate::error::FlowError;
use crate::flow::step::{line, lines};
use crate::flow::validate::{self, NICKNAME_SKIP_WORDS};
use crate::flow::{CollectedData, Completion, FieldValue, FlowDefinition, Step};
use crate::store::{Candidate, NewVehicle};

use super::model::{User, find_make, format_thousands};

pub const FLOW_NAME: &str = "vehicle";

/// Vehicle setup for `user`, with model years capped by this calendar year.
pub fn flow(user: &User, timing: TimingConfig) -> Result<FlowDefinition, FlowError> {
    flow_for_year(user, chrono::Local::now().year(), timing)
}

/// Vehicle setup with an explicit current year.
pub fn flow_for_year(
    user: &User,
    current_year: i32,
    timing: TimingConfig,
) -> Result<FlowDefinition, FlowError> {
    let first = user.first_name_or_empty().to_string();
    let user_id = user.id;

    let steps = vec![
        Step::say(
            "greeting",
            lines([
                format!("Great to have you here, {first}! 🚗"),
                "I'd love to learn about your vehicle so I can provide you with personalized maintenance reminders, troubleshooting help, and recommendations specific to your car.".to_string(),
            ]),
        )
        .then("make"),
        Step::free_text("make", |input, _| {
            let make = input.trim();
            let canonical = find_make(make).map_or(make, |m| m.name);
            Ok(FieldValue::Text(canonical.to_string()))
        })
        .prompt(lines([
            "Let's start with the basics - what make is your vehicle? (like Toyota, Honda, Ford, etc.)",
        ]))
        .reply(line(|data| format!("{} - excellent choice! 👍", text(data, "make"))))
        .then("model"),
        Step::free_text("model", |input, _| Ok(FieldValue::Text(input.trim().to_string())))
            .prompt(line(|data| {
                let make = text(data, "make");
                match find_make(make) {
                    Some(known) => format!(
                        "What model {make} do you have? Some popular ones are: {}...",
                        known.models.iter().take(4).copied().collect::<Vec<_>>().join(", ")
                    ),
                    None => format!("What model {make} do you have?"),
                }
            }))
            .reply(line(|data| {
                format!(
                    "Nice! A {} {}. Now, what year is it?",
                    text(data, "make"),
                    text(data, "model")
                )
            }))
            .then("year"),
        Step::free_text("year", move |input, _| {
            let year = validate::vehicle_year(input, current_year)?;
            Ok(FieldValue::Integer(year.into()))
        })
        .prompt(lines(["You can just type the year, like 2020 or 2018."]))
        .retry(lines([
            "Hmm, that doesn't look like a valid year. Could you double-check? For example: 2020",
        ]))
        .reply(line(|data| format!("Perfect! A {}.", title(data))))
        .then("color"),
        Step::free_text("color", |input, _| Ok(FieldValue::Text(input.trim().to_string())))
            .prompt(lines([
                "What color is your vehicle? This helps me identify it better in my recommendations!",
            ]))
            .reply(line(|data| format!("{} - that sounds great! 🎨", text(data, "color"))))
            .then("nickname"),
        Step::free_text("nickname", |input, _| {
            Ok(FieldValue::Text(validate::optional_text(input, NICKNAME_SKIP_WORDS)))
        })
        .prompt(lines([
            "Do you have a nickname for your car? Some people call theirs 'Betsy' or 'Lightning' - it's totally optional but adds a personal touch! If not, just type 'none' or 'skip'.",
        ]))
        .reply(line(|data| match data.text("nickname") {
            Some(nickname) => format!("{nickname} - I love it! That's such a great name. 💚"),
            None => "No problem! We'll keep it formal. 😊".to_string(),
        }))
        .then("mileage"),
        Step::free_text("mileage", |input, _| {
            Ok(FieldValue::Integer(validate::mileage(input)?.into()))
        })
        .prompt(lines([
            "Last question - what's the current mileage? This helps me give you accurate maintenance reminders. Just the number is fine, like 45000.",
        ]))
        .retry(lines([
            "Could you double-check that mileage? Just enter the number like 50000 or 125000.",
        ]))
        .reply(line(|data| format!("Got it! {} miles.", miles(data))))
        .then("confirmation"),
        Step::confirm("confirmation").prompt(line(|data| {
            let nickname = data.text("nickname");
            let nickname_line = nickname
                .map(|n| format!("\n💫 Nickname: {n}"))
                .unwrap_or_default();
            format!(
                "Perfect! Let me confirm what we have:\n\n🚗 Vehicle: {}\n🎨 Color: {}{nickname_line}\n📊 Mileage: {} miles\n\nLooks good? I'll add {} to your profile!",
                title(data),
                text(data, "color"),
                miles(data),
                nickname.unwrap_or("your vehicle")
            )
        })),
    ];

    let completion = Completion::new(move |data: &CollectedData| assemble(user_id, data))
        .saving(lines(["Adding your vehicle to your profile... 🔧"]))
        .saved(line(|data| {
            let name = data
                .text("nickname")
                .map(str::to_string)
                .unwrap_or_else(|| format!("Your {}", title(data)));
            format!(
                "🎉 Awesome! {name} has been added to your profile. Now I can provide you with personalized maintenance schedules, recalls, and troubleshooting help!"
            )
        }))
        .failed(
            lines([
                "Oops! Something went wrong while saving your vehicle. Let's try that again.",
            ]),
            "Vehicle could not be saved. Please try again.",
        );

    FlowDefinition::new(FLOW_NAME, steps, timing, completion)
}

fn text<'a>(data: &'a CollectedData, field: &str) -> &'a str {
    data.text(field).unwrap_or_default()
}

/// "2020 Toyota Camry".
fn title(data: &CollectedData) -> String {
    let year = data.integer("year").map(|y| y.to_string()).unwrap_or_default();
    format!("{year} {} {}", text(data, "make"), text(data, "model"))
}

fn miles(data: &CollectedData) -> String {
    data.integer("mileage")
        .and_then(|m| u32::try_from(m).ok())
        .map(format_thousands)
        .unwrap_or_default()
}

fn assemble(user_id: uuid::Uuid, data: &CollectedData) -> Result<Candidate, FlowError> {
    let year = data.require_integer("year")?;
    let mileage = data
        .integer("mileage")
        .and_then(|m| u32::try_from(m).ok());
    Ok(Candidate::Vehicle(NewVehicle {
        user_id,
        make: data.require_text("make")?.to_string(),
        model: data.require_text("model")?.to_string(),
        year: i32::try_from(year).map_err(|_| FlowError::MissingField {
            field: "year".to_string(),
        })?,
        vin: None,
        color: data.text("color").map(str::to_string),
        trim: None,
        engine: None,
        transmission: None,
        mileage,
        nickname: data.text("nickname").map(str::to_string),
    }))
}
