//! User, vehicle and assistant-preference records, plus the option catalogs
//! the flows offer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A uMODA account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_preferences: Option<AIPreferences>,
}

impl User {
    /// A fresh user created at the Unix epoch. Backends set real timestamps.
    pub fn new(
        id: Uuid,
        email: impl Into<String>,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            first_name,
            last_name,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            ai_preferences: None,
        }
    }

    /// First name, or empty if the account has none.
    pub fn first_name_or_empty(&self) -> &str {
        self.first_name.as_deref().unwrap_or("")
    }

    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transmission {
    Automatic,
    Manual,
    #[serde(rename = "CVT")]
    Cvt,
}

impl std::fmt::Display for Transmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Automatic => write!(f, "Automatic"),
            Self::Manual => write!(f, "Manual"),
            Self::Cvt => write!(f, "CVT"),
        }
    }
}

impl std::str::FromStr for Transmission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "automatic" => Ok(Self::Automatic),
            "manual" => Ok(Self::Manual),
            "cvt" => Ok(Self::Cvt),
            other => Err(format!("unknown transmission: {other}")),
        }
    }
}

/// A vehicle registered to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<Transmission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// "2020 Toyota Camry".
    pub fn title(&self) -> String {
        format!("{} {} {}", self.year, self.make, self.model)
    }

    /// The nickname if there is one, otherwise the title.
    pub fn display_name(&self) -> String {
        self.nickname.clone().unwrap_or_else(|| self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationStyle {
    Formal,
    Casual,
    #[default]
    Friendly,
}

impl CommunicationStyle {
    pub const ALL: [Self; 3] = [Self::Formal, Self::Casual, Self::Friendly];

    pub fn value(&self) -> &'static str {
        match self {
            Self::Formal => "formal",
            Self::Casual => "casual",
            Self::Friendly => "friendly",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Formal => "Professional & Formal",
            Self::Casual => "Casual & Relaxed",
            Self::Friendly => "Warm & Friendly",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Formal => "Clear, precise, and business-like communication",
            Self::Casual => "Conversational and approachable tone",
            Self::Friendly => "Enthusiastic and personable interactions",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.value() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseLength {
    Brief,
    #[default]
    Detailed,
    Comprehensive,
}

impl ResponseLength {
    pub const ALL: [Self; 3] = [Self::Brief, Self::Detailed, Self::Comprehensive];

    pub fn value(&self) -> &'static str {
        match self {
            Self::Brief => "brief",
            Self::Detailed => "detailed",
            Self::Comprehensive => "comprehensive",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Brief => "Brief & To-the-Point",
            Self::Detailed => "Detailed & Informative",
            Self::Comprehensive => "Comprehensive & Educational",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Brief => "Quick answers and short explanations",
            Self::Detailed => "Thorough explanations with context",
            Self::Comprehensive => "In-depth responses with background information",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.value() == value)
    }
}

/// Which kinds of proactive messages the assistant may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub maintenance: bool,
    pub tips: bool,
    pub recalls: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            maintenance: true,
            tips: true,
            recalls: true,
        }
    }
}

impl NotificationPreferences {
    pub fn enabled_count(&self) -> usize {
        [self.maintenance, self.tips, self.recalls]
            .into_iter()
            .filter(|on| *on)
            .count()
    }
}

/// How the assistant should talk to this user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AIPreferences {
    pub communication_style: CommunicationStyle,
    pub response_length: ResponseLength,
    pub personality_traits: Vec<String>,
    pub focus_areas: Vec<String>,
    pub notification_preferences: NotificationPreferences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_name: Option<String>,
}

/// A make and some of its popular models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarMake {
    pub name: &'static str,
    pub models: &'static [&'static str],
}

pub const CAR_MAKES: &[CarMake] = &[
    CarMake {
        name: "Toyota",
        models: &["Camry", "Corolla", "RAV4", "Highlander", "Prius", "Sienna", "Tacoma", "Tundra"],
    },
    CarMake {
        name: "Honda",
        models: &["Accord", "Civic", "CR-V", "Pilot", "Odyssey", "Ridgeline", "Passport", "HR-V"],
    },
    CarMake {
        name: "Ford",
        models: &["F-150", "Escape", "Explorer", "Mustang", "Edge", "Expedition", "Ranger", "Bronco"],
    },
    CarMake {
        name: "Chevrolet",
        models: &[
            "Silverado", "Equinox", "Tahoe", "Malibu", "Traverse", "Suburban", "Colorado", "Camaro",
        ],
    },
    CarMake {
        name: "Nissan",
        models: &["Altima", "Sentra", "Rogue", "Pathfinder", "Titan", "Frontier", "Murano", "Armada"],
    },
    CarMake {
        name: "BMW",
        models: &["3 Series", "5 Series", "X3", "X5", "X1", "7 Series", "X7", "i4"],
    },
    CarMake {
        name: "Mercedes-Benz",
        models: &["C-Class", "E-Class", "GLC", "GLE", "A-Class", "S-Class", "GLS", "EQS"],
    },
    CarMake {
        name: "Audi",
        models: &["A4", "A6", "Q5", "Q7", "A3", "Q3", "A8", "e-tron"],
    },
];

pub const VEHICLE_COLORS: &[&str] = &[
    "White", "Black", "Silver", "Gray", "Red", "Blue", "Green", "Brown", "Beige", "Gold", "Orange",
    "Yellow",
];

pub const PERSONALITY_TRAITS: &[&str] = &[
    "Helpful",
    "Patient",
    "Encouraging",
    "Analytical",
    "Proactive",
    "Empathetic",
    "Direct",
    "Supportive",
];

pub const FOCUS_AREAS: &[&str] = &[
    "Maintenance & Care",
    "Performance Optimization",
    "Safety & Recalls",
    "Cost Savings",
    "Environmental Impact",
    "Technology Features",
    "Troubleshooting",
    "Upgrades & Modifications",
];

/// Find a catalog make by case-insensitive substring match in either
/// direction, so "toyota", "Toy" and "my Toyota" all resolve to Toyota.
pub fn find_make(input: &str) -> Option<&'static CarMake> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    CAR_MAKES.iter().find(|make| {
        let name = make.name.to_lowercase();
        name.contains(&needle) || needle.contains(&name)
    })
}

/// Thousands separators: 45000 → "45,000".
pub fn format_thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Upper-case the first character: "casual" → "Casual".
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_make_matches_both_directions() {
        assert_eq!(find_make("toyota").map(|m| m.name), Some("Toyota"));
        assert_eq!(find_make("Merc").map(|m| m.name), Some("Mercedes-Benz"));
        assert_eq!(find_make("my honda civic").map(|m| m.name), Some("Honda"));
        assert!(find_make("Rivian").is_none());
        assert!(find_make("  ").is_none());
    }

    #[test]
    fn formats_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(45_000), "45,000");
        assert_eq!(format_thousands(999_999), "999,999");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn preference_defaults() {
        let prefs = AIPreferences::default();
        assert_eq!(prefs.communication_style, CommunicationStyle::Friendly);
        assert_eq!(prefs.response_length, ResponseLength::Detailed);
        assert_eq!(prefs.notification_preferences.enabled_count(), 3);
        assert!(prefs.personality_traits.is_empty());
    }

    #[test]
    fn style_values_roundtrip_through_serde_names() {
        for style in CommunicationStyle::ALL {
            let json = serde_json::to_string(&style).unwrap();
            assert_eq!(json, format!("\"{}\"", style.value()));
            assert_eq!(CommunicationStyle::from_value(style.value()), Some(style));
        }
        assert_eq!(ResponseLength::from_value("brief"), Some(ResponseLength::Brief));
        assert_eq!(ResponseLength::from_value("long"), None);
    }

    #[test]
    fn transmission_serializes_like_the_catalog() {
        assert_eq!(serde_json::to_string(&Transmission::Cvt).unwrap(), "\"CVT\"");
        assert_eq!("manual".parse::<Transmission>().unwrap(), Transmission::Manual);
        assert!("hybrid".parse::<Transmission>().is_err());
    }

    #[test]
    fn vehicle_display_name_prefers_nickname() {
        let mut vehicle = Vehicle {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            make: "Toyota".into(),
            model: "Camry".into(),
            year: 2020,
            vin: None,
            color: None,
            trim: None,
            engine: None,
            transmission: None,
            mileage: None,
            nickname: None,
            is_default: true,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        };
        assert_eq!(vehicle.display_name(), "2020 Toyota Camry");
        vehicle.nickname = Some("Betsy".into());
        assert_eq!(vehicle.display_name(), "Betsy");
    }

    #[test]
    fn user_names() {
        let user = User::new(Uuid::nil(), "a@b.co", Some("Jane".into()), Some("Doe".into()));
        assert_eq!(user.full_name(), "Jane Doe");
        let anon = User::new(Uuid::nil(), "a@b.co", None, None);
        assert_eq!(anon.first_name_or_empty(), "");
    }
}
