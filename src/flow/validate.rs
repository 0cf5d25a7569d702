//! Field validators shared by the conversational flows and the static forms.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_VEHICLE_YEAR: i32 = 1900;
pub const MAX_MILEAGE: u32 = 999_999;

/// Answers that mean "no nickname" in the vehicle flow.
pub const NICKNAME_SKIP_WORDS: &[&str] = &["none", "skip", "no", "nothing", "nope"];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// A person's name split on whitespace: first token, then the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    pub first: String,
    pub last: Option<String>,
}

impl PersonName {
    pub fn full(&self) -> String {
        match &self.last {
            Some(last) => format!("{} {}", self.first, last),
            None => self.first.clone(),
        }
    }
}

/// Non-empty after trimming.
pub fn name(input: &str) -> Result<PersonName, ValidationError> {
    let mut parts = input.split_whitespace();
    let first = parts.next().ok_or(ValidationError::Empty { field: "name" })?;
    let rest: Vec<&str> = parts.collect();
    Ok(PersonName {
        first: first.to_string(),
        last: if rest.is_empty() {
            None
        } else {
            Some(rest.join(" "))
        },
    })
}

/// `local@domain.tld` shape, no whitespace.
pub fn email(input: &str) -> Result<String, ValidationError> {
    let email = input.trim();
    if email.is_empty() {
        return Err(ValidationError::Empty { field: "email" });
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::Malformed {
            field: "email",
            reason: "expected local@domain.tld".to_string(),
        });
    }
    Ok(email.to_string())
}

/// At least [`MIN_PASSWORD_LEN`] characters. The input is taken as typed.
pub fn password(input: &str) -> Result<(), ValidationError> {
    if input.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password",
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// A whole number in `[1900, current_year + 1]`.
pub fn vehicle_year(input: &str, current_year: i32) -> Result<i32, ValidationError> {
    let max = current_year + 1;
    let year: i32 = input.trim().parse().map_err(|_| ValidationError::Malformed {
        field: "year",
        reason: format!("not a whole number: {}", input.trim()),
    })?;
    if !(MIN_VEHICLE_YEAR..=max).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: "year",
            min: MIN_VEHICLE_YEAR.into(),
            max: max.into(),
        });
    }
    Ok(year)
}

/// Digits are pulled out of the input ("45,000 miles" reads as 45000) and
/// must form a number in `[0, 999999]`.
pub fn mileage(input: &str) -> Result<u32, ValidationError> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(ValidationError::Malformed {
            field: "mileage",
            reason: "no digits".to_string(),
        });
    }
    let out_of_range = ValidationError::OutOfRange {
        field: "mileage",
        min: 0,
        max: MAX_MILEAGE.into(),
    };
    let value: u64 = digits.parse().map_err(|_| out_of_range.clone())?;
    if value > u64::from(MAX_MILEAGE) {
        return Err(out_of_range);
    }
    Ok(value as u32)
}

/// Whether `input` contains any of `words`, case-insensitively.
///
/// Substring match: "nonetheless" counts as "none". Kept this way until the
/// product side decides on whole-word matching.
pub fn contains_any(input: &str, words: &[&str]) -> bool {
    let lowered = input.to_lowercase();
    words
        .iter()
        .filter(|w| !w.is_empty())
        .any(|w| lowered.contains(&w.to_lowercase()))
}

/// Any value accepted; a skip synonym collapses to the empty string.
pub fn optional_text(input: &str, skip_words: &[&str]) -> String {
    let trimmed = input.trim();
    if contains_any(trimmed, skip_words) {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// A VIN is exactly 17 characters.
pub fn vin(input: &str) -> Result<String, ValidationError> {
    let vin = input.trim();
    if vin.chars().count() != 17 {
        return Err(ValidationError::Malformed {
            field: "vin",
            reason: "must be exactly 17 characters".to_string(),
        });
    }
    Ok(vin.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_splits_first_and_rest() {
        let n = name("  Jane   van Doe ").unwrap();
        assert_eq!(n.first, "Jane");
        assert_eq!(n.last.as_deref(), Some("van Doe"));
        assert_eq!(n.full(), "Jane van Doe");

        let single = name("Prince").unwrap();
        assert!(single.last.is_none());

        assert_eq!(name("   "), Err(ValidationError::Empty { field: "name" }));
    }

    #[test]
    fn email_shapes() {
        assert_eq!(email(" user@example.com ").unwrap(), "user@example.com");
        assert!(email("not-an-email").is_err());
        assert!(email("a@b").is_err());
        assert!(email("a b@c.de").is_err());
        assert!(email("@c.de").is_err());
        assert!(email("").is_err());
    }

    #[test]
    fn password_length() {
        assert!(password("1234567").is_err());
        assert!(password("12345678").is_ok());
        // Counted in characters, not bytes.
        assert!(password("ééééééé").is_err());
    }

    #[test]
    fn year_bounds() {
        assert_eq!(vehicle_year("2020", 2025), Ok(2020));
        assert_eq!(vehicle_year("1900", 2025), Ok(1900));
        assert_eq!(vehicle_year("2026", 2025), Ok(2026));
        assert!(vehicle_year("1899", 2025).is_err());
        assert!(vehicle_year("2027", 2025).is_err());
        assert!(vehicle_year("twenty", 2025).is_err());
    }

    #[test]
    fn mileage_extracts_digits() {
        assert_eq!(mileage("45,000 miles"), Ok(45_000));
        assert_eq!(mileage("0"), Ok(0));
        assert_eq!(mileage("999999"), Ok(999_999));
        assert!(mileage("1000000").is_err());
        assert!(mileage("lots").is_err());
        assert!(mileage("99999999999999999999999").is_err());
    }

    #[test]
    fn skip_words_use_substring_matching() {
        assert_eq!(optional_text("Lightning", NICKNAME_SKIP_WORDS), "Lightning");
        assert_eq!(optional_text("skip", NICKNAME_SKIP_WORDS), "");
        assert_eq!(optional_text("Nope!", NICKNAME_SKIP_WORDS), "");
        // Known quirk of substring matching.
        assert!(contains_any("nonetheless", NICKNAME_SKIP_WORDS));
        assert!(contains_any("Snowball", NICKNAME_SKIP_WORDS));
    }

    #[test]
    fn vin_length() {
        assert_eq!(vin("1hgcm82633a004352").unwrap(), "1HGCM82633A004352");
        assert!(vin("SHORT").is_err());
    }
}
