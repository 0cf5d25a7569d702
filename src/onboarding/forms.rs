//! Static (non-conversational) account and vehicle forms.
//!
//! Every field is checked in one pass and problems come back keyed by field
//! name, ready to show next to each input.

use std::collections::BTreeMap;

use secrecy::SecretString;
use uuid::Uuid;

use crate::flow::validate;
use crate::store::{NewAccount, NewVehicle};

use super::model::Transmission;

/// Per-field error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, String>,
}

impl FormErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn set(&mut self, field: &'static str, message: &str) {
        self.fields.insert(field, message.to_string());
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FormErrors {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    SignUp,
    SignIn,
}

/// Raw account form inputs.
#[derive(Debug, Clone, Default)]
pub struct AccountForm {
    pub mode: FormMode,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl AccountForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();

        if self.email.is_empty() {
            errors.set("email", "Email is required");
        } else if validate::email(&self.email).is_err() {
            errors.set("email", "Please enter a valid email");
        }

        if self.password.is_empty() {
            errors.set("password", "Password is required");
        } else if validate::password(&self.password).is_err() {
            errors.set("password", "Password must be at least 8 characters");
        }

        if self.mode == FormMode::SignUp {
            if self.first_name.trim().is_empty() {
                errors.set("first_name", "First name is required");
            }
            if self.last_name.trim().is_empty() {
                errors.set("last_name", "Last name is required");
            }
            if self.password != self.confirm_password {
                errors.set("confirm_password", "Passwords do not match");
            }
        }

        errors
    }

    /// Validated sign-up details.
    pub fn submit(&self) -> Result<NewAccount, FormErrors> {
        self.validate().into_result(|| NewAccount {
            first_name: self.first_name.trim().to_string(),
            last_name: Some(self.last_name.trim().to_string()).filter(|s| !s.is_empty()),
            email: self.email.trim().to_string(),
            password: SecretString::from(self.password.clone()),
        })
    }
}

/// Raw vehicle form inputs.
#[derive(Debug, Clone, Default)]
pub struct VehicleForm {
    make: String,
    pub model: String,
    pub year: String,
    pub vin: String,
    pub color: String,
    pub trim: String,
    pub engine: String,
    pub transmission: String,
    pub mileage: String,
    pub nickname: String,
}

impl VehicleForm {
    pub fn make(&self) -> &str {
        &self.make
    }

    /// Changing the make clears the model.
    pub fn set_make(&mut self, make: impl Into<String>) {
        self.make = make.into();
        self.model.clear();
    }

    pub fn validate(&self, current_year: i32) -> FormErrors {
        let mut errors = FormErrors::default();

        if self.make.trim().is_empty() {
            errors.set("make", "Vehicle make is required");
        }
        if self.model.trim().is_empty() {
            errors.set("model", "Vehicle model is required");
        }
        if self.year.trim().is_empty() {
            errors.set("year", "Vehicle year is required");
        } else if validate::vehicle_year(&self.year, current_year).is_err() {
            errors.set("year", "Please select a valid year");
        }
        if !self.vin.is_empty() && validate::vin(&self.vin).is_err() {
            errors.set("vin", "VIN must be exactly 17 characters");
        }
        if !self.mileage.is_empty() && self.mileage.trim().parse::<u32>().is_err() {
            errors.set("mileage", "Please enter a valid mileage");
        }
        if !self.transmission.is_empty() && self.transmission.parse::<Transmission>().is_err() {
            errors.set("transmission", "Please select a transmission");
        }

        errors
    }

    /// Validated vehicle details for `user_id`.
    pub fn submit(&self, user_id: Uuid, current_year: i32) -> Result<NewVehicle, FormErrors> {
        let errors = self.validate(current_year);
        if !errors.is_empty() {
            return Err(errors);
        }
        let optional = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(NewVehicle {
            user_id,
            make: self.make.trim().to_string(),
            model: self.model.trim().to_string(),
            year: validate::vehicle_year(&self.year, current_year).unwrap_or_default(),
            vin: optional(&self.vin).and_then(|v| validate::vin(&v).ok()),
            color: optional(&self.color),
            trim: optional(&self.trim),
            engine: optional(&self.engine),
            transmission: self.transmission.parse().ok(),
            mileage: self.mileage.trim().parse().ok(),
            nickname: optional(&self.nickname),
        })
    }
}
