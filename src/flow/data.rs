//! Values gathered while a flow runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::error::FlowError;

/// One collected answer.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Free text as typed (trimmed). Empty for a skipped optional answer.
    Text(String),
    Integer(i64),
    /// The value of the selected option of a single-choice step.
    Choice(String),
    /// Selected option values of a multi-choice step, in option order.
    Choices(Vec<String>),
    /// A sensitive answer. Never echoed or logged.
    Secret(Arc<SecretString>),
}

impl FieldValue {
    pub fn secret(value: impl Into<String>) -> Self {
        Self::Secret(Arc::new(SecretString::from(value.into())))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Choice(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Choice(a), Self::Choice(b)) => a == b,
            (Self::Choices(a), Self::Choices(b)) => a == b,
            (Self::Secret(a), Self::Secret(b)) => a.expose_secret() == b.expose_secret(),
            _ => false,
        }
    }
}

/// Field name → value map owned by a single flow instance.
///
/// Every field is written once, by the step carrying the same id. Reads are
/// open to prompt templates and the completion handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedData {
    fields: BTreeMap<String, FieldValue>,
}

impl CollectedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Text or choice value. Empty text counts as absent.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(FieldValue::as_text)
            .filter(|s| !s.is_empty())
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        match self.get(field) {
            Some(FieldValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// Selected values of a multi-choice field. Empty if unset.
    pub fn choices(&self, field: &str) -> &[String] {
        match self.get(field) {
            Some(FieldValue::Choices(values)) => values.as_slice(),
            _ => &[],
        }
    }

    pub fn secret(&self, field: &str) -> Option<&SecretString> {
        match self.get(field) {
            Some(FieldValue::Secret(s)) => Some(&**s),
            _ => None,
        }
    }

    /// Text value that must be present, for completion handlers.
    pub fn require_text(&self, field: &str) -> Result<&str, FlowError> {
        self.text(field).ok_or_else(|| FlowError::MissingField {
            field: field.to_string(),
        })
    }

    pub fn require_integer(&self, field: &str) -> Result<i64, FlowError> {
        self.integer(field).ok_or_else(|| FlowError::MissingField {
            field: field.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Write a field. Refuses to overwrite.
    pub(crate) fn commit(&mut self, field: &str, value: FieldValue) -> Result<(), FlowError> {
        if self.fields.contains_key(field) {
            return Err(FlowError::FieldAlreadySet {
                field: field.to_string(),
            });
        }
        self.fields.insert(field.to_string(), value);
        Ok(())
    }

    /// Drop everything, for a flow restart.
    pub(crate) fn clear(&mut self) {
        self.fields.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_is_write_once() {
        let mut data = CollectedData::new();
        data.commit("email", FieldValue::Text("a@b.co".into())).unwrap();
        let err = data
            .commit("email", FieldValue::Text("c@d.co".into()))
            .unwrap_err();
        assert_eq!(
            err,
            FlowError::FieldAlreadySet {
                field: "email".into()
            }
        );
        assert_eq!(data.text("email"), Some("a@b.co"));
    }

    #[test]
    fn typed_accessors() {
        let mut data = CollectedData::new();
        data.commit("year", FieldValue::Integer(2020)).unwrap();
        data.commit("style", FieldValue::Choice("casual".into())).unwrap();
        data.commit(
            "traits",
            FieldValue::Choices(vec!["Helpful".into(), "Direct".into()]),
        )
        .unwrap();
        data.commit("nickname", FieldValue::Text(String::new())).unwrap();

        assert_eq!(data.integer("year"), Some(2020));
        assert_eq!(data.text("year"), None);
        assert_eq!(data.text("style"), Some("casual"));
        assert_eq!(data.choices("traits"), ["Helpful", "Direct"]);
        assert!(data.choices("missing").is_empty());
        // Skipped optional text reads as absent but is still recorded.
        assert_eq!(data.text("nickname"), None);
        assert!(data.contains("nickname"));
    }

    #[test]
    fn secrets_compare_but_do_not_print() {
        let a = FieldValue::secret("hunter2hunter2");
        let b = FieldValue::secret("hunter2hunter2");
        assert_eq!(a, b);
        assert!(!format!("{a:?}").contains("hunter2"));
    }

    #[test]
    fn require_reports_missing_field() {
        let data = CollectedData::new();
        assert_eq!(
            data.require_text("make").unwrap_err(),
            FlowError::MissingField {
                field: "make".into()
            }
        );
    }
}
