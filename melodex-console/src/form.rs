//! Edit forms
//!
//! An edit form is a record's editable fields as strings, pre-populated from
//! the row (or a fresh fetch) and validated before anything is sent.

use melodex_common::{Error, Record, Result};
use serde_json::Value;

/// One editable field on a screen's form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub max_chars: Option<usize>,
    /// Sent as a number when it parses as one
    pub numeric: bool,
}

impl FormField {
    pub const fn text(name: &'static str, label: &'static str) -> Self {
        Self { name, label, required: false, max_chars: None, numeric: false }
    }

    pub const fn required(self) -> Self {
        Self { required: true, ..self }
    }

    pub const fn max(self, chars: usize) -> Self {
        Self { max_chars: Some(chars), ..self }
    }

    pub const fn numeric(self) -> Self {
        Self { numeric: true, ..self }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditForm {
    /// Absent when creating
    pub id: Option<i64>,
    values: Vec<(String, String)>,
}

impl EditForm {
    /// Empty form for a new record
    pub fn blank(fields: &[FormField]) -> Self {
        Self {
            id: None,
            values: fields
                .iter()
                .map(|f| (f.name.to_string(), String::new()))
                .collect(),
        }
    }

    /// Form populated from an existing record; missing fields stay empty
    pub fn from_record(record: &Record, fields: &[FormField]) -> Self {
        Self {
            id: record.id(),
            values: fields
                .iter()
                .map(|f| (f.name.to_string(), record.get_str(f.name).unwrap_or_default()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    /// Check required fields and lengths
    pub fn validate(&self, fields: &[FormField]) -> Result<()> {
        for field in fields {
            let value = self.get(field.name).unwrap_or("").trim();
            if field.required && value.is_empty() {
                return Err(Error::Validation(format!("{} is required", field.label)));
            }
            if let Some(max) = field.max_chars {
                if value.chars().count() > max {
                    return Err(Error::Validation(format!(
                        "{} must be at most {} characters",
                        field.label, max
                    )));
                }
            }
            if field.numeric && !value.is_empty() && value.parse::<i64>().is_err() {
                return Err(Error::Validation(format!("{} must be a number", field.label)));
            }
        }
        Ok(())
    }

    /// Request parameters: the id (when editing) then every declared field
    ///
    /// Fields the screen does not declare are dropped.
    pub fn to_params(&self, fields: &[FormField]) -> Vec<(String, Value)> {
        let mut params = Vec::with_capacity(fields.len() + 1);
        if let Some(id) = self.id {
            params.push(("id".to_string(), Value::from(id)));
        }
        for field in fields {
            let raw = self.get(field.name).unwrap_or("").trim();
            let value = match raw.parse::<i64>() {
                Ok(n) if field.numeric => Value::from(n),
                _ => Value::from(raw),
            };
            params.push((field.name.to_string(), value));
        }
        params
    }
}
