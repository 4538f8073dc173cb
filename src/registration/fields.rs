//! Registration fields, the patient record, and per-field normalization.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::registration::dates::normalize_date;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").unwrap()
});

/// A piece of registration information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FullName,
    DateOfBirth,
    Gender,
    PhoneNumber,
    Email,
    Address,
}

impl Field {
    /// All fields in collection and display order.
    pub const ALL: [Field; 6] = [
        Field::FullName,
        Field::DateOfBirth,
        Field::Gender,
        Field::PhoneNumber,
        Field::Email,
        Field::Address,
    ];

    /// Fields a registration cannot be confirmed without.
    pub const REQUIRED: [Field; 4] = [
        Field::FullName,
        Field::DateOfBirth,
        Field::Gender,
        Field::PhoneNumber,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::FullName => "Full name",
            Field::DateOfBirth => "Date of birth",
            Field::Gender => "Gender",
            Field::PhoneNumber => "Phone number",
            Field::Email => "Email",
            Field::Address => "Address",
        }
    }

    /// Question asked when this field is missing.
    pub fn question(self) -> &'static str {
        match self {
            Field::FullName => "What is the patient's full name?",
            Field::DateOfBirth => "What is the patient's date of birth? (e.g. 12/03/1990)",
            Field::Gender => "What is the patient's gender? (male, female or other)",
            Field::PhoneNumber => "What phone number can we reach the patient on?",
            Field::Email => "What is the patient's email address?",
            Field::Address => "What is the patient's home address?",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::FullName => &["full name", "fullname", "name", "patient name", "patient"],
            Field::DateOfBirth => &[
                "date of birth",
                "dob",
                "birth date",
                "birthdate",
                "birthday",
                "born",
                "d o b",
            ],
            Field::Gender => &["gender", "sex"],
            Field::PhoneNumber => &[
                "phone number",
                "phone",
                "phone no",
                "mobile",
                "mobile number",
                "telephone",
                "tel",
                "contact number",
            ],
            Field::Email => &["email", "e mail", "email address", "mail"],
            Field::Address => &["address", "home address", "residential address", "residence"],
        }
    }

    /// Resolve a free-text label or JSON key to a field.
    ///
    /// Case, surrounding punctuation, `_` and `-` are ignored.
    pub fn from_alias(raw: &str) -> Option<Field> {
        let key = canonical_key(raw);
        if key.is_empty() {
            return None;
        }
        Field::ALL
            .into_iter()
            .find(|field| field.aliases().iter().any(|alias| *alias == key))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lowercase, map `_`/`-`/`.` to spaces, collapse whitespace, and drop a
/// leading possessive like "my" or "the".
pub(crate) fn canonical_key(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|c| match c {
            '_' | '-' | '.' => ' ',
            other => other.to_ascii_lowercase(),
        })
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let words: Vec<&str> = mapped.split_whitespace().collect();
    let words = match words.first() {
        Some(&"my") | Some(&"the") | Some(&"patients") if words.len() > 1 => {
            &words[1..]
        }
        _ => &words[..],
    };
    words.join(" ")
}

/// Why a value was refused for a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{0} cannot be empty")]
    Empty(Field),

    #[error("that does not look like a name")]
    InvalidName,

    #[error("I could not read that as a date")]
    InvalidDate,

    #[error("the date of birth cannot be in the future")]
    FutureDate,

    #[error("please answer male, female or other")]
    InvalidGender,

    #[error("a phone number needs 7 to 15 digits")]
    InvalidPhone,

    #[error("that does not look like an email address")]
    InvalidEmail,
}

/// Validate and normalize a raw value for `field`.
pub fn normalize_value(field: Field, raw: &str, today: NaiveDate) -> Result<String, FieldError> {
    let trimmed = raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
    if trimmed.is_empty() {
        return Err(FieldError::Empty(field));
    }

    match field {
        Field::FullName => {
            let name = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
            if !name.chars().any(char::is_alphabetic) || name.chars().any(|c| c.is_ascii_digit()) {
                return Err(FieldError::InvalidName);
            }
            Ok(name)
        }
        Field::DateOfBirth => {
            let date = normalize_date(trimmed, today).ok_or(FieldError::InvalidDate)?;
            if date > today {
                return Err(FieldError::FutureDate);
            }
            Ok(date.format("%Y-%m-%d").to_string())
        }
        Field::Gender => {
            let value = match trimmed.to_ascii_lowercase().as_str() {
                "m" | "male" | "man" | "boy" => "male",
                "f" | "female" | "woman" | "girl" => "female",
                "other" | "non-binary" | "nonbinary" | "non binary" | "prefer not to say" => "other",
                _ => return Err(FieldError::InvalidGender),
            };
            Ok(value.to_string())
        }
        Field::PhoneNumber => normalize_phone(trimmed),
        Field::Email => {
            if EMAIL.is_match(trimmed) {
                Ok(trimmed.to_ascii_lowercase())
            } else {
                Err(FieldError::InvalidEmail)
            }
        }
        Field::Address => Ok(trimmed.split_whitespace().collect::<Vec<_>>().join(" ")),
    }
}

fn normalize_phone(raw: &str) -> Result<String, FieldError> {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        match c {
            '+' if i == 0 => out.push('+'),
            d if d.is_ascii_digit() => out.push(d),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return Err(FieldError::InvalidPhone),
        }
    }
    let digits = out.chars().filter(char::is_ascii_digit).count();
    if (7..=15).contains(&digits) {
        Ok(out)
    } else {
        Err(FieldError::InvalidPhone)
    }
}

/// Registration information gathered so far. Values are stored normalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatientRecord {
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl PatientRecord {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Store an already-normalized value.
    pub fn set(&mut self, field: Field, value: String) {
        *self.slot_mut(field) = Some(value);
    }

    /// Normalize `raw` and store it.
    pub fn apply(&mut self, field: Field, raw: &str, today: NaiveDate) -> Result<(), FieldError> {
        let value = normalize_value(field, raw, today)?;
        self.set(field, value);
        Ok(())
    }

    /// Unset required fields, in collection order.
    pub fn missing_required(&self) -> Vec<Field> {
        Field::REQUIRED
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    /// Fields currently holding a value.
    pub fn present_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_some())
            .collect()
    }

    /// Human-readable listing used for confirmation.
    pub fn summary(&self) -> String {
        Field::ALL
            .iter()
            .map(|f| format!("- {}: {}", f.label(), self.get(*f).unwrap_or("(not provided)")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::FullName => &self.full_name,
            Field::DateOfBirth => &self.date_of_birth,
            Field::Gender => &self.gender,
            Field::PhoneNumber => &self.phone_number,
            Field::Email => &self.email,
            Field::Address => &self.address,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::FullName => &mut self.full_name,
            Field::DateOfBirth => &mut self.date_of_birth,
            Field::Gender => &mut self.gender,
            Field::PhoneNumber => &mut self.phone_number,
            Field::Email => &mut self.email,
            Field::Address => &mut self.address,
        }
    }
}
