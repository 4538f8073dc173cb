//! Registration conversation state machine.
//!
//! # State Transitions
//! ```text
//! AwaitingDocument ──document / labeled text / "skip"──▶ Collecting(next missing)
//!                                                   └──▶ Confirming (nothing missing)
//! Collecting(f) ──valid value──▶ Collecting(next missing) | Confirming
//! Confirming ──"yes"──▶ Submitted
//! Confirming ──"no"───▶ ChoosingCorrection ──field name──▶ Correcting(f)
//! Confirming / ChoosingCorrection ──"phone: ..."──▶ Confirming
//! Correcting(f) ──valid value──▶ Confirming
//! ```
//!
//! Invalid values never move the machine; the reply repeats the question
//! with the reason. `Submitted` is terminal.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::registration::extract::{extract_json_object, fields_from_json, parse_labeled_values};
use crate::registration::fields::{Field, FieldError, PatientRecord};

/// Where the conversation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "field", rename_all = "snake_case")]
pub enum FlowState {
    AwaitingDocument,
    Collecting(Field),
    Confirming,
    ChoosingCorrection,
    Correcting(Field),
    Submitted,
}

impl FlowState {
    /// Stable name for logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::AwaitingDocument => "awaiting_document",
            FlowState::Collecting(_) => "collecting",
            FlowState::Confirming => "confirming",
            FlowState::ChoosingCorrection => "choosing_correction",
            FlowState::Correcting(_) => "correcting",
            FlowState::Submitted => "submitted",
        }
    }
}

/// Input to the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    /// Raw model output from reading an uploaded document.
    DocumentExtracted(String),
    /// Something the patient typed.
    Message(String),
}

/// What to tell the patient after an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowReply {
    #[serde(flatten)]
    pub state: FlowState,
    pub message: String,
    pub record: PatientRecord,
    pub submitted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("registration has already been submitted")]
    AlreadySubmitted,

    #[error("a document cannot be processed while {0}")]
    UnexpectedDocument(&'static str),

    #[error("message text is empty")]
    EmptyMessage,
}

/// One patient's registration conversation.
#[derive(Debug, Clone)]
pub struct RegistrationFlow {
    state: FlowState,
    record: PatientRecord,
}

impl Default for RegistrationFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationFlow {
    pub fn new() -> Self {
        Self {
            state: FlowState::AwaitingDocument,
            record: PatientRecord::default(),
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn record(&self) -> &PatientRecord {
        &self.record
    }

    /// Opening prompt for a fresh session.
    pub fn greeting(&self) -> FlowReply {
        self.reply(
            "Welcome! To register, upload a photo of the patient's ID or hospital card. \
             You can also type details such as \"Name: Ada Obi\", or type \"skip\" to answer \
             a few questions instead.",
        )
    }

    /// Reply describing the current state without changing it.
    pub fn current_prompt(&self) -> FlowReply {
        match self.state {
            FlowState::AwaitingDocument => self.greeting(),
            FlowState::Collecting(f) | FlowState::Correcting(f) => self.reply(f.question()),
            FlowState::Confirming => self.reply(self.confirmation_text()),
            FlowState::ChoosingCorrection => self.reply(correction_menu()),
            FlowState::Submitted => self.reply("This registration has been submitted."),
        }
    }

    /// Feed one event through the machine.
    pub fn handle(&mut self, event: FlowEvent, today: NaiveDate) -> Result<FlowReply, FlowError> {
        if self.state == FlowState::Submitted {
            return Err(FlowError::AlreadySubmitted);
        }

        match event {
            FlowEvent::DocumentExtracted(text) => self.on_document(&text, today),
            FlowEvent::Message(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(FlowError::EmptyMessage);
                }
                Ok(self.on_message(text, today))
            }
        }
    }

    fn on_document(&mut self, text: &str, today: NaiveDate) -> Result<FlowReply, FlowError> {
        match self.state {
            FlowState::AwaitingDocument | FlowState::Collecting(_) | FlowState::Confirming => {}
            other => return Err(FlowError::UnexpectedDocument(other.name())),
        }

        let pairs = match extract_json_object(text) {
            Ok(value) => fields_from_json(&value),
            Err(e) => {
                tracing::debug!(error = %e, "Document output had no usable JSON");
                Vec::new()
            }
        };

        if pairs.is_empty() {
            let retry = "I couldn't read any registration details from that document. \
                         Please upload a clearer photo, or type the details instead.";
            return Ok(match self.state {
                FlowState::AwaitingDocument => self.reply(retry),
                _ => {
                    let follow_up = self.current_prompt().message;
                    self.reply(format!("{} {}", retry, follow_up))
                }
            });
        }

        let prefix = self.merge(pairs, today);
        Ok(self.advance(prefix))
    }

    fn on_message(&mut self, text: &str, today: NaiveDate) -> FlowReply {
        let labeled = parse_labeled_values(text);

        match self.state {
            FlowState::AwaitingDocument => {
                if !labeled.is_empty() {
                    let prefix = self.merge(labeled, today);
                    self.advance(prefix)
                } else if is_skip(text) {
                    self.advance("No problem, let's go through the details. ".to_string())
                } else {
                    self.reply(
                        "Please upload a photo of the patient's ID or hospital card, \
                         or type \"skip\" to enter the details yourself.",
                    )
                }
            }
            FlowState::Collecting(field) | FlowState::Correcting(field) => {
                if !labeled.is_empty() {
                    let prefix = self.merge(labeled, today);
                    return self.advance(prefix);
                }
                match self.record.apply(field, text, today) {
                    Ok(()) => {
                        let prefix = if matches!(self.state, FlowState::Correcting(_)) {
                            format!("Updated the {}. ", field.label().to_lowercase())
                        } else {
                            String::new()
                        };
                        self.advance(prefix)
                    }
                    Err(e) => self.reply(format!("Sorry, {}. {}", e, field.question())),
                }
            }
            FlowState::Confirming => {
                if !labeled.is_empty() {
                    let prefix = self.merge(labeled, today);
                    self.advance(prefix)
                } else if is_affirmative(text) {
                    self.state = FlowState::Submitted;
                    let mut reply = self.reply(
                        "Thank you! The registration has been submitted. \
                         Our front desk will be in touch shortly.",
                    );
                    reply.submitted = true;
                    reply
                } else if is_negative(text) {
                    self.state = FlowState::ChoosingCorrection;
                    self.reply(correction_menu())
                } else {
                    self.reply(format!(
                        "Please reply \"yes\" to confirm or \"no\" to make a change.\n\n{}",
                        self.confirmation_text()
                    ))
                }
            }
            FlowState::ChoosingCorrection => {
                if !labeled.is_empty() {
                    let prefix = self.merge(labeled, today);
                    self.advance(prefix)
                } else if let Some(field) = Field::from_alias(text) {
                    self.state = FlowState::Correcting(field);
                    self.reply(format!("What should the {} be?", field.label().to_lowercase()))
                } else if is_affirmative(text) || is_cancel(text) {
                    self.state = FlowState::Confirming;
                    self.reply(self.confirmation_text())
                } else {
                    self.reply(format!("Sorry, I didn't catch that. {}", correction_menu()))
                }
            }
            FlowState::Submitted => self.current_prompt(),
        }
    }

    /// Apply extracted pairs; returns a sentence describing what happened.
    fn merge(&mut self, pairs: Vec<(Field, String)>, today: NaiveDate) -> String {
        let mut accepted: Vec<Field> = Vec::new();
        let mut rejected: Vec<(Field, FieldError)> = Vec::new();

        for (field, raw) in pairs {
            match self.record.apply(field, &raw, today) {
                Ok(()) => accepted.push(field),
                Err(e) => rejected.push((field, e)),
            }
        }

        tracing::debug!(accepted = ?accepted, rejected = rejected.len(), "Merged registration values");

        let mut out = String::new();
        if !accepted.is_empty() {
            let labels: Vec<&str> = accepted.iter().map(|f| f.label()).collect();
            out.push_str(&format!("Got it: {}. ", labels.join(", ")));
        }
        for (field, err) in rejected {
            out.push_str(&format!(
                "I couldn't use the {} ({}). ",
                field.label().to_lowercase(),
                err
            ));
        }
        out
    }

    /// Move to the next missing field, or to confirmation.
    fn advance(&mut self, prefix: String) -> FlowReply {
        match self.record.missing_required().first() {
            Some(&field) => {
                self.state = FlowState::Collecting(field);
                self.reply(format!("{}{}", prefix, field.question()))
            }
            None => {
                self.state = FlowState::Confirming;
                self.reply(format!("{}{}", prefix, self.confirmation_text()))
            }
        }
    }

    fn confirmation_text(&self) -> String {
        format!(
            "Please confirm the patient's details:\n{}\nIs everything correct? (yes/no)",
            self.record.summary()
        )
    }

    fn reply(&self, message: impl Into<String>) -> FlowReply {
        FlowReply {
            state: self.state,
            message: message.into(),
            record: self.record.clone(),
            submitted: false,
        }
    }
}

fn correction_menu() -> String {
    let labels: Vec<&str> = Field::ALL.iter().map(|f| f.label()).collect();
    format!(
        "Which detail would you like to change? ({}). You can also type it directly, \
         e.g. \"phone: 0803 123 4567\".",
        labels.join(", ")
    )
}

/// Lowercased, trailing punctuation and commas dropped, whitespace collapsed.
fn normalized_answer(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', '!'])
        .to_lowercase()
        .replace('\u{2019}', "'")
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Only whole answers count; "yes but ..." is not a confirmation.
fn is_affirmative(text: &str) -> bool {
    matches!(
        normalized_answer(text).as_str(),
        "yes" | "y" | "yeah" | "yep" | "yes please" | "correct" | "confirm" | "confirmed" | "ok"
            | "okay" | "that's right" | "thats right" | "that's correct" | "thats correct"
            | "looks good" | "all good" | "submit" | "yes correct" | "yes it is" | "yes it's correct"
            | "yes its correct" | "yes that's right" | "yes thats right" | "yes that's correct"
            | "yes thats correct" | "yes looks good" | "yes all good" | "yes submit"
            | "yes confirm" | "yes please submit"
    )
}

fn is_negative(text: &str) -> bool {
    let answer = normalized_answer(text);
    matches!(
        answer.as_str(),
        "no" | "n" | "nope" | "incorrect" | "wrong" | "not correct" | "change" | "edit"
    ) || answer.starts_with("no ")
}

fn is_skip(text: &str) -> bool {
    let answer = normalized_answer(text);
    matches!(
        answer.as_str(),
        "skip" | "no" | "none" | "manual" | "manually" | "no document" | "i don't have one"
            | "i dont have one" | "type"
    )
}

fn is_cancel(text: &str) -> bool {
    matches!(normalized_answer(text).as_str(), "nothing" | "cancel" | "never mind" | "nevermind")
}
