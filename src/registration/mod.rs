//! Patient registration subsystem.
//!
//! # Data Flow
//! ```text
//! document upload → model OCR output (via /api/chat)
//!     → extract.rs (JSON out of model prose, keys → fields)
//! patient free text
//!     → extract.rs ("label: value", "change X to Y")
//! both
//!     → fields.rs (per-field normalization, dates.rs for birth dates)
//!     → flow.rs (missing-field collection, confirmation, corrections)
//!     → session.rs (per-conversation state keyed by UUID)
//! ```
//!
//! # Design Decisions
//! - Values are normalized on entry; the record only ever holds clean values
//! - The flow is synchronous and pure apart from logging; `today` is injected
//! - Submission hands the confirmed record back to the caller

pub mod dates;
pub mod extract;
pub mod fields;
pub mod flow;
pub mod session;

pub use dates::normalize_date;
pub use extract::{extract_json_object, fields_from_json, parse_labeled_values, ExtractionError};
pub use fields::{normalize_value, Field, FieldError, PatientRecord};
pub use flow::{FlowError, FlowEvent, FlowReply, FlowState, RegistrationFlow};
pub use session::{SessionError, SessionStore};
