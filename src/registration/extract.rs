//! Pulling structured fields out of model output and patient free text.
//!
//! Models asked for JSON still wrap it in prose or markdown fences. We take
//! a fenced block when there is one, otherwise the first balanced object that
//! parses.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::registration::fields::Field;

static CHANGE_TO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:please\s+)?(?:change|update|set|correct)\s+(.+?)\s+to\s+(.+?)\s*$")
        .unwrap()
});

static LABELED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z][A-Za-z _.\-']{0,40}?)\s*[:=]\s*(.+?)\s*$").unwrap());

/// A yes/no the patient put in front of a correction, e.g. "no, phone: ...".
static LEADING_ANSWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:yes|yeah|yep|no|nope)[\s,.!;\-]+").unwrap());

/// Keys under which models tend to nest the actual record.
const WRAPPER_KEYS: [&str; 5] = ["patient", "data", "fields", "registration", "result"];

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("no JSON object found in model output")]
    NotFound,

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Find and parse the JSON object embedded in `text`.
pub fn extract_json_object(text: &str) -> Result<Value, ExtractionError> {
    if let Some(block) = fenced_block(text) {
        let value: Value = serde_json::from_str(block)?;
        return match value {
            Value::Object(_) => Ok(value),
            other => Err(ExtractionError::NotAnObject(kind(&other))),
        };
    }

    first_embedded_object(text).ok_or(ExtractionError::NotFound)
}

/// Contents of the first ```` ``` ```` fence (optionally tagged `json`).
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    let body_start = after_open.find('\n')?;
    let tag = after_open[..body_start].trim();
    if !tag.is_empty() && !tag.eq_ignore_ascii_case("json") {
        return None;
    }
    let body = &after_open[body_start + 1..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// The leftmost balanced `{...}` in `text` that parses as an object.
///
/// One pass over the text: open braces go on a stack and each closing brace
/// yields a candidate span. An enclosing span closes after everything inside
/// it, so the search only ends once the outermost group is closed or the
/// text runs out. String literals and escapes are honoured inside braces.
fn first_embedded_object(text: &str) -> Option<Value> {
    let mut opens: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut best: Option<(usize, Value)> = None;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if !opens.is_empty() => in_string = true,
            '{' => opens.push(i),
            '}' => {
                let Some(start) = opens.pop() else {
                    continue;
                };
                let leftmost = best.as_ref().map_or(true, |(found, _)| start < *found);
                if leftmost {
                    if let Ok(value @ Value::Object(_)) =
                        serde_json::from_str::<Value>(&text[start..=i])
                    {
                        best = Some((start, value));
                    }
                }
                if opens.is_empty() && best.is_some() {
                    break;
                }
            }
            _ => {}
        }
    }

    best.map(|(_, value)| value)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Map a JSON object's keys onto registration fields.
///
/// Unknown keys are ignored; null and blank values are skipped. Split
/// `first_name`/`last_name` keys are joined into a full name when no full
/// name is present.
pub fn fields_from_json(value: &Value) -> Vec<(Field, String)> {
    let Some(mut object) = value.as_object() else {
        return Vec::new();
    };
    if let Some(inner) = unwrap_single(object) {
        object = inner;
    }

    let mut out: Vec<(Field, String)> = Vec::new();
    let mut first_name = None;
    let mut middle_name = None;
    let mut last_name = None;

    for (key, raw) in object {
        let Some(text) = scalar_text(raw) else {
            continue;
        };
        let canonical = crate::registration::fields::canonical_key(key);
        match canonical.as_str() {
            "first name" | "firstname" | "given name" => first_name = Some(text),
            "middle name" | "middlename" => middle_name = Some(text),
            "last name" | "lastname" | "surname" | "family name" => last_name = Some(text),
            _ => {
                if let Some(field) = Field::from_alias(key) {
                    if !out.iter().any(|(f, _)| *f == field) {
                        out.push((field, text));
                    }
                }
            }
        }
    }

    let has_full_name = out.iter().any(|(f, _)| *f == Field::FullName);
    if !has_full_name && (first_name.is_some() || last_name.is_some()) {
        let joined = [first_name, middle_name, last_name]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        out.push((Field::FullName, joined));
    }

    out.sort_by_key(|(field, _)| Field::ALL.iter().position(|f| f == field));
    out
}

fn unwrap_single(object: &Map<String, Value>) -> Option<&Map<String, Value>> {
    let has_direct_field = object
        .iter()
        .any(|(k, v)| Field::from_alias(k).is_some() && scalar_text(v).is_some());
    if has_direct_field {
        return None;
    }
    WRAPPER_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_object))
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let lowered = text.to_ascii_lowercase();
    if text.is_empty() || matches!(lowered.as_str(), "null" | "n/a" | "none" | "unknown") {
        None
    } else {
        Some(text)
    }
}

/// Parse `label: value` / `label = value` segments (split on newlines and
/// `;`) plus a single "change X to Y" instruction.
pub fn parse_labeled_values(text: &str) -> Vec<(Field, String)> {
    let text = LEADING_ANSWER.find(text).map_or(text, |m| &text[m.end()..]);
    if let Some(pair) = parse_change_instruction(text) {
        return vec![pair];
    }

    let mut out: Vec<(Field, String)> = Vec::new();
    for segment in text.split(['\n', ';']) {
        let Some(caps) = LABELED.captures(segment) else {
            continue;
        };
        let Some(field) = Field::from_alias(&caps[1]) else {
            continue;
        };
        let value = caps[2].trim().to_string();
        if value.is_empty() {
            continue;
        }
        match out.iter_mut().find(|(f, _)| *f == field) {
            Some(existing) => existing.1 = value,
            None => out.push((field, value)),
        }
    }
    out
}

fn parse_change_instruction(text: &str) -> Option<(Field, String)> {
    let caps = CHANGE_TO.captures(text.trim())?;
    let field = Field::from_alias(&caps[1])?;
    Some((field, caps[2].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_fenced_json() {
        let text = "Here you go:\n```json\n{\"name\": \"Ada Obi\"}\n```\nLet me know {if} more.";
        assert_eq!(extract_json_object(text).unwrap(), json!({"name": "Ada Obi"}));
    }

    #[test]
    fn bare_fence_is_accepted() {
        let text = "```\n{\"dob\": \"1990-03-12\"}\n```";
        assert_eq!(extract_json_object(text).unwrap(), json!({"dob": "1990-03-12"}));
    }

    #[test]
    fn finds_object_inside_prose() {
        let text = r#"I read the card. {"name": "Ada {Obi}", "note": "quote \" inside"} Thanks!"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["name"], "Ada {Obi}");
        assert_eq!(value["note"], "quote \" inside");
    }

    #[test]
    fn skips_unparseable_braces() {
        let text = r#"Use {placeholders} like this: {"phone": "0803 123 4567"}"#;
        assert_eq!(
            extract_json_object(text).unwrap(),
            json!({"phone": "0803 123 4567"})
        );
    }

    #[test]
    fn object_inside_unclosed_brace_is_found() {
        let text = r#"{ the card says {"name": "Ada Obi"} and then the text stops"#;
        assert_eq!(extract_json_object(text).unwrap(), json!({"name": "Ada Obi"}));

        let text = r#"{ noise {"a": 1} {"b": 2} }"#;
        assert_eq!(extract_json_object(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn brace_floods_are_scanned_in_linear_time() {
        let start = std::time::Instant::now();

        let opens = "{".repeat(100_000);
        assert!(matches!(extract_json_object(&opens), Err(ExtractionError::NotFound)));

        let nested = format!("{}{}", "{".repeat(100_000), "}".repeat(100_000));
        assert_eq!(extract_json_object(&nested).unwrap(), json!({}));

        let unclosed_strings = "{\"".repeat(50_000);
        assert!(extract_json_object(&unclosed_strings).is_err());

        assert!(
            start.elapsed() < std::time::Duration::from_secs(2),
            "took {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn reports_missing_or_wrong_shape() {
        assert!(matches!(
            extract_json_object("I could not read the image."),
            Err(ExtractionError::NotFound)
        ));
        assert!(matches!(
            extract_json_object("```json\n[1, 2]\n```"),
            Err(ExtractionError::NotAnObject("an array"))
        ));
        assert!(matches!(
            extract_json_object("```json\n{broken\n```"),
            Err(ExtractionError::JsonParse(_))
        ));
    }

    #[test]
    fn maps_keys_to_fields_in_order() {
        let value = json!({
            "Phone_Number": "0803 123 4567",
            "Full Name": "Ada Obi",
            "blood_group": "O+",
            "email": null,
            "sex": "F",
            "address": "  "
        });
        assert_eq!(
            fields_from_json(&value),
            vec![
                (Field::FullName, "Ada Obi".to_string()),
                (Field::Gender, "F".to_string()),
                (Field::PhoneNumber, "0803 123 4567".to_string()),
            ]
        );
    }

    #[test]
    fn descends_into_wrapper_and_joins_names() {
        let value = json!({
            "patient": {
                "first_name": "Ada",
                "last_name": "Obi",
                "date_of_birth": "N/A",
                "phone": 8031234567u64
            }
        });
        assert_eq!(
            fields_from_json(&value),
            vec![
                (Field::FullName, "Ada Obi".to_string()),
                (Field::PhoneNumber, "8031234567".to_string()),
            ]
        );
    }

    #[test]
    fn labeled_lines_and_semicolons() {
        let text = "Name: Ada Obi\nDOB = 12/03/1990; phone: 0803 123 4567\nI am new here";
        assert_eq!(
            parse_labeled_values(text),
            vec![
                (Field::FullName, "Ada Obi".to_string()),
                (Field::DateOfBirth, "12/03/1990".to_string()),
                (Field::PhoneNumber, "0803 123 4567".to_string()),
            ]
        );
    }

    #[test]
    fn address_with_commas_stays_whole() {
        let text = "address: 4 Marina Road, Lagos Island, Lagos";
        assert_eq!(
            parse_labeled_values(text),
            vec![(Field::Address, "4 Marina Road, Lagos Island, Lagos".to_string())]
        );
    }

    #[test]
    fn change_instruction() {
        assert_eq!(
            parse_labeled_values("Please change my phone number to 0803 000 1111"),
            vec![(Field::PhoneNumber, "0803 000 1111".to_string())]
        );
        assert_eq!(
            parse_labeled_values("update the dob to 13 March 1990"),
            vec![(Field::DateOfBirth, "13 March 1990".to_string())]
        );
        assert!(parse_labeled_values("change nothing to something").is_empty());
    }

    #[test]
    fn leading_yes_or_no_is_not_part_of_the_label() {
        assert_eq!(
            parse_labeled_values("no, phone: 0803 000 1111"),
            vec![(Field::PhoneNumber, "0803 000 1111".to_string())]
        );
        assert_eq!(
            parse_labeled_values("Nope - change the email to ada@example.com"),
            vec![(Field::Email, "ada@example.com".to_string())]
        );
        assert!(parse_labeled_values("yes but my phone number is wrong").is_empty());
        assert!(parse_labeled_values("no").is_empty());
    }
}
