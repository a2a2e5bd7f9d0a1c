//! Movie schema.
//!
//! One rule table drives both full validation (create) and partial
//! validation (update delta). A rule names the field, how it behaves when the
//! field is missing from a full record, and the check applied whenever the
//! field is present. Checks never coerce: `"2000"` is not a year.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::model::{MovieDraft, PartialMovie, MAX_RATE, MAX_YEAR, MIN_YEAR};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    InvalidType,
    TooSmall,
    TooBig,
    InvalidString,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A single violated constraint.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Issue {
    pub code: IssueCode,
    pub path: Vec<PathSegment>,
    pub message: String,
}

impl Issue {
    fn new(code: IssueCode, path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self { code, path, message: message.into() }
    }

    /// The first path segment, if it names a field.
    pub fn field(&self) -> Option<&str> {
        match self.path.first() {
            Some(PathSegment::Key(key)) => Some(key),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid movie: {}", summarize(.issues))]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

fn summarize(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|i| match i.field() {
            Some(field) => format!("{}: {}", field, i.message),
            None => i.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    Partial,
}

enum Presence {
    /// Missing field is an issue carrying this message
    Required(&'static str),
    /// Missing field takes this value
    Defaulted(fn() -> Value),
}

type Check = fn(&'static str, &Value) -> Result<Value, Vec<Issue>>;

struct FieldRule {
    field: &'static str,
    presence: Presence,
    check: Check,
}

const MOVIE_RULES: &[FieldRule] = &[
    FieldRule { field: "title", presence: Presence::Required("Movie title is required"), check: check_title },
    FieldRule { field: "year", presence: Presence::Required("Required"), check: check_year },
    FieldRule { field: "director", presence: Presence::Required("Required"), check: check_director },
    FieldRule { field: "duration", presence: Presence::Required("Required"), check: check_duration },
    FieldRule { field: "rate", presence: Presence::Defaulted(default_rate), check: check_rate },
    FieldRule { field: "poster", presence: Presence::Required("Required"), check: check_poster },
    FieldRule { field: "genre", presence: Presence::Required("Required"), check: check_genre },
];

/// Validates a complete movie (no id). `rate` defaults to 0.
pub fn validate_full(input: &Value) -> Result<MovieDraft, ValidationError> {
    let accepted = validate(input, Mode::Full)?;
    decode(accepted)
}

/// Validates an update delta. Every field is optional; `{}` is valid.
pub fn validate_partial(input: &Value) -> Result<PartialMovie, ValidationError> {
    let accepted = validate(input, Mode::Partial)?;
    decode(accepted)
}

fn validate(input: &Value, mode: Mode) -> Result<Map<String, Value>, ValidationError> {
    let object = match input {
        Value::Object(map) => map,
        other => {
            return Err(ValidationError {
                issues: vec![invalid_type(Vec::new(), "object", other)],
            })
        }
    };

    let mut issues = Vec::new();
    let mut accepted = Map::new();

    for rule in MOVIE_RULES {
        match object.get(rule.field) {
            Some(value) => match (rule.check)(rule.field, value) {
                Ok(normalized) => {
                    accepted.insert(rule.field.to_string(), normalized);
                }
                Err(mut found) => issues.append(&mut found),
            },
            None => match (mode, &rule.presence) {
                (Mode::Partial, _) => {}
                (Mode::Full, Presence::Required(message)) => {
                    issues.push(Issue::new(IssueCode::InvalidType, at(rule.field), *message));
                }
                (Mode::Full, Presence::Defaulted(default)) => {
                    accepted.insert(rule.field.to_string(), default());
                }
            },
        }
    }

    if issues.is_empty() {
        Ok(accepted)
    } else {
        Err(ValidationError { issues })
    }
}

fn decode<T: serde::de::DeserializeOwned>(accepted: Map<String, Value>) -> Result<T, ValidationError> {
    serde_json::from_value(Value::Object(accepted)).map_err(|e| ValidationError {
        issues: vec![Issue::new(IssueCode::InvalidType, Vec::new(), e.to_string())],
    })
}

// --- FIELD CHECKS ---

fn check_title(field: &'static str, value: &Value) -> Result<Value, Vec<Issue>> {
    match value {
        Value::String(s) if s.is_empty() => Err(vec![Issue::new(
            IssueCode::TooSmall,
            at(field),
            "Movie title must not be empty",
        )]),
        Value::String(_) => Ok(value.clone()),
        _ => Err(vec![Issue::new(IssueCode::InvalidType, at(field), "Movie title must be a string")]),
    }
}

fn check_director(field: &'static str, value: &Value) -> Result<Value, Vec<Issue>> {
    expect_string(at(field), value).map(|_| value.clone()).map_err(|i| vec![i])
}

fn check_year(field: &'static str, value: &Value) -> Result<Value, Vec<Issue>> {
    integer_in(field, value, i64::from(MIN_YEAR), i64::from(MAX_YEAR))
}

fn check_duration(field: &'static str, value: &Value) -> Result<Value, Vec<Issue>> {
    integer_in(field, value, 1, i64::from(u32::MAX))
}

fn default_rate() -> Value {
    Value::from(0)
}

fn check_rate(field: &'static str, value: &Value) -> Result<Value, Vec<Issue>> {
    let n = match value.as_f64() {
        Some(n) => n,
        None => return Err(vec![invalid_type(at(field), "number", value)]),
    };
    if n < 0.0 {
        return Err(vec![too_small(field, 0)]);
    }
    if n > MAX_RATE {
        return Err(vec![too_big(field, MAX_RATE)]);
    }
    Ok(value.clone())
}

fn check_poster(field: &'static str, value: &Value) -> Result<Value, Vec<Issue>> {
    let raw = expect_string(at(field), value).map_err(|i| vec![i])?;
    match Url::parse(raw) {
        Ok(_) => Ok(value.clone()),
        Err(_) => Err(vec![Issue::new(IssueCode::InvalidString, at(field), "Poster must be an url")]),
    }
}

fn check_genre(field: &'static str, value: &Value) -> Result<Value, Vec<Issue>> {
    let tags = match value {
        Value::Array(tags) => tags,
        other => return Err(vec![invalid_type(at(field), "array", other)]),
    };

    let mut issues = Vec::new();
    for (index, tag) in tags.iter().enumerate() {
        let path = vec![PathSegment::Key(field.to_string()), PathSegment::Index(index)];
        match tag {
            Value::String(s) if s.is_empty() => issues.push(Issue::new(
                IssueCode::TooSmall,
                path,
                "String must contain at least 1 character(s)",
            )),
            Value::String(_) => {}
            other => issues.push(invalid_type(path, "string", other)),
        }
    }

    if issues.is_empty() { Ok(value.clone()) } else { Err(issues) }
}

// --- HELPERS ---

fn at(field: &str) -> Vec<PathSegment> {
    vec![PathSegment::Key(field.to_string())]
}

fn expect_string(path: Vec<PathSegment>, value: &Value) -> Result<&str, Issue> {
    value.as_str().ok_or_else(|| invalid_type(path, "string", value))
}

/// Accepts integral numbers (including `2000.0`) within `[min, max]` and
/// normalizes them to a JSON integer.
fn integer_in(field: &'static str, value: &Value, min: i64, max: i64) -> Result<Value, Vec<Issue>> {
    let n = match value {
        Value::Number(n) => n,
        other => return Err(vec![invalid_type(at(field), "number", other)]),
    };

    let int = match n.as_i64() {
        Some(i) => i as f64,
        None => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => f,
            _ => {
                return Err(vec![Issue::new(
                    IssueCode::InvalidType,
                    at(field),
                    "Expected integer, received float",
                )])
            }
        },
    };

    if int < min as f64 {
        return Err(vec![too_small(field, min)]);
    }
    if int > max as f64 {
        return Err(vec![too_big(field, max)]);
    }
    Ok(Value::from(int as i64))
}

fn too_small(field: &str, min: impl std::fmt::Display) -> Issue {
    Issue::new(
        IssueCode::TooSmall,
        at(field),
        format!("Number must be greater than or equal to {}", min),
    )
}

fn too_big(field: &str, max: impl std::fmt::Display) -> Issue {
    Issue::new(
        IssueCode::TooBig,
        at(field),
        format!("Number must be less than or equal to {}", max),
    )
}

fn invalid_type(path: Vec<PathSegment>, expected: &str, received: &Value) -> Issue {
    Issue::new(
        IssueCode::InvalidType,
        path,
        format!("Expected {}, received {}", expected, json_type(received)),
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
