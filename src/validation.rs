//! Declarative payload validation
//!
//! A `Schema` is a list of `Rule`s. Each rule ties a constraint to one field
//! and may only apply when a sibling field is present, which is how
//! "password is required once oldPassword is given" is expressed.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("email pattern is valid");
}

/// Payload keys understood by the account workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    OldPassword,
    Password,
    ConfirmPassword,
    AvatarId,
    Provider,
}

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::OldPassword => "oldPassword",
            Self::Password => "password",
            Self::ConfirmPassword => "confirmPassword",
            Self::AvatarId => "avatarId",
            Self::Provider => "provider",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Value must be a string.
    Text,
    /// Value must be a syntactically valid email address.
    Email,
    /// String of at least this many characters.
    MinLength(usize),
    /// Field must be present and hold a non-empty string.
    Required,
    /// Value must equal the value of another field.
    Matches(Field),
    /// UUID string, or `null` to clear the reference.
    Reference,
    /// Value must be a boolean.
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    Present(Field),
}

impl Condition {
    fn holds(self, payload: &Map<String, Value>) -> bool {
        match self {
            Self::Always => true,
            Self::Present(field) => is_present(payload, field),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub field: Field,
    pub when: Condition,
    pub constraint: Constraint,
}

impl Rule {
    pub fn new(field: Field, constraint: Constraint) -> Self {
        Self {
            field,
            when: Condition::Always,
            constraint,
        }
    }

    /// Only enforce this rule when `sibling` is present.
    pub fn when_present(mut self, sibling: Field) -> Self {
        self.when = Condition::Present(sibling);
        self
    }

    fn check(&self, payload: &Map<String, Value>) -> bool {
        if !self.when.holds(payload) {
            return true;
        }

        let value = match payload.get(self.field.key()) {
            Some(value) => value,
            // Absence only fails an explicit requirement
            None => return self.constraint != Constraint::Required,
        };

        match self.constraint {
            Constraint::Text => value.is_string(),
            Constraint::Email => value.as_str().map_or(false, |s| EMAIL_RE.is_match(s)),
            Constraint::MinLength(min) => value.as_str().map_or(false, |s| s.chars().count() >= min),
            Constraint::Required => value.as_str().map_or(false, |s| !s.is_empty()),
            Constraint::Matches(other) => payload.get(other.key()) == Some(value),
            Constraint::Reference => {
                value.is_null() || value.as_str().map_or(false, |s| Uuid::parse_str(s).is_ok())
            }
            Constraint::Flag => value.is_boolean(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("payload must be a JSON object")]
    NotAnObject,
    #[error("field `{field}` failed {constraint:?}")]
    Field { field: Field, constraint: Constraint },
}

/// An ordered rule set; the first failing rule is reported.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    rules: Vec<Rule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Rules for registering a new account.
    pub fn create_account() -> Self {
        Self::new()
            .rule(Rule::new(Field::Name, Constraint::Required))
            .rule(Rule::new(Field::Email, Constraint::Required))
            .rule(Rule::new(Field::Email, Constraint::Email))
            .rule(Rule::new(Field::Password, Constraint::Required))
            .rule(Rule::new(Field::Password, Constraint::MinLength(6)))
            .rule(Rule::new(Field::Provider, Constraint::Flag))
            .rule(Rule::new(Field::AvatarId, Constraint::Reference))
    }

    /// Rules for a partial profile update.
    pub fn update_account() -> Self {
        Self::new()
            .rule(Rule::new(Field::Name, Constraint::Text))
            .rule(Rule::new(Field::Email, Constraint::Email))
            .rule(Rule::new(Field::OldPassword, Constraint::MinLength(6)))
            .rule(Rule::new(Field::Password, Constraint::MinLength(6)))
            .rule(Rule::new(Field::Password, Constraint::Required).when_present(Field::OldPassword))
            // No password change without proving the current one
            .rule(Rule::new(Field::OldPassword, Constraint::Required).when_present(Field::Password))
            .rule(Rule::new(Field::ConfirmPassword, Constraint::Required).when_present(Field::Password))
            .rule(
                Rule::new(Field::ConfirmPassword, Constraint::Matches(Field::Password))
                    .when_present(Field::Password),
            )
            .rule(Rule::new(Field::AvatarId, Constraint::Reference))
    }

    pub fn validate(&self, payload: &Value) -> Result<(), ValidationError> {
        let payload = payload.as_object().ok_or(ValidationError::NotAnObject)?;

        match self.rules.iter().find(|rule| !rule.check(payload)) {
            Some(rule) => Err(ValidationError::Field {
                field: rule.field,
                constraint: rule.constraint,
            }),
            None => Ok(()),
        }
    }
}

/// A key counts as present when it exists and is not `null`.
fn is_present(payload: &Map<String, Value>, field: Field) -> bool {
    payload.get(field.key()).map_or(false, |v| !v.is_null())
}
