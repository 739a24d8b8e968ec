use regex::Regex;
use thiserror::Error;

use crate::entity::{Entity, FieldValue};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: Option<&'static str>,
    pub message: String,
}

pub enum Rule<E> {
    Required {
        field: &'static str,
        message: &'static str,
    },
    Positive {
        field: &'static str,
        message: &'static str,
    },
    Pattern {
        field: &'static str,
        pattern: Regex,
        message: &'static str,
    },
    RequiredWhen {
        field: &'static str,
        flag: &'static str,
        message: &'static str,
    },
    Custom {
        field: Option<&'static str>,
        message: &'static str,
        check: fn(&E) -> bool,
    },
}

impl<E: Entity> Rule<E> {
    pub fn required(field: &'static str, message: &'static str) -> Self {
        Self::Required { field, message }
    }

    pub fn positive(field: &'static str, message: &'static str) -> Self {
        Self::Positive { field, message }
    }

    pub fn pattern(field: &'static str, pattern: Regex, message: &'static str) -> Self {
        Self::Pattern {
            field,
            pattern,
            message,
        }
    }

    pub fn required_when(field: &'static str, flag: &'static str, message: &'static str) -> Self {
        Self::RequiredWhen {
            field,
            flag,
            message,
        }
    }

    pub fn custom(field: Option<&'static str>, message: &'static str, check: fn(&E) -> bool) -> Self {
        Self::Custom {
            field,
            message,
            check,
        }
    }

    pub fn check(&self, draft: &E) -> Result<(), ValidationError> {
        let value = |name: &str| draft.field(name).unwrap_or(FieldValue::Empty);
        let (passed, field, message) = match self {
            Self::Required { field, message } => (!value(field).is_empty(), Some(*field), *message),
            Self::Positive { field, message } => (
                value(field).as_number().is_some_and(|n| n > 0.0),
                Some(*field),
                *message,
            ),
            Self::Pattern {
                field,
                pattern,
                message,
            } => {
                let current = value(field);
                let passed = current.is_empty() || pattern.is_match(current.display().trim());
                (passed, Some(*field), *message)
            }
            Self::RequiredWhen {
                field,
                flag,
                message,
            } => {
                let enabled = matches!(value(flag), FieldValue::Flag(true));
                (!enabled || !value(field).is_empty(), Some(*field), *message)
            }
            Self::Custom {
                field,
                message,
                check,
            } => (check(draft), *field, *message),
        };

        if passed {
            Ok(())
        } else {
            Err(ValidationError {
                field,
                message: message.to_string(),
            })
        }
    }
}

pub fn validate<E: Entity>(draft: &E) -> Result<(), ValidationError> {
    validate_with(E::rules(), draft)
}

pub fn validate_with<E: Entity>(rules: &[Rule<E>], draft: &E) -> Result<(), ValidationError> {
    rules.iter().try_for_each(|rule| rule.check(draft))
}

pub(crate) fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("rule patterns are compile-time literals")
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
