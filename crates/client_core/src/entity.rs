use std::fmt::Debug;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use shared::{domain::Choice, protocol::AssetKind};
use thiserror::Error;

use crate::validation::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Id,
    Text,
    Integer,
    Decimal,
    Flag,
    Date,
    Choice(&'static [&'static str]),
    IdList,
    Asset(AssetKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { name, label, kind }
    }

    pub fn is_editable(&self) -> bool {
        !matches!(self.kind, FieldKind::Id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Empty,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Flag(bool),
    Date(NaiveDate),
    Choice(String),
    IdList(Vec<String>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(value) | Self::Choice(value) => value.trim().is_empty(),
            Self::IdList(ids) => ids.is_empty(),
            Self::Integer(_) | Self::Decimal(_) | Self::Flag(_) | Self::Date(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(value) | Self::Choice(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Decimal(value) => value.to_string(),
            Self::Flag(value) => value.to_string(),
            Self::Date(value) => value.format("%Y-%m-%d").to_string(),
            Self::IdList(ids) => ids.join(","),
        }
    }

    pub fn opt_text(value: Option<&str>) -> Self {
        match value {
            Some(value) => Self::Text(value.to_string()),
            None => Self::Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Text(String),
    Toggle(bool),
    Ids(Vec<String>),
}

impl From<&str> for FieldInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldInput {
    fn from(value: bool) -> Self {
        Self::Toggle(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("unknown field `{0}`")]
    Unknown(String),
    #[error("field `{0}` is read-only")]
    ReadOnly(String),
    #[error("{message}")]
    Invalid { field: String, message: String },
}

impl FieldError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub trait Entity:
    Clone + Default + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const RESOURCE: &'static str;
    const LABEL: &'static str;

    fn fields() -> &'static [FieldSpec];

    fn search_fields() -> &'static [&'static str];

    /// Ordered; validation stops at the first failure.
    fn rules() -> &'static [Rule<Self>];

    fn id(&self) -> Option<&str>;

    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Stores an already-coerced value. Type mismatches are rejected.
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError>;

    fn spec(name: &str) -> Option<&'static FieldSpec> {
        Self::fields().iter().find(|spec| spec.name == name)
    }
}

pub fn coerce(spec: &FieldSpec, input: FieldInput) -> Result<FieldValue, FieldError> {
    let name = spec.name;
    match (spec.kind, input) {
        (FieldKind::Id, _) => Err(FieldError::ReadOnly(name.to_string())),
        (FieldKind::Text | FieldKind::Asset(_), FieldInput::Text(raw)) => {
            Ok(FieldValue::Text(raw))
        }
        (FieldKind::Integer, FieldInput::Text(raw)) => raw
            .trim()
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| FieldError::invalid(name, format!("{} debe ser un número entero", spec.label))),
        (FieldKind::Decimal, FieldInput::Text(raw)) => raw
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(FieldValue::Decimal)
            .ok_or_else(|| FieldError::invalid(name, format!("{} debe ser un número", spec.label))),
        (FieldKind::Flag, FieldInput::Toggle(value)) => Ok(FieldValue::Flag(value)),
        (FieldKind::Flag, FieldInput::Text(raw)) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "si" | "sí" => Ok(FieldValue::Flag(true)),
            "false" | "0" | "no" => Ok(FieldValue::Flag(false)),
            _ => Err(FieldError::invalid(name, format!("{} debe ser sí o no", spec.label))),
        },
        (FieldKind::Date, FieldInput::Text(raw)) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(FieldValue::Empty);
            }
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(FieldValue::Date)
                .map_err(|_| {
                    FieldError::invalid(name, format!("{} debe tener formato AAAA-MM-DD", spec.label))
                })
        }
        (FieldKind::Choice(options), FieldInput::Text(raw)) => options
            .iter()
            .find(|option| option.eq_ignore_ascii_case(raw.trim()))
            .map(|option| FieldValue::Choice((*option).to_string()))
            .ok_or_else(|| {
                FieldError::invalid(
                    name,
                    format!("{} debe ser uno de: {}", spec.label, options.join(", ")),
                )
            }),
        (FieldKind::IdList, FieldInput::Ids(ids)) => Ok(FieldValue::IdList(ids)),
        (_, _) => Err(FieldError::invalid(
            name,
            format!("{}: tipo de dato no admitido", spec.label),
        )),
    }
}

// Typed extraction used by `Entity::set_field` implementations.

pub(crate) fn text(name: &str, value: FieldValue) -> Result<String, FieldError> {
    match value {
        FieldValue::Text(value) => Ok(value),
        FieldValue::Empty => Ok(String::new()),
        other => Err(mismatch(name, &other)),
    }
}

pub(crate) fn opt_text(name: &str, value: FieldValue) -> Result<Option<String>, FieldError> {
    let value = text(name, value)?;
    Ok((!value.trim().is_empty()).then_some(value))
}

pub(crate) fn decimal(name: &str, value: FieldValue) -> Result<f64, FieldError> {
    match value {
        FieldValue::Decimal(value) if value.is_finite() => Ok(value),
        FieldValue::Integer(value) => Ok(value as f64),
        other => Err(mismatch(name, &other)),
    }
}

pub(crate) fn integer(name: &str, value: FieldValue) -> Result<i64, FieldError> {
    match value {
        FieldValue::Integer(value) => Ok(value),
        other => Err(mismatch(name, &other)),
    }
}

pub(crate) fn flag(name: &str, value: FieldValue) -> Result<bool, FieldError> {
    match value {
        FieldValue::Flag(value) => Ok(value),
        other => Err(mismatch(name, &other)),
    }
}

pub(crate) fn date(name: &str, value: FieldValue) -> Result<Option<NaiveDate>, FieldError> {
    match value {
        FieldValue::Date(value) => Ok(Some(value)),
        FieldValue::Empty => Ok(None),
        other => Err(mismatch(name, &other)),
    }
}

pub(crate) fn choice<C: Choice>(name: &str, value: FieldValue) -> Result<C, FieldError> {
    match value {
        FieldValue::Choice(raw) | FieldValue::Text(raw) => C::parse(&raw)
            .ok_or_else(|| FieldError::invalid(name, format!("valor `{raw}` no permitido"))),
        other => Err(mismatch(name, &other)),
    }
}

pub(crate) fn id_list(name: &str, value: FieldValue) -> Result<Vec<String>, FieldError> {
    match value {
        FieldValue::IdList(ids) => Ok(ids),
        FieldValue::Empty => Ok(Vec::new()),
        other => Err(mismatch(name, &other)),
    }
}

fn mismatch(name: &str, value: &FieldValue) -> FieldError {
    FieldError::invalid(name, format!("tipo de dato incompatible: {value:?}"))
}
