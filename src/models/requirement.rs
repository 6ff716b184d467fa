use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::models::profile::value_as_u32;

/// Requirement kinds a checklist item can carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequirementType {
    Gender,
    Location,
    Age,
    Experience,
    Skill,
    Education,
}

/// Inclusive age bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn contains(&self, age: u32) -> bool {
        self.min <= age && age <= self.max
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExperienceRequirement {
    /// No constraint given.
    Any,
    /// Minimum total tenure in years.
    MinYears(f64),
    /// Keyword expected in some role's title, company or description.
    Keyword(String),
}

/// A decoded requirement. `None` means the item was left blank and is
/// satisfied by any candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Gender(Option<String>),
    Location(Option<String>),
    Age(Option<AgeRange>),
    Experience(ExperienceRequirement),
    Skill(Option<String>),
    Education(Option<String>),
}

impl Criterion {
    pub fn requirement_type(&self) -> RequirementType {
        match self {
            Criterion::Gender(_) => RequirementType::Gender,
            Criterion::Location(_) => RequirementType::Location,
            Criterion::Age(_) => RequirementType::Age,
            Criterion::Experience(_) => RequirementType::Experience,
            Criterion::Skill(_) => RequirementType::Skill,
            Criterion::Education(_) => RequirementType::Education,
        }
    }

    /// Decode the loosely-typed `value` of a stored item for the given `type`.
    pub fn parse(kind: &str, value: &Value) -> Result<Self, RequirementError> {
        let kind: RequirementType = kind
            .trim()
            .to_lowercase()
            .parse()
            .map_err(|_| RequirementError::UnknownType(kind.to_string()))?;

        let criterion = match kind {
            RequirementType::Gender => Criterion::Gender(text_value(kind, value)?),
            RequirementType::Location => Criterion::Location(text_value(kind, value)?),
            RequirementType::Skill => Criterion::Skill(text_value(kind, value)?),
            RequirementType::Education => Criterion::Education(text_value(kind, value)?),
            RequirementType::Age => Criterion::Age(age_value(value)?),
            RequirementType::Experience => Criterion::Experience(experience_value(value)?),
        };
        Ok(criterion)
    }
}

/// One line of a position's checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRequirementItem", into = "RawRequirementItem")]
pub struct RequirementItem {
    pub id: String,
    pub label: String,
    pub criterion: Criterion,
    /// The value exactly as stored, echoed back in match results.
    pub raw_value: Value,
}

impl RequirementItem {
    pub fn new(id: &str, label: &str, kind: &str, value: Value) -> Result<Self, RequirementError> {
        RawRequirementItem {
            id: id.to_string(),
            label: label.to_string(),
            kind: kind.to_string(),
            value,
        }
        .try_into()
    }

    pub fn requirement_type(&self) -> RequirementType {
        self.criterion.requirement_type()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRequirementItem {
    #[serde(default, deserialize_with = "id_string")]
    id: String,
    #[serde(default)]
    label: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: Value,
}

impl TryFrom<RawRequirementItem> for RequirementItem {
    type Error = RequirementError;

    fn try_from(raw: RawRequirementItem) -> Result<Self, Self::Error> {
        let criterion = Criterion::parse(&raw.kind, &raw.value)?;
        Ok(RequirementItem {
            id: raw.id,
            label: raw.label,
            criterion,
            raw_value: raw.value,
        })
    }
}

impl From<RequirementItem> for RawRequirementItem {
    fn from(item: RequirementItem) -> Self {
        RawRequirementItem {
            id: item.id,
            label: item.label,
            kind: item.criterion.requirement_type().to_string(),
            value: item.raw_value,
        }
    }
}

/// A position's hiring checklist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementSpec {
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub requirements: Vec<RequirementItem>,
}

impl RequirementSpec {
    /// Decode a stored template. Accepts `{position, requirements: [...]}` or
    /// a bare item array. Returns `None` when there is nothing to score against.
    pub fn from_stored(position: Option<&str>, stored: Value) -> Result<Option<Self>, RequirementError> {
        let mut spec: RequirementSpec = match stored {
            Value::Null => return Ok(None),
            Value::Array(items) => RequirementSpec {
                position: String::new(),
                requirements: serde_json::from_value(Value::Array(items))
                    .map_err(RequirementError::Malformed)?,
            },
            other => serde_json::from_value(other).map_err(RequirementError::Malformed)?,
        };

        if spec.requirements.is_empty() {
            return Ok(None);
        }
        if spec.position.is_empty() {
            if let Some(position) = position {
                spec.position = position.to_string();
            }
        }
        Ok(Some(spec))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequirementError {
    #[error("Unknown requirement type '{0}'")]
    UnknownType(String),

    #[error("Invalid value for {kind} requirement: {value}")]
    InvalidValue { kind: RequirementType, value: Value },

    #[error("Malformed requirement template: {0}")]
    Malformed(#[source] serde_json::Error),
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn text_value(kind: RequirementType, value: &Value) -> Result<Option<String>, RequirementError> {
    if is_blank(value) {
        return Ok(None);
    }
    match value {
        Value::String(s) => Ok(Some(s.trim().to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(RequirementError::InvalidValue {
            kind,
            value: other.clone(),
        }),
    }
}

fn age_value(value: &Value) -> Result<Option<AgeRange>, RequirementError> {
    if is_blank(value) {
        return Ok(None);
    }
    let invalid = || RequirementError::InvalidValue {
        kind: RequirementType::Age,
        value: value.clone(),
    };

    let range = match value {
        Value::Object(bounds) => {
            let bound = |key: &str, default: u32| match bounds.get(key) {
                None | Some(Value::Null) => Ok(default),
                Some(v) => value_as_u32(v).ok_or_else(invalid),
            };
            AgeRange {
                min: bound("min", 0)?,
                max: bound("max", 100)?,
            }
        }
        Value::String(s) => {
            let (min, max) = s.split_once('-').ok_or_else(invalid)?;
            AgeRange {
                min: min.trim().parse().map_err(|_| invalid())?,
                max: max.trim().parse().map_err(|_| invalid())?,
            }
        }
        _ => return Err(invalid()),
    };

    if range.min > range.max {
        return Err(invalid());
    }
    Ok(Some(range))
}

fn experience_value(value: &Value) -> Result<ExperienceRequirement, RequirementError> {
    if is_blank(value) {
        return Ok(ExperienceRequirement::Any);
    }
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|years| *years >= 0.0)
            .map(ExperienceRequirement::MinYears)
            .ok_or_else(|| RequirementError::InvalidValue {
                kind: RequirementType::Experience,
                value: value.clone(),
            }),
        Value::String(s) => Ok(ExperienceRequirement::Keyword(s.trim().to_lowercase())),
        other => Err(RequirementError::InvalidValue {
            kind: RequirementType::Experience,
            value: other.clone(),
        }),
    }
}

fn id_string<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}
