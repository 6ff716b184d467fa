use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A scraped candidate profile. `profile_url` is the identity shared with
/// every job and lead derived from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(default, deserialize_with = "nullable_string")]
    pub profile_url: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, deserialize_with = "lenient_age", skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_age: Option<EstimatedAge>,

    #[serde(default, deserialize_with = "nullable_vec")]
    pub experiences: Vec<Experience>,

    #[serde(default, deserialize_with = "nullable_vec")]
    pub skills: Vec<Skill>,

    #[serde(default, deserialize_with = "nullable_vec")]
    pub education: Vec<Education>,

    /// Any other attributes the scraper returned (headline, about, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    /// Explicit age if known, otherwise the scraper's estimate.
    pub fn resolved_age(&self) -> Option<u32> {
        self.age
            .or_else(|| self.estimated_age.as_ref().and_then(|e| e.value))
    }

    /// Display name, falling back to "Unknown" like the lead table expects.
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() || name == "N/A" {
            "Unknown"
        } else {
            name
        }
    }

    /// Skill names that carry information (blank and "N/A" entries dropped).
    pub fn skill_names(&self) -> impl Iterator<Item = &str> {
        self.skills
            .iter()
            .map(|s| s.name.trim())
            .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case("n/a"))
    }
}

/// Age inferred by the scraper, e.g. from graduation year.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct EstimatedAge {
    pub value: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub based_on: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EstimatedAgeRepr {
    Detailed {
        #[serde(default, alias = "estimated_age")]
        value: Option<Value>,
        #[serde(default)]
        based_on: Option<String>,
    },
    Bare(Value),
}

impl<'de> Deserialize<'de> for EstimatedAge {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match EstimatedAgeRepr::deserialize(deserializer)? {
            EstimatedAgeRepr::Detailed { value, based_on } => EstimatedAge {
                value: value.as_ref().and_then(value_as_u32),
                based_on,
            },
            EstimatedAgeRepr::Bare(value) => EstimatedAge {
                value: value_as_u32(&value),
                based_on: None,
            },
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Experience {
    pub title: String,
    pub company: String,
    pub description: String,
    /// Free-form tenure such as "3 yr 2 mo".
    pub duration_text: String,
}

/// Scrapers emit `duration_text`, `duration`, or both.
#[derive(Deserialize)]
struct ExperienceRepr {
    #[serde(default, deserialize_with = "nullable_string")]
    title: String,
    #[serde(default, deserialize_with = "nullable_string")]
    company: String,
    #[serde(default, deserialize_with = "nullable_string")]
    description: String,
    #[serde(default, deserialize_with = "nullable_string")]
    duration_text: String,
    #[serde(default, deserialize_with = "nullable_string")]
    duration: String,
}

impl<'de> Deserialize<'de> for Experience {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = ExperienceRepr::deserialize(deserializer)?;
        let duration_text = if repr.duration_text.trim().is_empty() {
            repr.duration
        } else {
            repr.duration_text
        };
        Ok(Experience {
            title: repr.title,
            company: repr.company,
            description: repr.description,
            duration_text,
        })
    }
}

impl Experience {
    /// Lower-cased "title company description" used for keyword matching.
    pub fn search_text(&self) -> String {
        format!("{} {} {}", self.title, self.company, self.description).to_lowercase()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Skill {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SkillRepr {
    Plain(String),
    Named {
        #[serde(default)]
        name: Option<String>,
    },
}

impl<'de> Deserialize<'de> for Skill {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = match SkillRepr::deserialize(deserializer)? {
            SkillRepr::Plain(name) => name,
            SkillRepr::Named { name } => name.unwrap_or_default(),
        };
        Ok(Skill { name })
    }
}

impl From<&str> for Skill {
    fn from(name: &str) -> Self {
        Skill {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Education {
    #[serde(default, deserialize_with = "nullable_string")]
    pub degree: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,

    #[serde(default, alias = "field", skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
}

/// Interpret a JSON number or numeric string as a whole, non-negative count.
pub(crate) fn value_as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u32>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f.trunc() as u32))
        }
        _ => None,
    }
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_age<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(value_as_u32))
}
