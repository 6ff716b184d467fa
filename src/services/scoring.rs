use std::sync::LazyLock;

use regex::Regex;

use crate::models::profile::Profile;
use crate::models::requirement::{AgeRange, Criterion, ExperienceRequirement, RequirementItem, RequirementSpec};
use crate::models::score::{RequirementMatch, ScoreResult};
use crate::services::fuzzy;

/// Location similarity needed when neither string contains the other.
const LOCATION_THRESHOLD: f64 = 80.0;

/// Similarity between an experience keyword and a single word of a role.
const EXPERIENCE_KEYWORD_THRESHOLD: f64 = 80.0;

const SKILL_THRESHOLD: f64 = 70.0;

/// How many skills the candidate value of a skill requirement lists.
const SKILL_PREVIEW: usize = 3;

const NOT_AVAILABLE: &str = "N/A";

/// Education ladder; a degree string is ranked by the highest keyword it contains.
const EDUCATION_LEVELS: &[(&str, u8)] = &[
    ("high school", 1),
    ("sma", 1),
    ("smk", 1),
    ("diploma", 2),
    ("associate", 2),
    ("d3", 2),
    ("bachelor", 3),
    ("s1", 3),
    ("sarjana", 3),
    ("master", 4),
    ("s2", 4),
    ("mba", 4),
    ("doctoral", 5),
    ("phd", 5),
    ("s3", 5),
];

static YEARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]+)\s*(?:yrs?|years?)\b").expect("valid years pattern"));

static MONTHS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]+)\s*(?:mos?|months?)\b").expect("valid months pattern"));

/// Score a profile against a requirement checklist.
///
/// Every item resolves to matched / not matched with the comparison rule of
/// its kind:
/// - gender: case-insensitive whole-word match
/// - location: containment either way, else partial similarity >= 80
/// - age: inclusive range on the explicit or estimated age
/// - experience: minimum total years, or a keyword found in some role
/// - skill: containment either way, else similarity >= 70
/// - education: highest attained level >= required level
///
/// Blank requirement values are satisfied by anyone. The function is pure:
/// the same inputs always produce the same result.
pub fn evaluate(profile: &Profile, spec: &RequirementSpec) -> ScoreResult {
    let results = spec
        .requirements
        .iter()
        .map(|item| check_item(profile, item))
        .collect();
    ScoreResult::from_matches(results)
}

fn check_item(profile: &Profile, item: &RequirementItem) -> RequirementMatch {
    let (matched, candidate_value) = match &item.criterion {
        Criterion::Gender(required) => (
            check_gender(required.as_deref(), profile.gender.as_deref()),
            display_or_na(profile.gender.as_deref()),
        ),
        Criterion::Location(required) => (
            check_location(required.as_deref(), profile.location.as_deref()),
            display_or_na(profile.location.as_deref()),
        ),
        Criterion::Age(range) => (
            check_age(range.as_ref(), profile.resolved_age()),
            profile
                .resolved_age()
                .map(|age| age.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ),
        Criterion::Experience(required) => (
            check_experience(required, profile),
            format!("{:.1} years", total_experience_months(profile) as f64 / 12.0),
        ),
        Criterion::Skill(required) => (
            check_skill(required.as_deref(), profile),
            skill_preview(profile),
        ),
        Criterion::Education(required) => (
            check_education(required.as_deref(), profile),
            profile
                .education
                .first()
                .map(|e| display_or_na(Some(e.degree.as_str())))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ),
    };

    RequirementMatch {
        id: item.id.clone(),
        label: item.label.clone(),
        kind: item.requirement_type(),
        required_value: item.raw_value.clone(),
        candidate_value,
        matched,
    }
}

fn check_gender(required: Option<&str>, candidate: Option<&str>) -> bool {
    let Some(required) = required else {
        return true;
    };
    let required = required.trim().to_lowercase();
    let candidate = candidate.unwrap_or_default().trim().to_lowercase();
    if candidate.is_empty() {
        return false;
    }
    if candidate == required {
        return true;
    }

    // whole word only: "male" must not match inside "female"
    let required = words(&required);
    if required.is_empty() {
        return false;
    }
    words(&candidate)
        .windows(required.len())
        .any(|window| window == required.as_slice())
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn check_location(required: Option<&str>, candidate: Option<&str>) -> bool {
    let Some(required) = required else {
        return true;
    };
    let required = required.trim().to_lowercase();
    let candidate = candidate.unwrap_or_default().trim().to_lowercase();
    if candidate.is_empty() {
        return false;
    }
    if candidate.contains(&required) || required.contains(&candidate) {
        return true;
    }
    fuzzy::partial_ratio(&required, &candidate) >= LOCATION_THRESHOLD
}

fn check_age(range: Option<&AgeRange>, candidate: Option<u32>) -> bool {
    let Some(range) = range else {
        return true;
    };
    candidate.is_some_and(|age| range.contains(age))
}

fn check_experience(required: &ExperienceRequirement, profile: &Profile) -> bool {
    match required {
        ExperienceRequirement::Any => true,
        ExperienceRequirement::MinYears(min_years) => {
            total_experience_months(profile) as f64 / 12.0 >= *min_years
        }
        ExperienceRequirement::Keyword(keyword) => profile.experiences.iter().any(|exp| {
            let text = exp.search_text();
            text.contains(keyword.as_str())
                || text
                    .split_whitespace()
                    .any(|word| fuzzy::ratio(keyword, word) >= EXPERIENCE_KEYWORD_THRESHOLD)
        }),
    }
}

fn check_skill(required: Option<&str>, profile: &Profile) -> bool {
    let Some(required) = required else {
        return true;
    };
    let required = required.trim().to_lowercase();
    profile.skill_names().any(|name| {
        let name = name.to_lowercase();
        name.contains(&required)
            || required.contains(&name)
            || fuzzy::ratio(&required, &name) >= SKILL_THRESHOLD
    })
}

fn check_education(required: Option<&str>, profile: &Profile) -> bool {
    let Some(required) = required else {
        return true;
    };
    let required_level = education_level(required);
    if profile.education.is_empty() {
        return required_level == 0;
    }
    let highest = profile
        .education
        .iter()
        .map(|e| education_level(&e.degree))
        .max()
        .unwrap_or(0);
    highest >= required_level
}

/// Rank of the highest education keyword found in `text`, 0 if none.
pub fn education_level(text: &str) -> u8 {
    let text = text.to_lowercase();
    EDUCATION_LEVELS
        .iter()
        .filter(|(keyword, _)| text.contains(keyword))
        .map(|(_, level)| *level)
        .max()
        .unwrap_or(0)
}

/// Months of tenure in a free-form duration such as "3 yr 2 mo". Returns
/// `None` when neither a year nor a month count is present. Absurd counts
/// saturate at `u64::MAX`.
pub fn parse_duration_months(duration: &str) -> Option<u64> {
    let capture = |re: &Regex| {
        re.captures(duration)
            .and_then(|c| c.get(1))
            // only ASCII digits are captured, so a failed parse is an overflow
            .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
    };
    let years = capture(&YEARS_RE);
    let months = capture(&MONTHS_RE);
    if years.is_none() && months.is_none() {
        return None;
    }
    Some(
        years
            .unwrap_or(0)
            .saturating_mul(12)
            .saturating_add(months.unwrap_or(0)),
    )
}

/// Sum of the parseable durations of every listed role.
pub fn total_experience_months(profile: &Profile) -> u64 {
    profile
        .experiences
        .iter()
        .filter_map(|exp| parse_duration_months(&exp.duration_text))
        .fold(0, u64::saturating_add)
}

fn skill_preview(profile: &Profile) -> String {
    let names: Vec<&str> = profile.skill_names().take(SKILL_PREVIEW).collect();
    if names.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        names.join(", ")
    }
}

fn display_or_na(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}
