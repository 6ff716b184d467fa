//! Sample profiles and requirement checklists

#![allow(dead_code)]

use serde_json::json;

use leadgen_pipeline::models::job::{CrawlJob, TriggerSource};
use leadgen_pipeline::models::profile::Profile;
use leadgen_pipeline::models::requirement::{RequirementItem, RequirementSpec};

pub const SITI_URL: &str = "https://www.linkedin.com/in/siti-rahma";
pub const BUDI_URL: &str = "https://www.linkedin.com/in/budi-santoso";
pub const DESK_COLLECTION: &str = "desk_collection";

/// Candidate from the end-to-end scoring example.
pub fn siti() -> Profile {
    serde_json::from_value(json!({
        "profile_url": SITI_URL,
        "name": "Siti Rahma",
        "gender": "female",
        "location": "Bandung",
        "age": 28,
        "experiences": [{
            "title": "Collection Officer",
            "company": "BPR",
            "description": "",
            "duration_text": "3 yr 2 mo"
        }],
        "skills": ["Negotiation"],
        "education": [{"degree": "Diploma"}]
    }))
    .unwrap()
}

/// Sparse profile: estimated age only, no roles or education.
pub fn budi() -> Profile {
    serde_json::from_value(json!({
        "profile_url": BUDI_URL,
        "name": "Budi Santoso",
        "gender": "Male",
        "location": "Jakarta Selatan, DKI Jakarta",
        "estimated_age": {"value": 24, "based_on": "graduation_year"},
        "experiences": [],
        "skills": [{"name": "Customer Service"}, "N/A"],
        "education": []
    }))
    .unwrap()
}

pub fn item(id: &str, kind: &str, value: serde_json::Value) -> RequirementItem {
    RequirementItem::new(id, &format!("{kind} requirement"), kind, value).unwrap()
}

/// The five-item checklist from the end-to-end scoring example.
pub fn desk_collection_spec() -> RequirementSpec {
    RequirementSpec {
        position: "Desk Collection".to_string(),
        requirements: vec![
            item("req_gender", "gender", json!("female")),
            item("req_location", "location", json!("bandung")),
            item("req_age", "age", json!({"min": 20, "max": 35})),
            item("req_experience", "experience", json!(2)),
            item("req_skill", "skill", json!("negotiation")),
        ],
    }
}

pub fn crawl_job(url: &str) -> CrawlJob {
    CrawlJob::new(url, DESK_COLLECTION, TriggerSource::Manual)
}
