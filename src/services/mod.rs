pub mod dedup;
pub mod fuzzy;
pub mod leads;
pub mod queue;
pub mod requirements;
pub mod scoring;
pub mod scraper;
pub mod stats;
