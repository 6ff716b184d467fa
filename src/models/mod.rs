pub mod job;
pub mod lead;
pub mod profile;
pub mod requirement;
pub mod schedule;
pub mod score;
