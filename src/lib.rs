//! Lead-generation pipeline
//!
//! Profile URLs are dispatched onto a crawl queue, scraped by a pool of crawl
//! workers, and handed to scoring workers that evaluate each profile against a
//! position's requirement checklist and persist the result as a lead.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod services;
