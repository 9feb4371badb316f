//! KBO crawl engine.
//!
//! Scrapes the league's schedule, result, box-score and standings pages into
//! typed records and hands them to a storage backend. The CLI in `main.rs`
//! is one front end; anything else can drive [`pipeline::Pipeline`] or the
//! individual [`crawlers`] directly.

pub mod classifier;
pub mod config;
pub mod crawlers;
pub mod dates;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod markers;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod sink;
pub mod teams;
