//! `mailcloud` — mailbox header analytics.
//!
//! Fetches the `Date`, `From` and `Subject` headers of every message in an
//! IMAP folder, enriches them with date-derived columns, splits senders into
//! address and display name, writes a CSV snapshot after each stage and draws
//! a word cloud of subject lines.

pub mod cloud;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod stats;
