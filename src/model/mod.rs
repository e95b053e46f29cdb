//! Core data model types: per-stage records, the message table, and sender identities.

pub mod address;
pub mod record;
pub mod table;
