//! Command modules for the arr-sync CLI.
//!
//! - `instances`: git checkouts and assembly of the canonical configuration per instance
//! - `sync_cmd`: synchronizes every enabled instance
//! - `validate_cmd`: assembles every instance without contacting it

pub mod instances;
pub mod sync_cmd;
pub mod validate_cmd;
