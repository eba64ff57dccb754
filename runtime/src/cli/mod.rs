//! CLI subcommand implementations for the PartScout binary.

pub mod enhance_cmd;
pub mod output;
pub mod search_cmd;
pub mod sources_cmd;
