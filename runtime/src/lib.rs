// Copyright 2026 PartScout Contributors
// SPDX-License-Identifier: Apache-2.0

//! PartScout runtime library: resilient multi-catalog price and availability
//! lookup for industrial parts.
//!
//! A query flows through [`enhance::QueryEnhancer`], then
//! [`search::SearchOrchestrator`] fans each candidate query out to every
//! source in the [`catalog::SourceCatalog`] via
//! [`acquisition::strategy::FetchStrategy`], and merges the results with
//! [`normalizer`] and [`dedupe`].

pub mod acquisition;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dedupe;
pub mod enhance;
pub mod errors;
pub mod listing;
pub mod normalizer;
pub mod pool;
pub mod renderer;
pub mod search;
pub mod stealth;

pub use catalog::{SourceCatalog, SourceProfile};
pub use config::RuntimeConfig;
pub use enhance::{EnhancementMethod, QueryEnhancement, QueryEnhancer};
pub use errors::{EnhancementError, FetchError, SearchError};
pub use listing::{Availability, NormalizedListing, RawRecord};
pub use search::fanout::CatalogSearch;
pub use search::{SearchBackend, SearchMethod, SearchOrchestrator, SmartSearchOutcome};
