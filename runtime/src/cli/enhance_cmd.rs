//! `partscout enhance <query>`: show how a query would be rewritten.

use crate::cli::output;
use crate::config::RuntimeConfig;
use crate::enhance::QueryEnhancer;
use anyhow::{bail, Result};

pub async fn run(query: &str) -> Result<()> {
    let config = RuntimeConfig::from_env();
    if query.trim().chars().count() < config.search.min_query_len {
        bail!(
            "query must be at least {} characters",
            config.search.min_query_len
        );
    }

    let enhancer = QueryEnhancer::from_config(&config.llm);
    let e = enhancer.enhance(query).await;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&e)?);
        return Ok(());
    }

    println!("  {} -> {}", e.original_query, e.enhanced_query);
    if !output::is_quiet() {
        println!("  method: {}  confidence: {:.2}", e.method, e.confidence);
        if !e.suggestions.is_empty() {
            println!("  also try:");
            for s in &e.suggestions {
                println!("    - {s}");
            }
        }
        if !enhancer.has_llm() {
            eprintln!("  (no language-model key configured; rules only)");
        }
    }
    Ok(())
}
