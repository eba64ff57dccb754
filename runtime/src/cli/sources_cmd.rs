//! `partscout sources`: list the configured catalogs.

use crate::catalog::{Field, SourceCatalog};
use crate::cli::output;
use anyhow::{Context, Result};

pub async fn run() -> Result<()> {
    let catalog = SourceCatalog::builtin().context("failed to load source catalog")?;

    if output::is_json() {
        let items: Vec<serde_json::Value> = catalog
            .sources()
            .iter()
            .map(|s| {
                let candidates: serde_json::Map<String, serde_json::Value> =
                    std::iter::once(Field::Container)
                        .chain(Field::RECORD_FIELDS)
                        .map(|f| (f.to_string(), s.selectors(f).len().into()))
                        .collect();
                serde_json::json!({
                    "id": s.id,
                    "name": s.name,
                    "searchUrl": format!("{}{}", s.base_url, s.search_path),
                    "candidates": candidates,
                })
            })
            .collect();
        output::print_json(&serde_json::json!({
            "total": catalog.len(),
            "sources": items,
        }));
        return Ok(());
    }

    for s in catalog.sources() {
        println!("  {:<10} {:<24} {}{}", s.id, s.name, s.base_url, s.search_path);
        if !output::is_quiet() {
            let counts: Vec<String> = std::iter::once(Field::Container)
                .chain(Field::RECORD_FIELDS)
                .map(|f| format!("{f}={}", s.selectors(f).len()))
                .collect();
            println!("  {:<10} {}", "", counts.join(" "));
        }
    }
    Ok(())
}
