//! Cascading first-match field extraction over parsed HTML.
//!
//! Candidates are tried strictly in order and the first one producing a
//! non-empty trimmed value wins; matches are never merged or ranked. The
//! same rule applies one level up: the first container candidate matching at
//! least one element decides the listing containers and later candidates are
//! not consulted.
//!
//! Everything here is synchronous because `scraper` types are `!Send`.
//! Callers parse, extract, and drop the document before the next `.await`.

use crate::catalog::{Field, FieldSelector, SourceProfile};
use crate::listing::RawRecord;
use scraper::{ElementRef, Html, Selector};

/// Extract the first non-empty value for a field inside `container`.
///
/// The container itself is considered before its descendants so that
/// attribute candidates such as `[data-sku]@data-sku` can read the wrapper.
pub fn extract(container: &ElementRef<'_>, candidates: &[FieldSelector]) -> Option<String> {
    for candidate in candidates {
        let Some(selector) = parse_selector(&candidate.css) else {
            continue;
        };

        let own = selector.matches(container).then_some(*container);
        for el in own.into_iter().chain(container.select(&selector)) {
            if let Some(value) = read_value(&el, candidate.attr.as_deref()) {
                return Some(value);
            }
        }
    }
    None
}

/// Select listing containers using the first candidate with at least one match.
///
/// Returns the index of the winning candidate alongside the matches.
pub fn select_containers<'a>(
    document: &'a Html,
    candidates: &[FieldSelector],
) -> Option<(usize, Vec<ElementRef<'a>>)> {
    for (idx, candidate) in candidates.iter().enumerate() {
        let Some(selector) = parse_selector(&candidate.css) else {
            continue;
        };
        let found: Vec<ElementRef<'a>> = document.select(&selector).collect();
        if !found.is_empty() {
            return Some((idx, found));
        }
    }
    None
}

/// Parse a search-results page into at most `max_results` complete records.
///
/// Incomplete containers (missing part number, name, or price text) are
/// skipped and do not count towards the limit. Zero matches is an empty
/// vector, never an error.
pub fn extract_records(html: &str, profile: &SourceProfile, max_results: usize) -> Vec<RawRecord> {
    let document = Html::parse_document(html);

    let Some((winner, containers)) = select_containers(&document, profile.selectors(Field::Container))
    else {
        tracing::debug!("{}: no container candidate matched", profile.id);
        return Vec::new();
    };

    tracing::debug!(
        "{}: container candidate #{winner} matched {} elements",
        profile.id,
        containers.len()
    );

    containers
        .iter()
        .map(|container| record_from_container(container, profile))
        .filter(RawRecord::is_complete)
        .take(max_results)
        .collect()
}

fn record_from_container(container: &ElementRef<'_>, profile: &SourceProfile) -> RawRecord {
    let field = |f: Field| extract(container, profile.selectors(f)).unwrap_or_default();

    let raw_url = field(Field::ProductUrl);
    RawRecord {
        part_number: field(Field::PartNumber),
        name: field(Field::Name),
        price_text: field(Field::Price),
        availability_text: field(Field::Availability),
        product_url: resolve_url(&profile.base_url, &raw_url),
        source_id: profile.id.clone(),
    }
}

/// Resolve a potentially relative URL against the source base URL.
pub fn resolve_url(base_url: &str, relative: &str) -> String {
    let relative = relative.trim();
    if relative.is_empty() {
        return String::new();
    }
    if relative.starts_with("http://") || relative.starts_with("https://") {
        return relative.to_string();
    }
    if let Ok(base) = url::Url::parse(base_url) {
        if let Ok(resolved) = base.join(relative) {
            return resolved.to_string();
        }
    }
    relative.to_string()
}

fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::debug!("skipping invalid selector {css:?}: {e:?}");
            None
        }
    }
}

fn read_value(el: &ElementRef<'_>, attr: Option<&str>) -> Option<String> {
    let value = match attr {
        Some(name) => collapse_whitespace(el.value().attr(name)?),
        None => element_text(el),
    };
    (!value.is_empty()).then_some(value)
}

/// Collect the text content of an element, trimmed and whitespace-collapsed.
fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceCatalog;

    fn sel(raw: &str) -> FieldSelector {
        FieldSelector::parse(raw).unwrap()
    }

    fn first_div(doc: &Html) -> ElementRef<'_> {
        let s = Selector::parse("div.item").unwrap();
        doc.select(&s).next().unwrap()
    }

    #[test]
    fn test_first_non_empty_candidate_wins() {
        let doc = Html::parse_fragment(
            r#"<div class="item">
                <span class="new-price">  </span>
                <span class="old-price">$4.10</span>
                <span class="price">$9.99</span>
            </div>"#,
        );
        let item = first_div(&doc);
        let candidates = [sel("span.new-price"), sel("span.old-price"), sel("span.price")];
        assert_eq!(extract(&item, &candidates).as_deref(), Some("$4.10"));
    }

    #[test]
    fn test_attribute_candidate() {
        let doc = Html::parse_fragment(
            r#"<div class="item" data-sku="6203-2RS"><a class="t" href="/p/6203">Bearing</a></div>"#,
        );
        let item = first_div(&doc);
        assert_eq!(
            extract(&item, &[sel("a.t@href")]).as_deref(),
            Some("/p/6203")
        );
        // matches the container element itself
        assert_eq!(
            extract(&item, &[sel("[data-sku]@data-sku")]).as_deref(),
            Some("6203-2RS")
        );
        // missing attribute falls through to the next candidate
        assert_eq!(
            extract(&item, &[sel("a.t@data-missing"), sel("a.t")]).as_deref(),
            Some("Bearing")
        );
    }

    #[test]
    fn test_invalid_selector_is_skipped() {
        let doc = Html::parse_fragment(r#"<div class="item"><h2>Pillow Block</h2></div>"#);
        let item = first_div(&doc);
        assert_eq!(
            extract(&item, &[sel("h2[[["), sel("h2")]).as_deref(),
            Some("Pillow Block")
        );
    }

    #[test]
    fn test_no_match_is_none() {
        let doc = Html::parse_fragment(r#"<div class="item"><h2>Pillow Block</h2></div>"#);
        let item = first_div(&doc);
        assert_eq!(extract(&item, &[sel("span.price")]), None);
        assert_eq!(extract(&item, &[]), None);
    }

    #[test]
    fn test_extract_is_deterministic() {
        let doc = Html::parse_fragment(
            r#"<div class="item"><b class="a">one</b><b class="a">two</b></div>"#,
        );
        let item = first_div(&doc);
        let candidates = [sel("b.a")];
        let first = extract(&item, &candidates);
        for _ in 0..5 {
            assert_eq!(extract(&item, &candidates), first);
        }
        assert_eq!(first.as_deref(), Some("one"));
    }

    #[test]
    fn test_first_matching_container_candidate_wins() {
        let doc = Html::parse_document(
            r#"<html><body>
                <div class="card">A</div>
                <li class="row">B</li><li class="row">C</li>
            </body></html>"#,
        );
        let (idx, found) =
            select_containers(&doc, &[sel("article.x"), sel("li.row"), sel("div.card")]).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(found.len(), 2);
        assert!(select_containers(&doc, &[sel("table")]).is_none());
    }

    #[test]
    fn test_extract_records_promotes_complete_only() {
        let catalog = SourceCatalog::builtin().unwrap();
        let profile = catalog.get("zoro").unwrap();
        let html = r#"<html><body>
            <div data-za="product-card">
                <a data-za="product-name" href="/i/G123/">Ball Bearing 6203</a>
                <span data-za="product-mfr-no">6203-2RS</span>
                <span data-za="product-price">$5.49</span>
                <div data-za="product-availability">In Stock</div>
            </div>
            <div data-za="product-card">
                <a data-za="product-name" href="/i/G124/">Ball Bearing 6204</a>
                <span data-za="product-mfr-no">6204-2RS</span>
            </div>
            <div data-za="product-card">
                <a data-za="product-name" href="https://other.example/x">Ball Bearing 6205</a>
                <span data-za="product-mfr-no">6205-2RS</span>
                <span data-za="product-price">$7.10</span>
            </div>
        </body></html>"#;

        let records = extract_records(html, profile, 10);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].part_number, "6203-2RS");
        assert_eq!(records[0].name, "Ball Bearing 6203");
        assert_eq!(records[0].price_text, "$5.49");
        assert_eq!(records[0].availability_text, "In Stock");
        assert_eq!(records[0].product_url, "https://www.zoro.com/i/G123/");
        assert_eq!(records[0].source_id, "zoro");
        assert_eq!(records[1].product_url, "https://other.example/x");

        let limited = extract_records(html, profile, 1);
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_extract_records_empty_page() {
        let catalog = SourceCatalog::builtin().unwrap();
        let profile = catalog.get("grainger").unwrap();
        assert!(extract_records("<html><body><p>No results</p></body></html>", profile, 10).is_empty());
        assert!(extract_records("", profile, 10).is_empty());
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("https://www.grainger.com", "/product/ABC"),
            "https://www.grainger.com/product/ABC"
        );
        assert_eq!(resolve_url("https://a.example", "https://b.example/x"), "https://b.example/x");
        assert_eq!(resolve_url("https://a.example", ""), "");
    }
}
