//! JavaScript run inside rendered pages.
//!
//! The listing script is a pure function of `(profile, max_results)`: it
//! embeds the source's selector candidates and applies the same cascade as
//! [`super::extractor`] against the live DOM, returning an array of raw
//! records in camelCase.

use crate::catalog::{Field, FieldSelector, SourceProfile};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptConfig<'a> {
    container: &'a [FieldSelector],
    part_number: &'a [FieldSelector],
    name: &'a [FieldSelector],
    price_text: &'a [FieldSelector],
    availability_text: &'a [FieldSelector],
    product_url: &'a [FieldSelector],
    max: usize,
}

const LISTING_SCRIPT: &str = r#"(() => {
  const cfg = __CONFIG__;
  const clean = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const all = (root, css) => { try { return Array.from(root.querySelectorAll(css)); } catch (e) { return []; } };
  const own = (el, css) => { try { return el.matches(css) ? [el] : []; } catch (e) { return []; } };
  const extract = (container, candidates) => {
    for (const c of candidates) {
      for (const el of own(container, c.css).concat(all(container, c.css))) {
        const v = clean(c.attr ? el.getAttribute(c.attr) : el.textContent);
        if (v) return v;
      }
    }
    return '';
  };
  let containers = [];
  for (const c of cfg.container) {
    containers = all(document, c.css);
    if (containers.length) break;
  }
  const out = [];
  for (const el of containers) {
    if (out.length >= cfg.max) break;
    const rec = {
      partNumber: extract(el, cfg.partNumber),
      name: extract(el, cfg.name),
      priceText: extract(el, cfg.priceText),
      availabilityText: extract(el, cfg.availabilityText),
      productUrl: extract(el, cfg.productUrl),
    };
    if (rec.partNumber && rec.name && rec.priceText) out.push(rec);
  }
  return out;
})()"#;

/// Script returning the listing records found on the current page.
pub fn listing_script(profile: &SourceProfile, max_results: usize) -> String {
    let config = ScriptConfig {
        container: profile.selectors(Field::Container),
        part_number: profile.selectors(Field::PartNumber),
        name: profile.selectors(Field::Name),
        price_text: profile.selectors(Field::Price),
        availability_text: profile.selectors(Field::Availability),
        product_url: profile.selectors(Field::ProductUrl),
        max: max_results,
    };
    // serializing borrowed strings and integers cannot fail
    let json = serde_json::to_string(&config).unwrap_or_else(|_| "null".to_string());
    LISTING_SCRIPT.replace("__CONFIG__", &json)
}

/// Script returning `true` once `css` matches at least one element.
///
/// Invalid selectors evaluate to `false` rather than throwing.
pub fn probe_script(css: &str) -> String {
    let literal = serde_json::Value::String(css.to_string()).to_string();
    format!(
        "(() => {{ try {{ return document.querySelector({literal}) !== null; }} catch (e) {{ return false; }} }})()"
    )
}
