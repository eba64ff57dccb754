//! Rule-based query enhancement: an ordered pattern library over part
//! numbers, generic categories, equipment names, and sized parts.
//!
//! Rules run in a fixed order and each assigns its own confidence:
//!
//! | rule        | trigger                                      | confidence |
//! |-------------|----------------------------------------------|------------|
//! | part number | 3–8 char alphanumeric token containing digits | 0.9       |
//! | category    | query is a bare (≤2 word) generic category    | 0.8       |
//! | equipment   | query names a piece of equipment              | 0.7       |
//! | dimension   | size pattern plus a category keyword          | 0.8       |
//!
//! The first rule scoring at least [`RULE_THRESHOLD`] wins.

use regex::Regex;
use std::sync::LazyLock;

/// Minimum confidence for a rule result to short-circuit enhancement.
pub const RULE_THRESHOLD: f32 = 0.7;

const PART_NUMBER_CONFIDENCE: f32 = 0.9;
const CATEGORY_CONFIDENCE: f32 = 0.8;
const EQUIPMENT_CONFIDENCE: f32 = 0.7;
const DIMENSION_CONFIDENCE: f32 = 0.8;

/// Output of a matching rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule: &'static str,
    pub enhanced_query: String,
    pub suggestions: Vec<String>,
    pub confidence: f32,
}

/// Part-number shapes and the domain term appended for them. First match wins.
static PART_FAMILIES: LazyLock<Vec<(Regex, &'static str, [&'static str; 3])>> =
    LazyLock::new(|| {
        vec![
            (
                Regex::new(r"(?i)^(?:6[0-4]|16|2[23]|3[023]|NU|NJ|UCP?|UCF)\d{2,3}(?:-?(?:2RS|2Z|ZZ|RS|Z))?$")
                    .expect("bearing regex is valid"),
                "bearing",
                ["ball bearing", "deep groove bearing", "sealed bearing"],
            ),
            (
                Regex::new(r"(?i)^(?:[ABCDE]|3V|5V|8V|3L|4L|5L|AX|BX|CX)\d{2,4}$")
                    .expect("belt regex is valid"),
                "v-belt",
                ["v-belt", "cogged belt", "wrapped v-belt"],
            ),
            (
                Regex::new(r"^[0-9]-\d{3}$").expect("o-ring regex is valid"),
                "o-ring",
                ["o-ring", "nitrile o-ring", "viton o-ring"],
            ),
        ]
    });

const DEFAULT_PART_TERM: &str = "replacement part";
const DEFAULT_PART_SUGGESTIONS: [&str; 2] = ["part", "industrial part"];

/// Generic category → more specific catalog terms, most common first.
const CATEGORY_TERMS: &[(&str, &[&str])] = &[
    ("bearing", &["ball bearing", "roller bearing", "pillow block bearing", "needle bearing"]),
    ("belt", &["v-belt", "timing belt", "conveyor belt"]),
    ("v belt", &["classical v-belt", "cogged v-belt", "wedge v-belt"]),
    ("motor", &["ac electric motor", "dc gear motor", "three phase motor"]),
    ("pump", &["centrifugal pump", "diaphragm pump", "gear pump"]),
    ("valve", &["ball valve", "gate valve", "solenoid valve", "check valve"]),
    ("seal", &["oil seal", "shaft seal", "mechanical seal"]),
    ("filter", &["hydraulic filter", "air filter", "oil filter"]),
    ("gear", &["spur gear", "helical gear", "worm gear"]),
    ("coupling", &["jaw coupling", "flexible shaft coupling", "gear coupling"]),
    ("chain", &["roller chain", "conveyor chain", "leaf chain"]),
    ("sprocket", &["roller chain sprocket", "idler sprocket", "taper bushed sprocket"]),
    ("hose", &["hydraulic hose", "air hose", "suction hose"]),
    ("fitting", &["hydraulic fitting", "pipe fitting", "compression fitting"]),
    ("o ring", &["nitrile o-ring", "viton o-ring", "o-ring kit"]),
    ("fastener", &["hex bolt", "socket cap screw", "hex nut"]),
    ("switch", &["limit switch", "pressure switch", "toggle switch"]),
    ("relay", &["control relay", "solid state relay", "time delay relay"]),
    ("sensor", &["proximity sensor", "photoelectric sensor", "temperature sensor"]),
];

/// Equipment → parts typically bought for it.
const EQUIPMENT_PARTS: &[(&str, &[&str])] = &[
    ("conveyor", &["conveyor belt", "conveyor roller", "conveyor bearing", "conveyor chain"]),
    ("forklift", &["forklift tire", "forklift battery", "forklift hydraulic filter"]),
    ("compressor", &["air compressor filter", "compressor valve", "compressor belt"]),
    ("gearbox", &["gearbox oil seal", "gearbox bearing", "gear reducer"]),
    ("hvac", &["hvac belt", "hvac filter", "blower motor"]),
    ("air handler", &["air handler belt", "air handler filter", "blower motor"]),
    ("lathe", &["lathe chuck", "lathe belt", "lathe tool holder"]),
    ("mixer", &["mixer gearbox", "mixer seal", "mixer motor"]),
    ("boiler", &["boiler pump", "boiler gasket", "boiler valve"]),
    ("chiller", &["chiller pump", "chiller compressor", "chiller filter"]),
    ("cooling tower", &["cooling tower fan motor", "cooling tower fill", "cooling tower pump"]),
];

/// `25mm`, `1/2 in`, `3.5"`, `10 x 20`
static DIMENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b\d+(?:\.\d+|/\d+)?\s*(?:mm|cm|in|inch|inches|ft|"|')(?:\b|\s|$)|\b\d+(?:\.\d+)?\s*(?:x|×)\s*\d+(?:\.\d+)?\b"#,
    )
    .expect("dimension regex is valid")
});

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9][A-Za-z0-9-]*").expect("token regex is valid"));

/// Run the rules in order and return the first confident match.
pub fn apply(query: &str) -> Option<RuleMatch> {
    let query = collapse(query);
    if query.is_empty() {
        return None;
    }

    let rules: [fn(&str) -> Option<RuleMatch>; 4] =
        [part_number_rule, category_rule, equipment_rule, dimension_rule];
    rules
        .iter()
        .filter_map(|rule| rule(query.as_str()))
        .find(|m| m.confidence >= RULE_THRESHOLD)
}

/// (a) part-number-like token → append a domain term.
fn part_number_rule(query: &str) -> Option<RuleMatch> {
    let dims: Vec<(usize, usize)> = DIMENSION
        .find_iter(query)
        .map(|m| (m.start(), m.end()))
        .collect();

    let token = TOKEN
        .find_iter(query)
        .filter(|m| !dims.iter().any(|&(s, e)| m.start() < e && s < m.end()))
        .map(|m| m.as_str())
        .find(|t| is_part_number(t))?;

    let lower = query.to_lowercase();
    let (term, extras): (&str, Vec<&str>) = PART_FAMILIES
        .iter()
        .find(|(re, _, _)| re.is_match(token))
        .map(|(_, term, extras)| (*term, extras.to_vec()))
        .unwrap_or((DEFAULT_PART_TERM, DEFAULT_PART_SUGGESTIONS.to_vec()));

    let enhanced_query = if lower.contains(term) {
        query.to_string()
    } else {
        format!("{query} {term}")
    };

    Some(RuleMatch {
        rule: "part_number",
        suggestions: suggestions_excluding(
            extras.iter().map(|e| format!("{token} {e}")),
            &enhanced_query,
        ),
        enhanced_query,
        confidence: PART_NUMBER_CONFIDENCE,
    })
}

/// 3 to 8 characters of letters, digits and inner dashes, at least one a digit.
fn is_part_number(token: &str) -> bool {
    let len = token.chars().count();
    (3..=8).contains(&len)
        && token.chars().any(|c| c.is_ascii_digit())
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !token.ends_with('-')
}

/// (b) bare generic category → specific terms.
fn category_rule(query: &str) -> Option<RuleMatch> {
    let key = category_key(query);
    if key.split_whitespace().count() > 2 {
        return None;
    }
    let (_, terms) = CATEGORY_TERMS.iter().find(|(cat, _)| *cat == key)?;
    Some(expansion("category", terms, CATEGORY_CONFIDENCE))
}

/// (c) equipment name → parts table.
fn equipment_rule(query: &str) -> Option<RuleMatch> {
    let padded = format!(" {} ", category_key(query));
    let (_, parts) = EQUIPMENT_PARTS
        .iter()
        .find(|(equipment, _)| padded.contains(&format!(" {equipment} ")))?;
    Some(expansion("equipment", parts, EQUIPMENT_CONFIDENCE))
}

/// (d) size pattern together with a category keyword.
fn dimension_rule(query: &str) -> Option<RuleMatch> {
    let size = DIMENSION.find(query)?;
    let padded = format!(" {} ", category_key(query));
    let (category, terms) = CATEGORY_TERMS
        .iter()
        .find(|(cat, _)| padded.contains(&format!(" {cat} ")))?;

    let size_text = normalize_size(size.as_str());
    let enhanced_query = collapse(&format!(
        "{} {size_text} {}",
        &query[..size.start()],
        &query[size.end()..]
    ));

    let mut candidates = vec![format!("{size_text} {category}")];
    candidates.extend(terms.iter().take(2).map(|t| format!("{size_text} {t}")));

    Some(RuleMatch {
        rule: "dimension",
        suggestions: suggestions_excluding(candidates.into_iter(), &enhanced_query),
        enhanced_query,
        confidence: DIMENSION_CONFIDENCE,
    })
}

fn expansion(rule: &'static str, terms: &[&str], confidence: f32) -> RuleMatch {
    RuleMatch {
        rule,
        enhanced_query: terms[0].to_string(),
        suggestions: terms[1..].iter().map(|t| t.to_string()).collect(),
        confidence,
    }
}

/// Lower-case, dash/punctuation folded to spaces, simple plurals dropped.
fn category_key(query: &str) -> String {
    query
        .to_lowercase()
        .replace(['-', '_', ','], " ")
        .split_whitespace()
        .map(|w| {
            if w.len() > 3 && w.ends_with('s') && !w.ends_with("ss") {
                &w[..w.len() - 1]
            } else {
                w
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `1/2 inch` → `1/2in`, `25 mm` → `25mm`, `3"` → `3in`
fn normalize_size(raw: &str) -> String {
    let compact: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    compact
        .replace("inches", "in")
        .replace("inch", "in")
        .replace('"', "in")
        .replace('×', "x")
}

fn suggestions_excluding(candidates: impl Iterator<Item = String>, enhanced: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for c in candidates {
        if !c.eq_ignore_ascii_case(enhanced) && !out.iter().any(|o| o.eq_ignore_ascii_case(&c)) {
            out.push(c);
        }
    }
    out
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
