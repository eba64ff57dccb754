//! Global output mode for CLI commands.

use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, Default)]
struct Mode {
    json: bool,
    quiet: bool,
}

static MODE: OnceLock<Mode> = OnceLock::new();

/// Set the output mode once, from the global flags.
pub fn init(json: bool, quiet: bool) {
    let _ = MODE.set(Mode { json, quiet });
}

fn mode() -> Mode {
    MODE.get().copied().unwrap_or_default()
}

/// Machine-readable JSON on stdout.
pub fn is_json() -> bool {
    mode().json
}

/// Suppress human-oriented chatter on stderr.
pub fn is_quiet() -> bool {
    mode().quiet
}

pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

/// Shorten `s` to at most `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{keep}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("6203 bearing", 20), "6203 bearing");
        assert_eq!(truncate("Deep Groove Ball Bearing", 10), "Deep Gr...");
        assert_eq!(truncate("Ø25mm", 5), "Ø25mm");
    }
}
