//! Request fingerprint diversification: rotating user agents, browser-like
//! headers, randomized viewports, and pre-navigation jitter.

use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

/// Common desktop resolutions.
const VIEWPORTS: &[(u32, u32)] = &[
    (1920, 1080),
    (1536, 864),
    (1440, 900),
    (1366, 768),
    (1280, 800),
    (1600, 900),
];

/// Headers a desktop browser sends with a top-level navigation.
///
/// `Accept-Encoding` is absent: reqwest negotiates gzip, brotli, and deflate
/// itself and only decodes bodies it asked for.
pub const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Upgrade-Insecure-Requests", "1"),
];

/// Pick a user agent at random.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Browser viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A common resolution with a few pixels of jitter.
pub fn random_viewport() -> Viewport {
    let mut rng = rand::thread_rng();
    let (w, h) = VIEWPORTS.choose(&mut rng).copied().unwrap_or((1366, 768));
    Viewport {
        width: w - rng.gen_range(0..=24),
        height: h - rng.gen_range(0..=24),
    }
}

/// A random delay drawn from `range_ms`.
pub fn jitter(range_ms: RangeInclusive<u64>) -> Duration {
    if range_ms.is_empty() {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(range_ms))
}
