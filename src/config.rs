use std::time::Duration;

// ============================================================================
// Feed Markers
// ============================================================================

/// Key of the object that anchors the ad search state in page JSON.
pub const INIT_DATA_KEY: &str = "ad_library_main";

/// Only network responses whose URL contains this fragment are inspected.
pub const API_URL_FRAGMENT: &str = "graphql";

/// Script tags carrying server-rendered JSON.
pub const JSON_SCRIPT_SELECTOR: &str = r#"script[type="application/json"]"#;

/// Transient spinner shown while the next batch of results loads.
pub const LOADER_SELECTOR: &str = r#"[data-visualcompletion="loading-state"]"#;

/// Permalink base for a single ad.
pub const AD_LIBRARY_BASE_URL: &str = "https://www.facebook.com/ads/library/";

// ============================================================================
// Crawl Timing
// ============================================================================

pub const MAX_RETRIES: u32 = 5;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_SCROLLS: u32 = 1000;
pub const SCROLL_DELTA_Y: f64 = 10_000.0;
pub const LOADER_APPEAR_TIMEOUT: Duration = Duration::from_secs(20);
pub const LOADER_DETACH_TIMEOUT: Duration = Duration::from_secs(10);
pub const SCROLL_SETTLE_DELAY: Duration = Duration::from_millis(500);

pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const BROWSER_LOCALE: &str = "en-US";

// ============================================================================
// Artifacts
// ============================================================================

pub const DATA_DIR: &str = "data";
pub const LOG_DIR: &str = "logs";
pub const LOG_FILE_PREFIX: &str = "adlib-crawler";

pub const TOP_ADS_LIMIT: usize = 10;
pub const UNDETECTED_LANG: &str = "undetected";

/// Timing knobs for one collection run.
///
/// `Default` yields the compile-time constants above; nothing reads these
/// from the environment.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub navigation_timeout: Duration,
    pub max_scrolls: u32,
    pub scroll_delta_y: f64,
    pub loader_appear_timeout: Duration,
    pub loader_detach_timeout: Duration,
    pub settle_delay: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
            navigation_timeout: NAVIGATION_TIMEOUT,
            max_scrolls: MAX_SCROLLS,
            scroll_delta_y: SCROLL_DELTA_Y,
            loader_appear_timeout: LOADER_APPEAR_TIMEOUT,
            loader_detach_timeout: LOADER_DETACH_TIMEOUT,
            settle_delay: SCROLL_SETTLE_DELAY,
        }
    }
}
