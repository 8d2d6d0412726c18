use std::path::PathBuf;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{CollectorConfig, LOADER_SELECTOR};
use crate::error::{CollectError, ExtractError};
use crate::interceptor::{AdAccumulator, ResponseInterceptor};
use crate::locator::{extract_initial_groups, RawAdGroup};
use crate::session::{ChromeSession, PageSession};
use crate::storage::{ArtifactKind, ArtifactStore};

// ============================================================================
// Retry Controller
// ============================================================================

/// How a single navigate-then-extract attempt ended.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(Vec<RawAdGroup>),
    /// Marker not rendered yet; worth reloading.
    Retryable(ExtractError),
    /// Anything else; retrying won't help.
    Fatal(ExtractError),
}

impl From<Result<Vec<RawAdGroup>, ExtractError>> for AttemptOutcome {
    fn from(result: Result<Vec<RawAdGroup>, ExtractError>) -> Self {
        match result {
            Ok(groups) => AttemptOutcome::Success(groups),
            Err(e) if e.is_retryable() => AttemptOutcome::Retryable(e),
            Err(e) => AttemptOutcome::Fatal(e),
        }
    }
}

/// What the retry loop produced from the initial render.
#[derive(Debug, PartialEq)]
pub enum InitialLoad {
    Loaded(Vec<RawAdGroup>),
    /// Marker never appeared within the attempt budget.
    Exhausted,
    /// An unexpected extraction failure stopped the loop early.
    Failed,
}

impl InitialLoad {
    pub fn into_groups(self) -> Vec<RawAdGroup> {
        match self {
            InitialLoad::Loaded(groups) => groups,
            InitialLoad::Exhausted | InitialLoad::Failed => Vec::new(),
        }
    }
}

fn extract_from_page<S: PageSession>(session: &S) -> AttemptOutcome {
    let scripts = match session.json_scripts() {
        Ok(scripts) => scripts,
        Err(e) => return AttemptOutcome::Fatal(e.into()),
    };
    extract_initial_groups(&scripts).into()
}

/// Navigate to `url` and pull ad groups out of the initial render, reloading
/// while the marker object is missing.
///
/// A navigation failure aborts the whole collection. Exhausting the attempt
/// budget or hitting an unexpected extraction error only ends this loop; the
/// caller still scrolls and keeps whatever the response interceptor captured.
pub async fn find_init_data_with_retries<S: PageSession>(
    session: &S,
    url: &str,
    config: &CollectorConfig,
) -> Result<InitialLoad, CollectError> {
    for attempt in 1..=config.max_retries {
        info!("Attempt {}: Navigating to page...", attempt);
        if let Err(source) = session.navigate(url, config.navigation_timeout) {
            error!("Timeout navigating to {}", url);
            return Err(CollectError::Navigation {
                url: url.to_string(),
                source,
            });
        }

        match extract_from_page(session) {
            AttemptOutcome::Success(groups) => {
                info!("✅ Attempt {}: Found {} ad groups in initial render", attempt, groups.len());
                return Ok(InitialLoad::Loaded(groups));
            }
            AttemptOutcome::Retryable(e) => {
                warn!("Attempt {}: Init data not found: {}", attempt, e);
                if attempt < config.max_retries {
                    info!("Reloading page and retrying...");
                    sleep(config.retry_delay).await;
                }
            }
            AttemptOutcome::Fatal(e) => {
                error!("Unexpected error: {}", e);
                return Ok(InitialLoad::Failed);
            }
        }
    }

    error!("Max retries reached. Giving up.");
    Ok(InitialLoad::Exhausted)
}

// ============================================================================
// Scroll Loop
// ============================================================================

/// Scroll until the loading spinner stops showing up, or `max_scrolls` steps.
///
/// Returns the number of scroll steps taken.
pub async fn scroll_until_loaded<S: PageSession>(session: &S, config: &CollectorConfig) -> Result<u32, CollectError> {
    for i in 0..config.max_scrolls {
        info!("Scrolling page for {} time", i + 1);
        session.scroll(config.scroll_delta_y)?;

        let loaded = session.wait_for_selector(LOADER_SELECTOR, config.loader_appear_timeout)
            && session.wait_for_detached(LOADER_SELECTOR, config.loader_detach_timeout);
        if !loaded {
            info!("Reached the end of the list or loading took too long");
            return Ok(i + 1);
        }

        sleep(config.settle_delay).await;
    }
    Ok(config.max_scrolls)
}

// ============================================================================
// Collection
// ============================================================================

/// Drive one session through initial load and scrolling, returning every ad
/// group seen, in arrival order.
pub async fn collect_ad_groups<S: PageSession>(
    session: &S,
    url: &str,
    config: &CollectorConfig,
) -> Result<Vec<RawAdGroup>, CollectError> {
    let collected = AdAccumulator::new();
    let interceptor = ResponseInterceptor::new(collected.clone());
    session.on_response(Box::new(move |response_url: &str, body: &dyn Fn() -> anyhow::Result<String>| {
        interceptor.handle_response(response_url, body);
    }))?;
    session.disable_cache()?;

    let initial = find_init_data_with_retries(session, url, config).await?;
    collected.extend(initial.into_groups());
    info!("Collected {} initial data ads", collected.len());

    scroll_until_loaded(session, config).await?;

    let groups = collected.snapshot();
    info!("Totally collected {} ads", groups.len());
    Ok(groups)
}

/// Collect ad groups from `url` in a fresh headless browser and persist them
/// as the run's raw data artifact.
pub async fn collect_raw_data(url: &str, store: &ArtifactStore) -> Result<PathBuf, CollectError> {
    let groups = {
        let session = ChromeSession::launch()?;
        collect_ad_groups(&session, url, &CollectorConfig::default()).await?
    };

    let path = store.write_json(ArtifactKind::RawData, &groups)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::session::ResponseCallback;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    const FEED_URL: &str = "https://www.facebook.com/ads/library/?q=test";
    const API_URL: &str = "https://www.facebook.com/api/graphql/";

    /// Scripted browser: one script set per navigation, one API response per scroll.
    #[derive(Default)]
    struct FakeSession {
        pages: Mutex<VecDeque<Vec<String>>>,
        current: Mutex<Vec<String>>,
        batches: Mutex<VecDeque<String>>,
        callback: Mutex<Option<ResponseCallback>>,
        loader_pending: Mutex<bool>,
        navigations: Mutex<u32>,
        scrolls: Mutex<u32>,
        fail_navigation: bool,
        fail_scripts: bool,
        cache_disabled: Mutex<bool>,
    }

    impl FakeSession {
        fn with_pages(pages: Vec<Vec<String>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                ..Default::default()
            }
        }

        fn with_batches(self, batches: Vec<String>) -> Self {
            *self.batches.lock().unwrap() = batches.into();
            self
        }

        fn navigations(&self) -> u32 {
            *self.navigations.lock().unwrap()
        }

        fn scrolls(&self) -> u32 {
            *self.scrolls.lock().unwrap()
        }
    }

    impl PageSession for FakeSession {
        fn disable_cache(&self) -> Result<(), SessionError> {
            *self.cache_disabled.lock().unwrap() = true;
            Ok(())
        }

        fn on_response(&self, callback: ResponseCallback) -> Result<(), SessionError> {
            *self.callback.lock().unwrap() = Some(callback);
            Ok(())
        }

        fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), SessionError> {
            *self.navigations.lock().unwrap() += 1;
            if self.fail_navigation {
                return Err(SessionError::Navigation {
                    url: url.to_string(),
                    source: anyhow::anyhow!("Timeout"),
                });
            }
            *self.current.lock().unwrap() = self.pages.lock().unwrap().pop_front().unwrap_or_default();
            Ok(())
        }

        fn json_scripts(&self) -> Result<Vec<String>, SessionError> {
            if self.fail_scripts {
                return Err(SessionError::Browser(anyhow::anyhow!("tab crashed")));
            }
            Ok(self.current.lock().unwrap().clone())
        }

        fn scroll(&self, _delta_y: f64) -> Result<(), SessionError> {
            *self.scrolls.lock().unwrap() += 1;
            if let Some(body) = self.batches.lock().unwrap().pop_front() {
                if let Some(callback) = self.callback.lock().unwrap().as_ref() {
                    callback("https://static.xx.fbcdn.net/rsrc.php", &|| Ok(String::new()));
                    callback(API_URL, &|| Ok(body.clone()));
                }
                *self.loader_pending.lock().unwrap() = true;
            }
            Ok(())
        }

        fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> bool {
            *self.loader_pending.lock().unwrap()
        }

        fn wait_for_detached(&self, _selector: &str, _timeout: Duration) -> bool {
            *self.loader_pending.lock().unwrap() = false;
            true
        }
    }

    fn fast_config() -> CollectorConfig {
        CollectorConfig {
            retry_delay: Duration::ZERO,
            navigation_timeout: Duration::ZERO,
            loader_appear_timeout: Duration::ZERO,
            loader_detach_timeout: Duration::ZERO,
            settle_delay: Duration::ZERO,
            ..CollectorConfig::default()
        }
    }

    fn feed_json(ids: &[&str]) -> String {
        let edges: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "node": { "collated_results": [{ "ad_archive_id": id }] } }))
            .collect();
        json!({ "require": [{ "ad_library_main": { "search_results_connection": { "edges": edges } } }] })
            .to_string()
    }

    fn ids(groups: &[RawAdGroup]) -> Vec<String> {
        groups
            .iter()
            .flatten()
            .filter_map(|ad| ad["ad_archive_id"].as_str().map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_initial_render_then_scroll_batches() {
        let session = FakeSession::with_pages(vec![vec![feed_json(&["1", "2"])]])
            .with_batches(vec![feed_json(&["3"]), feed_json(&["4"])]);

        let groups = collect_ad_groups(&session, FEED_URL, &fast_config()).await.unwrap();

        assert_eq!(ids(&groups), vec!["1", "2", "3", "4"]);
        assert_eq!(session.navigations(), 1);
        assert_eq!(session.scrolls(), 3);
        assert!(*session.cache_disabled.lock().unwrap());
    }

    #[tokio::test]
    async fn test_marker_found_on_third_attempt() {
        let pages = vec![vec![], vec!["{}".to_string()], vec![feed_json(&["9"])]];
        let session = FakeSession::with_pages(pages);

        let initial = find_init_data_with_retries(&session, FEED_URL, &fast_config()).await.unwrap();

        assert_eq!(ids(&initial.into_groups()), vec!["9"]);
        assert_eq!(session.navigations(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fall_back_to_intercepted_data() {
        let session = FakeSession::default().with_batches(vec![feed_json(&["late"])]);

        let initial = find_init_data_with_retries(&session, FEED_URL, &fast_config()).await.unwrap();
        assert_eq!(initial, InitialLoad::Exhausted);
        assert_eq!(session.navigations(), 5);

        let groups = collect_ad_groups(&session, FEED_URL, &fast_config()).await.unwrap();
        assert_eq!(ids(&groups), vec!["late"]);
    }

    #[tokio::test]
    async fn test_nothing_collected_is_not_an_error() {
        let session = FakeSession::default();
        let groups = collect_ad_groups(&session, FEED_URL, &fast_config()).await.unwrap();
        assert!(groups.is_empty());
        assert_eq!(session.scrolls(), 1);
    }

    #[tokio::test]
    async fn test_navigation_failure_aborts_collection() {
        let session = FakeSession {
            fail_navigation: true,
            ..Default::default()
        };

        let err = collect_ad_groups(&session, FEED_URL, &fast_config()).await.unwrap_err();

        assert!(matches!(err, CollectError::Navigation { .. }));
        assert_eq!(session.navigations(), 1);
        assert_eq!(session.scrolls(), 0);
    }

    #[tokio::test]
    async fn test_unexpected_failure_stops_retrying() {
        let session = FakeSession {
            fail_scripts: true,
            ..Default::default()
        };

        let initial = find_init_data_with_retries(&session, FEED_URL, &fast_config()).await.unwrap();

        assert_eq!(initial, InitialLoad::Failed);
        assert_eq!(session.navigations(), 1);
    }

    #[tokio::test]
    async fn test_missing_edges_is_fatal_for_the_retry_loop() {
        let broken = r#"{"ad_library_main": {"page_info": {}}}"#.to_string();
        let session = FakeSession::with_pages(vec![vec![broken]]);

        let initial = find_init_data_with_retries(&session, FEED_URL, &fast_config()).await.unwrap();

        assert_eq!(initial, InitialLoad::Failed);
        assert_eq!(session.navigations(), 1);
    }

    #[tokio::test]
    async fn test_scroll_loop_is_bounded() {
        let batches = (0..10).map(|i| feed_json(&[i.to_string().as_str()])).collect();
        let session = FakeSession::default().with_batches(batches);
        let config = CollectorConfig {
            max_scrolls: 4,
            ..fast_config()
        };

        let steps = scroll_until_loaded(&session, &config).await.unwrap();

        assert_eq!(steps, 4);
        assert_eq!(session.scrolls(), 4);
    }
}
