//! Response interceptor for ad batches loaded while scrolling.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use tracing::{debug, error, info};

use crate::config::{API_URL_FRAGMENT, INIT_DATA_KEY};
use crate::locator::{edges_of, find_marker_in_text, parse_edges, RawAdGroup};

/// Append-only collection of ad groups shared between the response callback
/// and the crawl loop. Cloning hands out another handle to the same list.
#[derive(Debug, Clone, Default)]
pub struct AdAccumulator {
    groups: Arc<Mutex<Vec<RawAdGroup>>>,
}

impl AdAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RawAdGroup>> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn extend<I: IntoIterator<Item = RawAdGroup>>(&self, groups: I) {
        self.lock().extend(groups);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of everything collected so far, in arrival order.
    pub fn snapshot(&self) -> Vec<RawAdGroup> {
        self.lock().clone()
    }
}

/// Pulls ad groups out of feed API responses and appends them to an accumulator.
#[derive(Debug, Clone)]
pub struct ResponseInterceptor {
    sink: AdAccumulator,
}

impl ResponseInterceptor {
    pub fn new(sink: AdAccumulator) -> Self {
        Self { sink }
    }

    /// Inspect one observed response. `body` is only called for feed API URLs.
    ///
    /// Returns the number of ad groups appended. Unreadable bodies and bodies
    /// without the marker are skipped.
    pub fn handle_response(&self, url: &str, body: &dyn Fn() -> Result<String>) -> usize {
        if !url.contains(API_URL_FRAGMENT) {
            return 0;
        }

        let text = match body() {
            Ok(text) => text,
            Err(e) => {
                debug!(url, "Couldn't read response body: {}", e);
                return 0;
            }
        };

        let groups = match groups_from_body(&text) {
            Some(groups) => groups,
            None => return 0,
        };

        let count = groups.len();
        if count > 0 {
            self.sink.extend(groups);
            info!("Intercepted {} ad groups ({} total)", count, self.sink.len());
        }
        count
    }
}

/// Extract ad groups from a response body, or `None` when it carries no marker.
pub fn groups_from_body(body: &str) -> Option<Vec<RawAdGroup>> {
    let ad_search_data = find_marker_in_text(body, INIT_DATA_KEY)?;

    match edges_of(&ad_search_data) {
        Ok(edges) => Some(parse_edges(edges)),
        Err(_) => {
            error!("Couldn't find edges in response {}", ad_search_data);
            None
        }
    }
}
