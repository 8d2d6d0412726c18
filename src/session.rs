//! Page session boundary.
//!
//! The crawl loop only needs a handful of browser capabilities; they are
//! gathered in [`PageSession`] so the retry controller and scroll loop can run
//! against a scripted fake in tests. [`ChromeSession`] is the real thing.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use headless_chrome::protocol::cdp::Input::{
    DispatchMouseEvent, DispatchMouseEventPointer_TypeOption, DispatchMouseEventTypeOption,
};
use headless_chrome::{Browser, LaunchOptions, Tab};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::config::{ACCEPT_LANGUAGE, BROWSER_LOCALE, JSON_SCRIPT_SELECTOR};
use crate::error::SessionError;
use crate::stealth;

/// Called for every network response: target URL plus a lazy body reader.
pub type ResponseCallback = Box<dyn Fn(&str, &dyn Fn() -> anyhow::Result<String>) + Send + Sync>;

pub trait PageSession {
    /// Rewrite outgoing request headers so nothing is served from cache.
    fn disable_cache(&self) -> Result<(), SessionError>;

    /// Register the observer invoked for each network response.
    fn on_response(&self, callback: ResponseCallback) -> Result<(), SessionError>;

    /// Navigate and block until the page load completes or `timeout` passes.
    fn navigate(&self, url: &str, timeout: Duration) -> Result<(), SessionError>;

    /// Text content of every `script[type="application/json"]` element.
    fn json_scripts(&self) -> Result<Vec<String>, SessionError>;

    /// Scroll the page to trigger the next lazy-loaded batch.
    fn scroll(&self, delta_y: f64) -> Result<(), SessionError>;

    /// `true` once `selector` matches, `false` on timeout.
    fn wait_for_selector(&self, selector: &str, timeout: Duration) -> bool;

    /// `true` once `selector` no longer matches, `false` on timeout.
    fn wait_for_detached(&self, selector: &str, timeout: Duration) -> bool;
}

static JSON_SCRIPT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(JSON_SCRIPT_SELECTOR).expect("static selector is valid"));

/// Collect the bodies of JSON script tags from a rendered document.
pub fn json_script_texts(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&JSON_SCRIPT)
        .map(|el| el.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
        .collect()
}

const RESPONSE_HANDLER_NAME: &str = "ad-library-feed";
const TAB_DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const DETACH_POLL_INTERVAL: Duration = Duration::from_millis(100);
const BROWSER_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Headless Chrome tab driven over CDP.
pub struct ChromeSession {
    // Dropping the browser kills the Chrome process.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    pub fn launch() -> Result<Self, SessionError> {
        let user_agent = stealth::pick_user_agent();
        info!("Using User-Agent: {}", user_agent);

        let switches = stealth::launch_args(user_agent);
        let args: Vec<&OsStr> = switches.iter().map(OsStr::new).collect();

        let browser = Browser::new(LaunchOptions {
            headless: true,
            window_size: Some((1920, 1080)),
            idle_browser_timeout: BROWSER_IDLE_TIMEOUT,
            args,
            ..Default::default()
        })?;

        let tab = browser.new_tab()?;
        stealth::harden_tab(&tab, BROWSER_LOCALE)?;

        Ok(Self { _browser: browser, tab })
    }
}

impl PageSession for ChromeSession {
    fn disable_cache(&self) -> Result<(), SessionError> {
        let headers = HashMap::from([("Cache-Control", "no-cache"), ("Accept-Language", ACCEPT_LANGUAGE)]);
        self.tab.set_extra_http_headers(headers)?;
        Ok(())
    }

    fn on_response(&self, callback: ResponseCallback) -> Result<(), SessionError> {
        self.tab.register_response_handling(
            RESPONSE_HANDLER_NAME,
            Box::new(move |params, fetch_body| {
                let url = params.response.url.clone();
                callback(&url, &|| {
                    let body = fetch_body()?;
                    if body.base_64_encoded {
                        return Err(anyhow!("binary response body"));
                    }
                    Ok(body.body)
                });
            }),
        )?;
        Ok(())
    }

    fn navigate(&self, url: &str, timeout: Duration) -> Result<(), SessionError> {
        self.tab.set_default_timeout(timeout);
        let result = self
            .tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ());
        self.tab.set_default_timeout(TAB_DEFAULT_TIMEOUT);

        result.map_err(|source| SessionError::Navigation {
            url: url.to_string(),
            source,
        })
    }

    fn json_scripts(&self) -> Result<Vec<String>, SessionError> {
        let html = self.tab.get_content()?;
        Ok(json_script_texts(&html))
    }

    fn scroll(&self, delta_y: f64) -> Result<(), SessionError> {
        self.tab.call_method(DispatchMouseEvent {
            Type: DispatchMouseEventTypeOption::MouseWheel,
            x: 100.0,
            y: 100.0,
            button: None,
            buttons: None,
            modifiers: None,
            timestamp: None,
            delta_x: Some(0.0),
            delta_y: Some(delta_y),
            pointer_Type: Some(DispatchMouseEventPointer_TypeOption::Mouse),
            force: None,
            tangential_pressure: None,
            tilt_x: None,
            tilt_y: None,
            twist: None,
            click_count: None,
        })?;
        Ok(())
    }

    fn wait_for_selector(&self, selector: &str, timeout: Duration) -> bool {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .is_ok()
    }

    fn wait_for_detached(&self, selector: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.tab.find_element(selector).is_err() {
                return true;
            }
            if Instant::now() >= deadline {
                debug!(selector, "Element still attached after {:?}", timeout);
                return false;
            }
            std::thread::sleep(DETACH_POLL_INTERVAL);
        }
    }
}
