//! Browser hardening for the Ad Library page.
//!
//! The feed refuses to render for obviously automated browsers, so every tab
//! gets a rotated desktop user agent, an en-US locale and an evasion script
//! that runs before any page script.

use std::sync::Arc;

use anyhow::Result;
use headless_chrome::protocol::cdp::Emulation::SetLocaleOverride;
use headless_chrome::protocol::cdp::Page::AddScriptToEvaluateOnNewDocument;
use headless_chrome::Tab;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;

const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

static USER_AGENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/123.0.0.0 Safari/537.36",
    ]
});

/// Pick a desktop Chromium user agent for this run.
pub fn pick_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_USER_AGENT)
}

/// Evasion script injected via `Page.addScriptToEvaluateOnNewDocument`.
pub fn get_stealth_script() -> &'static str {
    r#"
        // 1. Remove navigator.webdriver
        Object.defineProperty(navigator, 'webdriver', {
            get: () => undefined,
        });

        // 2. Languages consistent with the Accept-Language header
        Object.defineProperty(navigator, 'languages', {
            get: () => ['en-US', 'en'],
        });

        // 3. Chrome runtime (headless builds lack it)
        window.chrome = {
            runtime: {},
            loadTimes: function() {},
            csi: function() {},
            app: {}
        };

        // 4. Notifications permission reports the real state instead of 'prompt'
        const originalQuery = window.navigator.permissions.query;
        window.navigator.permissions.query = (parameters) => (
            parameters.name === 'notifications' ?
            Promise.resolve({ state: Notification.permission }) :
            originalQuery(parameters)
        );

        // 5. WebGL vendor
        const getParameter = WebGLRenderingContext.prototype.getParameter;
        WebGLRenderingContext.prototype.getParameter = function(parameter) {
            if (parameter === 37445) return 'Intel Inc.';
            if (parameter === 37446) return 'Intel Iris OpenGL Engine';
            return getParameter.apply(this, [parameter]);
        };
    "#
}

/// Chrome command-line switches for an automated but unremarkable browser.
pub fn launch_args(user_agent: &str) -> Vec<String> {
    vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-infobars".to_string(),
        "--incognito".to_string(),
        "--lang=en-US".to_string(),
        format!("--user-agent={}", user_agent),
    ]
}

/// Inject the evasion script and pin the locale before the first navigation.
pub fn harden_tab(tab: &Arc<Tab>, locale: &str) -> Result<()> {
    tab.enable_debugger()?;
    tab.call_method(AddScriptToEvaluateOnNewDocument {
        source: get_stealth_script().to_string(),
        world_name: None,
        include_command_line_api: None,
        run_immediately: None,
    })?;
    tab.call_method(SetLocaleOverride {
        locale: Some(locale.to_string()),
    })?;
    Ok(())
}
