//! Browser collaborator boundary.
//!
//! Sessions drive pages exclusively through these traits; the production
//! implementation adapts the headless rendering service, tests substitute
//! fakes. Every failure is an explicit value: `PageError::ContextLost` is
//! the only terminal condition, everything else degrades in place.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use headless_client::{HeadlessClient, RenderOptions, ScreenshotRequest};
use rivalwatch_common::Config;

#[derive(Debug, Error)]
pub enum PageError {
    /// Navigation or interaction failed; the page remains usable.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The browsing context itself is gone. Terminal for the session.
    #[error("browsing context lost: {0}")]
    ContextLost(String),
}

#[derive(Debug, Error)]
#[error("capture failed: {0}")]
pub struct CaptureError(pub String);

/// Read-only snapshot of a materialized page, sufficient for strategy
/// evaluation. Strategies parse and query it; they never touch the live page.
#[derive(Debug, Clone)]
pub struct PageDom {
    pub url: String,
    pub html: String,
}

/// Addresses one element on the current page for element-scoped capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub selector: String,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct NavigateOptions {
    pub wait_until: String,
    pub timeout_ms: u64,
}

impl NavigateOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            wait_until: "domcontentloaded".to_string(),
            timeout_ms: config.nav_timeout_ms,
        }
    }
}

/// One open page in an isolated browsing context.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn navigate(&mut self, url: &str, opts: &NavigateOptions) -> Result<(), PageError>;

    /// Best-effort click on a control (tab, filter, consent banner).
    async fn click(&mut self, selector: &str) -> Result<(), PageError>;

    /// Best-effort scroll, to trigger lazy-loaded content.
    async fn scroll_by(&mut self, pixels: u64) -> Result<(), PageError>;

    /// Give client-rendered content time to appear.
    async fn settle(&mut self, duration: Duration) -> Result<(), PageError>;

    /// Materialize the element tree of the current page.
    async fn dom(&mut self) -> Result<PageDom, PageError>;

    async fn capture_viewport(&mut self) -> Result<Vec<u8>, CaptureError>;

    async fn capture_element(&mut self, handle: &ElementHandle) -> Result<Vec<u8>, CaptureError>;
}

#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a fresh page in its own isolated context.
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>, PageError>;
}

// --- Headless-service implementation ---

/// Browser backed by the headless rendering service. The service renders a
/// snapshot per request, so a page tracks its URL plus pending interactions
/// and replays them when the next snapshot or capture is taken.
pub struct HeadlessBrowser {
    client: Arc<HeadlessClient>,
}

impl HeadlessBrowser {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Arc::new(HeadlessClient::new(
                &config.headless_url,
                config.headless_token.as_deref(),
            )),
        }
    }
}

#[async_trait]
impl Browser for HeadlessBrowser {
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>, PageError> {
        Ok(Box::new(HeadlessPage {
            client: self.client.clone(),
            state: None,
        }))
    }
}

struct PageState {
    url: String,
    nav: NavigateOptions,
    /// Cached rendered DOM; cleared whenever a pending interaction is added.
    html: Option<String>,
    click_selectors: Vec<String>,
    scroll_px: u64,
    settle_ms: u64,
}

impl PageState {
    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            wait_until: self.nav.wait_until.clone(),
            timeout_ms: self.nav.timeout_ms,
            settle_ms: self.settle_ms,
            click_selectors: self.click_selectors.clone(),
            scroll_px: self.scroll_px,
        }
    }
}

struct HeadlessPage {
    client: Arc<HeadlessClient>,
    state: Option<PageState>,
}

impl HeadlessPage {
    fn state_mut(&mut self) -> Result<&mut PageState, PageError> {
        self.state
            .as_mut()
            .ok_or_else(|| PageError::Navigation("no page loaded".to_string()))
    }
}

/// The service being unreachable means the context is unusable; an API-level
/// failure (e.g. navigation timeout inside the service) is recoverable.
fn page_error(err: headless_client::HeadlessError) -> PageError {
    match err {
        headless_client::HeadlessError::Network(msg) => PageError::ContextLost(msg),
        api @ headless_client::HeadlessError::Api { .. } => PageError::Navigation(api.to_string()),
    }
}

#[async_trait]
impl BrowserPage for HeadlessPage {
    async fn navigate(&mut self, url: &str, opts: &NavigateOptions) -> Result<(), PageError> {
        let render = RenderOptions {
            wait_until: opts.wait_until.clone(),
            timeout_ms: opts.timeout_ms,
            ..RenderOptions::default()
        };
        let html = self
            .client
            .content(url, &render)
            .await
            .map_err(page_error)?;
        self.state = Some(PageState {
            url: url.to_string(),
            nav: opts.clone(),
            html: Some(html),
            click_selectors: Vec::new(),
            scroll_px: 0,
            settle_ms: 0,
        });
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), PageError> {
        let state = self.state_mut()?;
        state.click_selectors.push(selector.to_string());
        state.html = None;
        Ok(())
    }

    async fn scroll_by(&mut self, pixels: u64) -> Result<(), PageError> {
        let state = self.state_mut()?;
        state.scroll_px += pixels;
        state.html = None;
        Ok(())
    }

    async fn settle(&mut self, duration: Duration) -> Result<(), PageError> {
        let state = self.state_mut()?;
        state.settle_ms += duration.as_millis() as u64;
        state.html = None;
        Ok(())
    }

    async fn dom(&mut self) -> Result<PageDom, PageError> {
        let client = self.client.clone();
        let state = self.state_mut()?;
        let html = match &state.html {
            Some(html) => html.clone(),
            None => {
                let html = client
                    .content(&state.url, &state.render_options())
                    .await
                    .map_err(page_error)?;
                state.html = Some(html.clone());
                html
            }
        };
        Ok(PageDom {
            url: state.url.clone(),
            html,
        })
    }

    async fn capture_viewport(&mut self) -> Result<Vec<u8>, CaptureError> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| CaptureError("no page loaded".to_string()))?;
        let req = ScreenshotRequest {
            selector: None,
            selector_index: 0,
            full_page: false,
            render: state.render_options(),
        };
        self.client
            .screenshot(&state.url, &req)
            .await
            .map_err(|e| CaptureError(e.to_string()))
    }

    async fn capture_element(&mut self, handle: &ElementHandle) -> Result<Vec<u8>, CaptureError> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| CaptureError("no page loaded".to_string()))?;
        let req = ScreenshotRequest {
            selector: Some(handle.selector.clone()),
            selector_index: handle.index,
            full_page: false,
            render: state.render_options(),
        };
        self.client
            .screenshot(&state.url, &req)
            .await
            .map_err(|e| CaptureError(e.to_string()))
    }
}
