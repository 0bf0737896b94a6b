pub mod error;

pub use error::{HeadlessError, Result};

use std::time::Duration;

/// How long to wait for navigation before the service gives up on a page.
pub const DEFAULT_NAV_TIMEOUT_MS: u64 = 60_000;

/// Render options forwarded to the service. Clicks and scrolling run after
/// the page load event, before the DOM or screenshot is captured.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Page lifecycle event to wait for ("domcontentloaded", "load", "networkidle0").
    pub wait_until: String,
    /// Navigation timeout in milliseconds.
    pub timeout_ms: u64,
    /// Extra settle time after load and interactions, for client-rendered content.
    pub settle_ms: u64,
    /// Selectors clicked in order once the page has loaded (best-effort).
    pub click_selectors: Vec<String>,
    /// Pixels scrolled down after load, for lazy-loaded content.
    pub scroll_px: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            wait_until: "domcontentloaded".to_string(),
            timeout_ms: DEFAULT_NAV_TIMEOUT_MS,
            settle_ms: 0,
            click_selectors: Vec::new(),
            scroll_px: 0,
        }
    }
}

/// Screenshot request. Without a selector the service captures the viewport;
/// with one it clips to the `selector_index`-th matching element.
#[derive(Debug, Clone, Default)]
pub struct ScreenshotRequest {
    pub selector: Option<String>,
    pub selector_index: usize,
    pub full_page: bool,
    pub render: RenderOptions,
}

pub struct HeadlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HeadlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}{}", self.base_url, path);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    fn render_body(url: &str, opts: &RenderOptions) -> serde_json::Value {
        serde_json::json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": opts.wait_until,
                "timeout": opts.timeout_ms,
            },
            "waitForTimeout": opts.settle_ms,
            "clickSelectors": opts.click_selectors,
            "scrollPx": opts.scroll_px,
        })
    }

    /// Fetch fully-rendered HTML for a URL via the `/content` endpoint.
    pub async fn content(&self, url: &str, opts: &RenderOptions) -> Result<String> {
        let body = Self::render_body(url, opts);

        let resp = self
            .client
            .post(self.endpoint("/content"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(HeadlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }

    /// Capture a PNG via the `/screenshot` endpoint, viewport- or element-scoped.
    pub async fn screenshot(&self, url: &str, req: &ScreenshotRequest) -> Result<Vec<u8>> {
        let mut body = Self::render_body(url, &req.render);
        body["options"] = serde_json::json!({
            "type": "png",
            "fullPage": req.full_page,
        });
        if let Some(ref selector) = req.selector {
            body["selector"] = serde_json::Value::String(selector.clone());
            body["selectorIndex"] = serde_json::Value::from(req.selector_index);
        }

        let resp = self
            .client
            .post(self.endpoint("/screenshot"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(HeadlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }
}
