//! Shared fakes for session and aggregation tests.
//!
//! `FakeBrowser` scripts navigation outcomes per URL and capture behavior
//! per page, so tests can drive every degradation path without a rendering
//! service.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use rivalwatch_common::Config;
use rivalwatch_scout::browser::{
    Browser, BrowserPage, CaptureError, ElementHandle, NavigateOptions, PageDom, PageError,
};
use rivalwatch_scout::cascade::{CardRule, ExtractionRule};
use rivalwatch_scout::sources::{PagePlan, SourceProfile};

// --- Fixture pages ---

pub const PROMO_HTML: &str = r#"
    <html><body>
        <ul class="promo-list">
            <li><strong>Half Price First Month</strong><a href="/events/1">detail</a></li>
            <li><strong>half  price first month</strong><a href="/events/1b">detail</a></li>
            <li><strong>Free Installation</strong><a href="/events/2">detail</a></li>
        </ul>
    </body></html>
"#;

pub const PRODUCT_HTML: &str = r#"
    <html><body>
        <div class="product-grid">
            <div class="item"><p class="name">Slim Purifier</p><span class="price">월 31,900원</span></div>
            <div class="item"><p class="name">Tower Purifier</p><span class="price">월 27,900원</span></div>
        </div>
    </body></html>
"#;

// --- Fake browser ---

#[derive(Clone)]
pub enum NavOutcome {
    Html(&'static str),
    Timeout,
    ContextLost,
}

#[derive(Clone, Default)]
pub struct PageBehavior {
    /// Navigation outcome per URL. Unknown URLs fail navigation.
    pub nav: HashMap<String, NavOutcome>,
    pub click_fails: bool,
    pub element_capture_fails: bool,
    pub viewport_capture_fails: bool,
}

impl PageBehavior {
    pub fn with_nav(mut self, url: &str, outcome: NavOutcome) -> Self {
        self.nav.insert(url.to_string(), outcome);
        self
    }
}

pub struct FakeBrowser {
    behavior: Arc<PageBehavior>,
    fail_open: bool,
}

impl FakeBrowser {
    pub fn new(behavior: PageBehavior) -> Self {
        Self {
            behavior: Arc::new(behavior),
            fail_open: false,
        }
    }

    /// A browser whose contexts cannot even be opened.
    pub fn broken() -> Self {
        Self {
            behavior: Arc::new(PageBehavior::default()),
            fail_open: true,
        }
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>, PageError> {
        if self.fail_open {
            return Err(PageError::ContextLost("browser exited".to_string()));
        }
        Ok(Box::new(FakePage {
            behavior: self.behavior.clone(),
            current: None,
        }))
    }
}

struct FakePage {
    behavior: Arc<PageBehavior>,
    current: Option<(String, String)>,
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn navigate(&mut self, url: &str, _opts: &NavigateOptions) -> Result<(), PageError> {
        match self.behavior.nav.get(url) {
            Some(NavOutcome::Html(html)) => {
                self.current = Some((url.to_string(), html.to_string()));
                Ok(())
            }
            Some(NavOutcome::Timeout) => Err(PageError::Navigation(
                "Navigation timeout of 60000 ms exceeded".to_string(),
            )),
            Some(NavOutcome::ContextLost) => Err(PageError::ContextLost(
                "browsing context was destroyed".to_string(),
            )),
            None => Err(PageError::Navigation(format!("unexpected url {url}"))),
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), PageError> {
        if self.behavior.click_fails {
            Err(PageError::Navigation(format!("no element matches {selector}")))
        } else {
            Ok(())
        }
    }

    async fn scroll_by(&mut self, _pixels: u64) -> Result<(), PageError> {
        Ok(())
    }

    async fn settle(&mut self, _duration: Duration) -> Result<(), PageError> {
        Ok(())
    }

    async fn dom(&mut self) -> Result<PageDom, PageError> {
        match &self.current {
            Some((url, html)) => Ok(PageDom {
                url: url.clone(),
                html: html.clone(),
            }),
            None => Err(PageError::Navigation("no page loaded".to_string())),
        }
    }

    async fn capture_viewport(&mut self) -> Result<Vec<u8>, CaptureError> {
        if self.behavior.viewport_capture_fails {
            Err(CaptureError("viewport capture refused".to_string()))
        } else {
            Ok(b"fake-viewport-png".to_vec())
        }
    }

    async fn capture_element(&mut self, _handle: &ElementHandle) -> Result<Vec<u8>, CaptureError> {
        if self.behavior.element_capture_fails {
            Err(CaptureError("element not visible".to_string()))
        } else {
            Ok(b"fake-element-png".to_vec())
        }
    }
}

// --- Profiles and config ---

/// A minimal profile whose rules match the fixture pages above.
pub fn test_profile(
    id: &'static str,
    promo_url: &'static str,
    product_url: &'static str,
) -> SourceProfile {
    SourceProfile {
        id,
        label: id,
        promotions: PagePlan {
            label: "promotions",
            url: promo_url,
            choreography: vec![],
            rules: vec![ExtractionRule::Cards(CardRule {
                name: "promo_cards",
                container: ".promo-list li",
                title: "strong",
                link: Some("a"),
                ..CardRule::default()
            })],
        },
        products: PagePlan {
            label: "products",
            url: product_url,
            choreography: vec![],
            rules: vec![ExtractionRule::Cards(CardRule {
                name: "product_cards",
                container: ".product-grid .item",
                title: ".name",
                price: Some(".price"),
                ..CardRule::default()
            })],
        },
    }
}

pub fn test_config(screenshot_dir: &std::path::Path) -> Config {
    Config {
        headless_url: "http://unused.test".to_string(),
        headless_token: None,
        data_dir: "data".to_string(),
        screenshot_dir: screenshot_dir.to_string_lossy().into_owned(),
        nav_timeout_ms: 1_000,
        settle_ms: 0,
        capture_timeout_ms: 500,
        max_concurrent_sessions: 4,
    }
}
