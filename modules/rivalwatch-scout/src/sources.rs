//! Per-site scrape configuration.
//!
//! Selector lists are configuration data and drift as the target pages
//! change; the cascade keeps extraction alive when they do. Order matters:
//! most-specific structured rules first, the generic text scan last.

use crate::cascade::{CardRule, ExtractionRule, TextScanRule};

/// Korean rental pricing as quoted on both target sites ("월 9,900원").
const KRW_MONTHLY_PATTERN: &str = r"월\s*[\d,]+\s*원";

/// Best-effort page interaction executed between navigation and extraction.
#[derive(Debug, Clone)]
pub enum ChoreoStep {
    Click(&'static str),
    ScrollBy(u64),
    SettleMs(u64),
}

impl ChoreoStep {
    pub fn describe(&self) -> String {
        match self {
            ChoreoStep::Click(selector) => format!("click {selector}"),
            ChoreoStep::ScrollBy(px) => format!("scroll {px}px"),
            ChoreoStep::SettleMs(ms) => format!("settle {ms}ms"),
        }
    }
}

/// One logical page visit: where to go, how to coax the content out, and
/// the extraction cascade to run on the materialized tree.
pub struct PagePlan {
    pub label: &'static str,
    pub url: &'static str,
    pub choreography: Vec<ChoreoStep>,
    pub rules: Vec<ExtractionRule>,
}

/// Everything one source session needs: a promotions page and a products page.
pub struct SourceProfile {
    pub id: &'static str,
    pub label: &'static str,
    pub promotions: PagePlan,
    pub products: PagePlan,
}

/// All configured competitor sources.
pub fn profiles() -> Vec<SourceProfile> {
    vec![lg_profile(), samsung_profile()]
}

/// Look up one configured source by id.
pub fn profile(id: &str) -> Option<SourceProfile> {
    profiles().into_iter().find(|p| p.id == id)
}

// ---------------------------------------------------------------------------
// LG care solutions
// ---------------------------------------------------------------------------

fn lg_profile() -> SourceProfile {
    SourceProfile {
        id: "lg",
        label: "LG Care Solutions",
        promotions: PagePlan {
            label: "promotions",
            url: "https://www.lge.co.kr/benefits",
            choreography: vec![],
            rules: vec![
                ExtractionRule::Cards(CardRule {
                    name: "benefit_board",
                    container: ".board-list-box li, .event_list li, .list-item",
                    title: ".tit, .title, .subject, strong",
                    period: Some(".date, .period, .data"),
                    link: Some("a"),
                    ..CardRule::default()
                }),
                ExtractionRule::TextScan(TextScanRule {
                    name: "benefit_text_scan",
                    block: "li, article",
                    pattern: r"(?:이벤트|혜택|할인|0원|반값)",
                    title_keywords: &[],
                    max_items: Some(10),
                }),
            ],
        },
        products: PagePlan {
            label: "products",
            url: "https://www.lge.co.kr/care-solutions/water-purifiers",
            choreography: vec![
                ChoreoStep::ScrollBy(1000),
                ChoreoStep::SettleMs(1000),
                ChoreoStep::ScrollBy(1000),
                ChoreoStep::SettleMs(1000),
            ],
            rules: vec![
                ExtractionRule::Cards(CardRule {
                    name: "item_cards",
                    container: "div[class*='item'], li[class*='item']",
                    title: ".name, .tit, p[class*='name']",
                    price: Some(".price, .total-price, .monthly-cost"),
                    price_pattern: Some(KRW_MONTHLY_PATTERN),
                    specs: Some("ul.spec li, .info li"),
                    title_keywords: &["정수기"],
                    ..CardRule::default()
                }),
                ExtractionRule::TextScan(TextScanRule {
                    name: "priced_text_scan",
                    block: "li, div",
                    pattern: KRW_MONTHLY_PATTERN,
                    title_keywords: &["정수기"],
                    max_items: Some(20),
                }),
            ],
        },
    }
}

// ---------------------------------------------------------------------------
// Samsung AI subscription
// ---------------------------------------------------------------------------

fn samsung_profile() -> SourceProfile {
    SourceProfile {
        id: "samsung",
        label: "Samsung AI Subscription",
        promotions: PagePlan {
            label: "promotions",
            url: "https://www.samsung.com/sec/ai-subs/",
            // The benefit-collection tab only exists during some campaigns;
            // a failed click is a diagnostic, not a stage failure.
            choreography: vec![
                ChoreoStep::Click(".tab-benefit-collection, [data-tab='benefit']"),
                ChoreoStep::SettleMs(2000),
            ],
            rules: vec![
                ExtractionRule::Cards(CardRule {
                    name: "swiper_cards",
                    container: ".swiper-slide .card, .benefit-list li",
                    title: ".tit, .title, strong",
                    description: Some(".desc, .sub-tit, p"),
                    link: Some("a"),
                    max_items: Some(5),
                    ..CardRule::default()
                }),
                ExtractionRule::TextScan(TextScanRule {
                    name: "banner_text_scan",
                    block: ".swiper-slide, .banner",
                    pattern: r"(?:구독|혜택|할인)",
                    title_keywords: &[],
                    max_items: Some(5),
                }),
            ],
        },
        products: PagePlan {
            label: "products",
            url: "https://www.samsung.com/sec/ai-subs-kitchen/all-ai-subs-kitchen/",
            choreography: vec![
                ChoreoStep::Click(".pf-s-nav-item"),
                ChoreoStep::SettleMs(3000),
                ChoreoStep::ScrollBy(1000),
                ChoreoStep::SettleMs(1000),
            ],
            rules: vec![
                ExtractionRule::Cards(CardRule {
                    name: "pf_product_cards",
                    container: ".pf-product-card, .card-product",
                    title: ".name, .tit, .model-name",
                    price_pattern: Some(KRW_MONTHLY_PATTERN),
                    title_keywords: &["정수기", "Bespoke"],
                    ..CardRule::default()
                }),
                ExtractionRule::TextScan(TextScanRule {
                    name: "priced_text_scan",
                    block: "li, div",
                    pattern: KRW_MONTHLY_PATTERN,
                    title_keywords: &["정수기", "Bespoke"],
                    max_items: Some(20),
                }),
            ],
        },
    }
}
