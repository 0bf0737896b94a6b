//! Selector cascade — ordered extraction strategies over a page snapshot.
//!
//! Each strategy is a value evaluated against an immutable `PageDom`. The
//! resolver returns the first strategy whose result is non-empty; a strategy
//! that fails internally (malformed selector, bad pattern) counts as empty
//! and the cascade falls through. Results are never merged across
//! strategies.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::browser::{ElementHandle, PageDom};

// --- Rules ---

/// One extraction strategy. Ordered most-specific first in configuration;
/// `TextScan` is the generic, noisy fallback and belongs last.
pub enum ExtractionRule {
    Cards(CardRule),
    TextScan(TextScanRule),
}

impl ExtractionRule {
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionRule::Cards(rule) => rule.name,
            ExtractionRule::TextScan(rule) => rule.name,
        }
    }
}

/// Structured extraction: a container selector plus per-field selectors
/// scoped to each container match.
pub struct CardRule {
    pub name: &'static str,
    pub container: &'static str,
    pub title: &'static str,
    pub description: Option<&'static str>,
    pub period: Option<&'static str>,
    pub link: Option<&'static str>,
    pub price: Option<&'static str>,
    pub specs: Option<&'static str>,
    /// Regex fallback applied to the card's text when no price selector matches.
    pub price_pattern: Option<&'static str>,
    /// Keep only cards whose title contains one of these. Empty keeps all.
    pub title_keywords: &'static [&'static str],
    pub max_items: Option<usize>,
}

impl Default for CardRule {
    fn default() -> Self {
        Self {
            name: "cards",
            container: "li",
            title: ".title",
            description: None,
            period: None,
            link: None,
            price: None,
            specs: None,
            price_pattern: None,
            title_keywords: &[],
            max_items: None,
        }
    }
}

/// Generic fallback: scan coarse text blocks for a pattern. Noisier than
/// structured cards; candidates carry no element handle.
pub struct TextScanRule {
    pub name: &'static str,
    /// Coarse block selector, e.g. `"li, article"`.
    pub block: &'static str,
    /// Pattern the block's text must contain; the match is kept as the raw price.
    pub pattern: &'static str,
    pub title_keywords: &'static [&'static str],
    pub max_items: Option<usize>,
}

// --- Candidates ---

/// Raw record produced by one strategy. Field normalization happens later.
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub title: String,
    pub description: Option<String>,
    pub period: Option<String>,
    pub link: Option<String>,
    pub raw_price: Option<String>,
    pub specs: Vec<String>,
    /// Set when the strategy can address the element this candidate came
    /// from; used for element-scoped evidence capture.
    pub handle: Option<ElementHandle>,
}

/// What the cascade produced, plus which strategies it went through.
pub struct CascadeOutcome {
    pub candidates: Vec<Candidate>,
    pub strategy_used: Option<String>,
    pub attempted: Vec<String>,
    /// (strategy, reason) for strategies that failed internally.
    pub failures: Vec<(String, String)>,
}

// --- Resolver ---

/// Evaluate strategies in order and return the first non-empty result.
/// All-empty is not an error: the outcome carries an empty candidate list
/// and the full attempted list for diagnostics.
pub fn resolve(dom: &PageDom, rules: &[ExtractionRule]) -> CascadeOutcome {
    let document = Html::parse_document(&dom.html);
    let mut attempted = Vec::new();
    let mut failures = Vec::new();

    for rule in rules {
        attempted.push(rule.name().to_string());
        match evaluate(&document, &dom.url, rule) {
            Ok(candidates) if !candidates.is_empty() => {
                debug!(
                    strategy = rule.name(),
                    count = candidates.len(),
                    url = %dom.url,
                    "Cascade strategy produced candidates"
                );
                return CascadeOutcome {
                    candidates,
                    strategy_used: Some(rule.name().to_string()),
                    attempted,
                    failures,
                };
            }
            Ok(_) => {}
            Err(reason) => {
                warn!(strategy = rule.name(), reason = %reason, "Extraction strategy failed, falling through");
                failures.push((rule.name().to_string(), reason));
            }
        }
    }

    CascadeOutcome {
        candidates: Vec::new(),
        strategy_used: None,
        attempted,
        failures,
    }
}

fn evaluate(document: &Html, base_url: &str, rule: &ExtractionRule) -> Result<Vec<Candidate>, String> {
    match rule {
        ExtractionRule::Cards(rule) => evaluate_cards(document, base_url, rule),
        ExtractionRule::TextScan(rule) => evaluate_text_scan(document, rule),
    }
}

fn evaluate_cards(document: &Html, base_url: &str, rule: &CardRule) -> Result<Vec<Candidate>, String> {
    let container = parse_selector(rule.container)?;
    let title = parse_selector(rule.title)?;
    let description = rule.description.map(parse_selector).transpose()?;
    let period = rule.period.map(parse_selector).transpose()?;
    let link = rule.link.map(parse_selector).transpose()?;
    let price = rule.price.map(parse_selector).transpose()?;
    let specs = rule.specs.map(parse_selector).transpose()?;
    let price_pattern = rule
        .price_pattern
        .map(|p| Regex::new(p).map_err(|e| format!("invalid price pattern: {e}")))
        .transpose()?;

    let mut candidates = Vec::new();
    for (index, card) in document.select(&container).enumerate() {
        if let Some(max) = rule.max_items {
            if candidates.len() >= max {
                break;
            }
        }

        let Some(card_title) = select_text(&card, &title) else {
            continue;
        };
        if !rule.title_keywords.is_empty()
            && !rule.title_keywords.iter().any(|kw| card_title.contains(kw))
        {
            continue;
        }

        let raw_price = price
            .as_ref()
            .and_then(|sel| select_text(&card, sel))
            .or_else(|| {
                price_pattern.as_ref().and_then(|re| {
                    re.find(&element_text(&card))
                        .map(|m| m.as_str().trim().to_string())
                })
            });

        candidates.push(Candidate {
            title: card_title,
            description: description.as_ref().and_then(|sel| select_text(&card, sel)),
            period: period.as_ref().and_then(|sel| select_text(&card, sel)),
            link: first_href(&card, link.as_ref(), base_url),
            raw_price,
            specs: specs
                .as_ref()
                .map(|sel| {
                    card.select(sel)
                        .map(|el| element_text(&el))
                        .filter(|text| !text.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            handle: Some(ElementHandle {
                selector: rule.container.to_string(),
                index,
            }),
        });
    }

    Ok(candidates)
}

fn evaluate_text_scan(document: &Html, rule: &TextScanRule) -> Result<Vec<Candidate>, String> {
    let block = parse_selector(rule.block)?;
    let pattern = Regex::new(rule.pattern).map_err(|e| format!("invalid scan pattern: {e}"))?;

    let mut candidates = Vec::new();
    for element in document.select(&block) {
        if let Some(max) = rule.max_items {
            if candidates.len() >= max {
                break;
            }
        }

        let pieces: Vec<String> = element
            .text()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let Some(block_title) = pieces.first().cloned() else {
            continue;
        };
        if !rule.title_keywords.is_empty()
            && !rule.title_keywords.iter().any(|kw| block_title.contains(kw))
        {
            continue;
        }

        let text = pieces.join(" ");
        let Some(found) = pattern.find(&text) else {
            continue;
        };
        // The match is only a price when it actually carries an amount; a
        // keyword-pattern match just qualifies the block.
        let matched = found.as_str().trim().to_string();
        let raw_price = matched.chars().any(|c| c.is_ascii_digit()).then_some(matched);

        let description: String = pieces[1..].join(" ").chars().take(120).collect();
        candidates.push(Candidate {
            title: block_title,
            description: (!description.is_empty()).then_some(description),
            raw_price,
            ..Candidate::default()
        });
    }

    Ok(candidates)
}

// --- Element helpers ---

fn parse_selector(raw: &str) -> Result<Selector, String> {
    Selector::parse(raw).map_err(|_| format!("invalid selector {raw:?}"))
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn select_text(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
}

/// First usable href under the card, resolved against the page URL.
fn first_href(card: &ElementRef, selector: Option<&Selector>, base_url: &str) -> Option<String> {
    let anchors = Selector::parse("a[href]").expect("valid anchor selector");
    let selector = selector.unwrap_or(&anchors);
    let href = card
        .select(selector)
        .find_map(|el| el.value().attr("href"))
        .map(str::trim)?;

    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
    {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    Url::parse(base_url).ok()?.join(href).ok().map(|u| u.to_string())
}
