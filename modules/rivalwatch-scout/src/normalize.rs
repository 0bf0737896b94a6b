//! Field normalization — raw scraped text to canonical typed values.
//!
//! Every function here is total: any input string, including empty, maps to
//! a defined output. An unparseable price yields `None`, which callers treat
//! as "unparsed", distinct from a price that was never extracted.

use std::sync::LazyLock;

use regex::Regex;

use rivalwatch_common::{NormalizedPrice, PricePeriod};

/// First currency-amount pattern in free text: a prefixed symbol amount
/// (`$29.99`, `₩9,900`) or a won-suffixed amount (`9,900원`).
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(?P<sym>[$€£¥₩])\s*(?P<sym_amt>\d[\d,]*(?:\.\d{1,2})?))|(?:(?P<won_amt>\d[\d,]*)\s*원)")
        .expect("valid price regex")
});

static MONTHLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)월\s*\d|매월|/\s*(?:mo|month|월)\b|per\s+month|monthly|a\s+month")
        .expect("valid monthly-marker regex")
});

static ONE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)일시불|one[\s-]?time|outright").expect("valid one-time regex"));

/// Parse the first currency-amount pattern out of a raw price string.
/// Returns `None` when no amount-plus-currency pattern is present; the
/// caller keeps the raw string for human inspection.
pub fn normalize_price(raw: &str) -> Option<NormalizedPrice> {
    let caps = PRICE_RE.captures(raw)?;

    let (currency, amount_text) = if let Some(amount) = caps.name("sym_amt") {
        let symbol = caps.name("sym").map(|m| m.as_str()).unwrap_or_default();
        (currency_for_symbol(symbol)?, amount.as_str())
    } else {
        ("KRW", caps.name("won_amt")?.as_str())
    };

    let amount_minor = parse_amount_minor(amount_text, minor_per_major(currency))?;

    Some(NormalizedPrice {
        amount_minor,
        currency: currency.to_string(),
        period: detect_period(raw),
    })
}

fn currency_for_symbol(symbol: &str) -> Option<&'static str> {
    match symbol {
        "$" => Some("USD"),
        "€" => Some("EUR"),
        "£" => Some("GBP"),
        "¥" => Some("JPY"),
        "₩" => Some("KRW"),
        _ => None,
    }
}

fn minor_per_major(currency: &str) -> i64 {
    match currency {
        "KRW" | "JPY" => 1,
        _ => 100,
    }
}

fn parse_amount_minor(text: &str, scale: i64) -> Option<i64> {
    let (major_text, frac_text) = match text.split_once('.') {
        Some((major, frac)) => (major, Some(frac)),
        None => (text, None),
    };
    let major: i64 = major_text.replace(',', "").parse().ok()?;

    let frac = match frac_text {
        Some(frac) if scale == 100 => {
            let cents: i64 = frac.parse().ok()?;
            if frac.len() == 1 { cents * 10 } else { cents }
        }
        // Currencies without a minor unit ignore a stray fraction.
        _ => 0,
    };

    Some(major * scale + frac)
}

/// A recurring-charge marker means monthly; an explicit lump-sum marker
/// means one-time; with neither the period is unknown.
fn detect_period(raw: &str) -> PricePeriod {
    if MONTHLY_RE.is_match(raw) {
        PricePeriod::Monthly
    } else if ONE_TIME_RE.is_match(raw) {
        PricePeriod::OneTime
    } else {
        PricePeriod::Unknown
    }
}

/// Comparison key for deduplication: trim, collapse whitespace runs,
/// case-fold. The original title is never modified.
pub fn dedup_key(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
