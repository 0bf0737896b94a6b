use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Entity types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Promotion,
    Product,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Promotion => write!(f, "promotion"),
            EntityKind::Product => write!(f, "product"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricePeriod {
    Monthly,
    OneTime,
    Unknown,
}

/// Canonical price derived from a raw price string.
/// `amount_minor` is in the currency's minor unit (cents for USD/EUR/GBP,
/// whole units for KRW/JPY).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPrice {
    pub amount_minor: i64,
    pub currency: String,
    pub period: PricePeriod,
}

/// One extracted promotion or product record.
///
/// `normalized_price: None` with `raw_price: Some` means price parsing
/// failed; `raw_price: None` means no price was extracted at all.
/// `screenshot_ref: None` means evidence capture failed — the entity
/// itself is still valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub kind: EntityKind,
    pub source_id: String,
    pub title: String,
    pub description: Option<String>,
    pub period: Option<String>,
    pub link: Option<String>,
    pub raw_price: Option<String>,
    pub normalized_price: Option<NormalizedPrice>,
    pub specs: Vec<String>,
    pub screenshot_ref: Option<String>,
    pub strategy_used: String,
    pub captured_at: DateTime<Utc>,
}

// --- Diagnostics ---

/// Structured diagnostic attached to a SourceRecordSet, replacing ad-hoc
/// console output. Every recoverable failure during a session is recorded
/// here; none of them abort the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn now(kind: DiagnosticKind) -> Self {
        Self {
            ts: Utc::now(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticKind {
    NavigationFailed {
        page: String,
        url: String,
        reason: String,
    },
    ChoreographyFailed {
        page: String,
        step: String,
        reason: String,
    },
    StrategyFailed {
        strategy: String,
        reason: String,
    },
    ExtractionExhausted {
        page: String,
        kind: EntityKind,
        strategies_attempted: Vec<String>,
    },
    CaptureFailed {
        kind: EntityKind,
        title: String,
        reason: String,
    },
    DuplicateDropped {
        kind: EntityKind,
        title: String,
        kept_title: String,
    },
    PageCaptureFailed {
        page: String,
        reason: String,
    },
    SessionAborted {
        stage: String,
        reason: String,
    },
}

// --- Record sets ---

/// Viewport-level screenshots, one per logical page visited. Independent
/// of per-entity evidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageEvidence {
    pub promotions_page: Option<String>,
    pub products_page: Option<String>,
}

/// Everything one source session produced. Always fully shaped: a failed
/// scrape yields empty sequences plus diagnostics, never a missing set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecordSet {
    pub source_id: String,
    pub captured_at: DateTime<Utc>,
    pub promotions: Vec<ExtractedEntity>,
    pub products: Vec<ExtractedEntity>,
    pub page_evidence: PageEvidence,
    pub diagnostics: Vec<Diagnostic>,
}

impl SourceRecordSet {
    pub fn empty(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            captured_at: Utc::now(),
            promotions: Vec::new(),
            products: Vec::new(),
            page_evidence: PageEvidence::default(),
            diagnostics: Vec::new(),
        }
    }
}

/// The joined multi-source dataset. BTreeMap keeps serialization order
/// deterministic. Invariant: exactly one entry per configured source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedDataset {
    pub sources: BTreeMap<String, SourceRecordSet>,
}

impl AggregatedDataset {
    pub fn insert(&mut self, record_set: SourceRecordSet) {
        self.sources
            .insert(record_set.source_id.clone(), record_set);
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceRecordSet> {
        self.sources.get(source_id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The array-of-sources form consumed by the report renderer.
    pub fn report_sources(&self) -> Vec<&SourceRecordSet> {
        self.sources.values().collect()
    }
}

// --- Run stats ---

/// Counters for a full aggregation run.
#[derive(Debug, Default)]
pub struct ScrapeStats {
    pub sources_scraped: u32,
    pub sessions_aborted: u32,
    pub promotions_extracted: u32,
    pub products_extracted: u32,
    pub duplicates_dropped: u32,
    pub captures_failed: u32,
    pub navigations_failed: u32,
}

impl ScrapeStats {
    /// Roll up counters from one finished record set.
    pub fn absorb(&mut self, record_set: &SourceRecordSet) {
        self.sources_scraped += 1;
        self.promotions_extracted += record_set.promotions.len() as u32;
        self.products_extracted += record_set.products.len() as u32;
        for diag in &record_set.diagnostics {
            match diag.kind {
                DiagnosticKind::CaptureFailed { .. } | DiagnosticKind::PageCaptureFailed { .. } => {
                    self.captures_failed += 1
                }
                DiagnosticKind::NavigationFailed { .. } => self.navigations_failed += 1,
                DiagnosticKind::DuplicateDropped { .. } => self.duplicates_dropped += 1,
                DiagnosticKind::SessionAborted { .. } => self.sessions_aborted += 1,
                _ => {}
            }
        }
    }
}

impl std::fmt::Display for ScrapeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Scrape Run Complete ===")?;
        writeln!(f, "Sources scraped:      {}", self.sources_scraped)?;
        writeln!(f, "Sessions aborted:     {}", self.sessions_aborted)?;
        writeln!(f, "Promotions extracted: {}", self.promotions_extracted)?;
        writeln!(f, "Products extracted:   {}", self.products_extracted)?;
        writeln!(f, "Duplicates dropped:   {}", self.duplicates_dropped)?;
        writeln!(f, "Captures failed:      {}", self.captures_failed)?;
        writeln!(f, "Navigations failed:   {}", self.navigations_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(kind: EntityKind, title: &str) -> ExtractedEntity {
        ExtractedEntity {
            kind,
            source_id: "acme".to_string(),
            title: title.to_string(),
            description: None,
            period: None,
            link: None,
            raw_price: None,
            normalized_price: None,
            specs: Vec::new(),
            screenshot_ref: None,
            strategy_used: "structured_cards".to_string(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn optional_fields_serialize_as_explicit_null() {
        let json = serde_json::to_value(entity(EntityKind::Product, "Filter Max")).unwrap();
        assert!(json.get("description").unwrap().is_null());
        assert!(json.get("normalized_price").unwrap().is_null());
        assert!(json.get("screenshot_ref").unwrap().is_null());
    }

    #[test]
    fn dataset_serializes_as_object_keyed_by_source() {
        let mut dataset = AggregatedDataset::default();
        dataset.insert(SourceRecordSet::empty("lg"));
        dataset.insert(SourceRecordSet::empty("samsung"));
        let json = serde_json::to_value(&dataset).unwrap();
        assert!(json.get("lg").is_some());
        assert!(json.get("samsung").is_some());
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn diagnostic_serializes_with_type_tag() {
        let diag = Diagnostic::now(DiagnosticKind::NavigationFailed {
            page: "promotions".to_string(),
            url: "https://example.com".to_string(),
            reason: "timeout".to_string(),
        });
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["type"], "navigation_failed");
        assert_eq!(json["page"], "promotions");
    }

    #[test]
    fn stats_absorb_counts_failures_from_diagnostics() {
        let mut record_set = SourceRecordSet::empty("lg");
        record_set.promotions.push(entity(EntityKind::Promotion, "Half price"));
        record_set.diagnostics.push(Diagnostic::now(DiagnosticKind::NavigationFailed {
            page: "products".to_string(),
            url: "https://example.com/products".to_string(),
            reason: "timeout".to_string(),
        }));
        record_set.diagnostics.push(Diagnostic::now(DiagnosticKind::CaptureFailed {
            kind: EntityKind::Promotion,
            title: "Half price".to_string(),
            reason: "element not visible".to_string(),
        }));

        let mut stats = ScrapeStats::default();
        stats.absorb(&record_set);
        assert_eq!(stats.sources_scraped, 1);
        assert_eq!(stats.promotions_extracted, 1);
        assert_eq!(stats.navigations_failed, 1);
        assert_eq!(stats.captures_failed, 1);
        assert_eq!(stats.sessions_aborted, 0);
    }
}
