//! Within-source dedup by normalized title.
//!
//! Cascade strategies run in a fixed order, so "first seen wins" is
//! reproducible. The filter is stable: survivors keep their relative order.

use std::collections::HashMap;

use rivalwatch_common::{Diagnostic, DiagnosticKind, ExtractedEntity};

use crate::normalize::dedup_key;

/// Drop later entities whose normalized title matches an earlier one.
/// Each dropped duplicate is recorded as a diagnostic naming the survivor.
pub fn dedup_entities(
    entities: Vec<ExtractedEntity>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ExtractedEntity> {
    let mut kept_by_key: HashMap<String, String> = HashMap::new();
    let mut kept = Vec::with_capacity(entities.len());

    for entity in entities {
        let key = dedup_key(&entity.title);
        match kept_by_key.get(&key) {
            Some(kept_title) => {
                diagnostics.push(Diagnostic::now(DiagnosticKind::DuplicateDropped {
                    kind: entity.kind,
                    title: entity.title,
                    kept_title: kept_title.clone(),
                }));
            }
            None => {
                kept_by_key.insert(key, entity.title.clone());
                kept.push(entity);
            }
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rivalwatch_common::EntityKind;

    fn promo(title: &str, raw_price: &str) -> ExtractedEntity {
        ExtractedEntity {
            kind: EntityKind::Promotion,
            source_id: "acme".to_string(),
            title: title.to_string(),
            description: None,
            period: None,
            link: None,
            raw_price: Some(raw_price.to_string()),
            normalized_price: None,
            specs: Vec::new(),
            screenshot_ref: None,
            strategy_used: "structured_cards".to_string(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn first_seen_wins() {
        let mut diags = Vec::new();
        let result = dedup_entities(vec![promo("A", "1000"), promo("a ", "2000")], &mut diags);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "A");
        assert_eq!(result[0].raw_price.as_deref(), Some("1000"));
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            &diags[0].kind,
            DiagnosticKind::DuplicateDropped { title, kept_title, .. }
                if title == "a " && kept_title == "A"
        ));
    }

    #[test]
    fn preserves_order_of_survivors() {
        let mut diags = Vec::new();
        let result = dedup_entities(
            vec![
                promo("Zeta promo", "1"),
                promo("Alpha promo", "2"),
                promo("zeta  PROMO", "3"),
                promo("Mid promo", "4"),
            ],
            &mut diags,
        );
        let titles: Vec<&str> = result.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Zeta promo", "Alpha promo", "Mid promo"]);
    }

    #[test]
    fn idempotent_on_own_output() {
        let mut diags = Vec::new();
        let once = dedup_entities(
            vec![promo("A", "1"), promo("a", "2"), promo("B", "3")],
            &mut diags,
        );
        let mut diags_again = Vec::new();
        let twice = dedup_entities(once.clone(), &mut diags_again);
        assert_eq!(once.len(), twice.len());
        assert!(diags_again.is_empty());
        let titles_once: Vec<&str> = once.iter().map(|e| e.title.as_str()).collect();
        let titles_twice: Vec<&str> = twice.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles_once, titles_twice);
    }

    #[test]
    fn empty_input_is_empty_output() {
        let mut diags = Vec::new();
        assert!(dedup_entities(Vec::new(), &mut diags).is_empty());
        assert!(diags.is_empty());
    }
}
