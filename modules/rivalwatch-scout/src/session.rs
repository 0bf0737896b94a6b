//! Source scrape session — the per-source stage machine.
//!
//! Stages run strictly in order: navigate promotions page, extract, capture
//! evidence, navigate products page, extract, capture evidence, finalize.
//! A failed stage degrades to an empty sequence for its entity kind; only a
//! lost browsing context ends the session early, and even then whatever was
//! collected is returned. The session never surfaces an error to its caller.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use rivalwatch_common::{
    Config, Diagnostic, DiagnosticKind, EntityKind, ExtractedEntity, SourceRecordSet,
};

use crate::browser::{Browser, BrowserPage, ElementHandle, NavigateOptions, PageError};
use crate::cascade::{self, Candidate};
use crate::dedup::dedup_entities;
use crate::evidence::{attach_entity_evidence, capture_page_evidence, EvidenceStore};
use crate::normalize;
use crate::sources::{ChoreoStep, PagePlan, SourceProfile};

pub struct SourceSession<'a> {
    profile: &'a SourceProfile,
    store: &'a EvidenceStore,
    config: &'a Config,
}

impl<'a> SourceSession<'a> {
    pub fn new(profile: &'a SourceProfile, store: &'a EvidenceStore, config: &'a Config) -> Self {
        Self {
            profile,
            store,
            config,
        }
    }

    /// Run the full stage sequence for this source. Always returns a
    /// fully-shaped record set; absence of data shows up as empty sequences
    /// plus diagnostics, never as an error.
    pub async fn run(&self, browser: &dyn Browser) -> SourceRecordSet {
        let mut record_set = SourceRecordSet::empty(self.profile.id);
        info!(source = self.profile.id, "Starting source session");

        let mut page = match browser.open_page().await {
            Ok(page) => page,
            Err(e) => {
                warn!(source = self.profile.id, error = %e, "Could not open page, aborting session");
                record_set
                    .diagnostics
                    .push(Diagnostic::now(DiagnosticKind::SessionAborted {
                        stage: "start".to_string(),
                        reason: e.to_string(),
                    }));
                return record_set;
            }
        };

        for (plan, kind) in [
            (&self.profile.promotions, EntityKind::Promotion),
            (&self.profile.products, EntityKind::Product),
        ] {
            if let Err(fatal) = self
                .scrape_page(page.as_mut(), plan, kind, &mut record_set)
                .await
            {
                warn!(
                    source = self.profile.id,
                    stage = plan.label,
                    error = %fatal,
                    "Browsing context lost, ending session with partial data"
                );
                record_set
                    .diagnostics
                    .push(Diagnostic::now(DiagnosticKind::SessionAborted {
                        stage: plan.label.to_string(),
                        reason: fatal.to_string(),
                    }));
                return record_set;
            }
        }

        info!(
            source = self.profile.id,
            promotions = record_set.promotions.len(),
            products = record_set.products.len(),
            diagnostics = record_set.diagnostics.len(),
            "Source session complete"
        );
        record_set
    }

    /// One navigate → choreograph → extract → capture stage. `Err` only for
    /// a lost browsing context; every other failure degrades in place.
    async fn scrape_page(
        &self,
        page: &mut dyn BrowserPage,
        plan: &PagePlan,
        kind: EntityKind,
        record_set: &mut SourceRecordSet,
    ) -> Result<(), PageError> {
        let capture_timeout = Duration::from_millis(self.config.capture_timeout_ms);

        info!(source = self.profile.id, page = plan.label, url = plan.url, "Navigating");
        match page.navigate(plan.url, &NavigateOptions::from_config(self.config)).await {
            Ok(()) => {}
            Err(PageError::Navigation(reason)) => {
                warn!(source = self.profile.id, page = plan.label, reason = %reason, "Navigation failed, skipping stage");
                record_set
                    .diagnostics
                    .push(Diagnostic::now(DiagnosticKind::NavigationFailed {
                        page: plan.label.to_string(),
                        url: plan.url.to_string(),
                        reason,
                    }));
                return Ok(());
            }
            Err(fatal) => return Err(fatal),
        }

        // Initial settle for client-rendered content, then the configured steps.
        let mut steps = Vec::with_capacity(plan.choreography.len() + 1);
        steps.push(ChoreoStep::SettleMs(self.config.settle_ms));
        steps.extend(plan.choreography.iter().cloned());
        for step in &steps {
            let result = match step {
                ChoreoStep::Click(selector) => page.click(selector).await,
                ChoreoStep::ScrollBy(px) => page.scroll_by(*px).await,
                ChoreoStep::SettleMs(ms) => page.settle(Duration::from_millis(*ms)).await,
            };
            match result {
                Ok(()) => {}
                Err(fatal @ PageError::ContextLost(_)) => return Err(fatal),
                Err(PageError::Navigation(reason)) => {
                    warn!(source = self.profile.id, page = plan.label, step = %step.describe(), reason = %reason, "Choreography step failed, continuing");
                    record_set
                        .diagnostics
                        .push(Diagnostic::now(DiagnosticKind::ChoreographyFailed {
                            page: plan.label.to_string(),
                            step: step.describe(),
                            reason,
                        }));
                }
            }
        }

        let dom = match page.dom().await {
            Ok(dom) => dom,
            Err(PageError::Navigation(reason)) => {
                warn!(source = self.profile.id, page = plan.label, reason = %reason, "Page never stabilized, skipping stage");
                record_set
                    .diagnostics
                    .push(Diagnostic::now(DiagnosticKind::NavigationFailed {
                        page: plan.label.to_string(),
                        url: plan.url.to_string(),
                        reason,
                    }));
                return Ok(());
            }
            Err(fatal) => return Err(fatal),
        };

        let outcome = cascade::resolve(&dom, &plan.rules);
        for (strategy, reason) in outcome.failures {
            record_set
                .diagnostics
                .push(Diagnostic::now(DiagnosticKind::StrategyFailed { strategy, reason }));
        }

        // The viewport shot is taken regardless of extraction success; it is
        // the human-inspectable record of the visit.
        let page_ref = capture_page_evidence(
            page,
            self.store,
            self.profile.id,
            plan.label,
            capture_timeout,
            &mut record_set.diagnostics,
        )
        .await;
        match kind {
            EntityKind::Promotion => record_set.page_evidence.promotions_page = page_ref.clone(),
            EntityKind::Product => record_set.page_evidence.products_page = page_ref.clone(),
        }

        let Some(strategy_used) = outcome.strategy_used else {
            info!(source = self.profile.id, page = plan.label, "All extraction strategies came back empty");
            record_set
                .diagnostics
                .push(Diagnostic::now(DiagnosticKind::ExtractionExhausted {
                    page: plan.label.to_string(),
                    kind,
                    strategies_attempted: outcome.attempted,
                }));
            return Ok(());
        };

        let mut pending = self.build_entities(kind, &strategy_used, outcome.candidates);
        attach_entity_evidence(
            page,
            self.store,
            self.profile.id,
            kind,
            page_ref.as_deref(),
            &mut pending,
            capture_timeout,
            &mut record_set.diagnostics,
        )
        .await;

        let entities: Vec<ExtractedEntity> = pending.into_iter().map(|(entity, _)| entity).collect();
        let entities = dedup_entities(entities, &mut record_set.diagnostics);

        info!(
            source = self.profile.id,
            page = plan.label,
            strategy = strategy_used.as_str(),
            count = entities.len(),
            "Extraction complete"
        );
        match kind {
            EntityKind::Promotion => record_set.promotions = entities,
            EntityKind::Product => record_set.products = entities,
        }
        Ok(())
    }

    fn build_entities(
        &self,
        kind: EntityKind,
        strategy_used: &str,
        candidates: Vec<Candidate>,
    ) -> Vec<(ExtractedEntity, Option<ElementHandle>)> {
        candidates
            .into_iter()
            .map(|candidate| {
                let Candidate {
                    title,
                    description,
                    period,
                    link,
                    raw_price,
                    specs,
                    handle,
                } = candidate;
                let normalized_price = raw_price.as_deref().and_then(normalize::normalize_price);
                (
                    ExtractedEntity {
                        kind,
                        source_id: self.profile.id.to_string(),
                        title,
                        description,
                        period,
                        link,
                        raw_price,
                        normalized_price,
                        specs,
                        screenshot_ref: None,
                        strategy_used: strategy_used.to_string(),
                        captured_at: Utc::now(),
                    },
                    handle,
                )
            })
            .collect()
    }
}
