//! Aggregator — concurrent source sessions joined into one dataset.

use futures::stream::{self, StreamExt};
use tracing::info;

use rivalwatch_common::{AggregatedDataset, Config, ScrapeStats, SourceRecordSet};

use crate::browser::Browser;
use crate::evidence::EvidenceStore;
use crate::session::SourceSession;
use crate::sources::SourceProfile;

pub struct Aggregator<'a> {
    browser: &'a dyn Browser,
    store: &'a EvidenceStore,
    config: &'a Config,
}

impl<'a> Aggregator<'a> {
    pub fn new(browser: &'a dyn Browser, store: &'a EvidenceStore, config: &'a Config) -> Self {
        Self {
            browser,
            store,
            config,
        }
    }

    /// Run one session per configured source and join on completion. The
    /// join is a barrier, not a race: every session runs to its end, and a
    /// failing source degrades to an empty record set instead of cancelling
    /// the others. The result holds exactly one entry per configured source.
    pub async fn run(&self, profiles: &[SourceProfile]) -> (AggregatedDataset, ScrapeStats) {
        info!(sources = profiles.len(), "Starting aggregation run");

        let record_sets: Vec<SourceRecordSet> = stream::iter(profiles.iter().map(|profile| {
            let session = SourceSession::new(profile, self.store, self.config);
            async move { session.run(self.browser).await }
        }))
        .buffer_unordered(self.config.max_concurrent_sessions.max(1))
        .collect()
        .await;

        let mut dataset = AggregatedDataset::default();
        let mut stats = ScrapeStats::default();
        for record_set in record_sets {
            stats.absorb(&record_set);
            dataset.insert(record_set);
        }

        info!(sources = dataset.len(), "Aggregation run complete");
        (dataset, stats)
    }
}
