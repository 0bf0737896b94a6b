//! Evidence capture — screenshots correlated with extracted entities.
//!
//! Capture is best-effort proof, not a required field: a failed capture
//! leaves `screenshot_ref` absent and becomes a diagnostic. Element-scoped
//! capture is tried once per entity when the strategy exposed a handle;
//! otherwise the entity shares the page-level viewport capture.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::warn;

use rivalwatch_common::{Diagnostic, DiagnosticKind, EntityKind, ExtractedEntity};

use crate::browser::{BrowserPage, ElementHandle};

// --- EvidenceStore ---

/// Writes captured images under one directory and hands back path strings.
/// Images are referenced by path, never inlined into the dataset.
pub struct EvidenceStore {
    dir: PathBuf,
}

impl EvidenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write captured bytes as `<stem>_<yyyymmdd>.png` and return the path.
    pub fn save(&self, stem: &str, bytes: &[u8]) -> Result<String> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create screenshot dir {}", self.dir.display()))?;
        let date = Utc::now().format("%Y%m%d");
        let path = self.dir.join(format!("{stem}_{date}.png"));
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write screenshot {}", path.display()))?;
        Ok(path.to_string_lossy().into_owned())
    }
}

// --- Capture operations ---

/// Viewport capture for one logical page. Failure never propagates: the
/// result is simply absent and a diagnostic records why.
pub async fn capture_page_evidence(
    page: &mut dyn BrowserPage,
    store: &EvidenceStore,
    source_id: &str,
    page_label: &str,
    timeout: Duration,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    let reason = match tokio::time::timeout(timeout, page.capture_viewport()).await {
        Ok(Ok(bytes)) => match store.save(&format!("{source_id}_{page_label}"), &bytes) {
            Ok(path) => return Some(path),
            Err(e) => e.to_string(),
        },
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("timed out after {}ms", timeout.as_millis()),
    };

    warn!(source = source_id, page = page_label, reason = %reason, "Page capture failed");
    diagnostics.push(Diagnostic::now(DiagnosticKind::PageCaptureFailed {
        page: page_label.to_string(),
        reason,
    }));
    None
}

/// Attach evidence to each entity: one element-scoped attempt when a handle
/// exists, the shared page capture otherwise or on failure.
pub async fn attach_entity_evidence(
    page: &mut dyn BrowserPage,
    store: &EvidenceStore,
    source_id: &str,
    kind: EntityKind,
    shared_page_ref: Option<&str>,
    entities: &mut [(ExtractedEntity, Option<ElementHandle>)],
    timeout: Duration,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (n, (entity, handle)) in entities.iter_mut().enumerate() {
        let element_ref = match handle {
            Some(handle) => {
                capture_element(
                    page, store, source_id, kind, n, handle, timeout, entity, diagnostics,
                )
                .await
            }
            None => None,
        };
        entity.screenshot_ref = element_ref.or_else(|| shared_page_ref.map(String::from));
    }
}

async fn capture_element(
    page: &mut dyn BrowserPage,
    store: &EvidenceStore,
    source_id: &str,
    kind: EntityKind,
    n: usize,
    handle: &ElementHandle,
    timeout: Duration,
    entity: &ExtractedEntity,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    let reason = match tokio::time::timeout(timeout, page.capture_element(handle)).await {
        Ok(Ok(bytes)) => match store.save(&format!("{source_id}_{kind}_{n}"), &bytes) {
            Ok(path) => return Some(path),
            Err(e) => e.to_string(),
        },
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("timed out after {}ms", timeout.as_millis()),
    };

    warn!(
        source = source_id,
        title = entity.title.as_str(),
        reason = %reason,
        "Element capture failed, falling back to page capture"
    );
    diagnostics.push(Diagnostic::now(DiagnosticKind::CaptureFailed {
        kind,
        title: entity.title.clone(),
        reason,
    }));
    None
}
