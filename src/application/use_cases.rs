//! Application use cases for the reconciliation engine
//!
//! `TagUseCases` is the operational surface consumed by the UI/API layer:
//! batch ingestion, the available/selected tag views, selection moves with
//! undo, per-tag metadata edits and filter computation. All state is
//! session-scoped and threaded through explicit context objects; nothing
//! here is a process-wide singleton.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::application::dto::{
    FilterOptionsResponse, IngestResponse, MoveDirection, MoveTagsRequest,
    SaveSelectionStateRequest, SelectionStateResponse, UndoResponse, UpdateDohRequest,
    UpdateLineageRequest, UpdateMetadataResponse,
};
use crate::application::filter_engine::{FilterEngine, FilterState, compute_visible};
use crate::application::lineage_editor::{LineageEditor, UpdateOutcome};
use crate::application::reconciliation::ReconciliationService;
use crate::application::selection_manager::{SelectionSessionManager, UndoResult};
use crate::domain::catalog::{DohStatus, Lineage};
use crate::domain::merged_tag::MergedTag;
use crate::domain::repositories::{CatalogSource, CatalogWriter, SelectionStore};
use crate::domain::value_objects::SessionId;
use crate::infrastructure::config::AppConfig;

/// Everything one user session owns: its tag pool, its selection manager
/// and its filter cache.
struct SessionContext {
    pool: RwLock<Vec<MergedTag>>,
    selection: SelectionSessionManager,
    filters: FilterEngine,
}

/// The engine facade exposed to the UI/API layer.
pub struct TagUseCases {
    store: Arc<dyn SelectionStore>,
    catalog: Arc<dyn CatalogSource>,
    reconciliation: ReconciliationService,
    editor: LineageEditor,
    config: AppConfig,
    sessions: RwLock<HashMap<SessionId, Arc<SessionContext>>>,
}

impl TagUseCases {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        writer: Arc<dyn CatalogWriter>,
        store: Arc<dyn SelectionStore>,
        config: AppConfig,
    ) -> Self {
        let persist_timeout = Duration::from_millis(config.selection.persist_timeout_ms);
        Self {
            reconciliation: ReconciliationService::new(
                Arc::clone(&catalog),
                config.matcher.clone(),
            ),
            editor: LineageEditor::new(
                writer,
                config.lineage.restricted_product_types.clone(),
                persist_timeout,
            ),
            catalog,
            store,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Ingests one raw batch, replacing the session's available pool.
    pub async fn ingest_batch(
        &self,
        session: SessionId,
        raw_records: &[serde_json::Value],
    ) -> Result<IngestResponse> {
        let context = self.session(session).await?;
        let tags = self.reconciliation.reconcile_batch(raw_records).await?;

        let mut pool = context.pool.write().await;
        *pool = tags;
        context.filters.invalidate();

        info!(session = %session, pool_size = pool.len(), "ingestion batch applied");
        Ok(IngestResponse::summarize(&pool))
    }

    /// Adds a catalog record straight into the pool, without incoming data
    /// ("Catalog Only" provenance). Returns false when the name is already
    /// pooled or unknown to the catalog.
    pub async fn add_catalog_tag(&self, session: SessionId, name: &str) -> Result<bool> {
        let context = self.session(session).await?;
        let Some(record) = self.catalog.find_by_name(name).await? else {
            warn!(session = %session, name, "catalog lookup found no record to add");
            return Ok(false);
        };

        let mut pool = context.pool.write().await;
        if pool.iter().any(|tag| tag.name == record.name) {
            return Ok(false);
        }
        pool.push(MergedTag::from_catalog(&record));
        context.filters.invalidate();
        Ok(true)
    }

    /// The full ordered pool. Selected tags stay visible here by design, so
    /// the user never loses track of what else exists.
    pub async fn available_tags(&self, session: SessionId) -> Result<Vec<MergedTag>> {
        let context = self.session(session).await?;
        let pool = context.pool.read().await;
        Ok(pool.clone())
    }

    /// The current selection hydrated to tags, in selection order. Ids that
    /// no longer resolve against the pool are dropped with a warning, never
    /// a crash.
    pub async fn selected_tags(&self, session: SessionId) -> Result<Vec<MergedTag>> {
        let context = self.session(session).await?;
        let selection = context.selection.state().await;
        let pool = context.pool.read().await;

        let by_name: HashMap<&str, &MergedTag> =
            pool.iter().map(|tag| (tag.name.as_str(), tag)).collect();

        let mut tags = Vec::with_capacity(selection.len());
        for id in selection.ids() {
            match by_name.get(id.as_str()) {
                Some(tag) => tags.push((*tag).clone()),
                None => {
                    warn!(session = %session, id = %id, "selected id missing from pool, dropping from view");
                }
            }
        }
        Ok(tags)
    }

    /// Moves tags between the available and selected sides.
    pub async fn move_tags(
        &self,
        session: SessionId,
        request: MoveTagsRequest,
    ) -> Result<SelectionStateResponse> {
        let context = self.session(session).await?;

        // Unknown ids are reported back rather than silently mutating
        // state that the view cannot hydrate.
        let (known, unknown) = {
            let pool = context.pool.read().await;
            let names: HashSet<&str> = pool.iter().map(|tag| tag.name.as_str()).collect();
            let (known, unknown): (Vec<String>, Vec<String>) = request
                .tags
                .into_iter()
                .partition(|id| names.contains(id.as_str()));
            (known, unknown)
        };
        if !unknown.is_empty() {
            warn!(session = %session, unknown = ?unknown, "move request referenced unknown tags");
        }

        let selection = match request.direction {
            MoveDirection::ToSelected => context.selection.move_to_selected(known).await?,
            MoveDirection::ToAvailable => context.selection.move_to_available(known).await?,
        };

        Ok(SelectionStateResponse {
            selected: selection.ids().to_vec(),
            unknown,
            undo_depth: context.selection.undo_depth().await,
        })
    }

    /// Pushes an undo checkpoint ahead of a client-side mutation so the
    /// server-side history stays in lockstep.
    pub async fn save_selection_state(
        &self,
        session: SessionId,
        request: SaveSelectionStateRequest,
    ) -> Result<()> {
        let context = self.session(session).await?;
        context.selection.push_checkpoint(&request.action_type).await?;
        Ok(())
    }

    /// Pops the undo stack. An empty stack is a structured response, not
    /// an error.
    pub async fn undo_move(&self, session: SessionId) -> Result<UndoResponse> {
        let context = self.session(session).await?;
        match context.selection.undo().await? {
            UndoResult::Restored { action, selection } => {
                Ok(UndoResponse::restored(&action, &selection))
            }
            UndoResult::UndoUnavailable => {
                let current = context.selection.state().await;
                Ok(UndoResponse::nothing_to_undo(&current))
            }
        }
    }

    /// Updates one tag's lineage, rolling back on persistence failure.
    pub async fn update_lineage(
        &self,
        session: SessionId,
        request: UpdateLineageRequest,
    ) -> Result<UpdateMetadataResponse> {
        let lineage = parse_lineage(&request.lineage)?;
        let context = self.session(session).await?;
        let mut pool = context.pool.write().await;
        let tag = pool
            .iter_mut()
            .find(|tag| tag.name == request.tag_name)
            .ok_or_else(|| anyhow!("unknown tag: {}", request.tag_name))?;

        let outcome = self.editor.update_lineage(tag, lineage).await?;
        context.filters.invalidate();
        Ok(metadata_response(outcome))
    }

    /// Updates one tag's DOH classification, rolling back on failure.
    pub async fn update_doh(
        &self,
        session: SessionId,
        request: UpdateDohRequest,
    ) -> Result<UpdateMetadataResponse> {
        let doh = DohStatus::parse(&request.doh_status)
            .ok_or_else(|| anyhow!("invalid doh status: {}", request.doh_status))?;
        let context = self.session(session).await?;
        let mut pool = context.pool.write().await;
        let tag = pool
            .iter_mut()
            .find(|tag| tag.name == request.product_name)
            .ok_or_else(|| anyhow!("unknown tag: {}", request.product_name))?;

        let outcome = self.editor.update_doh(tag, doh).await?;
        context.filters.invalidate();
        Ok(metadata_response(outcome))
    }

    /// The subset of the pool matching the active filters, in pool order.
    pub async fn visible_tags(
        &self,
        session: SessionId,
        filters: &FilterState,
    ) -> Result<Vec<MergedTag>> {
        let context = self.session(session).await?;
        let pool = context.pool.read().await;
        Ok(compute_visible(&pool, filters))
    }

    /// Facet options for the active filters. Returns `None` when a newer
    /// filter input superseded this computation; stale results are
    /// discarded rather than applied out of order.
    pub async fn filter_options(
        &self,
        session: SessionId,
        filters: &FilterState,
    ) -> Result<Option<FilterOptionsResponse>> {
        let context = self.session(session).await?;
        let (generation, _token) = context.filters.begin_recompute();

        let pool = context.pool.read().await;
        let options = context.filters.facet_options(&pool, filters);
        let visible_count = compute_visible(&pool, filters).len();

        if !context.filters.is_current(generation) {
            debug!(session = %session, "facet recomputation superseded, discarding result");
            return Ok(None);
        }
        Ok(Some(FilterOptionsResponse {
            options,
            visible_count,
        }))
    }

    /// Drops the session from memory and from the durable store.
    pub async fn end_session(&self, session: SessionId) -> Result<()> {
        self.sessions.write().await.remove(&session);
        self.store.delete(&session).await?;
        info!(session = %session, "session ended");
        Ok(())
    }

    /// Fetches or lazily creates the per-session context, resuming any
    /// persisted selection state.
    async fn session(&self, session: SessionId) -> Result<Arc<SessionContext>> {
        if let Some(context) = self.sessions.read().await.get(&session) {
            return Ok(Arc::clone(context));
        }

        let mut sessions = self.sessions.write().await;
        // Double-checked: another caller may have created it while we
        // waited for the write lock.
        if let Some(context) = sessions.get(&session) {
            return Ok(Arc::clone(context));
        }

        let manager = SelectionSessionManager::open(
            session,
            Arc::clone(&self.store),
            self.config.selection.undo_depth,
            Duration::from_millis(self.config.selection.persist_timeout_ms),
        )
        .await?;

        let context = Arc::new(SessionContext {
            pool: RwLock::new(Vec::new()),
            selection: manager,
            filters: FilterEngine::new(),
        });
        sessions.insert(session, Arc::clone(&context));
        Ok(context)
    }
}

fn parse_lineage(raw: &str) -> Result<Option<Lineage>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    Lineage::parse(raw)
        .map(Some)
        .ok_or_else(|| anyhow!("invalid lineage: {raw}"))
}

fn metadata_response(outcome: UpdateOutcome) -> UpdateMetadataResponse {
    match outcome {
        UpdateOutcome::Applied => UpdateMetadataResponse {
            applied: true,
            message: "updated".to_string(),
        },
        UpdateOutcome::Disallowed { product_type } => UpdateMetadataResponse {
            applied: false,
            message: format!("lineage edits are not allowed for {product_type} products"),
        },
    }
}
