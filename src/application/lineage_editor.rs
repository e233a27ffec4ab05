//! Per-tag lineage and DOH metadata mutation
//!
//! Edits apply optimistically to the in-memory tag, then persist through
//! the catalog writer; a failed or timed-out persistence call reverts the
//! field and surfaces the error. Restricted product types (paraphernalia
//! and friends, configured) reject lineage edits with a `Disallowed`
//! outcome value rather than an error.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::application::selection_manager::SelectionError;
use crate::domain::catalog::{DohStatus, Lineage};
use crate::domain::merged_tag::MergedTag;
use crate::domain::repositories::CatalogWriter;

/// Product types whose lineage may not be edited, by default.
pub const DEFAULT_RESTRICTED_TYPES: &[&str] = &["Paraphernalia", "Gear", "Accessory"];

/// Outcome of a metadata edit request.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Applied,
    /// The product's type does not admit lineage edits.
    Disallowed { product_type: String },
}

/// Applies lineage/DOH edits against the catalog writer.
pub struct LineageEditor {
    writer: Arc<dyn CatalogWriter>,
    restricted_types: Vec<String>,
    persist_timeout: Duration,
}

impl LineageEditor {
    #[must_use]
    pub fn new(
        writer: Arc<dyn CatalogWriter>,
        restricted_types: Vec<String>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            writer,
            restricted_types,
            persist_timeout,
        }
    }

    /// True when the product type rejects lineage edits.
    #[must_use]
    pub fn is_restricted(&self, product_type: &str) -> bool {
        let product_type = product_type.trim();
        self.restricted_types
            .iter()
            .any(|restricted| restricted.eq_ignore_ascii_case(product_type))
            || matches!(Lineage::parse(product_type), Some(Lineage::Para))
    }

    /// Updates a tag's lineage with optimistic-apply/rollback semantics.
    pub async fn update_lineage(
        &self,
        tag: &mut MergedTag,
        new_lineage: Option<Lineage>,
    ) -> Result<UpdateOutcome, SelectionError> {
        if self.is_restricted(&tag.product_type) || tag.lineage == Some(Lineage::Para) {
            info!(tag = %tag.name, product_type = %tag.product_type, "lineage edit disallowed");
            return Ok(UpdateOutcome::Disallowed {
                product_type: tag.product_type.clone(),
            });
        }

        let previous = tag.lineage;
        tag.lineage = new_lineage;

        if let Err(source) = self
            .persist("update_lineage", self.writer.update_lineage(&tag.name, new_lineage))
            .await
        {
            tag.lineage = previous;
            return Err(source);
        }

        info!(tag = %tag.name, lineage = ?new_lineage, "lineage updated");
        Ok(UpdateOutcome::Applied)
    }

    /// Updates a tag's DOH classification with the same protocol.
    pub async fn update_doh(
        &self,
        tag: &mut MergedTag,
        new_status: DohStatus,
    ) -> Result<UpdateOutcome, SelectionError> {
        let previous = tag.doh;
        tag.doh = new_status;

        if let Err(source) = self
            .persist("update_doh", self.writer.update_doh(&tag.name, new_status))
            .await
        {
            tag.doh = previous;
            return Err(source);
        }

        info!(tag = %tag.name, doh = %new_status, "doh status updated");
        Ok(UpdateOutcome::Applied)
    }

    async fn persist<F>(&self, action: &str, call: F) -> Result<(), SelectionError>
    where
        F: std::future::Future<Output = anyhow::Result<()>>,
    {
        let source = match timeout(self.persist_timeout, call).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(source)) => source,
            Err(_) => anyhow!("persistence timed out after {:?}", self.persist_timeout),
        };
        warn!(action, error = %source, "metadata persistence failed, reverting field");
        Err(SelectionError::SyncFailed {
            action: action.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::CatalogRecord;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct TestWriter {
        fail: AtomicBool,
    }

    #[async_trait]
    impl CatalogWriter for TestWriter {
        async fn update_lineage(&self, _name: &str, _lineage: Option<Lineage>) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(anyhow!("catalog unavailable"));
            }
            Ok(())
        }

        async fn update_doh(&self, _name: &str, _doh: DohStatus) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(anyhow!("catalog unavailable"));
            }
            Ok(())
        }
    }

    fn editor(writer: Arc<TestWriter>) -> LineageEditor {
        LineageEditor::new(
            writer,
            DEFAULT_RESTRICTED_TYPES.iter().map(ToString::to_string).collect(),
            Duration::from_secs(1),
        )
    }

    fn flower_tag() -> MergedTag {
        let mut record = CatalogRecord::named("Blue Dream - 1g");
        record.product_type = "Flower".to_string();
        record.lineage = Some(Lineage::Hybrid);
        MergedTag::from_catalog(&record)
    }

    #[tokio::test]
    async fn lineage_edit_applies_optimistically() {
        let editor = editor(Arc::new(TestWriter::default()));
        let mut tag = flower_tag();

        let outcome = editor
            .update_lineage(&mut tag, Some(Lineage::Sativa))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Applied);
        assert_eq!(tag.lineage, Some(Lineage::Sativa));
    }

    #[tokio::test]
    async fn failed_persistence_reverts_the_field() {
        let writer = Arc::new(TestWriter::default());
        writer.fail.store(true, Ordering::SeqCst);
        let editor = editor(Arc::clone(&writer));
        let mut tag = flower_tag();

        let error = editor
            .update_lineage(&mut tag, Some(Lineage::Indica))
            .await
            .unwrap_err();
        assert!(matches!(error, SelectionError::SyncFailed { .. }));
        assert_eq!(tag.lineage, Some(Lineage::Hybrid));
    }

    #[tokio::test]
    async fn restricted_product_type_is_disallowed_not_an_error() {
        let editor = editor(Arc::new(TestWriter::default()));
        let mut record = CatalogRecord::named("Glass Pipe");
        record.product_type = "Paraphernalia".to_string();
        let mut tag = MergedTag::from_catalog(&record);

        let outcome = editor
            .update_lineage(&mut tag, Some(Lineage::Hybrid))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::Disallowed {
                product_type: "Paraphernalia".to_string()
            }
        );
        assert_eq!(tag.lineage, None);
    }

    #[tokio::test]
    async fn para_lineage_also_blocks_edits() {
        let editor = editor(Arc::new(TestWriter::default()));
        let mut record = CatalogRecord::named("Grinder");
        record.product_type = "Misc".to_string();
        record.lineage = Some(Lineage::Para);
        let mut tag = MergedTag::from_catalog(&record);

        let outcome = editor
            .update_lineage(&mut tag, Some(Lineage::Hybrid))
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Disallowed { .. }));
        assert_eq!(tag.lineage, Some(Lineage::Para));
    }

    #[tokio::test]
    async fn doh_edit_reverts_on_failure() {
        let writer = Arc::new(TestWriter::default());
        let editor = editor(Arc::clone(&writer));
        let mut tag = flower_tag();

        editor.update_doh(&mut tag, DohStatus::Thc).await.unwrap();
        assert_eq!(tag.doh, DohStatus::Thc);

        writer.fail.store(true, Ordering::SeqCst);
        assert!(editor.update_doh(&mut tag, DohStatus::Cbd).await.is_err());
        assert_eq!(tag.doh, DohStatus::Thc);
    }
}
