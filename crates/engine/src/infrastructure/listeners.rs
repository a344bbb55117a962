//! Built-in event listeners.

use std::sync::Arc;

use async_trait::async_trait;
use questline_domain::{FileName, ResourceEvent};

use crate::infrastructure::event_bus::{EventListener, ListenerError};
use crate::infrastructure::persistence::{SqliteFileStore, PICTURE_FIELDS};
use crate::infrastructure::ports::ResourceStore;

/// Logs every committed change.
pub struct AuditTrail;

#[async_trait]
impl EventListener for AuditTrail {
    fn name(&self) -> &'static str {
        "audit_trail"
    }

    async fn handle(&self, event: &ResourceEvent) -> Result<(), ListenerError> {
        tracing::info!(
            kind = %event.kind,
            verb = %event.verb,
            id = %event.entity_id,
            "Document change committed"
        );
        Ok(())
    }
}

/// Deletes pictures that belonged to a removed adventure or character.
///
/// Only URLs pointing into the local file store are considered; external
/// links are left alone, and so are pictures another document still uses.
pub struct OrphanedFileSweeper {
    files: Arc<SqliteFileStore>,
}

impl OrphanedFileSweeper {
    pub fn new(files: Arc<SqliteFileStore>) -> Self {
        Self { files }
    }

    fn referenced_files(event: &ResourceEvent) -> Vec<FileName> {
        PICTURE_FIELDS
            .iter()
            .filter_map(|field| event.document.get(*field))
            .filter_map(|value| value.as_str())
            .filter_map(FileName::from_url)
            .collect()
    }
}

#[async_trait]
impl EventListener for OrphanedFileSweeper {
    fn name(&self) -> &'static str {
        "orphaned_file_sweeper"
    }

    async fn handle(&self, event: &ResourceEvent) -> Result<(), ListenerError> {
        for filename in Self::referenced_files(event) {
            if !self.files.exists(&filename).await? {
                tracing::debug!(file = %filename, "Referenced file already gone");
                continue;
            }
            if self.files.is_referenced(&filename).await? {
                tracing::debug!(file = %filename, "File still in use, kept");
                continue;
            }
            self.files.remove(&filename).await?;
            tracing::info!(
                file = %filename,
                kind = %event.kind,
                id = %event.entity_id,
                "Removed orphaned file"
            );
        }
        Ok(())
    }
}
