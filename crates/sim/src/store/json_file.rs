use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use vantage_core::{Farm, Goal};
use vantage_ports::{RecordStore, StoreError, StoreResult};

/// On-disk layout: one document holding both collections
#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordDocument {
    #[serde(default)]
    farms: Vec<Farm>,
    #[serde(default)]
    goals: Vec<Goal>,
}

/// Record store persisted as a single JSON file.
///
/// The file is read on every call and replaced on every write: the new
/// document is written next to it and renamed over it, so a reader sees
/// either the old or the new content, never a partial file. A missing file
/// reads as an empty store; an existing but blank one is a serialization
/// error.
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<RecordDocument> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RecordDocument::default()),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )));
            }
        };
        serde_json::from_str(&content).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Sibling path the next document is staged at before the rename
    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "records".to_string());
        self.path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
    }

    async fn save(&self, document: &RecordDocument) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let staging = self.staging_path();
        tokio::fs::write(&staging, json)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", staging.display(), e)))?;
        if let Err(e) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(StoreError::Unavailable(format!(
                "{}: {}",
                self.path.display(),
                e
            )));
        }
        debug!(
            "Saved {} farms and {} goals to {}",
            document.farms.len(),
            document.goals.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn modify<F>(&self, apply: F) -> StoreResult<()>
    where
        F: FnOnce(&mut RecordDocument) -> StoreResult<()> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        apply(&mut document)?;
        self.save(&document).await
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn farms(&self) -> StoreResult<Vec<Farm>> {
        Ok(self.load().await?.farms)
    }

    async fn goals(&self) -> StoreResult<Vec<Goal>> {
        Ok(self.load().await?.goals)
    }

    async fn append_farm(&self, farm: Farm) -> StoreResult<()> {
        self.modify(move |doc| {
            if doc.farms.iter().any(|f| f.id == farm.id) {
                return Err(StoreError::Duplicate(farm.id));
            }
            doc.farms.push(farm);
            Ok(())
        })
        .await
    }

    async fn append_goal(&self, goal: Goal) -> StoreResult<()> {
        self.modify(move |doc| {
            if doc.goals.iter().any(|g| g.id == goal.id) {
                return Err(StoreError::Duplicate(goal.id));
            }
            doc.goals.push(goal);
            Ok(())
        })
        .await
    }

    async fn update_farm(&self, farm: Farm) -> StoreResult<()> {
        self.modify(move |doc| {
            let slot = doc
                .farms
                .iter_mut()
                .find(|f| f.id == farm.id)
                .ok_or_else(|| StoreError::NotFound(farm.id.clone()))?;
            *slot = farm;
            Ok(())
        })
        .await
    }

    async fn update_goal(&self, goal: Goal) -> StoreResult<()> {
        self.modify(move |doc| {
            let slot = doc
                .goals
                .iter_mut()
                .find(|g| g.id == goal.id)
                .ok_or_else(|| StoreError::NotFound(goal.id.clone()))?;
            *slot = goal;
            Ok(())
        })
        .await
    }
}
