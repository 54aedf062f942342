use async_trait::async_trait;
use vantage_core::{Farm, Goal, RecordId};

use crate::error::StoreResult;

/// Port for the external key-value store holding farms and goals
///
/// Records are whole values keyed by their string id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn farms(&self) -> StoreResult<Vec<Farm>>;

    async fn goals(&self) -> StoreResult<Vec<Goal>>;

    /// Append a new farm; fails if the id already exists
    async fn append_farm(&self, farm: Farm) -> StoreResult<()>;

    /// Append a new goal; fails if the id already exists
    async fn append_goal(&self, goal: Goal) -> StoreResult<()>;

    /// Replace the farm stored under `farm.id`
    async fn update_farm(&self, farm: Farm) -> StoreResult<()>;

    /// Replace the goal stored under `goal.id`
    async fn update_goal(&self, goal: Goal) -> StoreResult<()>;

    /// Look up one farm by id
    async fn farm(&self, id: &RecordId) -> StoreResult<Farm> {
        self.farms()
            .await?
            .into_iter()
            .find(|f| &f.id == id)
            .ok_or_else(|| crate::StoreError::NotFound(id.clone()))
    }

    /// Look up one goal by id
    async fn goal(&self, id: &RecordId) -> StoreResult<Goal> {
        self.goals()
            .await?
            .into_iter()
            .find(|g| &g.id == id)
            .ok_or_else(|| crate::StoreError::NotFound(id.clone()))
    }
}
