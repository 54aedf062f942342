use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use vantage_core::{Farm, Goal, RecordId};
use vantage_ports::{RecordStore, StoreError, StoreResult};

/// In-memory record store
#[derive(Default)]
pub struct MemoryRecordStore {
    farms: DashMap<RecordId, Farm>,
    goals: DashMap<RecordId, Goal>,
    unavailable: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault injection: make every call fail until cleared
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn farms(&self) -> StoreResult<Vec<Farm>> {
        self.check_available()?;
        let mut farms: Vec<Farm> = self.farms.iter().map(|e| e.value().clone()).collect();
        farms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(farms)
    }

    async fn goals(&self) -> StoreResult<Vec<Goal>> {
        self.check_available()?;
        let mut goals: Vec<Goal> = self.goals.iter().map(|e| e.value().clone()).collect();
        goals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(goals)
    }

    async fn append_farm(&self, farm: Farm) -> StoreResult<()> {
        self.check_available()?;
        if self.farms.contains_key(&farm.id) {
            return Err(StoreError::Duplicate(farm.id));
        }
        self.farms.insert(farm.id.clone(), farm);
        Ok(())
    }

    async fn append_goal(&self, goal: Goal) -> StoreResult<()> {
        self.check_available()?;
        if self.goals.contains_key(&goal.id) {
            return Err(StoreError::Duplicate(goal.id));
        }
        self.goals.insert(goal.id.clone(), goal);
        Ok(())
    }

    async fn update_farm(&self, farm: Farm) -> StoreResult<()> {
        self.check_available()?;
        match self.farms.get_mut(&farm.id) {
            Some(mut existing) => {
                *existing = farm;
                Ok(())
            }
            None => Err(StoreError::NotFound(farm.id)),
        }
    }

    async fn update_goal(&self, goal: Goal) -> StoreResult<()> {
        self.check_available()?;
        match self.goals.get_mut(&goal.id) {
            Some(mut existing) => {
                *existing = goal;
                Ok(())
            }
            None => Err(StoreError::NotFound(goal.id)),
        }
    }

    async fn farm(&self, id: &RecordId) -> StoreResult<Farm> {
        self.check_available()?;
        self.farms
            .get(id)
            .map(|f| f.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn goal(&self, id: &RecordId) -> StoreResult<Goal> {
        self.check_available()?;
        self.goals
            .get(id)
            .map(|g| g.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}
