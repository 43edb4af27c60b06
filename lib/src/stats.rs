// lib/src/stats.rs

use std::sync::Arc;

use models::errors::ClinicalResult;
use models::medical::ActionStatus;
use models::read_models::Stats;

use crate::storage_engine::ClinicalStorageEngine;

/// Dashboard counters, computed from current state on every call.
#[derive(Clone)]
pub struct StatsAggregator {
    storage: Arc<dyn ClinicalStorageEngine>,
}

impl StatsAggregator {
    pub fn new(storage: Arc<dyn ClinicalStorageEngine>) -> Self {
        StatsAggregator { storage }
    }

    pub async fn get_stats(&self) -> ClinicalResult<Stats> {
        let mut stats = Stats {
            total_patients: self.storage.count_patients().await?,
            total_visits: self.storage.count_visits().await?,
            ..Stats::default()
        };
        for action in self.storage.list_actions().await? {
            match action.status {
                ActionStatus::Pending => stats.pending_actions += 1,
                ActionStatus::Completed => stats.completed_actions += 1,
                _ => {}
            }
        }
        Ok(stats)
    }
}
