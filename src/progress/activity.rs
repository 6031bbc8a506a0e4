use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{DependencyFailure, SideEffect, best_effort};
use crate::store::ActivityStore;
use crate::types::ActivityEntry;

/// Feeds the admin activity stream. Entries are informational only.
#[derive(Clone)]
pub struct ActivityLogger {
    store: Arc<dyn ActivityStore>,
}

impl ActivityLogger {
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self { store }
    }

    pub fn record(
        &self,
        actor_id: &str,
        action: &str,
        target_id: &str,
        description: String,
    ) -> Result<(), DependencyFailure> {
        let entry = ActivityEntry {
            id: Uuid::new_v4().to_string(),
            actor_id: actor_id.to_string(),
            action: action.to_string(),
            target_id: target_id.to_string(),
            description,
            created_at: Utc::now(),
        };

        best_effort(SideEffect::Activity, self.store.append_activity(&entry))
    }
}
