use std::time::{Duration, Instant};

use dashmap::DashMap;
use deploystep_core::{CorrelationId, RegistryError};

/// Shared map from outstanding correlation ids to the execution awaiting them.
///
/// Consumed ids are kept as tombstones so they can never be registered again;
/// `prune_retired` bounds their lifetime.
#[derive(Debug, Default)]
pub struct CorrelationRegistry {
    pending: DashMap<CorrelationId, String>,
    retired: DashMap<CorrelationId, Instant>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        id: CorrelationId,
        execution_id: impl Into<String>,
    ) -> Result<(), RegistryError> {
        if self.retired.contains_key(&id) {
            return Err(RegistryError::Retired(id));
        }
        match self.pending.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(execution_id.into());
                Ok(())
            }
        }
    }

    /// Remove the id and return its execution. Only the first caller gets `Some`.
    pub fn consume(&self, id: &CorrelationId) -> Option<String> {
        let (id, execution_id) = self.pending.remove(id)?;
        self.retired.insert(id, Instant::now());
        Some(execution_id)
    }

    /// Retire a batch of ids without delivering them, e.g. on abort.
    pub fn retire_all(&self, ids: &[CorrelationId]) {
        for id in ids {
            self.consume(id);
        }
    }

    pub fn execution_for(&self, id: &CorrelationId) -> Option<String> {
        self.pending.get(id).map(|e| e.value().clone())
    }

    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn is_retired(&self, id: &CorrelationId) -> bool {
        self.retired.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop tombstones older than `older_than`. Returns how many were removed.
    pub fn prune_retired(&self, older_than: Duration) -> usize {
        let before = self.retired.len();
        self.retired
            .retain(|_, retired_at| retired_at.elapsed() < older_than);
        before.saturating_sub(self.retired.len())
    }
}
