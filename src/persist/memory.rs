//! Volatile backend for tests and callers that do not need durability.

use hashbrown::HashMap;

use crate::{
    op::QueuedOperation,
    types::{OpId, OpKind, OpSeq, OpStatus},
};

use super::{PersistError, PersistResult, QueueBackend};

/// In-memory implementation of [`crate::persist::QueueBackend`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: HashMap<OpId, QueuedOperation>,
    order: Vec<OpId>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn ordered(&self) -> impl Iterator<Item = &QueuedOperation> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }
}

impl QueueBackend for MemoryBackend {
    fn insert(&mut self, op: &QueuedOperation) -> PersistResult<()> {
        if self.records.contains_key(&op.id) {
            return Err(PersistError::Message(format!("duplicate op id {}", op.id)));
        }
        self.order.push(op.id);
        self.records.insert(op.id, op.clone());
        Ok(())
    }

    fn get(&self, id: OpId) -> PersistResult<Option<QueuedOperation>> {
        Ok(self.records.get(&id).cloned())
    }

    fn list_kind(&self, kind: OpKind) -> PersistResult<Vec<QueuedOperation>> {
        Ok(self.ordered().filter(|op| op.kind == kind).cloned().collect())
    }

    fn list_all(&self) -> PersistResult<Vec<QueuedOperation>> {
        Ok(self.ordered().cloned().collect())
    }

    fn update_status(
        &mut self,
        id: OpId,
        status: OpStatus,
        last_error: Option<&str>,
        attempts: u32,
    ) -> PersistResult<bool> {
        let Some(rec) = self.records.get_mut(&id) else {
            return Ok(false);
        };
        rec.status = status;
        rec.last_error = last_error.map(str::to_owned);
        rec.attempts = attempts;
        Ok(true)
    }

    fn delete_with_status(&mut self, status: OpStatus) -> PersistResult<usize> {
        let before = self.records.len();
        self.records.retain(|_, op| op.status != status);
        let records = &self.records;
        self.order.retain(|id| records.contains_key(id));
        Ok(before - self.records.len())
    }

    fn count_live(&self) -> PersistResult<usize> {
        Ok(self.records.values().filter(|op| op.status.is_live()).count())
    }

    fn max_seq(&self) -> PersistResult<OpSeq> {
        Ok(self.records.values().map(|op| op.seq).max().unwrap_or(0))
    }
}
