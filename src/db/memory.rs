use futures::future::{BoxFuture, FutureExt};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::Db;
use crate::errors::BackendError;
use crate::gear::Gear;

/// A store that keeps its records in memory, in insertion order. Data is
/// lost when it's dropped.
#[derive(Default)]
pub struct MemoryDb {
    records: RwLock<Vec<Gear>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Db for MemoryDb {
    fn find_all(&self) -> BoxFuture<Result<Vec<Gear>, BackendError>> {
        async move { Ok(self.records.read().await.clone()) }.boxed()
    }

    fn find_by_id(&self, id: &Uuid) -> BoxFuture<Result<Option<Gear>, BackendError>> {
        let id = *id;

        async move {
            let records = self.records.read().await;

            Ok(records.iter().find(|g| g.id == id).cloned())
        }
        .boxed()
    }

    fn insert(&self, gear: Gear) -> BoxFuture<Result<Gear, BackendError>> {
        memory_insert(self, gear).boxed()
    }

    fn update(&self, gear: Gear) -> BoxFuture<Result<Gear, BackendError>> {
        async move {
            let mut records = self.records.write().await;

            let existing = records
                .iter_mut()
                .find(|g| g.id == gear.id)
                .ok_or(BackendError::NotFound(gear.id))?;
            *existing = gear.clone();

            Ok(gear)
        }
        .boxed()
    }

    fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
        let id = *id;

        async move {
            let mut records = self.records.write().await;

            let index = records
                .iter()
                .position(|g| g.id == id)
                .ok_or(BackendError::NotFound(id))?;
            records.remove(index);

            Ok(())
        }
        .boxed()
    }
}

async fn memory_insert(db: &MemoryDb, gear: Gear) -> Result<Gear, BackendError> {
    db.records.write().await.push(gear.clone());

    Ok(gear)
}
