use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::SafeDb;
use crate::errors::BackendError;
use crate::gear::{Gear, GearPatch, NewGear};

/// The only way in and out of the record store. Assigns identifiers and
/// defaults, and applies partial updates.
#[derive(Clone)]
pub struct GearRepository {
    db: Arc<SafeDb>,
}

impl GearRepository {
    pub fn new(db: Arc<SafeDb>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Gear>, BackendError> {
        self.db.find_all().await
    }

    pub async fn create(&self, fields: NewGear) -> Result<Gear, BackendError> {
        let gear = fields.into_gear(Uuid::new_v4(), OffsetDateTime::now_utc())?;

        self.db.insert(gear).await
    }

    pub async fn find_by_id(&self, id: &Uuid) -> Result<Gear, BackendError> {
        self.db
            .find_by_id(id)
            .await?
            .ok_or(BackendError::NotFound(*id))
    }

    /// Loads the record, merges the patch into it and stores the result.
    /// Concurrent updates of the same record race; the last write wins.
    pub async fn update(&self, id: &Uuid, patch: GearPatch) -> Result<Gear, BackendError> {
        let mut gear = self.find_by_id(id).await?;
        patch.apply(&mut gear);

        self.db.update(gear).await
    }

    pub async fn delete_by_id(&self, id: &Uuid) -> Result<(), BackendError> {
        self.db.delete(id).await
    }
}
