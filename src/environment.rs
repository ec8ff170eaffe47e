use std::sync::Arc;

use crate::db::SafeDb;
use crate::log::Logger;
use crate::repository::GearRepository;

/// Everything a request handler needs. Built once at startup and cloned
/// into every route.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub repository: GearRepository,
}

impl Environment {
    pub fn new(logger: Arc<Logger>, db: Arc<SafeDb>) -> Self {
        Self {
            logger,
            repository: GearRepository::new(db),
        }
    }
}
