use std::sync::Arc;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::BackendError;
use crate::gear::Gear;
use crate::log::{error, info, Logger};

pub mod memory;

/// The connection string that selects the in-process store.
pub const MEMORY_CONNECTION_STRING: &str = "memory";

pub type SafeDb = dyn Db + Send + Sync;

/// The record store holding every piece of gear.
pub trait Db {
    /// Returns every record in insertion order.
    fn find_all(&self) -> BoxFuture<Result<Vec<Gear>, BackendError>>;

    fn find_by_id(&self, id: &Uuid) -> BoxFuture<Result<Option<Gear>, BackendError>>;

    /// Stores a new record and returns it as stored.
    fn insert(&self, gear: Gear) -> BoxFuture<Result<Gear, BackendError>>;

    /// Replaces the record with the same ID and returns it as stored.
    fn update(&self, gear: Gear) -> BoxFuture<Result<Gear, BackendError>>;

    fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>>;
}

/// Opens the store named by the configuration. A PostgreSQL pool is
/// created lazily, so an unreachable database is only logged here and
/// individual requests fail until it comes back.
pub fn connect(logger: Arc<Logger>, config: &Config) -> Result<Arc<SafeDb>, BackendError> {
    if config.db_connection_string == MEMORY_CONNECTION_STRING {
        info!(logger, "Using in-memory store");
        return Ok(Arc::new(memory::MemoryDb::new()));
    }

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_lazy(&config.db_connection_string)?;
    let db = PgDb::new(pool);

    let check = db.clone();
    tokio::spawn(async move {
        match check.initialize().await {
            Ok(()) => info!(logger, "Connected to database"),
            Err(e) => error!(logger, "Database connection error"; "error" => %e),
        }
    });

    Ok(Arc::new(db))
}

pub use self::postgres::*;

mod postgres {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::postgres::PgPool;
    use tokio::sync::OnceCell;
    use uuid::Uuid;

    use crate::errors::BackendError;
    use crate::gear::Gear;

    const GEAR_NAME_CONSTRAINT: &str = "gear_name_present";
    const GEAR_CATEGORY_CONSTRAINT: &str = "gear_category_present";
    const GEAR_BRAND_CONSTRAINT: &str = "gear_brand_present";

    #[derive(Clone)]
    pub struct PgDb {
        pool: PgPool,
        schema: Arc<OnceCell<()>>,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb {
                pool,
                schema: Arc::new(OnceCell::new()),
            }
        }

        /// Creates the `gear` table if it doesn't exist yet. Runs before
        /// every query until it first succeeds; concurrent callers wait
        /// for the same attempt.
        pub async fn initialize(&self) -> Result<(), BackendError> {
            self.schema
                .get_or_try_init(|| async {
                    sqlx::query(include_str!("queries/schema.sql"))
                        .execute(&self.pool)
                        .await
                        .map_err(map_sqlx_error)?;

                    Ok::<_, BackendError>(())
                })
                .await?;

            Ok(())
        }

        pub fn is_initialized(&self) -> bool {
            self.schema.initialized()
        }
    }

    // these can be simplified once async functions in traits are usable
    // behind `dyn`
    impl super::Db for PgDb {
        fn find_all(&self) -> BoxFuture<Result<Vec<Gear>, BackendError>> {
            async move {
                self.initialize().await?;

                let query = sqlx::query_as::<_, Gear>(include_str!("queries/find_all.sql"));

                let gear = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;

                Ok(gear)
            }
            .boxed()
        }

        fn find_by_id(&self, id: &Uuid) -> BoxFuture<Result<Option<Gear>, BackendError>> {
            let id = *id;

            async move {
                self.initialize().await?;

                let query = sqlx::query_as::<_, Gear>(include_str!("queries/find_by_id.sql"));

                let gear = query
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(gear)
            }
            .boxed()
        }

        fn insert(&self, gear: Gear) -> BoxFuture<Result<Gear, BackendError>> {
            async move {
                self.initialize().await?;

                let query = sqlx::query_as::<_, Gear>(include_str!("queries/insert.sql"));

                let stored = query
                    .bind(gear.id)
                    .bind(gear.name)
                    .bind(gear.category)
                    .bind(gear.brand)
                    .bind(gear.purchase_date)
                    .bind(gear.notes)
                    .bind(gear.photo)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(stored)
            }
            .boxed()
        }

        fn update(&self, gear: Gear) -> BoxFuture<Result<Gear, BackendError>> {
            async move {
                let id = gear.id;
                self.initialize().await?;

                let query = sqlx::query_as::<_, Gear>(include_str!("queries/update.sql"));

                let stored = query
                    .bind(gear.id)
                    .bind(gear.name)
                    .bind(gear.category)
                    .bind(gear.brand)
                    .bind(gear.purchase_date)
                    .bind(gear.notes)
                    .bind(gear.photo)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                // the row may have been deleted since it was read
                stored.ok_or(BackendError::NotFound(id))
            }
            .boxed()
        }

        fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            let id = *id;

            async move {
                self.initialize().await?;

                let query = sqlx::query(include_str!("queries/delete.sql"));

                let count = query
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NotFound(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        use sqlx::Error;

        match error {
            Error::Database(ref e) if e.constraint() == Some(GEAR_NAME_CONSTRAINT) => {
                BackendError::BlankField("name")
            }
            Error::Database(ref e) if e.constraint() == Some(GEAR_CATEGORY_CONSTRAINT) => {
                BackendError::BlankField("category")
            }
            Error::Database(ref e) if e.constraint() == Some(GEAR_BRAND_CONSTRAINT) => {
                BackendError::BlankField("brand")
            }
            _ => BackendError::Sqlx { source: error },
        }
    }

    #[cfg(test)]
    mod tests {
        use std::time::Duration;

        use sqlx::postgres::PgPoolOptions;

        use super::PgDb;
        use crate::db::Db;
        use crate::errors::BackendError;

        #[tokio::test]
        async fn schema_creation_is_retried_after_failure() {
            // nothing listens on the discard port
            let pool = PgPoolOptions::new()
                .acquire_timeout(Duration::from_millis(200))
                .connect_lazy("postgres://gear@127.0.0.1:9/gear")
                .expect("build lazy pool");
            let db = PgDb::new(pool);

            for _ in 0..2 {
                assert!(matches!(
                    db.find_all().await,
                    Err(BackendError::Sqlx { .. })
                ));
                assert!(!db.is_initialized());
            }
        }
    }
}
