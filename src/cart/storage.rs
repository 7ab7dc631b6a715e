//! Where cart snapshots live between requests.
//!
//! Storage deals in opaque strings on purpose: a snapshot that no longer
//! parses must still round-trip through here so the reducer can decide what
//! to do with it. Only [`super::store::CartStore`] interprets the contents.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use mockall::automock;
use uuid::Uuid;

use crate::db::DbPool;
use crate::schema::carts;

#[automock]
#[async_trait]
pub trait CartStorage: Send + Sync {
    /// Returns the raw snapshot for this token, or `None` when the token has
    /// never been written.
    async fn load(&self, token: Uuid) -> Result<Option<String>>;

    /// Writes the snapshot, replacing whatever was there.
    async fn save(&self, token: Uuid, snapshot: String) -> Result<()>;
}

#[async_trait]
impl<S: CartStorage + ?Sized> CartStorage for Arc<S> {
    async fn load(&self, token: Uuid) -> Result<Option<String>> {
        (**self).load(token).await
    }

    async fn save(&self, token: Uuid, snapshot: String) -> Result<()> {
        (**self).save(token, snapshot).await
    }
}

/// Snapshots in the `carts` table, one row per token.
pub struct PgCartStorage {
    pool: DbPool,
}

impl PgCartStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStorage for PgCartStorage {
    async fn load(&self, token: Uuid) -> Result<Option<String>> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let snapshot = carts::table
            .find(token)
            .select(carts::snapshot)
            .get_result::<String>(conn)
            .await
            .optional()
            .context("Failed to load cart snapshot")?;

        Ok(snapshot)
    }

    async fn save(&self, token: Uuid, snapshot: String) -> Result<()> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        diesel::insert_into(carts::table)
            .values((carts::token.eq(token), carts::snapshot.eq(&snapshot)))
            .on_conflict(carts::token)
            .do_update()
            .set((
                carts::snapshot.eq(&snapshot),
                carts::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
            .context("Failed to persist cart snapshot")?;

        Ok(())
    }
}

/// Process-local storage for tests.
#[derive(Default)]
pub struct MemoryCartStorage {
    carts: Mutex<HashMap<Uuid, String>>,
}

impl MemoryCartStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStorage for MemoryCartStorage {
    async fn load(&self, token: Uuid) -> Result<Option<String>> {
        let carts = self.carts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(carts.get(&token).cloned())
    }

    async fn save(&self, token: Uuid, snapshot: String) -> Result<()> {
        let mut carts = self.carts.lock().unwrap_or_else(PoisonError::into_inner);
        carts.insert(token, snapshot);
        Ok(())
    }
}
