use anyhow::Result;

use crate::{
    config::Config,
    db::{self, DbPool},
};

/// State shared across all routes: the database pool. Cloned per request by
/// axum, so everything in here must be cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
}

impl AppState {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let db_pool = db::create_pool(&config.database.url).await?;

        Ok(Self { db_pool })
    }
}
