//! Wiring shared by every command: configuration, auth, endpoint and database.

use anyhow::{anyhow, Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::adapters::sqlite::{initialize_database, SqliteIdeaStore, SqliteProfileStore};
use crate::adapters::{HttpAuthProvider, HttpRemoteEndpoint};
use crate::domain::models::{Config, Idea, Profile, UserId};
use crate::services::{EditLockCoordinator, FetchService};

pub struct AppContext {
    pub config: Config,
    pub auth: Arc<HttpAuthProvider>,
    pub endpoint: Arc<HttpRemoteEndpoint>,
    pub pool: SqlitePool,
}

impl AppContext {
    pub async fn new(config: Config) -> Result<Self> {
        let auth = HttpAuthProvider::from_config(&config.endpoint, &config.auth)
            .context("Failed to build auth provider")?;
        let endpoint =
            HttpRemoteEndpoint::new(&config.endpoint).context("Failed to build remote endpoint")?;
        let pool = initialize_database(&config.database)
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;

        Ok(Self {
            config,
            auth: Arc::new(auth),
            endpoint: Arc::new(endpoint),
            pool,
        })
    }

    /// The signed-in user, who owns any edit lock taken from this CLI.
    pub fn current_user(&self) -> Result<UserId> {
        self.config
            .auth
            .user_id
            .as_deref()
            .map(UserId::from)
            .ok_or_else(|| anyhow!("No user configured. Set auth.user_id or IDEABOARD_AUTH__USER_ID"))
    }

    pub fn profile_store(&self) -> Arc<SqliteProfileStore> {
        Arc::new(SqliteProfileStore::new(self.pool.clone()))
    }

    pub fn idea_store(&self) -> Arc<SqliteIdeaStore> {
        Arc::new(SqliteIdeaStore::new(self.pool.clone()))
    }

    pub fn profile_service(&self, store: Arc<SqliteProfileStore>) -> FetchService<Profile> {
        FetchService::from_config(self.auth.clone(), self.endpoint.clone(), store, &self.config)
    }

    pub fn idea_service(&self, store: Arc<SqliteIdeaStore>) -> FetchService<Idea> {
        FetchService::from_config(self.auth.clone(), self.endpoint.clone(), store, &self.config)
    }

    pub fn coordinator(&self) -> EditLockCoordinator {
        EditLockCoordinator::from_config(&self.config.lock)
    }
}
