use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

use crate::{
    config::AppConfig,
    modules::{
        resources::{ResourceService, uploads::UploadOrchestrator},
        users::AdminUserService,
    },
    notify::Notifier,
    storage::DiskStore,
};

#[derive(Clone)]
pub struct AppState {
    resources: ResourceService,
    users: AdminUserService,
    uploader: Arc<UploadOrchestrator>,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("failed to connect to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        let notifier = Notifier::new(config.notify_endpoint.clone())
            .context("failed to initialize the notification client")?;
        let store = Arc::new(DiskStore::new(
            &config.storage_root,
            &config.public_base_url,
        ));

        let resources = ResourceService::new(pool.clone(), notifier);
        let users = AdminUserService::new(pool);
        let uploader = Arc::new(UploadOrchestrator::new(
            store,
            Arc::new(resources.clone()),
            config.max_upload_bytes,
        ));

        Ok(Self {
            resources,
            users,
            uploader,
        })
    }

    pub fn resources(&self) -> &ResourceService {
        &self.resources
    }

    pub fn users(&self) -> &AdminUserService {
        &self.users
    }

    pub fn uploader(&self) -> &UploadOrchestrator {
        &self.uploader
    }
}
