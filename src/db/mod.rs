use crate::models::{DownloadEvent, Show, ShowStatistics};
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    /// Single-connection in-memory store, used by tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        Self::with_pool_options("sqlite::memory:", 1, 1).await
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn removed_repo(&self) -> repositories::removed_shows::RemovedShowRepository {
        repositories::removed_shows::RemovedShowRepository::new(self.conn.clone())
    }

    fn events_repo(&self) -> repositories::download_events::DownloadEventRepository {
        repositories::download_events::DownloadEventRepository::new(self.conn.clone())
    }

    pub async fn list_removed_shows(&self) -> Result<Vec<Show>> {
        self.removed_repo().list().await
    }

    pub async fn upsert_removed_show(&self, show: &Show) -> Result<()> {
        self.removed_repo().upsert(show).await
    }

    pub async fn delete_removed_show(&self, name: &str) -> Result<bool> {
        self.removed_repo().delete(name).await
    }

    pub async fn append_download_event(&self, show_name: &str, event: &DownloadEvent) -> Result<()> {
        self.events_repo().append(show_name, event).await
    }

    pub async fn download_events_for(&self, show_name: &str) -> Result<Vec<DownloadEvent>> {
        self.events_repo().for_show(show_name).await
    }

    pub async fn all_statistics(&self) -> Result<Vec<ShowStatistics>> {
        self.events_repo().all().await
    }
}
