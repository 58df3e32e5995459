use crate::entities::{prelude::*, removed_shows};
use crate::models::Show;
use anyhow::Result;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, Set};
use std::path::PathBuf;

pub struct RemovedShowRepository {
    conn: DatabaseConnection,
}

impl RemovedShowRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: removed_shows::Model) -> Show {
        Show {
            name: m.name,
            copy_destination: m.copy_destination.map(PathBuf::from),
            tracker: m.tracker,
        }
    }

    pub async fn list(&self) -> Result<Vec<Show>> {
        let rows = RemovedShows::find()
            .order_by_asc(removed_shows::Column::RemovedAt)
            .order_by_asc(removed_shows::Column::Name)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Inserts or refreshes a removed show keyed by name.
    pub async fn upsert(&self, show: &Show) -> Result<()> {
        let active_model = removed_shows::ActiveModel {
            name: Set(show.name.clone()),
            copy_destination: Set(show
                .copy_destination
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())),
            tracker: Set(show.tracker.clone()),
            removed_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        RemovedShows::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(removed_shows::Column::Name)
                    .update_columns([
                        removed_shows::Column::CopyDestination,
                        removed_shows::Column::Tracker,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<bool> {
        let result = RemovedShows::delete_by_id(name.to_string())
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
