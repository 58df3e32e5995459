use crate::entities::{download_events, prelude::*};
use crate::models::{DownloadEvent, ShowStatistics};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::collections::BTreeMap;
use tracing::warn;

pub struct DownloadEventRepository {
    conn: DatabaseConnection,
}

impl DownloadEventRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: download_events::Model) -> Option<DownloadEvent> {
        match DateTime::parse_from_rfc3339(&m.date) {
            Ok(date) => Some(DownloadEvent {
                date: date.with_timezone(&Utc),
                tracker: m.tracker,
            }),
            Err(e) => {
                warn!(id = m.id, error = %e, "Skipping download event with unreadable date");
                None
            }
        }
    }

    pub async fn append(&self, show_name: &str, event: &DownloadEvent) -> Result<()> {
        let active_model = download_events::ActiveModel {
            show_name: Set(show_name.to_string()),
            date: Set(event.date.to_rfc3339()),
            tracker: Set(event.tracker.clone()),
            ..Default::default()
        };

        DownloadEvents::insert(active_model)
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    /// Events of one show, oldest first.
    pub async fn for_show(&self, show_name: &str) -> Result<Vec<DownloadEvent>> {
        let rows = DownloadEvents::find()
            .filter(download_events::Column::ShowName.eq(show_name))
            .order_by_asc(download_events::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().filter_map(Self::map_model).collect())
    }

    pub async fn all(&self) -> Result<Vec<ShowStatistics>> {
        let rows = DownloadEvents::find()
            .order_by_asc(download_events::Column::Id)
            .all(&self.conn)
            .await?;

        let mut grouped: BTreeMap<String, ShowStatistics> = BTreeMap::new();
        for row in rows {
            let name = row.show_name.clone();
            if let Some(event) = Self::map_model(row) {
                grouped
                    .entry(name.clone())
                    .or_insert_with(|| ShowStatistics::new(&name))
                    .add(event);
            }
        }

        Ok(grouped.into_values().collect())
    }
}
