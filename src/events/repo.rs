use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::repo_types::{Event, EventChanges, NewEvent};
use crate::db::StoreError;

const EVENT_COLUMNS: &str =
    "id, title, description, address, date, image, created_at, updated_at, owner_user_id";

#[async_trait]
pub trait EventRepo: Send + Sync {
    /// Newest first.
    async fn list(&self) -> Result<Vec<Event>, StoreError>;
    async fn find(&self, id: i64) -> Result<Option<Event>, StoreError>;
    /// Returns the row as stored, with its assigned id and timestamps.
    async fn insert(&self, new: NewEvent) -> Result<Event, StoreError>;
    /// Applies the present fields and bumps `updated_at` in one statement.
    /// `None` when no row has that id.
    async fn update(&self, id: i64, changes: &EventChanges) -> Result<Option<Event>, StoreError>;
    /// Returns the deleted row. Registrations go with it.
    async fn delete(&self, id: i64) -> Result<Option<Event>, StoreError>;
    /// A repeated pair surfaces as [`StoreError::UniqueViolation`].
    async fn add_registration(&self, event_id: i64, user_id: i64) -> Result<(), StoreError>;
    /// `false` when there was nothing to delete.
    async fn remove_registration(&self, event_id: i64, user_id: i64) -> Result<bool, StoreError>;
}

/// One statement: the present columns, then `updated_at`, then the row back.
fn build_update(id: i64, changes: &EventChanges) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE events SET ");
    let mut set = qb.separated(", ");
    let columns = [
        ("title", &changes.title),
        ("description", &changes.description),
        ("address", &changes.address),
        ("date", &changes.date),
        ("image", &changes.image),
    ];
    for (column, value) in columns {
        if let Some(value) = value {
            set.push(format!("{column} = "));
            set.push_bind_unseparated(value.clone());
        }
    }
    set.push("updated_at = now()");
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb.push(format!(" RETURNING {EVENT_COLUMNS}"));
    qb
}

#[derive(Clone)]
pub struct PgEventRepo {
    db: PgPool,
}

impl PgEventRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventRepo for PgEventRepo {
    async fn list(&self) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: i64) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert(&self, new: NewEvent) -> Result<Event, StoreError> {
        let row = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (title, description, address, date, image, owner_user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(new.title)
        .bind(new.description)
        .bind(new.address)
        .bind(new.date)
        .bind(new.image)
        .bind(new.owner_user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i64, changes: &EventChanges) -> Result<Option<Event>, StoreError> {
        let mut qb = build_update(id, changes);
        let row = qb
            .build_query_as::<Event>()
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, Event>(&format!(
            "DELETE FROM events WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn add_registration(&self, event_id: i64, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO registrations (event_id, user_id) VALUES ($1, $2)")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn remove_registration(&self, event_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let done = sqlx::query("DELETE FROM registrations WHERE event_id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
