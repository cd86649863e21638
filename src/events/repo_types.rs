use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Event row, also the JSON shape returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub address: String,
    pub date: String,  // as supplied by the client, validated to parse
    pub image: String, // blob key
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    pub owner_user_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub address: String,
    pub date: String,
    pub image: String,
    pub owner_user_id: i64,
}

/// Columns a partial update touches. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub date: Option<String>,
    pub image: Option<String>,
}

impl EventChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.address.is_none()
            && self.date.is_none()
            && self.image.is_none()
    }
}
