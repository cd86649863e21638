//! In-process store for tests. Mirrors the constraints the Postgres schema
//! enforces: unique emails, owner and registration foreign keys, one
//! registration per (event, user), cascade on event delete.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    auth::{repo::UserRepo, repo_types::User},
    db::StoreError,
    events::{
        repo::EventRepo,
        repo_types::{Event, EventChanges, NewEvent},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    events: Vec<Event>,
    registrations: Vec<(i64, i64)>,
    last_user_id: i64,
    last_event_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn user_count(&self) -> usize {
        self.tables.lock().unwrap().users.len()
    }

    pub fn registration_count(&self, event_id: i64) -> usize {
        self.tables
            .lock()
            .unwrap()
            .registrations
            .iter()
            .filter(|(e, _)| *e == event_id)
            .count()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email == email) {
            return Err(StoreError::UniqueViolation);
        }
        t.last_user_id += 1;
        let user = User {
            id: t.last_user_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl EventRepo for MemoryStore {
    async fn list(&self) -> Result<Vec<Event>, StoreError> {
        let t = self.tables.lock().unwrap();
        let mut events = t.events.clone();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(events)
    }

    async fn find(&self, id: i64) -> Result<Option<Event>, StoreError> {
        let t = self.tables.lock().unwrap();
        Ok(t.events.iter().find(|e| e.id == id).cloned())
    }

    async fn insert(&self, new: NewEvent) -> Result<Event, StoreError> {
        let mut t = self.tables.lock().unwrap();
        if !t.users.iter().any(|u| u.id == new.owner_user_id) {
            return Err(StoreError::ForeignKeyViolation);
        }
        t.last_event_id += 1;
        let event = Event {
            id: t.last_event_id,
            title: new.title,
            description: new.description,
            address: new.address,
            date: new.date,
            image: new.image,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            owner_user_id: new.owner_user_id,
        };
        t.events.push(event.clone());
        Ok(event)
    }

    async fn update(&self, id: i64, changes: &EventChanges) -> Result<Option<Event>, StoreError> {
        let mut t = self.tables.lock().unwrap();
        let Some(event) = t.events.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        let fields = [
            (&mut event.title, &changes.title),
            (&mut event.description, &changes.description),
            (&mut event.address, &changes.address),
            (&mut event.date, &changes.date),
            (&mut event.image, &changes.image),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value.clone();
            }
        }
        event.updated_at = Some(OffsetDateTime::now_utc());
        Ok(Some(event.clone()))
    }

    async fn delete(&self, id: i64) -> Result<Option<Event>, StoreError> {
        let mut t = self.tables.lock().unwrap();
        let Some(pos) = t.events.iter().position(|e| e.id == id) else {
            return Ok(None);
        };
        let event = t.events.remove(pos);
        t.registrations.retain(|(e, _)| *e != id);
        Ok(Some(event))
    }

    async fn add_registration(&self, event_id: i64, user_id: i64) -> Result<(), StoreError> {
        let mut t = self.tables.lock().unwrap();
        if !t.events.iter().any(|e| e.id == event_id) || !t.users.iter().any(|u| u.id == user_id)
        {
            return Err(StoreError::ForeignKeyViolation);
        }
        if t.registrations.contains(&(event_id, user_id)) {
            return Err(StoreError::UniqueViolation);
        }
        t.registrations.push((event_id, user_id));
        Ok(())
    }

    async fn remove_registration(&self, event_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let mut t = self.tables.lock().unwrap();
        let before = t.registrations.len();
        t.registrations.retain(|r| *r != (event_id, user_id));
        Ok(t.registrations.len() < before)
    }
}
