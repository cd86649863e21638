use tracing::info;

use super::{
    repo::EventRepo,
    repo_types::{Event, EventChanges, NewEvent},
    validation::{self, EventForm, EventUpdate},
};
use crate::{
    auth::claims::Identity,
    db::StoreError,
    error::{AppError, AppResult},
    images::services::{discard_image, store_image},
    storage::StorageClient,
};

pub async fn list_events(events: &dyn EventRepo) -> AppResult<Vec<Event>> {
    Ok(events.list().await?)
}

pub async fn get_event(events: &dyn EventRepo, id: i64) -> AppResult<Event> {
    events.find(id).await?.ok_or(AppError::NotFound("Event"))
}

/// Validates the whole form, stores the image, then inserts. Nothing is
/// written when validation fails.
pub async fn create_event(
    events: &dyn EventRepo,
    storage: &dyn StorageClient,
    owner: &Identity,
    form: EventForm,
) -> AppResult<Event> {
    let input = validation::validate_new(form).map_err(AppError::Validation)?;
    let image = store_image(storage, input.image).await?;

    let new = NewEvent {
        title: input.title,
        description: input.description,
        address: input.address,
        date: input.date,
        image: image.clone(),
        owner_user_id: owner.id,
    };
    match events.insert(new).await {
        Ok(event) => {
            info!(event_id = event.id, owner_id = owner.id, "event created");
            Ok(event)
        }
        Err(e) => {
            discard_image(storage, &image).await;
            Err(AppError::WriteFailed(e.into()))
        }
    }
}

/// Partial update: only fields present in the form change. A form with no
/// fields and no image returns the stored event untouched.
pub async fn update_event(
    events: &dyn EventRepo,
    storage: &dyn StorageClient,
    id: i64,
    form: EventForm,
) -> AppResult<Event> {
    let EventUpdate { mut changes, image } =
        validation::validate_update(form).map_err(AppError::Validation)?;

    let Some(upload) = image else {
        if changes.is_empty() {
            return get_event(events, id).await;
        }
        return apply_changes(events, id, &changes).await;
    };

    let previous = get_event(events, id).await?.image;
    let key = store_image(storage, upload).await?;
    changes.image = Some(key.clone());

    match apply_changes(events, id, &changes).await {
        Ok(event) => {
            discard_image(storage, &previous).await;
            Ok(event)
        }
        Err(e) => {
            discard_image(storage, &key).await;
            Err(e)
        }
    }
}

async fn apply_changes(
    events: &dyn EventRepo,
    id: i64,
    changes: &EventChanges,
) -> AppResult<Event> {
    match events.update(id, changes).await {
        Ok(Some(event)) => {
            info!(event_id = id, "event updated");
            Ok(event)
        }
        Ok(None) => Err(AppError::NotFound("Event")),
        Err(e) => Err(AppError::WriteFailed(e.into())),
    }
}

pub async fn delete_event(
    events: &dyn EventRepo,
    storage: &dyn StorageClient,
    id: i64,
) -> AppResult<Event> {
    let deleted = events
        .delete(id)
        .await
        .map_err(|e| AppError::WriteFailed(e.into()))?
        .ok_or(AppError::NotFound("Event"))?;

    discard_image(storage, &deleted.image).await;
    info!(event_id = id, "event deleted");
    Ok(deleted)
}

pub async fn register(events: &dyn EventRepo, event_id: i64, user: &Identity) -> AppResult<()> {
    get_event(events, event_id).await?;

    match events.add_registration(event_id, user.id).await {
        Ok(()) => {
            info!(event_id, user_id = user.id, "user registered for event");
            Ok(())
        }
        Err(StoreError::UniqueViolation) => Err(AppError::AlreadyRegistered),
        Err(e) => Err(AppError::WriteFailed(e.into())),
    }
}

pub async fn unregister(events: &dyn EventRepo, event_id: i64, user: &Identity) -> AppResult<()> {
    get_event(events, event_id).await?;

    match events.remove_registration(event_id, user.id).await {
        Ok(true) => {
            info!(event_id, user_id = user.id, "user unregistered from event");
            Ok(())
        }
        Ok(false) => Err(AppError::NotRegistered),
        Err(e) => Err(AppError::WriteFailed(e.into())),
    }
}
