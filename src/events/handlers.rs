use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, HeaderName, StatusCode},
    Json,
};
use tracing::instrument;

use super::{dto::MessageResponse, repo_types::Event, services, validation::EventForm};
use crate::{
    auth::middleware::AuthUser,
    error::{AppError, AppResult},
    images::UploadItem,
    state::AppState,
};

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::InvalidInput(e.body_text())
}

/// Collects the known form fields. Unknown fields are skipped; a file part
/// with no bytes counts as "no image".
async fn read_event_form(mut mp: Multipart) -> AppResult<EventForm> {
    let mut form = EventForm::default();

    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field
                    .content_type()
                    .map(str::to_owned)
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field.bytes().await.map_err(bad_multipart)?;
                if body.is_empty() {
                    continue;
                }
                if form.image.is_some() {
                    return Err(AppError::InvalidInput(
                        "Only one image may be uploaded".into(),
                    ));
                }
                form.image = Some(UploadItem {
                    body,
                    content_type,
                    file_name,
                });
            }
            "title" => form.title = Some(field.text().await.map_err(bad_multipart)?),
            "description" => form.description = Some(field.text().await.map_err(bad_multipart)?),
            "address" => form.address = Some(field.text().await.map_err(bad_multipart)?),
            "date" => form.date = Some(field.text().await.map_err(bad_multipart)?),
            _ => {}
        }
    }
    Ok(form)
}

#[instrument(skip(state))]
pub async fn list_events(State(state): State<AppState>) -> AppResult<Json<Vec<Event>>> {
    Ok(Json(services::list_events(state.events.as_ref()).await?))
}

#[instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Event>> {
    Ok(Json(services::get_event(state.events.as_ref(), id).await?))
}

/// POST /api/events (multipart)
#[instrument(skip(state, user, mp), fields(user_id = user.id))]
pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mp: Multipart,
) -> AppResult<(StatusCode, [(HeaderName, String); 1], Json<Event>)> {
    let form = read_event_form(mp).await?;
    let event =
        services::create_event(state.events.as_ref(), state.storage.as_ref(), &user, form).await?;

    let location = format!("/api/events/{}", event.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(event)))
}

/// PUT /api/events/:id (multipart, any subset of fields)
#[instrument(skip(state, user, mp), fields(user_id = user.id))]
pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    mp: Multipart,
) -> AppResult<Json<Event>> {
    let form = read_event_form(mp).await?;
    let event =
        services::update_event(state.events.as_ref(), state.storage.as_ref(), id, form).await?;
    Ok(Json(event))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Event>> {
    let event = services::delete_event(state.events.as_ref(), state.storage.as_ref(), id).await?;
    Ok(Json(event))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn register(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    services::register(state.events.as_ref(), id, &user).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registered successfully",
        }),
    ))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn unregister(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    services::unregister(state.events.as_ref(), id, &user).await?;
    Ok(Json(MessageResponse {
        message: "Unregistered successfully",
    }))
}
