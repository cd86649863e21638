use axum::{
    extract::{Path, State},
    response::Redirect,
};
use tracing::{instrument, warn};

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

const LINK_TTL_SECS: u64 = 10 * 60;

/// GET /images/:key sends the client to wherever the blob store serves it.
#[instrument(skip(state))]
pub async fn redirect_to_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Redirect> {
    let url = state
        .storage
        .presign_get(&key, LINK_TTL_SECS)
        .await
        .map_err(|e| {
            warn!(error = %e, "no link for image");
            AppError::NotFound("Image")
        })?;
    Ok(Redirect::temporary(&url))
}
