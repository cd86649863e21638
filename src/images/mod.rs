pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::{routing::get, Router};

pub use services::UploadItem;

pub fn router() -> Router<AppState> {
    Router::new().route("/images/:key", get(handlers::redirect_to_image))
}
