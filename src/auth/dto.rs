use serde::{Deserialize, Serialize};

use super::repo_types::PublicUser;

/// Body for both signup and login. Missing fields read as empty so the
/// handlers can answer with their own message instead of a JSON rejection.
#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: PublicUser,
    pub token: String,
}
