use serde::{Deserialize, Serialize};

/// Who a request is acting as. Decoded from the token, never re-fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
}

/// JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub email: String,
    pub iat: i64, // issued at (unix timestamp)
    pub exp: i64, // expires at (unix timestamp)
}

impl From<Claims> for Identity {
    fn from(c: Claims) -> Self {
        Self {
            id: c.id,
            email: c.email,
        }
    }
}
