//! Request/response bodies
//!
//! Field names follow the public wire format, hence the camelCase renames.

use postbox_core::auth::UserRecord;
use postbox_core::service::LoginOutcome;
use postbox_core::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub email: String,
    pub token: String,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        let UserRecord { user_id, email, .. } = outcome.user;
        Self {
            user_id,
            email,
            token: outcome.token,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code
    pub error: String,
    pub message: String,
}
