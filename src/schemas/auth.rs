use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::User;

#[derive(Debug, Deserialize)]
pub(crate) struct UserLogin {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) is_admin: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            is_admin: user.is_admin,
            is_active: user.is_active,
            created_at: format_primitive(user.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) user: UserResponse,
}
