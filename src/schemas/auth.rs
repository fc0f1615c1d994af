use serde::Serialize;

use crate::schemas::user::UserResponse;

/// Bearer token handed out by signup, login and the OAuth2 form endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: &'static str,
    /// Token lifetime in seconds.
    pub(crate) expires_in: u64,
    pub(crate) user: UserResponse,
}

impl TokenResponse {
    pub(crate) fn bearer(access_token: String, expires_in: u64, user: UserResponse) -> Self {
        Self { access_token, token_type: "bearer", expires_in, user }
    }
}
