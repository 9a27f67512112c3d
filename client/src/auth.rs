//! Login and registration payloads

use serde::{Deserialize, Serialize};
use tourbook_core::wire::UserRecord;

/// `POST /api/auth/login` body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Plain-text password, sent over TLS
    pub password: String,
}

/// `POST /api/auth/register` body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Account email
    pub email: String,
    /// Password
    pub password: String,
    /// Optional phone number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Token issued by the auth endpoints.
///
/// Backends differ on the token field name and on whether the user is embedded.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthResponse {
    /// Bearer token
    #[serde(alias = "accessToken", alias = "jwt")]
    pub token: String,
    /// Signed-in user, when included
    pub user: Option<UserRecord>,
}
