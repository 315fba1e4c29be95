//! Request and response bodies shared by the account handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Body for `reset-password-request`; only names the account.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendConfirmationRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ConfirmEmailRequest {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RoleResponse {
    pub role: String,
    pub member: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_accepts_missing_names() {
        let request: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@b.com","password":"pw"}"#).unwrap();
        assert_eq!(request.email, "a@b.com");
        assert!(request.first_name.is_none());
        assert!(request.last_name.is_none());
    }

    #[test]
    fn role_response_shape() {
        let response = RoleResponse {
            role: "admin".to_string(),
            member: false,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["member"], false);
    }
}
