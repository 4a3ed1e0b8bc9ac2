use serde::{Deserialize, Serialize};

use crate::users::repo::User;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Body of `PUT /password/reset/:token`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Response for every operation that establishes a session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub user: User,
}

/// Fields collected from the multipart registration form.
#[derive(Debug, Default)]
pub struct RegisterForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub mobile_number: Option<String>,
    pub avatar: Option<(bytes::Bytes, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_request_uses_camel_case() {
        let body: ResetPasswordRequest =
            serde_json::from_str(r#"{"password":"p2","confirmPassword":"p2"}"#).unwrap();
        assert_eq!(body.password, "p2");
        assert_eq!(body.confirm_password, "p2");
    }

    #[test]
    fn update_password_request_uses_camel_case() {
        let body: UpdatePasswordRequest =
            serde_json::from_str(r#"{"oldPassword":"p1","newPassword":"p2"}"#).unwrap();
        assert_eq!(body.old_password, "p1");
        assert_eq!(body.new_password, "p2");
    }
}
