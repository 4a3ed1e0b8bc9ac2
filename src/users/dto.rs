use serde::{Deserialize, Serialize};

use crate::users::repo::User;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedUserResponse {
    pub success: bool,
    pub message: String,
    pub user: User,
}

/// Body of `PUT /me/update`; absent fields stay unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_profile_fields_are_optional() {
        let body: UpdateProfileRequest = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(body.name.as_deref(), Some("Ada"));
        assert!(body.email.is_none());
        assert!(body.mobile_number.is_none());

        let body: UpdateProfileRequest =
            serde_json::from_str(r#"{"mobileNumber":"5551234"}"#).unwrap();
        assert_eq!(body.mobile_number.as_deref(), Some("5551234"));
    }
}
