use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn toggled(self) -> Self {
        match self {
            Role::User => Role::Admin,
            Role::Admin => Role::User,
        }
    }
}

/// Account record. Credentials and the pending-reset pair never serialize
/// into a client response.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile_number: String,
    pub avatar_key: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub reset_password_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expires_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub mobile_number: &'a str,
    pub avatar_key: &'a str,
    pub password_hash: &'a str,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, mobile_number, avatar_key, password_hash, role,
                   reset_password_token_hash, reset_password_expires_at, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, mobile_number, avatar_key, password_hash, role,
                   reset_password_token_hash, reset_password_expires_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn create(db: &PgPool, new: NewUser<'_>) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, mobile_number, avatar_key, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, mobile_number, avatar_key, password_hash, role,
                      reset_password_token_hash, reset_password_expires_at, created_at
            "#,
        )
        .bind(new.name)
        .bind(new.email)
        .bind(new.mobile_number)
        .bind(new.avatar_key)
        .bind(new.password_hash)
        .fetch_one(db)
        .await
    }

    pub async fn list_all(db: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, mobile_number, avatar_key, password_hash, role,
                   reset_password_token_hash, reset_password_expires_at, created_at
            FROM users
            ORDER BY created_at
            "#,
        )
        .fetch_all(db)
        .await
    }

    /// Overwrites only the supplied profile fields.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
        mobile_number: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                mobile_number = COALESCE($4, mobile_number)
            WHERE id = $1
            RETURNING id, name, email, mobile_number, avatar_key, password_hash, role,
                      reset_password_token_hash, reset_password_expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(mobile_number)
        .fetch_one(db)
        .await
    }

    pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_password_token_hash = $2, reset_password_expires_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn clear_reset_token(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_password_token_hash = NULL, reset_password_expires_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Matching digest AND unexpired. Expired tokens behave as absent.
    pub async fn find_by_reset_digest(
        db: &PgPool,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, mobile_number, avatar_key, password_hash, role,
                   reset_password_token_hash, reset_password_expires_at, created_at
            FROM users
            WHERE reset_password_token_hash = $1 AND reset_password_expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(db)
        .await
    }

    /// New hash in, reset pair out, in one statement.
    pub async fn reset_password(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_password_token_hash = NULL,
                reset_password_expires_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn update_role(db: &PgPool, id: Uuid, role: Role) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Returns whether a row was actually deleted.
    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@x.com".into(),
            mobile_number: "5551234".into(),
            avatar_key: "avatars/abc".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            role: Role::User,
            reset_password_token_hash: Some("digest".into()),
            reset_password_expires_at: Some(OffsetDateTime::now_utc()),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn toggling_role_twice_is_identity() {
        assert_eq!(Role::User.toggled(), Role::Admin);
        assert_eq!(Role::Admin.toggled(), Role::User);
        assert_eq!(Role::User.toggled().toggled(), Role::User);
    }

    #[test]
    fn secrets_never_serialize() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("resetPasswordTokenHash").is_none());
        assert!(json.get("resetPasswordExpiresAt").is_none());
    }

    #[test]
    fn profile_fields_serialize_camel_case() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert_eq!(json["name"], "Ada");
        assert_eq!(json["mobileNumber"], "5551234");
        assert_eq!(json["avatarKey"], "avatars/abc");
        assert_eq!(json["role"], "user");
        assert!(json.get("createdAt").is_some());
    }
}
