use axum::{
    Json, Router,
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::{
    modules::ServiceError,
    utils::password::{self, PasswordStrength},
    web::{ApiMessage, AppState, service_error},
};

// SQLSTATE reported by Postgres when a called function does not exist.
const UNDEFINED_FUNCTION: &str = "42883";

/// Roles an admin can assign. Admin accounts themselves are managed outside
/// this console and never appear in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformRole {
    Student,
    Tutor,
}

impl PlatformRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformRole::Student => "student",
            PlatformRole::Tutor => "tutor",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "tutor" => PlatformRole::Tutor,
            _ => PlatformRole::Student,
        }
    }
}

/// One row of the admin user console.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: PlatformRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_number: Option<String>,
}

/// Gateway for the admin user-management console. Accounts are created and
/// authenticated by the external identity service; this gateway only lists
/// and mutates existing rows.
#[derive(Clone)]
pub struct AdminUserService {
    pool: PgPool,
}

impl AdminUserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All non-admin accounts, newest first, optionally filtered by a
    /// case-insensitive partial match on email or name.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<AdminUser>, ServiceError> {
        let term = search.map(str::trim).filter(|term| !term.is_empty());

        let rows = match term {
            Some(term) => {
                sqlx::query_as::<_, UserRow>(
                    "SELECT id, email, first_name, last_name, role, is_active, created_at, \
                     last_login, student_number \
                     FROM users \
                     WHERE role <> 'admin' \
                     AND (email ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1) \
                     ORDER BY created_at DESC",
                )
                .bind(format!("%{term}%"))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, UserRow>(
                    "SELECT id, email, first_name, last_name, role, is_active, created_at, \
                     last_login, student_number \
                     FROM users \
                     WHERE role <> 'admin' \
                     ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(UserRow::into_admin_user).collect())
    }

    pub async fn update_role(
        &self,
        user_id: Uuid,
        role: PlatformRole,
    ) -> Result<(), ServiceError> {
        let updated = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(ServiceError::NotFound("User"));
        }
        Ok(())
    }

    /// Ban or reinstate an account. The audited `set_user_ban_state` procedure
    /// is preferred; when the database reports it missing (SQLSTATE 42883) the
    /// call degrades to a direct flag update with no audit trail.
    pub async fn set_active(
        &self,
        user_id: Uuid,
        is_active: bool,
        acting_admin: Option<Uuid>,
        reason: Option<&str>,
    ) -> Result<(), ServiceError> {
        let result = sqlx::query("SELECT set_user_ban_state($1, $2, $3, $4)")
            .bind(user_id)
            .bind(is_active)
            .bind(acting_admin)
            .bind(reason)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNDEFINED_FUNCTION) =>
            {
                warn!(
                    %user_id,
                    "set_user_ban_state is not installed; applying an unaudited flag update"
                );
                let updated = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
                    .bind(user_id)
                    .bind(is_active)
                    .execute(&self.pool)
                    .await?;

                if updated.rows_affected() == 0 {
                    return Err(ServiceError::NotFound("User"));
                }
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Permanent removal. Irreversible from this side; the row is gone.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(ServiceError::NotFound("User"));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    role: Option<String>,
    is_active: Option<bool>,
    created_at: Option<DateTime<Utc>>,
    last_login: Option<DateTime<Utc>>,
    student_number: Option<String>,
}

impl UserRow {
    fn into_admin_user(self) -> AdminUser {
        AdminUser {
            id: self.id,
            email: self.email.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            role: self
                .role
                .as_deref()
                .map(PlatformRole::from_db)
                .unwrap_or(PlatformRole::Student),
            is_active: self.is_active.unwrap_or(true),
            created_at: self.created_at.unwrap_or_else(Utc::now),
            last_login: self.last_login,
            student_number: self.student_number,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:id/role", put(update_role))
        .route("/api/admin/users/:id/active", put(set_active))
        .route("/api/admin/users/:id", delete(delete_user))
        .route("/api/password/strength", post(password_strength))
}

#[derive(Deserialize)]
struct ListUsersParams {
    search: Option<String>,
}

async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<Vec<AdminUser>>, (StatusCode, Json<ApiMessage>)> {
    state
        .users()
        .list(params.search.as_deref())
        .await
        .map(Json)
        .map_err(|err| service_error(err, "Failed to load users."))
}

#[derive(Deserialize)]
struct UpdateRoleRequest {
    role: PlatformRole,
}

async fn update_role(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<Uuid>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<StatusCode, (StatusCode, Json<ApiMessage>)> {
    state
        .users()
        .update_role(user_id, request.role)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|err| service_error(err, "Failed to update the user role."))
}

#[derive(Deserialize)]
struct SetActiveRequest {
    is_active: bool,
    #[serde(default)]
    acting_admin_id: Option<Uuid>,
    #[serde(default)]
    reason: Option<String>,
}

async fn set_active(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<Uuid>,
    Json(request): Json<SetActiveRequest>,
) -> Result<StatusCode, (StatusCode, Json<ApiMessage>)> {
    state
        .users()
        .set_active(
            user_id,
            request.is_active,
            request.acting_admin_id,
            request.reason.as_deref(),
        )
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|err| service_error(err, "Failed to update the account state."))
}

async fn delete_user(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ApiMessage>)> {
    state
        .users()
        .delete_user(user_id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|err| service_error(err, "Failed to delete the user."))
}

#[derive(Deserialize)]
struct PasswordStrengthRequest {
    password: String,
}

async fn password_strength(
    Json(request): Json<PasswordStrengthRequest>,
) -> Json<PasswordStrength> {
    Json(password::evaluate(&request.password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_strings_round_trip() {
        assert_eq!(PlatformRole::from_db("student"), PlatformRole::Student);
        assert_eq!(PlatformRole::from_db("tutor"), PlatformRole::Tutor);
        assert_eq!(PlatformRole::Student.as_str(), "student");
        assert_eq!(PlatformRole::Tutor.as_str(), "tutor");
    }

    #[test]
    fn unknown_role_strings_default_to_student() {
        assert_eq!(PlatformRole::from_db("superuser"), PlatformRole::Student);
    }

    #[test]
    fn user_rows_map_with_defaults() {
        let id = Uuid::new_v4();
        let row = UserRow {
            id,
            email: None,
            first_name: None,
            last_name: None,
            role: None,
            is_active: None,
            created_at: None,
            last_login: None,
            student_number: None,
        };

        let user = row.into_admin_user();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "");
        assert_eq!(user.role, PlatformRole::Student);
        assert!(user.is_active);
        assert!(user.last_login.is_none());
    }
}
