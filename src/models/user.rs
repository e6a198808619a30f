// User accounts and roles

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::pagination::{paginate, Page, PageRequest};
use crate::apply_sort;
use crate::db::DieselPool;
use crate::schema::users;
use crate::utils::validation::escape_like;
use crate::utils::{like_pattern, ApiResult};

text_enum! {
    /// Access level attached to every account and carried in the token
    UserRole {
        Admin => "admin",
        Manager => "manager",
        Counsellor => "counsellor",
        User => "user",
    }
}

impl UserRole {
    pub fn is_admin(&self) -> bool {
        *self == UserRole::Admin
    }

    /// Back-office staff see every record, plain users only their own
    pub fn is_staff(&self) -> bool {
        matches!(
            self,
            UserRole::Admin | UserRole::Manager | UserRole::Counsellor
        )
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub email_verified: bool,
    pub verification_token_hash: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub email_verified: bool,
    pub verification_token_hash: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub email_verified: Option<bool>,
    pub verification_token_hash: Option<Option<String>>,
    pub verification_expires_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub async fn find_by_id(conn: &mut AsyncPgConnection, user_id: Uuid) -> QueryResult<Self> {
        use crate::schema::users::dsl::*;

        users
            .filter(id.eq(user_id))
            .select(User::as_select())
            .first(conn)
            .await
    }

    /// Current role and active flag, read on every authenticated request
    pub async fn standing(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> QueryResult<Option<(UserRole, bool)>> {
        use crate::schema::users::dsl::*;

        users
            .filter(id.eq(user_id))
            .select((role, is_active))
            .first(conn)
            .await
            .optional()
    }

    /// Find user by email (case-insensitive)
    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        email_str: &str,
    ) -> QueryResult<Option<Self>> {
        use crate::schema::users::dsl::*;
        use diesel::PgTextExpressionMethods;

        users
            .filter(email.ilike(escape_like(email_str.trim())))
            .select(User::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn find_by_phone(
        conn: &mut AsyncPgConnection,
        phone_str: &str,
    ) -> QueryResult<Option<Self>> {
        use crate::schema::users::dsl::*;

        users
            .filter(phone.eq(phone_str))
            .select(User::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn find_by_verification_token(
        conn: &mut AsyncPgConnection,
        token_hash: &str,
    ) -> QueryResult<Option<Self>> {
        use crate::schema::users::dsl::*;

        users
            .filter(verification_token_hash.eq(token_hash))
            .select(User::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn create(conn: &mut AsyncPgConnection, new_user: NewUser) -> QueryResult<Self> {
        diesel::insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        mut update: UserUpdate,
    ) -> QueryResult<Self> {
        use crate::schema::users::dsl::*;

        update.updated_at = Some(Utc::now());
        diesel::update(users.filter(id.eq(user_id)))
            .set(&update)
            .returning(User::as_returning())
            .get_result(conn)
            .await
    }

    pub async fn summaries(
        conn: &mut AsyncPgConnection,
        ids: &[Uuid],
    ) -> QueryResult<HashMap<Uuid, UserSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<UserSummary> = users::table
            .filter(users::id.eq_any(ids))
            .select((users::id, users::name, users::email))
            .load(conn)
            .await?;
        Ok(rows.into_iter().map(|u| (u.id, u)).collect())
    }

    fn filtered(filter: &UserQuery) -> users::BoxedQuery<'static, diesel::pg::Pg> {
        use diesel::PgTextExpressionMethods;

        let mut query = users::table.into_boxed();
        if let Some(role) = filter.role {
            query = query.filter(users::role.eq(role));
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            query = query.filter(
                users::name
                    .ilike(pattern.clone())
                    .or(users::email.ilike(pattern)),
            );
        }
        query
    }

    pub async fn list(
        pool: &DieselPool,
        filter: &UserQuery,
        request: &PageRequest,
    ) -> ApiResult<Page<User>> {
        paginate(
            pool,
            request,
            |mut conn| async move { Self::filtered(filter).count().get_result(&mut conn).await },
            |mut conn| async move {
                apply_sort!(Self::filtered(filter), request, users::created_at, {
                    "name" => users::name,
                    "email" => users::email,
                    "role" => users::role,
                    "updatedAt" => users::updated_at,
                })
                .limit(request.limit)
                .offset(request.offset())
                .select(User::as_select())
                .load::<User>(&mut conn)
                .await
            },
        )
        .await
    }

    pub fn verification_pending(&self, now: DateTime<Utc>) -> bool {
        !self.email_verified
            && self.verification_token_hash.is_some()
            && self.verification_expires_at.map(|exp| exp > now).unwrap_or(false)
    }
}

// =============================================================================
// REQUEST/RESPONSE DTOs
// =============================================================================

fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_letter || !has_digit {
        let mut err = ValidationError::new("weak_password");
        err.message = Some("Password must contain at least one letter and one number".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "name": "Asha Verma",
    "email": "asha@example.com",
    "password": "s3curePassword",
    "phone": "+919812345678"
}))]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "Please provide a name"))]
    pub name: String,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters"))]
    #[validate(custom = "validate_password_strength")]
    pub password: String,

    #[validate(length(min = 6, max = 32, message = "Phone number must be 6-32 characters"))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Please provide a password"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendOtpRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub otp: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,

    #[validate(length(min = 6, max = 32, message = "Phone number must be 6-32 characters"))]
    pub phone: Option<String>,

    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters"))]
    #[validate(custom = "validate_password_strength")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    /// admin, manager, counsellor or user
    pub role: Option<String>,
    /// Matches name or email
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub role: Option<UserRole>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            is_active: user.is_active,
            email_verified: user.email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserResponse,
}

/// Minimal user reference embedded in populated listings
#[derive(Debug, Clone, Serialize, Queryable, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
