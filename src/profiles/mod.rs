use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::ApiError;
use crate::core::middleware::AuthenticatedUser;
use crate::core::shared::enums::UserRole;
use crate::core::shared::schema::user_profiles;
use crate::core::shared::state::AppState;

pub const DEFAULT_BRANCH: &str = "Head Office";

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = user_profiles)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub full_name: String,
    pub branch: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn role(&self) -> UserRole {
        self.role.parse().unwrap_or_default()
    }

    pub fn is_tech(&self) -> bool {
        self.role() == UserRole::Tech
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub branch: Option<String>,
}

/// Every entry point that needs a profile goes through here: one
/// profile per identity, created lazily with the documented defaults
/// (role staff, head-office branch) when none exists yet.
pub fn get_or_create_profile(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
) -> Result<UserProfile, diesel::result::Error> {
    if let Some(profile) = user_profiles::table
        .filter(user_profiles::user_id.eq(user.user_id))
        .first::<UserProfile>(conn)
        .optional()?
    {
        return Ok(profile);
    }

    let now = Utc::now();
    let profile = UserProfile {
        user_id: user.user_id,
        full_name: user
            .display_name
            .clone()
            .unwrap_or_else(|| "Unnamed User".to_string()),
        branch: DEFAULT_BRANCH.to_string(),
        role: UserRole::Staff.as_str().to_string(),
        created_at: now,
        updated_at: now,
    };

    // Two first requests can race here; the conflict target makes the
    // loser fall through to the re-select.
    diesel::insert_into(user_profiles::table)
        .values(&profile)
        .on_conflict(user_profiles::user_id)
        .do_nothing()
        .execute(conn)?;

    user_profiles::table
        .filter(user_profiles::user_id.eq(user.user_id))
        .first::<UserProfile>(conn)
}

/// Technician gate shared by the triage endpoints. Administrators
/// asserted by the identity provider pass regardless of profile role.
pub fn ensure_tech(user: &AuthenticatedUser, profile: &UserProfile) -> Result<(), ApiError> {
    if user.is_admin || profile.is_tech() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<UserProfile>, ApiError> {
    let mut conn = state.conn.get()?;
    let profile = get_or_create_profile(&mut conn, &user)?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let mut conn = state.conn.get()?;
    let mut profile = get_or_create_profile(&mut conn, &user)?;

    if let Some(full_name) = req.full_name {
        profile.full_name = full_name;
    }
    if let Some(branch) = req.branch {
        profile.branch = branch;
    }
    profile.updated_at = Utc::now();

    diesel::update(user_profiles::table.filter(user_profiles::user_id.eq(user.user_id)))
        .set((
            user_profiles::full_name.eq(&profile.full_name),
            user_profiles::branch.eq(&profile.branch),
            user_profiles::updated_at.eq(profile.updated_at),
        ))
        .execute(&mut conn)?;

    Ok(Json(profile))
}

pub fn configure_profiles_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/profile", get(get_profile).put(update_profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with_role(role: &str) -> UserProfile {
        let now = Utc::now();
        UserProfile {
            user_id: Uuid::new_v4(),
            full_name: "Thandi M.".to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            role: role.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn plain_user() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            display_name: None,
            is_admin: false,
        }
    }

    #[test]
    fn staff_profiles_fail_the_tech_gate() {
        let user = plain_user();
        assert!(ensure_tech(&user, &profile_with_role("staff")).is_err());
        assert!(ensure_tech(&user, &profile_with_role("tech")).is_ok());
    }

    #[test]
    fn admins_pass_the_tech_gate_regardless_of_role() {
        let mut user = plain_user();
        user.is_admin = true;
        assert!(ensure_tech(&user, &profile_with_role("staff")).is_ok());
    }

    #[test]
    fn unknown_role_labels_default_to_staff() {
        let profile = profile_with_role("janitor");
        assert_eq!(profile.role(), UserRole::Staff);
        assert!(!profile.is_tech());
    }
}
