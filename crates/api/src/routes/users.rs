//! Registration, login and account endpoints.

use std::sync::Arc;

use axum::Extension;
use axum::extract::{Path, State};
use domain::UserProfile;
use serde::Deserialize;
use storage::{Store, UserId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{Rules, Validate, ValidatedJson};
use crate::views::{LoginView, UserView};

// -- Request types --

/// Body of registration and account updates.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub address: String,
}

impl Validate for UserRequest {
    fn validate(&self) -> Result<(), crate::error::FieldErrors> {
        Rules::new()
            .required("name", &self.name)
            .not_blank("name", &self.name)
            .length("name", &self.name, 3, 32)
            .required("username", &self.username)
            .length("username", &self.username, 3, 32)
            .starts_with_letter("username", &self.username)
            .required("email", &self.email)
            .email("email", &self.email)
            .required("password", &self.password)
            .not_blank("password", &self.password)
            .length("password", &self.password, 8, 32)
            .required("address", &self.address)
            .not_blank("address", &self.address)
            .finish()
    }
}

impl From<UserRequest> for UserProfile {
    fn from(req: UserRequest) -> Self {
        Self {
            name: req.name,
            username: req.username,
            email: req.email,
            password: req.password,
            address: req.address,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), crate::error::FieldErrors> {
        Rules::new()
            .required("username", &self.username)
            .required("password", &self.password)
            .finish()
    }
}

// -- Handlers --

/// POST /users/register
#[tracing::instrument(skip(state, req))]
pub async fn register<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ValidatedJson(req): ValidatedJson<UserRequest>,
) -> Result<ApiResponse<UserView>, ApiError> {
    let user = state.users.register(req.into()).await?;
    Ok(ApiResponse::created("user created successfully", user.into()))
}

/// POST /users/login
#[tracing::instrument(skip(state, req))]
pub async fn login<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<ApiResponse<LoginView>, ApiError> {
    let session = state.users.login(&req.username, &req.password).await?;
    Ok(ApiResponse::ok(
        "logged in successfully",
        LoginView {
            token: session.token,
            user: session.user.into(),
        },
    ))
}

/// GET /user
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<ApiResponse<Vec<UserView>>, ApiError> {
    let users = state.users.list_users().await?;
    Ok(ApiResponse::ok(
        "users retrieved successfully",
        users.into_iter().map(UserView::from).collect(),
    ))
}

/// GET /user/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<UserView>, ApiError> {
    let id = UserId::new(id);
    auth.ensure_owner(id)?;
    let user = state.users.get_user(id).await?;
    Ok(ApiResponse::ok("user found", user.into()))
}

/// PUT /user/{id}
#[tracing::instrument(skip(state, auth, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UserRequest>,
) -> Result<ApiResponse<UserView>, ApiError> {
    let id = UserId::new(id);
    auth.ensure_owner(id)?;
    let user = state.users.update_user(id, req.into()).await?;
    Ok(ApiResponse::ok("user updated successfully", user.into()))
}

/// DELETE /user/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    let id = UserId::new(id);
    auth.ensure_owner(id)?;
    state.users.delete_user(id).await?;
    Ok(ApiResponse::message("user deleted successfully"))
}
