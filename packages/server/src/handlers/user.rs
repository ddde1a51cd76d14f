use axum::{Json, extract::State};
use axum_extra::extract::CookieJar;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::LoginUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::shared::{ApiResponse, Empty, IdQuery, IdRequest, IdResponse, ok};
use crate::models::user::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/user/register",
    tag = "User",
    operation_id = "register",
    summary = "Register a new account",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = IdResponse),
        (status = 400, description = "Invalid input or account exists (40000)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(account = %payload.account))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Json<ApiResponse<IdResponse>>, AppError> {
    let id = state.users.register(payload).await?;
    Ok(ok(IdResponse { id }))
}

#[utoipa::path(
    post,
    path = "/api/user/login",
    tag = "User",
    operation_id = "login",
    summary = "Log in and start a session",
    description = "Sets an HttpOnly session cookie and returns the redacted account.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = UserResponse),
        (status = 400, description = "Account or password incorrect (40000)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, jar, payload), fields(account = %payload.account))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<UserResponse>>), AppError> {
    let user = state.users.login(payload).await?;
    let token = state.sessions.sign(&user)?;
    let jar = jar.add(state.sessions.cookie(token));
    Ok((jar, ok(UserResponse { user: user.into() })))
}

#[utoipa::path(
    get,
    path = "/api/user/session",
    tag = "User",
    operation_id = "currentUser",
    summary = "Get the logged-in account",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 404, description = "Account was deleted (40400)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user))]
pub async fn current_user(
    login_user: LoginUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = state.users.current(&login_user.identity()).await?;
    Ok(ok(UserResponse { user: user.into() }))
}

#[utoipa::path(
    post,
    path = "/api/user/logout",
    tag = "User",
    operation_id = "logout",
    summary = "End the session",
    responses(
        (status = 200, description = "Logged out", body = Empty),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _login_user, jar))]
pub async fn logout(
    _login_user: LoginUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<Empty>>) {
    (jar.remove(state.sessions.removal_cookie()), ok(Empty {}))
}

#[utoipa::path(
    post,
    path = "/api/user/self/edit",
    tag = "User",
    operation_id = "editSelf",
    summary = "Edit the caller's own account",
    request_body = UserEditRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Nothing to update (40000)", body = ErrorBody),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, payload))]
pub async fn self_edit(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserEditRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = state.users.self_edit(&login_user.identity(), payload).await?;
    Ok(ok(UserResponse { user }))
}

#[utoipa::path(
    get,
    path = "/api/user/search",
    tag = "User",
    operation_id = "searchUsers",
    summary = "Search accounts",
    params(UserSearchQuery),
    responses(
        (status = 200, description = "One page of redacted accounts", body = UserPage),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _login_user, query))]
pub async fn search(
    _login_user: LoginUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserSearchQuery>,
) -> Result<Json<ApiResponse<UserPage>>, AppError> {
    Ok(ok(state.users.search(query).await?))
}

#[utoipa::path(
    post,
    path = "/api/user/add",
    tag = "User Admin",
    operation_id = "addUser",
    summary = "Create an account with the default password",
    request_body = AddUserRequest,
    responses(
        (status = 200, description = "Account created", body = IdResponse),
        (status = 400, description = "Invalid input or account exists (40000)", body = ErrorBody),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not an admin (40101)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, payload))]
pub async fn add_user(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AddUserRequest>,
) -> Result<Json<ApiResponse<IdResponse>>, AppError> {
    let id = state.users.add_user(&login_user.identity(), payload).await?;
    Ok(ok(IdResponse { id }))
}

#[utoipa::path(
    post,
    path = "/api/user/delete",
    tag = "User Admin",
    operation_id = "deleteUser",
    summary = "Soft-delete an account",
    request_body = IdRequest,
    responses(
        (status = 200, description = "Deleted", body = Empty),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not an admin (40101)", body = ErrorBody),
        (status = 404, description = "No such account (40400)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, payload), fields(id = payload.id))]
pub async fn delete_user(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<IdRequest>,
) -> Result<Json<ApiResponse<Empty>>, AppError> {
    state
        .users
        .delete_user(&login_user.identity(), payload.id)
        .await?;
    Ok(ok(Empty {}))
}

#[utoipa::path(
    post,
    path = "/api/user/update",
    tag = "User Admin",
    operation_id = "updateUser",
    summary = "Update any account",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated account", body = UserFullResponse),
        (status = 400, description = "Invalid input (40000)", body = ErrorBody),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not an admin (40101)", body = ErrorBody),
        (status = 404, description = "No such account (40400)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, payload), fields(id = payload.id))]
pub async fn update_user(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserFullResponse>>, AppError> {
    let user = state
        .users
        .update_user(&login_user.identity(), payload)
        .await?;
    Ok(ok(UserFullResponse { user }))
}

#[utoipa::path(
    get,
    path = "/api/user/query",
    tag = "User Admin",
    operation_id = "queryUsers",
    summary = "List accounts with full details",
    params(UserQuery),
    responses(
        (status = 200, description = "One page of accounts", body = UserFullPage),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not an admin (40101)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, query))]
pub async fn query_users(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserQuery>,
) -> Result<Json<ApiResponse<UserFullPage>>, AppError> {
    Ok(ok(state
        .users
        .query_users(&login_user.identity(), query)
        .await?))
}

#[utoipa::path(
    get,
    path = "/api/user/get",
    tag = "User Admin",
    operation_id = "getUser",
    summary = "Get one account with full details",
    params(IdQuery),
    responses(
        (status = 200, description = "Account", body = UserFullResponse),
        (status = 401, description = "Not logged in (40100)", body = ErrorBody),
        (status = 403, description = "Not an admin (40101)", body = ErrorBody),
        (status = 404, description = "No such account (40400)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, login_user, query), fields(id = query.id))]
pub async fn get_user(
    login_user: LoginUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<IdQuery>,
) -> Result<Json<ApiResponse<UserFullResponse>>, AppError> {
    let user = state.users.get_user(&login_user.identity(), query.id).await?;
    Ok(ok(UserFullResponse { user }))
}
