use axum::{
    Json, Router,
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use axum_helpers::{
    AppError, AuditEvent, AuditOutcome, JwtClaims, UuidPath, ValidatedForm, ValidatedJson,
    ValidatedQuery,
    errors::responses::{
        BadRequestResponse, ForbiddenResponse, InternalServerErrorResponse, InvalidUuidResponse,
        NotFoundResponse, UnauthorizedResponse, ValidationErrorResponse,
    },
    jwt_auth_middleware,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use uuid::Uuid;

use crate::error::UserError;
use crate::models::{
    CreateUser, LoginForm, RegisterUser, ResetPassword, Role, TokenResponse, UpdateBio,
    UpdateProfessionalStatus, UpdateProfilePicture, UpdateUser, User, UserListResponse,
    UserResponse, UserSearchParams,
};
use crate::pagination::{PaginationLinks, generate_links};
use crate::repository::UserRepository;
use crate::service::UserService;

const TAG: &str = "users";
const AUTH_TAG: &str = "auth";

const STAFF: &[Role] = &[Role::Admin, Role::Manager];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation for the accounts API
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        register,
        login,
        verify_email,
        me,
        list_users,
        create_user,
        get_user,
        update_user,
        delete_user,
        update_bio,
        update_profile_picture,
        update_professional_status,
        lock_user,
        unlock_user,
        reset_password,
    ),
    components(
        schemas(
            Role,
            UserResponse,
            CreateUser,
            RegisterUser,
            UpdateUser,
            UpdateBio,
            UpdateProfilePicture,
            UpdateProfessionalStatus,
            ResetPassword,
            LoginForm,
            TokenResponse,
            UserListResponse,
            PaginationLinks,
            MessageResponse,
        ),
        responses(
            BadRequestResponse,
            ValidationErrorResponse,
            InvalidUuidResponse,
            NotFoundResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = AUTH_TAG, description = "Registration, login and email verification"),
        (name = TAG, description = "User administration")
    )
)]
pub struct ApiDoc;

type SharedService<R> = Arc<UserService<R>>;

/// Create the accounts router. Paths are relative to the `/api` mount point.
///
/// `/register`, `/login` and `/verify-email/...` are public; everything else
/// needs a bearer token and, for `/users`, an admin or manager role.
pub fn router<R: UserRepository + 'static>(service: UserService<R>) -> Router {
    let jwt = service.jwt().clone();
    let shared_service = Arc::new(service);

    let protected = Router::new()
        .route("/me", get(me))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/{id}/bio", patch(update_bio))
        .route("/users/{id}/profile-picture", patch(update_profile_picture))
        .route(
            "/users/{id}/professional-status",
            patch(update_professional_status),
        )
        .route("/users/{id}/lock", post(lock_user))
        .route("/users/{id}/unlock", post(unlock_user))
        .route("/users/{id}/reset-password", post(reset_password))
        .route_layer(middleware::from_fn_with_state(jwt, jwt_auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-email/{id}/{token}", get(verify_email))
        .merge(protected)
        .with_state(shared_service)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Rejects callers whose token role is not in `allowed`.
fn authorize(
    claims: &JwtClaims,
    allowed: &[Role],
    action: &str,
    headers: &HeaderMap,
) -> Result<(), AppError> {
    let role = Role::from_str(&claims.role).ok();
    if role.is_some_and(|r| allowed.contains(&r)) {
        return Ok(());
    }

    AuditEvent::new(action, AuditOutcome::Denied)
        .with_actor(claims.user_id().ok())
        .with_request(headers)
        .with_details(json!({ "role": claims.role }))
        .log();

    Err(AppError::Forbidden("Operation not permitted".to_string()))
}

fn audit_success(action: &str, claims: &JwtClaims, user_id: Uuid, headers: &HeaderMap) {
    AuditEvent::new(action, AuditOutcome::Success)
        .with_actor(claims.user_id().ok())
        .with_resource(format!("user:{}", user_id))
        .with_request(headers)
        .log();
}

fn found(user: Option<User>) -> Result<Json<UserResponse>, AppError> {
    user.map(|u| Json(u.into()))
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/register",
    tag = AUTH_TAG,
    request_body = RegisterUser,
    responses(
        (status = 200, description = "Account created", body = UserResponse),
        (status = 400, response = BadRequestResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn register<R: UserRepository>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<RegisterUser>,
) -> Result<Json<UserResponse>, AppError> {
    let user = service.register(input).await?;

    AuditEvent::new("user.register", AuditOutcome::Success)
        .with_actor(Some(user.id))
        .with_resource(format!("user:{}", user.id))
        .with_request(&headers)
        .with_details(json!({ "role": user.role }))
        .log();

    Ok(Json(user.into()))
}

/// Exchange credentials for an access token
///
/// Form-encoded `username` (email or nickname) and `password`.
#[utoipa::path(
    post,
    path = "/login",
    tag = AUTH_TAG,
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn login<R: UserRepository>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    ValidatedForm(form): ValidatedForm<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let outcome = service.login(&form.username, &form.password).await;

    let denied = |outcome: AuditOutcome, reason: &str| {
        AuditEvent::new("user.login", outcome)
            .with_request(&headers)
            .with_details(json!({ "identifier": form.username, "reason": reason }))
            .log();
    };

    match outcome {
        Ok(Some(user)) => {
            let token = service.issue_token(&user)?;

            AuditEvent::new("user.login", AuditOutcome::Success)
                .with_actor(Some(user.id))
                .with_resource(format!("user:{}", user.id))
                .with_request(&headers)
                .log();

            Ok(Json(TokenResponse::bearer(token)))
        }
        Ok(None) => {
            denied(AuditOutcome::Failure, "invalid_credentials");
            Err(UserError::InvalidCredentials.into())
        }
        Err(UserError::AccountLocked) => {
            denied(AuditOutcome::Denied, "account_locked");
            Err(UserError::AccountLocked.into())
        }
        Err(e) => Err(AppError::InternalServerError(e.to_string())),
    }
}

/// Confirm an email address
#[utoipa::path(
    get,
    path = "/verify-email/{id}/{token}",
    tag = AUTH_TAG,
    params(
        ("id" = Uuid, Path, description = "User ID"),
        ("token" = String, Path, description = "Verification token from the email")
    ),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, response = BadRequestResponse),
        (status = 422, response = InvalidUuidResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn verify_email<R: UserRepository>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    Path((id, token)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::InvalidUuid(format!("Invalid UUID: {}", id)))?;

    let verified = service.verify_email_with_token(id, &token).await?;

    let outcome = if verified {
        AuditOutcome::Success
    } else {
        AuditOutcome::Failure
    };
    AuditEvent::new("user.verify_email", outcome)
        .with_actor(Some(id))
        .with_resource(format!("user:{}", id))
        .with_request(&headers)
        .log();

    if verified {
        Ok(MessageResponse::new("Email verified successfully"))
    } else {
        Err(UserError::InvalidVerificationToken.into())
    }
}

/// Profile of the authenticated caller
#[utoipa::path(
    get,
    path = "/me",
    tag = AUTH_TAG,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn me<R: UserRepository>(
    State(service): State<SharedService<R>>,
    claims: JwtClaims,
) -> Result<Json<UserResponse>, AppError> {
    let id = claims.user_id()?;
    found(service.get_by_id(id).await?)
}

/// Search users
///
/// Filters are combined with AND. The response carries navigation links that
/// keep the other query parameters.
#[utoipa::path(
    get,
    path = "/users",
    tag = TAG,
    security(("bearer_auth" = [])),
    params(UserSearchParams),
    responses(
        (status = 200, description = "Page of users", body = UserListResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(service): State<SharedService<R>>,
    claims: JwtClaims,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    ValidatedQuery(params): ValidatedQuery<UserSearchParams>,
) -> Result<Json<UserListResponse>, AppError> {
    authorize(&claims, ADMIN_ONLY, "user.list", &headers)?;

    let (users, total) = service.search(&params).await?;

    let base_url = format!("{}{}", service.config().base_url, uri);
    let links = generate_links(&base_url, params.skip, params.limit, total);

    Ok(Json(UserListResponse {
        items: users.into_iter().map(Into::into).collect(),
        total,
        page: params.skip / params.limit + 1,
        size: params.limit,
        links,
    }))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/users",
    tag = TAG,
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_user<R: UserRepository>(
    State(service): State<SharedService<R>>,
    claims: JwtClaims,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, STAFF, "user.create", &headers)?;
    if input.role.is_some() {
        authorize(&claims, ADMIN_ONLY, "user.assign_role", &headers)?;
    }

    let user = service.create_user(input).await?;
    audit_success("user.create", &claims, user.id, &headers);

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = TAG,
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = InvalidUuidResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(service): State<SharedService<R>>,
    claims: JwtClaims,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> Result<Json<UserResponse>, AppError> {
    authorize(&claims, STAFF, "user.read", &headers)?;
    found(service.get_by_id(id).await?)
}

/// Update a user
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = TAG,
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, response = BadRequestResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = ValidationErrorResponse)
    )
)]
async fn update_user<R: UserRepository>(
    State(service): State<SharedService<R>>,
    claims: JwtClaims,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateUser>,
) -> Result<Json<UserResponse>, AppError> {
    authorize(&claims, STAFF, "user.update", &headers)?;
    if input.role.is_some() {
        authorize(&claims, ADMIN_ONLY, "user.assign_role", &headers)?;
    }

    let user = found(service.update(id, input).await?)?;
    audit_success("user.update", &claims, id, &headers);
    Ok(user)
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = TAG,
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = InvalidUuidResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(service): State<SharedService<R>>,
    claims: JwtClaims,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> Result<StatusCode, AppError> {
    authorize(&claims, STAFF, "user.delete", &headers)?;

    if !service.delete(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    audit_success("user.delete", &claims, id, &headers);
    Ok(StatusCode::NO_CONTENT)
}

/// Replace a user's bio
#[utoipa::path(
    patch,
    path = "/users/{id}/bio",
    tag = TAG,
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateBio,
    responses(
        (status = 200, description = "Bio updated", body = UserResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = ValidationErrorResponse)
    )
)]
async fn update_bio<R: UserRepository>(
    State(service): State<SharedService<R>>,
    claims: JwtClaims,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateBio>,
) -> Result<Json<UserResponse>, AppError> {
    authorize(&claims, STAFF, "user.update_bio", &headers)?;

    let user = found(service.update_bio(id, input.bio).await?)?;
    audit_success("user.update_bio", &claims, id, &headers);
    Ok(user)
}

/// Replace a user's profile picture
#[utoipa::path(
    patch,
    path = "/users/{id}/profile-picture",
    tag = TAG,
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateProfilePicture,
    responses(
        (status = 200, description = "Picture updated", body = UserResponse),
        (status = 400, response = BadRequestResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn update_profile_picture<R: UserRepository>(
    State(service): State<SharedService<R>>,
    claims: JwtClaims,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateProfilePicture>,
) -> Result<Json<UserResponse>, AppError> {
    authorize(&claims, STAFF, "user.update_profile_picture", &headers)?;

    let user = found(
        service
            .update_profile_picture(id, input.profile_picture_url)
            .await?,
    )?;
    audit_success("user.update_profile_picture", &claims, id, &headers);
    Ok(user)
}

/// Set or clear the professional flag
#[utoipa::path(
    patch,
    path = "/users/{id}/professional-status",
    tag = TAG,
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateProfessionalStatus,
    responses(
        (status = 200, description = "Status updated", body = UserResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn update_professional_status<R: UserRepository>(
    State(service): State<SharedService<R>>,
    claims: JwtClaims,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateProfessionalStatus>,
) -> Result<Json<UserResponse>, AppError> {
    authorize(&claims, STAFF, "user.professional_status", &headers)?;

    let user = found(
        service
            .set_professional_status(id, input.is_professional)
            .await?,
    )?;
    audit_success("user.professional_status", &claims, id, &headers);
    Ok(user)
}

/// Lock an account
#[utoipa::path(
    post,
    path = "/users/{id}/lock",
    tag = TAG,
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account locked", body = UserResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn lock_user<R: UserRepository>(
    State(service): State<SharedService<R>>,
    claims: JwtClaims,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> Result<Json<UserResponse>, AppError> {
    authorize(&claims, ADMIN_ONLY, "user.lock", &headers)?;

    let user = found(service.lock_account(id).await?)?;
    audit_success("user.lock", &claims, id, &headers);
    Ok(user)
}

/// Unlock an account and reset its failed-login counter
#[utoipa::path(
    post,
    path = "/users/{id}/unlock",
    tag = TAG,
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account unlocked", body = UserResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn unlock_user<R: UserRepository>(
    State(service): State<SharedService<R>>,
    claims: JwtClaims,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> Result<Json<UserResponse>, AppError> {
    authorize(&claims, ADMIN_ONLY, "user.unlock", &headers)?;

    let user = found(service.unlock_account(id).await?)?;
    audit_success("user.unlock", &claims, id, &headers);
    Ok(user)
}

/// Set a new password
#[utoipa::path(
    post,
    path = "/users/{id}/reset-password",
    tag = TAG,
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = ResetPassword,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = ValidationErrorResponse)
    )
)]
async fn reset_password<R: UserRepository>(
    State(service): State<SharedService<R>>,
    claims: JwtClaims,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<ResetPassword>,
) -> Result<Json<MessageResponse>, AppError> {
    authorize(&claims, ADMIN_ONLY, "user.reset_password", &headers)?;

    if !service.reset_password(id, &input.new_password).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    audit_success("user.reset_password", &claims, id, &headers);
    Ok(MessageResponse::new("Password reset successfully"))
}
