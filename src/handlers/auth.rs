use axum::{extract::State, http::StatusCode, response::Json};
use uuid::Uuid;

use crate::{
    auth::{JwtService, PasswordService},
    database::queries::UserQueries,
    errors::{AppError, Result},
    handlers::{success, AppState},
    middleware::AuthenticatedUser,
    models::{AuthResponse, CreateUserRequest, LoginRequest, UserResponse},
};

fn validate_username(username: &str) -> Result<()> {
    if username.len() < 3 || username.len() > 80 {
        return Err(AppError::Validation(
            "Username must be between 3 and 80 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username can only contain letters, numbers, and underscores".to_string(),
        ));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    if !request.email.contains('@') {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }
    validate_username(&request.username)?;
    PasswordService::validate_password_strength(&request.password)?;

    if UserQueries::find_by_email(state.database.pool(), &request.email)
        .await?
        .is_some()
    {
        return Err(AppError::Validation(
            "User with this email already exists".to_string(),
        ));
    }
    if UserQueries::find_by_username(state.database.pool(), &request.username)
        .await?
        .is_some()
    {
        return Err(AppError::Validation(
            "Username is already taken".to_string(),
        ));
    }

    let password_hash = PasswordService::hash_password(&request.password)?;

    let user = UserQueries::create_user(
        state.database.pool(),
        &request.email,
        &request.username,
        &password_hash,
        request.display_name.as_deref(),
    )
    .await?;

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let access_token = jwt_service.generate_access_token(user.id, &user.username)?;
    let refresh_token = jwt_service.generate_refresh_token(user.id, &user.username)?;

    let response = AuthResponse {
        access_token,
        refresh_token,
        user: UserResponse::from(user),
    };

    Ok((StatusCode::CREATED, success(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    let user = UserQueries::find_by_email(state.database.pool(), &request.email)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid email or password".to_string()))?;

    if !PasswordService::verify_password(&request.password, &user.password_hash)? {
        return Err(AppError::Auth("Invalid email or password".to_string()));
    }

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let access_token = jwt_service.generate_access_token(user.id, &user.username)?;
    let refresh_token = jwt_service.generate_refresh_token(user.id, &user.username)?;

    let response = AuthResponse {
        access_token,
        refresh_token,
        user: UserResponse::from(user),
    };

    Ok(success(response))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>> {
    let refresh_token = request
        .get("refresh_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::Validation("Refresh token is required".to_string()))?;

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let claims = jwt_service.verify_refresh_token(refresh_token)?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Auth("Invalid user ID in token".to_string()))?;

    let user = UserQueries::find_by_id(state.database.pool(), user_id)
        .await?
        .ok_or_else(|| AppError::Auth("User not found".to_string()))?;

    let access_token = jwt_service.generate_access_token(user.id, &user.username)?;

    Ok(success(serde_json::json!({
        "access_token": access_token,
        "user": UserResponse::from(user),
    })))
}

pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>> {
    let user = UserQueries::find_by_id(state.database.pool(), user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(success(UserResponse::from(user)))
}
