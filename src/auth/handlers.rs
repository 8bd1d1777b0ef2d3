use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            is_valid_email, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
            ProfileUpdateResponse, PublicUser, ResetPasswordRequest, SignupRequest,
            UpdateProfileRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        ledger::{self, LedgerError},
        password::{hash_password, verify_password},
        repo_types::User,
    },
    error::ApiError,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;
const RESET_SENT_MESSAGE: &str = "Password reset link has been sent.";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/profile", put(update_profile).patch(update_profile))
        .route("/auth/me", get(me))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let username = payload.username.trim();
    if username.len() < 3 || username.len() > 50 {
        return Err(ApiError::Validation(
            "Username must be between 3 and 50 characters".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation("Password too short".into()));
    }
    if payload.password != payload.confirm_password {
        return Err(ApiError::Validation("Passwords do not match".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;

    let user = match User::create(&state.db, username, &payload.email, &hash).await {
        Ok(u) => u,
        // Lost the race against a concurrent signup with the same email.
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "email already registered");
            return Err(ApiError::Conflict("Email already registered".into()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok("User registered successfully")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password take the same exit so the response
    // never reveals whether the account exists.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::invalid_credentials());
        }
    };

    if !verify_password(&payload.password, &user.password_hash) {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::invalid_credentials());
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(&user.email)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".into(),
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // The response is the same whether or not the email is registered.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => return Ok(Json(MessageResponse::ok(RESET_SENT_MESSAGE))),
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_reset(&user.email)?;
    let reset_link = format!("{}?token={}", state.config.mail.reset_url, token);

    // Delivery failures are logged and absorbed: the flow acknowledges the
    // request, it does not confirm delivery.
    if let Err(e) = state.mailer.send_reset_email(&user.email, &reset_link).await {
        warn!(error = %e, user_id = %user.id, "reset email delivery failed");
    } else {
        info!(user_id = %user.id, "reset email handed to mailer");
    }

    Ok(Json(MessageResponse::ok(RESET_SENT_MESSAGE)))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation("Password too short".into()));
    }

    if ledger::is_used(&state.db, &payload.token).await? {
        return Err(ApiError::Conflict("Reset link has already been used".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_reset(&payload.token).map_err(|e| {
        warn!(error = %e, "reset token rejected");
        ApiError::Unauthorized("Invalid or expired reset token")
    })?;

    let user = User::find_by_email(&state.db, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if verify_password(&payload.new_password, &user.password_hash) {
        return Err(ApiError::Validation(
            "New password must be different from your old password".into(),
        ));
    }

    let hash = hash_password(&payload.new_password)?;

    // Ledger write comes before the hash update, in one transaction. The
    // unique index on the digest resolves concurrent consumption: the loser
    // sees the same conflict as a replay.
    let mut tx = state.db.begin().await?;
    match ledger::mark_used(&mut tx, &payload.token, &user.email).await {
        Ok(()) => {}
        Err(LedgerError::AlreadyUsed) => {
            return Err(ApiError::Conflict("Reset link has already been used".into()));
        }
        Err(LedgerError::Database(e)) => return Err(e.into()),
    }
    User::update_password(&mut tx, user.id, &hash).await?;
    tx.commit().await?;

    info!(user_id = %user.id, "password reset");
    Ok(Json(MessageResponse::ok("Password reset successful.")))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileUpdateResponse>, ApiError> {
    let cfg = &state.config.profile;
    let address = payload.normalized_address()?;
    let gender = payload.normalized_gender(cfg)?;
    let age = payload.checked_age(cfg)?;

    let mut updated_fields = Vec::new();
    if address.is_some() {
        updated_fields.push("address");
    }
    if gender.is_some() {
        updated_fields.push("gender");
    }
    if age.is_some() {
        updated_fields.push("age");
    }

    if updated_fields.is_empty() {
        return Ok(Json(ProfileUpdateResponse {
            message: "No changes made to profile".into(),
            success: true,
            user: user.into(),
        }));
    }

    let updated =
        User::update_profile(&state.db, user.id, address.as_deref(), gender.as_deref(), age)
            .await?;

    info!(user_id = %updated.id, fields = ?updated_fields, "profile updated");
    Ok(Json(ProfileUpdateResponse {
        message: format!("Updated successfully: {}", updated_fields.join(", ")),
        success: true,
        user: updated.into(),
    }))
}

#[instrument(skip_all)]
pub async fn me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}
