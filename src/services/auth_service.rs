use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    entity::admin_users::{ActiveModel as AdminActive, Column as AdminCol, Entity as AdminUsers},
    error::{AppError, AppResult},
    models::AdminUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn register_admin(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AdminUser>> {
    let RegisterRequest {
        email,
        password,
        name,
    } = payload;

    if email.trim().is_empty() || password.is_empty() || name.trim().is_empty() {
        return Err(AppError::MissingFields("email, password, name".into()));
    }

    let exists = AdminUsers::find()
        .filter(AdminCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();

    let admin = AdminActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        name: Set(name.trim().to_string()),
        password_hash: Set(password_hash),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.id),
        "admin_register",
        Some("admin_users"),
        Some(serde_json::json!({ "admin_id": admin.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Admin created", admin.into(), None))
}

pub async fn login_admin(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let admin = AdminUsers::find()
        .filter(AdminCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    let admin = match admin {
        Some(a) => a,
        None => return Err(AppError::BadRequest("Invalid email or password".into())),
    };

    let parsed_hash = PasswordHash::new(&admin.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: admin.id.to_string(),
        role: "admin".to_string(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    let resp = LoginResponse {
        token: format!("Bearer {}", token),
    };

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.id),
        "admin_login",
        Some("admin_users"),
        Some(serde_json::json!({ "admin_id": admin.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}
