use crate::{
    AppState,
    cache::{login_identifier_key, login_ip_key},
    db::UserExt,
    dtos::{
        AuthResponseDto, AuthUserDto, ChangePasswordDto, LoginUserDto, MessageResponseDto,
        ProfileResponseDto, ProfileUserDto, RegisterUserDto, UpdateProfileDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, auth},
    utils::{password, token},
};
use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_client_ip::ClientIp;
use validator::Validate;

use tracing::instrument;

// Login attempt ceilings, enforced through the cache client and therefore
// fail-open when Redis is absent.
const MAX_IP_ATTEMPTS: i64 = 100;
const IP_WINDOW_SECONDS: u64 = 24 * 60 * 60;
const MAX_IDENTIFIER_ATTEMPTS: i64 = 10;
const IDENTIFIER_WINDOW_SECONDS: u64 = 60 * 60;

pub fn auth_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route(
            "/login",
            post(login).layer(app_state.ip_extraction.clone().into_extension()),
        )
        .route(
            "/me",
            get(me).route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/update-profile",
            put(update_profile)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/change-password",
            put(change_password).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    let result = app_state
        .db_client
        .save_user(&body.name, &body.email, &hash_password, body.phone.as_deref())
        .await;

    let user = match result {
        Ok(user) => user,
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tracing::error!("DB error, saving user, unique violation: {}", db_err);
            return Err(HttpError::bad_request("El usuario ya existe"));
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            return Err(HttpError::internal(
                "Error al registrar usuario",
                e,
                app_state.env.expose_internal_errors,
            ));
        }
    };

    let token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    tracing::info!(user_id = %user.id, "Register successful");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponseDto {
            success: true,
            token,
            user: AuthUserDto::from_user(&user),
        }),
    ))
}

#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn login(
    ClientIp(ip): ClientIp,
    State(app_state): State<AppState>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    let cache = &app_state.cache_client;
    let ip_key = login_ip_key(&ip.to_string());
    let identifier_key = login_identifier_key(&ip.to_string(), &body.email);

    let ip_attempts = cache.get_counter(&ip_key).await.unwrap_or(0);
    let identifier_attempts = cache.get_counter(&identifier_key).await.unwrap_or(0);
    if ip_attempts >= MAX_IP_ATTEMPTS || identifier_attempts >= MAX_IDENTIFIER_ATTEMPTS {
        tracing::warn!(ip = %ip, "Login attempt limit exceeded");
        return Err(HttpError::new(
            "Demasiadas peticiones desde esta IP, por favor intenta más tarde",
            StatusCode::TOO_MANY_REQUESTS,
        ));
    }

    match authenticate(&app_state, &body).await {
        Ok(response) => {
            cache.delete(&identifier_key).await;
            tracing::info!(email = %body.email, ip = %ip, "Login successful");
            Ok(response)
        }
        Err(e) => {
            cache.increment_counter(&ip_key, IP_WINDOW_SECONDS).await;
            cache
                .increment_counter(&identifier_key, IDENTIFIER_WINDOW_SECONDS)
                .await;
            Err(e)
        }
    }
}

async fn authenticate(
    app_state: &AppState,
    body: &LoginUserDto,
) -> Result<Json<AuthResponseDto>, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .get_user_by_email(&body.email)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::internal(
                "Error al iniciar sesión",
                e,
                app_state.env.expose_internal_errors,
            )
        })?;

    let user = user.ok_or_else(|| HttpError::unauthorized("Credenciales inválidas"))?;

    let password_matched = password::compare(&body.password, &user.password).map_err(|e| {
        tracing::error!("Password error: {}", e);
        HttpError::unauthorized("Credenciales inválidas")
    })?;

    if !password_matched {
        tracing::error!(user_id = %user.id, "Password mismatch");
        return Err(HttpError::unauthorized("Credenciales inválidas"));
    }

    if let Err(e) = app_state.db_client.update_last_login(user.id).await {
        tracing::warn!(user_id = %user.id, "Failed to update last login: {}", e);
    }

    let token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(AuthResponseDto {
        success: true,
        token,
        user: AuthUserDto::from_user(&user),
    }))
}

pub async fn me(
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(ProfileResponseDto {
        success: true,
        user: ProfileUserDto::from_user(&jwt.user),
    }))
}

pub async fn update_profile(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .db_client
        .update_profile(jwt.user.id, &body)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating profile: {}", e);
            HttpError::internal(
                "Error al actualizar perfil",
                e,
                app_state.env.expose_internal_errors,
            )
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::UserNoLongerExist.to_string()))?;

    Ok(Json(ProfileResponseDto {
        success: true,
        user: ProfileUserDto::from_user(&user),
    }))
}

pub async fn change_password(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<ChangePasswordDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let current_matches =
        password::compare(&body.current_password, &jwt.user.password).map_err(|e| {
            tracing::error!("Password error: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if !current_matches {
        return Err(HttpError::unauthorized("Contraseña actual incorrecta"));
    }

    let hash_password = password::hash(&body.new_password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    app_state
        .db_client
        .update_password(jwt.user.id, &hash_password)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating password: {}", e);
            HttpError::internal(
                "Error al cambiar contraseña",
                e,
                app_state.env.expose_internal_errors,
            )
        })?;

    tracing::info!(user_id = %jwt.user.id, "Password changed");
    Ok(Json(MessageResponseDto {
        success: true,
        message: "Contraseña actualizada exitosamente".to_string(),
    }))
}
