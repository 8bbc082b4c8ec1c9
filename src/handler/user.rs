use crate::{
    AppState,
    db::{ReportExt, UserExt},
    dtos::{
        LeaderboardEntryDto, LeaderboardQueryDto, LeaderboardResponseDto, PersonalStatsDataDto,
        PersonalStatsResponseDto, PublicUserDto, UserProfileDataDto, UserProfileResponseDto,
        UserStatsDto,
    },
    error::HttpError,
    middleware::{JWTAuthMiddleware, auth},
    models::User,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;
use validator::Validate;

pub fn users_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/leaderboard", get(leaderboard))
        .route("/profile/{user_id}", get(user_profile))
        .route(
            "/stats",
            get(user_stats).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

fn leaderboard_entry(rank: i64, user: &User) -> LeaderboardEntryDto {
    LeaderboardEntryDto {
        rank,
        id: user.id,
        name: user.name.clone(),
        avatar: user.avatar_url(),
        points: user.points,
        level: user.level.clone(),
        total_reports: user.total_reports,
        verified_reports: user.verified_reports,
    }
}

pub async fn leaderboard(
    Query(params): Query<LeaderboardQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let limit = params.limit.unwrap_or(50);

    let users = app_state.db_client.leaderboard(limit).await.map_err(|e| {
        tracing::error!("DB error, fetching leaderboard: {}", e);
        HttpError::internal(
            "Error al obtener tabla de líderes",
            e,
            app_state.env.expose_internal_errors,
        )
    })?;

    let data: Vec<LeaderboardEntryDto> = users
        .iter()
        .enumerate()
        .map(|(index, user)| leaderboard_entry(index as i64 + 1, user))
        .collect();

    Ok(Json(LeaderboardResponseDto {
        success: true,
        count: data.len(),
        data,
    }))
}

pub async fn user_profile(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .get_user_by_id(user_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, fetching user profile: {}", e);
            HttpError::internal(
                "Error al obtener perfil de usuario",
                e,
                app_state.env.expose_internal_errors,
            )
        })?
        .ok_or_else(|| HttpError::not_found("Usuario no encontrado"))?;

    let recent_reports = app_state
        .db_client
        .recent_public_reports_by_user(user.id, 5)
        .await
        .map_err(|e| {
            tracing::error!("DB error, fetching recent reports: {}", e);
            HttpError::internal(
                "Error al obtener perfil de usuario",
                e,
                app_state.env.expose_internal_errors,
            )
        })?;

    Ok(Json(UserProfileResponseDto {
        success: true,
        data: UserProfileDataDto {
            user: PublicUserDto {
                id: user.id,
                name: user.name.clone(),
                avatar: user.avatar_url(),
                points: user.points,
                level: user.level.clone(),
                stats: UserStatsDto::from_user(&user),
                created_at: user.created_at,
            },
            recent_reports,
        },
    }))
}

pub async fn user_stats(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let user = &jwt.user;
    let expose = app_state.env.expose_internal_errors;

    let rank = app_state
        .db_client
        .rank_for_points(user.points)
        .await
        .map_err(|e| {
            tracing::error!("DB error, computing rank: {}", e);
            HttpError::internal("Error al obtener estadísticas", e, expose)
        })?;

    let reports_by_status = app_state
        .db_client
        .report_counts_by_status(Some(user.id))
        .await
        .map_err(|e| {
            tracing::error!("DB error, grouping reports by status: {}", e);
            HttpError::internal("Error al obtener estadísticas", e, expose)
        })?;

    let reports_by_type = app_state
        .db_client
        .report_counts_by_type(Some(user.id))
        .await
        .map_err(|e| {
            tracing::error!("DB error, grouping reports by type: {}", e);
            HttpError::internal("Error al obtener estadísticas", e, expose)
        })?;

    Ok(Json(PersonalStatsResponseDto {
        success: true,
        data: PersonalStatsDataDto {
            points: user.points,
            level: user.level.clone(),
            rank,
            stats: UserStatsDto::from_user(user),
            reports_by_status,
            reports_by_type,
        },
    }))
}
