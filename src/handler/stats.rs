use crate::{
    AppState,
    db::{CollectionPointExt, ReportExt, UserExt},
    dtos::{
        LeaderboardEntryDto, OverviewDataDto, OverviewResponseDto, PointsOverviewDto,
        ReportsOverviewDto, ReportsStatsDataDto, ReportsStatsResponseDto, UsersOverviewDto,
        UsersStatsDataDto, UsersStatsResponseDto,
    },
    error::HttpError,
    middleware::{auth, role_check},
    models::{ReportStatus, UserRole},
};
use axum::{Json, Router, extract::State, middleware, response::IntoResponse, routing::get};
use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Utc};

/// Admin-only aggregate statistics.
pub fn stats_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/reports", get(reports_stats))
        .route("/users", get(users_stats))
        .layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .layer(middleware::from_fn_with_state(app_state, auth))
}

/// First instant of the current month, UTC.
fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

pub async fn overview(State(app_state): State<AppState>) -> Result<impl IntoResponse, HttpError> {
    let db = &app_state.db_client;
    let expose = app_state.env.expose_internal_errors;
    let since_month_start = month_start(Utc::now());

    let result: Result<OverviewDataDto, sqlx::Error> = async {
        Ok(OverviewDataDto {
            users: UsersOverviewDto {
                total: db.count_users().await?,
                active: db.count_active_users().await?,
                new_this_month: db.count_users_since(since_month_start).await?,
            },
            reports: ReportsOverviewDto {
                total: db.count_reports().await?,
                pending: db.count_reports_with_status(ReportStatus::Pendiente).await?,
                resolved: db.count_reports_with_status(ReportStatus::Resuelto).await?,
                this_month: db.count_reports_since(since_month_start).await?,
            },
            collection_points: PointsOverviewDto {
                total: db.count_points().await?,
                active: db.count_active_points().await?,
            },
        })
    }
    .await;

    let data = result.map_err(|e| {
        tracing::error!("DB error, building overview stats: {}", e);
        HttpError::internal("Error al obtener estadísticas generales", e, expose)
    })?;

    Ok(Json(OverviewResponseDto {
        success: true,
        data,
    }))
}

pub async fn reports_stats(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let db = &app_state.db_client;
    let expose = app_state.env.expose_internal_errors;
    let six_months_ago = Utc::now()
        .checked_sub_months(Months::new(6))
        .unwrap_or_else(Utc::now);

    let result: Result<ReportsStatsDataDto, sqlx::Error> = async {
        Ok(ReportsStatsDataDto {
            by_type: db.report_counts_by_type(None).await?,
            by_status: db.report_counts_by_status(None).await?,
            by_severity: db.report_counts_by_severity().await?,
            trend: db.report_monthly_trend(six_months_ago).await?,
        })
    }
    .await;

    let data = result.map_err(|e| {
        tracing::error!("DB error, building report stats: {}", e);
        HttpError::internal("Error al obtener estadísticas de reportes", e, expose)
    })?;

    Ok(Json(ReportsStatsResponseDto {
        success: true,
        data,
    }))
}

pub async fn users_stats(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let db = &app_state.db_client;
    let expose = app_state.env.expose_internal_errors;
    let thirty_days_ago = Utc::now() - Duration::days(30);

    let by_level = db.user_counts_by_level().await.map_err(|e| {
        tracing::error!("DB error, grouping users by level: {}", e);
        HttpError::internal("Error al obtener estadísticas de usuarios", e, expose)
    })?;

    let top_users: Vec<LeaderboardEntryDto> = db
        .leaderboard(10)
        .await
        .map_err(|e| {
            tracing::error!("DB error, fetching top users: {}", e);
            HttpError::internal("Error al obtener estadísticas de usuarios", e, expose)
        })?
        .iter()
        .enumerate()
        .map(|(index, user)| LeaderboardEntryDto {
            rank: index as i64 + 1,
            id: user.id,
            name: user.name.clone(),
            avatar: user.avatar_url(),
            points: user.points,
            level: user.level.clone(),
            total_reports: user.total_reports,
            verified_reports: user.verified_reports,
        })
        .collect();

    let new_users = db.count_users_since(thirty_days_ago).await.map_err(|e| {
        tracing::error!("DB error, counting new users: {}", e);
        HttpError::internal("Error al obtener estadísticas de usuarios", e, expose)
    })?;

    Ok(Json(UsersStatsResponseDto {
        success: true,
        data: UsersStatsDataDto {
            by_level,
            top_users,
            new_users_last_30_days: new_users,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_start_truncates_to_the_first_day() {
        let now = Utc.with_ymd_and_hms(2026, 8, 19, 15, 42, 7).unwrap();
        let start = month_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
    }
}
