use crate::{
    AppState,
    db::{DBClient, ReportExt, UserExt},
    dtos::{
        CommentInputDto, CreateReportDto, GeoQueryDto, LikeResponseDto, MessageResponseDto,
        ReportDataDto, ReportListResponseDto, ReportUserDto, ReportsQueryDto, ReportsResponseDto,
        SingleReportResponseDto, UpdateReportDto,
    },
    error::HttpError,
    middleware::{JWTAuthMiddleware, auth},
    models::{Report, User, UserRole},
    scoring::PointAction,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 20;
const DEFAULT_RADIUS_M: f64 = 5000.0;

pub fn report_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_reports))
        .route(
            "/",
            post(create_report)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/my-reports",
            get(my_reports).route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/user",
            get(my_reports).route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/nearby", get(nearby_reports))
        .route("/{report_id}", get(get_report_by_id))
        .route(
            "/{report_id}",
            put(update_report)
                .delete(delete_report)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{report_id}/like",
            post(like_report).route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{report_id}/comment",
            post(add_comment).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Attach author summaries to a batch of reports (one lookup for the whole
/// batch, joined in memory).
async fn populate_authors(
    db: &DBClient,
    reports: Vec<Report>,
) -> Result<Vec<ReportDataDto>, sqlx::Error> {
    let mut user_ids: Vec<Uuid> = reports.iter().map(|r| r.user_id).collect();
    user_ids.sort();
    user_ids.dedup();

    let authors: HashMap<Uuid, ReportUserDto> = db
        .get_report_authors(&user_ids)
        .await?
        .into_iter()
        .map(|author| (author.id, author))
        .collect();

    Ok(reports
        .into_iter()
        .map(|report| {
            let author = authors.get(&report.user_id).cloned();
            ReportDataDto::from_report(report, author)
        })
        .collect())
}

fn author_from_user(user: &User) -> ReportUserDto {
    ReportUserDto {
        id: user.id,
        name: user.name.clone(),
        avatar: user.avatar.clone(),
        points: user.points,
        level: user.level.clone(),
    }
}

/// Owner-or-admin check shared by update and delete.
fn can_modify(report: &Report, user: &User) -> bool {
    report.user_id == user.id || user.role == UserRole::Admin
}

pub async fn get_reports(
    Query(params): Query<ReportsQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let expose = app_state.env.expose_internal_errors;
    let page = params.page.unwrap_or(DEFAULT_PAGE);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = (page - 1) * limit;

    let reports = app_state
        .db_client
        .list_public_reports(params.status, params.report_type, params.severity, limit, offset)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing reports: {}", e);
            HttpError::internal("Error al obtener reportes", e, expose)
        })?;

    let total = app_state
        .db_client
        .count_public_reports(params.status, params.report_type, params.severity)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting reports: {}", e);
            HttpError::internal("Error al obtener reportes", e, expose)
        })?;

    let data = populate_authors(&app_state.db_client, reports)
        .await
        .map_err(|e| {
            tracing::error!("DB error, fetching report authors: {}", e);
            HttpError::internal("Error al obtener reportes", e, expose)
        })?;

    let pages = (total as f64 / limit as f64).ceil() as i64;

    Ok(Json(ReportListResponseDto {
        success: true,
        count: data.len(),
        total,
        page,
        pages,
        data,
    }))
}

pub async fn my_reports(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let reports = app_state
        .db_client
        .list_reports_by_user(jwt.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing user reports: {}", e);
            HttpError::internal(
                "Error al obtener reportes del usuario",
                e,
                app_state.env.expose_internal_errors,
            )
        })?;

    let data: Vec<ReportDataDto> = reports
        .into_iter()
        .map(|report| ReportDataDto::from_report(report, None))
        .collect();

    Ok(Json(ReportsResponseDto {
        success: true,
        count: data.len(),
        data,
    }))
}

pub async fn nearby_reports(
    Query(params): Query<GeoQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let (Some(lat), Some(lng)) = (params.lat, params.lng) else {
        return Err(HttpError::bad_request("Latitud y longitud son requeridas"));
    };
    let radius = params.radius.unwrap_or(DEFAULT_RADIUS_M);
    let expose = app_state.env.expose_internal_errors;

    let reports = app_state
        .db_client
        .list_nearby_reports(lat, lng, radius)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing nearby reports: {}", e);
            HttpError::internal("Error al obtener reportes cercanos", e, expose)
        })?;

    let data = populate_authors(&app_state.db_client, reports)
        .await
        .map_err(|e| {
            tracing::error!("DB error, fetching report authors: {}", e);
            HttpError::internal("Error al obtener reportes cercanos", e, expose)
        })?;

    Ok(Json(ReportsResponseDto {
        success: true,
        count: data.len(),
        data,
    }))
}

pub async fn get_report_by_id(
    Path(report_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let expose = app_state.env.expose_internal_errors;

    let report = app_state
        .db_client
        .get_report(report_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, fetching report: {}", e);
            HttpError::internal("Error al obtener reporte", e, expose)
        })?
        .ok_or_else(|| HttpError::not_found("Reporte no encontrado"))?;

    let mut data = populate_authors(&app_state.db_client, vec![report])
        .await
        .map_err(|e| {
            tracing::error!("DB error, fetching report author: {}", e);
            HttpError::internal("Error al obtener reporte", e, expose)
        })?;

    Ok(Json(SingleReportResponseDto {
        success: true,
        data: data.remove(0),
        message: None,
    }))
}

pub async fn create_report(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateReportDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let Some((longitude, latitude)) = body.location.lon_lat() else {
        return Err(HttpError::bad_request("Las coordenadas son requeridas"));
    };

    let expose = app_state.env.expose_internal_errors;

    let report = app_state
        .db_client
        .create_report(jwt.user.id, &body, longitude, latitude)
        .await
        .map_err(|e| {
            tracing::error!("DB error, creating report: {}", e);
            HttpError::internal("Error al crear reporte", e, expose)
        })?;

    // Reward the reporter and bump their counter; the report itself is
    // already persisted, so failures here are logged, not surfaced.
    let action = PointAction::CreateReport;
    let author = match app_state
        .db_client
        .add_points(jwt.user.id, action.value(), action.reason())
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => jwt.user.clone(),
        Err(e) => {
            tracing::error!(user_id = %jwt.user.id, "Failed to grant points: {}", e);
            jwt.user.clone()
        }
    };

    if let Err(e) = app_state.db_client.increment_total_reports(jwt.user.id).await {
        tracing::error!(user_id = %jwt.user.id, "Failed to update report counter: {}", e);
    }

    tracing::info!(report_id = %report.id, user_id = %jwt.user.id, "Report created");
    Ok((
        StatusCode::CREATED,
        Json(SingleReportResponseDto {
            success: true,
            data: ReportDataDto::from_report(report, Some(author_from_user(&author))),
            message: Some(format!(
                "Reporte creado exitosamente. ¡Has ganado {} puntos!",
                action.value()
            )),
        }),
    ))
}

pub async fn update_report(
    Path(report_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateReportDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let expose = app_state.env.expose_internal_errors;

    let report = app_state
        .db_client
        .get_report(report_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, fetching report: {}", e);
            HttpError::internal("Error al actualizar reporte", e, expose)
        })?
        .ok_or_else(|| HttpError::not_found("Reporte no encontrado"))?;

    if !can_modify(&report, &jwt.user) {
        return Err(HttpError::forbidden(
            "No autorizado para actualizar este reporte",
        ));
    }

    let updated = app_state
        .db_client
        .update_report(report_id, &body)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating report: {}", e);
            HttpError::internal("Error al actualizar reporte", e, expose)
        })?
        .ok_or_else(|| HttpError::not_found("Reporte no encontrado"))?;

    let mut data = populate_authors(&app_state.db_client, vec![updated])
        .await
        .map_err(|e| {
            tracing::error!("DB error, fetching report author: {}", e);
            HttpError::internal("Error al actualizar reporte", e, expose)
        })?;

    Ok(Json(SingleReportResponseDto {
        success: true,
        data: data.remove(0),
        message: None,
    }))
}

pub async fn delete_report(
    Path(report_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let expose = app_state.env.expose_internal_errors;

    let report = app_state
        .db_client
        .get_report(report_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, fetching report: {}", e);
            HttpError::internal("Error al eliminar reporte", e, expose)
        })?
        .ok_or_else(|| HttpError::not_found("Reporte no encontrado"))?;

    if !can_modify(&report, &jwt.user) {
        return Err(HttpError::forbidden(
            "No autorizado para eliminar este reporte",
        ));
    }

    app_state
        .db_client
        .delete_report(report_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Reporte no encontrado"),
            e => {
                tracing::error!("DB error, deleting report: {}", e);
                HttpError::internal("Error al eliminar reporte", e, expose)
            }
        })?;

    tracing::info!(report_id = %report_id, user_id = %jwt.user.id, "Report deleted");
    Ok(Json(MessageResponseDto {
        success: true,
        message: "Reporte eliminado".to_string(),
    }))
}

pub async fn like_report(
    Path(report_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let (liked, likes_count) = app_state
        .db_client
        .toggle_like(report_id, jwt.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, toggling like: {}", e);
            HttpError::internal(
                "Error al procesar like",
                e,
                app_state.env.expose_internal_errors,
            )
        })?
        .ok_or_else(|| HttpError::not_found("Reporte no encontrado"))?;

    Ok(Json(LikeResponseDto {
        success: true,
        liked,
        likes_count,
    }))
}

pub async fn add_comment(
    Path(report_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<CommentInputDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let expose = app_state.env.expose_internal_errors;

    let report = app_state
        .db_client
        .add_comment(report_id, jwt.user.id, &body.text)
        .await
        .map_err(|e| {
            tracing::error!("DB error, adding comment: {}", e);
            HttpError::internal("Error al agregar comentario", e, expose)
        })?
        .ok_or_else(|| HttpError::not_found("Reporte no encontrado"))?;

    let mut data = populate_authors(&app_state.db_client, vec![report])
        .await
        .map_err(|e| {
            tracing::error!("DB error, fetching report author: {}", e);
            HttpError::internal("Error al agregar comentario", e, expose)
        })?;

    Ok(Json(SingleReportResponseDto {
        success: true,
        data: data.remove(0),
        message: None,
    }))
}
