use crate::{
    AppState,
    cache::{POINTS_CACHE_KEY, POINTS_CACHE_PATTERN, point_cache_key},
    db::CollectionPointExt,
    dtos::{
        CreatePointDto, GeoQueryDto, MessageResponseDto, PointDataDto, PointsResponseDto,
        RadiusPointsResponseDto, SinglePointResponseDto, SortedPointsResponseDto, UpdatePointDto,
        UserLocationDto,
    },
    error::HttpError,
    geo,
    middleware::{auth, role_check},
    models::{CollectionPoint, UserRole},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use validator::Validate;

const DEFAULT_RADIUS_M: f64 = 5000.0;

pub fn collection_point_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_all_points))
        .route(
            "/",
            post(create_point)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/sorted-by-distance", get(sorted_by_distance))
        .route("/nearest", get(nearest_point))
        .route("/nearby", get(nearby_points))
        .route("/{point_id}", get(get_point_by_id))
        .route(
            "/{point_id}",
            put(update_point)
                .delete(delete_point)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// GET /api/collection-points — all active points, cached for the configured
/// TTL. The cache stores the model rows; DTO mapping happens per response.
pub async fn get_all_points(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let cached: Option<Vec<CollectionPoint>> =
        app_state.cache_client.get_json(POINTS_CACHE_KEY).await;

    if let Some(points) = cached {
        let data: Vec<PointDataDto> = points.into_iter().map(PointDataDto::from_point).collect();
        return Ok(Json(PointsResponseDto {
            success: true,
            count: data.len(),
            data,
            from_cache: Some(true),
        }));
    }

    let points = app_state
        .db_client
        .list_active_points()
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing collection points: {}", e);
            HttpError::internal(
                "Error al obtener puntos de acopio",
                e,
                app_state.env.expose_internal_errors,
            )
        })?;

    app_state
        .cache_client
        .set_json(POINTS_CACHE_KEY, &points, app_state.env.cache_ttl_seconds)
        .await;

    let data: Vec<PointDataDto> = points.into_iter().map(PointDataDto::from_point).collect();

    Ok(Json(PointsResponseDto {
        success: true,
        count: data.len(),
        data,
        from_cache: None,
    }))
}

/// GET /api/collection-points/sorted-by-distance?lat=&lng=
pub async fn sorted_by_distance(
    Query(params): Query<GeoQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let (Some(lat), Some(lng)) = (params.lat, params.lng) else {
        return Err(HttpError::bad_request("Latitud y longitud son requeridas"));
    };

    let points = app_state
        .db_client
        .points_sorted_by_distance(lat, lng)
        .await
        .map_err(|e| {
            tracing::error!("DB error, sorting points by distance: {}", e);
            HttpError::internal(
                "Error al obtener puntos ordenados por distancia",
                e,
                app_state.env.expose_internal_errors,
            )
        })?;

    let data: Vec<PointDataDto> = points
        .into_iter()
        .map(PointDataDto::from_point_with_km)
        .collect();

    Ok(Json(SortedPointsResponseDto {
        success: true,
        count: data.len(),
        data,
        user_location: UserLocationDto {
            latitude: lat,
            longitude: lng,
        },
    }))
}

/// GET /api/collection-points/nearest?lat=&lng=
///
/// Primary path is the PostGIS nearest-neighbor query. When that query fails
/// (not when it is merely empty) and the cached point list is available, the
/// nearest point is picked in memory via the Haversine fallback; the few-meter
/// spherical-vs-ellipsoidal discrepancy is acceptable.
pub async fn nearest_point(
    Query(params): Query<GeoQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let (Some(lat), Some(lng)) = (params.lat, params.lng) else {
        return Err(HttpError::bad_request("Latitud y longitud son requeridas"));
    };

    match app_state.db_client.nearest_point(lat, lng).await {
        Ok(point) => Ok(Json(SinglePointResponseDto {
            success: true,
            data: PointDataDto::from_point(point),
        })),
        Err(sqlx::Error::RowNotFound) => {
            Err(HttpError::not_found("No se encontraron puntos de acopio"))
        }
        Err(e) => {
            tracing::error!("DB error, finding nearest point, trying cache fallback: {}", e);

            let cached: Option<Vec<CollectionPoint>> =
                app_state.cache_client.get_json(POINTS_CACHE_KEY).await;

            let Some(points) = cached else {
                return Err(HttpError::internal(
                    "Error al buscar punto más cercano",
                    e,
                    app_state.env.expose_internal_errors,
                ));
            };

            match geo::find_nearest(lat, lng, &points) {
                Some((point, distance)) => {
                    let mut point = point.clone();
                    point.distance = Some(distance);
                    Ok(Json(SinglePointResponseDto {
                        success: true,
                        data: PointDataDto::from_point(point),
                    }))
                }
                None => Err(HttpError::not_found("No se encontraron puntos de acopio")),
            }
        }
    }
}

/// GET /api/collection-points/nearby?lat=&lng=&radius=
pub async fn nearby_points(
    Query(params): Query<GeoQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let (Some(lat), Some(lng)) = (params.lat, params.lng) else {
        return Err(HttpError::bad_request("Latitud y longitud son requeridas"));
    };
    let radius = params.radius.unwrap_or(DEFAULT_RADIUS_M);

    let points = app_state
        .db_client
        .points_within_radius(lat, lng, radius)
        .await
        .map_err(|e| {
            tracing::error!("DB error, finding nearby points: {}", e);
            HttpError::internal(
                "Error al buscar puntos cercanos",
                e,
                app_state.env.expose_internal_errors,
            )
        })?;

    let data: Vec<PointDataDto> = points.into_iter().map(PointDataDto::from_point).collect();

    Ok(Json(RadiusPointsResponseDto {
        success: true,
        count: data.len(),
        radius: radius as i64,
        data,
    }))
}

pub async fn get_point_by_id(
    Path(point_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let cache_key = point_cache_key(point_id);

    let cached: Option<CollectionPoint> = app_state.cache_client.get_json(&cache_key).await;
    if let Some(point) = cached {
        return Ok(Json(SinglePointResponseDto {
            success: true,
            data: PointDataDto::from_point(point),
        }));
    }

    let point = app_state
        .db_client
        .get_point(point_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, fetching collection point: {}", e);
            HttpError::internal(
                "Error al obtener punto de acopio",
                e,
                app_state.env.expose_internal_errors,
            )
        })?
        .ok_or_else(|| HttpError::not_found("Punto de acopio no encontrado"))?;

    app_state
        .cache_client
        .set_json(&cache_key, &point, app_state.env.cache_ttl_seconds)
        .await;

    Ok(Json(SinglePointResponseDto {
        success: true,
        data: PointDataDto::from_point(point),
    }))
}

pub async fn create_point(
    State(app_state): State<AppState>,
    Json(body): Json<CreatePointDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let point = app_state.db_client.create_point(&body).await.map_err(|e| {
        tracing::error!("DB error, creating collection point: {}", e);
        HttpError::internal(
            "Error al crear punto de acopio",
            e,
            app_state.env.expose_internal_errors,
        )
    })?;

    // A new point changes the cached listing.
    app_state.cache_client.delete(POINTS_CACHE_KEY).await;

    tracing::info!(point_id = point.id, "Collection point created");
    Ok((
        StatusCode::CREATED,
        Json(SinglePointResponseDto {
            success: true,
            data: PointDataDto::from_point(point),
        }),
    ))
}

pub async fn update_point(
    Path(point_id): Path<i32>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdatePointDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let point = app_state
        .db_client
        .update_point(point_id, &body)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating collection point: {}", e);
            HttpError::internal(
                "Error al actualizar punto de acopio",
                e,
                app_state.env.expose_internal_errors,
            )
        })?
        .ok_or_else(|| HttpError::not_found("Punto de acopio no encontrado"))?;

    // Both the listing and the per-id entry are stale now.
    app_state
        .cache_client
        .delete_by_pattern(POINTS_CACHE_PATTERN)
        .await;

    Ok(Json(SinglePointResponseDto {
        success: true,
        data: PointDataDto::from_point(point),
    }))
}

pub async fn delete_point(
    Path(point_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_point(point_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Punto de acopio no encontrado"),
            e => {
                tracing::error!("DB error, deleting collection point: {}", e);
                HttpError::internal(
                    "Error al eliminar punto de acopio",
                    e,
                    app_state.env.expose_internal_errors,
                )
            }
        })?;

    app_state
        .cache_client
        .delete_by_pattern(POINTS_CACHE_PATTERN)
        .await;

    tracing::info!(point_id = point_id, "Collection point deleted");
    Ok(Json(MessageResponseDto {
        success: true,
        message: "Punto de acopio eliminado".to_string(),
    }))
}
