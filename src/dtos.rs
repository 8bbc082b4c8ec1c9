use crate::models::{
    CollectionPoint, Report, ReportStatus, ReportType, Severity, User, Visibility,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// DTOs keep the wire shapes of the mobile API stable and independent from the
// database models: `{success, ...}` envelopes, camelCase report fields,
// snake_case collection-point fields.

// ============================================================================
// Auth
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, max = 100, message = "El nombre es requerido"))]
    pub name: String,

    #[validate(email(message = "Email inválido"))]
    pub email: String,

    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    pub password: String,

    pub phone: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(email(message = "Email inválido"))]
    pub email: String,

    #[validate(length(min = 1, message = "La contraseña es requerida"))]
    pub password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, max = 100, message = "El nombre no puede estar vacío"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<serde_json::Value>,
    pub preferences: Option<serde_json::Value>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordDto {
    #[validate(length(min = 1, message = "La contraseña actual es requerida"))]
    pub current_password: String,

    #[validate(length(min = 6, message = "La nueva contraseña debe tener al menos 6 caracteres"))]
    pub new_password: String,
}

/// User payload embedded in register/login responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthUserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub points: i32,
    pub level: String,
    pub avatar: String,
}

impl AuthUserDto {
    pub fn from_user(user: &User) -> Self {
        AuthUserDto {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role.to_str().to_string(),
            points: user.points,
            level: user.level.clone(),
            avatar: user.avatar_url(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponseDto {
    pub success: bool,
    pub token: String,
    pub user: AuthUserDto,
}

/// Full own-profile payload for `GET /api/auth/me`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub points: i32,
    pub level: String,
    pub avatar: String,
    pub address: Option<serde_json::Value>,
    pub stats: UserStatsDto,
    pub preferences: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ProfileUserDto {
    pub fn from_user(user: &User) -> Self {
        ProfileUserDto {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role.to_str().to_string(),
            points: user.points,
            level: user.level.clone(),
            avatar: user.avatar_url(),
            address: user.address.clone(),
            stats: UserStatsDto::from_user(user),
            preferences: user.preferences.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponseDto {
    pub success: bool,
    pub user: ProfileUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsDto {
    pub total_reports: i32,
    pub verified_reports: i32,
    pub proper_disposals: i32,
    pub recycling_actions: i32,
}

impl UserStatsDto {
    pub fn from_user(user: &User) -> Self {
        UserStatsDto {
            total_reports: user.total_reports,
            verified_reports: user.verified_reports,
            proper_disposals: user.proper_disposals,
            recycling_actions: user.recycling_actions,
        }
    }
}

// ============================================================================
// Users: leaderboard, public profile, personal stats
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct LeaderboardQueryDto {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryDto {
    pub rank: i64,
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
    pub points: i32,
    pub level: String,
    pub total_reports: i32,
    pub verified_reports: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaderboardResponseDto {
    pub success: bool,
    pub count: usize,
    pub data: Vec<LeaderboardEntryDto>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUserDto {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
    pub points: i32,
    pub level: String,
    pub stats: UserStatsDto,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentReportDto {
    pub id: Uuid,
    pub title: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub status: ReportStatus,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileDataDto {
    pub user: PublicUserDto,
    pub recent_reports: Vec<RecentReportDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserProfileResponseDto {
    pub success: bool,
    pub data: UserProfileDataDto,
}

/// Count keyed by an enum label (status, type, severity, level).
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CountRowDto {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalStatsDataDto {
    pub points: i32,
    pub level: String,
    pub rank: i64,
    pub stats: UserStatsDto,
    pub reports_by_status: Vec<CountRowDto>,
    pub reports_by_type: Vec<CountRowDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PersonalStatsResponseDto {
    pub success: bool,
    pub data: PersonalStatsDataDto,
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct ReportsQueryDto {
    pub status: Option<ReportStatus>,
    #[serde(rename = "type")]
    pub report_type: Option<ReportType>,
    pub severity: Option<Severity>,

    #[validate(range(min = 1))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

/// Shared query shape for the distance-aware endpoints. Presence of lat/lng
/// is checked by the handlers so the 400 carries the API's own message.
#[derive(Debug, Deserialize)]
pub struct GeoQueryDto {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
}

/// GeoJSON-style point attached to report payloads:
/// `{"type": "Point", "coordinates": [lon, lat], "address": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationDto {
    #[serde(rename = "type", default = "default_point_kind")]
    pub kind: String,
    pub coordinates: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

fn default_point_kind() -> String {
    "Point".to_string()
}

impl LocationDto {
    pub fn from_lon_lat(longitude: f64, latitude: f64, address: Option<String>) -> Self {
        LocationDto {
            kind: "Point".to_string(),
            coordinates: vec![longitude, latitude],
            address,
        }
    }

    /// `(longitude, latitude)` when the coordinate pair is well formed.
    pub fn lon_lat(&self) -> Option<(f64, f64)> {
        match self.coordinates.as_slice() {
            [lon, lat] if lon.is_finite() && lat.is_finite() => Some((*lon, *lat)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportDto {
    #[serde(rename = "type")]
    pub report_type: ReportType,

    #[validate(length(min = 1, max = 200, message = "El título es requerido (máximo 200 caracteres)"))]
    pub title: String,

    #[validate(length(min = 1, max = 1000, message = "La descripción es requerida (máximo 1000 caracteres)"))]
    pub description: String,

    pub location: LocationDto,

    #[serde(default)]
    pub images: Vec<String>,

    pub severity: Option<Severity>,
    pub visibility: Option<Visibility>,

    #[serde(rename = "collectionPoint")]
    pub collection_point: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReportDto {
    #[serde(rename = "type")]
    pub report_type: Option<ReportType>,

    #[validate(length(min = 1, max = 200, message = "El título no puede estar vacío (máximo 200 caracteres)"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 1000, message = "La descripción no puede estar vacía (máximo 1000 caracteres)"))]
    pub description: Option<String>,

    pub location: Option<LocationDto>,
    pub severity: Option<Severity>,
    pub status: Option<ReportStatus>,
    pub visibility: Option<Visibility>,
    pub assigned_to: Option<Uuid>,
    pub collection_point: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentInputDto {
    #[validate(length(min = 1, max = 500, message = "El comentario no puede estar vacío (máximo 500 caracteres)"))]
    pub text: String,
}

/// Author summary joined onto report payloads.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReportUserDto {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub points: i32,
    pub level: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDataDto {
    pub id: Uuid,
    pub user: Option<ReportUserDto>,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub title: String,
    pub description: String,
    pub location: LocationDto,
    pub images: Vec<String>,
    pub severity: Severity,
    pub status: ReportStatus,
    pub priority: i32,
    pub assigned_to: Option<Uuid>,
    pub collection_point: Option<i32>,
    pub verification: Option<serde_json::Value>,
    pub resolution: Option<serde_json::Value>,
    pub likes: Vec<Uuid>,
    pub likes_count: usize,
    pub comments: serde_json::Value,
    pub comments_count: usize,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReportDataDto {
    pub fn from_report(report: Report, user: Option<ReportUserDto>) -> Self {
        let likes_count = report.likes_count();
        let comments_count = report.comments_count();
        ReportDataDto {
            id: report.id,
            user,
            report_type: report.report_type,
            title: report.title,
            description: report.description,
            location: LocationDto::from_lon_lat(
                report.longitude,
                report.latitude,
                report.location_address,
            ),
            images: report.images,
            severity: report.severity,
            status: report.status,
            priority: report.priority,
            assigned_to: report.assigned_to,
            collection_point: report.collection_point,
            verification: report.verification,
            resolution: report.resolution,
            likes: report.likes,
            likes_count,
            comments: report.comments,
            comments_count,
            visibility: report.visibility,
            created_at: report.created_at,
            updated_at: report.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportListResponseDto {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
    pub data: Vec<ReportDataDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportsResponseDto {
    pub success: bool,
    pub count: usize,
    pub data: Vec<ReportDataDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SingleReportResponseDto {
    pub success: bool,
    pub data: ReportDataDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponseDto {
    pub success: bool,
    pub liked: bool,
    pub likes_count: usize,
}

// ============================================================================
// Collection points
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePointDto {
    #[validate(length(min = 1, max = 255, message = "El nombre es requerido"))]
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub point_type: Option<String>,
    pub capacity: Option<i32>,
    pub waste_types: Option<Vec<String>>,
    pub latitude: f64,
    pub longitude: f64,
    pub operating_hours: Option<serde_json::Value>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePointDto {
    #[validate(length(min = 1, max = 255, message = "El nombre no puede estar vacío"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub point_type: Option<String>,
    pub capacity: Option<i32>,
    pub current_fill: Option<i32>,
    pub waste_types: Option<Vec<String>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub operating_hours: Option<serde_json::Value>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub is_active: Option<bool>,
    pub image_url: Option<String>,
}

/// GeoJSON point without the free-text address, used on collection points.
#[derive(Debug, Serialize, Deserialize)]
pub struct PointGeometryDto {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointDataDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub point_type: Option<String>,
    pub capacity: Option<i32>,
    pub current_fill: i32,
    pub waste_types: Option<Vec<String>>,
    pub longitude: f64,
    pub latitude: f64,
    pub location: PointGeometryDto,
    pub operating_hours: Option<serde_json::Value>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub is_active: bool,
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Meters from the query origin, rounded; only on distance-aware queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<i64>,
    /// Kilometers with two decimals, only on the sorted-by-distance listing.
    #[serde(rename = "distanceKm", skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<String>,
}

impl PointDataDto {
    pub fn from_point(point: CollectionPoint) -> Self {
        let distance = point.distance.map(|d| d.round() as i64);
        PointDataDto {
            id: point.id,
            name: point.name,
            description: point.description,
            address: point.address,
            point_type: point.point_type,
            capacity: point.capacity,
            current_fill: point.current_fill,
            waste_types: point.waste_types,
            longitude: point.longitude,
            latitude: point.latitude,
            location: PointGeometryDto {
                kind: "Point".to_string(),
                coordinates: [point.longitude, point.latitude],
            },
            operating_hours: point.operating_hours,
            contact_phone: point.contact_phone,
            contact_email: point.contact_email,
            is_active: point.is_active,
            image_url: point.image_url,
            created_at: point.created_at,
            updated_at: point.updated_at,
            distance,
            distance_km: None,
        }
    }

    /// Variant carrying `distanceKm` alongside the rounded meters.
    pub fn from_point_with_km(point: CollectionPoint) -> Self {
        let distance_km = point.distance.map(|d| format!("{:.2}", d / 1000.0));
        let mut dto = PointDataDto::from_point(point);
        dto.distance_km = distance_km;
        dto
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointsResponseDto {
    pub success: bool,
    pub count: usize,
    pub data: Vec<PointDataDto>,
    #[serde(rename = "fromCache", skip_serializing_if = "Option::is_none")]
    pub from_cache: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLocationDto {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SortedPointsResponseDto {
    pub success: bool,
    pub count: usize,
    pub data: Vec<PointDataDto>,
    #[serde(rename = "userLocation")]
    pub user_location: UserLocationDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RadiusPointsResponseDto {
    pub success: bool,
    pub count: usize,
    pub radius: i64,
    pub data: Vec<PointDataDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SinglePointResponseDto {
    pub success: bool,
    pub data: PointDataDto,
}

// ============================================================================
// Stats
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersOverviewDto {
    pub total: i64,
    pub active: i64,
    pub new_this_month: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsOverviewDto {
    pub total: i64,
    pub pending: i64,
    pub resolved: i64,
    pub this_month: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointsOverviewDto {
    pub total: i64,
    pub active: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewDataDto {
    pub users: UsersOverviewDto,
    pub reports: ReportsOverviewDto,
    pub collection_points: PointsOverviewDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OverviewResponseDto {
    pub success: bool,
    pub data: OverviewDataDto,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrendRowDto {
    pub year: i32,
    pub month: i32,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsStatsDataDto {
    pub by_type: Vec<CountRowDto>,
    pub by_status: Vec<CountRowDto>,
    pub by_severity: Vec<CountRowDto>,
    pub trend: Vec<TrendRowDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportsStatsResponseDto {
    pub success: bool,
    pub data: ReportsStatsDataDto,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersStatsDataDto {
    pub by_level: Vec<CountRowDto>,
    pub top_users: Vec<LeaderboardEntryDto>,
    pub new_users_last_30_days: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersStatsResponseDto {
    pub success: bool,
    pub data: UsersStatsDataDto,
}

// ============================================================================
// Misc
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponseDto {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponseDto {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_dto_accepts_lon_lat_pairs_only() {
        let good = LocationDto {
            kind: "Point".to_string(),
            coordinates: vec![-78.6155, -0.9322],
            address: None,
        };
        assert_eq!(good.lon_lat(), Some((-78.6155, -0.9322)));

        let short = LocationDto {
            kind: "Point".to_string(),
            coordinates: vec![-78.6155],
            address: None,
        };
        assert_eq!(short.lon_lat(), None);

        let non_finite = LocationDto {
            kind: "Point".to_string(),
            coordinates: vec![f64::NAN, -0.9322],
            address: None,
        };
        assert_eq!(non_finite.lon_lat(), None);
    }

    #[test]
    fn distance_km_is_formatted_with_two_decimals() {
        let point = CollectionPoint {
            id: 1,
            name: "Centro de acopio".to_string(),
            description: None,
            address: None,
            point_type: Some("centro_acopio".to_string()),
            capacity: Some(500),
            current_fill: 120,
            waste_types: Some(vec!["plastico".to_string()]),
            longitude: -78.6155,
            latitude: -0.9322,
            operating_hours: None,
            contact_phone: None,
            contact_email: None,
            is_active: true,
            image_url: None,
            created_at: None,
            updated_at: None,
            distance: Some(1234.56),
        };

        let dto = PointDataDto::from_point_with_km(point);
        assert_eq!(dto.distance, Some(1235));
        assert_eq!(dto.distance_km.as_deref(), Some("1.23"));
        assert_eq!(dto.location.coordinates, [-78.6155, -0.9322]);
    }

    #[test]
    fn report_query_parses_enum_filters() {
        let query: ReportsQueryDto =
            serde_json::from_str(r#"{"status": "en_revision", "type": "vertedero_ilegal"}"#)
                .unwrap();
        assert_eq!(query.status, Some(ReportStatus::EnRevision));
        assert_eq!(query.report_type, Some(ReportType::VertederoIlegal));
        assert!(query.severity.is_none());
    }
}
