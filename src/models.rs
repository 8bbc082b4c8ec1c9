use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role-based access control levels, stored as the PostgreSQL ENUM
/// "user_role". Collectors are municipal crews; admins manage collection
/// points and see the stats endpoints.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Collector,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Collector => "collector",
        }
    }
}

/// Report category, stored as the PostgreSQL ENUM "report_type".
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "report_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Acumulacion,
    ContenedorLleno,
    ContenedorDanado,
    VertederoIlegal,
    Otro,
}

impl ReportType {
    pub fn to_str(&self) -> &str {
        match self {
            ReportType::Acumulacion => "acumulacion",
            ReportType::ContenedorLleno => "contenedor_lleno",
            ReportType::ContenedorDanado => "contenedor_danado",
            ReportType::VertederoIlegal => "vertedero_ilegal",
            ReportType::Otro => "otro",
        }
    }
}

/// Report severity, stored as the PostgreSQL ENUM "report_severity".
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "report_severity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Baja,
    Media,
    Alta,
    Critica,
}

impl Severity {
    pub fn to_str(&self) -> &str {
        match self {
            Severity::Baja => "baja",
            Severity::Media => "media",
            Severity::Alta => "alta",
            Severity::Critica => "critica",
        }
    }
}

/// Report lifecycle state, stored as the PostgreSQL ENUM "report_status".
/// Every report starts as Pendiente.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pendiente,
    EnRevision,
    EnProceso,
    Resuelto,
    Rechazado,
}

impl ReportStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ReportStatus::Pendiente => "pendiente",
            ReportStatus::EnRevision => "en_revision",
            ReportStatus::EnProceso => "en_proceso",
            ReportStatus::Resuelto => "resuelto",
            ReportStatus::Rechazado => "rechazado",
        }
    }
}

/// Who can see a report, stored as the PostgreSQL ENUM "report_visibility".
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "report_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Restricted,
}

/// User account.
///
/// `points` and `level` move together: level is derived from points in
/// `scoring::level_for_points` and the pair is persisted in a single UPDATE.
/// `password` holds the argon2 hash and is never serialized.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub points: i32,
    pub level: String,
    pub avatar: Option<String>,
    pub address: Option<serde_json::Value>,
    pub preferences: Option<serde_json::Value>,
    pub total_reports: i32,
    pub verified_reports: i32,
    pub proper_disposals: i32,
    pub recycling_actions: i32,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Stored avatar, or the generated-initials fallback the mobile client
    /// expects.
    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(url) => url.clone(),
            None => format!(
                "https://ui-avatars.com/api/?name={}&background=2E7D32&color=fff",
                urlencoding::encode(&self.name)
            ),
        }
    }
}

/// A comment inside a report's `comments` JSONB column.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportComment {
    pub user: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Citizen report of dumping, full containers and the like.
///
/// `priority` is derived from severity + type (`scoring::compute_priority`)
/// and recomputed on every severity/type change; callers never supply it.
/// `collection_point` is a soft reference into the collection_points table:
/// a bare id, no foreign key, resolved by lookup only.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub title: String,
    pub description: String,
    pub longitude: f64,
    pub latitude: f64,
    pub location_address: Option<String>,
    pub images: Vec<String>,
    pub severity: Severity,
    pub status: ReportStatus,
    pub priority: i32,
    pub assigned_to: Option<Uuid>,
    pub collection_point: Option<i32>,
    pub verification: Option<serde_json::Value>,
    pub resolution: Option<serde_json::Value>,
    pub likes: Vec<Uuid>,
    pub comments: serde_json::Value,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn likes_count(&self) -> usize {
        self.likes.len()
    }

    pub fn comments_count(&self) -> usize {
        self.comments.as_array().map(|c| c.len()).unwrap_or(0)
    }
}

/// Recycling / collection point row.
///
/// The geography column is never decoded directly: every query extracts
/// `ST_X`/`ST_Y` as `longitude`/`latitude`, and distance-annotated queries add
/// a `distance` column in meters (absent elsewhere, hence the default).
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct CollectionPoint {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub point_type: Option<String>,
    pub capacity: Option<i32>,
    pub current_fill: i32,
    pub waste_types: Option<Vec<String>>,
    pub longitude: f64,
    pub latitude: f64,
    pub operating_hours: Option<serde_json::Value>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub distance: Option<f64>,
}
