use super::DBClient;
use crate::dtos::{CountRowDto, CreateReportDto, RecentReportDto, ReportUserDto, TrendRowDto, UpdateReportDto};
use crate::models::{Report, ReportComment, ReportStatus, ReportType, Severity, Visibility};
use crate::scoring;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const REPORT_COLUMNS: &str = "id, user_id, type, title, description, \
     ST_X(location::geometry) AS longitude, ST_Y(location::geometry) AS latitude, \
     location_address, images, severity, status, priority, assigned_to, collection_point, \
     verification, resolution, likes, comments, visibility, created_at, updated_at";

pub trait ReportExt {
    async fn list_public_reports(
        &self,
        status: Option<ReportStatus>,
        report_type: Option<ReportType>,
        severity: Option<Severity>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Report>, sqlx::Error>;

    async fn count_public_reports(
        &self,
        status: Option<ReportStatus>,
        report_type: Option<ReportType>,
        severity: Option<Severity>,
    ) -> Result<i64, sqlx::Error>;

    async fn list_reports_by_user(&self, user_id: Uuid) -> Result<Vec<Report>, sqlx::Error>;

    /// Public reports within `radius_m` meters of the origin, nearest first,
    /// capped at 50 rows.
    async fn list_nearby_reports(
        &self,
        lat: f64,
        lng: f64,
        radius_m: f64,
    ) -> Result<Vec<Report>, sqlx::Error>;

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>, sqlx::Error>;

    /// Insert a new report. Status always starts as pendiente and priority is
    /// derived here from severity + type; neither is caller-supplied.
    async fn create_report(
        &self,
        user_id: Uuid,
        input: &CreateReportDto,
        longitude: f64,
        latitude: f64,
    ) -> Result<Report, sqlx::Error>;

    /// Merge-update a report. Priority is recomputed from the merged
    /// severity + type, so a change to either always refreshes it.
    async fn update_report(
        &self,
        id: Uuid,
        input: &UpdateReportDto,
    ) -> Result<Option<Report>, sqlx::Error>;

    async fn delete_report(&self, id: Uuid) -> Result<(), sqlx::Error>;

    /// Toggle `user_id`'s membership in the likes set. Returns whether the
    /// user likes the report after the call, plus the new count.
    async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> Result<Option<(bool, usize)>, sqlx::Error>;

    /// Append a comment and return the updated report.
    async fn add_comment(
        &self,
        id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<Option<Report>, sqlx::Error>;

    /// Author summaries for a set of user ids, for embedding into report
    /// payloads.
    async fn get_report_authors(&self, ids: &[Uuid]) -> Result<Vec<ReportUserDto>, sqlx::Error>;

    async fn recent_public_reports_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentReportDto>, sqlx::Error>;

    /// Grouped counts, optionally restricted to one user's reports.
    async fn report_counts_by_status(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<Vec<CountRowDto>, sqlx::Error>;

    async fn report_counts_by_type(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<Vec<CountRowDto>, sqlx::Error>;

    async fn report_counts_by_severity(&self) -> Result<Vec<CountRowDto>, sqlx::Error>;

    /// Reports per (year, month) since the given instant, oldest first.
    async fn report_monthly_trend(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrendRowDto>, sqlx::Error>;

    async fn count_reports(&self) -> Result<i64, sqlx::Error>;

    async fn count_reports_with_status(&self, status: ReportStatus) -> Result<i64, sqlx::Error>;

    async fn count_reports_since(&self, since: DateTime<Utc>) -> Result<i64, sqlx::Error>;
}

impl ReportExt for DBClient {
    async fn list_public_reports(
        &self,
        status: Option<ReportStatus>,
        report_type: Option<ReportType>,
        severity: Option<Severity>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Report>, sqlx::Error> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports \
             WHERE visibility = 'public' \
               AND ($1::report_status IS NULL OR status = $1) \
               AND ($2::report_type IS NULL OR type = $2) \
               AND ($3::report_severity IS NULL OR severity = $3) \
             ORDER BY created_at DESC \
             LIMIT $4 OFFSET $5"
        );

        sqlx::query_as::<_, Report>(&sql)
            .bind(status)
            .bind(report_type)
            .bind(severity)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    async fn count_public_reports(
        &self,
        status: Option<ReportStatus>,
        report_type: Option<ReportType>,
        severity: Option<Severity>,
    ) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reports \
             WHERE visibility = 'public' \
               AND ($1::report_status IS NULL OR status = $1) \
               AND ($2::report_type IS NULL OR type = $2) \
               AND ($3::report_severity IS NULL OR severity = $3)",
        )
        .bind(status)
        .bind(report_type)
        .bind(severity)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn list_reports_by_user(&self, user_id: Uuid) -> Result<Vec<Report>, sqlx::Error> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE user_id = $1 ORDER BY created_at DESC"
        );

        sqlx::query_as::<_, Report>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn list_nearby_reports(
        &self,
        lat: f64,
        lng: f64,
        radius_m: f64,
    ) -> Result<Vec<Report>, sqlx::Error> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports \
             WHERE visibility = 'public' \
               AND ST_DWithin(location, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3) \
             ORDER BY ST_Distance(location, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography) \
             LIMIT 50"
        );

        sqlx::query_as::<_, Report>(&sql)
            .bind(lng)
            .bind(lat)
            .bind(radius_m)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>, sqlx::Error> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1");

        sqlx::query_as::<_, Report>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_report(
        &self,
        user_id: Uuid,
        input: &CreateReportDto,
        longitude: f64,
        latitude: f64,
    ) -> Result<Report, sqlx::Error> {
        let severity = input.severity.unwrap_or(Severity::Media);
        let visibility = input.visibility.unwrap_or(Visibility::Public);
        let priority = scoring::compute_priority(severity.to_str(), input.report_type.to_str());

        let sql = format!(
            "INSERT INTO reports \
             (user_id, type, title, description, location, location_address, images, \
              severity, priority, visibility, collection_point) \
             VALUES ($1, $2, $3, $4, ST_SetSRID(ST_MakePoint($5, $6), 4326)::geography, \
                     $7, $8, $9, $10, $11, $12) \
             RETURNING {REPORT_COLUMNS}"
        );

        sqlx::query_as::<_, Report>(&sql)
            .bind(user_id)
            .bind(input.report_type)
            .bind(&input.title)
            .bind(&input.description)
            .bind(longitude)
            .bind(latitude)
            .bind(&input.location.address)
            .bind(&input.images)
            .bind(severity)
            .bind(priority)
            .bind(visibility)
            .bind(input.collection_point)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_report(
        &self,
        id: Uuid,
        input: &UpdateReportDto,
    ) -> Result<Option<Report>, sqlx::Error> {
        let Some(existing) = self.get_report(id).await? else {
            return Ok(None);
        };

        let report_type = input.report_type.unwrap_or(existing.report_type);
        let severity = input.severity.unwrap_or(existing.severity);
        let status = input.status.unwrap_or(existing.status);
        let visibility = input.visibility.unwrap_or(existing.visibility);
        let title = input.title.clone().unwrap_or(existing.title);
        let description = input.description.clone().unwrap_or(existing.description);
        let (longitude, latitude, location_address) = match &input.location {
            Some(location) => match location.lon_lat() {
                Some((lon, lat)) => (lon, lat, location.address.clone()),
                None => (
                    existing.longitude,
                    existing.latitude,
                    existing.location_address,
                ),
            },
            None => (
                existing.longitude,
                existing.latitude,
                existing.location_address,
            ),
        };
        let assigned_to = input.assigned_to.or(existing.assigned_to);
        let collection_point = input.collection_point.or(existing.collection_point);

        // Derived field: follows the merged severity/type, never the caller.
        let priority = scoring::compute_priority(severity.to_str(), report_type.to_str());

        let sql = format!(
            "UPDATE reports SET \
             type = $1, title = $2, description = $3, \
             location = ST_SetSRID(ST_MakePoint($4, $5), 4326)::geography, \
             location_address = $6, severity = $7, status = $8, priority = $9, \
             visibility = $10, assigned_to = $11, collection_point = $12, updated_at = NOW() \
             WHERE id = $13 \
             RETURNING {REPORT_COLUMNS}"
        );

        sqlx::query_as::<_, Report>(&sql)
            .bind(report_type)
            .bind(title)
            .bind(description)
            .bind(longitude)
            .bind(latitude)
            .bind(location_address)
            .bind(severity)
            .bind(status)
            .bind(priority)
            .bind(visibility)
            .bind(assigned_to)
            .bind(collection_point)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_report(&self, id: Uuid) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn toggle_like(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<(bool, usize)>, sqlx::Error> {
        let Some(report) = self.get_report(id).await? else {
            return Ok(None);
        };

        let mut likes = report.likes;
        let liked = if likes.contains(&user_id) {
            likes.retain(|like| *like != user_id);
            false
        } else {
            likes.push(user_id);
            true
        };

        sqlx::query("UPDATE reports SET likes = $1, updated_at = NOW() WHERE id = $2")
            .bind(&likes)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Some((liked, likes.len())))
    }

    async fn add_comment(
        &self,
        id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<Option<Report>, sqlx::Error> {
        let comment = ReportComment {
            user: user_id,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        let comment =
            serde_json::to_value(&comment).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        let sql = format!(
            "UPDATE reports SET comments = comments || $1::jsonb, updated_at = NOW() \
             WHERE id = $2 \
             RETURNING {REPORT_COLUMNS}"
        );

        sqlx::query_as::<_, Report>(&sql)
            .bind(comment)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_report_authors(&self, ids: &[Uuid]) -> Result<Vec<ReportUserDto>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, ReportUserDto>(
            "SELECT id, name, avatar, points, level FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }

    async fn recent_public_reports_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentReportDto>, sqlx::Error> {
        sqlx::query_as::<_, RecentReportDto>(
            "SELECT id, title, type, status, images, created_at FROM reports \
             WHERE user_id = $1 AND visibility = 'public' \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn report_counts_by_status(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<Vec<CountRowDto>, sqlx::Error> {
        sqlx::query_as::<_, CountRowDto>(
            "SELECT status::text AS label, COUNT(*) AS count FROM reports \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
             GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn report_counts_by_type(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<Vec<CountRowDto>, sqlx::Error> {
        sqlx::query_as::<_, CountRowDto>(
            "SELECT type::text AS label, COUNT(*) AS count FROM reports \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
             GROUP BY type ORDER BY count DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn report_counts_by_severity(&self) -> Result<Vec<CountRowDto>, sqlx::Error> {
        sqlx::query_as::<_, CountRowDto>(
            "SELECT severity::text AS label, COUNT(*) AS count FROM reports GROUP BY severity",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn report_monthly_trend(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrendRowDto>, sqlx::Error> {
        sqlx::query_as::<_, TrendRowDto>(
            "SELECT EXTRACT(YEAR FROM created_at)::int4 AS year, \
                    EXTRACT(MONTH FROM created_at)::int4 AS month, \
                    COUNT(*) AS count \
             FROM reports WHERE created_at >= $1 \
             GROUP BY 1, 2 ORDER BY 1, 2",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_reports(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reports")
            .fetch_one(&self.pool)
            .await
    }

    async fn count_reports_with_status(&self, status: ReportStatus) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
    }

    async fn count_reports_since(&self, since: DateTime<Utc>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE created_at >= $1")
            .bind(since)
            .fetch_one(&self.pool)
            .await
    }
}
