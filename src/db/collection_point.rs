use super::DBClient;
use crate::dtos::{CreatePointDto, UpdatePointDto};
use crate::models::CollectionPoint;

/// Column list shared by every collection-point query. The geography value is
/// never returned raw: longitude/latitude are extracted with ST_X/ST_Y.
const POINT_COLUMNS: &str = "id, name, description, address, type, capacity, current_fill, \
     waste_types, ST_X(location::geometry) AS longitude, ST_Y(location::geometry) AS latitude, \
     operating_hours, contact_phone, contact_email, is_active, image_url, created_at, updated_at";

/// The four geo questions share one computation (geography distance from an
/// arbitrary origin to every stored point) and differ only in filtering and
/// limiting. This builds the shared query: distance-annotated, active-filtered,
/// optionally radius-filtered, ordered by distance, optionally limited to one.
///
/// Parameters: $1 = longitude, $2 = latitude, $3 = radius in meters (only when
/// `radius_filtered`).
fn distance_query(radius_filtered: bool, limit_one: bool) -> String {
    let mut sql = format!(
        "SELECT {POINT_COLUMNS}, \
         ST_Distance(location, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography) AS distance \
         FROM collection_points \
         WHERE is_active = true"
    );
    if radius_filtered {
        sql.push_str(
            " AND ST_DWithin(location, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3)",
        );
    }
    sql.push_str(" ORDER BY distance ASC");
    if limit_one {
        sql.push_str(" LIMIT 1");
    }
    sql
}

pub trait CollectionPointExt {
    /// All active points ordered by name, without distance annotation.
    async fn list_active_points(&self) -> Result<Vec<CollectionPoint>, sqlx::Error>;

    /// All active points annotated with their distance in meters to the
    /// origin, nearest first.
    async fn points_sorted_by_distance(
        &self,
        lat: f64,
        lng: f64,
    ) -> Result<Vec<CollectionPoint>, sqlx::Error>;

    /// The single nearest active point. `RowNotFound` when no active points
    /// exist.
    async fn nearest_point(&self, lat: f64, lng: f64) -> Result<CollectionPoint, sqlx::Error>;

    /// Active points within `radius_m` meters of the origin, nearest first.
    async fn points_within_radius(
        &self,
        lat: f64,
        lng: f64,
        radius_m: f64,
    ) -> Result<Vec<CollectionPoint>, sqlx::Error>;

    /// Single point by id, active or not.
    async fn get_point(&self, id: i32) -> Result<Option<CollectionPoint>, sqlx::Error>;

    async fn create_point(&self, input: &CreatePointDto) -> Result<CollectionPoint, sqlx::Error>;

    /// Column-wise COALESCE update; the location is replaced only when both
    /// latitude and longitude are provided. `None` when the id is unknown.
    async fn update_point(
        &self,
        id: i32,
        input: &UpdatePointDto,
    ) -> Result<Option<CollectionPoint>, sqlx::Error>;

    /// Delete by id; `RowNotFound` when the id is unknown.
    async fn delete_point(&self, id: i32) -> Result<(), sqlx::Error>;

    async fn count_points(&self) -> Result<i64, sqlx::Error>;

    async fn count_active_points(&self) -> Result<i64, sqlx::Error>;
}

impl CollectionPointExt for DBClient {
    async fn list_active_points(&self) -> Result<Vec<CollectionPoint>, sqlx::Error> {
        let sql = format!(
            "SELECT {POINT_COLUMNS} FROM collection_points WHERE is_active = true ORDER BY name"
        );

        sqlx::query_as::<_, CollectionPoint>(&sql)
            .fetch_all(&self.pool)
            .await
    }

    async fn points_sorted_by_distance(
        &self,
        lat: f64,
        lng: f64,
    ) -> Result<Vec<CollectionPoint>, sqlx::Error> {
        sqlx::query_as::<_, CollectionPoint>(&distance_query(false, false))
            .bind(lng)
            .bind(lat)
            .fetch_all(&self.pool)
            .await
    }

    async fn nearest_point(&self, lat: f64, lng: f64) -> Result<CollectionPoint, sqlx::Error> {
        sqlx::query_as::<_, CollectionPoint>(&distance_query(false, true))
            .bind(lng)
            .bind(lat)
            .fetch_one(&self.pool)
            .await
    }

    async fn points_within_radius(
        &self,
        lat: f64,
        lng: f64,
        radius_m: f64,
    ) -> Result<Vec<CollectionPoint>, sqlx::Error> {
        sqlx::query_as::<_, CollectionPoint>(&distance_query(true, false))
            .bind(lng)
            .bind(lat)
            .bind(radius_m)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_point(&self, id: i32) -> Result<Option<CollectionPoint>, sqlx::Error> {
        let sql = format!("SELECT {POINT_COLUMNS} FROM collection_points WHERE id = $1");

        sqlx::query_as::<_, CollectionPoint>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_point(&self, input: &CreatePointDto) -> Result<CollectionPoint, sqlx::Error> {
        let sql = format!(
            "INSERT INTO collection_points \
             (name, description, address, type, capacity, waste_types, location, \
              operating_hours, contact_phone, contact_email, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, \
                     ST_SetSRID(ST_MakePoint($7, $8), 4326)::geography, $9, $10, $11, $12) \
             RETURNING {POINT_COLUMNS}"
        );

        sqlx::query_as::<_, CollectionPoint>(&sql)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.address)
            .bind(&input.point_type)
            .bind(input.capacity)
            .bind(&input.waste_types)
            .bind(input.longitude)
            .bind(input.latitude)
            .bind(&input.operating_hours)
            .bind(&input.contact_phone)
            .bind(&input.contact_email)
            .bind(&input.image_url)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_point(
        &self,
        id: i32,
        input: &UpdatePointDto,
    ) -> Result<Option<CollectionPoint>, sqlx::Error> {
        let sql = format!(
            "UPDATE collection_points SET \
             name = COALESCE($1, name), \
             description = COALESCE($2, description), \
             address = COALESCE($3, address), \
             type = COALESCE($4, type), \
             capacity = COALESCE($5, capacity), \
             current_fill = COALESCE($6, current_fill), \
             waste_types = COALESCE($7, waste_types), \
             location = CASE \
                 WHEN $8::float8 IS NOT NULL AND $9::float8 IS NOT NULL \
                 THEN ST_SetSRID(ST_MakePoint($9, $8), 4326)::geography \
                 ELSE location \
             END, \
             operating_hours = COALESCE($10, operating_hours), \
             contact_phone = COALESCE($11, contact_phone), \
             contact_email = COALESCE($12, contact_email), \
             is_active = COALESCE($13, is_active), \
             image_url = COALESCE($14, image_url), \
             updated_at = NOW() \
             WHERE id = $15 \
             RETURNING {POINT_COLUMNS}"
        );

        sqlx::query_as::<_, CollectionPoint>(&sql)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.address)
            .bind(&input.point_type)
            .bind(input.capacity)
            .bind(input.current_fill)
            .bind(&input.waste_types)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(&input.operating_hours)
            .bind(&input.contact_phone)
            .bind(&input.contact_email)
            .bind(input.is_active)
            .bind(&input.image_url)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_point(&self, id: i32) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM collection_points WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn count_points(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM collection_points")
            .fetch_one(&self.pool)
            .await
    }

    async fn count_active_points(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM collection_points WHERE is_active = true")
            .fetch_one(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The distance semantics are PostGIS built-ins; what this layer owns is
    // the shape of the shared query the four operations are built from.

    #[test]
    fn sorted_query_is_active_filtered_and_distance_ordered() {
        let sql = distance_query(false, false);
        assert!(sql.contains("WHERE is_active = true"));
        assert!(sql.contains("ST_Distance"));
        assert!(sql.contains("ORDER BY distance ASC"));
        assert!(!sql.contains("ST_DWithin"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn nearest_query_is_sorted_query_limited_to_one() {
        let sorted = distance_query(false, false);
        let nearest = distance_query(false, true);
        assert_eq!(nearest, format!("{sorted} LIMIT 1"));
    }

    #[test]
    fn radius_query_adds_the_dwithin_filter_only() {
        let sql = distance_query(true, false);
        assert!(sql.contains("ST_DWithin"));
        assert!(sql.contains("$3"));
        assert!(sql.contains("ORDER BY distance ASC"));
        assert!(!sql.contains("LIMIT"));
    }
}
