use super::DBClient;
use crate::dtos::{CountRowDto, UpdateProfileDto};
use crate::models::User;
use crate::scoring;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password, phone, role, points, level, avatar, \
     address, preferences, total_reports, verified_reports, proper_disposals, \
     recycling_actions, is_active, last_login, created_at, updated_at";

/// SQL CASE expression assigning the level name for `points_expr`, generated
/// from the tier table in `scoring` so the boundaries live in one place.
/// Highest tier first, so the first matching arm wins; the 0-minimum tier
/// guarantees a match for any non-negative total.
fn level_case_sql(points_expr: &str) -> String {
    let mut case = String::from("CASE");
    for (name, min, _) in scoring::USER_LEVELS.iter().rev() {
        case.push_str(&format!(" WHEN {points_expr} >= {min} THEN '{name}'"));
    }
    case.push_str(" END");
    case
}

pub trait UserExt {
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;

    async fn save_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        phone: Option<&str>,
    ) -> Result<User, sqlx::Error>;

    async fn update_last_login(&self, id: Uuid) -> Result<(), sqlx::Error>;

    /// COALESCE update of the mutable profile fields.
    async fn update_profile(
        &self,
        id: Uuid,
        input: &UpdateProfileDto,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), sqlx::Error>;

    /// Grant points and refresh the derived level in a single UPDATE.
    /// `reason` is advisory, logged only. Returns the updated user.
    async fn add_points(
        &self,
        id: Uuid,
        delta: i32,
        reason: &str,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn increment_total_reports(&self, id: Uuid) -> Result<(), sqlx::Error>;

    /// Active users ordered by points, best first.
    async fn leaderboard(&self, limit: i64) -> Result<Vec<User>, sqlx::Error>;

    /// 1-based rank among active users for a given point total.
    async fn rank_for_points(&self, points: i32) -> Result<i64, sqlx::Error>;

    async fn count_users(&self) -> Result<i64, sqlx::Error>;

    async fn count_active_users(&self) -> Result<i64, sqlx::Error>;

    async fn count_users_since(&self, since: DateTime<Utc>) -> Result<i64, sqlx::Error>;

    async fn user_counts_by_level(&self) -> Result<Vec<CountRowDto>, sqlx::Error>;
}

impl UserExt for DBClient {
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn save_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        phone: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (name, email, password, phone) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .bind(phone)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_last_login(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        input: &UpdateProfileDto,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET \
             name = COALESCE($1, name), \
             phone = COALESCE($2, phone), \
             address = COALESCE($3, address), \
             preferences = COALESCE($4, preferences), \
             updated_at = NOW() \
             WHERE id = $5 \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&input.name)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(&input.preferences)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn add_points(
        &self,
        id: Uuid,
        delta: i32,
        reason: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET \
             points = points + $2, \
             level = {}, \
             updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}",
            level_case_sql("points + $2")
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(delta)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(user) = &user {
            tracing::info!(
                user_id = %user.id,
                points = delta,
                total = user.points,
                reason = %reason,
                "points granted"
            );
        }

        Ok(user)
    }

    async fn increment_total_reports(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET total_reports = total_reports + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<User>, sqlx::Error> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active = true \
             ORDER BY points DESC LIMIT $1"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn rank_for_points(&self, points: i32) -> Result<i64, sqlx::Error> {
        let ahead: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE points > $1 AND is_active = true",
        )
        .bind(points)
        .fetch_one(&self.pool)
        .await?;

        Ok(ahead + 1)
    }

    async fn count_users(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
    }

    async fn count_active_users(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = true")
            .fetch_one(&self.pool)
            .await
    }

    async fn count_users_since(&self, since: DateTime<Utc>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at >= $1")
            .bind(since)
            .fetch_one(&self.pool)
            .await
    }

    async fn user_counts_by_level(&self) -> Result<Vec<CountRowDto>, sqlx::Error> {
        sqlx::query_as::<_, CountRowDto>(
            "SELECT level AS label, COUNT(*) AS count FROM users \
             WHERE is_active = true GROUP BY level ORDER BY count DESC",
        )
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_case_checks_highest_tier_first() {
        let case = level_case_sql("points + $2");
        let hero = case.find("Héroe Ambiental").unwrap();
        let newcomer = case.find("Nuevo Ciudadano").unwrap();
        assert!(hero < newcomer);
        assert!(case.contains("WHEN points + $2 >= 1000 THEN 'Héroe Ambiental'"));
        assert!(case.contains("WHEN points + $2 >= 0 THEN 'Nuevo Ciudadano'"));
    }

    #[test]
    fn level_case_agrees_with_the_rust_table() {
        // The SQL arms come straight from scoring::USER_LEVELS, so every tier
        // minimum must appear exactly once.
        let case = level_case_sql("points");
        for (name, min, _) in scoring::USER_LEVELS {
            assert!(case.contains(&format!(">= {min} THEN '{name}'")));
        }
    }
}
