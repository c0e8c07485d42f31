use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::*;

const ASSET_COLUMNS: &str = "id, owner_id, kind, status, original_filename, mime_type, \
     storage_path, file_size, sha256, error_message, created_at, updated_at";

const JOB_COLUMNS: &str = "id, owner_id, kind, status, priority, params, output_asset_id, \
     progress, error_message, created_at, started_at, finished_at";

pub struct UserQueries;

impl UserQueries {
    pub async fn create_user(
        pool: &PgPool,
        email: &str,
        username: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, password_hash, display_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, username, password_hash, display_name, is_admin, created_at
            "#,
        )
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .bind(display_name)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, username, password_hash, display_name, is_admin, created_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, username, password_hash, display_name, is_admin, created_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, username, password_hash, display_name, is_admin, created_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }
}

pub struct AssetQueries;

impl AssetQueries {
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        kind: AssetKind,
        status: AssetStatus,
        original_filename: Option<&str>,
        mime_type: &str,
        storage_path: &str,
        file_size: i64,
        sha256: Option<&str>,
    ) -> Result<Asset> {
        let sql = format!(
            "INSERT INTO assets (owner_id, kind, status, original_filename, mime_type, \
             storage_path, file_size, sha256) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ASSET_COLUMNS}"
        );
        let asset = sqlx::query_as::<_, Asset>(&sql)
            .bind(owner_id)
            .bind(kind)
            .bind(status)
            .bind(original_filename)
            .bind(mime_type)
            .bind(storage_path)
            .bind(file_size)
            .bind(sha256)
            .fetch_one(pool)
            .await?;

        Ok(asset)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Asset>> {
        let sql = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1");
        let asset = sqlx::query_as::<_, Asset>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(asset)
    }

    pub async fn find_many_for_owner(
        pool: &PgPool,
        owner_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Asset>> {
        let sql = format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE owner_id = $1 AND id = ANY($2)"
        );
        let assets = sqlx::query_as::<_, Asset>(&sql)
            .bind(owner_id)
            .bind(ids)
            .fetch_all(pool)
            .await?;

        Ok(assets)
    }

    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        kind: Option<AssetKind>,
        status: Option<AssetStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Asset>> {
        let sql = format!(
            "SELECT {ASSET_COLUMNS} FROM assets \
             WHERE owner_id = $1 \
               AND ($2::asset_kind IS NULL OR kind = $2) \
               AND ($3::asset_status IS NULL OR status = $3) \
             ORDER BY created_at DESC \
             LIMIT $4 OFFSET $5"
        );
        let assets = sqlx::query_as::<_, Asset>(&sql)
            .bind(owner_id)
            .bind(kind)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok(assets)
    }

    pub async fn count_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        kind: Option<AssetKind>,
        status: Option<AssetStatus>,
    ) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM assets \
             WHERE owner_id = $1 \
               AND ($2::asset_kind IS NULL OR kind = $2) \
               AND ($3::asset_status IS NULL OR status = $3)",
        )
        .bind(owner_id)
        .bind(kind)
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok(row.get("count"))
    }

    pub async fn mark_ready(
        pool: &PgPool,
        id: Uuid,
        storage_path: &str,
        file_size: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE assets SET status = 'ready', storage_path = $2, file_size = $3, \
             error_message = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(storage_path)
        .bind(file_size)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn mark_failed(pool: &PgPool, id: Uuid, reason: &str) -> Result<()> {
        sqlx::query(
            "UPDATE assets SET status = 'failed', error_message = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// True when the asset is consumed by any job that is not yet terminal.
    pub async fn in_use_by_active_job(pool: &PgPool, id: Uuid) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS( \
                SELECT 1 FROM job_input_assets jia \
                JOIN jobs j ON j.id = jia.job_id \
                WHERE jia.asset_id = $1 AND j.status IN ('pending', 'processing') \
             ) AS in_use",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(row.get("in_use"))
    }
}

pub struct JobQueries;

impl JobQueries {
    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        kind: JobKind,
        priority: JobPriority,
        params: &serde_json::Value,
        input_asset_ids: &[Uuid],
    ) -> Result<Job> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            "INSERT INTO jobs (owner_id, kind, priority, params) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {JOB_COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(owner_id)
            .bind(kind)
            .bind(priority)
            .bind(params)
            .fetch_one(&mut *tx)
            .await?;

        for asset_id in input_asset_ids {
            sqlx::query("INSERT INTO job_input_assets (job_id, asset_id) VALUES ($1, $2)")
                .bind(job.id)
                .bind(asset_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(job)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(job)
    }

    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        kind: Option<JobKind>,
        status: Option<JobStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs \
             WHERE owner_id = $1 \
               AND ($2::job_kind IS NULL OR kind = $2) \
               AND ($3::job_status IS NULL OR status = $3) \
             ORDER BY created_at DESC \
             LIMIT $4 OFFSET $5"
        );
        let jobs = sqlx::query_as::<_, Job>(&sql)
            .bind(owner_id)
            .bind(kind)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok(jobs)
    }

    pub async fn count_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        kind: Option<JobKind>,
        status: Option<JobStatus>,
    ) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM jobs \
             WHERE owner_id = $1 \
               AND ($2::job_kind IS NULL OR kind = $2) \
               AND ($3::job_status IS NULL OR status = $3)",
        )
        .bind(owner_id)
        .bind(kind)
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok(row.get("count"))
    }

    pub async fn input_asset_ids(pool: &PgPool, job_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT asset_id FROM job_input_assets WHERE job_id = $1 ORDER BY asset_id",
        )
        .bind(job_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.get("asset_id")).collect())
    }

    /// Conditional pending -> processing transition. Returns None when the job
    /// was already claimed (or deleted), so a redelivered queue message is a
    /// no-op and at most one worker ever runs a given job.
    pub async fn claim(pool: &PgPool, id: Uuid) -> Result<Option<Job>> {
        let sql = format!(
            "UPDATE jobs SET status = 'processing', started_at = $2 \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {JOB_COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .bind(Utc::now())
            .fetch_optional(pool)
            .await?;

        Ok(job)
    }

    pub async fn set_progress(pool: &PgPool, id: Uuid, progress: i32) -> Result<()> {
        sqlx::query("UPDATE jobs SET progress = $2 WHERE id = $1 AND status = 'processing'")
            .bind(id)
            .bind(progress)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn complete(pool: &PgPool, id: Uuid, output_asset_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', output_asset_id = $2, progress = 100, \
             finished_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(output_asset_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn fail(pool: &PgPool, id: Uuid, message: &str) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = $2, finished_at = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(message)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }
}
