use crate::models::{
    ActivityAdminRow, ActivityProgram, ActivityStatus, Identity, MediaActivity, MediaNews,
    MemberStatus, MemberSummary, News, NewsRequest, OrganizationPosition, OrganizationStructure,
    Session, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers and the
/// authentication service interact with the data layer exclusively through
/// this trait, which keeps the Postgres implementation swappable for the
/// in-memory mock used by the integration tests.
///
/// Every operation is atomic at the single-row level; no method requires a
/// multi-row transaction. Failures propagate as `sqlx::Error` and are mapped
/// to a generic 500 at the handler boundary.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: User) -> sqlx::Result<User>;
    async fn find_user_by_email(&self, email: &str) -> sqlx::Result<Option<User>>;
    async fn get_user(&self, id: Uuid) -> sqlx::Result<Option<User>>;
    /// Minimal identity projection; never includes the password hash.
    async fn get_identity(&self, id: Uuid) -> sqlx::Result<Option<Identity>>;
    /// MEMBER-role users only, newest first.
    async fn list_members(&self, limit: i64, offset: i64) -> sqlx::Result<Vec<MemberSummary>>;
    async fn count_members(&self) -> sqlx::Result<i64>;
    async fn set_member_status(&self, id: Uuid, status: MemberStatus) -> sqlx::Result<bool>;
    async fn set_user_avatar(&self, id: Uuid, url: &str) -> sqlx::Result<bool>;
    async fn set_user_id_card(&self, id: Uuid, key: &str) -> sqlx::Result<bool>;
    /// Sessions and media rows cascade at the schema level.
    async fn delete_user(&self, id: Uuid) -> sqlx::Result<bool>;

    // --- Sessions (single-row store; the AuthService owns the semantics) ---
    async fn create_session(&self, session: Session) -> sqlx::Result<()>;
    async fn find_session(&self, token: &str) -> sqlx::Result<Option<Session>>;
    async fn update_session_expiry(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> sqlx::Result<()>;
    /// Idempotent: deleting an absent token is not an error.
    async fn delete_session(&self, token: &str) -> sqlx::Result<()>;

    // --- Activity programs ---
    async fn create_activity(
        &self,
        user_id: Uuid,
        title: &str,
        description: &str,
        time: DateTime<Utc>,
    ) -> sqlx::Result<Uuid>;
    async fn get_activity(&self, id: Uuid) -> sqlx::Result<Option<ActivityProgram>>;
    async fn list_activities_for_owner(&self, user_id: Uuid)
        -> sqlx::Result<Vec<ActivityProgram>>;
    /// Admin listing joined with the owner, newest first.
    async fn list_activities_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<ActivityAdminRow>>;
    async fn count_activities(&self) -> sqlx::Result<i64>;
    async fn update_activity_text(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
    ) -> sqlx::Result<bool>;
    async fn set_activity_status(&self, id: Uuid, status: ActivityStatus) -> sqlx::Result<bool>;
    async fn delete_activity(&self, id: Uuid) -> sqlx::Result<bool>;

    // --- Activity media ---
    async fn insert_activity_media(&self, media: MediaActivity) -> sqlx::Result<()>;
    async fn list_activity_media(&self, activity_id: Uuid) -> sqlx::Result<Vec<MediaActivity>>;
    /// Resolves only ids that belong to the given activity; foreign or
    /// unknown ids drop out silently.
    async fn find_activity_media_by_ids(
        &self,
        ids: &[Uuid],
        activity_id: Uuid,
    ) -> sqlx::Result<Vec<MediaActivity>>;
    async fn delete_activity_media_by_ids(&self, ids: &[Uuid]) -> sqlx::Result<u64>;
    async fn delete_activity_media(&self, id: Uuid) -> sqlx::Result<bool>;
    async fn list_activity_media_urls_for_user(&self, user_id: Uuid)
        -> sqlx::Result<Vec<String>>;

    // --- News ---
    async fn create_news(&self, user_id: Uuid, req: &NewsRequest) -> sqlx::Result<Uuid>;
    async fn get_news(&self, id: Uuid) -> sqlx::Result<Option<News>>;
    async fn list_news_page(&self, limit: i64, offset: i64) -> sqlx::Result<Vec<News>>;
    async fn count_news(&self) -> sqlx::Result<i64>;
    async fn update_news(&self, id: Uuid, req: &NewsRequest) -> sqlx::Result<bool>;
    async fn delete_news(&self, id: Uuid) -> sqlx::Result<bool>;

    // --- News media ---
    async fn insert_news_media(&self, media: MediaNews) -> sqlx::Result<()>;
    async fn list_news_media(&self, news_id: Uuid) -> sqlx::Result<Vec<MediaNews>>;
    async fn find_news_media_by_ids(
        &self,
        ids: &[Uuid],
        news_id: Uuid,
    ) -> sqlx::Result<Vec<MediaNews>>;
    async fn delete_news_media_by_ids(&self, ids: &[Uuid]) -> sqlx::Result<u64>;
    async fn delete_news_media(&self, id: Uuid) -> sqlx::Result<bool>;
    async fn list_news_media_urls_for_user(&self, user_id: Uuid) -> sqlx::Result<Vec<String>>;

    // --- Organization structure ---
    async fn create_structure(&self, structure: OrganizationStructure) -> sqlx::Result<()>;
    /// Ordered by the explicit `order` field ascending.
    async fn list_structures(&self) -> sqlx::Result<Vec<OrganizationStructure>>;
    async fn get_structure(&self, id: Uuid) -> sqlx::Result<Option<OrganizationStructure>>;
    /// `media_url = None` preserves the existing image URL.
    async fn update_structure(
        &self,
        id: Uuid,
        name: &str,
        order: i32,
        position: OrganizationPosition,
        media_url: Option<&str>,
    ) -> sqlx::Result<bool>;
    /// Deletes the row and returns its image URL so the caller can clean up
    /// the blob afterwards.
    async fn delete_structure(&self, id: Uuid) -> sqlx::Result<Option<String>>;
}

/// RepositoryState
///
/// The shared trait-object handle stored in the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// Concrete `Repository` backed by the Postgres connection pool.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, status, address, program_type, \
                            image_profile, id_card_photo, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, user: User) -> sqlx::Result<User> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role, status, address, \
             program_type, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW()) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.status)
            .bind(&user.address)
            .bind(user.program_type)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_user(&self, id: Uuid) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_identity(&self, id: Uuid) -> sqlx::Result<Option<Identity>> {
        sqlx::query_as::<_, Identity>("SELECT id, name, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_members(&self, limit: i64, offset: i64) -> sqlx::Result<Vec<MemberSummary>> {
        sqlx::query_as::<_, MemberSummary>(
            "SELECT id, name, email, address, image_profile, program_type, created_at \
             FROM users WHERE role = 'MEMBER' \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_members(&self) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'MEMBER'")
            .fetch_one(&self.pool)
            .await
    }

    async fn set_member_status(&self, id: Uuid, status: MemberStatus) -> sqlx::Result<bool> {
        let result =
            sqlx::query("UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_user_avatar(&self, id: Uuid, url: &str) -> sqlx::Result<bool> {
        let result =
            sqlx::query("UPDATE users SET image_profile = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(url)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_user_id_card(&self, id: Uuid, key: &str) -> sqlx::Result<bool> {
        let result =
            sqlx::query("UPDATE users SET id_card_photo = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(key)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_session(&self, session: Session) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, expires_at, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> sqlx::Result<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT token, user_id, expires_at, created_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_session_expiry(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> sqlx::Result<()> {
        // Silent no-op when the session vanished between read and write.
        sqlx::query("UPDATE sessions SET expires_at = $2 WHERE token = $1")
            .bind(token)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_activity(
        &self,
        user_id: Uuid,
        title: &str,
        description: &str,
        time: DateTime<Utc>,
    ) -> sqlx::Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO activity_programs (id, user_id, title, description, time, status, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, 'ACTIVE', NOW(), NOW())",
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(time)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get_activity(&self, id: Uuid) -> sqlx::Result<Option<ActivityProgram>> {
        sqlx::query_as::<_, ActivityProgram>(
            "SELECT id, user_id, title, description, time, status, created_at, updated_at \
             FROM activity_programs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_activities_for_owner(
        &self,
        user_id: Uuid,
    ) -> sqlx::Result<Vec<ActivityProgram>> {
        sqlx::query_as::<_, ActivityProgram>(
            "SELECT id, user_id, title, description, time, status, created_at, updated_at \
             FROM activity_programs WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_activities_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<ActivityAdminRow>> {
        sqlx::query_as::<_, ActivityAdminRow>(
            "SELECT a.id, a.title, a.description, a.time, a.status, \
                    u.name AS user_name, u.email AS user_email, a.created_at \
             FROM activity_programs a JOIN users u ON a.user_id = u.id \
             ORDER BY a.created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_activities(&self) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM activity_programs")
            .fetch_one(&self.pool)
            .await
    }

    async fn update_activity_text(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "UPDATE activity_programs SET title = $2, description = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_activity_status(&self, id: Uuid, status: ActivityStatus) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "UPDATE activity_programs SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_activity(&self, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM activity_programs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_activity_media(&self, media: MediaActivity) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO media_activities (id, media_url, \"type\", format, size, \"order\", \
             activity_program_id) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(media.id)
        .bind(&media.media_url)
        .bind(&media.content_type)
        .bind(&media.format)
        .bind(media.size)
        .bind(media.order)
        .bind(media.activity_program_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_activity_media(&self, activity_id: Uuid) -> sqlx::Result<Vec<MediaActivity>> {
        sqlx::query_as::<_, MediaActivity>(
            "SELECT id, media_url, \"type\", format, size, \"order\", activity_program_id \
             FROM media_activities WHERE activity_program_id = $1 ORDER BY \"order\" ASC",
        )
        .bind(activity_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_activity_media_by_ids(
        &self,
        ids: &[Uuid],
        activity_id: Uuid,
    ) -> sqlx::Result<Vec<MediaActivity>> {
        sqlx::query_as::<_, MediaActivity>(
            "SELECT id, media_url, \"type\", format, size, \"order\", activity_program_id \
             FROM media_activities WHERE id = ANY($1) AND activity_program_id = $2",
        )
        .bind(ids)
        .bind(activity_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn delete_activity_media_by_ids(&self, ids: &[Uuid]) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM media_activities WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_activity_media(&self, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM media_activities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_activity_media_urls_for_user(
        &self,
        user_id: Uuid,
    ) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT m.media_url FROM media_activities m \
             JOIN activity_programs a ON m.activity_program_id = a.id \
             WHERE a.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_news(&self, user_id: Uuid, req: &NewsRequest) -> sqlx::Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO news (id, user_id, title, subtitle, description, program_type, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())",
        )
        .bind(id)
        .bind(user_id)
        .bind(&req.title)
        .bind(&req.subtitle)
        .bind(&req.description)
        .bind(req.program_type)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get_news(&self, id: Uuid) -> sqlx::Result<Option<News>> {
        sqlx::query_as::<_, News>(
            "SELECT id, user_id, title, subtitle, description, program_type, created_at, \
             updated_at FROM news WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_news_page(&self, limit: i64, offset: i64) -> sqlx::Result<Vec<News>> {
        sqlx::query_as::<_, News>(
            "SELECT id, user_id, title, subtitle, description, program_type, created_at, \
             updated_at FROM news ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_news(&self) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM news")
            .fetch_one(&self.pool)
            .await
    }

    async fn update_news(&self, id: Uuid, req: &NewsRequest) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "UPDATE news SET title = $2, subtitle = $3, description = $4, program_type = $5, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.subtitle)
        .bind(&req.description)
        .bind(req.program_type)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_news(&self, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM news WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_news_media(&self, media: MediaNews) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO media_news (id, media_url, \"type\", format, size, \"order\", news_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(media.id)
        .bind(&media.media_url)
        .bind(&media.content_type)
        .bind(&media.format)
        .bind(media.size)
        .bind(media.order)
        .bind(media.news_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_news_media(&self, news_id: Uuid) -> sqlx::Result<Vec<MediaNews>> {
        sqlx::query_as::<_, MediaNews>(
            "SELECT id, media_url, \"type\", format, size, \"order\", news_id \
             FROM media_news WHERE news_id = $1 ORDER BY \"order\" ASC",
        )
        .bind(news_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_news_media_by_ids(
        &self,
        ids: &[Uuid],
        news_id: Uuid,
    ) -> sqlx::Result<Vec<MediaNews>> {
        sqlx::query_as::<_, MediaNews>(
            "SELECT id, media_url, \"type\", format, size, \"order\", news_id \
             FROM media_news WHERE id = ANY($1) AND news_id = $2",
        )
        .bind(ids)
        .bind(news_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn delete_news_media_by_ids(&self, ids: &[Uuid]) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM media_news WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_news_media(&self, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM media_news WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_news_media_urls_for_user(&self, user_id: Uuid) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT m.media_url FROM media_news m \
             JOIN news n ON m.news_id = n.id WHERE n.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_structure(&self, structure: OrganizationStructure) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO organization_structures (id, name, position, \"order\", media_url) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(structure.id)
        .bind(&structure.name)
        .bind(structure.position)
        .bind(structure.order)
        .bind(&structure.media_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_structures(&self) -> sqlx::Result<Vec<OrganizationStructure>> {
        sqlx::query_as::<_, OrganizationStructure>(
            "SELECT id, name, position, \"order\", media_url FROM organization_structures \
             ORDER BY \"order\" ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_structure(&self, id: Uuid) -> sqlx::Result<Option<OrganizationStructure>> {
        sqlx::query_as::<_, OrganizationStructure>(
            "SELECT id, name, position, \"order\", media_url FROM organization_structures \
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_structure(
        &self,
        id: Uuid,
        name: &str,
        order: i32,
        position: OrganizationPosition,
        media_url: Option<&str>,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "UPDATE organization_structures \
             SET name = $2, \"order\" = $3, position = $4, \
                 media_url = COALESCE($5, media_url) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .bind(order)
        .bind(position)
        .bind(media_url)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_structure(&self, id: Uuid) -> sqlx::Result<Option<String>> {
        sqlx::query_scalar::<_, String>(
            "DELETE FROM organization_structures WHERE id = $1 RETURNING media_url",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
