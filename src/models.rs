use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enumerations (Postgres enum types) ---

/// Role
///
/// The RBAC field. A closed set: routes are gated on exact membership,
/// matched exhaustively in the authorization gate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    Admin,
    #[default]
    Member,
}

/// MemberStatus
///
/// Administrative standing of a user account. Managed exclusively through the
/// admin member endpoints; it does not participate in activity gating.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "member_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum MemberStatus {
    #[default]
    Pending,
    Active,
    Inactive,
}

/// ActivityStatus
///
/// Lifecycle state of an activity program. Deliberately a separate enum from
/// `MemberStatus` even though values overlap: their transition sets differ,
/// and only `Canceled` unlocks member-side edits and deletion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "activity_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ActivityStatus {
    #[default]
    Active,
    Pending,
    Canceled,
}

/// ProgramType
///
/// Organizational program a member or news post belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "program_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ProgramType {
    #[default]
    Marketing,
    Operasional,
    Keuangan,
}

/// OrganizationPosition
///
/// Fixed organizational slots for the public structure page.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "organization_position", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum OrganizationPosition {
    #[default]
    Ketua,
    WakilKetua,
    Sekretaris,
    Bendahara,
    Humas,
    Anggota,
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical identity record from the `users` table. The password hash is
/// never serialized into any response body.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: Role,
    pub status: MemberStatus,
    pub address: Option<String>,
    pub program_type: Option<ProgramType>,
    // Public URL of the profile image in the `avatars` bucket.
    pub image_profile: Option<String>,
    // Storage key of the ID card photo in the `credentials` bucket.
    pub id_card_photo: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Identity
///
/// Minimal projection of an authenticated user, resolved by the session
/// lookup and threaded into handlers. Intentionally excludes the password
/// hash and profile fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Session
///
/// A server-held bearer credential: opaque token bound to a user with an
/// expiration. Valid iff the row exists and `expires_at > now`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// ActivityProgram
///
/// A member-owned program record. Title/description edits, media mutation and
/// deletion are all gated on `status == Canceled`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ActivityProgram {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    #[ts(type = "string")]
    pub time: DateTime<Utc>,
    pub status: ActivityStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// MediaActivity
///
/// Blob-backed attachment of an activity program. `order` is the 0-based
/// index of the file within its upload batch.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct MediaActivity {
    pub id: Uuid,
    pub media_url: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub content_type: String,
    pub format: String,
    pub size: i64,
    pub order: i32,
    pub activity_program_id: Uuid,
}

/// News
///
/// Admin-authored news post. Only the owning user may mutate or delete it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct News {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub program_type: ProgramType,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// MediaNews
///
/// Blob-backed attachment of a news post, same shape as `MediaActivity`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct MediaNews {
    pub id: Uuid,
    pub media_url: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub content_type: String,
    pub format: String,
    pub size: i64,
    pub order: i32,
    pub news_id: Uuid,
}

/// OrganizationStructure
///
/// Admin-managed slot on the public structure page. No ownership; sorted by
/// the explicit `order` field ascending.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct OrganizationStructure {
    pub id: Uuid,
    pub name: String,
    pub position: OrganizationPosition,
    pub order: i32,
    pub media_url: String,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Input payload for POST /auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// RegisterRequest
///
/// Input payload for POST /auth/register and the admin member-creation route.
/// Role defaults to MEMBER when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub address: Option<String>,
    pub program_type: Option<ProgramType>,
}

/// ActivityTextRequest
///
/// Title/description payload shared by activity creation and the
/// status-gated text update.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ActivityTextRequest {
    pub title: String,
    pub description: String,
}

/// NewsRequest
///
/// Payload for news creation and update. The program type tag must be one of
/// the closed `ProgramType` set; serde enforces that at deserialization time.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NewsRequest {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub program_type: ProgramType,
}

/// StatusPatch
///
/// Generic `{"status": ...}` body for the admin PATCH routes. The concrete
/// enum differs per route, so the raw string is carried and parsed there.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StatusPatch {
    pub status: String,
}

// --- Composite / Output Schemas ---

/// Pagination
///
/// Metadata block returned next to every admin listing page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    #[serde(rename = "totalPages")]
    #[ts(rename = "totalPages")]
    pub total_pages: i64,
}

impl Pagination {
    /// Computes the metadata block for a page. `total_pages` is the ceiling
    /// of `total / limit`.
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self { total, page, limit, total_pages }
    }
}

/// MemberSummary
///
/// Admin listing projection of a MEMBER-role user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct MemberSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub image_profile: Option<String>,
    pub program_type: Option<ProgramType>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ActivityAdminRow
///
/// Admin listing projection of an activity program joined with its owner.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ActivityAdminRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[ts(type = "string")]
    pub time: DateTime<Utc>,
    pub status: ActivityStatus,
    pub user_name: String,
    pub user_email: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ActivityWithMedia
///
/// Member-facing view of an activity program with its ordered attachments.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ActivityWithMedia {
    #[serde(flatten)]
    pub activity: ActivityProgram,
    pub media: Vec<MediaActivity>,
}

/// NewsWithMedia
///
/// Admin-facing view of a news post with its ordered attachments.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NewsWithMedia {
    #[serde(flatten)]
    pub news: News,
    pub media: Vec<MediaNews>,
}

/// MediaDeleteResult
///
/// Per-attachment outcome reported by the cascading delete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MediaDeleteResult {
    pub media_id: Uuid,
    pub success: bool,
}
