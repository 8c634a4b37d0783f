#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{DateTime, Duration, Utc};
use member_portal::{
    AppState,
    auth::{generate_session_token, hash_password},
    config::AppConfig,
    create_router,
    models::{
        ActivityAdminRow, ActivityProgram, ActivityStatus, Identity, MediaActivity, MediaNews,
        MemberStatus, MemberSummary, News, NewsRequest, OrganizationPosition,
        OrganizationStructure, Role, Session, User,
    },
    repository::Repository,
    storage::{MockStorageService, StorageState},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// Stateful in-memory repository. Handlers rely on the trait, so the scenario
// tests drive the real router against this store and assert on its contents.
#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, Session>,
    activities: HashMap<Uuid, ActivityProgram>,
    activity_media: HashMap<Uuid, MediaActivity>,
    news: HashMap<Uuid, News>,
    news_media: HashMap<Uuid, MediaNews>,
    structures: HashMap<Uuid, OrganizationStructure>,
}

#[derive(Default, Clone)]
pub struct MockRepository {
    store: Arc<Mutex<Store>>,
}

impl MockRepository {
    // Direct seeding/inspection, bypassing the trait.

    pub fn insert_user_raw(&self, user: User) {
        self.store.lock().unwrap().users.insert(user.id, user);
    }

    pub fn insert_activity_raw(&self, activity: ActivityProgram) {
        self.store
            .lock()
            .unwrap()
            .activities
            .insert(activity.id, activity);
    }

    pub fn insert_news_raw(&self, news: News) {
        self.store.lock().unwrap().news.insert(news.id, news);
    }

    pub fn session_expiry(&self, token: &str) -> Option<DateTime<Utc>> {
        self.store
            .lock()
            .unwrap()
            .sessions
            .get(token)
            .map(|s| s.expires_at)
    }

    pub fn session_count(&self) -> usize {
        self.store.lock().unwrap().sessions.len()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.store
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    pub fn activity(&self, id: Uuid) -> Option<ActivityProgram> {
        self.store.lock().unwrap().activities.get(&id).cloned()
    }

    pub fn activity_media_count(&self, activity_id: Uuid) -> usize {
        self.store
            .lock()
            .unwrap()
            .activity_media
            .values()
            .filter(|m| m.activity_program_id == activity_id)
            .count()
    }

    pub fn news_media_count(&self, news_id: Uuid) -> usize {
        self.store
            .lock()
            .unwrap()
            .news_media
            .values()
            .filter(|m| m.news_id == news_id)
            .count()
    }

    pub fn structure(&self, id: Uuid) -> Option<OrganizationStructure> {
        self.store.lock().unwrap().structures.get(&id).cloned()
    }

    pub fn has_user(&self, id: Uuid) -> bool {
        self.store.lock().unwrap().users.contains_key(&id)
    }

    pub fn has_news(&self, id: Uuid) -> bool {
        self.store.lock().unwrap().news.contains_key(&id)
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn create_user(&self, mut user: User) -> sqlx::Result<User> {
        let now = Utc::now();
        user.created_at = now;
        user.updated_at = now;
        self.store
            .lock()
            .unwrap()
            .users
            .insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> sqlx::Result<Option<User>> {
        Ok(self.user_by_email(email))
    }

    async fn get_user(&self, id: Uuid) -> sqlx::Result<Option<User>> {
        Ok(self.store.lock().unwrap().users.get(&id).cloned())
    }

    async fn get_identity(&self, id: Uuid) -> sqlx::Result<Option<Identity>> {
        Ok(self.store.lock().unwrap().users.get(&id).map(|u| Identity {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
        }))
    }

    async fn list_members(&self, limit: i64, offset: i64) -> sqlx::Result<Vec<MemberSummary>> {
        let store = self.store.lock().unwrap();
        let mut members: Vec<&User> = store
            .users
            .values()
            .filter(|u| u.role == Role::Member)
            .collect();
        members.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(members
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|u| MemberSummary {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
                address: u.address.clone(),
                image_profile: u.image_profile.clone(),
                program_type: u.program_type,
                created_at: u.created_at,
            })
            .collect())
    }

    async fn count_members(&self) -> sqlx::Result<i64> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .users
            .values()
            .filter(|u| u.role == Role::Member)
            .count() as i64)
    }

    async fn set_member_status(&self, id: Uuid, status: MemberStatus) -> sqlx::Result<bool> {
        Ok(match self.store.lock().unwrap().users.get_mut(&id) {
            Some(user) => {
                user.status = status;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn set_user_avatar(&self, id: Uuid, url: &str) -> sqlx::Result<bool> {
        Ok(match self.store.lock().unwrap().users.get_mut(&id) {
            Some(user) => {
                user.image_profile = Some(url.to_string());
                true
            }
            None => false,
        })
    }

    async fn set_user_id_card(&self, id: Uuid, key: &str) -> sqlx::Result<bool> {
        Ok(match self.store.lock().unwrap().users.get_mut(&id) {
            Some(user) => {
                user.id_card_photo = Some(key.to_string());
                true
            }
            None => false,
        })
    }

    async fn delete_user(&self, id: Uuid) -> sqlx::Result<bool> {
        let mut store = self.store.lock().unwrap();
        if store.users.remove(&id).is_none() {
            return Ok(false);
        }
        // Schema-level cascades, replayed by hand.
        store.sessions.retain(|_, s| s.user_id != id);
        let activity_ids: Vec<Uuid> = store
            .activities
            .values()
            .filter(|a| a.user_id == id)
            .map(|a| a.id)
            .collect();
        store.activities.retain(|_, a| a.user_id != id);
        store
            .activity_media
            .retain(|_, m| !activity_ids.contains(&m.activity_program_id));
        let news_ids: Vec<Uuid> = store
            .news
            .values()
            .filter(|n| n.user_id == id)
            .map(|n| n.id)
            .collect();
        store.news.retain(|_, n| n.user_id != id);
        store.news_media.retain(|_, m| !news_ids.contains(&m.news_id));
        Ok(true)
    }

    async fn create_session(&self, session: Session) -> sqlx::Result<()> {
        self.store
            .lock()
            .unwrap()
            .sessions
            .insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_session(&self, token: &str) -> sqlx::Result<Option<Session>> {
        Ok(self.store.lock().unwrap().sessions.get(token).cloned())
    }

    async fn update_session_expiry(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> sqlx::Result<()> {
        if let Some(session) = self.store.lock().unwrap().sessions.get_mut(token) {
            session.expires_at = expires_at;
        }
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> sqlx::Result<()> {
        self.store.lock().unwrap().sessions.remove(token);
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
        let now = Utc::now();
        self.insert_activity_raw(ActivityProgram {
            id,
            user_id,
            title: title.to_string(),
            description: description.to_string(),
            time,
            status: ActivityStatus::Active,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn get_activity(&self, id: Uuid) -> sqlx::Result<Option<ActivityProgram>> {
        Ok(self.activity(id))
    }

    async fn list_activities_for_owner(
        &self,
        user_id: Uuid,
    ) -> sqlx::Result<Vec<ActivityProgram>> {
        let store = self.store.lock().unwrap();
        let mut rows: Vec<ActivityProgram> = store
            .activities
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn list_activities_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<ActivityAdminRow>> {
        let store = self.store.lock().unwrap();
        let mut rows: Vec<&ActivityProgram> = store.activities.values().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|a| {
                let owner = store.users.get(&a.user_id);
                ActivityAdminRow {
                    id: a.id,
                    title: a.title.clone(),
                    description: a.description.clone(),
                    time: a.time,
                    status: a.status,
                    user_name: owner.map(|u| u.name.clone()).unwrap_or_default(),
                    user_email: owner.map(|u| u.email.clone()).unwrap_or_default(),
                    created_at: a.created_at,
                }
            })
            .collect())
    }

    async fn count_activities(&self) -> sqlx::Result<i64> {
        Ok(self.store.lock().unwrap().activities.len() as i64)
    }

    async fn update_activity_text(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
    ) -> sqlx::Result<bool> {
        Ok(match self.store.lock().unwrap().activities.get_mut(&id) {
            Some(activity) => {
                activity.title = title.to_string();
                activity.description = description.to_string();
                activity.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn set_activity_status(&self, id: Uuid, status: ActivityStatus) -> sqlx::Result<bool> {
        Ok(match self.store.lock().unwrap().activities.get_mut(&id) {
            Some(activity) => {
                activity.status = status;
                activity.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn delete_activity(&self, id: Uuid) -> sqlx::Result<bool> {
        let mut store = self.store.lock().unwrap();
        let removed = store.activities.remove(&id).is_some();
        store.activity_media.retain(|_, m| m.activity_program_id != id);
        Ok(removed)
    }

    async fn insert_activity_media(&self, media: MediaActivity) -> sqlx::Result<()> {
        self.store
            .lock()
            .unwrap()
            .activity_media
            .insert(media.id, media);
        Ok(())
    }

    async fn list_activity_media(&self, activity_id: Uuid) -> sqlx::Result<Vec<MediaActivity>> {
        let store = self.store.lock().unwrap();
        let mut rows: Vec<MediaActivity> = store
            .activity_media
            .values()
            .filter(|m| m.activity_program_id == activity_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.order);
        Ok(rows)
    }

    async fn find_activity_media_by_ids(
        &self,
        ids: &[Uuid],
        activity_id: Uuid,
    ) -> sqlx::Result<Vec<MediaActivity>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .activity_media
            .values()
            .filter(|m| m.activity_program_id == activity_id && ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn delete_activity_media_by_ids(&self, ids: &[Uuid]) -> sqlx::Result<u64> {
        let mut store = self.store.lock().unwrap();
        let before = store.activity_media.len();
        store.activity_media.retain(|id, _| !ids.contains(id));
        Ok((before - store.activity_media.len()) as u64)
    }

    async fn delete_activity_media(&self, id: Uuid) -> sqlx::Result<bool> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .activity_media
            .remove(&id)
            .is_some())
    }

    async fn list_activity_media_urls_for_user(
        &self,
        user_id: Uuid,
    ) -> sqlx::Result<Vec<String>> {
        let store = self.store.lock().unwrap();
        let owned: Vec<Uuid> = store
            .activities
            .values()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.id)
            .collect();
        Ok(store
            .activity_media
            .values()
            .filter(|m| owned.contains(&m.activity_program_id))
            .map(|m| m.media_url.clone())
            .collect())
    }

    async fn create_news(&self, user_id: Uuid, req: &NewsRequest) -> sqlx::Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.insert_news_raw(News {
            id,
            user_id,
            title: req.title.clone(),
            subtitle: req.subtitle.clone(),
            description: req.description.clone(),
            program_type: req.program_type,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn get_news(&self, id: Uuid) -> sqlx::Result<Option<News>> {
        Ok(self.store.lock().unwrap().news.get(&id).cloned())
    }

    async fn list_news_page(&self, limit: i64, offset: i64) -> sqlx::Result<Vec<News>> {
        let store = self.store.lock().unwrap();
        let mut rows: Vec<News> = store.news.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_news(&self) -> sqlx::Result<i64> {
        Ok(self.store.lock().unwrap().news.len() as i64)
    }

    async fn update_news(&self, id: Uuid, req: &NewsRequest) -> sqlx::Result<bool> {
        Ok(match self.store.lock().unwrap().news.get_mut(&id) {
            Some(news) => {
                news.title = req.title.clone();
                news.subtitle = req.subtitle.clone();
                news.description = req.description.clone();
                news.program_type = req.program_type;
                news.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn delete_news(&self, id: Uuid) -> sqlx::Result<bool> {
        let mut store = self.store.lock().unwrap();
        let removed = store.news.remove(&id).is_some();
        store.news_media.retain(|_, m| m.news_id != id);
        Ok(removed)
    }

    async fn insert_news_media(&self, media: MediaNews) -> sqlx::Result<()> {
        self.store.lock().unwrap().news_media.insert(media.id, media);
        Ok(())
    }

    async fn list_news_media(&self, news_id: Uuid) -> sqlx::Result<Vec<MediaNews>> {
        let store = self.store.lock().unwrap();
        let mut rows: Vec<MediaNews> = store
            .news_media
            .values()
            .filter(|m| m.news_id == news_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.order);
        Ok(rows)
    }

    async fn find_news_media_by_ids(
        &self,
        ids: &[Uuid],
        news_id: Uuid,
    ) -> sqlx::Result<Vec<MediaNews>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .news_media
            .values()
            .filter(|m| m.news_id == news_id && ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn delete_news_media_by_ids(&self, ids: &[Uuid]) -> sqlx::Result<u64> {
        let mut store = self.store.lock().unwrap();
        let before = store.news_media.len();
        store.news_media.retain(|id, _| !ids.contains(id));
        Ok((before - store.news_media.len()) as u64)
    }

    async fn delete_news_media(&self, id: Uuid) -> sqlx::Result<bool> {
        Ok(self.store.lock().unwrap().news_media.remove(&id).is_some())
    }

    async fn list_news_media_urls_for_user(&self, user_id: Uuid) -> sqlx::Result<Vec<String>> {
        let store = self.store.lock().unwrap();
        let owned: Vec<Uuid> = store
            .news
            .values()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.id)
            .collect();
        Ok(store
            .news_media
            .values()
            .filter(|m| owned.contains(&m.news_id))
            .map(|m| m.media_url.clone())
            .collect())
    }

    async fn create_structure(&self, structure: OrganizationStructure) -> sqlx::Result<()> {
        self.store
            .lock()
            .unwrap()
            .structures
            .insert(structure.id, structure);
        Ok(())
    }

    async fn list_structures(&self) -> sqlx::Result<Vec<OrganizationStructure>> {
        let mut rows: Vec<OrganizationStructure> = self
            .store
            .lock()
            .unwrap()
            .structures
            .values()
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.order);
        Ok(rows)
    }

    async fn get_structure(&self, id: Uuid) -> sqlx::Result<Option<OrganizationStructure>> {
        Ok(self.structure(id))
    }

    async fn update_structure(
        &self,
        id: Uuid,
        name: &str,
        order: i32,
        position: OrganizationPosition,
        media_url: Option<&str>,
    ) -> sqlx::Result<bool> {
        Ok(match self.store.lock().unwrap().structures.get_mut(&id) {
            Some(structure) => {
                structure.name = name.to_string();
                structure.order = order;
                structure.position = position;
                if let Some(url) = media_url {
                    structure.media_url = url.to_string();
                }
                true
            }
            None => false,
        })
    }

    async fn delete_structure(&self, id: Uuid) -> sqlx::Result<Option<String>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .structures
            .remove(&id)
            .map(|s| s.media_url))
    }
}

// --- TEST APP ASSEMBLY ---

pub fn test_state_with(storage: MockStorageService) -> (AppState, MockRepository) {
    let repo = MockRepository::default();
    let state = AppState::new(
        Arc::new(repo.clone()),
        Arc::new(storage) as StorageState,
        AppConfig::default(),
    );
    (state, repo)
}

pub fn test_state() -> (AppState, MockRepository) {
    test_state_with(MockStorageService::new())
}

pub fn app(state: AppState) -> Router {
    create_router(state)
}

// --- SEEDING HELPERS ---

pub async fn seed_user(repo: &MockRepository, role: Role, name: &str, email: &str) -> User {
    let user = User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: hash_password("secret1").unwrap(),
        role,
        ..Default::default()
    };
    repo.create_user(user).await.unwrap()
}

/// Inserts a session directly; `minutes_left` may be negative for an already
/// expired one.
pub async fn seed_session(repo: &MockRepository, user_id: Uuid, minutes_left: i64) -> String {
    let token = generate_session_token();
    repo.create_session(Session {
        token: token.clone(),
        user_id,
        expires_at: Utc::now() + Duration::minutes(minutes_left),
        created_at: Utc::now(),
    })
    .await
    .unwrap();
    token
}

pub fn seed_activity(
    repo: &MockRepository,
    owner: Uuid,
    status: ActivityStatus,
) -> ActivityProgram {
    let now = Utc::now();
    let activity = ActivityProgram {
        id: Uuid::new_v4(),
        user_id: owner,
        title: "Community cleanup".to_string(),
        description: "Riverside cleanup day".to_string(),
        time: now,
        status,
        created_at: now,
        updated_at: now,
    };
    repo.insert_activity_raw(activity.clone());
    activity
}

// --- HTTP HELPERS ---

pub fn json_request(
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("token={token}"));
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Hand-built multipart/form-data body for the media endpoints.
pub struct MultipartBuilder {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self {
            boundary: format!("----test-{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn request(mut self, method: &str, path: &str, token: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::COOKIE, format!("token={token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// Drives one request through the router, returning status and parsed body.
pub async fn call(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = call_full(router, request).await;
    (status, body)
}

/// Like `call`, but also keeps the response headers (cookie assertions).
pub async fn call_full(
    router: &Router,
    request: Request<Body>,
) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, headers, body)
}

/// The session token from a response's Set-Cookie header, if any.
pub fn cookie_token(response_headers: &axum::http::HeaderMap) -> Option<String> {
    response_headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|c| c.strip_prefix("token="))
        .map(|rest| rest.split(';').next().unwrap_or("").to_string())
}
