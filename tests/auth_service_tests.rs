mod common;

use chrono::{Duration, Utc};
use common::{MockRepository, seed_session, seed_user};
use member_portal::{AuthService, models::Role, repository::RepositoryState};
use std::sync::Arc;
use tokio::test;

fn service(repo: &MockRepository) -> AuthService {
    AuthService::new(Arc::new(repo.clone()) as RepositoryState)
}

#[test]
async fn create_session_persists_with_requested_ttl() {
    let repo = MockRepository::default();
    let user = seed_user(&repo, Role::Member, "Jane Doe", "jane@example.com").await;
    let auth = service(&repo);

    let token = auth.create_session(user.id, 24).await.unwrap();

    assert_eq!(token.len(), 64);
    let expiry = repo.session_expiry(&token).unwrap();
    let ttl = expiry - Utc::now();
    assert!(ttl > Duration::hours(23) && ttl <= Duration::hours(24));
}

#[test]
async fn validate_returns_identity_without_password_material() {
    let repo = MockRepository::default();
    let user = seed_user(&repo, Role::Admin, "Jane Doe", "jane@example.com").await;
    let token = seed_session(&repo, user.id, 60).await;
    let auth = service(&repo);

    let identity = auth.validate_session(&token).await.unwrap().unwrap();
    assert_eq!(identity.id, user.id);
    assert_eq!(identity.role, Role::Admin);
    assert_eq!(identity.email, "jane@example.com");
}

#[test]
async fn absent_and_expired_sessions_both_validate_to_none() {
    let repo = MockRepository::default();
    let user = seed_user(&repo, Role::Member, "Jane Doe", "jane@example.com").await;
    let expired = seed_session(&repo, user.id, -5).await;
    let auth = service(&repo);

    assert!(auth.validate_session("no-such-token").await.unwrap().is_none());
    assert!(auth.validate_session(&expired).await.unwrap().is_none());
}

#[test]
async fn extend_if_needed_skips_sessions_with_time_to_spare() {
    let repo = MockRepository::default();
    let user = seed_user(&repo, Role::Member, "Jane Doe", "jane@example.com").await;
    let token = seed_session(&repo, user.id, 120).await;
    let before = repo.session_expiry(&token).unwrap();

    let auth = service(&repo);
    let result = auth.extend_if_needed(&token, 30, 1).await.unwrap();

    assert_eq!(result.as_deref(), Some(token.as_str()));
    assert_eq!(repo.session_expiry(&token).unwrap(), before);
}

#[test]
async fn extend_if_needed_renews_sessions_near_expiry() {
    let repo = MockRepository::default();
    let user = seed_user(&repo, Role::Member, "Jane Doe", "jane@example.com").await;
    let token = seed_session(&repo, user.id, 10).await;

    let auth = service(&repo);
    auth.extend_if_needed(&token, 30, 1).await.unwrap();

    let remaining = repo.session_expiry(&token).unwrap() - Utc::now();
    assert!(remaining > Duration::minutes(55));
    assert!(remaining <= Duration::hours(1));
}

#[test]
async fn extend_if_needed_reports_missing_sessions() {
    let repo = MockRepository::default();
    let auth = service(&repo);
    assert!(auth.extend_if_needed("gone", 30, 1).await.unwrap().is_none());
}

#[test]
async fn delete_session_is_idempotent() {
    let repo = MockRepository::default();
    let user = seed_user(&repo, Role::Member, "Jane Doe", "jane@example.com").await;
    let token = seed_session(&repo, user.id, 60).await;

    let auth = service(&repo);
    auth.delete_session(&token).await.unwrap();
    assert_eq!(repo.session_count(), 0);
    // Deleting again is not an error.
    auth.delete_session(&token).await.unwrap();
}
