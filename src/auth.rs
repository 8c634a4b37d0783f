use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use rand::RngCore;

use crate::{
    AppState,
    config::Env,
    error::ApiError,
    models::{Identity, Role, Session},
    repository::RepositoryState,
};

/// Name of the HTTP cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Session lifetime granted at login/register.
pub const SESSION_TTL_HOURS: i64 = 24;
/// Sliding-expiration parameters: sessions with no more than this many
/// minutes remaining are renewed for this many hours on access.
pub const EXTENSION_THRESHOLD_MINUTES: i64 = 30;
pub const EXTENSION_HOURS: i64 = 1;

/// generate_session_token
///
/// Produces an opaque session token: 32 bytes from the OS CSPRNG, hex
/// encoded (256 bits of entropy). Collisions are not handled here; the
/// unique constraint on `sessions.token` is the backstop.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// --- Password hashing (Argon2id) ---

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Hashes a password with Argon2id and a fresh random salt, returning the
/// PHC string to persist.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Hashing(format!("password hashing failed: {e}")))
}

/// Verifies a password against a stored PHC hash. A malformed hash is a
/// dependency failure, not a credential mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| ApiError::Hashing(format!("invalid hash: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::Hashing(format!("verification failed: {e}"))),
    }
}

// --- AuthService ---

/// AuthService
///
/// Owns the session lifecycle on top of the repository's session store.
/// Constructed once at startup and shared through the application state;
/// there is no process-global instance.
///
/// Expiration is validated lazily at read time rather than swept by a
/// background job: stale rows accumulate but are bounded by active-user
/// count, and an expired row can never authenticate.
#[derive(Clone)]
pub struct AuthService {
    repo: RepositoryState,
}

impl AuthService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// Creates a session for the user valid for `ttl_hours`, returning the
    /// freshly generated token. Side effect: exactly one session row.
    pub async fn create_session(&self, user_id: uuid::Uuid, ttl_hours: i64) -> sqlx::Result<String> {
        let token = generate_session_token();
        let now = Utc::now();
        self.repo
            .create_session(Session {
                token: token.clone(),
                user_id,
                expires_at: now + Duration::hours(ttl_hours),
                created_at: now,
            })
            .await?;
        Ok(token)
    }

    /// Resolves a token to the owning user's identity projection. Returns
    /// `None` for an absent token and for an expired one; the two cases are
    /// indistinguishable by design. Never exposes the password hash.
    pub async fn validate_session(&self, token: &str) -> sqlx::Result<Option<Identity>> {
        let Some(session) = self.repo.find_session(token).await? else {
            return Ok(None);
        };
        if session.expires_at <= Utc::now() {
            return Ok(None);
        }
        self.repo.get_identity(session.user_id).await
    }

    /// Unconditionally re-arms the session to `now + extra_hours`. A silent
    /// no-op when the session no longer exists, so callers must not treat a
    /// return as proof of persistence.
    pub async fn extend_session(&self, token: &str, extra_hours: i64) -> sqlx::Result<()> {
        self.repo
            .update_session_expiry(token, Utc::now() + Duration::hours(extra_hours))
            .await
    }

    /// Sliding expiration: re-reads the session and extends it only when no
    /// more than `threshold_minutes` remain, so active sessions self-renew
    /// without a store write on every request. `None` when the session does
    /// not exist.
    pub async fn extend_if_needed(
        &self,
        token: &str,
        threshold_minutes: i64,
        extra_hours: i64,
    ) -> sqlx::Result<Option<String>> {
        let Some(session) = self.repo.find_session(token).await? else {
            return Ok(None);
        };

        let minutes_left = (session.expires_at - Utc::now()).num_minutes();
        if minutes_left <= threshold_minutes {
            self.extend_session(token, extra_hours).await?;
        }
        Ok(Some(token.to_string()))
    }

    /// Logout. Idempotent: deleting an absent token is not an error.
    pub async fn delete_session(&self, token: &str) -> sqlx::Result<()> {
        self.repo.delete_session(token).await
    }
}

// --- Session cookie ---

/// Builds the session cookie: HttpOnly + Secure always, SameSite relaxed to
/// None outside production so the local frontend origin can send it.
pub fn session_cookie(token: String, env: &Env) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_path("/");
    cookie.set_same_site(match env {
        Env::Production => SameSite::Lax,
        Env::Local => SameSite::None,
    });
    cookie
}

/// Removal counterpart of `session_cookie`, used on logout.
pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

// --- AuthUser extractor ---

/// AuthUser
///
/// The resolved identity of an authenticated request, usable as a handler
/// argument. When the request passed an `authorize` gate the identity is
/// picked up from the request extensions; otherwise (the /auth routes carry
/// no role gate) the extractor resolves the cookie itself, including the
/// sliding extension.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(AuthUser(identity.clone()));
        }

        let auth = AuthService::from_ref(state);

        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(ApiError::Unauthenticated)?;

        let identity = auth
            .validate_session(&token)
            .await?
            .ok_or(ApiError::SessionExpired)?;

        auth.extend_if_needed(&token, EXTENSION_THRESHOLD_MINUTES, EXTENSION_HOURS)
            .await?;

        Ok(AuthUser(identity))
    }
}

// --- Authorization gate ---

/// The per-route authorization gate. State machine per request:
/// no token -> 401; token without a live session -> 401 (expiry and
/// non-existence are indistinguishable to the caller); live session with a
/// role outside `allowed` -> 403; otherwise the identity is attached to the
/// request extensions and the request proceeds.
///
/// The sliding extension runs here for every gated route, member and admin
/// alike; the policy is uniform across roles (see DESIGN.md).
async fn authorize(
    allowed: &[Role],
    state: &AppState,
    jar: &CookieJar,
    request: &mut Request,
) -> Result<(), ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::Unauthenticated)?;

    let identity = state
        .auth
        .validate_session(&token)
        .await?
        .ok_or(ApiError::SessionExpired)?;

    state
        .auth
        .extend_if_needed(&token, EXTENSION_THRESHOLD_MINUTES, EXTENSION_HOURS)
        .await?;

    if !allowed.contains(&identity.role) {
        return Err(ApiError::forbidden());
    }

    request.extensions_mut().insert(identity);
    Ok(())
}

/// Gate for the /member router: MEMBER sessions only.
pub async fn require_member(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&[Role::Member], &state, &jar, &mut request).await?;
    Ok(next.run(request).await)
}

/// Gate for the /admin router: ADMIN sessions only.
pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&[Role::Admin], &state, &jar, &mut request).await?;
    Ok(next.run(request).await)
}
