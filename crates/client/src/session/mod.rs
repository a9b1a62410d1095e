//! Session state machine.
//!
//! Owns the `anonymous → authenticating → authenticated` lifecycle, the
//! current profile, and the last auth error. Transitions are a closed sum
//! type applied by one exhaustive match; observers subscribe to
//! [`SessionEvent`]s, which fire synchronously after the transition lands —
//! that ordering is what guarantees deferred-intent replay runs with the
//! session already authenticated.

mod error;
pub mod password;

pub use error::AuthError;
pub use password::{PasswordIssue, validate_password};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use gilded_mango_core::{Email, Role, UserId};

use crate::api::{AuthApi, AuthPayload, WireUser};
use crate::store::{KeyValueStore, StoreError, StoreKey};

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No identity; identity-bound actions are deferred.
    #[default]
    Anonymous,
    /// An auth attempt is in flight; always followed by exactly one
    /// transition to `Authenticated` or `Anonymous`.
    Authenticating,
    /// Profile populated, token live.
    Authenticated,
}

/// The signed-in user's profile. In memory only; destroyed on logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub avatar_uri: Option<String>,
}

impl From<WireUser> for UserProfile {
    fn from(user: WireUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            avatar_uri: user.avatar,
        }
    }
}

/// Events other components can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session just became authenticated (login, register, or restore).
    Authenticated,
    /// The session just became anonymous by logout.
    LoggedOut,
}

/// The closed set of state transitions.
enum Transition {
    /// An auth attempt started.
    Begin,
    /// The attempt succeeded with this profile.
    Complete(UserProfile),
    /// The attempt failed with a user-facing message.
    Fail(String),
    /// Logout or token rejection cleared the session.
    Clear,
}

#[derive(Default)]
struct SessionState {
    status: SessionStatus,
    profile: Option<UserProfile>,
    last_error: Option<String>,
}

impl SessionState {
    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Begin => {
                self.status = SessionStatus::Authenticating;
                self.last_error = None;
            }
            Transition::Complete(profile) => {
                self.status = SessionStatus::Authenticated;
                self.profile = Some(profile);
                self.last_error = None;
            }
            Transition::Fail(message) => {
                self.status = SessionStatus::Anonymous;
                self.profile = None;
                self.last_error = Some(message);
            }
            Transition::Clear => {
                self.status = SessionStatus::Anonymous;
                self.profile = None;
                self.last_error = None;
            }
        }
    }
}

type Listener = Box<dyn Fn(&SessionEvent) + Send + Sync>;

/// The session state machine.
///
/// Cheaply cloneable; all handles share one state.
#[derive(Clone)]
pub struct SessionStateMachine {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    auth: Arc<dyn AuthApi>,
    store: KeyValueStore,
    state: Mutex<SessionState>,
    listeners: Mutex<Vec<Listener>>,
}

impl SessionStateMachine {
    /// Create an anonymous session backed by `store`.
    #[must_use]
    pub fn new(auth: Arc<dyn AuthApi>, store: KeyValueStore) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                auth,
                store,
                state: Mutex::new(SessionState::default()),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        lock(&self.inner.state).status
    }

    /// Current profile, if authenticated.
    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        lock(&self.inner.state).profile.clone()
    }

    /// Human-readable error of the last auth attempt, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner.state).last_error.clone()
    }

    /// Subscribe to session events.
    ///
    /// Listeners run synchronously right after the transition that produced
    /// the event, on the calling task. A listener must not subscribe further
    /// listeners from inside its callback.
    pub fn subscribe(&self, listener: impl Fn(&SessionEvent) + Send + Sync + 'static) {
        lock(&self.inner.listeners).push(Box::new(listener));
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Log in with email and password.
    ///
    /// On success the token is stored, the state becomes `Authenticated`,
    /// and subscribers see [`SessionEvent::Authenticated`]. On failure the
    /// state returns to `Anonymous` with a human-readable `last_error`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` before any network call if the
    /// email shape is invalid, `AuthError::Rejected` for wrong credentials,
    /// or `AuthError::Api` for transport failures.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let email = Email::parse(email)?;

        self.transition(Transition::Begin);
        match self.inner.auth.login(&email, password).await {
            Ok(payload) => self.complete(payload),
            Err(e) => Err(self.fail(AuthError::from_api(e))),
        }
    }

    /// Register a new account.
    ///
    /// Same contract as [`login`](Self::login); additionally the password
    /// policy runs client-side and rejects with a specific
    /// [`PasswordIssue`] without contacting the auth endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` or `AuthError::InvalidEmail` before
    /// any network call; otherwise as `login`.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        self.transition(Transition::Begin);
        match self.inner.auth.register(name, &email, password).await {
            Ok(payload) => self.complete(payload),
            Err(e) => Err(self.fail(AuthError::from_api(e))),
        }
    }

    /// Validate a stored token at startup.
    ///
    /// A missing token is not an error: the session just stays anonymous.
    /// A token the endpoint rejects is deleted; a transport failure keeps
    /// the token for the next startup.
    ///
    /// # Errors
    ///
    /// Returns the same failures as `login` when a token is present but
    /// cannot be validated.
    #[instrument(skip(self))]
    pub async fn restore_session(&self) -> Result<SessionStatus, AuthError> {
        let Some(token) = self.inner.store.get::<String>(StoreKey::AuthToken)? else {
            return Ok(SessionStatus::Anonymous);
        };

        self.transition(Transition::Begin);
        let token = SecretString::from(token);
        match self.inner.auth.current_user(&token).await {
            Ok(user) => {
                let profile = UserProfile::from(user);
                info!(user = %profile.id, "Restored session from stored token");
                self.transition(Transition::Complete(profile));
                self.emit(&SessionEvent::Authenticated);
                Ok(SessionStatus::Authenticated)
            }
            Err(e) => {
                let err = AuthError::from_api(e);
                if !err.is_transport() {
                    // The token is dead; a failed delete only means one more
                    // doomed validation on the next startup.
                    if let Err(remove_err) = self.inner.store.remove(StoreKey::AuthToken) {
                        warn!(error = %remove_err, "Failed to delete rejected token");
                    }
                }
                Err(self.fail(err))
            }
        }
    }

    /// Log out.
    ///
    /// Clears the profile, deletes the token, and preserves the cached
    /// avatar. Idempotent: logging out while anonymous is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be deleted from the store.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Result<(), StoreError> {
        if lock(&self.inner.state).status == SessionStatus::Anonymous {
            return Ok(());
        }

        self.inner.store.remove(StoreKey::AuthToken)?;
        // StoreKey::Avatar stays: the next login on this device renders it
        // before the profile response arrives.
        self.transition(Transition::Clear);
        self.emit(&SessionEvent::LoggedOut);
        info!("Logged out");
        Ok(())
    }

    // =========================================================================
    // Avatar cache
    // =========================================================================

    /// Cache fetched avatar image bytes as a durable `data:` URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn cache_avatar_bytes(&self, mime: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let uri = format!("data:{mime};base64,{}", BASE64.encode(bytes));
        self.inner.store.put(StoreKey::Avatar, &uri)
    }

    /// The cached avatar data URI, if one was ever stored on this device.
    ///
    /// Readable in any state, including mid-`Authenticating`.
    #[must_use]
    pub fn cached_avatar(&self) -> Option<String> {
        self.inner.store.get(StoreKey::Avatar).ok().flatten()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn complete(&self, payload: AuthPayload) -> Result<UserProfile, AuthError> {
        if !payload.success {
            return Err(self.fail(AuthError::Rejected(
                "Authentication failed".to_string(),
            )));
        }

        if let Err(e) = self
            .inner
            .store
            .put(StoreKey::AuthToken, &payload.token)
        {
            return Err(self.fail(AuthError::Store(e)));
        }

        let profile = UserProfile::from(payload.user);
        info!(user = %profile.id, "Authenticated");
        self.transition(Transition::Complete(profile.clone()));
        self.emit(&SessionEvent::Authenticated);
        Ok(profile)
    }

    /// Record a failed attempt and hand the error back.
    fn fail(&self, error: AuthError) -> AuthError {
        self.transition(Transition::Fail(error.user_message()));
        error
    }

    fn transition(&self, transition: Transition) {
        lock(&self.inner.state).apply(transition);
    }

    /// Invoke subscribers. Runs with the state lock released, so listeners
    /// can observe the already-applied transition.
    fn emit(&self, event: &SessionEvent) {
        for listener in lock(&self.inner.listeners).iter() {
            listener(event);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::api::ApiError;

    /// Stub auth endpoint: one canned outcome for every call.
    struct StubAuth {
        outcome: fn() -> Result<AuthPayload, ApiError>,
        calls: AtomicUsize,
    }

    fn payload() -> AuthPayload {
        AuthPayload {
            success: true,
            token: "tok-123".to_string(),
            user: WireUser {
                id: UserId::new("u-1"),
                name: "Maya".to_string(),
                email: Email::parse("maya@example.com").unwrap(),
                role: Role::User,
                avatar: Some("https://cdn.example.com/a.png".to_string()),
            },
        }
    }

    #[async_trait]
    impl AuthApi for StubAuth {
        async fn login(&self, _: &Email, _: &str) -> Result<AuthPayload, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }

        async fn register(&self, _: &str, _: &Email, _: &str) -> Result<AuthPayload, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }

        async fn current_user(&self, _: &SecretString) -> Result<WireUser, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)().map(|p| p.user)
        }
    }

    fn machine(
        outcome: fn() -> Result<AuthPayload, ApiError>,
    ) -> (tempfile::TempDir, Arc<StubAuth>, SessionStateMachine) {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyValueStore::open(dir.path()).unwrap();
        let auth = Arc::new(StubAuth {
            outcome,
            calls: AtomicUsize::new(0),
        });
        let session = SessionStateMachine::new(auth.clone(), store);
        (dir, auth, session)
    }

    #[tokio::test]
    async fn test_login_success_stores_token_and_emits() {
        let (_dir, _auth, session) = machine(|| Ok(payload()));

        let events = Arc::new(AtomicUsize::new(0));
        let seen = events.clone();
        session.subscribe(move |event| {
            if *event == SessionEvent::Authenticated {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        let profile = session.login("maya@example.com", "pw").await.unwrap();
        assert_eq!(profile.name, "Maya");
        assert_eq!(session.status(), SessionStatus::Authenticated);
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_rejection_keeps_anonymous_with_message() {
        let (_dir, _auth, session) =
            machine(|| Err(ApiError::Rejected("Invalid credentials".to_string())));

        let err = session.login("maya@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
        assert_eq!(session.status(), SessionStatus::Anonymous);
        assert_eq!(session.last_error().as_deref(), Some("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_invalid_email_fails_before_network() {
        let (_dir, auth, session) = machine(|| Ok(payload()));

        let err = session.login("not-an-email", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
        assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.status(), SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_register_weak_password_fails_before_network() {
        let (_dir, auth, session) = machine(|| Ok(payload()));

        let err = session
            .register("Maya", "maya@example.com", "weak")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::WeakPassword(PasswordIssue::TooShort)
        ));
        assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_restore_without_token_is_silent() {
        let (_dir, auth, session) = machine(|| Ok(payload()));

        let status = session.restore_session().await.unwrap();
        assert_eq!(status, SessionStatus::Anonymous);
        assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_restore_with_rejected_token_deletes_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyValueStore::open(dir.path()).unwrap();
        store.put(StoreKey::AuthToken, &"stale").unwrap();

        let auth = Arc::new(StubAuth {
            outcome: || Err(ApiError::Rejected("Token expired".to_string())),
            calls: AtomicUsize::new(0),
        });
        let session = SessionStateMachine::new(auth, store.clone());

        assert!(session.restore_session().await.is_err());
        assert_eq!(session.status(), SessionStatus::Anonymous);
        assert!(!store.contains(StoreKey::AuthToken));
    }

    #[tokio::test]
    async fn test_logout_preserves_avatar_and_is_idempotent() {
        let (_dir, _auth, session) = machine(|| Ok(payload()));

        session.login("maya@example.com", "pw").await.unwrap();
        session.cache_avatar_bytes("image/png", b"pixels").unwrap();

        session.logout().unwrap();
        assert_eq!(session.status(), SessionStatus::Anonymous);
        assert!(session.cached_avatar().is_some());

        // Second logout is a no-op, not an error.
        session.logout().unwrap();
    }

    #[tokio::test]
    async fn test_cached_avatar_is_data_uri() {
        let (_dir, _auth, session) = machine(|| Ok(payload()));
        session.cache_avatar_bytes("image/png", b"abc").unwrap();

        let uri = session.cached_avatar().unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }
}
