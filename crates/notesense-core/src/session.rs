//! Authenticated session state.
//!
//! A [`Session`] holds the bearer credential every transport call needs. It
//! is cheap to clone and shared between the HTTP client, the sync engine and
//! the CLI. Credentials survive restarts through a [`CredentialStore`].
//!
//! Sign-in and sign-out are broadcast as [`SessionEvent`]s so the workspace
//! can tear down its timers when the server rejects the token.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::defaults;
use crate::error::Result;

// =============================================================================
// CREDENTIALS
// =============================================================================

/// Profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
}

/// Bearer token plus the profile it belongs to. This is also the body the
/// auth routes answer with.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    pub user: UserProfile,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

// =============================================================================
// CREDENTIAL STORES
// =============================================================================

/// Persistent storage for the session credential.
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential, if any.
    fn load(&self) -> Result<Option<Credentials>>;

    /// Replace the stored credential.
    fn save(&self, credentials: &Credentials) -> Result<()>;

    /// Forget the stored credential. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

/// Process-local credential store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credentials>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

/// Credential store backed by a JSON file.
///
/// A missing file means "signed out". An unreadable or corrupt file is
/// logged and treated the same way, so a damaged file never blocks sign-in.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credentials>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Credentials>(&raw) {
            Ok(credentials) => Ok(Some(credentials)),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring corrupt credential file"
                );
                Ok(None)
            }
        }
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string_pretty(credentials)?;
        std::fs::write(&self.path, body)?;
        debug!(path = %self.path.display(), "Credential saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// The user signed out.
    Logout,
    /// The server rejected the credential (401).
    Expired,
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(UserProfile),
    SignedOut { reason: SignOutReason },
}

struct SessionInner {
    credentials: RwLock<Option<Credentials>>,
    store: Arc<dyn CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
}

/// Shared handle to the current authentication state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a signed-out session persisting through `store`.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(defaults::EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                credentials: RwLock::new(None),
                store,
                events,
            }),
        }
    }

    /// Signed-out session with a [`MemoryCredentialStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::new()))
    }

    /// Session already holding `credentials` (not persisted, no event).
    pub fn with_credentials(credentials: Credentials) -> Self {
        let session = Self::in_memory();
        *session.write() = Some(credentials);
        session
    }

    /// Load a previously persisted credential. Returns whether one was found.
    pub fn restore(&self) -> Result<bool> {
        let loaded = self.inner.store.load()?;
        let found = loaded.is_some();
        if let Some(credentials) = &loaded {
            debug!(user_id = %credentials.user.id, "Session restored");
        }
        *self.write() = loaded;
        Ok(found)
    }

    /// Bind a fresh credential (after login/signup), persist it and announce it.
    pub fn bind(&self, credentials: Credentials) -> Result<()> {
        self.inner.store.save(&credentials)?;
        let user = credentials.user.clone();
        *self.write() = Some(credentials);
        info!(user_id = %user.id, "Signed in");
        let _ = self.inner.events.send(SessionEvent::SignedIn(user));
        Ok(())
    }

    /// Token to put in the `Authorization: Bearer` header.
    pub fn bearer(&self) -> Option<String> {
        self.read().as_ref().map(|c| c.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read().as_ref().map(|c| c.user.clone())
    }

    /// Sign out on user request.
    pub fn clear(&self) -> Result<()> {
        self.end(SignOutReason::Logout)
    }

    /// Drop the credential after the server rejected it.
    ///
    /// Idempotent: concurrent 401s produce a single `SignedOut` event.
    pub fn invalidate(&self) {
        if let Err(e) = self.end(SignOutReason::Expired) {
            warn!(error = %e, "Failed to clear stored credential");
        }
    }

    /// Receive sign-in and sign-out notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn end(&self, reason: SignOutReason) -> Result<()> {
        let previous = self.write().take();
        let cleared = self.inner.store.clear();
        if previous.is_some() {
            info!(?reason, "Signed out");
            let _ = self.inner.events.send(SessionEvent::SignedOut { reason });
        }
        cleared
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Credentials>> {
        self.inner
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Credentials>> {
        self.inner
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(token: &str) -> Credentials {
        Credentials {
            token: token.to_string(),
            user: UserProfile {
                id: "u1".to_string(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            },
        }
    }

    #[test]
    fn test_new_session_is_signed_out() {
        let session = Session::in_memory();
        assert!(!session.is_authenticated());
        assert!(session.bearer().is_none());
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_bind_emits_signed_in() {
        let session = Session::in_memory();
        let mut rx = session.subscribe();
        session.bind(creds("t1")).unwrap();

        assert_eq!(session.bearer().as_deref(), Some("t1"));
        match rx.recv().await.unwrap() {
            SessionEvent::SignedIn(user) => assert_eq!(user.email, "ada@example.com"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let session = Session::with_credentials(creds("t1"));
        let mut rx = session.subscribe();

        session.invalidate();
        session.invalidate();

        assert!(!session.is_authenticated());
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::SignedOut {
                reason: SignOutReason::Expired
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clear_forgets_persisted_credential() {
        let store = Arc::new(MemoryCredentialStore::new());
        let session = Session::new(store.clone());
        session.bind(creds("t1")).unwrap();
        assert!(store.load().unwrap().is_some());

        session.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_restore_from_store() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.save(&creds("persisted")).unwrap();

        let session = Session::new(store);
        assert!(session.restore().unwrap());
        assert_eq!(session.bearer().as_deref(), Some("persisted"));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join("creds.json"));

        assert!(store.load().unwrap().is_none());
        store.save(&creds("t1")).unwrap();
        assert_eq!(store.load().unwrap(), Some(creds("t1")));
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_corrupt_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let rendered = format!("{:?}", creds("secret-token"));
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("redacted"));
    }
}
