//! Session context: where the bearer credential lives, and the events a host
//! application subscribes to when the service rejects it.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::CredentialError;

/// Key under which the bearer token is stored.
pub const TOKEN_KEY: &str = "access_token";

const EVENT_CAPACITY: usize = 16;

/// Backing storage for the bearer token.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, CredentialError>;
    fn save(&self, token: &str) -> Result<(), CredentialError>;
    fn clear(&self) -> Result<(), CredentialError>;
}

/// In-process token storage.
#[derive(Default)]
pub struct MemoryCredentials {
    token: RwLock<Option<String>>,
}

impl MemoryCredentials {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentials {
    fn load(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.token.read().clone())
    }

    fn save(&self, token: &str) -> Result<(), CredentialError> {
        *self.token.write() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.token.write() = None;
        Ok(())
    }
}

/// Token kept in a JSON object file under [`TOKEN_KEY`].
///
/// Other keys in the file are preserved on save and clear.
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_object(&self) -> Result<Map<String, Value>, CredentialError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(Map::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the file atomically. The temporary file is created owner-only
    /// (0600 on unix) and renamed over the target, so the token is never
    /// readable by other users, even briefly.
    fn write_object(&self, object: &Map<String, Value>) -> Result<(), CredentialError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(object)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentials {
    fn load(&self) -> Result<Option<String>, CredentialError> {
        Ok(self
            .read_object()?
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn save(&self, token: &str) -> Result<(), CredentialError> {
        let mut object = self.read_object()?;
        object.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        self.write_object(&object)
    }

    fn clear(&self) -> Result<(), CredentialError> {
        let mut object = self.read_object()?;
        if object.remove(TOKEN_KEY).is_some() {
            self.write_object(&object)?;
        }
        Ok(())
    }
}

/// Emitted on the session's channel when the service rejects the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The stored token was removed.
    CredentialCleared,
    /// The host should send the user to `login_path`.
    AuthExpired { login_path: String },
}

/// Credential plus event channel, handed to the client at construction.
///
/// Cheap to clone; clones share storage and channel.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Box<dyn CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("subscribers", &self.inner.events.receiver_count())
            .finish_non_exhaustive()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(MemoryCredentials::default())
    }
}

impl Session {
    pub fn new(store: impl CredentialStore + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                store: Box::new(store),
                events,
            }),
        }
    }

    /// Convenience for an in-memory session holding `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(MemoryCredentials::with_token(token))
    }

    /// Receive [`SessionEvent`]s emitted after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Current token, if any.
    ///
    /// A storage failure is logged and treated as "no token" so calls still go out.
    /// This reads the store on the calling thread; from async code prefer
    /// [`Session::fetch_token`].
    pub fn token(&self) -> Option<String> {
        match self.inner.store.load() {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "failed to load credential; continuing without one");
                None
            }
        }
    }

    pub fn log_in(&self, token: &str) -> Result<(), CredentialError> {
        self.inner.store.save(token)?;
        info!("credential stored");
        Ok(())
    }

    pub fn log_out(&self) -> Result<(), CredentialError> {
        self.inner.store.clear()?;
        info!("credential cleared");
        Ok(())
    }

    /// Like [`Session::token`], with the store read on the blocking pool so a
    /// file-backed store never stalls the async executor.
    pub async fn fetch_token(&self) -> Option<String> {
        let session = self.clone();
        match tokio::task::spawn_blocking(move || session.token()).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "credential load task failed; continuing without one");
                None
            }
        }
    }

    /// [`Session::expire`] on the blocking pool.
    pub(crate) async fn revoke(&self, login_path: &str) {
        let session = self.clone();
        let login_path = login_path.to_string();
        if let Err(e) = tokio::task::spawn_blocking(move || session.expire(&login_path)).await {
            warn!(error = %e, "credential clear task failed");
        }
    }

    /// Drop the credential and announce the expiry: one `CredentialCleared`
    /// followed by one `AuthExpired`. Touches the store synchronously; async
    /// callers use [`Session::revoke`].
    pub(crate) fn expire(&self, login_path: &str) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "failed to clear credential after 401");
        }
        // No subscribers is not an error: nobody is listening.
        let _ = self.inner.events.send(SessionEvent::CredentialCleared);
        let _ = self.inner.events.send(SessionEvent::AuthExpired {
            login_path: login_path.to_string(),
        });
        warn!(login_path, "session expired");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn memory_store_roundtrip() {
        let session = Session::default();
        assert_eq!(session.token(), None);
        session.log_in("abc").unwrap();
        assert_eq!(session.token().as_deref(), Some("abc"));
        session.log_out().unwrap();
        assert_eq!(session.token(), None);
    }

    #[test]
    fn empty_token_counts_as_absent() {
        let session = Session::with_token("");
        assert_eq!(session.token(), None);
    }

    #[test]
    fn file_store_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");
        let store = FileCredentials::new(&path);
        assert_eq!(store.load().unwrap(), None);

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        store.save("tok-1").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("tok-1"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        let remaining: Map<String, Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(remaining.get("theme"), Some(&Value::String("dark".into())));
        assert!(remaining.get(TOKEN_KEY).is_none());
    }

    #[test]
    fn corrupt_file_does_not_block_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();
        let session = Session::new(FileCredentials::new(&path));
        assert_eq!(session.token(), None);
    }

    #[test]
    fn expire_emits_clear_then_redirect_once() {
        let session = Session::with_token("stale");
        let mut rx = session.subscribe();

        session.expire("/login");

        assert_eq!(rx.try_recv().unwrap(), SessionEvent::CredentialCleared);
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::AuthExpired {
                login_path: "/login".into()
            }
        );
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(session.token(), None);
    }

    #[test]
    fn expire_without_subscribers_is_fine() {
        let session = Session::with_token("stale");
        session.expire("/login");
        assert_eq!(session.token(), None);
    }

    #[cfg(unix)]
    #[test]
    fn credential_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileCredentials::new(&path);
        store.save("secret").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(store.load().unwrap().as_deref(), Some("secret"));

        let fresh = dir.path().join("fresh").join("credentials.json");
        FileCredentials::new(&fresh).save("secret").unwrap();
        let mode = std::fs::metadata(&fresh).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn save_leaves_no_stray_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileCredentials::new(&path);
        store.save("a").unwrap();
        store.save("b").unwrap();
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn file_session_off_executor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let session = Session::new(FileCredentials::new(&path));
        session.log_in("tok-9").unwrap();
        let mut rx = session.subscribe();

        assert_eq!(session.fetch_token().await.as_deref(), Some("tok-9"));

        session.revoke("/login").await;
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::CredentialCleared);
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::AuthExpired { .. }
        ));
        assert_eq!(session.fetch_token().await, None);
    }
}
