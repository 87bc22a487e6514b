//! Session holder, persistence and auth-state listeners.
//!
//! DESIGN
//! ======
//! A [`SessionState`] owns the single current session of one client. Every
//! change goes through [`SessionState::set`] or [`SessionState::clear`], which
//! persist to the optional [`SessionStore`] and then notify listeners.
//! Listener callbacks run after the lock is released, so a callback may call
//! back into the client.
//!
//! Stores report I/O problems through `tracing` rather than failing the auth
//! operation that triggered them: a session that could not be written to disk
//! is still valid for the running process.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use crate::types::Session;

// =============================================================================
// STORES
// =============================================================================

/// Where a session survives between runs.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<Session>;
    fn save(&self, session: &Session);
    fn clear(&self);
}

/// Process-local store. Mostly useful in tests and for sharing one session
/// between several clients.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Session>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Option<Session> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn save(&self, session: &Session) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
    }

    fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// JSON file store. The file holds bearer credentials, so on Unix it is
/// created readable by the owner only.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, session: &Session) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(session).map_err(io::Error::other)?;
        fs::write(&self.path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Option<Session> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read session file");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable session file");
                None
            }
        }
    }

    fn save(&self, session: &Session) {
        if let Err(e) = self.write(session) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist session");
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "failed to remove session file"),
        }
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Auth-state transitions delivered to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Delivered once on subscribe, with whatever session is held.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

type Listener = Arc<dyn Fn(AuthEvent, Option<&Session>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Listener)>>,
}

impl Listeners {
    fn snapshot(&self) -> Vec<Listener> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

/// Handle returned by a subscription. Dropping it unregisters the listener.
#[must_use = "dropping the subscription unregisters the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Unregister now. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

// =============================================================================
// STATE
// =============================================================================

pub struct SessionState {
    current: RwLock<Option<Session>>,
    store: Option<Arc<dyn SessionStore>>,
    listeners: Arc<Listeners>,
}

impl SessionState {
    /// Start from whatever the store holds.
    #[must_use]
    pub fn new(store: Option<Arc<dyn SessionStore>>) -> Self {
        let restored = store.as_ref().and_then(|s| s.load());
        if let Some(session) = &restored {
            tracing::debug!(user_id = %session.user_id(), "restored persisted session");
        }
        Self { current: RwLock::new(restored), store, listeners: Arc::new(Listeners::default()) }
    }

    #[must_use]
    pub fn get(&self) -> Option<Session> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the held session, persist it and notify `event`.
    pub fn set(&self, session: Session, event: AuthEvent) {
        if let Some(store) = &self.store {
            store.save(&session);
        }
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        self.emit(event, Some(&session));
    }

    /// Drop the held session. Notifies `SignedOut` only if one was held.
    pub fn clear(&self) {
        let previous = self.current.write().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(store) = &self.store {
            store.clear();
        }
        if previous.is_some() {
            self.emit(AuthEvent::SignedOut, None);
        }
    }

    /// Register `callback` and deliver `InitialSession` to it immediately.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(AuthEvent, Option<&Session>) + Send + Sync + 'static,
    {
        let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener = Arc::new(callback);
        self.listeners
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::clone(&listener)));

        let current = self.get();
        listener(AuthEvent::InitialSession, current.as_ref());
        Subscription { id, listeners: Arc::downgrade(&self.listeners) }
    }

    fn emit(&self, event: AuthEvent, session: Option<&Session>) {
        for listener in self.listeners.snapshot() {
            listener(event, session);
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
