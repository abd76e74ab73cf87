//! Login sessions.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::RngCore;

use cage_core::UserId;

/// Bytes of randomness in a session token.
const TOKEN_BYTES: usize = 32;

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: UserId,
    /// The client asked to stay signed in.
    pub remember: bool,
    pub created_at: i64,
}

/// Opaque tokens mapped to sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Session maps hold no invariants a panic could break.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a session and return its token.
    pub fn create(&self, user: UserId, remember: bool, now: i64) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        self.write().insert(
            token.clone(),
            Session {
                user,
                remember,
                created_at: now,
            },
        );
        token
    }

    pub fn get(&self, token: &str) -> Option<Session> {
        self.read().get(token).cloned()
    }

    pub fn remove(&self, token: &str) -> Option<Session> {
        self.write().remove(token)
    }

    /// End every session of `user`. Returns how many were ended.
    pub fn remove_user(&self, user: &UserId) -> usize {
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, s| &s.user != user);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
