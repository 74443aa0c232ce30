//! User credential lookup and password verification.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Persistent user credential storage, as seen by the verification flow.
pub trait UserStore: Send + Sync {
    fn exists(&self, username: &str) -> bool;

    fn verify_password(&self, username: &str, password: &str) -> bool;
}

/// In-memory [`UserStore`] holding password digests.
///
/// Only a digest is kept; raw passwords are dropped on insert. This is a
/// storage detail of the reference implementation, not a key-derivation
/// scheme for production credential stores.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, username: &str, password: &str) {
        self.lock()
            .insert(username.to_string(), digest_password(password));
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UserStore for MemoryUserStore {
    fn exists(&self, username: &str) -> bool {
        self.lock().contains_key(username)
    }

    fn verify_password(&self, username: &str, password: &str) -> bool {
        self.lock()
            .get(username)
            .is_some_and(|stored| *stored == digest_password(password))
    }
}

fn digest_password(password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}
