//! TOTP secret/lockout engine.
//!
//! The orchestrator only needs a per-user snapshot: is this user locked out,
//! and what secret drives their code check? Code computation is delegated to
//! `totp-rs` (SHA1, 6 digits, 30 second step); the algorithm itself is not
//! reimplemented here.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use totp_rs::{Algorithm, Secret, TOTP};

const DEFAULT_MAX_FAILURES: u32 = 5;

/// Snapshot of a user's TOTP check state at the start of a verification.
#[derive(Clone, Debug)]
pub struct TotpData {
    pub locked: bool,
    pub secret: Vec<u8>,
}

/// TOTP collaborator contract consumed by the verification flow.
pub trait Totp: Send + Sync {
    /// Begin a TOTP check for `username`.
    ///
    /// # Errors
    /// Returns an error when the user has no TOTP enrollment; lockout is a
    /// normal outcome reported through [`TotpData::locked`], never an error.
    fn start_check(&self, username: &str) -> Result<TotpData>;
}

struct TotpEntry {
    secret: Vec<u8>,
    failures: u32,
}

/// In-memory TOTP engine with failure-counter lockout.
///
/// A user is locked out once their consecutive failure count reaches the
/// threshold; a successful check resets the counter.
pub struct TotpEngine {
    entries: Mutex<HashMap<String, TotpEntry>>,
    max_failures: u32,
}

impl Default for TotpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TotpEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_failures(DEFAULT_MAX_FAILURES)
    }

    #[must_use]
    pub fn with_max_failures(max_failures: u32) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_failures,
        }
    }

    /// Enroll a user with a freshly generated secret, returning the secret
    /// so the caller can hand it to the user's authenticator.
    ///
    /// # Errors
    /// Returns an error if secret generation fails.
    pub fn enroll(&self, username: &str) -> Result<Vec<u8>> {
        let secret = Secret::generate_secret()
            .to_bytes()
            .map_err(|e| anyhow!("Secret gen error: {e}"))?;
        self.lock().insert(
            username.to_string(),
            TotpEntry {
                secret: secret.clone(),
                failures: 0,
            },
        );
        Ok(secret)
    }

    /// Count one failed code entry against the user.
    pub fn record_failure(&self, username: &str) {
        if let Some(entry) = self.lock().get_mut(username) {
            entry.failures += 1;
        }
    }

    /// Clear the failure counter after a successful check.
    pub fn reset_failures(&self, username: &str) {
        if let Some(entry) = self.lock().get_mut(username) {
            entry.failures = 0;
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TotpEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Totp for TotpEngine {
    fn start_check(&self, username: &str) -> Result<TotpData> {
        let entries = self.lock();
        let entry = entries
            .get(username)
            .ok_or_else(|| anyhow!("No TOTP enrollment for user: {username}"))?;
        Ok(TotpData {
            locked: entry.failures >= self.max_failures,
            secret: entry.secret.clone(),
        })
    }
}

/// Compute the code an authenticator shows for `secret` right now.
///
/// # Errors
/// Returns an error if the secret is rejected by `totp-rs` or the system
/// clock is unreadable.
pub fn current_code(secret: &[u8]) -> Result<String> {
    let totp = TOTP::new(Algorithm::SHA1, 6, 1, 30, secret.to_vec())
        .map_err(|e| anyhow!("TOTP init error: {e}"))?;
    totp.generate_current()
        .map_err(|e| anyhow!("TOTP clock error: {e}"))
}
