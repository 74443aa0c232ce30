//! Verification orchestrator: decides whether a login attempt proceeds to
//! TOTP verification, is routed into lockout troubleshooting, or is bounced
//! back to the login page with a reason.
//!
//! Two entry points mirror the two ways a client arrives here: [`Verifier::resume`]
//! for a GET carrying a session key (typically a retry after a failed code),
//! and [`Verifier::submit`] for a POST of raw credentials. Both reduce to an
//! immutable [`Outcome`]; all session writes happen through the store before
//! the outcome is returned, so no shared mutable session leaks out.

use crate::session::SessionStore;
use crate::totp::{Totp, TotpData};
use crate::users::UserStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

pub const MSG_SESSION_EXPIRED: &str = "Your session has expired; please log in again.";
pub const MSG_USERNAME_MISSING: &str = "You need to type in your username.";
pub const MSG_USERNAME_UNKNOWN: &str = "That username does not exist.";
pub const MSG_PASSWORD_MISSING: &str = "Please choose a password.";
pub const MSG_PASSWORD_WRONG: &str = "You did not enter the right password.";

const DEFAULT_ERROR_SESSION_TTL: Duration = Duration::from_secs(30 * 60);
const DEFAULT_LOGIN_SESSION_TTL: Duration = Duration::from_secs(10 * 60);

/// Session TTLs for the two kinds of sessions this flow mints.
///
/// Explicit configuration rather than constants, so tests can run with
/// arbitrarily short TTLs.
#[derive(Clone, Debug)]
pub struct VerifyConfig {
    error_session_ttl: Duration,
    login_session_ttl: Duration,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifyConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            error_session_ttl: DEFAULT_ERROR_SESSION_TTL,
            login_session_ttl: DEFAULT_LOGIN_SESSION_TTL,
        }
    }

    #[must_use]
    pub fn with_error_session_ttl(mut self, ttl: Duration) -> Self {
        self.error_session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_login_session_ttl(mut self, ttl: Duration) -> Self {
        self.login_session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn error_session_ttl(&self) -> Duration {
        self.error_session_ttl
    }

    #[must_use]
    pub fn login_session_ttl(&self) -> Duration {
        self.login_session_ttl
    }
}

/// What a verification request reduces to. Every entry point returns exactly
/// one of these; user input errors never surface as `Err`.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// Show the TOTP prompt for the user behind `session_key`.
    Render {
        session_key: String,
        err_msg: Option<String>,
        totp: TotpData,
    },
    /// TOTP checks are disabled for this user; send them to troubleshooting.
    RedirectLockout { session_key: String },
    /// The attempt failed with a user-visible reason, carried by a freshly
    /// minted short-lived session.
    RedirectError {
        session_key: String,
        message: String,
    },
}

/// The decision core. Stateless per request; all state lives in the
/// collaborators.
pub struct Verifier {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    totp: Arc<dyn Totp>,
    config: VerifyConfig,
}

impl Verifier {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        totp: Arc<dyn Totp>,
        config: VerifyConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            totp,
            config,
        }
    }

    /// Resume an existing login session (GET), typically after a failed code
    /// entry bounced the user back here.
    ///
    /// # Errors
    /// Only collaborator failures (e.g. the TOTP engine) propagate; a missing
    /// or expired session is a normal error-redirect outcome.
    pub fn resume(&self, session_key: Option<&str>) -> Result<Outcome> {
        let session = session_key.and_then(|key| self.sessions.get(key));
        let username = session
            .as_ref()
            .map(|session| session.get_or_default("username", ""))
            .unwrap_or_default();

        let Some(session) = session.filter(|_| !username.is_empty()) else {
            return Ok(self.error_redirect(MSG_SESSION_EXPIRED));
        };

        let totp = self.totp.start_check(&username)?;
        if totp.locked {
            return Ok(Outcome::RedirectLockout {
                session_key: session.key().to_string(),
            });
        }

        // errMsg is read-only here; the page that consumes it clears it.
        let err_msg = session.get_or_default("errMsg", "");
        Ok(Outcome::Render {
            session_key: session.key().to_string(),
            err_msg: (!err_msg.is_empty()).then_some(err_msg),
            totp,
        })
    }

    /// Check submitted credentials (POST) and mint a login session on
    /// success.
    ///
    /// Failure messages deliberately say which part was wrong, including
    /// username existence; see the crate docs for the disclosure policy.
    /// No rate limiting happens at this layer.
    ///
    /// # Errors
    /// Only collaborator failures propagate; every credential problem is an
    /// error-redirect outcome.
    pub fn submit(&self, username: Option<&str>, password: Option<&str>) -> Result<Outcome> {
        let username = username.unwrap_or_default();
        if username.is_empty() {
            return Ok(self.error_redirect(MSG_USERNAME_MISSING));
        }

        if !self.users.exists(username) {
            return Ok(self.error_redirect(MSG_USERNAME_UNKNOWN));
        }

        let password = password.unwrap_or_default();
        if password.is_empty() {
            return Ok(self.error_redirect(MSG_PASSWORD_MISSING));
        }

        if !self.users.verify_password(username, password) {
            return Ok(self.error_redirect(MSG_PASSWORD_WRONG));
        }

        let totp = self.totp.start_check(username)?;
        let session = self.sessions.create(self.config.login_session_ttl);
        self.sessions.put(session.key(), "username", username);

        if totp.locked {
            return Ok(Outcome::RedirectLockout {
                session_key: session.key().to_string(),
            });
        }

        Ok(Outcome::Render {
            session_key: session.key().to_string(),
            err_msg: None,
            totp,
        })
    }

    /// Mint a fresh error session carrying `message` across one redirect hop.
    /// Never reuses an existing session.
    fn error_redirect(&self, message: &str) -> Outcome {
        let session = self.sessions.create(self.config.error_session_ttl);
        self.sessions.put(session.key(), "errMsg", message);
        Outcome::RedirectError {
            session_key: session.key().to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use crate::users::MemoryUserStore;
    use anyhow::anyhow;

    struct FixedTotp {
        locked: bool,
    }

    impl Totp for FixedTotp {
        fn start_check(&self, _username: &str) -> Result<TotpData> {
            Ok(TotpData {
                locked: self.locked,
                secret: vec![7u8; 20],
            })
        }
    }

    struct FailingTotp;

    impl Totp for FailingTotp {
        fn start_check(&self, username: &str) -> Result<TotpData> {
            Err(anyhow!("No TOTP enrollment for user: {username}"))
        }
    }

    struct Fixture {
        sessions: Arc<MemorySessionStore>,
        verifier: Verifier,
    }

    fn fixture(locked: bool) -> Fixture {
        let users = Arc::new(MemoryUserStore::new());
        users.insert("alice", "correct");
        let sessions = Arc::new(MemorySessionStore::new());
        let verifier = Verifier::new(
            users,
            sessions.clone(),
            Arc::new(FixedTotp { locked }),
            VerifyConfig::new(),
        );
        Fixture { sessions, verifier }
    }

    fn expect_error(outcome: Outcome) -> (String, String) {
        match outcome {
            Outcome::RedirectError {
                session_key,
                message,
            } => (session_key, message),
            other => panic!("expected error redirect, got {other:?}"),
        }
    }

    #[test]
    fn resume_without_key_redirects_with_expired_message() -> Result<()> {
        let f = fixture(false);
        let (key, message) = expect_error(f.verifier.resume(None)?);
        assert_eq!(message, MSG_SESSION_EXPIRED);

        // The message rides in a freshly minted session.
        let session = f.sessions.get(&key).expect("error session should exist");
        assert_eq!(session.get_or_default("errMsg", ""), MSG_SESSION_EXPIRED);
        Ok(())
    }

    #[test]
    fn resume_with_unknown_key_mints_a_different_session() -> Result<()> {
        let f = fixture(false);
        let (key, _) = expect_error(f.verifier.resume(Some("abc"))?);
        assert_ne!(key, "abc");
        Ok(())
    }

    #[test]
    fn resume_session_without_username_counts_as_expired() -> Result<()> {
        let f = fixture(false);
        let session = f.sessions.create(Duration::from_secs(60));
        let (key, message) = expect_error(f.verifier.resume(Some(session.key()))?);
        assert_eq!(message, MSG_SESSION_EXPIRED);
        assert_ne!(key, session.key());
        Ok(())
    }

    #[test]
    fn resume_renders_with_existing_session_and_err_msg() -> Result<()> {
        let f = fixture(false);
        let session = f.sessions.create(Duration::from_secs(60));
        f.sessions.put(session.key(), "username", "alice");
        f.sessions.put(session.key(), "errMsg", "That code is not right.");

        match f.verifier.resume(Some(session.key()))? {
            Outcome::Render {
                session_key,
                err_msg,
                totp,
            } => {
                assert_eq!(session_key, session.key());
                assert_eq!(err_msg.as_deref(), Some("That code is not right."));
                assert!(!totp.locked);
            }
            other => panic!("expected render, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn resume_locked_out_redirects_to_same_session() -> Result<()> {
        let f = fixture(true);
        let session = f.sessions.create(Duration::from_secs(60));
        f.sessions.put(session.key(), "username", "alice");

        match f.verifier.resume(Some(session.key()))? {
            Outcome::RedirectLockout { session_key } => assert_eq!(session_key, session.key()),
            other => panic!("expected lockout redirect, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn submit_empty_username_fails_regardless_of_password() -> Result<()> {
        let f = fixture(false);
        for password in [None, Some(""), Some("correct")] {
            let (_, message) = expect_error(f.verifier.submit(None, password)?);
            assert_eq!(message, MSG_USERNAME_MISSING);
            let (_, message) = expect_error(f.verifier.submit(Some(""), password)?);
            assert_eq!(message, MSG_USERNAME_MISSING);
        }
        Ok(())
    }

    #[test]
    fn submit_unknown_username_fails_before_totp_check() -> Result<()> {
        // A failing TOTP engine proves the existence check short-circuits.
        let users = Arc::new(MemoryUserStore::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let verifier = Verifier::new(
            users,
            sessions,
            Arc::new(FailingTotp),
            VerifyConfig::new(),
        );
        let (_, message) = expect_error(verifier.submit(Some("mallory"), Some("whatever"))?);
        assert_eq!(message, MSG_USERNAME_UNKNOWN);
        Ok(())
    }

    #[test]
    fn submit_empty_password_fails() -> Result<()> {
        let f = fixture(false);
        let (_, message) = expect_error(f.verifier.submit(Some("alice"), None)?);
        assert_eq!(message, MSG_PASSWORD_MISSING);
        let (_, message) = expect_error(f.verifier.submit(Some("alice"), Some(""))?);
        assert_eq!(message, MSG_PASSWORD_MISSING);
        Ok(())
    }

    #[test]
    fn submit_wrong_password_fails() -> Result<()> {
        let f = fixture(false);
        let (_, message) = expect_error(f.verifier.submit(Some("alice"), Some("wrong"))?);
        assert_eq!(message, MSG_PASSWORD_WRONG);
        Ok(())
    }

    #[test]
    fn submit_success_mints_login_session_with_username() -> Result<()> {
        let f = fixture(false);
        match f.verifier.submit(Some("alice"), Some("correct"))? {
            Outcome::Render {
                session_key,
                err_msg,
                ..
            } => {
                assert!(err_msg.is_none());
                let session = f
                    .sessions
                    .get(&session_key)
                    .expect("login session should exist");
                assert_eq!(session.get_or_default("username", ""), "alice");
            }
            other => panic!("expected render, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn submit_success_under_lockout_redirects_to_new_session() -> Result<()> {
        let f = fixture(true);
        match f.verifier.submit(Some("alice"), Some("correct"))? {
            Outcome::RedirectLockout { session_key } => {
                // The fresh session still carries the identity.
                let session = f
                    .sessions
                    .get(&session_key)
                    .expect("login session should exist");
                assert_eq!(session.get_or_default("username", ""), "alice");
            }
            other => panic!("expected lockout redirect, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn login_session_honors_configured_ttl() -> Result<()> {
        let users = Arc::new(MemoryUserStore::new());
        users.insert("alice", "correct");
        let sessions = Arc::new(MemorySessionStore::new());
        let verifier = Verifier::new(
            users,
            sessions.clone(),
            Arc::new(FixedTotp { locked: false }),
            VerifyConfig::new().with_login_session_ttl(Duration::ZERO),
        );

        match verifier.submit(Some("alice"), Some("correct"))? {
            Outcome::Render { session_key, .. } => {
                // Zero TTL: the session expired the moment it was created, so
                // the username write was dropped too.
                assert!(sessions.get(&session_key).is_none());
            }
            other => panic!("expected render, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn error_redirects_never_reuse_sessions() -> Result<()> {
        let f = fixture(false);
        let (first, _) = expect_error(f.verifier.submit(None, None)?);
        let (second, _) = expect_error(f.verifier.submit(None, None)?);
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn totp_engine_failure_propagates_from_submit() {
        let users = Arc::new(MemoryUserStore::new());
        users.insert("alice", "correct");
        let verifier = Verifier::new(
            users,
            Arc::new(MemorySessionStore::new()),
            Arc::new(FailingTotp),
            VerifyConfig::new(),
        );
        assert!(verifier.submit(Some("alice"), Some("correct")).is_err());
    }
}
