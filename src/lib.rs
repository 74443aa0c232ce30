//! # Stepgate (second-factor login verification)
//!
//! `stepgate` handles one step of a multi-factor login flow: after a user
//! submits their username and password, it decides whether to proceed to
//! TOTP verification, to redirect into a lockout/troubleshooting path, or to
//! reject the attempt with a user-visible reason.
//!
//! ## Decision workflow
//!
//! Every request reduces to one of three immutable outcomes:
//!
//! - **Render**: show the TOTP verification prompt for an identified user.
//! - **Lockout redirect**: the user's TOTP checks are temporarily disabled;
//!   send them to the troubleshooting path instead.
//! - **Error redirect**: the attempt failed for a user-visible reason; mint a
//!   short-lived session carrying the message and bounce back to the login
//!   page.
//!
//! ## Sessions
//!
//! Identity and error context travel across redirects in server-held,
//! TTL-bounded sessions keyed by opaque ULIDs. An error session (30 minutes
//! by default) exists only to survive one redirect hop; a login session
//! (10 minutes by default) carries the authenticated-but-not-yet-verified
//! identity while the user retrieves their device code.
//!
//! ## Error-message policy
//!
//! Login failures name exactly what went wrong, including "that username does
//! not exist". Hiding username existence behind a generic message is a
//! deliberate non-goal: any signup flow already discloses it.

pub mod api;
pub mod cli;
pub mod session;
pub mod templates;
pub mod totp;
pub mod users;
pub mod verify;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
