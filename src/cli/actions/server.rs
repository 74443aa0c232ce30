use crate::api::{self, state::VerifyState};
use crate::cli::actions::Action;
use crate::session::MemorySessionStore;
use crate::templates::StaticTemplates;
use crate::totp::TotpEngine;
use crate::users::MemoryUserStore;
use crate::verify::{Verifier, VerifyConfig};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            login_ttl_seconds,
            error_ttl_seconds,
            users,
        } => {
            let user_store = Arc::new(MemoryUserStore::new());
            let totp = Arc::new(TotpEngine::new());

            for entry in &users {
                let (name, password) = entry
                    .split_once(':')
                    .ok_or_else(|| anyhow!("Invalid --user value, expected name:password"))?;
                user_store.insert(name, password);
                totp.enroll(name)?;
                info!("Seeded user {name} with a fresh TOTP enrollment");
            }

            let config = VerifyConfig::new()
                .with_login_session_ttl(Duration::from_secs(login_ttl_seconds))
                .with_error_session_ttl(Duration::from_secs(error_ttl_seconds));

            let verifier = Verifier::new(
                user_store,
                Arc::new(MemorySessionStore::new()),
                totp,
                config,
            );
            let verify_state = Arc::new(VerifyState::new(
                verifier,
                Arc::new(StaticTemplates::new()),
            ));

            api::serve(port, verify_state).await?;
        }
    }

    Ok(())
}
