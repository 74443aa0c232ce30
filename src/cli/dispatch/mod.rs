use crate::cli::actions::Action;
use anyhow::Result;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        login_ttl_seconds: matches
            .get_one::<u64>("login-ttl")
            .copied()
            .unwrap_or(10 * 60),
        error_ttl_seconds: matches
            .get_one::<u64>("error-ttl")
            .copied()
            .unwrap_or(30 * 60),
        users: matches
            .get_many::<String>("user")
            .map(|users| users.cloned().collect())
            .unwrap_or_default(),
    })
}
