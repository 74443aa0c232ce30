pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        login_ttl_seconds: u64,
        error_ttl_seconds: u64,
        users: Vec<String>,
    },
}
