use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_APP_NAME: &str = "startup_investor_agent";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Where and as whom messages are delivered.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    pub app_name: String,
    pub user_id: String,
    /// Bound on each transport attempt, streaming and synchronous alike.
    pub request_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            user_id: generate_user_id(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl AgentConfig {
    /// Join `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// A random `user_` id with nine base-36 characters.
pub fn generate_user_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n = uuid::Uuid::new_v4().as_u128();
    let suffix: String = (0..9)
        .map(|_| {
            let c = ALPHABET[(n % 36) as usize] as char;
            n /= 36;
            c
        })
        .collect();
    format!("user_{suffix}")
}
