use serde::Deserialize;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_ACCEPT: &str = "application/vnd.github+json";

/// Settings for the remote object fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the git objects API, without a trailing slash.
    pub api_url: String,
    /// Sent as `User-Agent`; the API rejects anonymous agents.
    pub user_agent: String,
    /// Sent as `Accept`.
    pub accept: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: concat!("githubfs/", env!("CARGO_PKG_VERSION")).to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
        }
    }
}

impl Config {
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }
}
