use std::time::Duration;

use serde::Deserialize;

/// CORS configuration for browser clients
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins, `["*"]` allows any
    #[serde(default = "wildcard")]
    pub origins: Vec<String>,
    /// Allow credentials (incompatible with a wildcard origin)
    #[serde(default)]
    pub credentials: bool,
    /// Preflight cache lifetime in seconds
    #[serde(default)]
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: wildcard(),
            credentials: false,
            max_age: None,
        }
    }
}

impl CorsConfig {
    /// Whether any origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.origins.iter().any(|origin| origin == "*")
    }

    /// Preflight max age as a `Duration`
    pub fn max_age_duration(&self) -> Option<Duration> {
        self.max_age.map(Duration::from_secs)
    }
}

fn wildcard() -> Vec<String> {
    vec!["*".to_string()]
}
