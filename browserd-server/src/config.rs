//! Process environment → typed [`Config`] (§2.L, §6). No CLI flags, no
//! config file — `std::env::var` plus `FromStr`, the way a service with no
//! `clap` in its dependency tree reads its own tunables.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub use_https: bool,
    pub max_sessions: usize,
    pub session_idle_timeout: Duration,
    pub session_max_lifetime: Duration,
    pub session_gc_interval: Duration,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub headless: bool,
    pub command_timeout: Duration,
    /// Overrides the host:port the server advertises in viewer/ws/stream
    /// URLs. Falls back to `scheme://host:port` when unset — wrong behind a
    /// reverse proxy or in a container with published ports, hence the
    /// escape hatch.
    pub public_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            use_https: false,
            max_sessions: 10,
            session_idle_timeout: Duration::from_millis(300_000),
            session_max_lifetime: Duration::from_millis(3_600_000),
            session_gc_interval: Duration::from_millis(60_000),
            viewport_width: 1280,
            viewport_height: 720,
            headless: false,
            command_timeout: Duration::from_millis(30_000),
            public_base_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parsed("PORT", defaults.port),
            host: std::env::var("HOST").unwrap_or(defaults.host),
            use_https: env_bool("USE_HTTPS", defaults.use_https),
            max_sessions: env_parsed("MAX_SESSIONS", defaults.max_sessions),
            session_idle_timeout: env_millis("SESSION_IDLE_TIMEOUT", defaults.session_idle_timeout),
            session_max_lifetime: env_millis("SESSION_MAX_LIFETIME", defaults.session_max_lifetime),
            session_gc_interval: env_millis("SESSION_GC_INTERVAL", defaults.session_gc_interval),
            viewport_width: env_parsed("VIEWPORT_WIDTH", defaults.viewport_width),
            viewport_height: env_parsed("VIEWPORT_HEIGHT", defaults.viewport_height),
            headless: env_bool("HEADLESS", defaults.headless),
            command_timeout: env_millis("COMMAND_TIMEOUT", defaults.command_timeout),
            public_base_url: std::env::var("PUBLIC_BASE_URL").ok(),
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_https {
            "https"
        } else {
            "http"
        }
    }

    pub fn ws_scheme(&self) -> &'static str {
        if self.use_https {
            "wss"
        } else {
            "ws"
        }
    }

    /// `http(s)://host:port`, or `PUBLIC_BASE_URL` verbatim when set.
    pub fn base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("{}://{}:{}", self.scheme(), self.host, self.port),
        }
    }

    /// `ws(s)://host:port`, or `PUBLIC_BASE_URL` with its scheme swapped for
    /// the websocket equivalent when set.
    pub fn ws_base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => {
                let stripped = url.trim_end_matches('/');
                let stripped = stripped.strip_prefix("https://").or_else(|| stripped.strip_prefix("http://")).unwrap_or(stripped);
                format!("{}://{}", self.ws_scheme(), stripped)
            }
            None => format!("{}://{}:{}", self.ws_scheme(), self.host, self.port),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_millis(key: &str, default: Duration) -> Duration {
    Duration::from_millis(env_parsed(key, default.as_millis() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let c = Config::default();
        assert_eq!(c.port, 3000);
        assert_eq!(c.host, "0.0.0.0");
        assert!(!c.use_https);
        assert_eq!(c.max_sessions, 10);
        assert_eq!(c.session_idle_timeout, Duration::from_secs(300));
        assert_eq!(c.session_max_lifetime, Duration::from_secs(3600));
        assert_eq!(c.session_gc_interval, Duration::from_secs(60));
        assert_eq!((c.viewport_width, c.viewport_height), (1280, 720));
        assert!(!c.headless);
        assert_eq!(c.command_timeout, Duration::from_secs(30));
    }

    #[test]
    fn scheme_follows_use_https() {
        let mut c = Config::default();
        assert_eq!(c.scheme(), "http");
        assert_eq!(c.ws_scheme(), "ws");
        c.use_https = true;
        assert_eq!(c.scheme(), "https");
        assert_eq!(c.ws_scheme(), "wss");
    }
}
