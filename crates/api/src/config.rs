use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Notification hub timings.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Registrations older than this are closed by the sweeper.
    pub registration_ttl: Duration,
    /// How often the sweeper runs.
    pub sweep_interval: Duration,
    /// How long a new socket has to send its subscription frame.
    pub handshake_timeout: Duration,
    /// Interval between keep-alive pings.
    pub heartbeat_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            registration_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
            handshake_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Lifetime of presigned upload URLs (default: 15 minutes).
    pub presign_expiry: Duration,
    pub hub: HubConfig,
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `HOST`                       | `0.0.0.0`               |
    /// | `PORT`                       | `3000`                  |
    /// | `CORS_ORIGINS`               | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                    |
    /// | `PRESIGN_EXPIRY_MINS`        | `15`                    |
    /// | `HUB_REGISTRATION_TTL_SECS`  | `3600`                  |
    /// | `HUB_SWEEP_INTERVAL_SECS`    | `60`                    |
    /// | `HUB_HANDSHAKE_TIMEOUT_SECS` | `30`                    |
    /// | `JWT_SECRET`                 | required                |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let presign_expiry_mins: u64 = std::env::var("PRESIGN_EXPIRY_MINS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("PRESIGN_EXPIRY_MINS must be a valid u64");

        let hub = HubConfig {
            registration_ttl: secs_from_env("HUB_REGISTRATION_TTL_SECS", 3600),
            sweep_interval: secs_from_env("HUB_SWEEP_INTERVAL_SECS", 60),
            handshake_timeout: secs_from_env("HUB_HANDSHAKE_TIMEOUT_SECS", 30),
            ..HubConfig::default()
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            presign_expiry: Duration::from_secs(presign_expiry_mins * 60),
            hub,
            jwt: JwtConfig::from_env(),
        }
    }
}

fn secs_from_env(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .map(|raw| {
            raw.parse()
                .unwrap_or_else(|_| panic!("{key} must be a valid u64"))
        })
        .unwrap_or(default);
    Duration::from_secs(secs)
}
