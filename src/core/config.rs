use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use tracing::{info, warn};

const DEFAULT_JWT_SECRET: &str = "un segreto meno bello";

/// Who loses send capability when a block entry exists in a personal chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPolicy {
    /// Only the blocked identity is gated
    Directional,
    /// An entry in either direction gates both parties
    Symmetric,
}

impl FromStr for BlockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "directional" => Ok(BlockPolicy::Directional),
            "symmetric" => Ok(BlockPolicy::Symmetric),
            other => Err(format!(
                "Invalid BLOCK_POLICY '{}': must be 'directional' or 'symmetric'",
                other
            )),
        }
    }
}

/// Policy knobs of the chat core, separated from the server plumbing so tests
/// can build them without an environment
#[derive(Debug, Clone)]
pub struct ChatPolicy {
    pub edit_window: chrono::Duration,
    pub block_policy: BlockPolicy,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            edit_window: chrono::Duration::hours(24),
            block_policy: BlockPolicy::Directional,
            default_page_size: 50,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub app_env: String,
    pub heartbeat_interval_secs: u64,
    pub policy: ChatPolicy,
}

impl Config {
    /// Loads the configuration from environment variables
    /// Calls dotenv() first
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://courier.db?mode=rwc".to_string());

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using default (not secure for production!)");
            DEFAULT_JWT_SECRET.to_string()
        });

        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let server_port = parse_or(&lookup, "SERVER_PORT", 3000u16)
            .map_err(|_| "Invalid SERVER_PORT: must be a number between 0-65535".to_string())?;

        let max_connections = parse_or(&lookup, "MAX_DB_CONNECTIONS", 10u32)
            .map_err(|_| "Invalid MAX_DB_CONNECTIONS: must be a positive number".to_string())?;

        let app_env = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());

        let heartbeat_interval_secs = parse_or(&lookup, "HEARTBEAT_INTERVAL_SECS", 30u64)
            .map_err(|_| "Invalid HEARTBEAT_INTERVAL_SECS: must be a positive number".to_string())?;
        if heartbeat_interval_secs == 0 {
            return Err("Invalid HEARTBEAT_INTERVAL_SECS: must be greater than zero".to_string());
        }

        let edit_window_secs = parse_or(&lookup, "EDIT_WINDOW_SECS", 86_400i64)
            .map_err(|_| "Invalid EDIT_WINDOW_SECS: must be a number of seconds".to_string())?;
        if edit_window_secs < 0 {
            return Err("Invalid EDIT_WINDOW_SECS: must not be negative".to_string());
        }

        let block_policy = match lookup("BLOCK_POLICY") {
            Some(raw) => raw.parse::<BlockPolicy>()?,
            None => BlockPolicy::Directional,
        };

        let default_page_size = parse_or(&lookup, "DEFAULT_PAGE_SIZE", 50u32)
            .map_err(|_| "Invalid DEFAULT_PAGE_SIZE: must be a positive number".to_string())?;
        let max_page_size = parse_or(&lookup, "MAX_PAGE_SIZE", 100u32)
            .map_err(|_| "Invalid MAX_PAGE_SIZE: must be a positive number".to_string())?;
        if default_page_size == 0 || default_page_size > max_page_size {
            return Err("DEFAULT_PAGE_SIZE must be between 1 and MAX_PAGE_SIZE".to_string());
        }

        Ok(Config {
            database_url,
            jwt_secret,
            server_host,
            server_port,
            max_connections,
            app_env,
            heartbeat_interval_secs,
            policy: ChatPolicy {
                edit_window: chrono::Duration::seconds(edit_window_secs),
                block_policy,
                default_page_size,
                max_page_size,
            },
        })
    }

    /// Logs the configuration, hiding secrets
    pub fn print_info(&self) {
        info!("Server Configuration:");
        info!("   Environment: {}", self.app_env);
        info!("   Server Address: {}:{}", self.server_host, self.server_port);
        info!("   Database: {}", Self::mask_url(&self.database_url));
        info!("   Max DB Connections: {}", self.max_connections);
        info!("   Heartbeat Interval: {}s", self.heartbeat_interval_secs);
        info!("   Edit Window: {}s", self.policy.edit_window.num_seconds());
        info!("   Block Policy: {:?}", self.policy.block_policy);
        info!(
            "   JWT Secret: {}",
            if self.jwt_secret == DEFAULT_JWT_SECRET {
                "USING DEFAULT (INSECURE!)"
            } else {
                "custom secret configured"
            }
        );
    }

    /// Masks the database URL for logging
    fn mask_url(url: &str) -> String {
        if let Some(at_pos) = url.find('@') {
            if let Some(scheme_end) = url.find("://") {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos..];
                return format!("{}***{}", scheme, after_at);
            }
        }
        // file urls carry no credentials
        if url.starts_with("sqlite:") {
            return url.to_string();
        }
        "***".to_string()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, T::Err>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>(),
        None => Ok(default),
    }
}
