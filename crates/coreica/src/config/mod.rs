use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub mail: MailConfig,
    pub submissions: SubmissionSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::from_str(&env::var("APP_LOG_FORMAT").unwrap_or_default());

        let resume_dir = env::var("APP_RESUME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/resumes"));

        let mail = MailConfig {
            api_key: env::var("RESEND_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            from_address: env::var("APP_MAIL_FROM")
                .unwrap_or_else(|_| "Coreica <onboarding@resend.dev>".to_string()),
            site_url: env::var("APP_SITE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            timeout: Duration::from_secs(read_number("APP_MAIL_TIMEOUT_SECS", 10)?),
        };

        let submissions = SubmissionSettings {
            idempotency_window_minutes: read_number("APP_IDEMPOTENCY_WINDOW_MINUTES", 10)?,
            admin_identities: parse_identities(
                &env::var("APP_ADMIN_IDENTITIES").unwrap_or_default(),
            )?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            storage: StorageConfig { resume_dir },
            mail,
            submissions,
        })
    }
}

fn read_number(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { var }),
        _ => Ok(default),
    }
}

fn parse_identities(raw: &str) -> Result<Vec<Uuid>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            Uuid::parse_str(value).map_err(|_| ConfigError::InvalidIdentity {
                value: value.to_string(),
            })
        })
        .collect()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Output shape for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Where staged resume uploads are written.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub resume_dir: PathBuf,
}

/// Confirmation e-mail delivery. Without an API key mail is only logged.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: Option<String>,
    pub from_address: String,
    pub site_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SubmissionSettings {
    pub idempotency_window_minutes: u64,
    pub admin_identities: Vec<Uuid>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str },
    InvalidIdentity { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var } => {
                write!(f, "{var} must be a non-negative integer")
            }
            ConfigError::InvalidIdentity { value } => {
                write!(f, "APP_ADMIN_IDENTITIES entry '{value}' is not a UUID")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidIdentity { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for var in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "APP_RESUME_DIR",
            "RESEND_API_KEY",
            "APP_MAIL_FROM",
            "APP_SITE_URL",
            "APP_MAIL_TIMEOUT_SECS",
            "APP_IDEMPOTENCY_WINDOW_MINUTES",
            "APP_ADMIN_IDENTITIES",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert_eq!(config.storage.resume_dir, PathBuf::from("./data/resumes"));
        assert!(config.mail.api_key.is_none());
        assert_eq!(config.mail.timeout, Duration::from_secs(10));
        assert_eq!(config.submissions.idempotency_window_minutes, 10);
        assert!(config.submissions.admin_identities.is_empty());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn blank_api_key_disables_mail() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RESEND_API_KEY", "   ");
        env::set_var("APP_LOG_FORMAT", "JSON");
        let config = AppConfig::load().expect("config loads");
        assert!(config.mail.api_key.is_none());
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        reset_env();
    }

    #[test]
    fn parses_admin_identities() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(
            "APP_ADMIN_IDENTITIES",
            "6f1c2a1e-94a3-4c53-9d7e-1b8f0f1d2a10, ,2b0d9c4e-7e55-4b8e-8f0a-3c2d1e0f9a88",
        );
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.submissions.admin_identities.len(), 2);

        env::set_var("APP_ADMIN_IDENTITIES", "not-a-uuid");
        match AppConfig::load() {
            Err(ConfigError::InvalidIdentity { value }) => assert_eq!(value, "not-a-uuid"),
            other => panic!("expected invalid identity, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_window() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_IDEMPOTENCY_WINDOW_MINUTES", "soon");
        match AppConfig::load() {
            Err(ConfigError::InvalidNumber { var }) => {
                assert_eq!(var, "APP_IDEMPOTENCY_WINDOW_MINUTES")
            }
            other => panic!("expected invalid number, got {other:?}"),
        }
        reset_env();
    }
}
