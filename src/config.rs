//! Environment configuration

use crate::error::ClientError;
use crate::Result;
use std::env;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub backend_base_url: String,
    pub port: u16,
    pub log_level: String,
}

impl ClientConfig {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let port = match env::var("PORT").or_else(|_| env::var("API_PORT")) {
            Ok(raw) => raw
                .parse()
                .map_err(|e| ClientError::Config(format!("invalid PORT {:?}: {}", raw, e)))?,
            Err(_) => DEFAULT_PORT,
        };

        let backend_base_url = env::var("TAX_BACKEND_URL")
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

        if !backend_base_url.starts_with("http://") && !backend_base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "TAX_BACKEND_URL must be an http(s) URL, got {:?}",
                backend_base_url
            )));
        }

        Ok(Self {
            backend_base_url,
            port,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// `RUST_LOG` wins over the configured level when set.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear() {
        for key in ["PORT", "API_PORT", "TAX_BACKEND_URL", "LOG_LEVEL"] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();
        env::set_var("API_PORT", "9191");
        env::set_var("TAX_BACKEND_URL", "https://tax.example.com");

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.port, 9191);
        assert_eq!(config.backend_base_url, "https://tax.example.com");

        clear();
    }

    #[test]
    fn test_invalid_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();

        env::set_var("PORT", "not-a-port");
        assert!(matches!(ClientConfig::from_env(), Err(ClientError::Config(_))));

        clear();
        env::set_var("TAX_BACKEND_URL", "ftp://files");
        assert!(matches!(ClientConfig::from_env(), Err(ClientError::Config(_))));

        clear();
    }
}
