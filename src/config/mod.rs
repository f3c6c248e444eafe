use crate::error::{Result, TuitionServerError};

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongo_uri: String,
    pub database_name: String,
    pub secret_key: String,
    pub admin_username: String,
    pub admin_password: Option<String>,
    pub admin_password_hash: Option<String>,
    pub session_expiry_hours: u64,
    pub server_host: String,
    pub server_port: u16,
}

impl AppConfig {
    /// Reads configuration from the process environment. Call after
    /// `dotenvy::dotenv()` so a local `.env` file is honored.
    pub fn load_from_env() -> Result<Self> {
        let secret_key = std::env::var("SECRET_KEY")
            .map_err(|_| TuitionServerError::Config("SECRET_KEY is not set".to_string()))?;

        if secret_key.len() < MIN_SECRET_LEN {
            return Err(TuitionServerError::Config(format!(
                "SECRET_KEY must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        let session_expiry_hours = std::env::var("SESSION_EXPIRY_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(24);

        let server_port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        Ok(Self {
            mongo_uri: std::env::var("MONGO_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database_name: std::env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "bright_horizon".to_string()),
            secret_key,
            admin_username: std::env::var("ADMIN_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),
            admin_password: std::env::var("ADMIN_PASSWORD").ok(),
            admin_password_hash: std::env::var("ADMIN_PASSWORD_HASH").ok(),
            session_expiry_hours,
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port,
        })
    }

    /// True when enough is configured to bootstrap the admin account.
    pub fn has_admin_credentials(&self) -> bool {
        self.admin_password.is_some() || self.admin_password_hash.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn clear_env() {
        for key in [
            "SECRET_KEY",
            "MONGO_URI",
            "DATABASE_NAME",
            "ADMIN_USERNAME",
            "ADMIN_PASSWORD",
            "ADMIN_PASSWORD_HASH",
            "SESSION_EXPIRY_HOURS",
            "SERVER_HOST",
            "SERVER_PORT",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_missing_secret_key_fails() {
        clear_env();
        assert!(AppConfig::load_from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_short_secret_key_fails() {
        clear_env();
        std::env::set_var("SECRET_KEY", "too-short");
        assert!(AppConfig::load_from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        std::env::set_var("SECRET_KEY", TEST_SECRET);

        let config = AppConfig::load_from_env().unwrap();
        assert_eq!(config.mongo_uri, "mongodb://localhost:27017");
        assert_eq!(config.database_name, "bright_horizon");
        assert_eq!(config.admin_username, "admin");
        assert_eq!(config.session_expiry_hours, 24);
        assert_eq!(config.server_port, 8080);
        assert!(!config.has_admin_credentials());
    }

    #[test]
    #[serial]
    fn test_admin_credentials_detected() {
        clear_env();
        std::env::set_var("SECRET_KEY", TEST_SECRET);
        std::env::set_var("ADMIN_PASSWORD", "hunter2hunter2");

        let config = AppConfig::load_from_env().unwrap();
        assert!(config.has_admin_credentials());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        std::env::set_var("SECRET_KEY", TEST_SECRET);
        std::env::set_var("DATABASE_NAME", "bright_horizon_test");
        std::env::set_var("SESSION_EXPIRY_HOURS", "2");
        std::env::set_var("SERVER_PORT", "9090");

        let config = AppConfig::load_from_env().unwrap();
        assert_eq!(config.database_name, "bright_horizon_test");
        assert_eq!(config.session_expiry_hours, 2);
        assert_eq!(config.server_port, 9090);
    }
}
