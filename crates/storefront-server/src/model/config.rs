//! Configuration management for the storefront server
//!
//! Values come from `STOREFRONT.*` environment variables, then
//! `conf/application.yml`, then command line overrides.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use storefront_auth::model::{
    CUSTOMER_TOKEN_EXPIRE_SECONDS, DEFAULT_CUSTOMER_TOKEN_EXPIRE_SECONDS, DEFAULT_TOKEN_SECRET_KEY,
    TOKEN_SECRET_KEY,
};
use storefront_core::service::account::MailLinks;
use storefront_core::service::payment::{PAYPAL_SANDBOX_URL, PayPalConfig};

use super::constants::*;
use crate::middleware::rate_limit::RateLimitConfig;
use crate::startup::logging::LoggingConfig;

/// Command line arguments for the server
#[derive(Debug, Parser)]
#[command()]
struct Cli {
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
    #[arg(long = "db-url", env = "DATABASE_URL")]
    database_url: Option<String>,
    #[arg(long = "media-dir")]
    media_dir: Option<String>,
}

/// Bootstrap administrator created at start-up
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    pub fn new() -> Self {
        let args = Cli::parse();
        let mut config_builder = Config::builder()
            .add_source(
                Environment::with_prefix("storefront")
                    .separator(".")
                    .try_parsing(true),
            )
            .add_source(config::File::with_name("conf/application.yml").required(false));

        if let Some(v) = args.port {
            config_builder = config_builder
                .set_override(SERVER_PORT_PROPERTY, v as i64)
                .expect("Failed to set server port override");
        }
        if let Some(v) = args.database_url {
            config_builder = config_builder
                .set_override(DB_URL, v)
                .expect("Failed to set database URL override");
        }
        if let Some(v) = args.media_dir {
            config_builder = config_builder
                .set_override(MEDIA_DIR_PROPERTY, v)
                .expect("Failed to set media directory override");
        }

        let app_config = config_builder
            .build()
            .expect("Failed to build configuration - check conf/application.yml");

        Configuration { config: app_config }
    }

    pub fn from_config(config: Config) -> Self {
        Configuration { config }
    }

    // ========================================================================
    // Server Configuration
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string(SERVER_ADDRESS_PROPERTY)
            .unwrap_or("0.0.0.0".to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int(SERVER_PORT_PROPERTY)
            .ok()
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Prefix of every route, without a trailing slash
    pub fn context_path(&self) -> String {
        let path = self.config.get_string(CONTEXT_PATH_PROPERTY).unwrap_or_default();
        let path = path.trim().trim_end_matches('/');
        if path.is_empty() || path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        }
    }

    pub fn media_dir(&self) -> PathBuf {
        PathBuf::from(
            self.config
                .get_string(MEDIA_DIR_PROPERTY)
                .unwrap_or(DEFAULT_MEDIA_DIR.to_string()),
        )
    }

    // ========================================================================
    // Authentication Configuration
    // ========================================================================

    pub fn token_secret_key(&self) -> String {
        self.config
            .get_string(TOKEN_SECRET_KEY)
            .unwrap_or(DEFAULT_TOKEN_SECRET_KEY.to_string())
    }

    pub fn customer_token_expire_seconds(&self) -> i64 {
        self.config
            .get_int(CUSTOMER_TOKEN_EXPIRE_SECONDS)
            .unwrap_or(DEFAULT_CUSTOMER_TOKEN_EXPIRE_SECONDS)
    }

    /// Administrator to create on start-up, when all three keys are set
    pub fn bootstrap_admin(&self) -> Option<AdminAccount> {
        let username = self.config.get_string(ADMIN_USERNAME).ok()?;
        let email = self.config.get_string(ADMIN_EMAIL).ok()?;
        let password = self.config.get_string(ADMIN_PASSWORD).ok()?;

        if username.is_empty() || password.is_empty() {
            return None;
        }

        Some(AdminAccount {
            username,
            email,
            password,
        })
    }

    pub fn login_rate_limit(&self) -> RateLimitConfig {
        let defaults = RateLimitConfig::default();
        RateLimitConfig {
            max_requests: self
                .config
                .get_int(LOGIN_RATE_LIMIT_MAX_REQUESTS)
                .ok()
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.max_requests),
            window_duration: self
                .config
                .get_int(LOGIN_RATE_LIMIT_WINDOW_SECONDS)
                .ok()
                .and_then(|v| u64::try_from(v).ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.window_duration),
            enabled: self
                .config
                .get_bool(LOGIN_RATE_LIMIT_ENABLED)
                .unwrap_or(defaults.enabled),
        }
    }

    // ========================================================================
    // Shop Configuration
    // ========================================================================

    pub fn max_vouchers_per_order(&self) -> usize {
        self.config
            .get_int(MAX_VOUCHERS_PROPERTY)
            .ok()
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(DEFAULT_MAX_VOUCHERS)
    }

    pub fn products_per_page(&self) -> u64 {
        self.config
            .get_int(PRODUCTS_PER_PAGE_PROPERTY)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_PRODUCTS_PER_PAGE)
    }

    pub fn paypal_config(&self) -> PayPalConfig {
        PayPalConfig {
            client_id: self.config.get_string(PAYPAL_CLIENT_ID).unwrap_or_default(),
            client_secret: self.config.get_string(PAYPAL_CLIENT_SECRET).unwrap_or_default(),
            base_url: self
                .config
                .get_string(PAYPAL_BASE_URL)
                .unwrap_or(PAYPAL_SANDBOX_URL.to_string()),
        }
    }

    pub fn mail_links(&self) -> MailLinks {
        MailLinks {
            sender: self
                .config
                .get_string(MAIL_SENDER)
                .unwrap_or(DEFAULT_MAIL_SENDER.to_string()),
            public_url: self
                .config
                .get_string(PUBLIC_URL)
                .unwrap_or(DEFAULT_PUBLIC_URL.to_string()),
        }
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    /// Logging settings from the config file, overridable through
    /// `STOREFRONT_LOG_*` environment variables
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string(LOGS_PATH).ok(),
            self.config.get_bool(LOGS_CONSOLE).unwrap_or(true),
            self.config.get_bool(LOGS_FILE).unwrap_or(true),
            self.config
                .get_string(LOGS_LEVEL)
                .unwrap_or("info".to_string()),
        )
        .with_env_overrides()
    }

    // ========================================================================
    // Database Configuration
    // ========================================================================

    pub fn run_migrations(&self) -> bool {
        self.config.get_bool(DB_MIGRATE).unwrap_or(true)
    }

    pub async fn database_connection(
        &self,
    ) -> std::result::Result<DatabaseConnection, Box<dyn std::error::Error>> {
        let max_connections = self
            .config
            .get_int("db.pool.config.maximumPoolSize")
            .unwrap_or(20) as u32;
        let min_connections = self
            .config
            .get_int("db.pool.config.minimumPoolSize")
            .unwrap_or(1) as u32;
        let connect_timeout = self
            .config
            .get_int("db.pool.config.connectionTimeout")
            .unwrap_or(30) as u64;
        let acquire_timeout = self
            .config
            .get_int("db.pool.config.initializationFailTimeout")
            .unwrap_or(8) as u64;
        let idle_timeout = self
            .config
            .get_int("db.pool.config.idleTimeout")
            .unwrap_or(10) as u64;
        let max_lifetime = self
            .config
            .get_int("db.pool.config.maxLifetime")
            .unwrap_or(1800) as u64;
        let sqlx_logging = self
            .config
            .get_bool("db.pool.config.sqlxLogging")
            .unwrap_or(false);

        let url = self.config.get_string(DB_URL)?;

        let mut opt = ConnectOptions::new(url);

        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .acquire_timeout(Duration::from_secs(acquire_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .max_lifetime(Duration::from_secs(max_lifetime))
            .sqlx_logging(sqlx_logging);

        tracing::info!(
            max_connections = max_connections,
            min_connections = min_connections,
            connect_timeout = connect_timeout,
            idle_timeout = idle_timeout,
            max_lifetime = max_lifetime,
            sqlx_logging = sqlx_logging,
            "Database connection pool configured"
        );

        let database_connection: DatabaseConnection = Database::connect(opt).await?;

        Ok(database_connection)
    }
}
