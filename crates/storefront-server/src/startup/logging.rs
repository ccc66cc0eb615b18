//! File-based logging with one file per component.
//!
//! | Log File        | Component                  | Target Prefixes                            |
//! |-----------------|----------------------------|--------------------------------------------|
//! | storefront.log  | Root logger (everything)   | (all)                                      |
//! | auth.log        | Logins and staff sessions  | storefront_auth, storefront_server guards  |
//! | orders.log      | Checkout and order editing | storefront_core checkout and order         |
//! | payments.log    | PayPal gateway             | storefront_core::service::payment          |
//! | persistence.log | SQL statements             | sea_orm, sqlx, storefront_persistence      |
//!
//! Log files are stored in `~/storefront/logs` by default.
//! Override with `STOREFRONT_LOG_DIR` or `storefront.logs.path`.
//!
//! Audit events are also handed to the [`AuditLayer`], which stores them in
//! the database.

use std::path::PathBuf;

use storefront_core::service::audit::AuditLayer;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

struct ComponentLogDef {
    file_name: &'static str,
    targets: &'static [&'static str],
}

const ROOT_LOG_FILE: &str = "storefront.log";

const COMPONENT_LOGS: &[ComponentLogDef] = &[
    ComponentLogDef {
        file_name: "auth.log",
        targets: &[
            "storefront_auth",
            "storefront_server::secured",
            "storefront_server::middleware",
        ],
    },
    ComponentLogDef {
        file_name: "orders.log",
        targets: &[
            "storefront_core::service::checkout",
            "storefront_core::service::order",
        ],
    },
    ComponentLogDef {
        file_name: "payments.log",
        targets: &["storefront_core::service::payment"],
    },
    ComponentLogDef {
        file_name: "persistence.log",
        targets: &["sea_orm", "sqlx", "storefront_persistence"],
    },
];

fn default_log_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(format!("{}/storefront/logs", home))
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Log rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Logging configuration for the entire application.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base log directory (default: `~/storefront/logs`)
    pub log_dir: PathBuf,
    pub console_output: bool,
    pub console_level: Level,
    pub file_logging: bool,
    pub file_level: Level,
    pub rotation: LogRotation,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            console_output: true,
            console_level: Level::INFO,
            file_logging: true,
            file_level: Level::INFO,
            rotation: LogRotation::Daily,
        }
    }
}

impl LoggingConfig {
    /// Create from application configuration.
    pub fn from_config(
        log_dir: Option<String>,
        console_output: bool,
        file_logging: bool,
        level: String,
    ) -> Self {
        let level = level.parse().unwrap_or(Level::INFO);

        Self {
            log_dir: log_dir.map(PathBuf::from).unwrap_or_else(default_log_dir),
            console_output,
            console_level: level,
            file_logging,
            file_level: level,
            rotation: LogRotation::Daily,
        }
    }

    /// Apply `STOREFRONT_LOG_*` environment variables on top.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("STOREFRONT_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Ok(v) = std::env::var("STOREFRONT_LOG_CONSOLE") {
            self.console_output = parse_flag(&v);
        }
        if let Ok(v) = std::env::var("STOREFRONT_LOG_FILE") {
            self.file_logging = parse_flag(&v);
        }
        if let Some(level) = std::env::var("STOREFRONT_LOG_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.console_level = level;
            self.file_level = level;
        }
        if let Some(level) = std::env::var("STOREFRONT_LOG_FILE_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.file_level = level;
        }
        self
    }
}

/// Keeps the non-blocking file writers alive. Dropping it flushes them.
pub struct LoggingGuard {
    _file_guards: Vec<WorkerGuard>,
}

fn file_layer(
    config: &LoggingConfig,
    file_name: &str,
    guards: &mut Vec<WorkerGuard>,
) -> impl Layer<Registry> + Send + Sync {
    let appender = RollingFileAppender::new(config.rotation.into(), &config.log_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    guards.push(guard);

    fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
}

/// Install the global subscriber: console, `storefront.log`, the component
/// files and, when given, the audit layer.
///
/// `RUST_LOG` overrides the configured level of the console and root file.
pub fn init_logging(
    config: &LoggingConfig,
    audit: Option<AuditLayer>,
) -> Result<LoggingGuard, Box<dyn std::error::Error>> {
    if config.file_logging {
        std::fs::create_dir_all(&config.log_dir)?;
    }

    let mut guards: Vec<WorkerGuard> = Vec::new();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.console_output {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.console_level.to_string()));
        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(filter);
        layers.push(Box::new(console_layer));
    }

    if config.file_logging {
        let root_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.file_level.to_string()));
        layers.push(Box::new(
            file_layer(config, ROOT_LOG_FILE, &mut guards).with_filter(root_filter),
        ));

        let file_level: LevelFilter = config.file_level.into();
        for component in COMPONENT_LOGS {
            let mut targets = Targets::new();
            for target in component.targets {
                targets = targets.with_target(*target, file_level);
            }
            layers.push(Box::new(
                file_layer(config, component.file_name, &mut guards).with_filter(targets),
            ));
        }
    }

    if let Some(audit) = audit {
        layers.push(Box::new(audit));
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    if config.file_logging {
        tracing::info!(
            log_dir = %config.log_dir.display(),
            "File logging initialized: {} (root) + {} component log files",
            ROOT_LOG_FILE,
            COMPONENT_LOGS.len()
        );
    }

    Ok(LoggingGuard {
        _file_guards: guards,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(config.console_output);
        assert!(config.file_logging);
        assert_eq!(config.console_level, Level::INFO);
        assert!(config.log_dir.ends_with("storefront/logs"));
    }

    #[test]
    fn test_logging_config_from_config() {
        let config = LoggingConfig::from_config(
            Some("/tmp/storefront-logs".to_string()),
            false,
            true,
            "debug".to_string(),
        );
        assert_eq!(config.log_dir, PathBuf::from("/tmp/storefront-logs"));
        assert!(!config.console_output);
        assert_eq!(config.file_level, Level::DEBUG);

        let config = LoggingConfig::from_config(None, true, true, "loud".to_string());
        assert_eq!(config.console_level, Level::INFO);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("no"));
    }

    #[test]
    fn test_log_rotation_conversion() {
        assert_eq!(Rotation::from(LogRotation::Daily), Rotation::DAILY);
        assert_eq!(Rotation::from(LogRotation::Never), Rotation::NEVER);
    }

    #[test]
    fn test_component_log_definitions() {
        let mut names: Vec<_> = COMPONENT_LOGS.iter().map(|c| c.file_name).collect();
        names.push(ROOT_LOG_FILE);
        names.sort();
        names.dedup();
        assert_eq!(names.len(), COMPONENT_LOGS.len() + 1);

        for component in COMPONENT_LOGS {
            assert!(component.file_name.ends_with(".log"));
            assert!(!component.targets.is_empty());
        }
    }

    #[test]
    fn test_file_layer_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            log_dir: dir.path().to_path_buf(),
            rotation: LogRotation::Never,
            ..Default::default()
        };

        let mut guards = Vec::new();
        let layer = file_layer(&config, "orders.log", &mut guards);
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("order placed");
        });
        drop(guards);

        let written = std::fs::read_to_string(dir.path().join("orders.log")).unwrap();
        assert!(written.contains("order placed"));
    }
}
