//! Server start-up: logging and the HTTP server

pub mod http;
pub mod logging;

pub use http::storefront_server;
pub use logging::{LoggingConfig, LoggingGuard, init_logging};
