//! Main entry point for the storefront server.

use std::sync::Arc;

use storefront_auth::service::staff;
use storefront_core::service::audit::{self, AuditLayer};
use storefront_core::service::mail::LogMailer;
use storefront_core::service::payment::PayPalGateway;
use storefront_migration::{Migrator, MigratorTrait};
use storefront_server::middleware::rate_limit::RateLimiter;
use storefront_server::model::{AppState, Configuration};
use storefront_server::startup;
use tracing::{info, warn};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let configuration = Configuration::new();

    // Audit events reach the database through this layer once the writer runs
    let (audit_layer, audit_receiver) = AuditLayer::channel();
    let logging_config = configuration.logging_config();
    let _logging_guard = startup::init_logging(&logging_config, Some(audit_layer))?;

    let db = configuration.database_connection().await?;

    if configuration.run_migrations() {
        Migrator::up(&db, None).await?;
        info!("Database migrations applied");
    }

    match configuration.bootstrap_admin() {
        Some(admin) => {
            staff::bootstrap_admin(&db, &admin.username, &admin.email, &admin.password).await?;
        }
        None => warn!("No bootstrap administrator configured"),
    }

    let _audit_writer = audit::spawn_writer(db.clone(), audit_receiver);

    let paypal = configuration.paypal_config();
    if paypal.client_id.is_empty() {
        warn!("PayPal client id is not configured; PayPal captures will fail");
    }

    let app_state = Arc::new(AppState {
        payment_gateway: Arc::new(PayPalGateway::new(paypal)?),
        mailer: Arc::new(LogMailer),
        database_connection: db,
        configuration: configuration.clone(),
    });

    let login_limiter = RateLimiter::new(configuration.login_rate_limit());
    let _rate_limit_cleanup_handle = login_limiter.start_cleanup_task();

    startup::storefront_server(
        app_state,
        login_limiter,
        configuration.context_path(),
        configuration.server_address(),
        configuration.server_port(),
    )?
    .await?;

    info!("Storefront server stopped");

    Ok(())
}
