//! Application state shared across all handlers

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use storefront_core::service::checkout::PricingPolicy;
use storefront_core::service::mail::Mailer;
use storefront_core::service::payment::PaymentGateway;
use storefront_core::service::settings;

use super::config::Configuration;

#[derive(Clone)]
pub struct AppState {
    pub configuration: Configuration,
    pub database_connection: DatabaseConnection,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("configuration", &self.configuration)
            .field("payment_gateway", &"<dyn PaymentGateway>")
            .field("mailer", &"<dyn Mailer>")
            .finish()
    }
}

impl AppState {
    pub fn db(&self) -> &DatabaseConnection {
        &self.database_connection
    }

    /// VAT from the settings table and the voucher limit from configuration
    pub async fn pricing_policy(&self) -> anyhow::Result<PricingPolicy> {
        let shop = settings::get_settings(self.db()).await?;

        Ok(PricingPolicy {
            vat: shop.vat_rate(),
            max_vouchers: self.configuration.max_vouchers_per_order(),
        })
    }
}
