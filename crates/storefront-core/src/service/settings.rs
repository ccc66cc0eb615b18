//! Runtime settings stored in the `settings` table
//!
//! Reads go through a moka cache keyed by setting kind; every write drops
//! the cached kind so the next read sees the new values.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use storefront_common::settings::{self as keys, email_key};
use storefront_common::utils::is_hex_color;
use storefront_common::{Rate, StorefrontError};
use storefront_persistence::entity::settings;
use storefront_persistence::sea_orm::sea_query::OnConflict;
use storefront_persistence::sea_orm::*;

type SettingMap = Arc<HashMap<String, String>>;

static SETTINGS_CACHE: LazyLock<Cache<String, SettingMap>> = LazyLock::new(|| {
    Cache::builder()
        .max_capacity(16)
        .time_to_live(Duration::from_secs(600))
        .build()
});

async fn load(db: &DatabaseConnection, kind: &str) -> anyhow::Result<SettingMap> {
    if let Some(cached) = SETTINGS_CACHE.get(kind).await {
        return Ok(cached);
    }

    let rows = settings::Entity::find()
        .filter(settings::Column::Kind.eq(kind))
        .all(db)
        .await?;

    let map: SettingMap = Arc::new(rows.into_iter().map(|r| (r.key, r.value)).collect());
    SETTINGS_CACHE.insert(kind.to_string(), map.clone()).await;

    Ok(map)
}

/// Drop every cached setting.
pub async fn invalidate() {
    SETTINGS_CACHE.invalidate_all();
    SETTINGS_CACHE.run_pending_tasks().await;
}

async fn write(
    db: &DatabaseConnection,
    kind: &str,
    values: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let rows = values.into_iter().map(|(key, value)| settings::ActiveModel {
        key: Set(key),
        kind: Set(kind.to_string()),
        value: Set(value),
    });

    settings::Entity::insert_many(rows)
        .on_conflict(
            OnConflict::column(settings::Column::Key)
                .update_columns([settings::Column::Value, settings::Column::Kind])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    SETTINGS_CACHE.invalidate(kind).await;

    Ok(())
}

/// General shop settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopSettings {
    pub elements_per_page: u64,
    /// Minutes; 0 disables the back-office idle timeout
    pub backoffice_expire: i64,
    pub vat: f64,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            elements_per_page: keys::DEFAULT_ELEMENTS_PER_PAGE,
            backoffice_expire: keys::DEFAULT_BACKOFFICE_EXPIRE as i64,
            vat: keys::DEFAULT_VAT,
        }
    }
}

impl ShopSettings {
    pub fn vat_rate(&self) -> Rate {
        Rate::from_fraction(self.vat)
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        Self {
            elements_per_page: map
                .get(keys::ELEMENTS_PER_PAGE)
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.elements_per_page),
            backoffice_expire: map
                .get(keys::BACKOFFICE_EXPIRE)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backoffice_expire),
            vat: map
                .get(keys::VAT)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.vat),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(1..=1000).contains(&self.elements_per_page) {
            return Err(
                StorefrontError::illegal("elements per page must be between 1 and 1000").into(),
            );
        }
        if !(0..=1440).contains(&self.backoffice_expire) {
            return Err(StorefrontError::illegal(
                "back-office expiry must be between 0 and 1440 minutes",
            )
            .into());
        }
        if !(0.0..1.0).contains(&self.vat) {
            return Err(StorefrontError::illegal("VAT must be in [0, 1)").into());
        }
        Ok(())
    }
}

pub async fn get_settings(db: &DatabaseConnection) -> anyhow::Result<ShopSettings> {
    let map = load(db, keys::KIND_SETTINGS).await?;
    Ok(ShopSettings::from_map(&map))
}

pub async fn update_other_settings(
    db: &DatabaseConnection,
    new_settings: ShopSettings,
) -> anyhow::Result<ShopSettings> {
    new_settings.validate()?;

    write(
        db,
        keys::KIND_SETTINGS,
        vec![
            (
                keys::ELEMENTS_PER_PAGE.to_string(),
                new_settings.elements_per_page.to_string(),
            ),
            (
                keys::BACKOFFICE_EXPIRE.to_string(),
                new_settings.backoffice_expire.to_string(),
            ),
            (keys::VAT.to_string(), new_settings.vat.to_string()),
        ],
    )
    .await?;

    tracing::info!(
        elements_per_page = new_settings.elements_per_page,
        backoffice_expire = new_settings.backoffice_expire,
        vat = new_settings.vat,
        "Settings updated"
    );

    Ok(new_settings)
}

/// Which email a template belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailKind {
    Order,
    Payment,
}

impl EmailKind {
    pub fn setting_kind(self) -> &'static str {
        match self {
            EmailKind::Order => keys::KIND_EMAIL_ORDER,
            EmailKind::Payment => keys::KIND_EMAIL_PAYMENT,
        }
    }
}

impl std::str::FromStr for EmailKind {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(EmailKind::Order),
            "payment" => Ok(EmailKind::Payment),
            _ => Err(StorefrontError::illegal(format!("unknown email template '{}'", s))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub sender: String,
    pub subject: String,
    pub upper: String,
    pub lower: String,
    pub table: Vec<String>,
    pub table_border_weight: u32,
    pub table_border_color: String,
}

impl EmailTemplate {
    fn from_map(kind: &str, map: &HashMap<String, String>) -> Self {
        let get = |suffix: &str| map.get(&email_key(kind, suffix)).cloned().unwrap_or_default();

        Self {
            sender: get(keys::EMAIL_SENDER),
            subject: get(keys::EMAIL_SUBJECT),
            upper: get(keys::EMAIL_UPPER),
            lower: get(keys::EMAIL_LOWER),
            table: get(keys::EMAIL_TABLE)
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
            table_border_weight: get(keys::EMAIL_BORDER_WEIGHT).parse().unwrap_or(1),
            table_border_color: get(keys::EMAIL_BORDER_COLOR),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.subject.trim().is_empty() {
            return Err(StorefrontError::illegal("email subject must not be empty").into());
        }
        if self.table.is_empty() {
            return Err(StorefrontError::illegal("email table needs at least one column").into());
        }
        for (i, column) in self.table.iter().enumerate() {
            if !keys::EMAIL_TABLE_COLUMNS.contains(&column.as_str()) {
                return Err(
                    StorefrontError::illegal(format!("unknown email table column '{}'", column))
                        .into(),
                );
            }
            if self.table[..i].contains(column) {
                return Err(StorefrontError::illegal(format!(
                    "email table column '{}' is repeated",
                    column
                ))
                .into());
            }
        }
        if !(1..=10).contains(&self.table_border_weight) {
            return Err(
                StorefrontError::illegal("table border weight must be between 1 and 10").into(),
            );
        }
        if !is_hex_color(&self.table_border_color) {
            return Err(StorefrontError::illegal(format!(
                "'{}' is not a hex colour",
                self.table_border_color
            ))
            .into());
        }
        Ok(())
    }
}

pub async fn get_email_template(
    db: &DatabaseConnection,
    kind: EmailKind,
) -> anyhow::Result<EmailTemplate> {
    let setting_kind = kind.setting_kind();
    let map = load(db, setting_kind).await?;
    Ok(EmailTemplate::from_map(setting_kind, &map))
}

pub async fn update_email_template(
    db: &DatabaseConnection,
    kind: EmailKind,
    template: EmailTemplate,
) -> anyhow::Result<EmailTemplate> {
    template.validate()?;

    let setting_kind = kind.setting_kind();
    let key = |suffix: &str| email_key(setting_kind, suffix);

    write(
        db,
        setting_kind,
        vec![
            (key(keys::EMAIL_SENDER), template.sender.clone()),
            (key(keys::EMAIL_SUBJECT), template.subject.clone()),
            (key(keys::EMAIL_UPPER), template.upper.clone()),
            (key(keys::EMAIL_LOWER), template.lower.clone()),
            (key(keys::EMAIL_TABLE), template.table.join(",")),
            (
                key(keys::EMAIL_BORDER_WEIGHT),
                template.table_border_weight.to_string(),
            ),
            (
                key(keys::EMAIL_BORDER_COLOR),
                template.table_border_color.clone(),
            ),
        ],
    )
    .await?;

    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> EmailTemplate {
        EmailTemplate {
            sender: "shop@example.com".to_string(),
            subject: "Order #{order_id}".to_string(),
            upper: "Hi".to_string(),
            lower: "Bye".to_string(),
            table: vec!["name".to_string(), "quantity".to_string()],
            table_border_weight: 2,
            table_border_color: "#a0b".to_string(),
        }
    }

    #[test]
    fn test_shop_settings_from_map_falls_back_to_defaults() {
        let mut map = HashMap::new();
        map.insert(keys::ELEMENTS_PER_PAGE.to_string(), "0".to_string());
        map.insert(keys::BACKOFFICE_EXPIRE.to_string(), "15".to_string());
        map.insert(keys::VAT.to_string(), "garbage".to_string());

        let settings = ShopSettings::from_map(&map);
        assert_eq!(settings.elements_per_page, keys::DEFAULT_ELEMENTS_PER_PAGE);
        assert_eq!(settings.backoffice_expire, 15);
        assert_eq!(settings.vat_rate(), Rate::from_basis_points(2000));
    }

    #[test]
    fn test_shop_settings_validate() {
        assert!(ShopSettings::default().validate().is_ok());

        let bad = ShopSettings {
            elements_per_page: 1001,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = ShopSettings {
            backoffice_expire: 1441,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let disabled = ShopSettings {
            backoffice_expire: 0,
            ..Default::default()
        };
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_email_template_validate() {
        assert!(template().validate().is_ok());

        let mut t = template();
        t.table = vec![];
        assert!(t.validate().is_err());

        let mut t = template();
        t.table = vec!["name".to_string(), "name".to_string()];
        assert!(t.validate().is_err());

        let mut t = template();
        t.table = vec!["colour".to_string()];
        assert!(t.validate().is_err());

        let mut t = template();
        t.table_border_weight = 11;
        assert!(t.validate().is_err());

        let mut t = template();
        t.table_border_color = "red".to_string();
        assert!(t.validate().is_err());

        let mut t = template();
        t.subject = "  ".to_string();
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_email_template_from_map() {
        let kind = keys::KIND_EMAIL_ORDER;
        let mut map = HashMap::new();
        map.insert(email_key(kind, keys::EMAIL_SUBJECT), "Hello".to_string());
        map.insert(email_key(kind, keys::EMAIL_TABLE), "name, price ,".to_string());
        map.insert(email_key(kind, keys::EMAIL_BORDER_WEIGHT), "3".to_string());

        let t = EmailTemplate::from_map(kind, &map);
        assert_eq!(t.subject, "Hello");
        assert_eq!(t.table, vec!["name", "price"]);
        assert_eq!(t.table_border_weight, 3);
    }

    #[test]
    fn test_email_kind_parse() {
        assert_eq!("order".parse::<EmailKind>().unwrap(), EmailKind::Order);
        assert_eq!(EmailKind::Payment.setting_kind(), keys::KIND_EMAIL_PAYMENT);
        assert!("invoice".parse::<EmailKind>().is_err());
    }
}
