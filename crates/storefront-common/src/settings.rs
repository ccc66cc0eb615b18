//! Keys and defaults of the runtime settings table

pub const KIND_SETTINGS: &str = "settings";
pub const KIND_EMAIL_ORDER: &str = "email_order";
pub const KIND_EMAIL_PAYMENT: &str = "email_payment";

pub const ELEMENTS_PER_PAGE: &str = "elements_per_page";
pub const BACKOFFICE_EXPIRE: &str = "backoffice_expire";
pub const VAT: &str = "vat";

pub const DEFAULT_ELEMENTS_PER_PAGE: u64 = 20;
/// Minutes of inactivity after which a staff token stops being accepted
pub const DEFAULT_BACKOFFICE_EXPIRE: u64 = 5;
pub const DEFAULT_VAT: f64 = 0.2;

/// Columns an email template table may show
pub const EMAIL_TABLE_COLUMNS: &[&str] = &["name", "price", "subtotal", "quantity"];

/// Suffixes of the email template keys, prefixed by the template kind
/// (`email_order_subject`, `email_payment_upper`, ...).
pub const EMAIL_SENDER: &str = "sender";
pub const EMAIL_SUBJECT: &str = "subject";
pub const EMAIL_UPPER: &str = "upper";
pub const EMAIL_LOWER: &str = "lower";
pub const EMAIL_TABLE: &str = "table";
pub const EMAIL_BORDER_WEIGHT: &str = "table_border_weight";
pub const EMAIL_BORDER_COLOR: &str = "table_border_color";

pub fn email_key(kind: &str, suffix: &str) -> String {
    format!("{}_{}", kind, suffix)
}
