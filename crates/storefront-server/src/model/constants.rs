// Configuration keys and defaults of the storefront server

pub const SERVER_ADDRESS_PROPERTY: &str = "server.address";
pub const SERVER_PORT_PROPERTY: &str = "server.port";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const CONTEXT_PATH_PROPERTY: &str = "storefront.server.contextPath";

pub const MEDIA_DIR_PROPERTY: &str = "storefront.media.dir";
pub const DEFAULT_MEDIA_DIR: &str = "media";

pub const MAX_VOUCHERS_PROPERTY: &str = "storefront.checkout.max.vouchers";
pub const DEFAULT_MAX_VOUCHERS: usize = 1;
pub const PRODUCTS_PER_PAGE_PROPERTY: &str = "storefront.catalog.products.per.page";
pub const DEFAULT_PRODUCTS_PER_PAGE: u64 = 12;

pub const PAYPAL_CLIENT_ID: &str = "storefront.paypal.client.id";
pub const PAYPAL_CLIENT_SECRET: &str = "storefront.paypal.client.secret";
pub const PAYPAL_BASE_URL: &str = "storefront.paypal.base.url";

pub const MAIL_SENDER: &str = "storefront.mail.sender";
pub const DEFAULT_MAIL_SENDER: &str = "noreply@localhost";
pub const PUBLIC_URL: &str = "storefront.public.url";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";

pub const ADMIN_USERNAME: &str = "storefront.admin.username";
pub const ADMIN_EMAIL: &str = "storefront.admin.email";
pub const ADMIN_PASSWORD: &str = "storefront.admin.password";

pub const LOGS_PATH: &str = "storefront.logs.path";
pub const LOGS_CONSOLE: &str = "storefront.logs.console";
pub const LOGS_FILE: &str = "storefront.logs.file";
pub const LOGS_LEVEL: &str = "storefront.logs.level";

pub const LOGIN_RATE_LIMIT_ENABLED: &str = "storefront.ratelimit.login.enabled";
pub const LOGIN_RATE_LIMIT_MAX_REQUESTS: &str = "storefront.ratelimit.login.max.requests";
pub const LOGIN_RATE_LIMIT_WINDOW_SECONDS: &str = "storefront.ratelimit.login.window.seconds";

pub const DB_URL: &str = "db.url";
pub const DB_MIGRATE: &str = "storefront.db.migrate";
