use actix_web::{HttpRequest, HttpResponse, get, post, web};
use storefront_auth::service::customer;
use storefront_core::service::account::{self, RegisterForm};
use storefront_core::service::cart::GUEST_CART_COOKIE;
use storefront_core::service::settings;

use crate::api::{Credentials, clear_guest_cart, current_customer, guest_cart};
use crate::error::AppError;
use crate::middleware::auth::extract_token;
use crate::model::{ApiResult, AppState};

#[post("/register")]
pub async fn register(
    data: web::Data<AppState>,
    form: web::Json<RegisterForm>,
) -> Result<HttpResponse, AppError> {
    let customer = account::register(
        data.db(),
        data.mailer.as_ref(),
        &data.configuration.mail_links(),
        form.into_inner(),
    )
    .await?;

    Ok(ApiResult::http_success(customer))
}

#[get("/verify_account/{token}")]
pub async fn verify_account(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let customer = customer::verify_account(data.db(), &path).await?;
    Ok(ApiResult::http_success(customer))
}

/// Customer sign-in. The guest cart moves into the account and its cookie
/// is dropped.
pub async fn login(
    req: HttpRequest,
    data: web::Data<AppState>,
    credentials: web::Json<Credentials>,
) -> Result<HttpResponse, AppError> {
    let (guest, _) = guest_cart(&req);

    let token = account::login(
        data.db(),
        &data.configuration.token_secret_key(),
        data.configuration.customer_token_expire_seconds(),
        &credentials.username,
        &credentials.password,
        &guest,
    )
    .await?;

    let mut builder = HttpResponse::Ok();
    if req.cookie(GUEST_CART_COOKIE).is_some() {
        clear_guest_cart(&mut builder);
    }
    Ok(builder.json(ApiResult::success(token)))
}

#[post("/logout")]
pub async fn logout(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = current_customer(&req, &data).await?;

    if let Some(token) = extract_token(req.headers(), req.uri().query()) {
        account::logout(&token, &user.username).await;
    }

    Ok(ApiResult::http_success(true))
}

#[get("/my_account")]
pub async fn my_account(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = current_customer(&req, &data).await?;
    let vat = settings::get_settings(data.db()).await?.vat_rate();

    let account = account::my_account(data.db(), &user.username, vat).await?;
    Ok(ApiResult::http_success(account))
}
