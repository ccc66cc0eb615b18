use actix_web::{HttpRequest, HttpResponse, post, web};
use serde::Deserialize;
use storefront_core::service::checkout::{self as checkout_service, CaptureRequest};

use crate::api::current_customer;
use crate::error::AppError;
use crate::model::{ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutParams {
    pub vouchers: Vec<i64>,
}

#[post("/checkout")]
pub async fn checkout(
    req: HttpRequest,
    data: web::Data<AppState>,
    params: web::Json<CheckoutParams>,
) -> Result<HttpResponse, AppError> {
    let user = current_customer(&req, &data).await?;
    let policy = data.pricing_policy().await?;

    let summary = checkout_service::checkout(data.db(), user.id, &params.vouchers, policy).await?;
    Ok(ApiResult::http_success(summary))
}

#[post("/capture_order")]
pub async fn capture_order(
    req: HttpRequest,
    data: web::Data<AppState>,
    request: web::Json<CaptureRequest>,
) -> Result<HttpResponse, AppError> {
    let user = current_customer(&req, &data).await?;
    let policy = data.pricing_policy().await?;

    let receipt = checkout_service::capture_order(
        data.db(),
        data.payment_gateway.as_ref(),
        data.mailer.as_ref(),
        &user,
        &request,
        policy,
    )
    .await?;

    Ok(ApiResult::http_success(receipt))
}
