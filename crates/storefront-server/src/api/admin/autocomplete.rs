//! Suggestions for the back-office search boxes

use actix_web::{HttpRequest, HttpResponse, get, web};
use storefront_auth::service::{customer, permission};
use storefront_core::service::catalog::{self, AUTOCOMPLETE_LIMIT};

use crate::api::TermParam;
use crate::error::AppError;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

#[get("/autocomplete/permissions")]
pub async fn permissions(
    req: HttpRequest,
    data: web::Data<AppState>,
    params: web::Query<TermParam>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "roles.read"));

    let names = permission::search(data.db(), &params.term, AUTOCOMPLETE_LIMIT).await?;
    Ok(ApiResult::http_success(names))
}

#[get("/autocomplete/accounts")]
pub async fn accounts(
    req: HttpRequest,
    data: web::Data<AppState>,
    params: web::Query<TermParam>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "accounts.read"));

    let names = customer::search(data.db(), &params.term, AUTOCOMPLETE_LIMIT).await?;
    Ok(ApiResult::http_success(names))
}

#[get("/autocomplete/products")]
pub async fn products(
    req: HttpRequest,
    data: web::Data<AppState>,
    params: web::Query<TermParam>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "products.read"));

    let names = catalog::autocomplete(data.db(), &params.term).await?;
    Ok(ApiResult::http_success(names))
}
