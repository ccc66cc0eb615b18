use actix_web::{HttpResponse, get, web};
use storefront_core::service::catalog::{self, ProductQuery};

use crate::error::AppError;
use crate::model::{ApiResult, AppState};

pub async fn index(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let storefront = catalog::storefront(data.db()).await?;
    Ok(ApiResult::http_success(storefront))
}

#[get("/products")]
pub async fn list_products(
    data: web::Data<AppState>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
    let listing = catalog::list_products(
        data.db(),
        &query,
        data.configuration.products_per_page(),
    )
    .await?;

    Ok(ApiResult::http_success(listing))
}

#[get("/products/{id}")]
pub async fn get_product(
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let product = catalog::get_product(data.db(), path.into_inner()).await?;
    Ok(ApiResult::http_success(product))
}
