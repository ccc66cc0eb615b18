//! Orders as managed by staff. The order service records its own audit
//! events.

use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use storefront_core::service::order::{self, OrderFilter, OrderForm};
use storefront_core::service::settings;

use crate::api::{IdList, PageParams};
use crate::error::AppError;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

#[get("/orders")]
pub async fn search_page(
    req: HttpRequest,
    data: web::Data<AppState>,
    page: web::Query<PageParams>,
    filter: web::Query<OrderFilter>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "orders.read"));

    let shop = settings::get_settings(data.db()).await?;
    let result = order::search_page(
        data.db(),
        &filter,
        page.page(),
        shop.elements_per_page,
        shop.vat_rate(),
    )
    .await?;

    Ok(ApiResult::http_success(result))
}

#[post("/orders")]
pub async fn create(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<OrderForm>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "orders.create"));

    let vat = settings::get_settings(data.db()).await?.vat_rate();
    let created = order::create(data.db(), &form, &member.username, vat).await?;

    Ok(ApiResult::http_success(created))
}

#[put("/orders/{id}")]
pub async fn update(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
    form: web::Json<OrderForm>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "orders.update"));

    let vat = settings::get_settings(data.db()).await?.vat_rate();
    let updated = order::update(data.db(), path.into_inner(), &form, &member.username, vat).await?;

    Ok(ApiResult::http_success(updated))
}

#[delete("/orders")]
pub async fn delete(
    req: HttpRequest,
    data: web::Data<AppState>,
    ids: web::Json<IdList>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "orders.delete"));

    let deleted = order::delete(data.db(), &ids.ids, &member.username).await?;
    Ok(ApiResult::http_success(deleted))
}
