//! Target groups. Creation and deletion are audited by the service.

use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use serde::Deserialize;
use storefront_auth::model::Customer;
use storefront_core::service::target_group::{self, TargetGroupFilters, TargetGroupSearch};

use crate::api::{IdList, PageParams, admin_page_size};
use crate::error::AppError;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

#[derive(Debug, Deserialize)]
pub struct TargetGroupForm {
    pub name: String,
    #[serde(default)]
    pub filters: TargetGroupFilters,
}

#[get("/target_groups")]
pub async fn search_page(
    req: HttpRequest,
    data: web::Data<AppState>,
    page: web::Query<PageParams>,
    search: web::Query<TargetGroupSearch>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "targetgroups.read"));

    let page_size = admin_page_size(&data).await?;
    let result = target_group::search_page(data.db(), &search, page.page(), page_size).await?;

    Ok(ApiResult::http_success(result))
}

/// Customers the filters would select, without saving anything
#[post("/target_groups/preview")]
pub async fn preview(
    req: HttpRequest,
    data: web::Data<AppState>,
    filters: web::Json<TargetGroupFilters>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "targetgroups.read"));

    let customers: Vec<Customer> = target_group::preview(data.db(), &filters)
        .await?
        .into_iter()
        .map(Customer::from)
        .collect();

    Ok(ApiResult::http_success(customers))
}

#[post("/target_groups")]
pub async fn create(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<TargetGroupForm>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "targetgroups.create"));

    let group = target_group::create(data.db(), &form.name, &form.filters, &member.username).await?;
    Ok(ApiResult::http_success(group))
}

#[get("/target_groups/{id}")]
pub async fn view(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "targetgroups.read"));

    let group = target_group::view(data.db(), path.into_inner()).await?;
    Ok(ApiResult::http_success(group))
}

#[delete("/target_groups")]
pub async fn delete(
    req: HttpRequest,
    data: web::Data<AppState>,
    ids: web::Json<IdList>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "targetgroups.delete"));

    let deleted = target_group::delete(data.db(), &ids.ids, &member.username).await?;
    Ok(ApiResult::http_success(deleted))
}
