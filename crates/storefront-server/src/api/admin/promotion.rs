use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use chrono::Utc;
use storefront_core::service::promotion::{self, PromotionForm, PromotionSearch};

use crate::api::{IdList, PageParams, admin_page_size};
use crate::error::AppError;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

#[get("/promotions")]
pub async fn search_page(
    req: HttpRequest,
    data: web::Data<AppState>,
    page: web::Query<PageParams>,
    search: web::Query<PromotionSearch>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "promotions.read"));

    let page_size = admin_page_size(&data).await?;
    let today = Utc::now().date_naive();
    let result = promotion::search_page(data.db(), &search, page.page(), page_size, today).await?;

    Ok(ApiResult::http_success(result))
}

#[post("/promotions")]
pub async fn create(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<PromotionForm>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "promotions.create"));

    let created = promotion::create(data.db(), &form, &member.username).await?;
    Ok(ApiResult::http_success(created))
}

#[delete("/promotions")]
pub async fn delete(
    req: HttpRequest,
    data: web::Data<AppState>,
    ids: web::Json<IdList>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "promotions.delete"));

    let deleted = promotion::delete(data.db(), &ids.ids, &member.username).await?;
    Ok(ApiResult::http_success(deleted))
}
