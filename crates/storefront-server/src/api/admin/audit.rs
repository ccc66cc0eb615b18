use actix_web::{HttpRequest, HttpResponse, get, web};
use serde::Deserialize;
use storefront_core::service::audit::{self, LogSearch};
use storefront_core::service::report::TimeGroup;

use crate::api::{PageParams, admin_page_size};
use crate::error::AppError;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GroupParams {
    pub trunc: Option<TimeGroup>,
}

#[get("/audit")]
pub async fn list(
    req: HttpRequest,
    data: web::Data<AppState>,
    page: web::Query<PageParams>,
    search: web::Query<LogSearch>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "audit.read"));

    let page_size = admin_page_size(&data).await?;
    let result = audit::list_logs(data.db(), &search, page.page(), page_size).await?;

    Ok(ApiResult::http_success(result))
}

/// Entry counts per day, week, month or year
#[get("/audit/grouped")]
pub async fn grouped(
    req: HttpRequest,
    data: web::Data<AppState>,
    page: web::Query<PageParams>,
    group: web::Query<GroupParams>,
    search: web::Query<LogSearch>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "audit.read"));

    let page_size = admin_page_size(&data).await?;
    let result = audit::grouped_logs(
        data.db(),
        &search,
        group.trunc.unwrap_or_default(),
        page.page(),
        page_size,
    )
    .await?;

    Ok(ApiResult::http_success(result))
}
