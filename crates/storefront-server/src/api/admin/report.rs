use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpRequest, HttpResponse, get, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use storefront_core::service::report::{self, DateRange, TimeGroup};
use storefront_core::service::settings;

use crate::api::PageParams;
use crate::error::AppError;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportParams {
    pub time_group: Option<TimeGroup>,
    pub ord_after: Option<NaiveDate>,
    pub ord_before: Option<NaiveDate>,
}

impl ReportParams {
    fn group(&self) -> TimeGroup {
        self.time_group.unwrap_or_default()
    }

    fn range(&self) -> DateRange {
        DateRange {
            after: self.ord_after,
            before: self.ord_before,
        }
    }
}

#[get("/report")]
pub async fn view(
    req: HttpRequest,
    data: web::Data<AppState>,
    page: web::Query<PageParams>,
    params: web::Query<ReportParams>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "report.read"));

    let shop = settings::get_settings(data.db()).await?;
    let result = report::orders_report(
        data.db(),
        params.group(),
        &params.range(),
        page.page(),
        shop.elements_per_page,
        shop.vat_rate(),
        &member.username,
    )
    .await?;

    Ok(ApiResult::http_success(result))
}

#[get("/report/export")]
pub async fn export(
    req: HttpRequest,
    data: web::Data<AppState>,
    params: web::Query<ReportParams>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "report.export"));

    let vat = settings::get_settings(data.db()).await?.vat_rate();
    let csv = report::export_report(
        data.db(),
        params.group(),
        &params.range(),
        vat,
        &member.username,
    )
    .await?;

    let file_name = format!(
        "report-{}-{}.csv",
        params.group().as_str(),
        Utc::now().format("%Y%m%d%H%M%S")
    );

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file_name)],
        })
        .body(csv))
}
