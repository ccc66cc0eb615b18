//! Customer accounts as seen by staff

use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use serde::Deserialize;
use storefront_auth::model::CustomerProfile;
use storefront_auth::service::customer::{self, CustomerFilter};

use crate::api::{IdList, PageParams, admin_page_size, audit_staff};
use crate::error::AppError;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

#[derive(Debug, Deserialize)]
pub struct AccountForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: CustomerProfile,
}

#[get("/accounts")]
pub async fn search_page(
    req: HttpRequest,
    data: web::Data<AppState>,
    page: web::Query<PageParams>,
    filter: web::Query<CustomerFilter>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "accounts.read"));

    let page_size = admin_page_size(&data).await?;
    let result = customer::search_page(data.db(), &filter, page.page(), page_size).await?;

    Ok(ApiResult::http_success(result))
}

#[post("/accounts")]
pub async fn create(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<AccountForm>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "accounts.create"));

    let form = form.into_inner();
    let created = customer::create(
        data.db(),
        &form.username,
        &form.email,
        &form.password,
        form.profile,
    )
    .await?;
    audit_staff(&member.username, &format!("added account '{}'", created.username));

    Ok(ApiResult::http_success(created))
}

#[delete("/accounts")]
pub async fn delete(
    req: HttpRequest,
    data: web::Data<AppState>,
    ids: web::Json<IdList>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "accounts.delete"));

    let deleted = customer::delete(data.db(), &ids.ids).await?;
    audit_staff(&member.username, &format!("deleted accounts {:?}", ids.ids));

    Ok(ApiResult::http_success(deleted))
}
