use actix_web::{HttpRequest, HttpResponse, get, put, web};
use storefront_core::service::settings::{self, EmailKind, EmailTemplate, ShopSettings};

use crate::api::audit_staff;
use crate::error::AppError;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

#[get("/settings")]
pub async fn get_other(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "settings.read"));

    let shop = settings::get_settings(data.db()).await?;
    Ok(ApiResult::http_success(shop))
}

#[put("/settings")]
pub async fn update_other(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<ShopSettings>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "settings.update"));

    let shop = settings::update_other_settings(data.db(), form.into_inner()).await?;
    audit_staff(&member.username, "updated the shop settings");

    Ok(ApiResult::http_success(shop))
}

#[get("/settings/email/{kind}")]
pub async fn get_email(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "settings.read"));

    let kind: EmailKind = path.parse()?;
    let template = settings::get_email_template(data.db(), kind).await?;

    Ok(ApiResult::http_success(template))
}

#[put("/settings/email/{kind}")]
pub async fn update_email(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Json<EmailTemplate>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "settings.update"));

    let kind: EmailKind = path.parse()?;
    let template = settings::update_email_template(data.db(), kind, form.into_inner()).await?;
    audit_staff(
        &member.username,
        &format!("updated the {} email template", path.as_str()),
    );

    Ok(ApiResult::http_success(template))
}
