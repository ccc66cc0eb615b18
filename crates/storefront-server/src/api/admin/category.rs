use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use serde::Deserialize;
use storefront_core::service::catalog;

use crate::api::{IdList, audit_staff};
use crate::error::AppError;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryForm {
    pub name: String,
    #[serde(default)]
    pub image_css: String,
}

#[get("/categories")]
pub async fn list(req: HttpRequest, data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "products.read"));

    let categories = catalog::list_categories(data.db()).await?;
    Ok(ApiResult::http_success(categories))
}

#[post("/categories")]
pub async fn create(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<CategoryForm>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "categories.create"));

    let category = catalog::create_category(data.db(), &form.name, &form.image_css).await?;
    audit_staff(&member.username, &format!("added category '{}'", category.name));

    Ok(ApiResult::http_success(category))
}

#[delete("/categories")]
pub async fn delete(
    req: HttpRequest,
    data: web::Data<AppState>,
    ids: web::Json<IdList>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "categories.delete"));

    let deleted = catalog::delete_categories(data.db(), &ids.ids).await?;
    audit_staff(&member.username, &format!("deleted categories {:?}", ids.ids));

    Ok(ApiResult::http_success(deleted))
}
