//! Roles and the permission catalogue

use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use serde::Deserialize;
use storefront_auth::service::{permission, role};

use crate::api::{PageParams, admin_page_size, audit_staff};
use crate::error::AppError;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionsForm {
    pub permissions: Vec<String>,
}

#[get("/roles")]
pub async fn search_page(
    req: HttpRequest,
    data: web::Data<AppState>,
    page: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "roles.read"));

    let page_size = admin_page_size(&data).await?;
    let result = role::search_page(data.db(), page.page(), page_size).await?;

    Ok(ApiResult::http_success(result))
}

/// Names of every live role, for the staff form
#[get("/roles/names")]
pub async fn names(req: HttpRequest, data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "staff.read"));

    let names = role::find_all_names(data.db()).await?;
    Ok(ApiResult::http_success(names))
}

#[get("/permissions")]
pub async fn permissions(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "roles.read"));

    let all = permission::find_all(data.db()).await?;
    Ok(ApiResult::http_success(all))
}

#[post("/roles")]
pub async fn create(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<RoleForm>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "roles.create"));

    let created = role::create(data.db(), &form.name, &form.permissions).await?;
    audit_staff(&member.username, &format!("added role '{}'", created.name));

    Ok(ApiResult::http_success(created))
}

#[put("/roles/{id}")]
pub async fn update(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
    form: web::Json<PermissionsForm>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "roles.update"));

    let updated = role::update_permissions(data.db(), path.into_inner(), &form.permissions).await?;
    audit_staff(
        &member.username,
        &format!("changed the permissions of role '{}'", updated.name),
    );

    Ok(ApiResult::http_success(updated))
}

#[delete("/roles/{id}")]
pub async fn delete(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "roles.delete"));

    let id = path.into_inner();
    role::delete(data.db(), id).await?;
    audit_staff(&member.username, &format!("deleted role #{}", id));

    Ok(ApiResult::http_success(true))
}
