//! Staff members

use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use serde::Deserialize;
use storefront_auth::service::staff::{self, StaffForm};

use crate::api::{PageParams, admin_page_size, audit_staff};
use crate::error::AppError;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StaffSearch {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffBody {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Only read when adding a member
    #[serde(default)]
    pub password: String,
}

impl StaffBody {
    fn into_form(self) -> (StaffForm, String) {
        (
            StaffForm {
                username: self.username,
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                roles: self.roles,
            },
            self.password,
        )
    }
}

#[get("/staff")]
pub async fn search_page(
    req: HttpRequest,
    data: web::Data<AppState>,
    page: web::Query<PageParams>,
    search: web::Query<StaffSearch>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "staff.read"));

    let page_size = admin_page_size(&data).await?;
    let result = staff::search_page(
        data.db(),
        &search.username,
        &search.email,
        page.page(),
        page_size,
    )
    .await?;

    Ok(ApiResult::http_success(result))
}

#[post("/staff")]
pub async fn create(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<StaffBody>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "staff.create"));

    let (form, password) = body.into_inner().into_form();
    let created = staff::create(data.db(), form, &password).await?;
    audit_staff(&member.username, &format!("added staff member '{}'", created.username));

    Ok(ApiResult::http_success(created))
}

#[put("/staff/{id}")]
pub async fn update(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<StaffBody>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "staff.update"));

    let (form, _) = body.into_inner().into_form();
    let updated = staff::update(data.db(), path.into_inner(), form).await?;
    audit_staff(&member.username, &format!("edited staff member '{}'", updated.username));

    Ok(ApiResult::http_success(updated))
}

#[delete("/staff/{id}")]
pub async fn delete(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "staff.delete"));

    let id = path.into_inner();
    staff::delete(data.db(), id).await?;
    audit_staff(&member.username, &format!("deleted staff member #{}", id));

    Ok(ApiResult::http_success(true))
}
