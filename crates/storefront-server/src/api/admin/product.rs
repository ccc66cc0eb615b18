//! Back-office product management

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use futures::StreamExt;
use storefront_common::StorefrontError;
use storefront_core::service::catalog::{self, AdminProductFilter, ProductForm};
use storefront_core::service::import as import_service;

use crate::api::{IdList, PageParams, admin_page_size, audit_staff};
use crate::error::AppError;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

/// Form field holding the uploaded file
const FILE_FIELD: &str = "file";

struct Upload {
    file_name: String,
    content: Vec<u8>,
}

/// First `file` part of a multipart body
async fn read_upload(mut payload: Multipart) -> Result<Upload, AppError> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| StorefrontError::illegal(e.to_string()))?;

        let Some(disposition) = field.content_disposition() else {
            continue;
        };
        if disposition.get_name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = disposition.get_filename().unwrap_or_default().to_string();

        let mut content = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| StorefrontError::illegal(e.to_string()))?;
            content.extend_from_slice(&chunk);
        }

        return Ok(Upload { file_name, content });
    }

    Err(StorefrontError::illegal("no file uploaded").into())
}

#[get("/products")]
pub async fn search_page(
    req: HttpRequest,
    data: web::Data<AppState>,
    page: web::Query<PageParams>,
    filter: web::Query<AdminProductFilter>,
) -> Result<HttpResponse, AppError> {
    secured!(Secured::new(&req, &data, "products.read"));

    let page_size = admin_page_size(&data).await?;
    let result = catalog::admin_list_products(data.db(), &filter, page.page(), page_size).await?;

    Ok(ApiResult::http_success(result))
}

#[post("/products")]
pub async fn create(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<ProductForm>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "products.create"));

    let product = catalog::create_product(data.db(), form.into_inner()).await?;
    audit_staff(&member.username, &format!("added product '{}'", product.name));

    Ok(ApiResult::http_success(product))
}

#[put("/products/{id}")]
pub async fn update(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
    form: web::Json<ProductForm>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "products.update"));

    let product = catalog::update_product(data.db(), path.into_inner(), form.into_inner()).await?;
    audit_staff(&member.username, &format!("edited product #{}", product.id));

    Ok(ApiResult::http_success(product))
}

#[delete("/products")]
pub async fn delete(
    req: HttpRequest,
    data: web::Data<AppState>,
    ids: web::Json<IdList>,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "products.delete"));

    let deleted = catalog::delete_products(data.db(), &ids.ids).await?;
    audit_staff(&member.username, &format!("deleted products {:?}", ids.ids));

    Ok(ApiResult::http_success(deleted))
}

#[post("/products/{id}/image")]
pub async fn upload_image(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "products.update"));

    let upload = read_upload(payload).await?;
    let product = catalog::save_product_image(
        data.db(),
        &data.configuration.media_dir(),
        path.into_inner(),
        &upload.file_name,
        &upload.content,
    )
    .await?;
    audit_staff(&member.username, &format!("uploaded an image for product #{}", product.id));

    Ok(ApiResult::http_success(product))
}

#[post("/products/import")]
pub async fn import(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::new(&req, &data, "products.import"));

    let upload = read_upload(payload).await?;
    if upload.content.is_empty() {
        return Err(StorefrontError::illegal("uploaded file is empty").into());
    }

    let report = import_service::import_products(data.db(), upload.content.as_slice()).await?;
    audit_staff(
        &member.username,
        &format!(
            "imported products from '{}': {} processed, {} ignored",
            upload.file_name, report.processed, report.ignored
        ),
    );

    Ok(ApiResult::http_success(report))
}
