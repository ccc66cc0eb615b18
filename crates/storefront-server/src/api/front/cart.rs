//! Cart endpoints. Signed-in customers use their cart order, guests the
//! `products` cookie.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::Deserialize;
use storefront_core::service::cart::{self, encode_guest_cart};
use storefront_core::service::settings;

use crate::api::{clear_guest_cart, current_customer, customer_name, guest_cart, guest_cart_cookie};
use crate::error::AppError;
use crate::model::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItem {
    pub product_id: i64,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[get("/cart")]
pub async fn view(req: HttpRequest, data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let vat = settings::get_settings(data.db()).await?.vat_rate();

    if customer_name(&req)?.is_some() {
        let user = current_customer(&req, &data).await?;
        let view = cart::view_cart(data.db(), user.id, vat).await?;
        return Ok(ApiResult::http_success(view));
    }

    let (guest, corrupt) = guest_cart(&req);
    let view = cart::guest_view(data.db(), &guest, vat).await?;

    let mut builder = HttpResponse::Ok();
    if corrupt {
        clear_guest_cart(&mut builder);
    }
    Ok(builder.json(ApiResult::success(view)))
}

#[post("/cart/add")]
pub async fn add(
    req: HttpRequest,
    data: web::Data<AppState>,
    item: web::Json<AddItem>,
) -> Result<HttpResponse, AppError> {
    let vat = settings::get_settings(data.db()).await?.vat_rate();

    if customer_name(&req)?.is_some() {
        let user = current_customer(&req, &data).await?;
        let update =
            cart::add_to_cart(data.db(), user.id, item.product_id, item.quantity, vat).await?;
        return Ok(ApiResult::http_success(update));
    }

    let (mut guest, _) = guest_cart(&req);
    let update = cart::guest_add(data.db(), &mut guest, item.product_id, item.quantity, vat).await?;

    Ok(HttpResponse::Ok()
        .cookie(guest_cart_cookie(encode_guest_cart(&guest)))
        .json(ApiResult::success(update)))
}

#[post("/cart/remove")]
pub async fn remove(
    req: HttpRequest,
    data: web::Data<AppState>,
    item: web::Json<RemoveItem>,
) -> Result<HttpResponse, AppError> {
    let vat = settings::get_settings(data.db()).await?.vat_rate();

    if customer_name(&req)?.is_some() {
        let user = current_customer(&req, &data).await?;
        let update =
            cart::remove_from_cart(data.db(), user.id, item.product_id, item.quantity, vat).await?;
        return Ok(ApiResult::http_success(update));
    }

    let (mut guest, corrupt) = guest_cart(&req);
    let removed =
        cart::guest_remove(data.db(), &mut guest, item.product_id, item.quantity, vat).await;
    let update = match removed {
        Ok(update) => update,
        Err(e) if corrupt => {
            // Drop the bad cookie even though the removal failed
            let err = AppError::from(e);
            let mut response = actix_web::ResponseError::error_response(&err);
            let mut cookie = guest_cart_cookie(String::new());
            cookie.make_removal();
            response.add_cookie(&cookie).map_err(anyhow::Error::from)?;
            return Ok(response);
        }
        Err(e) => return Err(e.into()),
    };

    Ok(HttpResponse::Ok()
        .cookie(guest_cart_cookie(encode_guest_cart(&guest)))
        .json(ApiResult::success(update)))
}
