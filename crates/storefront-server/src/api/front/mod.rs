use actix_web::{Scope, web};

use crate::middleware::rate_limit::RateLimiter;

pub mod account;
pub mod cart;
pub mod catalog;
pub mod checkout;

pub fn routes(login_limiter: RateLimiter) -> Scope {
    web::scope("")
        .service(
            web::resource(["", "/"]).route(web::get().to(catalog::index)),
        )
        .service(catalog::list_products)
        .service(catalog::get_product)
        .service(account::register)
        .service(account::verify_account)
        .service(
            web::resource("/login")
                .wrap(login_limiter)
                .route(web::post().to(account::login)),
        )
        .service(account::logout)
        .service(account::my_account)
        .service(cart::view)
        .service(cart::add)
        .service(cart::remove)
        .service(checkout::checkout)
        .service(checkout::capture_order)
}
