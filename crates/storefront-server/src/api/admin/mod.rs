use actix_web::{Scope, web};

use crate::middleware::rate_limit::RateLimiter;

pub mod account;
pub mod audit;
pub mod auth;
pub mod autocomplete;
pub mod category;
pub mod order;
pub mod product;
pub mod promotion;
pub mod report;
pub mod role;
pub mod settings;
pub mod staff;
pub mod target_group;

pub fn routes(login_limiter: RateLimiter) -> Scope {
    web::scope("/admin")
        .service(
            web::resource("/login")
                .wrap(login_limiter)
                .route(web::post().to(auth::login)),
        )
        .service(auth::logout)
        // products
        .service(product::search_page)
        .service(product::import)
        .service(product::create)
        .service(product::update)
        .service(product::upload_image)
        .service(product::delete)
        // accounts
        .service(account::search_page)
        .service(account::create)
        .service(account::delete)
        // staff
        .service(staff::search_page)
        .service(staff::create)
        .service(staff::update)
        .service(staff::delete)
        // categories
        .service(category::list)
        .service(category::create)
        .service(category::delete)
        // roles
        .service(role::search_page)
        .service(role::names)
        .service(role::permissions)
        .service(role::create)
        .service(role::update)
        .service(role::delete)
        // orders
        .service(order::search_page)
        .service(order::create)
        .service(order::update)
        .service(order::delete)
        // reports
        .service(report::export)
        .service(report::view)
        // audit trail
        .service(audit::grouped)
        .service(audit::list)
        // settings
        .service(settings::get_other)
        .service(settings::update_other)
        .service(settings::get_email)
        .service(settings::update_email)
        // target groups
        .service(target_group::search_page)
        .service(target_group::preview)
        .service(target_group::create)
        .service(target_group::view)
        .service(target_group::delete)
        // promotions
        .service(promotion::search_page)
        .service(promotion::create)
        .service(promotion::delete)
        // autocomplete
        .service(autocomplete::permissions)
        .service(autocomplete::accounts)
        .service(autocomplete::products)
}
