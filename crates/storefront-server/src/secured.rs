// Staff authorization for back-office routes

use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, web};
use storefront_auth::model::AuthContext;
use storefront_auth::service::{permission, staff};
use storefront_common::StorefrontError;
use storefront_core::service::settings;
use storefront_persistence::entity::staff as staff_entity;

use crate::error::AppError;
use crate::model::AppState;
use crate::model::response::ErrorResult;

/// A back-office request and the permission it needs
#[derive(Debug, Clone)]
pub struct Secured<'a> {
    pub req: &'a HttpRequest,          // HTTP request reference
    pub data: &'a web::Data<AppState>, // Application state
    pub permission: &'a str,           // Required permission name, empty for any staff member
}

impl<'a> Secured<'a> {
    pub fn new(req: &'a HttpRequest, data: &'a web::Data<AppState>, permission: &'a str) -> Self {
        Secured {
            req,
            data,
            permission,
        }
    }

    /// Any authenticated staff member, whatever their roles
    pub fn staff(req: &'a HttpRequest, data: &'a web::Data<AppState>) -> Self {
        Self::new(req, data, "")
    }

    /// Resolve the staff member behind the request, or the response that
    /// refuses it.
    ///
    /// A successful check also refreshes the member's activity timestamp,
    /// which keeps the back-office session alive.
    pub async fn authorize(&self) -> Result<staff_entity::Model, HttpResponse> {
        let path = self.req.path();

        let context = match self.req.extensions().get::<AuthContext>().cloned() {
            Some(context) => context,
            None => return Err(ErrorResult::unauthorized("no auth context", path)),
        };

        if !context.token_provided {
            return Err(ErrorResult::unauthorized("no token provided", path));
        }
        if context.jwt_error.is_some() {
            return Err(ErrorResult::unauthorized(&context.jwt_error_string(), path));
        }

        let Some(username) = context.staff() else {
            return Err(ErrorResult::forbidden("staff token required", path));
        };

        let db = self.data.db();

        let backoffice_expire = match settings::get_settings(db).await {
            Ok(settings) => settings.backoffice_expire,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load shop settings");
                return Err(AppError::from(e).error_response());
            }
        };

        let member = match staff::touch_activity(db, username, backoffice_expire).await {
            Ok(member) => member,
            Err(e) => {
                if let Some(StorefrontError::AuthError(message)) =
                    e.downcast_ref::<StorefrontError>()
                {
                    tracing::debug!(
                        username = %username,
                        reason = %message,
                        "Staff session refused"
                    );
                    return Err(ErrorResult::unauthorized(message, path));
                }
                return Err(AppError::from(e).error_response());
            }
        };

        if self.permission.is_empty() {
            return Ok(member);
        }

        match permission::find_by_staff(db, member.id).await {
            Ok(granted) if granted.allows(self.permission) => Ok(member),
            Ok(_) => {
                tracing::warn!(
                    username = %member.username,
                    permission = %self.permission,
                    "Staff permission denied"
                );
                Err(ErrorResult::forbidden("authorization failed!", path))
            }
            Err(e) => Err(AppError::from(e).error_response()),
        }
    }
}

/// Authorize a back-office request, returning early from the handler with
/// the refusal response.
#[macro_export]
macro_rules! secured {
    ($secured: expr) => {
        match $secured.authorize().await {
            Ok(member) => member,
            Err(response) => return Ok(response),
        }
    };
}
