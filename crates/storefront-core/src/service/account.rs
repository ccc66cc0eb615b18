//! Customer account flows: sign-up, sign-in and the account page

use serde::{Deserialize, Serialize};
use storefront_auth::service::{auth, customer};
use storefront_auth::{Customer, CustomerProfile, LoginToken, Registration, TokenKind};
use storefront_common::{AUDIT_TARGET, Rate, StorefrontError};
use storefront_persistence::entity::orders;
use storefront_persistence::sea_orm::*;

use crate::model::{OrderStatus, OrderSummary};
use crate::service::cart::{self, GuestCart};
use crate::service::mail::{MailMessage, Mailer};
use crate::service::order;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(flatten)]
    pub profile: CustomerProfile,
}

/// Where verification links point and who sends them
#[derive(Clone, Debug)]
pub struct MailLinks {
    pub sender: String,
    pub public_url: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyAccount {
    pub customer: Customer,
    pub orders: Vec<OrderSummary>,
}

pub fn verification_mail(links: &MailLinks, registration: &Registration) -> MailMessage {
    let link = format!(
        "{}/verify_account/{}",
        links.public_url.trim_end_matches('/'),
        registration.verify_token
    );

    MailMessage {
        from: links.sender.clone(),
        to: registration.customer.email.clone(),
        subject: "Confirm your account".to_string(),
        body: format!(
            "Hello {},\n\nplease confirm your email address by opening the link below.\n\n{}\n",
            registration.customer.first_name, link
        ),
    }
}

/// Create the account and mail the verification link. A mail that cannot
/// be delivered does not undo the registration.
pub async fn register(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    links: &MailLinks,
    form: RegisterForm,
) -> anyhow::Result<Customer> {
    let registration = customer::register(
        db,
        &form.username,
        &form.email,
        &form.password,
        &form.confirm_password,
        form.profile,
    )
    .await?;

    if let Err(e) = mailer.send(verification_mail(links, &registration)).await {
        tracing::error!(
            username = %registration.customer.username,
            error = %e,
            "Failed to send verification mail"
        );
    }

    tracing::info!(
        target: AUDIT_TARGET,
        user = %registration.customer.username,
        is_staff = false,
        "Customer {} registered",
        registration.customer.username
    );

    Ok(registration.customer)
}

/// Sign a customer in, moving the guest cart into their account cart.
pub async fn login(
    db: &DatabaseConnection,
    secret_key: &str,
    expire_seconds: i64,
    username: &str,
    password: &str,
    guest: &GuestCart,
) -> anyhow::Result<LoginToken> {
    let user = customer::authenticate(db, username, password).await?;

    cart::merge_guest_cart(db, user.id, guest).await?;

    let access_token =
        auth::encode_jwt_token(&user.username, TokenKind::Customer, secret_key, expire_seconds)
            .map_err(|e| StorefrontError::InternalError(e.to_string()))?;

    tracing::info!(
        target: AUDIT_TARGET,
        user = %user.username,
        is_staff = false,
        "Customer {} logged in",
        user.username
    );

    Ok(LoginToken {
        access_token,
        token_ttl: expire_seconds,
        username: user.username,
    })
}

pub async fn logout(token: &str, username: &str) {
    auth::invalidate_token(token);

    tracing::info!(
        target: AUDIT_TARGET,
        user = %username,
        is_staff = false,
        "Customer {} logged out",
        username
    );
}

/// Profile and placed orders, newest first.
pub async fn my_account(
    db: &DatabaseConnection,
    username: &str,
    vat: Rate,
) -> anyhow::Result<MyAccount> {
    let user = customer::get_by_username(db, username).await?;

    let placed = orders::Entity::find()
        .filter(orders::Column::UserId.eq(user.id))
        .filter(orders::Column::Status.gte(OrderStatus::Paid.code()))
        .filter(orders::Column::DeletedAt.is_null())
        .order_by_desc(orders::Column::OrderedAt)
        .order_by_desc(orders::Column::Id)
        .all(db)
        .await?;

    let mut summaries = Vec::with_capacity(placed.len());
    for o in placed {
        summaries.push(order::summarize(db, o, user.username.clone(), vat).await?);
    }

    Ok(MyAccount {
        customer: user.into(),
        orders: summaries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            customer: Customer {
                id: 1,
                username: "jane".to_string(),
                email: "jane@example.com".to_string(),
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                address: String::new(),
                country: String::new(),
                gender: String::new(),
                birthday: None,
                email_confirmed: false,
                last_login: None,
                created_at: chrono::Utc::now(),
            },
            verify_token: "abc123".to_string(),
        }
    }

    #[test]
    fn test_verification_mail() {
        let links = MailLinks {
            sender: "shop@example.com".to_string(),
            public_url: "https://shop.example.com/".to_string(),
        };

        let mail = verification_mail(&links, &registration());
        assert_eq!(mail.from, "shop@example.com");
        assert_eq!(mail.to, "jane@example.com");
        assert!(mail.body.contains("Hello Jane,"));
        assert!(mail.body.contains("https://shop.example.com/verify_account/abc123"));
    }

    #[test]
    fn test_register_form_flattens_profile() {
        let form: RegisterForm = serde_json::from_str(
            r#"{
                "username": "jane",
                "email": "jane@example.com",
                "password": "secret1",
                "confirmPassword": "secret1",
                "firstName": "Jane",
                "country": "FR",
                "birthday": "1990-04-12"
            }"#,
        )
        .unwrap();

        assert_eq!(form.profile.first_name, "Jane");
        assert_eq!(form.profile.country, "FR");
        assert_eq!(
            form.profile.birthday,
            chrono::NaiveDate::from_ymd_opt(1990, 4, 12)
        );
        assert!(form.profile.last_name.is_empty());
    }
}
