//! Customer account service

use chrono::Utc;
use storefront_common::StorefrontError;
use storefront_common::utils::is_email;
use storefront_persistence::Page;
use storefront_persistence::entity::users;
use storefront_persistence::query::{count, ilike, lower_eq};
use storefront_persistence::sea_orm::sea_query::Expr;
use storefront_persistence::sea_orm::*;

use crate::model::{
    BCRYPT_COST, Customer, CustomerProfile, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
    Registration, USER_NOT_FOUND_MESSAGE,
};

pub(crate) fn validate_password(password: &str) -> anyhow::Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH || password.len() > MAX_PASSWORD_LENGTH {
        return Err(StorefrontError::illegal(format!(
            "password length must be between {} and {}",
            MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH
        ))
        .into());
    }
    Ok(())
}

pub(crate) fn hash_password(password: &str) -> anyhow::Result<String> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

fn validate_identity(username: &str, email: &str) -> anyhow::Result<()> {
    if username.trim().is_empty() {
        return Err(StorefrontError::illegal("username must not be empty").into());
    }
    if !is_email(email) {
        return Err(StorefrontError::illegal(format!("'{}' is not a valid email", email)).into());
    }
    Ok(())
}

pub async fn find_by_username(
    db: &impl ConnectionTrait,
    username: &str,
) -> anyhow::Result<Option<users::Model>> {
    let user = users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .filter(users::Column::DeletedAt.is_null())
        .one(db)
        .await?;

    Ok(user)
}

pub async fn get_by_username(
    db: &impl ConnectionTrait,
    username: &str,
) -> anyhow::Result<users::Model> {
    find_by_username(db, username)
        .await?
        .ok_or_else(|| StorefrontError::not_found(format!("user '{}'", username)).into())
}

pub async fn find_by_id(
    db: &impl ConnectionTrait,
    id: i64,
) -> anyhow::Result<Option<users::Model>> {
    let user = users::Entity::find_by_id(id)
        .filter(users::Column::DeletedAt.is_null())
        .one(db)
        .await?;

    Ok(user)
}

/// Register a customer. The account stays locked until the email is verified.
pub async fn register(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
    profile: CustomerProfile,
) -> anyhow::Result<Registration> {
    validate_identity(username, email)?;
    if password != confirm_password {
        return Err(StorefrontError::illegal("passwords do not match").into());
    }
    validate_password(password)?;

    let taken = users::Entity::find()
        .filter(
            Condition::any()
                .add(lower_eq(users::Column::Username, username))
                .add(lower_eq(users::Column::Email, email)),
        )
        .one(db)
        .await?;

    if let Some(existing) = taken {
        let what = if existing.email.eq_ignore_ascii_case(email) {
            format!("email '{}'", email)
        } else {
            format!("username '{}'", username)
        };
        return Err(StorefrontError::conflict(what).into());
    }

    let verify_token = uuid::Uuid::new_v4().simple().to_string();

    let entity = users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password: Set(hash_password(password)?),
        first_name: Set(profile.first_name),
        last_name: Set(profile.last_name),
        address: Set(profile.address),
        country: Set(profile.country),
        gender: Set(profile.gender),
        birthday: Set(profile.birthday),
        verify_token: Set(Some(verify_token.clone())),
        email_confirmed: Set(false),
        last_login: Set(None),
        created_at: Set(Utc::now()),
        deleted_at: Set(None),
        ..Default::default()
    };

    let model = entity.insert(db).await?;

    tracing::info!(username = %model.username, "Customer registered");

    Ok(Registration {
        customer: model.into(),
        verify_token,
    })
}

/// Confirm the email address behind a verification token.
pub async fn verify_account(db: &DatabaseConnection, token: &str) -> anyhow::Result<Customer> {
    let user = users::Entity::find()
        .filter(users::Column::VerifyToken.eq(token))
        .filter(users::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| StorefrontError::not_found("verification token"))?;

    let mut active: users::ActiveModel = user.into();
    active.email_confirmed = Set(true);
    active.verify_token = Set(None);

    let model = active.update(db).await?;

    Ok(model.into())
}

/// Check credentials and record the login time.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> anyhow::Result<users::Model> {
    let user = find_by_username(db, username)
        .await?
        .ok_or_else(|| StorefrontError::AuthError(USER_NOT_FOUND_MESSAGE.to_string()))?;

    if !bcrypt::verify(password, &user.password).unwrap_or(false) {
        return Err(StorefrontError::AuthError(USER_NOT_FOUND_MESSAGE.to_string()).into());
    }

    if !user.email_confirmed {
        return Err(StorefrontError::AuthError(
            "account email is not confirmed, check your inbox".to_string(),
        )
        .into());
    }

    let mut active: users::ActiveModel = user.into();
    active.last_login = Set(Some(Utc::now()));

    Ok(active.update(db).await?)
}

/// Filters of the back-office account list
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct CustomerFilter {
    pub username: String,
    pub email: String,
    pub country: String,
}

pub async fn search_page(
    db: &DatabaseConnection,
    filter: &CustomerFilter,
    page_no: u64,
    page_size: u64,
) -> anyhow::Result<Page<Customer>> {
    let mut condition = Condition::all().add(users::Column::DeletedAt.is_null());
    if !filter.username.is_empty() {
        condition = condition.add(ilike(users::Column::Username, &filter.username));
    }
    if !filter.email.is_empty() {
        condition = condition.add(ilike(users::Column::Email, &filter.email));
    }
    if !filter.country.is_empty() {
        condition = condition.add(ilike(users::Column::Country, &filter.country));
    }

    let total_count = count(users::Entity::find().filter(condition.clone()), db).await?;

    if total_count > 0 {
        let page_no = page_no.max(1);
        let page_items = users::Entity::find()
            .filter(condition)
            .order_by_desc(users::Column::CreatedAt)
            .offset((page_no - 1) * page_size)
            .limit(page_size)
            .all(db)
            .await?
            .into_iter()
            .map(Customer::from)
            .collect();

        return Ok(Page::<Customer>::new(
            total_count,
            page_no,
            page_size,
            page_items,
        ));
    }

    Ok(Page::<Customer>::default())
}

/// Usernames matching `term`, for autocompletion
pub async fn search(
    db: &DatabaseConnection,
    term: &str,
    limit: u64,
) -> anyhow::Result<Vec<String>> {
    let users = users::Entity::find()
        .select_only()
        .column(users::Column::Username)
        .filter(users::Column::DeletedAt.is_null())
        .filter(ilike(users::Column::Username, term))
        .order_by_asc(users::Column::Username)
        .limit(limit)
        .into_tuple::<String>()
        .all(db)
        .await?;

    Ok(users)
}

/// Create a customer from the back office. The email is trusted, and a
/// soft-deleted account with the same username is brought back.
pub async fn create(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    password: &str,
    profile: CustomerProfile,
) -> anyhow::Result<Customer> {
    validate_identity(username, email)?;
    validate_password(password)?;

    let existing = users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await?;

    let hashed = hash_password(password)?;

    let model = match existing {
        Some(user) if user.deleted_at.is_none() => {
            return Err(StorefrontError::conflict(format!("user '{}'", username)).into());
        }
        Some(user) => {
            let mut active: users::ActiveModel = user.into();
            active.email = Set(email.to_string());
            active.password = Set(hashed);
            active.first_name = Set(profile.first_name);
            active.last_name = Set(profile.last_name);
            active.address = Set(profile.address);
            active.country = Set(profile.country);
            active.gender = Set(profile.gender);
            active.birthday = Set(profile.birthday);
            active.email_confirmed = Set(true);
            active.verify_token = Set(None);
            active.deleted_at = Set(None);
            active.update(db).await?
        }
        None => {
            users::ActiveModel {
                username: Set(username.to_string()),
                email: Set(email.to_string()),
                password: Set(hashed),
                first_name: Set(profile.first_name),
                last_name: Set(profile.last_name),
                address: Set(profile.address),
                country: Set(profile.country),
                gender: Set(profile.gender),
                birthday: Set(profile.birthday),
                verify_token: Set(None),
                email_confirmed: Set(true),
                last_login: Set(None),
                created_at: Set(Utc::now()),
                deleted_at: Set(None),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    Ok(model.into())
}

/// Soft-delete customers by id; returns how many were deleted.
pub async fn delete(db: &DatabaseConnection, ids: &[i64]) -> anyhow::Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = users::Entity::update_many()
        .col_expr(users::Column::DeletedAt, Expr::value(Utc::now()))
        .filter(users::Column::Id.is_in(ids.to_vec()))
        .filter(users::Column::DeletedAt.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, email: &str, country: &str) -> users::Model {
        users::Model {
            id: 1,
            username: username.to_string(),
            email: email.to_string(),
            password: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            address: String::new(),
            country: country.to_string(),
            gender: String::new(),
            birthday: None,
            verify_token: None,
            email_confirmed: true,
            last_login: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(73)).is_err());
    }

    #[test]
    fn test_validate_identity() {
        assert!(validate_identity("jane", "jane@example.com").is_ok());
        assert!(validate_identity("", "jane@example.com").is_err());
        assert!(validate_identity("jane", "not-an-email").is_err());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_unconfirmed_email() {
        let mut model = user("jane", "jane@example.com", "BG");
        model.password = bcrypt::hash("secret1", 4).unwrap();
        model.email_confirmed = false;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model]])
            .into_connection();

        let err = authenticate(&db, "jane", "secret1").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StorefrontError>(),
            Some(StorefrontError::AuthError(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_password() {
        let mut model = user("jane", "jane@example.com", "BG");
        model.password = bcrypt::hash("secret1", 4).unwrap();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model]])
            .into_connection();

        let err = authenticate(&db, "jane", "wrong-password").await.unwrap_err();
        assert_eq!(err.to_string(), format!("authentication error: {}", USER_NOT_FOUND_MESSAGE));
    }

    #[tokio::test]
    async fn test_register_rejects_mismatched_confirmation() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = register(
            &db,
            "jane",
            "jane@example.com",
            "secret1",
            "secret2",
            CustomerProfile::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "caused: passwords do not match");
    }

    #[tokio::test]
    async fn test_register_rejects_taken_email() {
        let existing = user("other", "jane@example.com", "BG");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing]])
            .into_connection();

        let err = register(
            &db,
            "jane",
            "JANE@example.com",
            "secret1",
            "secret1",
            CustomerProfile::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "email 'JANE@example.com' already exists");
    }
}
