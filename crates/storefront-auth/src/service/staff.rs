//! Back-office staff service

use chrono::{DateTime, Utc};
use storefront_common::StorefrontError;
use storefront_common::permission::ADMIN_ROLE;
use storefront_common::utils::is_email;
use storefront_persistence::Page;
use storefront_persistence::entity::{roles, staff, staff_roles};
use storefront_persistence::query::{count, ilike};
use storefront_persistence::sea_orm::*;

use crate::model::{StaffMember, USER_NOT_FOUND_MESSAGE};
use crate::service::customer::{hash_password, validate_password};
use crate::service::role;

/// Input of the staff add and edit forms
#[derive(Debug, Clone, Default)]
pub struct StaffForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
}

impl StaffForm {
    fn validate(&self) -> anyhow::Result<()> {
        if self.username.trim().is_empty() {
            return Err(StorefrontError::illegal("username must not be empty").into());
        }
        if !is_email(&self.email) {
            return Err(
                StorefrontError::illegal(format!("'{}' is not a valid email", self.email)).into(),
            );
        }
        Ok(())
    }
}

pub async fn find_by_username(
    db: &impl ConnectionTrait,
    username: &str,
) -> anyhow::Result<Option<staff::Model>> {
    let member = staff::Entity::find()
        .filter(staff::Column::Username.eq(username))
        .filter(staff::Column::DeletedAt.is_null())
        .one(db)
        .await?;

    Ok(member)
}

async fn find_by_id(db: &impl ConnectionTrait, id: i64) -> anyhow::Result<staff::Model> {
    staff::Entity::find_by_id(id)
        .filter(staff::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| StorefrontError::not_found(format!("staff {}", id)).into())
}

/// Live role names of a staff member
pub async fn roles_of(db: &impl ConnectionTrait, staff_id: i64) -> anyhow::Result<Vec<String>> {
    let names = roles::Entity::find()
        .select_only()
        .column(roles::Column::Name)
        .inner_join(staff_roles::Entity)
        .filter(staff_roles::Column::StaffId.eq(staff_id))
        .filter(roles::Column::DeletedAt.is_null())
        .order_by_asc(roles::Column::Name)
        .into_tuple::<String>()
        .all(db)
        .await?;

    Ok(names)
}

/// Check credentials and start a back-office session.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> anyhow::Result<staff::Model> {
    let member = find_by_username(db, username)
        .await?
        .ok_or_else(|| StorefrontError::AuthError(USER_NOT_FOUND_MESSAGE.to_string()))?;

    if !bcrypt::verify(password, &member.password).unwrap_or(false) {
        return Err(StorefrontError::AuthError(USER_NOT_FOUND_MESSAGE.to_string()).into());
    }

    let now = Utc::now();
    let mut active: staff::ActiveModel = member.into();
    active.last_login = Set(Some(now));
    active.last_activity = Set(Some(now));

    Ok(active.update(db).await?)
}

/// Whether a session whose last request was at `last_activity` is still
/// alive. No activity means the member logged out. Zero minutes disables
/// the inactivity timeout.
pub fn is_session_active(
    last_activity: Option<DateTime<Utc>>,
    backoffice_expire_minutes: i64,
    now: DateTime<Utc>,
) -> bool {
    let Some(at) = last_activity else {
        return false;
    };
    backoffice_expire_minutes <= 0
        || now - at <= chrono::Duration::minutes(backoffice_expire_minutes)
}

/// Refresh the activity timestamp of a staff session.
///
/// Returns the staff row, or `AuthError` when the member is gone or the
/// session went idle for longer than `backoffice_expire_minutes`.
pub async fn touch_activity(
    db: &DatabaseConnection,
    username: &str,
    backoffice_expire_minutes: i64,
) -> anyhow::Result<staff::Model> {
    let member = find_by_username(db, username)
        .await?
        .ok_or_else(|| StorefrontError::AuthError("staff account not found".to_string()))?;

    let now = Utc::now();
    if !is_session_active(member.last_activity, backoffice_expire_minutes, now) {
        return Err(StorefrontError::AuthError("session expired!".to_string()).into());
    }

    let mut active: staff::ActiveModel = member.into();
    active.last_activity = Set(Some(now));

    Ok(active.update(db).await?)
}

/// End a back-office session so the next request with the same token fails.
pub async fn logout(db: &DatabaseConnection, username: &str) -> anyhow::Result<()> {
    if let Some(member) = find_by_username(db, username).await? {
        let mut active: staff::ActiveModel = member.into();
        active.last_activity = Set(None);
        active.update(db).await?;
    }
    Ok(())
}

pub async fn search_page(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    page_no: u64,
    page_size: u64,
) -> anyhow::Result<Page<StaffMember>> {
    let mut condition = Condition::all().add(staff::Column::DeletedAt.is_null());
    if !username.is_empty() {
        condition = condition.add(ilike(staff::Column::Username, username));
    }
    if !email.is_empty() {
        condition = condition.add(ilike(staff::Column::Email, email));
    }

    let total_count = count(staff::Entity::find().filter(condition.clone()), db).await?;

    if total_count > 0 {
        let page_no = page_no.max(1);
        let models = staff::Entity::find()
            .filter(condition)
            .order_by_asc(staff::Column::Username)
            .offset((page_no - 1) * page_size)
            .limit(page_size)
            .all(db)
            .await?;

        let mut page_items = Vec::with_capacity(models.len());
        for model in models {
            let roles = roles_of(db, model.id).await?;
            page_items.push(StaffMember::from_model(model, roles));
        }

        return Ok(Page::<StaffMember>::new(
            total_count,
            page_no,
            page_size,
            page_items,
        ));
    }

    Ok(Page::<StaffMember>::default())
}

async fn replace_roles(
    txn: &DatabaseTransaction,
    staff_id: i64,
    role_ids: Vec<i64>,
) -> anyhow::Result<()> {
    staff_roles::Entity::delete_many()
        .filter(staff_roles::Column::StaffId.eq(staff_id))
        .exec(txn)
        .await?;

    if !role_ids.is_empty() {
        let rows = role_ids.into_iter().map(|role_id| staff_roles::ActiveModel {
            staff_id: Set(staff_id),
            role_id: Set(role_id),
        });
        staff_roles::Entity::insert_many(rows)
            .exec_without_returning(txn)
            .await?;
    }

    Ok(())
}

/// Create a staff member with the given roles.
pub async fn create(
    db: &DatabaseConnection,
    form: StaffForm,
    password: &str,
) -> anyhow::Result<StaffMember> {
    form.validate()?;
    validate_password(password)?;

    let txn = db.begin().await?;

    let taken = staff::Entity::find()
        .filter(
            Condition::any()
                .add(staff::Column::Username.eq(form.username.as_str()))
                .add(staff::Column::Email.eq(form.email.as_str())),
        )
        .one(&txn)
        .await?;

    if taken.is_some() {
        return Err(StorefrontError::conflict(format!("staff '{}'", form.username)).into());
    }

    let role_ids = role::ids_by_names(&txn, &form.roles).await?;

    let model = staff::ActiveModel {
        username: Set(form.username),
        email: Set(form.email),
        password: Set(hash_password(password)?),
        first_name: Set(form.first_name),
        last_name: Set(form.last_name),
        last_login: Set(None),
        last_activity: Set(None),
        created_at: Set(Utc::now()),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    replace_roles(&txn, model.id, role_ids).await?;
    let roles = roles_of(&txn, model.id).await?;

    txn.commit().await?;

    tracing::info!(username = %model.username, "Staff member created");

    Ok(StaffMember::from_model(model, roles))
}

/// Change the identity and the role set of a staff member.
pub async fn update(
    db: &DatabaseConnection,
    staff_id: i64,
    form: StaffForm,
) -> anyhow::Result<StaffMember> {
    form.validate()?;

    let txn = db.begin().await?;

    let model = find_by_id(&txn, staff_id).await?;

    let clash = staff::Entity::find()
        .filter(staff::Column::Id.ne(staff_id))
        .filter(
            Condition::any()
                .add(staff::Column::Username.eq(form.username.as_str()))
                .add(staff::Column::Email.eq(form.email.as_str())),
        )
        .one(&txn)
        .await?;

    if clash.is_some() {
        return Err(StorefrontError::conflict(format!("staff '{}'", form.username)).into());
    }

    let role_ids = role::ids_by_names(&txn, &form.roles).await?;

    let mut active: staff::ActiveModel = model.into();
    active.username = Set(form.username);
    active.email = Set(form.email);
    active.first_name = Set(form.first_name);
    active.last_name = Set(form.last_name);
    let model = active.update(&txn).await?;

    replace_roles(&txn, staff_id, role_ids).await?;
    let roles = roles_of(&txn, staff_id).await?;

    txn.commit().await?;

    Ok(StaffMember::from_model(model, roles))
}

pub async fn delete(db: &DatabaseConnection, staff_id: i64) -> anyhow::Result<()> {
    let model = find_by_id(db, staff_id).await?;

    let mut active: staff::ActiveModel = model.into();
    active.deleted_at = Set(Some(Utc::now()));
    active.last_activity = Set(None);
    active.update(db).await?;

    Ok(())
}

/// Make sure the configured administrator exists and holds the admin role.
///
/// Does nothing when the account is already there.
pub async fn bootstrap_admin(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    if find_by_username(db, username).await?.is_some() {
        return Ok(());
    }

    let admin_exists = roles::Entity::find()
        .filter(roles::Column::Name.eq(ADMIN_ROLE))
        .filter(roles::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .is_some();

    if !admin_exists {
        role::create(db, ADMIN_ROLE, &[]).await?;
    }

    create(
        db,
        StaffForm {
            username: username.to_string(),
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            roles: vec![ADMIN_ROLE.to_string()],
        },
        password,
    )
    .await?;

    tracing::warn!(username, "Bootstrapped administrator account");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(last_activity: Option<DateTime<Utc>>) -> staff::Model {
        staff::Model {
            id: 1,
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password: bcrypt::hash("secret1", 4).unwrap(),
            first_name: String::new(),
            last_name: String::new(),
            last_login: None,
            last_activity,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_is_session_active() {
        let now = Utc::now();
        let recent = Some(now - chrono::Duration::minutes(2));
        let stale = Some(now - chrono::Duration::minutes(10));

        assert!(is_session_active(recent, 5, now));
        assert!(!is_session_active(stale, 5, now));
        assert!(!is_session_active(None, 5, now));
        assert!(is_session_active(stale, 0, now));
        assert!(!is_session_active(None, 0, now));
    }

    #[test]
    fn test_staff_form_validate() {
        let form = StaffForm {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            ..Default::default()
        };
        assert!(form.validate().is_ok());

        let form = StaffForm {
            email: "nope".to_string(),
            ..form
        };
        assert!(form.validate().is_err());
    }

    #[tokio::test]
    async fn test_touch_activity_rejects_idle_session() {
        let stale = member(Some(Utc::now() - chrono::Duration::minutes(30)));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stale]])
            .into_connection();

        let err = touch_activity(&db, "admin", 5).await.unwrap_err();
        assert_eq!(err.to_string(), "authentication error: session expired!");
    }

    #[tokio::test]
    async fn test_touch_activity_after_logout_without_timeout() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![member(None)]])
            .into_connection();

        let err = touch_activity(&db, "admin", 0).await.unwrap_err();
        assert_eq!(err.to_string(), "authentication error: session expired!");
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![member(None)]])
            .into_connection();

        let err = authenticate(&db, "admin", "wrong").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StorefrontError>(),
            Some(StorefrontError::AuthError(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<staff::Model>::new()])
            .into_connection();

        let err = authenticate(&db, "ghost", "secret1").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("authentication error: {}", USER_NOT_FOUND_MESSAGE)
        );
    }
}
