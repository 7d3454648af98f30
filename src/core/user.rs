//! User business logic - Accounts, customer details and admin user management.

use crate::{
    auth::password,
    core::{Page, RequestMeta, SortOrder, security_log, validation},
    entities::{
        Account, AccountColumn, AccountModel, User, UserColumn, UserModel, account,
        account::CREDENTIAL_PROVIDER, user,
    },
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// Roles a user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Stored representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => user::ROLE_USER,
            Self::Admin => user::ROLE_ADMIN,
        }
    }
}

/// Retrieves a user by id.
///
/// # Errors
/// Returns `NotFound` if the user does not exist.
pub async fn get_user<C: ConnectionTrait>(conn: &C, user_id: &str) -> Result<UserModel> {
    User::find_by_id(user_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))
}

/// Retrieves a user by (already normalized) email.
pub async fn find_by_email<C: ConnectionTrait>(conn: &C, email: &str) -> Result<Option<UserModel>> {
    User::find()
        .filter(UserColumn::Email.eq(email))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Retrieves the password account of a user, if any.
pub async fn credential_account<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
) -> Result<Option<AccountModel>> {
    Account::find()
        .filter(AccountColumn::UserId.eq(user_id))
        .filter(AccountColumn::ProviderId.eq(CREDENTIAL_PROVIDER))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Inserts a user with role `user` and a credential account holding
/// `password_hash`, in one transaction.
pub async fn create_credential_user(
    db: &DatabaseConnection,
    email: &str,
    password_hash: String,
    name: Option<String>,
) -> Result<UserModel> {
    let now = chrono::Utc::now().naive_utc();
    let user_id = uuid::Uuid::new_v4().to_string();

    let txn = db.begin().await?;
    let created = user::ActiveModel {
        id: Set(user_id.clone()),
        name: Set(name),
        email: Set(email.to_string()),
        email_verified: Set(false),
        image: Set(None),
        role: Set(Role::User.as_str().to_string()),
        first_name: Set(None),
        last_name: Set(None),
        phone: Set(None),
        address: Set(None),
        city: Set(None),
        state: Set(None),
        zip: Set(None),
        country: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    account::ActiveModel {
        user_id: Set(user_id.clone()),
        provider_id: Set(CREDENTIAL_PROVIDER.to_string()),
        account_id: Set(user_id),
        password: Set(Some(password_hash)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok(created)
}

async fn ensure_email_free(db: &DatabaseConnection, email: &str, user_id: &str) -> Result<()> {
    if let Some(other) = find_by_email(db, email).await? {
        if other.id != user_id {
            return Err(Error::validation("Email is already in use"));
        }
    }
    Ok(())
}

/// Address and contact details a customer edits on the account page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsInput {
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub email: String,
}

// Length rules apply to the stored, sanitized value
fn clean_text(field: &str, value: &str, min: usize, max: usize) -> Result<String> {
    let cleaned = validation::clean_text(field, value)?;
    validation::check_length(field, &cleaned, min, max)?;
    Ok(cleaned)
}

impl DetailsInput {
    /// Validates and sanitizes every field.
    fn sanitized(&self) -> Result<Self> {
        validation::check_length("Phone number", self.phone.trim(), 10, 20)?;
        validation::check_length("ZIP code", self.zip.trim(), 5, 10)?;
        let email = validation::sanitize_email(&self.email);
        if !validation::is_valid_email(&email) {
            return Err(Error::validation("Invalid email address"));
        }

        Ok(Self {
            display_name: clean_text("Display name", &self.display_name, 2, 50)?,
            first_name: clean_text("First name", &self.first_name, 2, 50)?,
            last_name: clean_text("Last name", &self.last_name, 2, 50)?,
            phone: validation::sanitize_phone(&self.phone),
            address: clean_text("Address", &self.address, 5, 200)?,
            city: clean_text("City", &self.city, 2, 100)?,
            state: clean_text("State", &self.state, 2, 100)?,
            zip: validation::sanitize_zip(&self.zip),
            country: clean_text("Country", &self.country, 2, 100)?,
            email,
        })
    }
}

/// Updates the caller's display name, contact and address details and
/// records `USER_DETAILS_UPDATED`.
///
/// # Errors
/// Returns a validation error when a field breaks its length rule, contains
/// script-like content, or the email is invalid or used by another account.
pub async fn set_details(
    db: &DatabaseConnection,
    user_id: &str,
    input: &DetailsInput,
    meta: &RequestMeta,
) -> Result<UserModel> {
    let details = input.sanitized()?;
    let existing = get_user(db, user_id).await?;
    ensure_email_free(db, &details.email, user_id).await?;

    let mut active: user::ActiveModel = existing.into();
    active.name = Set(Some(details.display_name));
    active.first_name = Set(Some(details.first_name));
    active.last_name = Set(Some(details.last_name));
    active.phone = Set(Some(details.phone));
    active.address = Set(Some(details.address));
    active.city = Set(Some(details.city));
    active.state = Set(Some(details.state));
    active.zip = Set(Some(details.zip));
    active.country = Set(Some(details.country));
    active.email = Set(details.email);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = active.update(db).await?;

    security_log::record(
        db,
        security_log::events::USER_DETAILS_UPDATED,
        user_id,
        json!({ "email": updated.email }),
        meta,
    )
    .await;
    Ok(updated)
}

/// Keeps only avatar values safe to render: http(s) URLs and non-SVG image
/// data URLs.
#[must_use]
pub fn clean_image(image: Option<&str>) -> Option<String> {
    let image = image?.trim();
    let lower = image.to_lowercase();
    let allowed = lower.starts_with("http://")
        || lower.starts_with("https://")
        || (lower.starts_with("data:image/") && !lower.starts_with("data:image/svg"));
    allowed.then(|| image.to_string())
}

/// Columns admin user listings can be sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserSortField {
    Name,
    Email,
    Role,
    #[default]
    CreatedAt,
}

impl UserSortField {
    const fn column(self) -> UserColumn {
        match self {
            Self::Name => UserColumn::Name,
            Self::Email => UserColumn::Email,
            Self::Role => UserColumn::Role,
            Self::CreatedAt => UserColumn::CreatedAt,
        }
    }
}

/// Paging, search and sorting for [`list_users`]
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserQuery {
    pub limit: u64,
    pub offset: u64,
    /// Matched against name, email, first and last name
    pub search: Option<String>,
    pub sort_by: UserSortField,
    pub sort_order: SortOrder,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            search: None,
            sort_by: UserSortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

/// A user as listed in the admin panel
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserRow {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime,
    pub has_password: bool,
    pub provider_id: Option<String>,
}

/// Retrieves one page of users with their account information.
pub async fn list_users(db: &DatabaseConnection, query: &UserQuery) -> Result<Page<AdminUserRow>> {
    let mut condition = Condition::all();
    if let Some(term) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(UserColumn::Name.contains(term))
                .add(UserColumn::Email.contains(term))
                .add(UserColumn::FirstName.contains(term))
                .add(UserColumn::LastName.contains(term)),
        );
    }

    let total = User::find().filter(condition.clone()).count(db).await?;
    let users = User::find()
        .filter(condition)
        .order_by(query.sort_by.column(), query.sort_order.into())
        .order_by_asc(UserColumn::Id)
        .limit(query.limit)
        .offset(query.offset)
        .all(db)
        .await?;

    let ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();
    let mut accounts: HashMap<String, AccountModel> = HashMap::new();
    for acc in Account::find()
        .filter(AccountColumn::UserId.is_in(ids))
        .order_by_asc(AccountColumn::Id)
        .all(db)
        .await?
    {
        // Prefer the credential account when a user has several
        let replace = accounts.get(&acc.user_id).is_none_or(|current| {
            current.provider_id != CREDENTIAL_PROVIDER && acc.provider_id == CREDENTIAL_PROVIDER
        });
        if replace {
            accounts.insert(acc.user_id.clone(), acc);
        }
    }

    let data = users
        .into_iter()
        .map(|u| {
            let account = accounts.get(&u.id);
            AdminUserRow {
                image: clean_image(u.image.as_deref()),
                has_password: account.is_some_and(|a| a.password.is_some()),
                provider_id: account.map(|a| a.provider_id.clone()),
                id: u.id,
                name: u.name,
                email: u.email,
                email_verified: u.email_verified,
                role: u.role,
                first_name: u.first_name,
                last_name: u.last_name,
                phone: u.phone,
                city: u.city,
                country: u.country,
                created_at: u.created_at,
            }
        })
        .collect();
    Ok(Page { data, total })
}

/// Partial update of a user by an administrator
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub role: Option<Role>,
    pub email_verified: Option<bool>,
}

/// Applies an admin's partial update and records `USER_UPDATED` with the
/// names of the changed fields.
///
/// # Errors
/// Returns `NotFound` for an unknown user and a validation error for an
/// empty name or an invalid or taken email.
pub async fn admin_update_user(
    db: &DatabaseConnection,
    admin_id: &str,
    user_id: &str,
    patch: UserPatch,
    meta: &RequestMeta,
) -> Result<UserModel> {
    let existing = get_user(db, user_id).await?;
    let mut active: user::ActiveModel = existing.into();
    let mut changed: Vec<&str> = Vec::new();

    if let Some(name) = patch.name {
        let name = clean_text("Name", &name, 1, 255)?;
        active.name = Set(Some(name));
        changed.push("name");
    }
    if let Some(email) = patch.email {
        let email = validation::sanitize_email(&email);
        if !validation::is_valid_email(&email) {
            return Err(Error::validation("Invalid email address"));
        }
        ensure_email_free(db, &email, user_id).await?;
        active.email = Set(email);
        changed.push("email");
    }

    let optional_text = [
        ("firstName", patch.first_name),
        ("lastName", patch.last_name),
        ("phone", patch.phone),
        ("address", patch.address),
        ("city", patch.city),
        ("state", patch.state),
        ("zip", patch.zip),
        ("country", patch.country),
    ];
    for (field, value) in optional_text {
        let Some(value) = value else { continue };
        let cleaned = validation::clean_text(field, &value)?;
        let value = Set((!cleaned.is_empty()).then_some(cleaned));
        match field {
            "firstName" => active.first_name = value,
            "lastName" => active.last_name = value,
            "phone" => active.phone = value,
            "address" => active.address = value,
            "city" => active.city = value,
            "state" => active.state = value,
            "zip" => active.zip = value,
            _ => active.country = value,
        }
        changed.push(field);
    }

    if let Some(role) = patch.role {
        active.role = Set(role.as_str().to_string());
        changed.push("role");
    }
    if let Some(verified) = patch.email_verified {
        active.email_verified = Set(verified);
        changed.push("emailVerified");
    }

    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = active.update(db).await?;

    security_log::record(
        db,
        security_log::events::USER_UPDATED,
        admin_id,
        json!({ "targetUserId": user_id, "changedFields": changed }),
        meta,
    )
    .await;
    Ok(updated)
}

/// Sets a new password on a user's credential account, creating the account
/// when the user only had external logins. Records `PASSWORD_RESET`.
///
/// # Errors
/// Returns a validation error for a password shorter than 8 characters and
/// `NotFound` for an unknown user.
pub async fn reset_password(
    db: &DatabaseConnection,
    admin_id: &str,
    user_id: &str,
    new_password: &str,
    meta: &RequestMeta,
) -> Result<()> {
    password::check_password_strength(new_password)?;
    get_user(db, user_id).await?;
    let hash = password::hash_password(new_password)?;
    let now = chrono::Utc::now().naive_utc();

    match credential_account(db, user_id).await? {
        Some(existing) => {
            let mut active: account::ActiveModel = existing.into();
            active.password = Set(Some(hash));
            active.updated_at = Set(now);
            active.update(db).await?;
        }
        None => {
            account::ActiveModel {
                user_id: Set(user_id.to_string()),
                provider_id: Set(CREDENTIAL_PROVIDER.to_string()),
                account_id: Set(user_id.to_string()),
                password: Set(Some(hash)),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    security_log::record(
        db,
        security_log::events::PASSWORD_RESET,
        admin_id,
        json!({ "targetUserId": user_id }),
        meta,
    )
    .await;
    Ok(())
}

/// Deletes a user and everything owned by them. Records `USER_DELETED`.
///
/// # Errors
/// Returns a validation error when an admin tries to delete their own
/// account and `NotFound` for an unknown user.
pub async fn delete_user(
    db: &DatabaseConnection,
    admin_id: &str,
    user_id: &str,
    meta: &RequestMeta,
) -> Result<()> {
    if admin_id == user_id {
        return Err(Error::validation("You cannot delete your own account"));
    }
    let existing = get_user(db, user_id).await?;
    User::delete_by_id(existing.id.clone()).exec(db).await?;

    security_log::record(
        db,
        security_log::events::USER_DELETED,
        admin_id,
        json!({ "targetUserId": user_id, "email": existing.email }),
        meta,
    )
    .await;
    Ok(())
}
