//! Notification business logic - Customer inbox and admin broadcast.

use crate::{
    core::{Page, RequestMeta, UserSummary, security_log, validation},
    entities::{Notification, NotificationColumn, NotificationModel, User, notification},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Kinds of notification shown with different styling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Warning,
    Error,
    Success,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

/// Paging for a customer's inbox
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InboxQuery {
    pub limit: u64,
    pub offset: u64,
    pub unread_only: bool,
}

impl Default for InboxQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            unread_only: false,
        }
    }
}

/// A page of the inbox with the caller's unread count
#[derive(Debug, Clone, Serialize)]
pub struct Inbox {
    pub data: Vec<NotificationModel>,
    pub total: u64,
    pub unread_count: u64,
}

/// Lists the caller's notifications, newest first.
pub async fn list_notifications(
    db: &DatabaseConnection,
    user_id: &str,
    query: &InboxQuery,
) -> Result<Inbox> {
    let mut condition = Condition::all().add(NotificationColumn::UserId.eq(user_id));
    if query.unread_only {
        condition = condition.add(NotificationColumn::Read.eq(false));
    }

    let total = Notification::find()
        .filter(condition.clone())
        .count(db)
        .await?;
    let unread_count = Notification::find()
        .filter(NotificationColumn::UserId.eq(user_id))
        .filter(NotificationColumn::Read.eq(false))
        .count(db)
        .await?;
    let data = Notification::find()
        .filter(condition)
        .order_by_desc(NotificationColumn::CreatedAt)
        .order_by_desc(NotificationColumn::Id)
        .limit(query.limit)
        .offset(query.offset)
        .all(db)
        .await?;

    Ok(Inbox {
        data,
        total,
        unread_count,
    })
}

/// Marks one of the caller's notifications as read.
///
/// # Errors
/// Returns `NotFound` when the notification does not belong to the caller.
pub async fn mark_read(db: &DatabaseConnection, user_id: &str, id: i64) -> Result<()> {
    let result = Notification::update_many()
        .col_expr(NotificationColumn::Read, Expr::value(true))
        .filter(NotificationColumn::Id.eq(id))
        .filter(NotificationColumn::UserId.eq(user_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Notification", id));
    }
    Ok(())
}

/// Marks every notification of the caller as read, returning how many changed.
pub async fn mark_all_read(db: &DatabaseConnection, user_id: &str) -> Result<u64> {
    let result = Notification::update_many()
        .col_expr(NotificationColumn::Read, Expr::value(true))
        .filter(NotificationColumn::UserId.eq(user_id))
        .filter(NotificationColumn::Read.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Deletes one of the caller's notifications.
///
/// # Errors
/// Returns `NotFound` when the notification does not belong to the caller.
pub async fn delete_own(db: &DatabaseConnection, user_id: &str, id: i64) -> Result<()> {
    let result = Notification::delete_many()
        .filter(NotificationColumn::Id.eq(id))
        .filter(NotificationColumn::UserId.eq(user_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Notification", id));
    }
    Ok(())
}

/// Paging and filtering for [`list_all`]
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminNotificationQuery {
    pub limit: u64,
    pub offset: u64,
    pub user_id: Option<String>,
}

impl Default for AdminNotificationQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            user_id: None,
        }
    }
}

/// A notification with its recipient, as listed in the admin panel
#[derive(Debug, Clone, Serialize)]
pub struct AdminNotificationRow {
    #[serde(flatten)]
    pub notification: NotificationModel,
    pub user: Option<UserSummary>,
}

/// Lists notifications of all users, newest first.
pub async fn list_all(
    db: &DatabaseConnection,
    query: &AdminNotificationQuery,
) -> Result<Page<AdminNotificationRow>> {
    let mut condition = Condition::all();
    if let Some(user_id) = query.user_id.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(NotificationColumn::UserId.eq(user_id));
    }

    let total = Notification::find()
        .filter(condition.clone())
        .count(db)
        .await?;
    let rows = Notification::find()
        .filter(condition)
        .order_by_desc(NotificationColumn::CreatedAt)
        .order_by_desc(NotificationColumn::Id)
        .limit(query.limit)
        .offset(query.offset)
        .find_also_related(User)
        .all(db)
        .await?;

    let data = rows
        .into_iter()
        .map(|(notification, user)| AdminNotificationRow {
            notification,
            user: user.as_ref().map(UserSummary::from),
        })
        .collect();
    Ok(Page { data, total })
}

/// Input of [`create_notification`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: NotificationKind,
}

/// Sends a notification to a user and records `NOTIFICATION_CREATED`.
///
/// # Errors
/// Returns a validation error for an empty title or message and `NotFound`
/// for an unknown recipient.
pub async fn create_notification(
    db: &DatabaseConnection,
    admin_id: &str,
    new: NewNotification,
    meta: &RequestMeta,
) -> Result<NotificationModel> {
    let title = validation::sanitize_text(&new.title);
    let message = validation::sanitize_text(&new.message);
    validation::check_min_length("Title", &title, 1)?;
    validation::check_min_length("Message", &message, 1)?;
    User::find_by_id(new.user_id.clone())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", &new.user_id))?;

    let created = notification::ActiveModel {
        user_id: Set(new.user_id),
        title: Set(title),
        message: Set(message),
        kind: Set(new.kind.as_str().to_string()),
        read: Set(false),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    security_log::record(
        db,
        security_log::events::NOTIFICATION_CREATED,
        admin_id,
        json!({ "notificationId": created.id, "targetUserId": created.user_id }),
        meta,
    )
    .await;
    Ok(created)
}

/// Deletes any notification and records `NOTIFICATION_DELETED`.
///
/// # Errors
/// Returns `NotFound` if no notification has this id.
pub async fn admin_delete_notification(
    db: &DatabaseConnection,
    admin_id: &str,
    id: i64,
    meta: &RequestMeta,
) -> Result<()> {
    let result = Notification::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Notification", id));
    }
    security_log::record(
        db,
        security_log::events::NOTIFICATION_DELETED,
        admin_id,
        json!({ "notificationId": id }),
        meta,
    )
    .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn new_for(user_id: &str, title: &str) -> NewNotification {
        NewNotification {
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: "Your order shipped".to_string(),
            kind: NotificationKind::default(),
        }
    }

    #[tokio::test]
    async fn test_inbox_flow() -> Result<()> {
        let db = setup_test_db().await?;
        let meta = RequestMeta::default();
        let alice = create_test_user(&db, "alice@example.com").await?;
        let bob = create_test_user(&db, "bob@example.com").await?;

        let first = create_notification(&db, "admin", new_for(&alice.id, "One"), &meta).await?;
        create_notification(&db, "admin", new_for(&alice.id, "Two"), &meta).await?;
        let bobs = create_notification(&db, "admin", new_for(&bob.id, "Bob"), &meta).await?;
        assert_eq!(first.kind, "info");

        let inbox = list_notifications(&db, &alice.id, &InboxQuery::default()).await?;
        assert_eq!((inbox.total, inbox.unread_count), (2, 2));
        assert_eq!(inbox.data[0].title, "Two");

        mark_read(&db, &alice.id, first.id).await?;
        assert!(matches!(
            mark_read(&db, &alice.id, bobs.id).await,
            Err(Error::NotFound { .. })
        ));

        let unread = InboxQuery {
            unread_only: true,
            ..InboxQuery::default()
        };
        let inbox = list_notifications(&db, &alice.id, &unread).await?;
        assert_eq!((inbox.total, inbox.unread_count), (1, 1));

        assert_eq!(mark_all_read(&db, &alice.id).await?, 1);
        assert!(matches!(
            delete_own(&db, &alice.id, bobs.id).await,
            Err(Error::NotFound { .. })
        ));
        delete_own(&db, &alice.id, first.id).await?;
        let inbox = list_notifications(&db, &alice.id, &InboxQuery::default()).await?;
        assert_eq!((inbox.total, inbox.unread_count), (1, 0));
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_listing_and_rules() -> Result<()> {
        let db = setup_test_db().await?;
        let meta = RequestMeta::default();
        let alice = create_test_user(&db, "alice@example.com").await?;
        let bob = create_test_user(&db, "bob@example.com").await?;

        assert!(matches!(
            create_notification(&db, "admin", new_for(&alice.id, "  "), &meta).await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            create_notification(&db, "admin", new_for("ghost", "Hi"), &meta).await,
            Err(Error::NotFound { .. })
        ));

        create_notification(&db, "admin", new_for(&alice.id, "A"), &meta).await?;
        let to_bob = create_notification(&db, "admin", new_for(&bob.id, "B"), &meta).await?;

        let page = list_all(&db, &AdminNotificationQuery::default()).await?;
        assert_eq!(page.total, 2);
        assert_eq!(page.data[0].user.as_ref().unwrap().email, "bob@example.com");

        let only_alice = AdminNotificationQuery {
            user_id: Some(alice.id.clone()),
            ..AdminNotificationQuery::default()
        };
        assert_eq!(list_all(&db, &only_alice).await?.total, 1);

        admin_delete_notification(&db, "admin", to_bob.id, &meta).await?;
        assert!(matches!(
            admin_delete_notification(&db, "admin", to_bob.id, &meta).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
