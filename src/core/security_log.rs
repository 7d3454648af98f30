//! Security event logging - The audit trail written by storefront actions.
//!
//! Recording is fire-and-forget: a failure to store an event is logged with
//! `tracing` and never fails the action that produced it.

use crate::{
    core::{Page, RequestMeta},
    entities::{SecurityLog, SecurityLogColumn, SecurityLogModel, security_log},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, QuerySelect, Set, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Event names recorded by the storefront.
pub mod events {
    pub const UNAUTHORIZED_ACCESS: &str = "UNAUTHORIZED_ACCESS";
    pub const USER_REGISTERED: &str = "USER_REGISTERED";
    pub const LOGIN_SUCCESS: &str = "LOGIN_SUCCESS";
    pub const LOGIN_FAILED: &str = "LOGIN_FAILED";
    pub const CART_ADD: &str = "CART_ADD";
    pub const CART_UPDATE: &str = "CART_UPDATE";
    pub const CART_REMOVE: &str = "CART_REMOVE";
    pub const ORDER_CREATED: &str = "ORDER_CREATED";
    pub const USER_DETAILS_UPDATED: &str = "USER_DETAILS_UPDATED";
    pub const USER_UPDATED: &str = "USER_UPDATED";
    pub const PASSWORD_RESET: &str = "PASSWORD_RESET";
    pub const USER_DELETED: &str = "USER_DELETED";
    pub const REVIEW_DELETED: &str = "REVIEW_DELETED";
    pub const NOTIFICATION_CREATED: &str = "NOTIFICATION_CREATED";
    pub const NOTIFICATION_DELETED: &str = "NOTIFICATION_DELETED";
    pub const COUPON_CREATED: &str = "COUPON_CREATED";
    pub const COUPON_DELETED: &str = "COUPON_DELETED";
    pub const LOG_DELETED: &str = "LOG_DELETED";
    pub const EMAIL_TEMPLATE_CREATED: &str = "EMAIL_TEMPLATE_CREATED";
    pub const EMAIL_TEMPLATE_UPDATED: &str = "EMAIL_TEMPLATE_UPDATED";
    pub const EMAIL_TEMPLATE_DELETED: &str = "EMAIL_TEMPLATE_DELETED";
    pub const SETTINGS_UPDATE: &str = "SETTINGS_UPDATE";
}

/// User id recorded for callers without a session.
pub const ANONYMOUS: &str = "anonymous";

/// Display severity derived from the event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Success,
    Info,
}

impl Severity {
    /// Classifies an event by the keywords in its name.
    #[must_use]
    pub fn of(event: &str) -> Self {
        let has = |words: &[&str]| words.iter().any(|w| event.contains(w));
        if has(&["UNAUTHORIZED", "FAILED", "ERROR"]) {
            Self::Error
        } else if has(&["WARNING", "SUSPICIOUS"]) {
            Self::Warning
        } else if has(&["SUCCESS", "CREATED", "UPDATED"]) {
            Self::Success
        } else {
            Self::Info
        }
    }
}

/// A log row as listed in the admin panel
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    #[serde(flatten)]
    pub log: SecurityLogModel,
    pub severity: Severity,
}

/// Filters for [`list_logs`]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogQuery {
    pub limit: u64,
    pub offset: u64,
    /// Matched against event name, user id and IP
    pub search: Option<String>,
    /// Exact event name
    pub event_type: Option<String>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            search: None,
            event_type: None,
        }
    }
}

/// Stores a security event, logging instead of failing on storage errors.
pub async fn record<C: ConnectionTrait>(
    db: &C,
    event: &str,
    user_id: &str,
    details: serde_json::Value,
    meta: &RequestMeta,
) {
    let row = security_log::ActiveModel {
        event: Set(event.to_string()),
        user_id: Set(user_id.to_string()),
        details: Set(details),
        ip: Set(meta.ip.clone()),
        user_agent: Set(meta.user_agent.clone()),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };

    match row.insert(db).await {
        Ok(_) => tracing::debug!(event, user_id, "Recorded security event"),
        Err(e) => tracing::error!(event, user_id, "Failed to record security event: {}", e),
    }
}

/// Retrieves security events newest first with their severity.
pub async fn list_logs(db: &DatabaseConnection, query: &LogQuery) -> Result<Page<LogEntry>> {
    let mut condition = Condition::all();
    if let Some(event_type) = query.event_type.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(SecurityLogColumn::Event.eq(event_type));
    }
    if let Some(term) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(SecurityLogColumn::Event.contains(term))
                .add(SecurityLogColumn::UserId.contains(term))
                .add(SecurityLogColumn::Ip.contains(term)),
        );
    }

    let total = SecurityLog::find()
        .filter(condition.clone())
        .count(db)
        .await?;
    let rows = SecurityLog::find()
        .filter(condition)
        .order_by_desc(SecurityLogColumn::CreatedAt)
        .order_by_desc(SecurityLogColumn::Id)
        .limit(query.limit)
        .offset(query.offset)
        .all(db)
        .await?;

    let data = rows
        .into_iter()
        .map(|log| LogEntry {
            severity: Severity::of(&log.event),
            log,
        })
        .collect();
    Ok(Page { data, total })
}

/// Deletes a log row and records the deletion.
///
/// # Errors
/// Returns `NotFound` if no row has this id.
pub async fn delete_log(
    db: &DatabaseConnection,
    admin_id: &str,
    log_id: i64,
    meta: &RequestMeta,
) -> Result<()> {
    let result = SecurityLog::delete_by_id(log_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Security log", log_id));
    }
    record(db, events::LOG_DELETED, admin_id, json!({ "logId": log_id }), meta).await;
    Ok(())
}
