//! Email template business logic - CRUD for editable email bodies.

use crate::{
    core::{RequestMeta, security_log, validation},
    entities::{EmailTemplate, EmailTemplateColumn, EmailTemplateModel, email_template},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Purposes a template can serve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    OrderConfirmation,
    PasswordReset,
    Welcome,
    #[default]
    Custom,
}

impl TemplateKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderConfirmation => "order_confirmation",
            Self::PasswordReset => "password_reset",
            Self::Welcome => "welcome",
            Self::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub subject: String,
    pub body: String,
    #[serde(default, rename = "type")]
    pub kind: TemplateKind,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TemplateKind>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim().to_string();
    validation::check_min_length(field, &trimmed, 1)?;
    Ok(trimmed)
}

/// Lists templates ordered by name, optionally of one kind.
pub async fn list_templates(
    db: &DatabaseConnection,
    kind: Option<TemplateKind>,
) -> Result<Vec<EmailTemplateModel>> {
    let mut query = EmailTemplate::find().order_by_asc(EmailTemplateColumn::Name);
    if let Some(kind) = kind {
        query = query.filter(EmailTemplateColumn::Kind.eq(kind.as_str()));
    }
    query.all(db).await.map_err(Into::into)
}

/// Retrieves a template by id.
///
/// # Errors
/// Returns `NotFound` if the template does not exist.
pub async fn get_template(db: &DatabaseConnection, id: i64) -> Result<EmailTemplateModel> {
    EmailTemplate::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Email template", id))
}

pub async fn create_template(
    db: &DatabaseConnection,
    admin_id: &str,
    new: NewTemplate,
    meta: &RequestMeta,
) -> Result<EmailTemplateModel> {
    let name = required("Name", &new.name)?;
    let subject = required("Subject", &new.subject)?;
    let body = required("Body", &new.body)?;
    let now = chrono::Utc::now().naive_utc();

    let created = email_template::ActiveModel {
        name: Set(name),
        subject: Set(subject),
        body: Set(body),
        kind: Set(new.kind.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    security_log::record(
        db,
        security_log::events::EMAIL_TEMPLATE_CREATED,
        admin_id,
        json!({ "templateId": created.id, "name": created.name }),
        meta,
    )
    .await;
    Ok(created)
}

pub async fn update_template(
    db: &DatabaseConnection,
    admin_id: &str,
    id: i64,
    patch: TemplatePatch,
    meta: &RequestMeta,
) -> Result<EmailTemplateModel> {
    let existing = get_template(db, id).await?;
    let mut active: email_template::ActiveModel = existing.into();

    if let Some(name) = patch.name {
        active.name = Set(required("Name", &name)?);
    }
    if let Some(subject) = patch.subject {
        active.subject = Set(required("Subject", &subject)?);
    }
    if let Some(body) = patch.body {
        active.body = Set(required("Body", &body)?);
    }
    if let Some(kind) = patch.kind {
        active.kind = Set(kind.as_str().to_string());
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = active.update(db).await?;

    security_log::record(
        db,
        security_log::events::EMAIL_TEMPLATE_UPDATED,
        admin_id,
        json!({ "templateId": id }),
        meta,
    )
    .await;
    Ok(updated)
}

pub async fn delete_template(
    db: &DatabaseConnection,
    admin_id: &str,
    id: i64,
    meta: &RequestMeta,
) -> Result<()> {
    let result = EmailTemplate::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Email template", id));
    }
    security_log::record(
        db,
        security_log::events::EMAIL_TEMPLATE_DELETED,
        admin_id,
        json!({ "templateId": id }),
        meta,
    )
    .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn welcome() -> NewTemplate {
        NewTemplate {
            name: "Welcome".to_string(),
            subject: "Hello".to_string(),
            body: "Thanks for joining".to_string(),
            kind: TemplateKind::Welcome,
        }
    }

    #[tokio::test]
    async fn test_template_crud() -> Result<()> {
        let db = setup_test_db().await?;
        let meta = RequestMeta::default();

        let created = create_template(&db, "admin", welcome(), &meta).await?;
        let custom = NewTemplate {
            name: "Promo".to_string(),
            kind: TemplateKind::default(),
            ..welcome()
        };
        create_template(&db, "admin", custom, &meta).await?;

        assert_eq!(list_templates(&db, None).await?.len(), 2);
        let welcomes = list_templates(&db, Some(TemplateKind::Welcome)).await?;
        assert_eq!(welcomes.len(), 1);
        assert_eq!(welcomes[0].id, created.id);

        let patch = TemplatePatch {
            subject: Some("Welcome aboard".to_string()),
            ..TemplatePatch::default()
        };
        let updated = update_template(&db, "admin", created.id, patch, &meta).await?;
        assert_eq!(updated.subject, "Welcome aboard");
        assert_eq!(updated.body, "Thanks for joining");

        delete_template(&db, "admin", created.id, &meta).await?;
        assert!(matches!(
            get_template(&db, created.id).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            delete_template(&db, "admin", created.id, &meta).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_template_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let meta = RequestMeta::default();
        let blank = NewTemplate {
            subject: " ".to_string(),
            ..welcome()
        };
        assert!(matches!(
            create_template(&db, "admin", blank, &meta).await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            update_template(&db, "admin", 42, TemplatePatch::default(), &meta).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
