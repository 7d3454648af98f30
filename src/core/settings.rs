//! Site settings - Typed view over the `system_settings` key-value table.

use crate::{
    core::{RequestMeta, security_log, validation},
    entities::{SystemSetting, SystemSettingColumn, system_setting},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*, sea_query::OnConflict};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

pub const SITE_NAME: &str = "siteName";
pub const SITE_URL: &str = "siteUrl";
pub const MAINTENANCE_MODE: &str = "maintenanceMode";
pub const ALLOW_REGISTRATIONS: &str = "allowRegistrations";
pub const EMAIL_NOTIFICATIONS: &str = "emailNotifications";

/// Settings editable from the admin panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub site_name: String,
    pub site_url: String,
    pub maintenance_mode: bool,
    pub allow_registrations: bool,
    pub email_notifications: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "CMK".to_string(),
            site_url: "https://cmk.com".to_string(),
            maintenance_mode: false,
            allow_registrations: true,
            email_notifications: true,
        }
    }
}

impl SiteSettings {
    fn from_map(map: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        // Flags default on unless stored as "false", off unless stored as "true"
        let on_unless_false = |key: &str| map.get(key).is_none_or(|v| v != "false");
        Self {
            site_name: map.get(SITE_NAME).cloned().unwrap_or(defaults.site_name),
            site_url: map.get(SITE_URL).cloned().unwrap_or(defaults.site_url),
            maintenance_mode: map.get(MAINTENANCE_MODE).is_some_and(|v| v == "true"),
            allow_registrations: on_unless_false(ALLOW_REGISTRATIONS),
            email_notifications: on_unless_false(EMAIL_NOTIFICATIONS),
        }
    }

    fn entries(&self) -> [(&'static str, String); 5] {
        [
            (SITE_NAME, self.site_name.clone()),
            (SITE_URL, self.site_url.clone()),
            (MAINTENANCE_MODE, self.maintenance_mode.to_string()),
            (ALLOW_REGISTRATIONS, self.allow_registrations.to_string()),
            (EMAIL_NOTIFICATIONS, self.email_notifications.to_string()),
        ]
    }
}

/// Reads the settings, falling back to defaults for missing keys.
pub async fn get_settings<C: ConnectionTrait>(conn: &C) -> Result<SiteSettings> {
    let map: HashMap<String, String> = SystemSetting::find()
        .all(conn)
        .await?
        .into_iter()
        .map(|row| (row.key, row.value))
        .collect();
    Ok(SiteSettings::from_map(&map))
}

/// Whether new accounts may be registered.
pub async fn allow_registrations<C: ConnectionTrait>(conn: &C) -> Result<bool> {
    let row = SystemSetting::find()
        .filter(SystemSettingColumn::Key.eq(ALLOW_REGISTRATIONS))
        .one(conn)
        .await?;
    Ok(row.is_none_or(|r| r.value != "false"))
}

/// Validates and stores every setting, recording `SETTINGS_UPDATE`.
///
/// # Errors
/// Returns a validation error when the site name is empty or longer than
/// 255 characters, or the site URL is not a valid URL.
pub async fn update_settings(
    db: &DatabaseConnection,
    admin_id: &str,
    settings: SiteSettings,
    meta: &RequestMeta,
) -> Result<SiteSettings> {
    let settings = SiteSettings {
        site_name: settings.site_name.trim().to_string(),
        site_url: settings.site_url.trim().to_string(),
        ..settings
    };
    validation::check_length("Site name", &settings.site_name, 1, 255)?;
    if !validation::is_valid_url(&settings.site_url) {
        return Err(Error::validation("Site URL must be a valid URL"));
    }

    let now = chrono::Utc::now().naive_utc();
    for (key, value) in settings.entries() {
        let row = system_setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            updated_by: Set(Some(admin_id.to_string())),
            updated_at: Set(now),
            ..Default::default()
        };
        SystemSetting::insert(row)
            .on_conflict(
                OnConflict::column(SystemSettingColumn::Key)
                    .update_columns([
                        SystemSettingColumn::Value,
                        SystemSettingColumn::UpdatedBy,
                        SystemSettingColumn::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(db)
            .await?;
    }

    tracing::info!(admin_id, "Site settings updated");
    security_log::record(
        db,
        security_log::events::SETTINGS_UPDATE,
        admin_id,
        json!(settings),
        meta,
    )
    .await;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_defaults_when_empty() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(get_settings(&db).await?, SiteSettings::default());
        assert!(allow_registrations(&db).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let meta = RequestMeta::default();

        let empty_name = SiteSettings {
            site_name: "  ".to_string(),
            ..SiteSettings::default()
        };
        assert!(matches!(
            update_settings(&db, "admin", empty_name, &meta).await,
            Err(Error::Validation { .. })
        ));

        let bad_url = SiteSettings {
            site_url: "not a url".to_string(),
            ..SiteSettings::default()
        };
        assert!(matches!(
            update_settings(&db, "admin", bad_url, &meta).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_upserts() -> Result<()> {
        let db = setup_test_db().await?;
        let meta = RequestMeta::default();

        let closed = SiteSettings {
            site_name: "Shop".to_string(),
            allow_registrations: false,
            maintenance_mode: true,
            ..SiteSettings::default()
        };
        update_settings(&db, "admin-1", closed.clone(), &meta).await?;
        assert_eq!(get_settings(&db).await?, closed);
        assert!(!allow_registrations(&db).await?);

        update_settings(&db, "admin-2", SiteSettings::default(), &meta).await?;
        assert_eq!(get_settings(&db).await?, SiteSettings::default());
        assert_eq!(SystemSetting::find().count(&db).await?, 5);

        let row = SystemSetting::find()
            .filter(SystemSettingColumn::Key.eq(SITE_NAME))
            .one(&db)
            .await?;
        assert_eq!(row.and_then(|r| r.updated_by).as_deref(), Some("admin-2"));
        Ok(())
    }
}
