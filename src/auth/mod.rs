//! Credential authentication - Registration, login and session tokens.

pub mod password;
pub mod token;

use crate::{
    config::AppConfig,
    core::{RequestMeta, security_log, settings, user, validation},
    entities::UserModel,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// A signed session token and the user it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: UserModel,
}

fn issue(config: &AppConfig, user: UserModel) -> Result<Session> {
    let token = token::create_token(
        &user.id,
        &user.email,
        &user.role,
        &config.secrets.jwt_secret,
        config.auth.token_lifetime_hours,
    )?;
    Ok(Session { token, user })
}

/// Creates a customer account with a password and signs it in.
///
/// # Errors
/// Returns a validation error when registrations are closed, the email is
/// malformed or already registered, or the password is too short.
pub async fn register(
    db: &DatabaseConnection,
    config: &AppConfig,
    email: &str,
    password: &str,
    name: Option<&str>,
    meta: &RequestMeta,
) -> Result<Session> {
    if !settings::allow_registrations(db).await? {
        return Err(Error::validation("Registrations are currently closed"));
    }
    let email = validation::sanitize_email(email);
    if !validation::is_valid_email(&email) {
        return Err(Error::validation("Invalid email address"));
    }
    password::check_password_strength(password)?;
    if user::find_by_email(db, &email).await?.is_some() {
        return Err(Error::validation("Email is already registered"));
    }

    let name = name
        .map(|n| validation::clean_text("Name", n))
        .transpose()?
        .filter(|n| !n.is_empty());

    let hash = password::hash_password(password)?;
    let created = user::create_credential_user(db, &email, hash, name)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                Error::validation("Email is already registered")
            } else {
                e
            }
        })?;

    tracing::info!(user_id = %created.id, "User registered");
    security_log::record(
        db,
        security_log::events::USER_REGISTERED,
        &created.id,
        json!({ "email": created.email }),
        meta,
    )
    .await;
    issue(config, created)
}

/// Verifies an email and password and returns a new session.
///
/// # Errors
/// Returns `Unauthorized` for an unknown email, a user without a password
/// or a wrong password.
pub async fn login(
    db: &DatabaseConnection,
    config: &AppConfig,
    email: &str,
    password: &str,
    meta: &RequestMeta,
) -> Result<Session> {
    let email = validation::sanitize_email(email);
    let found = user::find_by_email(db, &email).await?;

    let verified = match &found {
        Some(u) => user::credential_account(db, &u.id)
            .await?
            .and_then(|acc| acc.password)
            .is_some_and(|hash| password::verify_password(password, &hash)),
        None => false,
    };

    match found {
        Some(u) if verified => {
            security_log::record(
                db,
                security_log::events::LOGIN_SUCCESS,
                &u.id,
                json!({ "email": u.email }),
                meta,
            )
            .await;
            issue(config, u)
        }
        other => {
            let user_id = other.map_or_else(|| security_log::ANONYMOUS.to_string(), |u| u.id);
            tracing::warn!(%user_id, "Failed login attempt");
            security_log::record(
                db,
                security_log::events::LOGIN_FAILED,
                &user_id,
                json!({ "email": email }),
                meta,
            )
            .await;
            Err(Error::unauthorized(INVALID_CREDENTIALS))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::security_log::{LogQuery, events, list_logs};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_register_then_login() -> Result<()> {
        let db = setup_test_db().await?;
        let config = test_config();
        let meta = RequestMeta::default();

        let session = register(&db, &config, " New@Example.com ", "password-1", Some("New"), &meta).await?;
        assert_eq!(session.user.email, "new@example.com");
        assert_eq!(session.user.role, "user");
        let claims = token::verify_token(&session.token, &config.secrets.jwt_secret)?;
        assert_eq!(claims.sub, session.user.id);

        let again = login(&db, &config, "new@example.com", "password-1", &meta).await?;
        assert_eq!(again.user.id, session.user.id);

        let logs = list_logs(&db, &LogQuery::default()).await?;
        assert_eq!(logs.data[0].log.event, events::LOGIN_SUCCESS);
        assert_eq!(logs.data[1].log.event, events::USER_REGISTERED);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_rules() -> Result<()> {
        let db = setup_test_db().await?;
        let config = test_config();
        let meta = RequestMeta::default();

        for (email, pass) in [("bad-email", "password-1"), ("ok@example.com", "short")] {
            assert!(matches!(
                register(&db, &config, email, pass, None, &meta).await,
                Err(Error::Validation { .. })
            ));
        }

        register(&db, &config, "ok@example.com", "password-1", None, &meta).await?;
        assert!(matches!(
            register(&db, &config, "OK@example.com", "password-2", None, &meta).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_register_closed() -> Result<()> {
        let db = setup_test_db().await?;
        let closed = settings::SiteSettings {
            allow_registrations: false,
            ..settings::SiteSettings::default()
        };
        settings::update_settings(&db, "admin", closed, &RequestMeta::default()).await?;

        let result = register(
            &db,
            &test_config(),
            "new@example.com",
            "password-1",
            None,
            &RequestMeta::default(),
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_login_failures_are_recorded() -> Result<()> {
        let db = setup_test_db().await?;
        let config = test_config();
        let meta = RequestMeta::default();
        let user = create_test_user(&db, "jane@example.com").await?;

        assert!(matches!(
            login(&db, &config, "jane@example.com", "wrong-password", &meta).await,
            Err(Error::Unauthorized { .. })
        ));
        assert!(matches!(
            login(&db, &config, "ghost@example.com", TEST_PASSWORD, &meta).await,
            Err(Error::Unauthorized { .. })
        ));

        let failed = LogQuery {
            event_type: Some(events::LOGIN_FAILED.to_string()),
            ..LogQuery::default()
        };
        let logs = list_logs(&db, &failed).await?;
        assert_eq!(logs.total, 2);
        assert_eq!(logs.data[0].log.user_id, security_log::ANONYMOUS);
        assert_eq!(logs.data[1].log.user_id, user.id);

        login(&db, &config, "jane@example.com", TEST_PASSWORD, &meta).await?;
        Ok(())
    }
}
