//! Bootstrap administrator initialization.

use anyhow::{Context, Result};
use folio_core::config::AdminConfig;
use folio_core::password::hash_secret;
use folio_core::user::{validate_email, validate_user_name};
use folio_core::{MembershipLevel, UserStatus};
use folio_store::BlogStore;
use folio_store::models::UserRow;
use folio_store::repos::UserRepo;
use time::OffsetDateTime;
use uuid::Uuid;

/// What [`ensure_admin_user`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminBootstrap {
    /// A new administrator account was created.
    Created,
    /// An existing account was promoted (and re-enabled).
    Promoted,
    /// The account already was an active administrator.
    Unchanged,
}

/// Ensure the configured administrator exists.
///
/// Creates the account with the configured password when missing. An existing
/// account keeps its password; it is only granted the admin flag and
/// re-activated.
pub async fn ensure_admin_user(
    store: &dyn BlogStore,
    config: &AdminConfig,
) -> Result<AdminBootstrap> {
    let email = validate_email(&config.email).context("invalid admin.email")?;
    let now = OffsetDateTime::now_utc();

    if let Some(mut existing) = store.get_user_by_email(&email).await? {
        if existing.is_admin && existing.status().is_active() {
            tracing::debug!(user_id = %existing.id, "Admin account already exists");
            return Ok(AdminBootstrap::Unchanged);
        }

        existing.is_admin = true;
        existing.status = UserStatus::Active.as_str().to_string();
        existing.updated_at = now;
        store.update_user(&existing).await?;
        tracing::info!(user_id = %existing.id, "Existing account promoted to administrator");
        return Ok(AdminBootstrap::Promoted);
    }

    let name = validate_user_name(&config.name).context("invalid admin.name")?;
    let password_hash = hash_secret(&config.password).context("failed to hash admin password")?;

    let user = UserRow {
        id: Uuid::new_v4(),
        email,
        password_hash,
        name,
        avatar: None,
        is_admin: true,
        membership_level: MembershipLevel::default().as_str().to_string(),
        status: UserStatus::Active.as_str().to_string(),
        last_login_at: None,
        created_at: now,
        updated_at: now,
    };

    store.create_user(&user).await?;
    tracing::info!(user_id = %user.id, "Administrator account created");

    Ok(AdminBootstrap::Created)
}
