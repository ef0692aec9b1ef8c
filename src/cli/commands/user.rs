use anyhow::{bail, Context};
use tracing::{info, warn};

use crate::auth::password::hash_password;
use crate::auth::principal::{is_known_permission, KNOWN_PERMISSIONS};
use crate::cli::OutputFormat;
use crate::config::SecurityConfig;
use crate::database::models::NewUser;
use crate::database::{CatalogStore, DatabaseManager, PgStore};

pub async fn handle(
    username: String,
    password: String,
    staff: bool,
    permissions: Vec<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let new = build_user(username, &password, staff, permissions, config.security.password_cost)?;

    if config.database.url.is_none() {
        bail!("DATABASE_URL must be set to create users; the in-memory store takes its staff account from CATALOG_ADMIN_USERNAME and CATALOG_ADMIN_PASSWORD");
    }
    let store = PgStore::new(DatabaseManager::connect(&config.database).await?);
    store.migrate().await?;

    let user = store
        .insert_user(new)
        .await
        .context("failed to create user")?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
        OutputFormat::Text => println!(
            "Created user {} (id {}, staff: {}, permissions: {})",
            user.username,
            user.id,
            user.is_staff,
            if user.permissions.is_empty() { "-".to_string() } else { user.permissions.join(", ") }
        ),
    }
    Ok(())
}

/// Seed the configured staff account into a fresh store. Without one the
/// store has no users and every write is rejected.
pub async fn bootstrap_admin(store: &dyn CatalogStore, security: &SecurityConfig) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (&security.admin_username, &security.admin_password) else {
        warn!("No CATALOG_ADMIN_USERNAME configured, catalog is read-only until a user exists");
        return Ok(());
    };
    if store.find_user_by_username(username.trim()).await?.is_some() {
        return Ok(());
    }

    let new = build_user(username.clone(), password, true, Vec::new(), security.password_cost)?;
    let user = store
        .insert_user(new)
        .await
        .context("failed to seed admin user")?;
    info!(id = user.id, username = %user.username, "seeded staff user");
    Ok(())
}

fn build_user(
    username: String,
    password: &str,
    staff: bool,
    mut permissions: Vec<String>,
    cost: u32,
) -> anyhow::Result<NewUser> {
    if username.trim().is_empty() {
        bail!("username may not be blank");
    }
    if password.is_empty() {
        bail!("password may not be blank");
    }
    if let Some(unknown) = permissions.iter().find(|p| !is_known_permission(p)) {
        bail!("unknown permission '{}', expected one of: {}", unknown, KNOWN_PERMISSIONS.join(", "));
    }
    permissions.sort();
    permissions.dedup();

    Ok(NewUser {
        username: username.trim().to_string(),
        password_hash: hash_password(password, cost).context("failed to hash password")?,
        is_staff: staff,
        is_active: true,
        permissions,
    })
}
