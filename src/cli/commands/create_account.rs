use anyhow::{Context, Result};
use model::entities::account::{AccountStatus, Role};
use sea_orm::ActiveEnum;
use tracing::{info, trace};

use super::initdb::connect;
use crate::config::{Settings, build_app_state};
use crate::services::directory::NewAccount;

/// Fields for an account created from the command line.
pub struct NewAccountArgs {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
    pub designation: String,
}

pub async fn create_account(settings: &Settings, args: NewAccountArgs) -> Result<()> {
    trace!("Entering create_account function");

    let role = Role::try_from_value(&args.role.trim().to_lowercase())
        .map_err(|_| anyhow::anyhow!("Unknown role '{}', expected admin, founder or user", args.role))?;
    if role == Role::Guest {
        anyhow::bail!("Guest sessions do not have accounts");
    }

    let db = connect(&settings.database_url).await?;
    let state = build_app_state(db, settings)?;

    let password_hash = state.hasher.hash(&args.password).await?;
    let account = state
        .directory
        .add(NewAccount {
            username: Some(args.username.clone()),
            email: args.email,
            password_hash: Some(password_hash),
            role,
            full_name: args.full_name,
            designation: args.designation,
            status: AccountStatus::Active,
        })
        .await
        .with_context(|| format!("Failed to create account '{}'", args.username))?;

    info!(
        "Created active {} account '{}' with ID {}",
        account.role.to_value(),
        account.username,
        account.id
    );
    println!("Created {} account '{}'", account.role.to_value(), account.username);
    Ok(())
}
