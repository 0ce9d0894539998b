use anyhow::Result;
use tracing::{debug, error, info, trace};

use super::initdb::{connect, run_migrations};
use super::serve::run_server;
use crate::config::{Settings, build_app_state};

pub async fn migrate_and_serve(settings: &Settings) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");

    let db = connect(&settings.database_url).await?;
    run_migrations(&db).await?;

    // Reuse the migrated connection; an in-memory database would be lost otherwise
    let state = match build_app_state(db, settings) {
        Ok(state) => {
            debug!("Application state initialized successfully");
            state
        }
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };

    run_server(state, settings).await
}
