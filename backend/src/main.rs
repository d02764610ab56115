//! Backend entry-point: loads settings and the case catalogue, prepares the
//! record store and serves the REST API.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use casedesk::inbound::http::health::HealthState;
use casedesk::inbound::http::session_config::fingerprint::key_fingerprint;
use casedesk::inbound::http::session_config::{BuildMode, session_settings_from_env};
use casedesk::outbound::catalogue_file::load_catalogue;
use casedesk::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use casedesk::settings::AppSettings;

use server::{ServerConfig, create_server};

fn init_tracing() {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}

async fn connect_database(url: &str) -> Result<DbPool> {
    run_pending_migrations(url)
        .await
        .wrap_err("failed to apply database migrations")?;
    DbPool::new(PoolConfig::new(url))
        .await
        .wrap_err("failed to build database pool")
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let settings =
        AppSettings::load().map_err(|err| eyre!("failed to load configuration: {err}"))?;
    let admin = settings
        .admin_username()
        .wrap_err("invalid admin username")?;
    let catalogue_path = settings.catalogue_path();
    let catalogue =
        load_catalogue(&catalogue_path, &admin).wrap_err("failed to load case catalogue")?;

    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .wrap_err("invalid session configuration")?;
    info!(
        fingerprint = %key_fingerprint(&session.key),
        cookie_secure = session.cookie_secure,
        same_site = ?session.same_site,
        "session key loaded"
    );

    let policy = settings.policy();
    let mut config = ServerConfig::new(
        session.key,
        session.cookie_secure,
        session.same_site,
        settings.bind_addr(),
        Arc::new(catalogue),
    )
    .with_policy(policy);
    if let Some(url) = settings.database_url() {
        config = config.with_db_pool(connect_database(url).await?);
    }

    let bind_addr = config.bind_addr();
    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    info!(
        %bind_addr,
        two_pass = policy.two_pass(),
        completion_rule = ?policy.completion_rule,
        "casedesk listening"
    );
    server.await?;
    Ok(())
}
