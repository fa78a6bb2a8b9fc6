use anyhow::Context;
use axum::Router;
use axum::extract::State;
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod api;
mod app_env;
mod db;
mod domain;
mod dto;
mod external_connections;
mod logging;
mod persistence;
mod routing_utils;

/// Data shared by every request handler
pub struct SharedData {
    pub ext_cxn: persistence::ExternalConnectivity,
}

type AppState = State<Arc<SharedData>>;

/// Assembles every route in the service along with its documentation and request tracing
pub fn build_router(shared_data: Arc<SharedData>) -> Router {
    let router = Router::new()
        .merge(api::user::user_routes())
        .merge(api::team::team_routes())
        .merge(api::membership::membership_routes())
        .merge(api::team_task::team_task_routes())
        .merge(api::swagger_main::build_documentation());

    logging::attach_tracing_http(router).with_state(shared_data)
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    if dotenv().is_err() {
        println!("Starting server without .env file.");
    }
    let env_filter = logging::init_env_filter()?;
    let otel_exporters = match (
        env::var(app_env::OTEL_SPAN_EXPORT_URL),
        env::var(app_env::OTEL_METRIC_EXPORT_URL),
    ) {
        (Ok(span_url), Ok(metric_url)) => Some(logging::init_exporters(&span_url, &metric_url)?),
        _ => None,
    };
    let exporting_telemetry = otel_exporters.is_some();
    logging::setup_logging_and_tracing(env_filter, otel_exporters);
    if !exporting_telemetry {
        warn!("OpenTelemetry export URLs were not set, telemetry will only be logged locally.");
    }

    let db_url = env::var(app_env::DB_URL)
        .with_context(|| format!("reading the {} environment variable", app_env::DB_URL))?;
    let sqlx_db_connection = db::connect_sqlx(&db_url).await?;
    db::migrate(&sqlx_db_connection).await?;

    let app_state = Arc::new(SharedData {
        ext_cxn: persistence::ExternalConnectivity::new(sqlx_db_connection),
    });
    let router = build_router(app_state);

    let network_listener = TcpListener::bind("0.0.0.0:8080")
        .await
        .context("binding to port 8080")?;
    info!("Starting server.");
    axum::serve(network_listener, router.into_make_service())
        .await
        .context("serving requests")
}
