//! Demo server: loads picker config, fills columns from the database, mounts the picker routes.
//!
//! Run from repo root: `cargo run -p record-select-demo`
//! Env: DATABASE_URL, CONFIG_PATH (default `example_consumer/picker.yaml`), BIND_ADDR (default `127.0.0.1:3000`).

use axum::Router;
use record_select::{
    common_routes, introspect_columns, load_from_path, picker_routes, resolve, AppState, BindValue, Condition,
    HookTable, PgRecordStore,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("record_select=info,record_select_demo=info")),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/record_select".into());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "example_consumer/picker.yaml".into());
    let mut config = load_from_path(&config_path).await?;
    introspect_columns(&pool, &mut config).await?;

    let hooks = HookTable::new()
        .with_notify("log_selection", |record| {
            tracing::info!(record = %record, "user picked");
            Ok(())
        })
        .with_conditions("active_groups", || {
            vec![Condition::fragment("groups.archived = ?", vec![BindValue::Bool(false)])]
        });
    let registry = resolve(&config, &hooks)?;
    let state = AppState::new(Arc::new(PgRecordStore::new(pool)), registry);

    let app = Router::new()
        .merge(common_routes(state.clone()))
        .nest("/record_select", picker_routes(state));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("record select demo listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
