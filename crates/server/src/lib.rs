use std::sync::Arc;

use axum::Router;
use db::{
    DBService,
    store::{MemoryStore, ProcedureStore, SqliteStore},
};
use services::services::procedures::ProcedureService;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::{BoardConfig, StoreKind};

pub mod config;
pub mod error;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    procedures: ProcedureService,
}

impl AppState {
    pub fn new(store: Arc<dyn ProcedureStore>) -> Self {
        Self {
            procedures: ProcedureService::new(store),
        }
    }

    pub fn procedures(&self) -> &ProcedureService {
        &self.procedures
    }
}

pub async fn open_store(config: &BoardConfig) -> anyhow::Result<Arc<dyn ProcedureStore>> {
    let store: Arc<dyn ProcedureStore> = match config.store {
        StoreKind::Sqlite => Arc::new(SqliteStore::new(DBService::new(&config.database_url).await?)),
        StoreKind::Memory => Arc::new(MemoryStore::new()),
    };
    info!(store = %config.store, "store ready");
    Ok(store)
}

pub fn app(state: AppState) -> Router {
    routes::router(&state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "procedure board listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
