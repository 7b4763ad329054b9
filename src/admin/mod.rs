//! Admin HTTP surface.
//!
//! ```text
//! GET /ready          200 once synced, 503 before
//! GET /status         table sizes, list count, readiness
//! GET /locate/{ip}    location label for one address
//! ```

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use self::handlers::*;
use crate::lifecycle::Shutdown;
use crate::routing::RoutingTable;
use crate::source::PrefixListAdapter;

#[derive(Clone)]
pub struct AdminState {
    pub table: Arc<RoutingTable>,
    pub adapter: Arc<PrefixListAdapter>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/ready", get(get_ready))
        .route("/status", get(get_status))
        .route("/locate/{ip}", get(get_locate))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the admin router until `shutdown` fires.
pub async fn serve(listener: TcpListener, state: AdminState, shutdown: Shutdown) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin server starting");

    let mut signal = shutdown.subscribe();
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = signal.recv().await;
        })
        .await?;

    tracing::info!("Admin server stopped");
    Ok(())
}
