use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::address;
use crate::pool::ProxyPool;

/// HTTP front end: every request, whatever its path or method, is answered
/// with one proxy address drawn from the pool.
pub struct ProxyServer {
    pool: ProxyPool,
    proxy_type: String,
}

struct AppState {
    pool: ProxyPool,
    proxy_type: String,
}

impl ProxyServer {
    pub fn new(pool: ProxyPool, proxy_type: String) -> Self {
        Self { pool, proxy_type }
    }

    pub async fn run(self, listen_addr: &str) -> Result<()> {
        let state = Arc::new(AppState {
            pool: self.pool,
            proxy_type: self.proxy_type,
        });

        let listener = tokio::net::TcpListener::bind(listen_addr).await?;
        tracing::info!("Serving proxies on http://{}", listener.local_addr()?);
        axum::serve(listener, router(state))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
        Ok(())
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(serve_proxy)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Responds with one normalized address, or a bare 500 when the pool has
/// nothing to give.
async fn serve_proxy(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let address = state.pool.take().await;
    match address::normalize(&address, &state.proxy_type) {
        Ok(proxy_url) => (StatusCode::OK, proxy_url).into_response(),
        Err(err) => {
            tracing::warn!("No proxy to serve: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
