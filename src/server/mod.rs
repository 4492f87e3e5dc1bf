//! HTTP server for the chat front end.
//!
//! Provides JSON endpoints for:
//! - Chat relay to the local LLM runtime
//! - Model listing and runtime status/start
//! - Saving and listing conversation transcripts
//! - Shutting the server down from the browser

pub mod error;
pub mod routes;
pub mod shutdown;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use shutdown::ShutdownScheduler;
pub use state::AppState;

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Start the HTTP server and run until shutdown is requested or Ctrl+C is pressed.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn run_server(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let stop = state.shutdown.wait();
    let signal = async move {
        tokio::select! {
            () = stop => {}
            () = ctrl_c() => tracing::info!("Interrupt received"),
        }
    };
    run_server_with_shutdown(state, signal).await
}

/// Start the HTTP server with graceful shutdown support.
///
/// The server will stop accepting new connections when `shutdown_signal` completes,
/// and stops waiting for in-flight requests after the configured drain timeout.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(Arc::clone(&state));

    let addr = state.config.bind_addr().await?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Starting Local LLM Chat on http://{}", addr);
    tracing::info!("Conversations will be saved to: {}", state.store.dir().display());

    serve_with_drain_limit(listener, app, shutdown_signal, state.config.drain_timeout).await?;

    // A shutdown scheduled but not yet fired dies with the server.
    state.shutdown.cancel().await;
    tracing::info!("Server stopped");
    Ok(())
}

/// Router with the HTTP tracing layer applied.
///
/// No CORS headers are sent: the chat page is served from the same origin, and
/// other sites must not read saved conversations.
pub fn build_app(state: Arc<AppState>) -> Router {
    create_router(state).layer(TraceLayer::new_for_http())
}

/// Serve `app` until `shutdown_signal` fires, then drain for at most `drain_timeout`.
async fn serve_with_drain_limit<F>(
    listener: TcpListener,
    app: Router,
    shutdown_signal: F,
    drain_timeout: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (fired_tx, fired_rx) = tokio::sync::oneshot::channel::<()>();
    let signal = async move {
        shutdown_signal.await;
        fired_tx.send(()).ok();
    };

    let deadline = async move {
        if fired_rx.await.is_ok() {
            tokio::time::sleep(drain_timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();

    tokio::select! {
        result = server => result,
        () = deadline => {
            tracing::warn!(
                "Requests still running {}s after shutdown; closing them",
                drain_timeout.as_secs()
            );
            Ok(())
        }
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::lifecycle::ServiceProbe;
    use crate::llm::LlmClient;
    use crate::storage::TranscriptStore;

    #[tokio::test]
    async fn test_foreign_origin_gets_no_cors_grant() {
        let dir = tempfile::tempdir().unwrap();
        let llm = LlmClient::new().unwrap();
        let probe = ServiceProbe::new(llm.clone());
        let store = TranscriptStore::open(dir.path()).unwrap();
        let state = AppState::from_parts(AppConfig::new(), llm, probe, store);

        let request = Request::get("/api/conversations")
            .header(header::ORIGIN, "http://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = build_app(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_drain_is_bounded_after_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "late"
            }),
        );

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_with_drain_limit(
            listener,
            app,
            async move {
                stop_rx.await.ok();
            },
            Duration::from_millis(200),
        ));

        let client = tokio::spawn(async move { reqwest::get(format!("http://{addr}/slow")).await });
        tokio::time::sleep(Duration::from_millis(200)).await;
        stop_tx.send(()).unwrap();

        let finished = tokio::time::timeout(Duration::from_secs(5), server).await;
        assert!(finished.unwrap().unwrap().is_ok());
        client.abort();
    }
}
