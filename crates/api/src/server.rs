//! Serving the router until shutdown.

use std::future::Future;
use std::io;
use std::sync::Arc;

use cirrus_runtime::ActionRuntime;
use tokio::net::TcpListener;

use crate::routes::router;

/// Serve `runtime` on `listener` until `shutdown` resolves.
///
/// The runtime is dropped before this returns, unless the caller kept
/// another handle, so an archive extracted by `/init` is removed on a
/// graceful stop.
pub async fn serve<F>(
    listener: TcpListener,
    runtime: Arc<ActionRuntime>,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(address) = listener.local_addr() {
        tracing::info!(%address, "server started");
    }
    axum::serve(listener, router(runtime))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on ctrl-c or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutting down");
}
