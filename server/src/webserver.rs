// Webserver implementation

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

use crate::prelude::*;

/// Bind the listener and serve until a shutdown signal arrives. The
/// sweeper starts once the listener is up and is stopped on drain so no
/// timers outlive the server.
pub async fn serve(state: App, router: Router) -> FgResult<()> {
	let listener = TcpListener::bind(state.opts.listen.as_ref()).await?;
	info!("Listening on {}", state.opts.listen);

	state.sweeper.start();

	let shutdown_state = state.clone();
	axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	shutdown_state.sweeper.shutdown().await;
	info!("Server stopped");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			error!("Failed to install Ctrl+C handler: {}", err);
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut sig) => {
				sig.recv().await;
			}
			Err(err) => error!("Failed to install SIGTERM handler: {}", err),
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
	info!("Shutdown signal received");
}

// vim: ts=4
