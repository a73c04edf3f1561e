use tracing_subscriber::EnvFilter;

use framegate::{app::AppState, config::Config, routes, webserver};

#[tokio::main]
async fn main() -> std::process::ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("framegate=info")),
		)
		.init();

	let config = match Config::from_env() {
		Ok(config) => config,
		Err(err) => {
			eprintln!("Configuration error: {}", err);
			return std::process::ExitCode::FAILURE;
		}
	};

	let state = match AppState::new(config) {
		Ok(state) => state,
		Err(err) => {
			eprintln!("Startup error: {}", err);
			return std::process::ExitCode::FAILURE;
		}
	};

	let router = routes::init(state.clone());
	if let Err(err) = webserver::serve(state, router).await {
		eprintln!("Server error: {}", err);
		return std::process::ExitCode::FAILURE;
	}
	std::process::ExitCode::SUCCESS
}

// vim: ts=4
