use std::{error::Error, process, sync::Arc};

use text_toolkit_mcp::{
    build_app,
    config::{Config, LogLevel},
    lifecycle::{self, SHUTDOWN_TIMEOUT},
    logging,
    mcp::{dispatcher::Dispatcher, transport::StdioTransport},
    AppState,
};
use tokio::{io::BufReader, task::JoinHandle};
use tracing::{error, info};

/// Exits explicitly so a stdin read parked on the blocking pool cannot hold
/// the process open after shutdown.
#[tokio::main]
async fn main() {
    process::exit(run().await);
}

async fn run() -> i32 {
    let config = match Config::from_env().and_then(|config| config.validate().map(|()| config)) {
        Ok(config) => config,
        Err(err) => {
            logging::init_logging(LogLevel::Info);
            error!(error = %err, "invalid configuration");
            return 1;
        }
    };
    logging::init_logging(config.log_level);
    lifecycle::install_panic_hook();

    let state = AppState::new(Arc::new(config));
    let health = if state.config.enable_health_check {
        match start_health_server(state.clone()).await {
            Ok(task) => Some(task),
            Err(err) => {
                error!(error = %err, "failed to start health check server");
                return 1;
            }
        }
    } else {
        None
    };

    let dispatcher = Dispatcher::new(state.clone());
    let mut transport = StdioTransport::new(
        dispatcher,
        tokio::io::stdout(),
        state.config.max_request_size,
    );

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        environment = state.config.environment.as_str(),
        "server starting on stdio"
    );

    let serving = tokio::spawn(async move {
        let shutdown = async {
            let signal = lifecycle::shutdown_signal().await;
            info!(signal, "received termination signal");
        };
        let stopped = transport
            .run(BufReader::new(tokio::io::stdin()), shutdown)
            .await;
        (transport, stopped)
    });

    let joined = tokio::select! {
        joined = serving => joined,
        message = lifecycle::background_panic(health) => {
            error!(error = %message, "health check server panicked");
            return 1;
        }
    };
    let (transport, stopped) = match joined {
        Ok(outcome) => outcome,
        Err(join_error) => {
            error!(error = %join_error, "transport task failed");
            return 1;
        }
    };

    match stopped {
        Ok(reason) => {
            info!(reason = ?reason, "transport stopped, draining in-flight requests");
            lifecycle::close_with_timeout(transport.close(), SHUTDOWN_TIMEOUT).await
        }
        Err(err) => {
            error!(error = %err, "transport failed");
            1
        }
    }
}

async fn start_health_server(state: AppState) -> Result<JoinHandle<()>, Box<dyn Error>> {
    let port = state.config.health_port()?;
    let listener = tokio::net::TcpListener::bind((state.config.host.as_str(), port)).await?;

    info!(host = %state.config.host, port, "health check server listening");

    let app = build_app(state);
    Ok(tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app.into_make_service()).await {
            error!(error = %err, "health check server stopped");
        }
    }))
}
