//! Process lifecycle: termination signals, bounded close, panic reporting

use std::{future::Future, panic, time::Duration};

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::errors::error_message;

pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves with the name of the first termination signal received.
pub async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Runs `close` under `timeout` and maps the outcome to a process exit code.
pub async fn close_with_timeout<F, E>(close: F, timeout: Duration) -> i32
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout, close).await {
        Ok(Ok(())) => {
            info!("shutdown complete");
            0
        }
        Ok(Err(err)) => {
            error!(error = %err, "error during shutdown");
            1
        }
        Err(_) => {
            error!(timeout_ms = timeout.as_millis() as u64, "shutdown timed out");
            1
        }
    }
}

/// Resolves with the panic message if the watched background task panics.
/// A task that finishes or is cancelled leaves this pending forever.
pub async fn background_panic(task: Option<JoinHandle<()>>) -> String {
    if let Some(task) = task {
        if let Err(join_error) = task.await {
            if join_error.is_panic() {
                return error_message(join_error.into_panic().as_ref());
            }
        }
    }
    std::future::pending().await
}

/// Routes panic reports through `tracing` so they reach stderr with the rest
/// of the log. Panics inside request tasks are still caught by their join
/// handles; whether a panic is fatal is decided by whoever observes it.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let message = error_message(info.payload());
        let location = info
            .location()
            .map(|location| format!("{}:{}", location.file(), location.line()))
            .unwrap_or_default();
        error!(error = %message, location = %location, "panic");
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clean_close_exits_zero() {
        let code = close_with_timeout(async { Ok::<(), String>(()) }, Duration::from_secs(1)).await;
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn failed_close_exits_one() {
        let code = close_with_timeout(
            async { Err::<(), _>("writer closed".to_string()) },
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn background_panic_reports_the_message() {
        let task = tokio::spawn(async { panic!("health server exploded") });
        let message = background_panic(Some(task)).await;
        assert_eq!(message, "health server exploded");
    }

    #[tokio::test]
    async fn finished_background_task_is_not_a_panic() {
        let task = tokio::spawn(async {});
        let watched = tokio::time::timeout(Duration::from_millis(20), background_panic(Some(task)));
        assert!(watched.await.is_err());

        let unwatched = tokio::time::timeout(Duration::from_millis(20), background_panic(None));
        assert!(unwatched.await.is_err());
    }

    #[tokio::test]
    async fn stalled_close_times_out() {
        let code = close_with_timeout(
            std::future::pending::<Result<(), String>>(),
            Duration::from_millis(10),
        )
        .await;
        assert_eq!(code, 1);
    }
}
