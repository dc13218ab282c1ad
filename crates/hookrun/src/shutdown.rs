//! Signal-driven cancellation for a run

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Spawn a task that cancels `token` on SIGINT or SIGTERM (Ctrl+C or
/// Ctrl+Break on Windows). The task ends once the token is cancelled.
pub fn install_signal_handlers(token: CancellationToken) {
    tokio::spawn(async move {
        let received = tokio::select! {
            () = token.cancelled() => return,
            name = wait_for_signal() => name,
        };

        let Some(signal) = received else {
            warn!("Signal handlers unavailable, run cannot be interrupted cleanly");
            return;
        };
        info!(signal, "Received signal, cancelling run");
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> Option<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let (Ok(mut sigterm), Ok(mut sigint)) = (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) else {
        return None;
    };

    tokio::select! {
        _ = sigterm.recv() => Some("SIGTERM"),
        _ = sigint.recv() => Some("SIGINT"),
    }
}

#[cfg(windows)]
async fn wait_for_signal() -> Option<&'static str> {
    use tokio::signal::windows;

    let (Ok(mut ctrl_c), Ok(mut ctrl_break)) = (windows::ctrl_c(), windows::ctrl_break()) else {
        return None;
    };

    tokio::select! {
        _ = ctrl_c.recv() => Some("Ctrl+C"),
        _ = ctrl_break.recv() => Some("Ctrl+Break"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handler_task_exits_with_the_run() {
        let token = CancellationToken::new();
        install_signal_handlers(token.clone());
        token.cancel();
        tokio::task::yield_now().await;
        assert!(token.is_cancelled());
    }
}
