//! Process signal handling.

use crate::domain::error::Interrupt;

/// Resolves when SIGINT or SIGTERM arrives.
///
/// If a handler cannot be installed that signal is simply not watched; the
/// default disposition still terminates the process.
pub async fn shutdown_signal() -> Interrupt {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::debug!(error = %e, "cannot watch SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => Interrupt::Interrupt,
        () = terminate => Interrupt::Terminate,
    }
}
