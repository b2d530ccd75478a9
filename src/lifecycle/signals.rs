//! OS signal handling.

use tokio::signal::unix::{signal, SignalKind};

/// Wait for SIGTERM or SIGINT and return the signal's name.
pub async fn wait_for_termination() -> std::io::Result<&'static str> {
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    let name = tokio::select! {
        _ = terminate.recv() => "SIGTERM",
        _ = interrupt.recv() => "SIGINT",
    };
    Ok(name)
}
