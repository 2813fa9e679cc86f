//! Process signal handling
//!
//! Consumers block in a synchronous poll loop, so signals are awaited on a
//! dedicated thread running a current-thread tokio runtime. A received
//! signal only cancels the [`ShutdownToken`]; the consume loop observes it
//! between polls and stops.

use std::io;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::domain::ShutdownToken;

/// Cancel `token` on SIGINT or SIGTERM (ctrl-c elsewhere).
///
/// The handlers are installed before this returns, so a signal sent
/// afterwards always reaches the token.
pub fn listen_for_signals(token: ShutdownToken) -> io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let signals = {
        let _context = runtime.enter();
        Signals::install()?
    };

    thread::Builder::new()
        .name("courier-signals".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                match signals.recv().await {
                    Ok(()) => {
                        info!("shutdown signal received");
                        token.cancel();
                    }
                    Err(e) => warn!(error = %e, "waiting for shutdown signal failed"),
                }
            });
        })
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(mut self) -> io::Result<()> {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
        }
        Ok(())
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn install() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(self) -> io::Result<()> {
        tokio::signal::ctrl_c().await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::process::Command;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn test_terminate_signal_cancels_token() {
        let token = ShutdownToken::new();
        let listener = listen_for_signals(token.clone()).unwrap();
        assert!(!token.is_cancelled());

        let status = Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let deadline = Instant::now() + Duration::from_secs(5);
        while !token.is_cancelled() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(token.is_cancelled());
        listener.join().unwrap();
    }
}
