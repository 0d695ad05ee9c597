use anyhow::Result;
use tokio::signal;

/// Signals that can trigger shutdown.
enum ShutdownSignal {
    CtrlC,
    #[cfg(unix)]
    Sigterm,
}

/// Termination signal listener (Ctrl+C, SIGTERM).
///
/// The SIGTERM handler is registered on [`install`](Self::install), so the
/// process never falls back to the default action once the daemon is up.
pub struct ShutdownListener {
    #[cfg(unix)]
    sigterm: signal::unix::Signal,
}

impl ShutdownListener {
    /// # Errors
    /// Returns an error if the SIGTERM handler cannot be installed.
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        let sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
            tracing::error!(%e, "Failed to install SIGTERM handler");
            e
        })?;
        Ok(Self { sigterm })
    }

    /// # Errors
    /// Never fails on this platform.
    #[cfg(not(unix))]
    pub fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// Wait for the first termination signal.
    ///
    /// # Errors
    /// Returns an error if signal handling fails.
    pub async fn wait(mut self) -> Result<()> {
        let signal = tokio::select! {
            result = wait_ctrl_c() => result?,
            result = self.wait_sigterm() => result?,
        };

        let name = match signal {
            ShutdownSignal::CtrlC => "SIGINT",
            #[cfg(unix)]
            ShutdownSignal::Sigterm => "SIGTERM",
        };
        tracing::info!(signal = name, "shutdown signal received");
        Ok(())
    }

    #[cfg(unix)]
    async fn wait_sigterm(&mut self) -> Result<ShutdownSignal> {
        self.sigterm.recv().await;
        Ok(ShutdownSignal::Sigterm)
    }

    #[cfg(not(unix))]
    async fn wait_sigterm(&mut self) -> Result<ShutdownSignal> {
        std::future::pending::<Result<ShutdownSignal>>().await
    }
}

async fn wait_ctrl_c() -> Result<ShutdownSignal> {
    signal::ctrl_c().await.map_err(|e| {
        tracing::error!(%e, "Error handling Ctrl+C signal");
        e
    })?;
    Ok(ShutdownSignal::CtrlC)
}

/// SIGHUP stream used to request a token reload.
pub struct ReloadSignal {
    #[cfg(unix)]
    inner: signal::unix::Signal,
}

impl ReloadSignal {
    /// Install the SIGHUP handler.
    ///
    /// # Errors
    /// Returns an error if the handler cannot be installed.
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        let inner = signal::unix::signal(signal::unix::SignalKind::hangup()).map_err(|e| {
            tracing::error!(%e, "Failed to install SIGHUP handler");
            e
        })?;
        Ok(Self { inner })
    }

    /// # Errors
    /// Never fails on this platform.
    #[cfg(not(unix))]
    pub fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// Resolve on the next SIGHUP.
    #[cfg(unix)]
    pub async fn recv(&mut self) {
        if self.inner.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}
