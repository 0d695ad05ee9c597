//! Long-running host: initial pipeline, reloads on SIGHUP or a timer, and
//! teardown on shutdown.

use std::sync::Arc;
use std::time::Duration;

use aegis_license::{LicenseGate, LicenseQueryApi, PipelineOutcome};
use anyhow::{Context, Result};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::publisher::AttributePublisher;
use crate::signals::{ReloadSignal, ShutdownListener};

pub struct Daemon {
    gate: Arc<LicenseGate>,
    publisher: Option<AttributePublisher>,
    reload_interval: Option<Duration>,
}

impl Daemon {
    #[must_use]
    pub fn new(
        gate: Arc<LicenseGate>,
        publisher: Option<AttributePublisher>,
        reload_interval: Option<Duration>,
    ) -> Self {
        Self {
            gate,
            publisher,
            reload_interval,
        }
    }

    /// Run until SIGINT/SIGTERM.
    ///
    /// # Errors
    /// Returns an error if signal handlers cannot be installed or the task
    /// running the pipeline panics.
    pub async fn run(self) -> Result<()> {
        let cancel = CancellationToken::new();
        let shutdown = ShutdownListener::install()?;

        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if let Err(e) = shutdown.wait().await {
                    tracing::error!(error = %e, "signal handling failed, shutting down");
                }
                cancel.cancel();
            }
        });

        self.serve(cancel).await
    }

    /// Run until `cancel` fires.
    ///
    /// # Errors
    /// See [`run`](Self::run).
    pub async fn serve(self, cancel: CancellationToken) -> Result<()> {
        let mut reload_signal = ReloadSignal::install()?;
        let mut ticker = self.reload_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        let outcome = self.run_blocking(LicenseGate::init).await?;
        self.after_pipeline(&outcome);
        tracing::info!(
            licensed = self.gate.is_licensed(),
            tier = self.gate.get_tier(),
            "license gate running"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = reload_signal.recv() => {
                    tracing::info!("SIGHUP received, reloading license token");
                }
                () = next_tick(&mut ticker) => {
                    tracing::debug!("periodic license revalidation");
                }
            }
            let outcome = self.run_blocking(LicenseGate::reload).await?;
            self.after_pipeline(&outcome);
        }

        self.teardown();
        Ok(())
    }

    async fn run_blocking(&self, step: fn(&LicenseGate) -> PipelineOutcome) -> Result<PipelineOutcome> {
        let gate = Arc::clone(&self.gate);
        tokio::task::spawn_blocking(move || step(&gate))
            .await
            .context("license pipeline task failed")
    }

    fn after_pipeline(&self, outcome: &PipelineOutcome) {
        tracing::debug!(activated = outcome.is_activated(), "license pipeline finished");
        self.publish();
    }

    fn publish(&self) {
        if let Some(publisher) = &self.publisher
            && let Err(e) = publisher.publish(&self.gate.snapshot())
        {
            tracing::error!(error = %format!("{e:#}"), "failed to publish license attributes");
        }
    }

    fn teardown(&self) {
        self.gate.shutdown();
        if let Some(publisher) = &self.publisher
            && let Err(e) = publisher.remove()
        {
            tracing::error!(error = %format!("{e:#}"), "failed to remove license attributes");
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
